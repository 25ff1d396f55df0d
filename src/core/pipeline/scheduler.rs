//! Speaker-order scheduling for concurrent synthesis.
//!
//! Audio for speaker N+1 may reach the audio queue while speaker N is still
//! synthesizing. The scheduler is a pure ordering filter over that stream:
//! chunks for the current speaker pass through, chunks for later speakers
//! are buffered, and the end-of-speaker sentinel advances the current
//! speaker and flushes whatever the next speakers have already produced.
//!
//! Speaker indices restart at 0 with each turn; chunks carry their turn
//! number, and because the audio queue is filled by a single producer in
//! turn order, a chunk from a newer turn can only arrive after the previous
//! turn has fully passed through. Stale chunks from older turns (late
//! arrivals after an interrupt) are discarded.

use std::collections::BTreeMap;

use tracing::debug;

use super::records::AudioChunk;

/// Deterministic ordering filter over the audio queue's output sequence.
#[derive(Debug, Default)]
pub struct SpeakerScheduler {
    turn: u64,
    current_speaker: usize,
    buffers: BTreeMap<usize, Vec<AudioChunk>>,
}

impl SpeakerScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Speaker whose chunks currently pass through unbuffered.
    pub fn current_speaker(&self) -> usize {
        self.current_speaker
    }

    /// Reset to the initial state, dropping all buffered audio.
    pub fn reset(&mut self) {
        self.reset_to(0);
    }

    /// Reset for a new turn, dropping buffered audio and discarding any
    /// late chunks from turns before `next_turn`. Used after an interrupt,
    /// where synthesis already in flight may still push chunks of the
    /// cancelled turn into the audio queue.
    pub fn reset_to(&mut self, next_turn: u64) {
        self.turn = next_turn;
        self.current_speaker = 0;
        self.buffers.clear();
    }

    /// Accept one chunk from the audio queue and return the chunks released
    /// by it, in emission order.
    pub fn accept(&mut self, chunk: AudioChunk) -> Vec<AudioChunk> {
        if chunk.turn < self.turn {
            debug!(
                turn = chunk.turn,
                speaker = chunk.speaker_index,
                "discarding late chunk from finished turn"
            );
            return Vec::new();
        }
        if chunk.turn > self.turn {
            // Single-producer FIFO discipline means the previous turn has
            // fully passed through once a newer turn's chunk arrives.
            self.turn = chunk.turn;
            self.current_speaker = 0;
            self.buffers.clear();
        }

        if chunk.speaker_index > self.current_speaker {
            self.buffers
                .entry(chunk.speaker_index)
                .or_default()
                .push(chunk);
            return Vec::new();
        }
        if chunk.speaker_index < self.current_speaker {
            debug!(
                speaker = chunk.speaker_index,
                current = self.current_speaker,
                "discarding late chunk from advanced speaker"
            );
            return Vec::new();
        }

        let mut released = Vec::new();
        let was_final = chunk.is_final;
        released.push(chunk);
        if was_final {
            self.current_speaker += 1;
            self.flush_into(&mut released);
        }
        released
    }

    /// Release buffered chunks for the new current speaker, cascading across
    /// speakers whose sentinel is already buffered. Stops at the first
    /// speaker that is still in flight.
    fn flush_into(&mut self, released: &mut Vec<AudioChunk>) {
        while let Some(buffered) = self.buffers.remove(&self.current_speaker) {
            let mut saw_final = false;
            for chunk in buffered {
                saw_final |= chunk.is_final;
                released.push(chunk);
            }
            if saw_final {
                self.current_speaker += 1;
            } else {
                break;
            }
        }
    }
}
