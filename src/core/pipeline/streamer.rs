//! Audio streamer: audio queue in, client frames out.
//!
//! One long-lived task per session. Chunks pass through the speaker-order
//! scheduler; for every released chunk the streamer emits the lifecycle
//! frames of the wire contract. `current_message_id` and the scheduler live
//! inside the task; the interrupt path communicates only through the drain
//! and the [`StreamerControl`] flags.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::events::ClientEvent;
use super::queue::PipelineQueue;
use super::records::AudioChunk;
use super::scheduler::SpeakerScheduler;
use super::sink::{ClientSink, SinkResult};
use super::turn::TurnRegistry;

/// Flags the interrupt handler and barge-in policies may toggle without
/// reaching into the streamer task's state.
#[derive(Default)]
pub struct StreamerControl {
    reset_requested: AtomicBool,
    /// Highest turn number considered dead; chunks at or below it are stale.
    reset_floor: AtomicU64,
    suppress_audio: AtomicBool,
}

impl StreamerControl {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ask the streamer to reset scheduler and stream tracking before it
    /// processes its next chunk. `dead_turn` is the last cancelled turn;
    /// anything the pipeline still produces for it is discarded.
    pub fn request_reset(&self, dead_turn: u64) {
        self.reset_floor.fetch_max(dead_turn, Ordering::AcqRel);
        self.reset_requested.store(true, Ordering::Release);
    }

    fn take_reset(&self) -> Option<u64> {
        if self.reset_requested.swap(false, Ordering::AcqRel) {
            Some(self.reset_floor.load(Ordering::Acquire))
        } else {
            None
        }
    }

    fn reset_pending(&self) -> bool {
        self.reset_requested.load(Ordering::Acquire)
    }

    /// Finish the current speaker silently: chunk metadata and lifecycle
    /// frames still flow, PCM payloads are withheld. Clears itself on the
    /// next `audio_stream_stop`.
    pub fn suppress_audio(&self) {
        self.suppress_audio.store(true, Ordering::Release);
    }

    pub fn is_suppressing(&self) -> bool {
        self.suppress_audio.load(Ordering::Acquire)
    }

    fn clear_suppress(&self) {
        self.suppress_audio.store(false, Ordering::Release);
    }
}

/// Consume the audio queue until the session ends.
pub(crate) async fn run_audio_streamer(
    audio_q: Arc<PipelineQueue<AudioChunk>>,
    sink: Arc<dyn ClientSink>,
    control: Arc<StreamerControl>,
    turns: Arc<TurnRegistry>,
    cancel: CancellationToken,
) {
    debug!("audio streamer started");
    let mut scheduler = SpeakerScheduler::new();
    let mut current_message_id: Option<String> = None;

    loop {
        let chunk = tokio::select! {
            _ = cancel.cancelled() => break,
            chunk = audio_q.get() => chunk,
        };

        if let Some(dead_turn) = control.take_reset() {
            scheduler.reset_to(dead_turn + 1);
            current_message_id = None;
        }

        for released in scheduler.accept(chunk) {
            // An interrupt that raced in mid-batch makes the remaining
            // releases stale; the reset is consumed on the next iteration.
            if control.reset_pending() {
                break;
            }
            if let Err(e) =
                emit_chunk(&*sink, &control, &turns, &mut current_message_id, released).await
            {
                warn!(error = %e, "client send failed; audio streamer stopping");
                return;
            }
        }
    }
    debug!("audio streamer exited");
}

/// Emit the frames for one scheduler-released chunk.
async fn emit_chunk(
    sink: &dyn ClientSink,
    control: &StreamerControl,
    turns: &TurnRegistry,
    current_message_id: &mut Option<String>,
    chunk: AudioChunk,
) -> SinkResult {
    turns.observe_audio_activity(chunk.turn);

    if chunk.is_final {
        sink.send_event(ClientEvent::AudioStreamStop {
            character_id: chunk.character_id,
            character_name: chunk.character_name,
            message_id: chunk.message_id,
            speaker_index: chunk.speaker_index,
        })
        .await?;
        *current_message_id = None;
        control.clear_suppress();
        turns.observe_stream_stop(chunk.turn, chunk.speaker_index);
        return Ok(());
    }

    if current_message_id.as_deref() != Some(chunk.message_id.as_str()) {
        sink.send_event(ClientEvent::AudioStreamStart {
            character_id: chunk.character_id.clone(),
            character_name: chunk.character_name.clone(),
            message_id: chunk.message_id.clone(),
            speaker_index: chunk.speaker_index,
            sample_rate: chunk.sample_rate,
        })
        .await?;
        *current_message_id = Some(chunk.message_id.clone());
    }

    sink.send_event(ClientEvent::AudioChunk {
        character_id: chunk.character_id,
        character_name: chunk.character_name,
        message_id: chunk.message_id,
        speaker_index: chunk.speaker_index,
        sentence_index: chunk.sentence_index,
        chunk_index: chunk.chunk_index,
    })
    .await?;

    if !control.is_suppressing() {
        sink.send_binary(chunk.payload).await?;
    }
    Ok(())
}
