//! Turn lifecycle state shared between the orchestrator, the audio
//! streamer, and the interrupt handler.
//!
//! At most one turn is non-terminal at any time. The orchestrator creates
//! turns and drives them through the LLM stage; the later transitions are
//! observational, recorded as downstream stages report progress.

use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error};

/// Lifecycle states of a turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TurnState {
    /// No turn in flight
    Idle,
    /// Character replies are being streamed from the LLM
    Llm,
    /// All sentences enqueued; synthesis still in flight
    Tts,
    /// Audio is flowing to the client
    Streaming,
    /// All speakers fully streamed
    Complete,
    /// Torn down by interrupt or disconnect
    Cancelled,
}

impl TurnState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Complete | Self::Cancelled)
    }
}

struct ActiveTurn {
    number: u64,
    state: TurnState,
    cancel: CancellationToken,
    speaker_count: Option<usize>,
}

/// Registry holding the single active turn.
#[derive(Default)]
pub struct TurnRegistry {
    active: Mutex<Option<ActiveTurn>>,
    next_number: AtomicU64,
}

impl TurnRegistry {
    pub fn new() -> Self {
        Self {
            active: Mutex::new(None),
            next_number: AtomicU64::new(1),
        }
    }

    /// Create the next turn in state [`TurnState::Llm`] and return its
    /// number and cancellation token.
    ///
    /// The orchestrator serializes turns, so a live non-terminal turn here
    /// is a programming defect; it is logged and displaced.
    pub fn begin(&self) -> (u64, CancellationToken) {
        let number = self.next_number.fetch_add(1, Ordering::Relaxed);
        let cancel = CancellationToken::new();
        let mut active = self.active.lock();
        if let Some(previous) = active.as_ref() {
            if !previous.state.is_terminal() {
                error!(
                    previous = previous.number,
                    state = ?previous.state,
                    "turn started while previous turn still live"
                );
            }
        }
        *active = Some(ActiveTurn {
            number,
            state: TurnState::Llm,
            cancel: cancel.clone(),
            speaker_count: None,
        });
        debug!(turn = number, "turn started");
        (number, cancel)
    }

    /// Record how many speakers the turn addresses.
    pub fn set_speaker_count(&self, number: u64, count: usize) {
        let mut active = self.active.lock();
        if let Some(turn) = active.as_mut().filter(|t| t.number == number) {
            turn.speaker_count = Some(count);
        }
    }

    /// Advance the turn's state. Terminal states are never overwritten.
    pub fn set_state(&self, number: u64, state: TurnState) {
        let mut active = self.active.lock();
        if let Some(turn) = active.as_mut().filter(|t| t.number == number) {
            if !turn.state.is_terminal() {
                debug!(turn = number, from = ?turn.state, to = ?state, "turn state");
                turn.state = state;
            }
        }
    }

    /// Audio for this turn reached the client; TTS → Streaming.
    pub fn observe_audio_activity(&self, number: u64) {
        let mut active = self.active.lock();
        if let Some(turn) = active.as_mut().filter(|t| t.number == number) {
            if turn.state == TurnState::Tts {
                turn.state = TurnState::Streaming;
            }
        }
    }

    /// An `audio_stream_stop` was emitted for `speaker`; the last speaker's
    /// stop completes the turn.
    pub fn observe_stream_stop(&self, number: u64, speaker: usize) {
        let mut active = self.active.lock();
        if let Some(turn) = active.as_mut().filter(|t| t.number == number) {
            if turn.state.is_terminal() {
                return;
            }
            if turn.speaker_count == Some(speaker + 1) {
                debug!(turn = number, "turn complete");
                turn.state = TurnState::Complete;
            }
        }
    }

    /// Cancel the live turn, if any. Returns whether one was cancelled.
    pub fn cancel_current(&self) -> bool {
        let mut active = self.active.lock();
        match active.as_mut() {
            Some(turn) if !turn.state.is_terminal() => {
                turn.cancel.cancel();
                turn.state = TurnState::Cancelled;
                debug!(turn = turn.number, "turn cancelled");
                true
            }
            _ => false,
        }
    }

    /// State of the in-flight turn; [`TurnState::Idle`] when none is live.
    pub fn state(&self) -> TurnState {
        let active = self.active.lock();
        match active.as_ref() {
            Some(turn) if !turn.state.is_terminal() => turn.state,
            _ => TurnState::Idle,
        }
    }

    /// Number and state of the most recent turn, terminal or not.
    pub fn last_turn(&self) -> Option<(u64, TurnState)> {
        self.active.lock().as_ref().map(|t| (t.number, t.state))
    }
}
