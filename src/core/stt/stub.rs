//! STT stub for local development and tests.

use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use tracing::debug;

use super::{BaseSTT, STTResult, TranscriptionCallback, TranscriptionEvent};

/// Recognizer stub that never transcribes on its own but lets tests inject
/// transcription events directly.
pub struct StubSTT {
    listening: AtomicBool,
    callback: RwLock<Option<TranscriptionCallback>>,
}

impl StubSTT {
    pub fn new() -> Self {
        Self {
            listening: AtomicBool::new(false),
            callback: RwLock::new(None),
        }
    }

    /// Deliver a transcription event to the registered callback.
    pub async fn inject(&self, event: TranscriptionEvent) {
        let callback = self.callback.read().clone();
        if let Some(callback) = callback {
            callback(event).await;
        }
    }

    pub fn is_listening(&self) -> bool {
        self.listening.load(Ordering::Acquire)
    }
}

impl Default for StubSTT {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseSTT for StubSTT {
    async fn start_listening(&self) -> STTResult<()> {
        self.listening.store(true, Ordering::Release);
        Ok(())
    }

    async fn stop_listening(&self) -> STTResult<()> {
        self.listening.store(false, Ordering::Release);
        Ok(())
    }

    async fn receive_audio(&self, pcm: Bytes) -> STTResult<()> {
        debug!("stub recognizer discarding {} bytes of audio", pcm.len());
        Ok(())
    }

    fn on_transcription(&self, callback: TranscriptionCallback) {
        *self.callback.write() = Some(callback);
    }
}
