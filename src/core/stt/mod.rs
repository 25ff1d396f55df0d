//! # STT Recognizer Contract
//!
//! Base trait abstraction for speech-to-text recognizers. The core forwards
//! raw microphone PCM to the recognizer and receives transcription events
//! through a registered async callback; finalized transcripts feed the turn
//! orchestrator's ingress queue.

mod stub;

pub use stub::StubSTT;

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use async_trait::async_trait;
use bytes::Bytes;

/// STT-specific error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum STTError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Audio processing error: {0}")]
    AudioProcessingError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

/// Result type for STT operations
pub type STTResult<T> = Result<T, STTError>;

/// Transcription lifecycle events, passed through to the client verbatim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TranscriptionEvent {
    /// Interim hypothesis, may still change
    Update(String),
    /// Prefix that will no longer change
    Stabilized(String),
    /// Finalized user message; triggers a conversation turn
    Finished(String),
}

/// Type alias for transcription event callbacks
pub type TranscriptionCallback =
    Arc<dyn Fn(TranscriptionEvent) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Base trait for STT recognizers
#[async_trait]
pub trait BaseSTT: Send + Sync {
    /// Begin recognizing; events start flowing to the registered callback.
    async fn start_listening(&self) -> STTResult<()>;

    /// Stop recognizing; buffered audio is discarded.
    async fn stop_listening(&self) -> STTResult<()>;

    /// Feed raw microphone PCM to the recognizer.
    async fn receive_audio(&self, pcm: Bytes) -> STTResult<()>;

    /// Register the transcription event callback.
    fn on_transcription(&self, callback: TranscriptionCallback);
}
