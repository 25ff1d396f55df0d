//! # TTS Engine Contract
//!
//! Base trait abstraction for text-to-speech engines. One synthesis call
//! covers one sentence and yields a lazy sequence of linear16 PCM chunks;
//! connection management, caching, and provider wire protocols are the
//! engine implementation's concern.

mod stub;

pub use stub::StubTTS;

use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use futures_util::Stream;

use crate::core::character::VoiceDescriptor;

/// TTS-specific error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum TTSError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Audio generation failed: {0}")]
    AudioGenerationFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for TTS operations
pub type TTSResult<T> = Result<T, TTSError>;

/// Lazy sequence of PCM chunks for one synthesized sentence.
///
/// Chunks are signed 16-bit little-endian mono PCM at the voice descriptor's
/// sample rate, each holding a whole number of samples.
pub type PcmStream = Pin<Box<dyn Stream<Item = TTSResult<Bytes>> + Send>>;

/// Base trait for TTS engines
#[async_trait]
pub trait BaseTTS: Send + Sync {
    /// Synthesize one sentence with the given voice.
    ///
    /// # Arguments
    /// * `text` - The sentence to synthesize
    /// * `voice` - Voice descriptor from the character catalog
    ///
    /// # Returns
    /// * `TTSResult<PcmStream>` - A chunk stream, or an error if synthesis
    ///   could not be started
    async fn synthesize(&self, text: &str, voice: &VoiceDescriptor) -> TTSResult<PcmStream>;
}
