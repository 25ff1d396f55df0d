//! Silence-generating TTS stub for local development and tests.

use async_trait::async_trait;
use bytes::Bytes;

use crate::core::character::VoiceDescriptor;

use super::{BaseTTS, PcmStream, TTSError, TTSResult};

/// Duration of synthesized audio per input character, in milliseconds.
const MS_PER_CHAR: usize = 20;

/// PCM chunk size in milliseconds.
const CHUNK_MS: usize = 100;

/// TTS stub that produces silent linear16 PCM sized to the input text.
///
/// Output duration scales with text length so downstream timing behaves
/// roughly like a real engine. Texts registered via [`StubTTS::fail_on`]
/// error instead, which exercises the pipeline's skip-on-failure policy.
pub struct StubTTS {
    failing_texts: parking_lot::RwLock<Vec<String>>,
}

impl StubTTS {
    pub fn new() -> Self {
        Self {
            failing_texts: parking_lot::RwLock::new(Vec::new()),
        }
    }

    /// Make synthesis of the given text fail with a provider error.
    pub fn fail_on(&self, text: &str) {
        self.failing_texts.write().push(text.to_string());
    }
}

impl Default for StubTTS {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseTTS for StubTTS {
    async fn synthesize(&self, text: &str, voice: &VoiceDescriptor) -> TTSResult<PcmStream> {
        if self.failing_texts.read().iter().any(|t| t == text) {
            return Err(TTSError::ProviderError(format!(
                "synthesis scripted to fail for: {text}"
            )));
        }

        let total_ms = text.chars().count().max(1) * MS_PER_CHAR;
        let chunk_samples = (voice.sample_rate as usize * CHUNK_MS) / 1000;
        let chunk_count = total_ms.div_ceil(CHUNK_MS);

        let chunks: Vec<TTSResult<Bytes>> = (0..chunk_count)
            .map(|_| Ok(Bytes::from(vec![0u8; chunk_samples * 2])))
            .collect();

        Ok(Box::pin(futures_util::stream::iter(chunks)))
    }
}
