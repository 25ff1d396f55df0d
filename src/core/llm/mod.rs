//! # LLM Provider Contract
//!
//! This module provides the base trait abstraction for large language model
//! providers. The streaming core only ever consumes a token stream for one
//! character's reply; prompt construction and conversation history belong to
//! the provider implementation.

mod stub;

pub use stub::StubLLM;

use std::pin::Pin;

use async_trait::async_trait;
use futures_util::Stream;

use crate::core::character::Character;

/// LLM-specific error types
#[derive(Debug, Clone, thiserror::Error)]
pub enum LLMError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Provider error: {0}")]
    ProviderError(String),

    #[error("Stream error: {0}")]
    StreamError(String),

    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for LLM operations
pub type LLMResult<T> = Result<T, LLMError>;

/// Lazy stream of text deltas for one character's reply.
///
/// The stream ends on natural completion; an `Err` item truncates the reply.
pub type TokenStream = Pin<Box<dyn Stream<Item = LLMResult<String>> + Send>>;

/// Generation parameters supplied by the client via `model_settings` and
/// passed through to the provider untouched.
#[derive(Debug, Clone, Default, PartialEq, serde::Deserialize, serde::Serialize)]
pub struct ModelSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

/// A request for one character's reply within a turn.
#[derive(Debug, Clone)]
pub struct ReplyRequest {
    /// The character who is replying
    pub character: Character,
    /// The finalized user message that opened the turn
    pub user_message: String,
}

/// Base trait for LLM providers
///
/// Implementations own prompt construction and history; the core hands them
/// a [`ReplyRequest`] and consumes the resulting token stream.
#[async_trait]
pub trait BaseLLM: Send + Sync {
    /// Start streaming a reply for the given character.
    ///
    /// # Arguments
    /// * `request` - The character and user message for this reply
    /// * `settings` - Client-supplied generation parameters
    ///
    /// # Returns
    /// * `LLMResult<TokenStream>` - A token stream, or an error if the
    ///   request could not be started
    async fn stream_reply(
        &self,
        request: ReplyRequest,
        settings: &ModelSettings,
    ) -> LLMResult<TokenStream>;
}
