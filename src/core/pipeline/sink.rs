//! Transport adapter between the pipeline and the client channel.
//!
//! The pipeline never talks to a socket directly; it emits through this
//! trait and the WebSocket layer implements it. A send failure means the
//! client is gone, which escalates to session teardown.

use async_trait::async_trait;
use bytes::Bytes;

use super::events::ClientEvent;

/// Error emitting to the client channel.
#[derive(Debug, Clone, thiserror::Error)]
#[error("client channel closed: {0}")]
pub struct SinkError(pub String);

/// Result type for sink operations
pub type SinkResult = Result<(), SinkError>;

/// Outbound half of the client's full-duplex message channel.
#[async_trait]
pub trait ClientSink: Send + Sync {
    /// Send one framed JSON event.
    async fn send_event(&self, event: ClientEvent) -> SinkResult;

    /// Send one raw binary frame (PCM payload).
    async fn send_binary(&self, payload: Bytes) -> SinkResult;
}
