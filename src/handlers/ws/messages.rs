//! WebSocket message types and routing
//!
//! Inbound control messages from the client, outbound control frames, and
//! the unified route the sender task consumes. Pipeline lifecycle events
//! ([`ClientEvent`]) are defined with the pipeline and pass through here
//! untouched.

use bytes::Bytes;
use serde::{Deserialize, Serialize};

use crate::core::llm::ModelSettings;
use crate::core::pipeline::ClientEvent;

/// WebSocket message types for incoming messages
#[derive(Debug, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum IncomingMessage {
    /// Typed user message; equivalent to a finalized transcription
    UserMessage { text: String },
    /// Barge-in: cancel the current turn
    Interrupt,
    /// Liveness probe; answered with `pong`
    Ping,
    /// Begin speech recognition
    StartListening,
    /// Stop speech recognition
    StopListening,
    /// Generation settings for subsequent turns
    ModelSettings(ModelSettings),
}

/// WebSocket message types for outgoing control frames
#[derive(Debug, Serialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum OutgoingMessage {
    Pong {},
    Error { message: String },
}

/// Message routing for the sender task
pub enum MessageRoute {
    /// Pipeline lifecycle event
    Event(ClientEvent),
    /// Session-level control frame
    Outgoing(OutgoingMessage),
    /// Raw PCM frame
    Binary(Bytes),
}
