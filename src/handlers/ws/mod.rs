//! # WebSocket Chat Handler Module
//!
//! Full-duplex channel for one conversation session. The client sends JSON
//! control messages and raw microphone PCM; the server streams back reply
//! text, synthesized audio, and transcription updates.
//!
//! ## Message Types
//!
//! **Incoming:**
//! - `{"type": "user_message", "data": {"text": "..."}}` - Typed user message addressing one or more characters
//! - `{"type": "interrupt"}` - Cancel the current turn (barge-in)
//! - `{"type": "ping"}` - Liveness probe, answered with `pong`
//! - `{"type": "start_listening"}` / `{"type": "stop_listening"}` - Toggle speech recognition
//! - `{"type": "model_settings", "data": {...}}` - Generation settings for subsequent turns
//! - **Binary frames** - Raw microphone PCM forwarded to the recognizer
//!
//! **Outgoing:**
//! - `text_stream_start` / `text_chunk` / `text_stream_stop` - One character's reply text, streamed
//! - `audio_stream_start` / `audio_chunk` / `audio_stream_stop` - One character's reply audio; each
//!   `audio_chunk` is followed by one binary frame holding its linear16 PCM payload
//! - `interrupt_ack` - Cancellation observed, pipeline emptied
//! - `transcription_update` / `transcription_stabilized` / `transcription_finished` - Recognizer passthrough
//! - `pong`, `error` - Session-level control frames
//!
//! Characters reply strictly in the order the user message addresses them,
//! even though synthesis for a later speaker may overlap with an earlier
//! speaker's delivery.

pub mod handler;
pub mod messages;
pub mod processor;
pub mod sink;
pub mod state;

pub use handler::ws_chat_handler;
pub use messages::{IncomingMessage, MessageRoute, OutgoingMessage};
pub use sink::WsClientSink;
pub use state::ConnectionState;
