//! Per-connection state.

use std::sync::Arc;

use crate::core::pipeline::ConversationSession;
use crate::core::stt::BaseSTT;

/// Everything a connection's message handlers need.
pub struct ConnectionState {
    /// The connection's streaming pipeline
    pub session: Arc<ConversationSession>,
    /// The connection's speech recognizer
    pub stt: Arc<dyn BaseSTT>,
}
