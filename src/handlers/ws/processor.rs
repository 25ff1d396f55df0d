//! WebSocket message processing
//!
//! Routes parsed incoming messages and binary audio frames to the session
//! and the speech recognizer.

use bytes::Bytes;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::messages::{IncomingMessage, MessageRoute, OutgoingMessage};
use super::state::ConnectionState;

/// Process one incoming control message.
///
/// Returns `true` to continue the connection, `false` to terminate it.
pub async fn handle_incoming_message(
    msg: IncomingMessage,
    state: &ConnectionState,
    message_tx: &mpsc::Sender<MessageRoute>,
) -> bool {
    match msg {
        IncomingMessage::UserMessage { text } => {
            debug!(chars = text.len(), "user message received");
            state.session.accept_user_message(&text);
            true
        }
        IncomingMessage::Interrupt => {
            state.session.interrupt().await;
            true
        }
        IncomingMessage::Ping => message_tx
            .send(MessageRoute::Outgoing(OutgoingMessage::Pong {}))
            .await
            .is_ok(),
        IncomingMessage::StartListening => {
            if let Err(e) = state.stt.start_listening().await {
                warn!(error = %e, "failed to start recognizer");
                return send_error(message_tx, format!("failed to start listening: {e}")).await;
            }
            true
        }
        IncomingMessage::StopListening => {
            if let Err(e) = state.stt.stop_listening().await {
                warn!(error = %e, "failed to stop recognizer");
                return send_error(message_tx, format!("failed to stop listening: {e}")).await;
            }
            true
        }
        IncomingMessage::ModelSettings(settings) => {
            debug!(?settings, "model settings updated");
            state.session.set_model_settings(settings);
            true
        }
    }
}

/// Forward one binary frame of microphone PCM to the recognizer.
pub async fn handle_audio_message(
    audio: Bytes,
    state: &ConnectionState,
    message_tx: &mpsc::Sender<MessageRoute>,
) -> bool {
    if let Err(e) = state.stt.receive_audio(audio).await {
        warn!(error = %e, "recognizer rejected audio");
        return send_error(message_tx, format!("failed to process audio: {e}")).await;
    }
    true
}

async fn send_error(message_tx: &mpsc::Sender<MessageRoute>, message: String) -> bool {
    message_tx
        .send(MessageRoute::Outgoing(OutgoingMessage::Error { message }))
        .await
        .is_ok()
}
