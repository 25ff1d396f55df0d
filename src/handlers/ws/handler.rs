//! Axum WebSocket handler
//!
//! Upgrades the HTTP connection, wires a conversation session to it, and
//! runs the receive loop until the client disconnects.

use std::sync::Arc;

use axum::{
    extract::{
        State,
        ws::{Message, WebSocket, WebSocketUpgrade},
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::core::pipeline::ConversationSession;
use crate::state::AppState;

use super::{
    messages::{IncomingMessage, MessageRoute, OutgoingMessage},
    processor::{handle_audio_message, handle_incoming_message},
    sink::WsClientSink,
    state::ConnectionState,
};

/// Outbound channel depth between the pipeline and the socket writer. Audio
/// frames queue here when the network is slower than synthesis; the
/// pipeline's own backpressure begins once this buffer is full.
const CHANNEL_BUFFER_SIZE: usize = 256;

/// WebSocket chat handler; upgrades the connection for one session.
pub async fn ws_chat_handler(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState>>,
) -> Response {
    info!("websocket connection upgrade requested");
    ws.on_upgrade(move |socket| handle_chat_socket(socket, state))
}

/// Run one client's session over the socket.
async fn handle_chat_socket(socket: WebSocket, app_state: Arc<AppState>) {
    info!("websocket connection established");

    let (mut sender, mut receiver) = socket.split();
    let (message_tx, mut message_rx) = mpsc::channel::<MessageRoute>(CHANNEL_BUFFER_SIZE);

    // Sender task: serializes routes onto the socket. Exits on send failure,
    // which makes every pipeline send fail and tears the session down.
    let sender_task = tokio::spawn(async move {
        while let Some(route) = message_rx.recv().await {
            let result = match route {
                MessageRoute::Event(event) => match serde_json::to_string(&event) {
                    Ok(json) => sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!(error = %e, "failed to serialize client event");
                        continue;
                    }
                },
                MessageRoute::Outgoing(message) => match serde_json::to_string(&message) {
                    Ok(json) => sender.send(Message::Text(json.into())).await,
                    Err(e) => {
                        error!(error = %e, "failed to serialize outgoing message");
                        continue;
                    }
                },
                MessageRoute::Binary(payload) => sender.send(Message::Binary(payload)).await,
            };
            if let Err(e) = result {
                warn!(error = %e, "websocket send failed");
                break;
            }
        }
    });

    let sink = Arc::new(WsClientSink::new(message_tx.clone()));
    let session = ConversationSession::spawn(app_state.collaborators(), sink);
    let stt = app_state.new_stt();

    // Finalized transcripts open turns; interim results pass through.
    {
        let session = session.clone();
        stt.on_transcription(Arc::new(move |event| {
            let session = session.clone();
            Box::pin(async move {
                session.handle_transcription(event).await;
            })
        }));
    }

    let state = ConnectionState {
        session: session.clone(),
        stt,
    };

    while let Some(msg_result) = receiver.next().await {
        match msg_result {
            Ok(msg) => {
                if !process_message(msg, &state, &message_tx).await {
                    break;
                }
            }
            Err(e) => {
                warn!(error = %e, "websocket receive failed");
                break;
            }
        }
    }

    session.shutdown().await;
    sender_task.abort();
    info!("websocket connection terminated");
}

/// Dispatch one raw WebSocket message.
async fn process_message(
    msg: Message,
    state: &ConnectionState,
    message_tx: &mpsc::Sender<MessageRoute>,
) -> bool {
    match msg {
        Message::Text(text) => {
            let incoming: IncomingMessage = match serde_json::from_str(&text) {
                Ok(msg) => msg,
                Err(e) => {
                    warn!(error = %e, "failed to parse incoming message");
                    let _ = message_tx
                        .send(MessageRoute::Outgoing(OutgoingMessage::Error {
                            message: format!("invalid message format: {e}"),
                        }))
                        .await;
                    return true;
                }
            };
            handle_incoming_message(incoming, state, message_tx).await
        }
        Message::Binary(data) => handle_audio_message(data, state, message_tx).await,
        Message::Ping(_) | Message::Pong(_) => true,
        Message::Close(_) => {
            debug!("websocket closed by client");
            false
        }
    }
}
