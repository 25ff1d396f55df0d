//! WebSocket-backed client sink.
//!
//! Bridges the pipeline's transport adapter onto the connection's sender
//! task. A failed send means the sender task is gone (socket closed), which
//! the pipeline treats as disconnect.

use async_trait::async_trait;
use bytes::Bytes;
use tokio::sync::mpsc;

use crate::core::pipeline::{ClientEvent, ClientSink, SinkError, SinkResult};

use super::messages::MessageRoute;

pub struct WsClientSink {
    tx: mpsc::Sender<MessageRoute>,
}

impl WsClientSink {
    pub fn new(tx: mpsc::Sender<MessageRoute>) -> Self {
        Self { tx }
    }
}

#[async_trait]
impl ClientSink for WsClientSink {
    async fn send_event(&self, event: ClientEvent) -> SinkResult {
        self.tx
            .send(MessageRoute::Event(event))
            .await
            .map_err(|_| SinkError("websocket sender task stopped".to_string()))
    }

    async fn send_binary(&self, payload: Bytes) -> SinkResult {
        self.tx
            .send(MessageRoute::Binary(payload))
            .await
            .map_err(|_| SinkError("websocket sender task stopped".to_string()))
    }
}
