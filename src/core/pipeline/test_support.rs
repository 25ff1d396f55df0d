//! Shared test doubles for pipeline tests.

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::Mutex;

use super::events::ClientEvent;
use super::sink::{ClientSink, SinkResult};

/// Sink that records every frame for assertions.
#[derive(Default)]
pub struct RecordingSink {
    events: Mutex<Vec<ClientEvent>>,
    binary: Mutex<Vec<Bytes>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().clone()
    }

    /// Wire-level `type` tag of each recorded event, in order.
    pub fn event_types(&self) -> Vec<&'static str> {
        self.events
            .lock()
            .iter()
            .map(|event| match event {
                ClientEvent::TextStreamStart { .. } => "text_stream_start",
                ClientEvent::TextChunk { .. } => "text_chunk",
                ClientEvent::TextStreamStop { .. } => "text_stream_stop",
                ClientEvent::AudioStreamStart { .. } => "audio_stream_start",
                ClientEvent::AudioChunk { .. } => "audio_chunk",
                ClientEvent::AudioStreamStop { .. } => "audio_stream_stop",
                ClientEvent::InterruptAck {} => "interrupt_ack",
                ClientEvent::TranscriptionUpdate { .. } => "transcription_update",
                ClientEvent::TranscriptionStabilized { .. } => "transcription_stabilized",
                ClientEvent::TranscriptionFinished { .. } => "transcription_finished",
            })
            .collect()
    }

    pub fn binary_count(&self) -> usize {
        self.binary.lock().len()
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn send_event(&self, event: ClientEvent) -> SinkResult {
        self.events.lock().push(event);
        Ok(())
    }

    async fn send_binary(&self, payload: Bytes) -> SinkResult {
        self.binary.lock().push(payload);
        Ok(())
    }
}
