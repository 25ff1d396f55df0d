//! Client-facing lifecycle events emitted by the pipeline.
//!
//! Events serialize to `{"type": ..., "data": {...}}` JSON frames. An
//! `audio_chunk` event is always followed by one raw binary frame carrying
//! the PCM payload it announces.

use serde::{Deserialize, Serialize};

/// Outbound lifecycle events for one client session.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "data", rename_all = "snake_case")]
pub enum ClientEvent {
    TextStreamStart {
        character_id: String,
        character_name: String,
        message_id: String,
    },
    TextChunk {
        character_id: String,
        character_name: String,
        message_id: String,
        text: String,
        is_final: bool,
    },
    TextStreamStop {
        character_id: String,
        character_name: String,
        message_id: String,
        /// Full accumulated reply text
        text: String,
    },
    AudioStreamStart {
        character_id: String,
        character_name: String,
        message_id: String,
        speaker_index: usize,
        sample_rate: u32,
    },
    AudioChunk {
        character_id: String,
        character_name: String,
        message_id: String,
        speaker_index: usize,
        sentence_index: usize,
        chunk_index: usize,
    },
    AudioStreamStop {
        character_id: String,
        character_name: String,
        message_id: String,
        speaker_index: usize,
    },
    InterruptAck {},
    TranscriptionUpdate {
        text: String,
    },
    TranscriptionStabilized {
        text: String,
    },
    TranscriptionFinished {
        text: String,
    },
}

impl ClientEvent {
    /// Message id the event is scoped to, if any.
    pub fn message_id(&self) -> Option<&str> {
        match self {
            Self::TextStreamStart { message_id, .. }
            | Self::TextChunk { message_id, .. }
            | Self::TextStreamStop { message_id, .. }
            | Self::AudioStreamStart { message_id, .. }
            | Self::AudioChunk { message_id, .. }
            | Self::AudioStreamStop { message_id, .. } => Some(message_id),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_audio_chunk_wire_shape() {
        let event = ClientEvent::AudioChunk {
            character_id: "ada".to_string(),
            character_name: "Ada".to_string(),
            message_id: "m1".to_string(),
            speaker_index: 0,
            sentence_index: 2,
            chunk_index: 5,
        };

        let value = serde_json::to_value(&event).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "audio_chunk",
                "data": {
                    "character_id": "ada",
                    "character_name": "Ada",
                    "message_id": "m1",
                    "speaker_index": 0,
                    "sentence_index": 2,
                    "chunk_index": 5,
                }
            })
        );
    }

    #[test]
    fn test_interrupt_ack_wire_shape() {
        let value = serde_json::to_value(ClientEvent::InterruptAck {}).unwrap();
        assert_eq!(value, json!({"type": "interrupt_ack", "data": {}}));
    }

    #[test]
    fn test_round_trip() {
        let event = ClientEvent::TextStreamStop {
            character_id: "ada".to_string(),
            character_name: "Ada".to_string(),
            message_id: "m1".to_string(),
            text: "Hi. Bye.".to_string(),
        };
        let json = serde_json::to_string(&event).unwrap();
        let parsed: ClientEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, event);
    }
}
