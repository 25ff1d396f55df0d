//! Character references and the catalog contract
//!
//! Characters are opaque to the streaming core: an identifier, a display
//! name, and a voice descriptor. The catalog resolves which characters a
//! user message addresses and in what order; persistence and CRUD for the
//! catalog live outside this crate.

use async_trait::async_trait;

/// Voice metadata handed to the TTS engine for a character.
///
/// The core treats this as opaque apart from `sample_rate`, which is
/// surfaced to the client in `audio_stream_start` events.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct VoiceDescriptor {
    /// Provider-specific voice identifier
    pub voice_id: String,
    /// Output sample rate in Hz for linear16 PCM
    pub sample_rate: u32,
}

impl Default for VoiceDescriptor {
    fn default() -> Self {
        Self {
            voice_id: "default".to_string(),
            sample_rate: 24000,
        }
    }
}

/// A character addressable in conversation.
#[derive(Debug, Clone, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub struct Character {
    /// Stable identifier from the catalog
    pub id: String,
    /// Display name, also used for mention parsing
    pub name: String,
    /// Voice used when synthesizing this character's replies
    pub voice: VoiceDescriptor,
}

/// Catalog contract: resolve the ordered list of characters a user message
/// addresses.
///
/// Order is significant — it becomes the speaker order of the turn.
#[async_trait]
pub trait CharacterCatalog: Send + Sync {
    /// Parse `message` and return the addressed characters in mention order.
    ///
    /// An empty vector means the message addresses nobody and the turn is a
    /// no-op.
    async fn parse_addressed(&self, message: &str) -> Vec<Character>;
}

/// In-memory catalog that matches characters by case-insensitive name
/// mention, ordered by first occurrence in the message.
///
/// Used by the dev wiring and the test suites; deployments provide their own
/// catalog implementation.
pub struct StaticCatalog {
    characters: Vec<Character>,
}

impl StaticCatalog {
    pub fn new(characters: Vec<Character>) -> Self {
        Self { characters }
    }

    /// Convenience constructor for name-only characters with default voices.
    pub fn with_names(names: &[&str]) -> Self {
        let characters = names
            .iter()
            .map(|name| Character {
                id: name.to_lowercase(),
                name: (*name).to_string(),
                voice: VoiceDescriptor::default(),
            })
            .collect();
        Self::new(characters)
    }
}

#[async_trait]
impl CharacterCatalog for StaticCatalog {
    async fn parse_addressed(&self, message: &str) -> Vec<Character> {
        let lowered = message.to_lowercase();
        let mut mentions: Vec<(usize, &Character)> = self
            .characters
            .iter()
            .filter_map(|character| {
                lowered
                    .find(&character.name.to_lowercase())
                    .map(|position| (position, character))
            })
            .collect();
        mentions.sort_by_key(|(position, _)| *position);
        mentions
            .into_iter()
            .map(|(_, character)| character.clone())
            .collect()
    }
}
