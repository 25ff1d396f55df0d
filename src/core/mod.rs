pub mod character;
pub mod llm;
pub mod pipeline;
pub mod stt;
pub mod tts;

// Re-export the session-facing surface for convenience
pub use character::{Character, CharacterCatalog, StaticCatalog, VoiceDescriptor};
pub use pipeline::{ClientEvent, Collaborators, ConversationSession};
