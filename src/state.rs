//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::character::{CharacterCatalog, StaticCatalog};
use crate::core::llm::{BaseLLM, StubLLM};
use crate::core::pipeline::Collaborators;
use crate::core::stt::{BaseSTT, StubSTT};
use crate::core::tts::{BaseTTS, StubTTS};

/// Factory producing one recognizer per connection.
pub type SttFactory = Arc<dyn Fn() -> Arc<dyn BaseSTT> + Send + Sync>;

/// Application state that can be shared across handlers.
pub struct AppState {
    pub config: ServerConfig,
    catalog: Arc<dyn CharacterCatalog>,
    llm: Arc<dyn BaseLLM>,
    tts: Arc<dyn BaseTTS>,
    stt_factory: SttFactory,
}

impl AppState {
    pub fn new(
        config: ServerConfig,
        catalog: Arc<dyn CharacterCatalog>,
        llm: Arc<dyn BaseLLM>,
        tts: Arc<dyn BaseTTS>,
        stt_factory: SttFactory,
    ) -> Arc<Self> {
        Arc::new(Self {
            config,
            catalog,
            llm,
            tts,
            stt_factory,
        })
    }

    /// State wired with the in-tree stub collaborators. Used for local
    /// development and tests; deployments inject real providers via
    /// [`AppState::new`].
    pub fn with_stubs(config: ServerConfig) -> Arc<Self> {
        let llm = StubLLM::new();
        llm.script("ada", "Hello there. What shall we talk about?");
        llm.script("brutus", "Speak, friend.");
        Self::new(
            config,
            Arc::new(StaticCatalog::with_names(&["Ada", "Brutus"])),
            Arc::new(llm),
            Arc::new(StubTTS::new()),
            Arc::new(|| Arc::new(StubSTT::new())),
        )
    }

    /// Collaborator handles for a new conversation session.
    pub fn collaborators(&self) -> Collaborators {
        Collaborators {
            catalog: self.catalog.clone(),
            llm: self.llm.clone(),
            tts: self.tts.clone(),
        }
    }

    /// Create a recognizer for a new connection.
    pub fn new_stt(&self) -> Arc<dyn BaseSTT> {
        (self.stt_factory)()
    }
}
