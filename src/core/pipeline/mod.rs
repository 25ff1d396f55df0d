//! # Conversation Streaming Pipeline
//!
//! Three-stage producer/consumer pipeline behind every client session:
//! the turn orchestrator segments streamed LLM replies into sentences, the
//! TTS worker synthesizes them into PCM chunks, and the audio streamer
//! delivers them to the client in strict speaker order.
//!
//! ```text
//! ingress ──► orchestrator ──► SentenceQ ──► tts worker ──► AudioQ
//!                                                              │
//!                                     speaker-order scheduler ◄┘
//!                                                              │
//!                                            audio streamer ──► client
//! ```
//!
//! Stages communicate only through bounded queues; backpressure is the
//! queues' blocking `put`, cancellation is queue drain plus the turn's
//! cancellation token.

pub mod events;
mod orchestrator;
pub mod queue;
pub mod records;
pub mod scheduler;
pub mod segmenter;
pub mod session;
pub mod sink;
mod streamer;
mod tts_worker;
pub mod turn;

#[cfg(test)]
pub(crate) mod test_support;

pub use events::ClientEvent;
pub use queue::PipelineQueue;
pub use records::{AudioChunk, Sentence};
pub use scheduler::SpeakerScheduler;
pub use segmenter::SentenceSegmenter;
pub use session::{Collaborators, ConversationSession};
pub use sink::{ClientSink, SinkError, SinkResult};
pub use streamer::StreamerControl;
pub use turn::{TurnRegistry, TurnState};
