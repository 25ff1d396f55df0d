//! Conversation session: owns the pipeline queues, the long-lived worker
//! tasks, and the interrupt/shutdown protocol.
//!
//! One session exists per client connection. The three queues live for the
//! whole session and are never closed; interrupts drain them and cancel the
//! current turn, while the workers keep looping. Disconnect additionally
//! cancels the workers with a bounded grace period.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::core::character::CharacterCatalog;
use crate::core::llm::{BaseLLM, ModelSettings};
use crate::core::stt::TranscriptionEvent;
use crate::core::tts::BaseTTS;

use super::events::ClientEvent;
use super::orchestrator::{OrchestratorContext, run_turn_orchestrator};
use super::queue::PipelineQueue;
use super::records::{AudioChunk, Sentence};
use super::sink::ClientSink;
use super::streamer::{StreamerControl, run_audio_streamer};
use super::tts_worker::run_tts_worker;
use super::turn::TurnRegistry;

/// Ingress queue capacity (finalized user messages).
const INGRESS_QUEUE_CAPACITY: usize = 32;
/// Sentence queue capacity; paces the orchestrator against synthesis.
const SENTENCE_QUEUE_CAPACITY: usize = 64;
/// Audio queue capacity; paces synthesis against client delivery.
const AUDIO_QUEUE_CAPACITY: usize = 128;
/// Grace period for worker tasks on disconnect.
const GRACEFUL_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// External collaborators a session is wired with.
pub struct Collaborators {
    pub catalog: Arc<dyn CharacterCatalog>,
    pub llm: Arc<dyn BaseLLM>,
    pub tts: Arc<dyn BaseTTS>,
}

struct WorkerHandle {
    name: &'static str,
    monitor: JoinHandle<()>,
}

/// One client's conversation streaming pipeline.
pub struct ConversationSession {
    ingress: Arc<PipelineQueue<String>>,
    sentences: Arc<PipelineQueue<Sentence>>,
    audio: Arc<PipelineQueue<AudioChunk>>,
    turns: Arc<TurnRegistry>,
    control: Arc<StreamerControl>,
    model_settings: Arc<RwLock<ModelSettings>>,
    sink: Arc<dyn ClientSink>,
    cancel: CancellationToken,
    workers: Mutex<Vec<WorkerHandle>>,
}

impl ConversationSession {
    /// Create the queues and spawn the three pipeline workers.
    ///
    /// Must be called from within a tokio runtime.
    pub fn spawn(collaborators: Collaborators, sink: Arc<dyn ClientSink>) -> Arc<Self> {
        let ingress = Arc::new(PipelineQueue::new(INGRESS_QUEUE_CAPACITY));
        let sentences = Arc::new(PipelineQueue::new(SENTENCE_QUEUE_CAPACITY));
        let audio = Arc::new(PipelineQueue::new(AUDIO_QUEUE_CAPACITY));
        let turns = Arc::new(TurnRegistry::new());
        let control = Arc::new(StreamerControl::new());
        let model_settings = Arc::new(RwLock::new(ModelSettings::default()));
        let cancel = CancellationToken::new();

        let orchestrator = run_turn_orchestrator(
            OrchestratorContext {
                ingress: ingress.clone(),
                sentences: sentences.clone(),
                turns: turns.clone(),
                catalog: collaborators.catalog,
                llm: collaborators.llm,
                sink: sink.clone(),
                model_settings: model_settings.clone(),
            },
            cancel.clone(),
        );
        let tts_worker = run_tts_worker(
            sentences.clone(),
            audio.clone(),
            collaborators.tts,
            cancel.clone(),
        );
        let streamer = run_audio_streamer(
            audio.clone(),
            sink.clone(),
            control.clone(),
            turns.clone(),
            cancel.clone(),
        );

        let workers = vec![
            spawn_worker("turn_orchestrator", orchestrator, &turns, &cancel),
            spawn_worker("tts_worker", tts_worker, &turns, &cancel),
            spawn_worker("audio_streamer", streamer, &turns, &cancel),
        ];

        info!("conversation session started");
        Arc::new(Self {
            ingress,
            sentences,
            audio,
            turns,
            control,
            model_settings,
            sink,
            cancel,
            workers: Mutex::new(workers),
        })
    }

    /// Accept a finalized user message into the ingress queue.
    ///
    /// Non-blocking by design: the STT callback must never stall. Empty and
    /// whitespace-only messages are dropped at this boundary.
    pub fn accept_user_message(&self, text: &str) {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            debug!("dropping empty user message");
            return;
        }
        if self.ingress.try_put(trimmed.to_string()).is_err() {
            warn!("ingress queue full; dropping user message");
        }
    }

    /// Pass a transcription event through to the client; a finished
    /// transcript also opens a turn.
    pub async fn handle_transcription(&self, event: TranscriptionEvent) {
        let client_event = match &event {
            TranscriptionEvent::Update(text) => {
                ClientEvent::TranscriptionUpdate { text: text.clone() }
            }
            TranscriptionEvent::Stabilized(text) => {
                ClientEvent::TranscriptionStabilized { text: text.clone() }
            }
            TranscriptionEvent::Finished(text) => {
                ClientEvent::TranscriptionFinished { text: text.clone() }
            }
        };
        if let Err(e) = self.sink.send_event(client_event).await {
            warn!(error = %e, "failed to forward transcription event");
            return;
        }
        if let TranscriptionEvent::Finished(text) = event {
            self.accept_user_message(&text);
        }
    }

    /// Client barge-in: cancel the current turn, empty the pipeline, reset
    /// the streamer, acknowledge.
    ///
    /// The queues are drained synchronously before the ack is sent, so no
    /// frame of the cancelled turn can follow the ack.
    pub async fn interrupt(&self) {
        let cancelled = self.turns.cancel_current();
        let dropped =
            self.ingress.drain() + self.sentences.drain() + self.audio.drain();
        // Everything up to and including the latest turn is now dead; late
        // synthesis output for it must not reach the client.
        let dead_turn = self.turns.last_turn().map(|(n, _)| n).unwrap_or(0);
        self.control.request_reset(dead_turn);
        debug!(cancelled, dropped, "interrupt: pipeline drained");

        if let Err(e) = self.sink.send_event(ClientEvent::InterruptAck {}).await {
            warn!(error = %e, "failed to deliver interrupt ack");
        }
    }

    /// Store generation settings for subsequent turns.
    pub fn set_model_settings(&self, settings: ModelSettings) {
        *self.model_settings.write() = settings;
    }

    /// Let the current speaker finish silently (courtesy barge-in). Not
    /// triggered by any default handler; exposed for external policies.
    pub fn suppress_current_speaker(&self) {
        self.control.suppress_audio();
    }

    /// Turn lifecycle observability.
    pub fn turns(&self) -> &TurnRegistry {
        &self.turns
    }

    /// Current occupancy of (ingress, sentence, audio) queues.
    pub fn queue_depths(&self) -> (usize, usize, usize) {
        (
            self.ingress.len(),
            self.sentences.len(),
            self.audio.len(),
        )
    }

    /// Disconnect teardown: interrupt semantics plus worker cancellation
    /// with a grace period. Workers that fail to stop are logged as leaks.
    pub async fn shutdown(&self) {
        info!("conversation session shutting down");
        self.turns.cancel_current();
        self.ingress.drain();
        self.sentences.drain();
        self.audio.drain();
        self.cancel.cancel();

        let workers = std::mem::take(&mut *self.workers.lock());
        for mut worker in workers {
            match timeout(GRACEFUL_SHUTDOWN_TIMEOUT, &mut worker.monitor).await {
                Ok(_) => debug!(task = worker.name, "worker stopped"),
                Err(_) => {
                    warn!(task = worker.name, "worker did not stop in time; leaked");
                    worker.monitor.abort();
                }
            }
        }
    }
}

/// Spawn a worker with crash monitoring: a panicking worker is logged with
/// its task name and the turn state at crash time, and takes the session's
/// cancellation token down with it.
fn spawn_worker(
    name: &'static str,
    fut: impl Future<Output = ()> + Send + 'static,
    turns: &Arc<TurnRegistry>,
    cancel: &CancellationToken,
) -> WorkerHandle {
    let inner = tokio::spawn(fut);
    let turns = turns.clone();
    let cancel = cancel.clone();
    let monitor = tokio::spawn(async move {
        match inner.await {
            Ok(()) => debug!(task = name, "worker finished"),
            Err(e) if e.is_panic() => {
                error!(task = name, state = ?turns.state(), "worker task crashed");
                cancel.cancel();
            }
            Err(_) => debug!(task = name, "worker aborted"),
        }
    });
    WorkerHandle { name, monitor }
}
