//! Turn orchestration: ingress queue in, sentence queue and text events out.
//!
//! One long-lived task per session drives the ingress FIFO. Each user
//! message becomes a turn: the addressed characters are resolved in mention
//! order, each character's reply is streamed from the LLM through the
//! sentence segmenter into the sentence queue, and the turn's cancellation
//! token is checked at every suspension point. The orchestrator never waits
//! for synthesis or streaming — those stages drain on their own — so the
//! next message is accepted as soon as the last speaker's sentinel is
//! enqueued.

use std::sync::Arc;

use futures_util::StreamExt;
use parking_lot::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::core::character::{Character, CharacterCatalog};
use crate::core::llm::{BaseLLM, ModelSettings, ReplyRequest};

use super::events::ClientEvent;
use super::queue::PipelineQueue;
use super::records::Sentence;
use super::segmenter::SentenceSegmenter;
use super::sink::{ClientSink, SinkError};
use super::turn::{TurnRegistry, TurnState};

/// Everything the orchestrator task needs from the session.
pub(crate) struct OrchestratorContext {
    pub ingress: Arc<PipelineQueue<String>>,
    pub sentences: Arc<PipelineQueue<Sentence>>,
    pub turns: Arc<TurnRegistry>,
    pub catalog: Arc<dyn CharacterCatalog>,
    pub llm: Arc<dyn BaseLLM>,
    pub sink: Arc<dyn ClientSink>,
    pub model_settings: Arc<RwLock<ModelSettings>>,
}

/// How one character's reply ended.
enum ReplyOutcome {
    Completed,
    Cancelled,
}

/// Consume user messages until the session ends.
pub(crate) async fn run_turn_orchestrator(ctx: OrchestratorContext, cancel: CancellationToken) {
    debug!("turn orchestrator started");
    loop {
        let message = tokio::select! {
            _ = cancel.cancelled() => break,
            message = ctx.ingress.get() => message,
        };

        if let Err(e) = run_turn(&ctx, &message).await {
            error!(error = %e, "client send failed; turn orchestrator stopping");
            break;
        }
    }
    debug!("turn orchestrator exited");
}

/// Drive one user message through a full turn.
async fn run_turn(ctx: &OrchestratorContext, message: &str) -> Result<(), SinkError> {
    let characters = ctx.catalog.parse_addressed(message).await;
    let (turn, turn_cancel) = ctx.turns.begin();
    ctx.turns.set_speaker_count(turn, characters.len());

    if characters.is_empty() {
        debug!(turn, "message addresses no characters");
        ctx.turns.set_state(turn, TurnState::Complete);
        return Ok(());
    }

    info!(turn, speakers = characters.len(), "turn started");
    for (speaker_index, character) in characters.iter().enumerate() {
        if turn_cancel.is_cancelled() {
            return Ok(());
        }
        let outcome =
            stream_character_reply(ctx, message, character, speaker_index, turn, &turn_cancel)
                .await?;
        if matches!(outcome, ReplyOutcome::Cancelled) {
            return Ok(());
        }
    }

    // All speakers enqueued; downstream stages drain on their own.
    ctx.turns.set_state(turn, TurnState::Tts);
    Ok(())
}

/// Stream one character's reply: LLM tokens → segmenter → sentence queue,
/// with text events mirrored to the client.
async fn stream_character_reply(
    ctx: &OrchestratorContext,
    message: &str,
    character: &Character,
    speaker_index: usize,
    turn: u64,
    turn_cancel: &CancellationToken,
) -> Result<ReplyOutcome, SinkError> {
    let message_id = Uuid::new_v4().to_string();
    ctx.sink
        .send_event(ClientEvent::TextStreamStart {
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            message_id: message_id.clone(),
        })
        .await?;

    let request = ReplyRequest {
        character: character.clone(),
        user_message: message.to_string(),
    };
    let settings = ctx.model_settings.read().clone();

    let mut segmenter = SentenceSegmenter::new();
    let mut full_text = String::new();
    let mut sentence_index = 0usize;

    match ctx.llm.stream_reply(request, &settings).await {
        Ok(mut stream) => loop {
            let item = tokio::select! {
                _ = turn_cancel.cancelled() => return Ok(ReplyOutcome::Cancelled),
                item = stream.next() => item,
            };
            match item {
                // An empty delta is the provider's end-of-reply signal.
                Some(Ok(delta)) if delta.is_empty() => break,
                Some(Ok(delta)) => {
                    full_text.push_str(&delta);
                    for text in segmenter.push(&delta) {
                        if !enqueue_sentence(
                            ctx,
                            text,
                            sentence_index,
                            &message_id,
                            character,
                            speaker_index,
                            turn,
                            turn_cancel,
                        )
                        .await?
                        {
                            return Ok(ReplyOutcome::Cancelled);
                        }
                        sentence_index += 1;
                    }
                }
                Some(Err(e)) => {
                    warn!(
                        turn,
                        character = %character.id,
                        error = %e,
                        "token stream failed; reply truncated"
                    );
                    break;
                }
                None => break,
            }
        },
        Err(e) => {
            warn!(
                turn,
                character = %character.id,
                error = %e,
                "reply request failed; reply truncated"
            );
        }
    }

    if let Some(residue) = segmenter.flush() {
        if !enqueue_sentence(
            ctx,
            residue,
            sentence_index,
            &message_id,
            character,
            speaker_index,
            turn,
            turn_cancel,
        )
        .await?
        {
            return Ok(ReplyOutcome::Cancelled);
        }
        sentence_index += 1;
    }

    // Speaker-final sentinel closes this speaker on the sentence queue.
    let sentinel = Sentence::speaker_final(sentence_index, &message_id, character, speaker_index, turn);
    tokio::select! {
        _ = turn_cancel.cancelled() => return Ok(ReplyOutcome::Cancelled),
        _ = ctx.sentences.put(sentinel) => {}
    }

    ctx.sink
        .send_event(ClientEvent::TextChunk {
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            message_id: message_id.clone(),
            text: String::new(),
            is_final: true,
        })
        .await?;
    ctx.sink
        .send_event(ClientEvent::TextStreamStop {
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            message_id,
            text: full_text,
        })
        .await?;

    Ok(ReplyOutcome::Completed)
}

/// Enqueue one sentence and mirror it to the client. Returns `false` when
/// the turn was cancelled while waiting for queue space.
#[allow(clippy::too_many_arguments)]
async fn enqueue_sentence(
    ctx: &OrchestratorContext,
    text: String,
    sentence_index: usize,
    message_id: &str,
    character: &Character,
    speaker_index: usize,
    turn: u64,
    turn_cancel: &CancellationToken,
) -> Result<bool, SinkError> {
    let sentence = Sentence::new(
        text.clone(),
        sentence_index,
        message_id,
        character,
        speaker_index,
        turn,
    );
    tokio::select! {
        _ = turn_cancel.cancelled() => return Ok(false),
        _ = ctx.sentences.put(sentence) => {}
    }

    ctx.sink
        .send_event(ClientEvent::TextChunk {
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            message_id: message_id.to_string(),
            text,
            is_final: false,
        })
        .await?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::character::StaticCatalog;
    use crate::core::llm::{LLMResult, StubLLM, TokenStream};
    use crate::core::pipeline::test_support::RecordingSink;
    use async_trait::async_trait;
    use std::time::Duration;

    struct Fixture {
        ctx: OrchestratorContext,
        sink: Arc<RecordingSink>,
    }

    fn fixture(catalog: StaticCatalog, llm: Arc<dyn BaseLLM>) -> Fixture {
        let sink = Arc::new(RecordingSink::new());
        Fixture {
            ctx: OrchestratorContext {
                ingress: Arc::new(PipelineQueue::new(32)),
                sentences: Arc::new(PipelineQueue::new(64)),
                turns: Arc::new(TurnRegistry::new()),
                catalog: Arc::new(catalog),
                llm,
                sink: sink.clone(),
                model_settings: Arc::new(RwLock::new(ModelSettings::default())),
            },
            sink,
        }
    }

    fn drain_sentences(queue: &PipelineQueue<Sentence>) -> Vec<Sentence> {
        let mut sentences = Vec::new();
        while let Some(sentence) = queue.try_get() {
            sentences.push(sentence);
        }
        sentences
    }

    #[tokio::test]
    async fn test_zero_characters_is_a_noop_turn() {
        let f = fixture(StaticCatalog::with_names(&["Ada"]), Arc::new(StubLLM::new()));

        run_turn(&f.ctx, "nobody mentioned").await.unwrap();

        assert!(f.sink.events().is_empty());
        assert!(f.ctx.sentences.is_empty());
        assert_eq!(f.ctx.turns.state(), TurnState::Idle);
        assert_eq!(
            f.ctx.turns.last_turn().map(|(_, s)| s),
            Some(TurnState::Complete)
        );
    }

    #[tokio::test]
    async fn test_single_speaker_three_sentences() {
        let llm = Arc::new(StubLLM::new());
        llm.script("ada", "Hi. How are you? Bye.");
        let f = fixture(StaticCatalog::with_names(&["Ada"]), llm);

        run_turn(&f.ctx, "hello Ada").await.unwrap();

        let types = f.sink.event_types();
        assert_eq!(
            types,
            vec![
                "text_stream_start",
                "text_chunk",
                "text_chunk",
                "text_chunk",
                "text_chunk", // is_final
                "text_stream_stop",
            ]
        );
        match f.sink.events().last().unwrap() {
            ClientEvent::TextStreamStop { text, .. } => {
                assert_eq!(text, "Hi. How are you? Bye.")
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let sentences = drain_sentences(&f.ctx.sentences);
        assert_eq!(sentences.len(), 4);
        let indices: Vec<usize> = sentences.iter().map(|s| s.sentence_index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3]);
        assert!(sentences.last().unwrap().is_final);
        assert!(sentences[..3].iter().all(|s| !s.is_final));
        assert!(sentences.iter().all(|s| s.speaker_index == 0));

        assert_eq!(f.ctx.turns.state(), TurnState::Tts);
    }

    #[tokio::test]
    async fn test_speakers_ordered_and_fully_sequential() {
        let llm = Arc::new(StubLLM::new());
        llm.script("ada", "First reply.");
        llm.script("brutus", "Second reply.");
        let f = fixture(StaticCatalog::with_names(&["Ada", "Brutus"]), llm);

        run_turn(&f.ctx, "Brutus then Ada please").await.unwrap();

        let sentences = drain_sentences(&f.ctx.sentences);
        // Mention order: Brutus is speaker 0.
        let speakers: Vec<(usize, bool)> = sentences
            .iter()
            .map(|s| (s.speaker_index, s.is_final))
            .collect();
        assert_eq!(
            speakers,
            vec![(0, false), (0, true), (1, false), (1, true)]
        );
        assert_eq!(sentences[0].character_id, "brutus");
        assert_eq!(sentences[2].character_id, "ada");

        // Distinct message ids per speaker.
        assert_ne!(sentences[0].message_id, sentences[2].message_id);
    }

    #[tokio::test]
    async fn test_empty_reply_still_closes_speaker() {
        let llm = Arc::new(StubLLM::new());
        llm.script("ada", "");
        let f = fixture(StaticCatalog::with_names(&["Ada"]), llm);

        run_turn(&f.ctx, "Ada?").await.unwrap();

        let types = f.sink.event_types();
        assert_eq!(
            types,
            vec!["text_stream_start", "text_chunk", "text_stream_stop"]
        );
        match &f.sink.events()[1] {
            ClientEvent::TextChunk { text, is_final, .. } => {
                assert!(text.is_empty());
                assert!(*is_final);
            }
            other => panic!("unexpected event: {other:?}"),
        }

        let sentences = drain_sentences(&f.ctx.sentences);
        assert_eq!(sentences.len(), 1);
        assert!(sentences[0].is_final);
        assert_eq!(sentences[0].sentence_index, 0);
    }

    /// LLM whose stream never yields, for cancellation tests.
    struct PendingLLM;

    #[async_trait]
    impl BaseLLM for PendingLLM {
        async fn stream_reply(
            &self,
            _request: ReplyRequest,
            _settings: &ModelSettings,
        ) -> LLMResult<TokenStream> {
            Ok(Box::pin(futures_util::stream::pending()))
        }
    }

    #[tokio::test]
    async fn test_cancellation_abandons_current_character() {
        let f = fixture(StaticCatalog::with_names(&["Ada"]), Arc::new(PendingLLM));
        let turns = f.ctx.turns.clone();

        let handle = tokio::spawn(async move {
            run_turn(&f.ctx, "Ada, talk forever").await.unwrap();
            f
        });

        // Let the orchestrator reach the token await, then cancel the turn.
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_eq!(turns.state(), TurnState::Llm);
        assert!(turns.cancel_current());

        let f = tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .expect("cancelled turn should return promptly")
            .unwrap();

        // The abandoned character got its start event but no stop, no
        // sentinel, and no sentences.
        assert_eq!(f.sink.event_types(), vec!["text_stream_start"]);
        assert!(f.ctx.sentences.is_empty());
    }

    #[tokio::test]
    async fn test_failed_reply_request_truncates_and_continues() {
        struct FailingLLM;

        #[async_trait]
        impl BaseLLM for FailingLLM {
            async fn stream_reply(
                &self,
                _request: ReplyRequest,
                _settings: &ModelSettings,
            ) -> LLMResult<TokenStream> {
                Err(crate::core::llm::LLMError::ProviderError(
                    "unavailable".to_string(),
                ))
            }
        }

        let f = fixture(StaticCatalog::with_names(&["Ada", "Brutus"]), Arc::new(FailingLLM));
        run_turn(&f.ctx, "Ada and Brutus").await.unwrap();

        // Both speakers get truncated-but-well-formed streams and sentinels.
        let types = f.sink.event_types();
        assert_eq!(
            types,
            vec![
                "text_stream_start",
                "text_chunk",
                "text_stream_stop",
                "text_stream_start",
                "text_chunk",
                "text_stream_stop",
            ]
        );
        let sentences = drain_sentences(&f.ctx.sentences);
        assert_eq!(sentences.len(), 2);
        assert!(sentences.iter().all(|s| s.is_final));
    }
}
