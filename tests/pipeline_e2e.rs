//! End-to-end pipeline scenarios over the public session API.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::{Mutex, RwLock};

use polyvox::core::character::{StaticCatalog, VoiceDescriptor};
use polyvox::core::llm::StubLLM;
use polyvox::core::pipeline::{
    ClientEvent, ClientSink, Collaborators, ConversationSession, SinkResult, TurnState,
};
use polyvox::core::tts::{BaseTTS, PcmStream, StubTTS, TTSResult};

/// Sink recording every frame, for assertions on emission order.
#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<ClientEvent>>,
    binary: Mutex<usize>,
}

impl RecordingSink {
    fn new() -> Self {
        Self::default()
    }

    fn events(&self) -> Vec<ClientEvent> {
        self.events.lock().clone()
    }

    fn count<F: Fn(&ClientEvent) -> bool>(&self, predicate: F) -> usize {
        self.events.lock().iter().filter(|e| predicate(e)).count()
    }

    async fn wait_for<F: Fn(&[ClientEvent]) -> bool>(&self, predicate: F, what: &str) {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
        loop {
            if predicate(self.events.lock().as_slice()) {
                return;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for {what}"
            );
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    }
}

#[async_trait]
impl ClientSink for RecordingSink {
    async fn send_event(&self, event: ClientEvent) -> SinkResult {
        self.events.lock().push(event);
        Ok(())
    }

    async fn send_binary(&self, _payload: Bytes) -> SinkResult {
        *self.binary.lock() += 1;
        Ok(())
    }
}

/// TTS wrapper that delays synthesis of configured texts.
struct DelayTTS {
    inner: StubTTS,
    delays: RwLock<Vec<(String, Duration)>>,
}

impl DelayTTS {
    fn new() -> Self {
        Self {
            inner: StubTTS::new(),
            delays: RwLock::new(Vec::new()),
        }
    }

    fn delay(&self, text: &str, duration: Duration) {
        self.delays.write().push((text.to_string(), duration));
    }
}

#[async_trait]
impl BaseTTS for DelayTTS {
    async fn synthesize(&self, text: &str, voice: &VoiceDescriptor) -> TTSResult<PcmStream> {
        let delay = self
            .delays
            .read()
            .iter()
            .find(|(t, _)| t == text)
            .map(|(_, d)| *d);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.inner.synthesize(text, voice).await
    }
}

fn spawn_session_with(
    names: &[&str],
    scripts: &[(&str, &str)],
    tts: Arc<dyn BaseTTS>,
) -> (Arc<ConversationSession>, Arc<RecordingSink>) {
    let llm = StubLLM::new();
    for (id, script) in scripts {
        llm.script(id, script);
    }
    let sink = Arc::new(RecordingSink::new());
    let session = ConversationSession::spawn(
        Collaborators {
            catalog: Arc::new(StaticCatalog::with_names(names)),
            llm: Arc::new(llm),
            tts,
        },
        sink.clone(),
    );
    (session, sink)
}

async fn wait_for_complete(session: &ConversationSession) {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while session.turns().last_turn().map(|(_, s)| s) != Some(TurnState::Complete) {
        assert!(
            tokio::time::Instant::now() < deadline,
            "turn did not complete"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

fn event_type(event: &ClientEvent) -> &'static str {
    match event {
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
    }
}

/// Scenario: single speaker, three sentences.
#[tokio::test]
async fn test_single_speaker_three_sentences() {
    let (session, sink) = spawn_session_with(
        &["Ada"],
        &[("ada", "Hi. How are you? Bye.")],
        Arc::new(StubTTS::new()),
    );

    session.accept_user_message("hello Ada");
    wait_for_complete(&session).await;

    let events = sink.events();

    // Text side: start, 3 content chunks, final chunk, stop with full text.
    let text_types: Vec<_> = events
        .iter()
        .filter(|e| event_type(e).starts_with("text"))
        .map(event_type)
        .collect();
    assert_eq!(
        text_types,
        vec![
            "text_stream_start",
            "text_chunk",
            "text_chunk",
            "text_chunk",
            "text_chunk",
            "text_stream_stop",
        ]
    );
    let stop_text = events.iter().find_map(|e| match e {
        ClientEvent::TextStreamStop { text, .. } => Some(text.clone()),
        _ => None,
    });
    assert_eq!(stop_text.as_deref(), Some("Hi. How are you? Bye."));

    // Audio side: one start, chunks with lexicographic ordering, one stop.
    assert_eq!(
        sink.count(|e| matches!(e, ClientEvent::AudioStreamStart { .. })),
        1
    );
    assert_eq!(
        sink.count(|e| matches!(e, ClientEvent::AudioStreamStop { .. })),
        1
    );
    match events
        .iter()
        .find(|e| matches!(e, ClientEvent::AudioStreamStart { .. }))
        .unwrap()
    {
        ClientEvent::AudioStreamStart {
            speaker_index,
            sample_rate,
            ..
        } => {
            assert_eq!(*speaker_index, 0);
            assert_eq!(*sample_rate, 24000);
        }
        _ => unreachable!(),
    }

    let audio_keys: Vec<(usize, usize)> = events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::AudioChunk {
                sentence_index,
                chunk_index,
                ..
            } => Some((*sentence_index, *chunk_index)),
            _ => None,
        })
        .collect();
    assert!(!audio_keys.is_empty());
    assert_eq!(audio_keys[0], (0, 0));
    for window in audio_keys.windows(2) {
        assert!(window[1] > window[0]);
    }

    // One message id scopes every event of the turn.
    let ids: std::collections::BTreeSet<_> = events
        .iter()
        .filter_map(|e| e.message_id().map(str::to_string))
        .collect();
    assert_eq!(ids.len(), 1);

    session.shutdown().await;
}

/// Scenario: two speakers; slow synthesis for A must not let B overtake.
#[tokio::test]
async fn test_two_speakers_stay_ordered_under_slow_synthesis() {
    let tts = Arc::new(DelayTTS::new());
    tts.delay("Second thought.", Duration::from_millis(300));
    let (session, sink) = spawn_session_with(
        &["Ada", "Brutus"],
        &[
            ("ada", "First thought. Second thought."),
            ("brutus", "Quick answer."),
        ],
        tts,
    );

    session.accept_user_message("Ada and Brutus, discuss");
    wait_for_complete(&session).await;

    let events = sink.events();
    let audio_speakers: Vec<usize> = events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::AudioStreamStart { speaker_index, .. }
            | ClientEvent::AudioChunk { speaker_index, .. }
            | ClientEvent::AudioStreamStop { speaker_index, .. } => Some(*speaker_index),
            _ => None,
        })
        .collect();

    // All of speaker 0's audio events precede all of speaker 1's.
    let first_b = audio_speakers.iter().position(|s| *s == 1).unwrap();
    assert!(audio_speakers[..first_b].iter().all(|s| *s == 0));
    assert!(audio_speakers[first_b..].iter().all(|s| *s == 1));

    // stop(0) strictly before start(1).
    let stop0 = events
        .iter()
        .position(|e| matches!(e, ClientEvent::AudioStreamStop { speaker_index: 0, .. }))
        .unwrap();
    let start1 = events
        .iter()
        .position(
            |e| matches!(e, ClientEvent::AudioStreamStart { speaker_index: 1, .. }),
        )
        .unwrap();
    assert!(stop0 < start1);

    session.shutdown().await;
}

/// Scenario: interrupt mid-first-speaker.
#[tokio::test]
async fn test_interrupt_mid_speaker() {
    let tts = Arc::new(DelayTTS::new());
    // Slow second sentence keeps the turn in flight while we interrupt.
    tts.delay("Second sentence takes a while.", Duration::from_millis(500));
    let (session, sink) = spawn_session_with(
        &["Ada"],
        &[("ada", "First sentence. Second sentence takes a while.")],
        tts,
    );

    session.accept_user_message("hello Ada");
    sink.wait_for(
        |events| {
            events
                .iter()
                .any(|e| matches!(e, ClientEvent::AudioChunk { .. }))
        },
        "first audio chunk",
    )
    .await;

    session.interrupt().await;
    let ack_index = sink
        .events()
        .iter()
        .position(|e| matches!(e, ClientEvent::InterruptAck {}))
        .expect("interrupt ack emitted");

    // Give any stale pipeline output time to surface, then verify silence.
    tokio::time::sleep(Duration::from_millis(700)).await;
    let events = sink.events();
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, ClientEvent::InterruptAck {}))
            .count(),
        1
    );
    let cancelled_ids: std::collections::BTreeSet<_> = events[..ack_index]
        .iter()
        .filter_map(|e| e.message_id().map(str::to_string))
        .collect();
    for event in &events[ack_index + 1..] {
        if let Some(id) = event.message_id() {
            assert!(
                !cancelled_ids.contains(id),
                "event for cancelled turn after ack: {event:?}"
            );
        }
    }
    assert_eq!(session.queue_depths(), (0, 0, 0));
    assert_eq!(
        session.turns().last_turn().map(|(_, s)| s),
        Some(TurnState::Cancelled)
    );

    // A fresh message is processed normally, starting at speaker 0.
    let before = sink.events().len();
    session.accept_user_message("hello again Ada");
    wait_for_complete(&session).await;
    let events = sink.events();
    let new_start = events[before..]
        .iter()
        .find(|e| matches!(e, ClientEvent::AudioStreamStart { .. }))
        .expect("new turn produced audio");
    match new_start {
        ClientEvent::AudioStreamStart { speaker_index, .. } => assert_eq!(*speaker_index, 0),
        _ => unreachable!(),
    }

    session.shutdown().await;
}

/// Scenario: a character with an empty reply still closes its audio slot.
#[tokio::test]
async fn test_empty_reply_speaker_still_advances() {
    let (session, sink) = spawn_session_with(
        &["Ada", "Brutus"],
        &[("ada", ""), ("brutus", "I have plenty to say.")],
        Arc::new(StubTTS::new()),
    );

    session.accept_user_message("Ada then Brutus");
    wait_for_complete(&session).await;

    let events = sink.events();

    // Ada (speaker 0): no audio_stream_start, exactly one audio_stream_stop.
    assert_eq!(
        sink.count(
            |e| matches!(e, ClientEvent::AudioStreamStart { speaker_index: 0, .. })
        ),
        0
    );
    assert_eq!(
        sink.count(
            |e| matches!(e, ClientEvent::AudioStreamStop { speaker_index: 0, .. })
        ),
        1
    );

    // Brutus (speaker 1) streams normally, after Ada's stop.
    let stop0 = events
        .iter()
        .position(|e| matches!(e, ClientEvent::AudioStreamStop { speaker_index: 0, .. }))
        .unwrap();
    let start1 = events
        .iter()
        .position(
            |e| matches!(e, ClientEvent::AudioStreamStart { speaker_index: 1, .. }),
        )
        .unwrap();
    assert!(stop0 < start1);

    // Ada's text lifecycle is still complete: start, final chunk, stop.
    let ada_text: Vec<&ClientEvent> = events
        .iter()
        .filter(|e| {
            matches!(
                e,
                ClientEvent::TextStreamStart { character_id, .. }
                | ClientEvent::TextChunk { character_id, .. }
                | ClientEvent::TextStreamStop { character_id, .. }
                if character_id == "ada"
            )
        })
        .collect();
    assert_eq!(ada_text.len(), 3);

    session.shutdown().await;
}

/// Scenario: a message addressing nobody is a no-op turn.
#[tokio::test]
async fn test_zero_character_address() {
    let (session, sink) = spawn_session_with(
        &["Ada"],
        &[("ada", "Never spoken.")],
        Arc::new(StubTTS::new()),
    );

    session.accept_user_message("talking to the void");
    wait_for_complete(&session).await;

    assert!(sink.events().is_empty());
    assert_eq!(session.turns().state(), TurnState::Idle);

    session.shutdown().await;
}

/// Per-message_id lifecycle pairing across a multi-speaker turn.
#[tokio::test]
async fn test_one_start_stop_pair_per_message_id() {
    let (session, sink) = spawn_session_with(
        &["Ada", "Brutus"],
        &[("ada", "One. Two."), ("brutus", "Three.")],
        Arc::new(StubTTS::new()),
    );

    session.accept_user_message("Ada, Brutus");
    wait_for_complete(&session).await;

    let events = sink.events();
    let ids: std::collections::BTreeSet<_> = events
        .iter()
        .filter_map(|e| match e {
            ClientEvent::AudioStreamStart { message_id, .. } => Some(message_id.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(ids.len(), 2);

    for id in ids {
        let starts = sink.count(|e| {
            matches!(e, ClientEvent::AudioStreamStart { message_id, .. } if *message_id == id)
        });
        let stops = sink.count(|e| {
            matches!(e, ClientEvent::AudioStreamStop { message_id, .. } if *message_id == id)
        });
        assert_eq!((starts, stops), (1, 1));

        let start = events
            .iter()
            .position(|e| {
                matches!(e, ClientEvent::AudioStreamStart { message_id, .. } if *message_id == id)
            })
            .unwrap();
        let stop = events
            .iter()
            .position(|e| {
                matches!(e, ClientEvent::AudioStreamStop { message_id, .. } if *message_id == id)
            })
            .unwrap();
        assert!(start < stop);
    }

    session.shutdown().await;
}
