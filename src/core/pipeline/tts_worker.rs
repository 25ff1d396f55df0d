//! Synthesis worker: sentence queue in, audio queue out.
//!
//! One long-lived task per session. The worker knows nothing about turns —
//! it synthesizes whatever sentences arrive and passes end-of-speaker
//! sentinels through. Interrupts never stop or restart it; they only drain
//! the queues it reads and writes.

use std::sync::Arc;

use futures_util::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::core::tts::BaseTTS;

use super::queue::PipelineQueue;
use super::records::{AudioChunk, Sentence};

/// Consume sentences until the session ends.
pub(crate) async fn run_tts_worker(
    sentence_q: Arc<PipelineQueue<Sentence>>,
    audio_q: Arc<PipelineQueue<AudioChunk>>,
    tts: Arc<dyn BaseTTS>,
    cancel: CancellationToken,
) {
    debug!("tts worker started");
    loop {
        let sentence = tokio::select! {
            _ = cancel.cancelled() => break,
            sentence = sentence_q.get() => sentence,
        };

        if sentence.is_final {
            let sentinel = AudioChunk::speaker_final(&sentence);
            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = audio_q.put(sentinel) => {}
            }
            continue;
        }

        synthesize_sentence(&audio_q, tts.as_ref(), &sentence, &cancel).await;
    }
    debug!("tts worker exited");
}

/// Synthesize one sentence into the audio queue.
///
/// A failure is logged and the sentence dropped; the speaker's sentinel
/// still arrives separately from the orchestrator, so the stream downstream
/// stays well-formed.
async fn synthesize_sentence(
    audio_q: &PipelineQueue<AudioChunk>,
    tts: &dyn BaseTTS,
    sentence: &Sentence,
    cancel: &CancellationToken,
) {
    let mut stream = match tts.synthesize(&sentence.text, &sentence.voice).await {
        Ok(stream) => stream,
        Err(e) => {
            warn!(
                message_id = %sentence.message_id,
                sentence_index = sentence.sentence_index,
                error = %e,
                "synthesis failed; sentence skipped"
            );
            return;
        }
    };

    let mut chunk_index = 0;
    loop {
        let item = tokio::select! {
            _ = cancel.cancelled() => return,
            item = stream.next() => item,
        };
        match item {
            Some(Ok(payload)) => {
                if payload.is_empty() {
                    continue;
                }
                let chunk = AudioChunk::from_sentence(sentence, chunk_index, payload);
                chunk_index += 1;
                tokio::select! {
                    _ = cancel.cancelled() => return,
                    _ = audio_q.put(chunk) => {}
                }
            }
            Some(Err(e)) => {
                warn!(
                    message_id = %sentence.message_id,
                    sentence_index = sentence.sentence_index,
                    error = %e,
                    "synthesis stream failed; remainder of sentence skipped"
                );
                return;
            }
            None => return,
        }
    }
}
