//! Records flowing through the pipeline queues.
//!
//! Ownership of a record transfers through the queues: the orchestrator
//! produces [`Sentence`]s, the TTS worker consumes them and produces
//! [`AudioChunk`]s, the audio streamer consumes those. End-of-speaker is
//! marked on both queues by a sentinel record with `is_final = true` and an
//! empty payload.

use bytes::Bytes;

use crate::core::character::{Character, VoiceDescriptor};

/// One segmented sentence of a character's reply, or the speaker-final
/// sentinel when `is_final` is set.
#[derive(Debug, Clone)]
pub struct Sentence {
    /// Sentence text; empty for sentinels
    pub text: String,
    /// 0-based index within this character's reply
    pub sentence_index: usize,
    /// Identifier of the character reply this sentence belongs to
    pub message_id: String,
    pub character_id: String,
    pub character_name: String,
    /// Voice used to synthesize this sentence
    pub voice: VoiceDescriptor,
    /// 0-based order of this character within the turn
    pub speaker_index: usize,
    /// Turn the sentence belongs to; lets downstream stages recognize turn
    /// boundaries without any out-of-band signal
    pub turn: u64,
    /// Sentinel marker: no further sentences for this speaker in this turn
    pub is_final: bool,
}

impl Sentence {
    pub fn new(
        text: String,
        sentence_index: usize,
        message_id: &str,
        character: &Character,
        speaker_index: usize,
        turn: u64,
    ) -> Self {
        Self {
            text,
            sentence_index,
            message_id: message_id.to_string(),
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            voice: character.voice.clone(),
            speaker_index,
            turn,
            is_final: false,
        }
    }

    /// Speaker-final sentinel. `sentence_index` is the terminal index, one
    /// past the last real sentence.
    pub fn speaker_final(
        sentence_index: usize,
        message_id: &str,
        character: &Character,
        speaker_index: usize,
        turn: u64,
    ) -> Self {
        Self {
            text: String::new(),
            sentence_index,
            message_id: message_id.to_string(),
            character_id: character.id.clone(),
            character_name: character.name.clone(),
            voice: character.voice.clone(),
            speaker_index,
            turn,
            is_final: true,
        }
    }
}

/// One PCM chunk of a synthesized sentence, or the end-of-speaker sentinel
/// when `is_final` is set.
#[derive(Debug, Clone)]
pub struct AudioChunk {
    /// Sample-interleaved linear16 PCM; empty for sentinels
    pub payload: Bytes,
    /// Index of the sentence this chunk belongs to
    pub sentence_index: usize,
    /// 0-based index within the sentence
    pub chunk_index: usize,
    pub message_id: String,
    pub character_id: String,
    pub character_name: String,
    pub speaker_index: usize,
    /// Sample rate of the payload, surfaced in `audio_stream_start`
    pub sample_rate: u32,
    pub turn: u64,
    /// Sentinel marker: end of this speaker's audio stream
    pub is_final: bool,
}

impl AudioChunk {
    /// Wrap one PCM payload produced for `sentence`.
    pub fn from_sentence(sentence: &Sentence, chunk_index: usize, payload: Bytes) -> Self {
        Self {
            payload,
            sentence_index: sentence.sentence_index,
            chunk_index,
            message_id: sentence.message_id.clone(),
            character_id: sentence.character_id.clone(),
            character_name: sentence.character_name.clone(),
            speaker_index: sentence.speaker_index,
            sample_rate: sentence.voice.sample_rate,
            turn: sentence.turn,
            is_final: false,
        }
    }

    /// End-of-speaker sentinel derived from the sentence-queue sentinel.
    pub fn speaker_final(sentinel: &Sentence) -> Self {
        Self {
            payload: Bytes::new(),
            sentence_index: sentinel.sentence_index,
            chunk_index: 0,
            message_id: sentinel.message_id.clone(),
            character_id: sentinel.character_id.clone(),
            character_name: sentinel.character_name.clone(),
            speaker_index: sentinel.speaker_index,
            sample_rate: sentinel.voice.sample_rate,
            turn: sentinel.turn,
            is_final: true,
        }
    }
}
