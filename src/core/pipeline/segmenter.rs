//! Online sentence segmentation for streamed LLM output.
//!
//! The segmenter consumes incremental text fragments and yields complete
//! sentences as soon as a terminating punctuation boundary is confirmed. A
//! boundary needs trailing whitespace to be confirmed, so the final
//! sentence of a stream surfaces through [`SentenceSegmenter::flush`].
//! State is local to one character's reply; a fresh segmenter is used per
//! character.

/// Lowercased tokens whose trailing period does not end a sentence.
const ABBREVIATIONS: &[&str] = &[
    "mr", "mrs", "ms", "dr", "prof", "rev", "sr", "jr", "st", "mt", "vs", "etc", "e.g", "i.e",
    "inc", "ltd", "co", "no", "fig", "al", "approx", "a.m", "p.m", "u.s", "u.k",
];

/// Characters that terminate a sentence.
fn is_terminator(c: char) -> bool {
    matches!(c, '.' | '!' | '?' | '…')
}

/// Characters allowed to trail a terminator while staying in the sentence.
fn is_closer(c: char) -> bool {
    is_terminator(c) || matches!(c, '"' | '\'' | ')' | ']' | '\u{201d}' | '\u{2019}')
}

/// Incremental sentence segmenter.
#[derive(Debug, Default)]
pub struct SentenceSegmenter {
    buffer: String,
}

impl SentenceSegmenter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a text fragment and return any sentences completed by it.
    pub fn push(&mut self, fragment: &str) -> Vec<String> {
        self.buffer.push_str(fragment);

        let chars: Vec<char> = self.buffer.chars().collect();
        let mut sentences = Vec::new();
        let mut start = 0;
        let mut i = 0;

        while i < chars.len() {
            if !is_terminator(chars[i]) {
                i += 1;
                continue;
            }

            // Swallow the whole terminator/closer run ("...", ".\"", "?!").
            let mut end = i + 1;
            while end < chars.len() && is_closer(chars[end]) {
                end += 1;
            }

            // A boundary is only confirmed by following whitespace; at the
            // end of the buffer more text may still arrive.
            if end >= chars.len() || !chars[end].is_whitespace() {
                i = end;
                continue;
            }

            // An ellipsis trailed by a lowercase continuation stays inside
            // the sentence ("Well... maybe.").
            let ellipsis =
                chars[i] == '…' || chars[i..end].iter().filter(|c| **c == '.').count() >= 2;
            if ellipsis {
                match chars[end..].iter().find(|c| !c.is_whitespace()) {
                    None => {
                        // Continuation not seen yet; leave unconfirmed.
                        i = end;
                        continue;
                    }
                    Some(next) if next.is_lowercase() => {
                        i = end;
                        continue;
                    }
                    Some(_) => {}
                }
            }

            if boundary_allowed(&chars, i) {
                let sentence: String = chars[start..end].iter().collect();
                let sentence = sentence.trim().to_string();
                if !sentence.is_empty() {
                    sentences.push(sentence);
                }
                let mut next = end;
                while next < chars.len() && chars[next].is_whitespace() {
                    next += 1;
                }
                start = next;
                i = next;
            } else {
                i = end;
            }
        }

        self.buffer = chars[start..].iter().collect();
        sentences
    }

    /// Flush the trailing non-terminated text as the last sentence.
    pub fn flush(&mut self) -> Option<String> {
        let residue = std::mem::take(&mut self.buffer);
        let residue = residue.trim();
        if residue.is_empty() {
            None
        } else {
            Some(residue.to_string())
        }
    }
}

/// Whether the terminator at `dot` may end a sentence. Only periods carry
/// abbreviation and initial guards.
fn boundary_allowed(chars: &[char], dot: usize) -> bool {
    if chars[dot] != '.' {
        return true;
    }

    let mut token_start = dot;
    while token_start > 0 && !chars[token_start - 1].is_whitespace() {
        token_start -= 1;
    }
    let token: String = chars[token_start..dot]
        .iter()
        .collect::<String>()
        .to_lowercase();
    let token = token.trim_start_matches(|c: char| !c.is_alphanumeric());

    if ABBREVIATIONS.contains(&token) {
        return false;
    }
    // Single-letter initials such as "J. Smith".
    if token.chars().count() == 1 && token.chars().all(|c| c.is_alphabetic()) {
        return false;
    }
    true
}
