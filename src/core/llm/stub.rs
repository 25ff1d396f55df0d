//! Scripted LLM stub for local development and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;

use super::{BaseLLM, LLMResult, ModelSettings, ReplyRequest, TokenStream};

/// LLM stub that replays canned replies as token streams.
///
/// Replies are keyed by character id; characters without a script get a
/// short default line. Tokens are emitted word by word so the sentence
/// segmenter sees realistic incremental fragments.
pub struct StubLLM {
    scripts: RwLock<HashMap<String, String>>,
    default_reply: String,
}

impl StubLLM {
    pub fn new() -> Self {
        Self {
            scripts: RwLock::new(HashMap::new()),
            default_reply: "I heard you.".to_string(),
        }
    }

    /// Register a canned reply for a character id.
    pub fn script(&self, character_id: &str, reply: &str) {
        self.scripts
            .write()
            .insert(character_id.to_string(), reply.to_string());
    }
}

impl Default for StubLLM {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl BaseLLM for StubLLM {
    async fn stream_reply(
        &self,
        request: ReplyRequest,
        _settings: &ModelSettings,
    ) -> LLMResult<TokenStream> {
        let reply = self
            .scripts
            .read()
            .get(&request.character.id)
            .cloned()
            .unwrap_or_else(|| self.default_reply.clone());

        // Split into word tokens, keeping the separating space on each token
        // so concatenation reproduces the reply exactly.
        let mut tokens: Vec<LLMResult<String>> = Vec::new();
        let mut rest = reply.as_str();
        while let Some(boundary) = rest.find(' ') {
            tokens.push(Ok(rest[..=boundary].to_string()));
            rest = &rest[boundary + 1..];
        }
        if !rest.is_empty() {
            tokens.push(Ok(rest.to_string()));
        }

        Ok(Box::pin(futures_util::stream::iter(tokens)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::character::Character;
    use futures_util::StreamExt;

    fn request_for(id: &str) -> ReplyRequest {
        ReplyRequest {
            character: Character {
                id: id.to_string(),
                name: id.to_string(),
                voice: Default::default(),
            },
            user_message: "hello".to_string(),
        }
    }

    #[tokio::test]
    async fn test_tokens_concatenate_to_script() {
        let llm = StubLLM::new();
        llm.script("ada", "Hi there. How are you?");

        let stream = llm
            .stream_reply(request_for("ada"), &ModelSettings::default())
            .await
            .unwrap();
        let tokens: Vec<String> = stream.map(|t| t.unwrap()).collect().await;

        assert!(tokens.len() > 1);
        assert_eq!(tokens.concat(), "Hi there. How are you?");
    }

    #[tokio::test]
    async fn test_unscripted_character_gets_default() {
        let llm = StubLLM::new();
        let stream = llm
            .stream_reply(request_for("brutus"), &ModelSettings::default())
            .await
            .unwrap();
        let tokens: Vec<String> = stream.map(|t| t.unwrap()).collect().await;
        assert_eq!(tokens.concat(), "I heard you.");
    }
}
