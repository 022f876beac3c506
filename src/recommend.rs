//! Workout recommendations
//!
//! A [`Recommender`] turns a session summary (see [`crate::summary`]) into a
//! suggestion for the next workout. The default backend talks to a local
//! OpenAI-compatible chat completion server.

use crate::error::ComputeError;

/// Trait for recommendation backends
pub trait Recommender {
    /// Suggest the next workout for a session summary
    fn suggest(&self, summary: &str) -> Result<String, ComputeError>;
}

/// Text after the first case-insensitive occurrence of `tag`, trimmed.
///
/// Returns an empty string when the tag does not occur.
pub fn extract_text_after_tag(text: &str, tag: &str) -> String {
    if tag.is_empty() {
        return text.trim().to_string();
    }
    // ASCII lowercasing keeps byte offsets aligned with `text`
    let haystack = text.to_ascii_lowercase();
    let needle = tag.to_ascii_lowercase();
    match haystack.find(&needle) {
        Some(pos) => text[pos + needle.len()..].trim().to_string(),
        None => String::new(),
    }
}

/// Reasoning models wrap their scratchpad in think tags; keep only the answer
#[cfg_attr(not(feature = "llm"), allow(dead_code))]
fn strip_reasoning(content: &str) -> String {
    let answer = extract_text_after_tag(content, "</think>");
    if answer.is_empty() {
        content.trim().to_string()
    } else {
        answer
    }
}

#[cfg(feature = "llm")]
pub use llm::LocalLlmClient;

#[cfg(feature = "llm")]
mod llm {
    use serde::{Deserialize, Serialize};
    use std::time::Duration;
    use tracing::debug;
    use ureq::Agent;

    use super::{strip_reasoning, Recommender};
    use crate::config::RecommenderConfig;
    use crate::error::ComputeError;

    #[derive(Debug, Serialize)]
    struct ChatRequest<'a> {
        model: &'a str,
        messages: Vec<ChatMessage<'a>>,
        temperature: f32,
        max_tokens: u32,
    }

    #[derive(Debug, Serialize)]
    struct ChatMessage<'a> {
        role: &'a str,
        content: &'a str,
    }

    #[derive(Debug, Deserialize)]
    struct ChatResponse {
        #[serde(default)]
        choices: Vec<ChatChoice>,
    }

    #[derive(Debug, Deserialize)]
    struct ChatChoice {
        message: ChatReply,
    }

    #[derive(Debug, Deserialize)]
    struct ChatReply {
        #[serde(default)]
        content: String,
    }

    /// Blocking client for a local OpenAI-compatible chat completion server
    pub struct LocalLlmClient {
        agent: Agent,
        config: RecommenderConfig,
    }

    impl LocalLlmClient {
        pub fn new(config: RecommenderConfig) -> Self {
            let agent = ureq::AgentBuilder::new()
                .timeout(Duration::from_secs(config.timeout_seconds))
                .build();
            Self { agent, config }
        }

        pub fn config(&self) -> &RecommenderConfig {
            &self.config
        }
    }

    impl Default for LocalLlmClient {
        fn default() -> Self {
            Self::new(RecommenderConfig::default())
        }
    }

    impl Recommender for LocalLlmClient {
        fn suggest(&self, summary: &str) -> Result<String, ComputeError> {
            let request = ChatRequest {
                model: &self.config.model,
                messages: vec![
                    ChatMessage {
                        role: "system",
                        content: &self.config.system_prompt,
                    },
                    ChatMessage {
                        role: "user",
                        content: summary,
                    },
                ],
                temperature: self.config.temperature,
                max_tokens: self.config.max_tokens,
            };

            debug!(endpoint = %self.config.endpoint, model = %self.config.model, "requesting suggestion");

            let response = self
                .agent
                .post(&self.config.endpoint)
                .send_json(&request)
                .map_err(|e| {
                    ComputeError::RecommendationError(format!(
                        "request to '{}' failed: {}",
                        self.config.endpoint, e
                    ))
                })?;

            let body: ChatResponse = response.into_json().map_err(|e| {
                ComputeError::RecommendationError(format!("invalid response body: {}", e))
            })?;

            let content = body
                .choices
                .into_iter()
                .next()
                .map(|choice| choice.message.content)
                .ok_or_else(|| {
                    ComputeError::RecommendationError("response has no choices".to_string())
                })?;

            let suggestion = strip_reasoning(&content);
            if suggestion.is_empty() {
                return Err(ComputeError::RecommendationError(
                    "model returned an empty suggestion".to_string(),
                ));
            }
            Ok(suggestion)
        }
    }

}
