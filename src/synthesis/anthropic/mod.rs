#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::GenerationConfig;
use crate::http::{DEFAULT_TIMEOUT_SECONDS, HttpClient};
use crate::synthesis::{AnswerSynthesizer, SYSTEM_INSTRUCTION, build_prompt};
use crate::{RagError, Result};

const ANTHROPIC_VERSION: &str = "2023-06-01";
/// Fixed sampling temperature; keeps answers repeatable for a fixed model
const TEMPERATURE: f32 = 0.0;

/// Anthropic messages API client
#[derive(Debug, Clone)]
pub struct AnthropicSynthesizer {
    endpoint: Url,
    api_key: String,
    model: String,
    max_tokens: u32,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: Vec<ContentBlock<'a>>,
}

#[derive(Debug, Serialize)]
struct ContentBlock<'a> {
    #[serde(rename = "type")]
    kind: &'a str,
    text: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    content: Vec<ResponseBlock>,
}

#[derive(Debug, Deserialize)]
struct ResponseBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

impl AnthropicSynthesizer {
    #[inline]
    pub fn new(config: &GenerationConfig) -> Result<Self> {
        let endpoint = config
            .base_url
            .join("/v1/messages")
            .map_err(|e| RagError::Synthesis(format!("Invalid messages endpoint: {}", e)))?;

        Ok(Self {
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            http: HttpClient::new(Duration::from_secs(DEFAULT_TIMEOUT_SECONDS)),
        })
    }

    #[inline]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.http = HttpClient::new(timeout);
        self
    }

    #[inline]
    pub fn with_retry_attempts(mut self, attempts: u32) -> Self {
        self.http = self.http.with_retry_attempts(attempts);
        self
    }

    fn request_completion(&self, prompt: &str) -> Result<String> {
        let request = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: TEMPERATURE,
            system: SYSTEM_INSTRUCTION,
            messages: vec![Message {
                role: "user",
                content: vec![ContentBlock {
                    kind: "text",
                    text: prompt,
                }],
            }],
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Synthesis(format!("Failed to serialize request: {}", e)))?;

        let response_text = self
            .http
            .post_json(
                &self.endpoint,
                &[
                    ("x-api-key", &self.api_key),
                    ("anthropic-version", ANTHROPIC_VERSION),
                ],
                &request_json,
            )
            .map_err(|e| RagError::Synthesis(format!("Generation request failed: {}", e)))?;

        let response: MessagesResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Synthesis(format!("Failed to parse response: {}", e)))?;

        let answer: String = response
            .content
            .into_iter()
            .filter(|block| block.kind == "text")
            .map(|block| block.text)
            .collect();

        if answer.is_empty() {
            return Err(RagError::Synthesis(
                "Generation response contained no text".to_string(),
            ));
        }

        debug!("Generated answer with {} chars", answer.len());
        Ok(answer)
    }
}

impl AnswerSynthesizer for AnthropicSynthesizer {
    #[inline]
    fn synthesize(&self, question: &str, context: &str) -> Result<String> {
        debug!(
            "Synthesizing answer (context {} chars, question {} chars)",
            context.len(),
            question.len()
        );
        let prompt = build_prompt(context, question);
        self.request_completion(&prompt)
    }
}
