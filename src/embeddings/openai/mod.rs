#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::config::EmbeddingConfig;
use crate::embeddings::EmbeddingProvider;
use crate::http::{DEFAULT_TIMEOUT_SECONDS, HttpClient};
use crate::{RagError, Result};

/// OpenAI embeddings API client
#[derive(Debug, Clone)]
pub struct OpenAiEmbeddings {
    endpoint: Url,
    api_key: String,
    model: String,
    dimension: usize,
    http: HttpClient,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbeddings {
    #[inline]
    pub fn new(config: &EmbeddingConfig) -> Result<Self> {
        let endpoint = config
            .base_url
            .join("/v1/embeddings")
            .map_err(|e| RagError::Provider(format!("Invalid embeddings endpoint: {}", e)))?;

        Ok(Self {
            endpoint,
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            dimension: config.dimension,
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

    fn request_embedding(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest {
            model: &self.model,
            input: text,
        };
        let request_json = serde_json::to_string(&request)
            .map_err(|e| RagError::Provider(format!("Failed to serialize request: {}", e)))?;

        let auth = format!("Bearer {}", self.api_key);
        let response_text = self
            .http
            .post_json(&self.endpoint, &[("Authorization", &auth)], &request_json)
            .map_err(|e| RagError::Provider(format!("Embedding request failed: {}", e)))?;

        let response: EmbeddingResponse = serde_json::from_str(&response_text)
            .map_err(|e| RagError::Provider(format!("Failed to parse embedding response: {}", e)))?;

        let embedding = response
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| RagError::Provider("Embedding response contained no data".to_string()))?;

        if embedding.len() != self.dimension {
            return Err(RagError::Provider(format!(
                "Expected {}-dimensional embedding, got {}",
                self.dimension,
                embedding.len()
            )));
        }

        debug!("Generated embedding with {} dimensions", embedding.len());
        Ok(embedding)
    }
}

impl EmbeddingProvider for OpenAiEmbeddings {
    #[inline]
    fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!("Requesting embedding for text (length: {})", text.len());
        self.request_embedding(text)
    }

    #[inline]
    fn dimension(&self) -> usize {
        self.dimension
    }
}
