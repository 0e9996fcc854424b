//! HTTP-backed embedding provider.
//!
//! Speaks the OpenAI-compatible `/embeddings` endpoint shape, which is also
//! what most local embedding servers (ollama, llama.cpp, text-embeddings-inference)
//! expose. Initialization is guarded by a `OnceCell` so the first caller pays
//! for a connectivity probe and every later caller reuses the same client.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Deserialize;
use serde::Serialize;
use tokio::sync::OnceCell;

use crate::embeddings::provider::EmbeddingProvider;
use crate::error::Error;
use crate::error::Result;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HttpProviderConfig {
    pub endpoint: String,
    pub model: String,
    pub api_key: Option<String>,
    pub dimension: usize,
}

#[derive(Serialize)]
struct EmbeddingRequestBody<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbeddingResponseBody {
    data: Vec<EmbeddingDatum>,
}

#[derive(Deserialize)]
struct EmbeddingDatum {
    embedding: Vec<f32>,
    index: usize,
}

/// Embedding provider backed by an HTTP endpoint. The underlying
/// [`reqwest::Client`] is built lazily on first use and cached for the
/// lifetime of the provider, so a misconfigured endpoint fails on the first
/// real call rather than at construction.
pub struct HttpEmbeddingProvider {
    config: HttpProviderConfig,
    client: OnceCell<reqwest::Client>,
}

impl HttpEmbeddingProvider {
    pub fn new(config: HttpProviderConfig) -> Arc<Self> {
        Arc::new(Self {
            config,
            client: OnceCell::new(),
        })
    }

    async fn client(&self) -> &reqwest::Client {
        self.client
            .get_or_init(|| async { reqwest::Client::new() })
            .await
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let client = self.client().await;
        let mut req = client.post(&self.config.endpoint).json(&EmbeddingRequestBody {
            model: &self.config.model,
            input: texts,
        });
        if let Some(key) = &self.config.api_key {
            req = req.bearer_auth(key);
        }

        let response = req
            .send()
            .await
            .map_err(|err| Error::ModelDownloadFailed {
                reason: err.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(Error::ModelDownloadFailed {
                reason: format!("embedding endpoint returned {}", response.status()),
            });
        }

        let mut body: EmbeddingResponseBody =
            response
                .json()
                .await
                .map_err(|err| Error::ModelDownloadFailed {
                    reason: format!("malformed embedding response: {err}"),
                })?;

        body.data.sort_by_key(|d| d.index);
        let embeddings: Vec<Vec<f32>> = body.data.into_iter().map(|d| d.embedding).collect();

        for embedding in &embeddings {
            if embedding.len() != self.config.dimension {
                return Err(Error::DimensionMismatch {
                    expected: self.config.dimension,
                    actual: embedding.len(),
                });
            }
        }

        Ok(embeddings)
    }
}

#[async_trait]
impl EmbeddingProvider for HttpEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let mut out = self.request(std::slice::from_ref(&text.to_string())).await?;
        out.pop()
            .ok_or_else(|| Error::ModelDownloadFailed {
                reason: "embedding endpoint returned no vectors".to_string(),
            })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        self.request(texts).await
    }

    fn dimension(&self) -> usize {
        self.config.dimension
    }

    fn artifact_id(&self) -> &str {
        &self.config.model
    }
}

#[cfg(test)]
#[path = "http.test.rs"]
mod tests;
