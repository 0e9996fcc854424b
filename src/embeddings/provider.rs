//! Embedding provider contract.
//!
//! A provider turns text into a fixed-dimension vector. The trait is
//! deliberately thin: batching, retry, and caching live one layer up in
//! [`crate::embeddings::queue`] and [`crate::embeddings::cache`], not here.
//! Implementations must be deterministic for identical input and the same
//! model version, and must return errors rather than panic on transient
//! network failures so the queue's retry logic can act on them.

use async_trait::async_trait;

use crate::error::Result;

#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a single string.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Embed a batch of strings in one request where the backend supports it.
    /// The default implementation embeds sequentially; HTTP-backed providers
    /// should override this to send one batched request.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut out = Vec::with_capacity(texts.len());
        for text in texts {
            out.push(self.embed(text).await?);
        }
        Ok(out)
    }

    /// Dimensionality of vectors this provider produces. Used to validate
    /// against an existing index's `chunks_vec` schema before inserting.
    fn dimension(&self) -> usize;

    /// Stable identifier for the model/version in use, used as the embedding
    /// cache's artifact id so a model change invalidates old cache entries.
    fn artifact_id(&self) -> &str;
}

#[cfg(test)]
#[path = "provider.test.rs"]
mod tests;
