//! Indexing pipeline: orchestrates the Policy Filter, Fingerprint Ledger,
//! Dirty Queue, Chunker, Embedder, and Vector Store into full and incremental
//! indexing runs, reporting progress and checkpointing so a crash mid-run is
//! recoverable by the next caller.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use crate::chunking::Chunker;
use crate::config::Config;
use crate::dirty_queue::DirtyQueue;
use crate::embeddings::provider::EmbeddingProvider;
use crate::embeddings::queue::EmbeddingRequest;
use crate::embeddings::EmbeddingCache;
use crate::embeddings::EmbeddingQueue;
use crate::error::Error;
use crate::error::Result;
use crate::fingerprint::FingerprintLedger;
use crate::metadata::MetadataJournal;
use crate::policy::Decision;
use crate::policy::PolicyFilter;
use crate::storage::VectorStore;
use crate::types::Chunk;
use crate::types::IndexStats;
use crate::types::Phase;
use crate::types::Progress;

/// Chunks are embedded in groups of this size per request to the queue.
const EMBED_BATCH_SIZE: i32 = 32;

/// Invoked after every unit of progress; implementations should be cheap since
/// this runs on the pipeline's hot path.
pub type ProgressCallback = Arc<dyn Fn(Progress) + Send + Sync>;

pub struct IndexingPipeline {
    project_dir: std::path::PathBuf,
    index_dir: std::path::PathBuf,
    config: Config,
    provider: Arc<dyn EmbeddingProvider>,
    chunker: Chunker,
    cache: EmbeddingCache,
    queue: EmbeddingQueue,
}

impl IndexingPipeline {
    pub fn new(
        project_dir: std::path::PathBuf,
        index_dir: std::path::PathBuf,
        config: Config,
        provider: Arc<dyn EmbeddingProvider>,
    ) -> Result<Self> {
        let cache = EmbeddingCache::open(
            &crate::paths::embed_cache_path(&index_dir),
            provider.artifact_id(),
        )?;
        let queue = EmbeddingQueue::new(provider.clone()).with_batch_size(EMBED_BATCH_SIZE);
        Ok(Self {
            project_dir,
            index_dir,
            config,
            provider,
            chunker: Chunker::default(),
            cache,
            queue,
        })
    }

    /// Full index: walk the project from scratch, ignoring any existing
    /// fingerprint ledger, and rebuild the vector store entirely.
    pub async fn run_full(
        &self,
        on_progress: Option<ProgressCallback>,
    ) -> Result<IndexStats> {
        let mut journal = MetadataJournal::load_or_create(
            &crate::paths::metadata_path(&self.index_dir),
            &self.project_dir.to_string_lossy(),
        )?;
        let mut ledger = FingerprintLedger::load(&crate::paths::fingerprints_path(&self.index_dir))?;
        // Starting a full index discards the prior ledger's notion of "unchanged"
        // so every surviving file is re-hashed and re-embedded.
        for path in ledger.map().keys().cloned().collect::<Vec<_>>() {
            ledger.remove(&path);
        }

        let policy = PolicyFilter::new(&self.project_dir, &self.config)?;
        let candidates = policy.walk(self.config.max_files)?;
        if candidates.len() > self.config.max_files {
            return Err(Error::FileLimitWarning {
                count: candidates.len(),
                max: self.config.max_files,
            });
        }

        journal.start_indexing(candidates.len())?;
        let store = VectorStore::open(
            &crate::paths::code_store_dir(&self.index_dir),
            self.provider.dimension(),
        )
        .await?;

        let result = self
            .index_paths(&candidates, &policy, &store, &mut ledger, &mut journal, on_progress)
            .await;

        match result {
            Ok(stats) => {
                ledger.save()?;
                journal.complete(stats.clone(), true)?;
                Ok(stats)
            }
            Err(err) => {
                journal.fail(err.dev_message())?;
                Err(err)
            }
        }
    }

    /// Incremental update: diff the dirty queue and fingerprint ledger against
    /// the current filesystem, touching only what changed.
    pub async fn run_incremental(
        &self,
        on_progress: Option<ProgressCallback>,
    ) -> Result<IndexStats> {
        let mut journal = MetadataJournal::load_or_create(
            &crate::paths::metadata_path(&self.index_dir),
            &self.project_dir.to_string_lossy(),
        )?;
        let mut ledger = FingerprintLedger::load(&crate::paths::fingerprints_path(&self.index_dir))?;
        let mut dirty = DirtyQueue::load(&crate::paths::dirty_files_path(&self.index_dir))?;

        let policy = PolicyFilter::new(&self.project_dir, &self.config)?;
        let candidates = policy.walk(self.config.max_files)?;

        let delta = ledger.delta(&self.project_dir, &candidates).await?;
        let mut to_index: Vec<String> = delta.changed().cloned().collect();
        for pending in dirty.get_pending() {
            if !to_index.contains(&pending) {
                to_index.push(pending);
            }
        }
        to_index.sort();
        to_index.dedup();

        journal.start_indexing(to_index.len())?;
        let store = VectorStore::open(
            &crate::paths::code_store_dir(&self.index_dir),
            self.provider.dimension(),
        )
        .await?;

        for removed in delta.removed.iter().chain(dirty.get_tombstoned().iter()) {
            store.delete_by_path(removed).await?;
            ledger.remove(removed);
            dirty.remove(removed);
        }

        let result = self
            .index_paths(&to_index, &policy, &store, &mut ledger, &mut journal, on_progress)
            .await;

        match result {
            Ok(stats) => {
                for path in &to_index {
                    dirty.remove(path);
                }
                ledger.save()?;
                dirty.save()?;
                journal.complete(stats.clone(), false)?;
                Ok(stats)
            }
            Err(err) => {
                journal.fail(err.dev_message())?;
                dirty.save()?;
                Err(err)
            }
        }
    }

    /// Reindex a single file, bypassing the walker entirely. Used for the
    /// single-file reindex surface and by the watcher's debounced event loop.
    pub async fn reindex_file(&self, rel_path: &str) -> Result<()> {
        let policy = PolicyFilter::new(&self.project_dir, &self.config)?;
        let mut ledger = FingerprintLedger::load(&crate::paths::fingerprints_path(&self.index_dir))?;
        let store = VectorStore::open(
            &crate::paths::code_store_dir(&self.index_dir),
            self.provider.dimension(),
        )
        .await?;

        store.delete_by_path(rel_path).await?;
        let full_path = crate::paths::safe_join(&self.project_dir, Path::new(rel_path))?;

        let metadata = tokio::fs::symlink_metadata(&full_path).await;
        let Ok(metadata) = metadata else {
            ledger.remove(rel_path);
            ledger.save()?;
            return Ok(());
        };
        if metadata.is_symlink() {
            ledger.remove(rel_path);
            ledger.save()?;
            return Ok(());
        }

        let content = tokio::fs::read(&full_path).await?;
        let content_str = String::from_utf8_lossy(&content).to_string();
        let decision = policy.evaluate(rel_path, false, metadata.len(), Some(&content_str));
        if decision == Decision::Skip {
            ledger.remove(rel_path);
            ledger.save()?;
            return Ok(());
        }

        let digest = crate::fingerprint::hash_bytes(&content);
        let chunks = self.embed_file(rel_path, &content_str, &digest).await?;
        store.insert(&chunks).await?;
        ledger.upsert(rel_path, digest);
        ledger.save()?;
        Ok(())
    }

    async fn index_paths(
        &self,
        candidates: &[String],
        policy: &PolicyFilter,
        store: &VectorStore,
        ledger: &mut FingerprintLedger,
        journal: &mut MetadataJournal,
        on_progress: Option<ProgressCallback>,
    ) -> Result<IndexStats> {
        let total = candidates.len();
        let mut stats = IndexStats::default();
        let mut processed = 0usize;

        for rel_path in candidates {
            if let Some(cb) = &on_progress {
                cb(Progress {
                    phase: Phase::Scanning,
                    processed,
                    total,
                });
            }

            let full_path = crate::paths::safe_join(&self.project_dir, Path::new(rel_path))?;
            let metadata = match tokio::fs::symlink_metadata(&full_path).await {
                Ok(m) => m,
                Err(_) => {
                    processed += 1;
                    continue;
                }
            };
            if metadata.is_symlink() {
                processed += 1;
                continue;
            }

            let content = match tokio::fs::read(&full_path).await {
                Ok(c) => c,
                Err(err) => {
                    tracing::warn!(path = rel_path, error = %err, "skipping unreadable file");
                    processed += 1;
                    continue;
                }
            };
            let content_str = String::from_utf8_lossy(&content).to_string();
            let decision = policy.evaluate(rel_path, false, metadata.len(), Some(&content_str));
            if decision == Decision::Skip {
                if ledger.get(rel_path).is_some() {
                    store.delete_by_path(rel_path).await?;
                    ledger.remove(rel_path);
                }
                processed += 1;
                continue;
            }

            let digest = crate::fingerprint::hash_bytes(&content);
            store.delete_by_path(rel_path).await?;
            let chunks = self.embed_file(rel_path, &content_str, &digest).await?;
            stats.total_chunks += chunks.len();
            store.insert(&chunks).await?;
            ledger.upsert(rel_path.clone(), digest);
            stats.total_files += 1;

            processed += 1;
            journal.checkpoint(processed)?;
            if let Some(cb) = &on_progress {
                cb(Progress {
                    phase: Phase::Writing,
                    processed,
                    total,
                });
            }
        }

        stats.storage_size_bytes = store.storage_size_bytes().await?;
        Ok(stats)
    }

    /// Chunk `content`, then embed each chunk: a hit in the embedding cache
    /// (keyed by file path and chunk text hash) skips the provider entirely;
    /// misses are batched through the retrying embedding queue and the fresh
    /// results are written back to the cache for next time.
    async fn embed_file(&self, rel_path: &str, content: &str, content_hash: &str) -> Result<Vec<Chunk>> {
        let raw_chunks = self.chunker.chunk(content)?;
        if raw_chunks.is_empty() {
            return Ok(Vec::new());
        }

        let chunk_hashes: Vec<String> = raw_chunks
            .iter()
            .map(|c| crate::fingerprint::hash_bytes(c.text.as_bytes()))
            .collect();

        let lookup_keys: Vec<(String, String)> = chunk_hashes
            .iter()
            .map(|hash| (rel_path.to_string(), hash.clone()))
            .collect();
        let cache_result = self.cache.get_batch_bulk(&lookup_keys)?;
        let mut vectors: HashMap<String, Vec<f32>> = cache_result
            .hits
            .into_iter()
            .map(|(_, hash, embedding)| (hash, embedding))
            .collect();

        let mut requests = Vec::new();
        for (idx, hash) in chunk_hashes.iter().enumerate() {
            if !vectors.contains_key(hash) {
                requests.push(EmbeddingRequest {
                    id: idx.to_string(),
                    text: raw_chunks[idx].text.clone(),
                });
            }
        }

        if !requests.is_empty() {
            let results = self.queue.process_all(requests).await?;
            let mut fresh = Vec::with_capacity(results.len());
            for result in results {
                let idx: usize = result
                    .id
                    .parse()
                    .expect("queue preserves the chunk index passed in as the request id");
                let embedding = result.embedding.ok_or_else(|| Error::ModelDownloadFailed {
                    reason: result.error.unwrap_or_else(|| "embedding failed".to_string()),
                })?;
                fresh.push((rel_path.to_string(), chunk_hashes[idx].clone(), embedding.clone()));
                vectors.insert(chunk_hashes[idx].clone(), embedding);
            }
            self.cache.put_batch(&fresh)?;
        }

        let mut chunks = Vec::with_capacity(raw_chunks.len());
        for (idx, raw) in raw_chunks.iter().enumerate() {
            let vector = vectors
                .get(&chunk_hashes[idx])
                .cloned()
                .expect("every chunk was either a cache hit or freshly embedded above");
            let mut chunk = Chunk::new(
                rel_path.to_string(),
                raw.text.clone(),
                vector,
                raw.start_line,
                raw.end_line,
                content_hash.to_string(),
            );
            chunk.chunk_hash = Some(chunk_hashes[idx].clone());
            chunks.push(chunk);
        }
        Ok(chunks)
    }
}

#[cfg(test)]
#[path = "pipeline.test.rs"]
mod tests;
