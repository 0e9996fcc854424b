//! Local-first semantic code search index: lifecycle operations over a
//! per-project vector store, fingerprint ledger, dirty queue, and metadata
//! journal, with a policy filter gating what gets indexed and an optional
//! filesystem watcher keeping it current between explicit reindex calls.

pub mod chunking;
pub mod config;
pub mod dirty_queue;
pub mod embeddings;
pub mod error;
pub mod fingerprint;
pub mod lock;
pub mod metadata;
pub mod metrics;
pub mod paths;
pub mod pipeline;
pub mod policy;
pub mod storage;
pub mod types;
pub mod watcher;

use std::path::Path;
use std::path::PathBuf;
use std::sync::Arc;

use uuid::Uuid;

use crate::embeddings::EmbeddingProvider;
use crate::error::Error;
use crate::error::Result;
use crate::pipeline::IndexingPipeline;
use crate::pipeline::ProgressCallback;
use crate::types::Chunk;
use crate::types::IndexStats;
use crate::types::Metadata;

/// A single semantic search hit.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub path: String,
    pub text: String,
    pub start_line: u32,
    pub end_line: u32,
    pub score: f32,
}

/// Snapshot of a project's index state, returned by [`Index::status`].
#[derive(Debug, Clone)]
pub struct IndexStatus {
    pub exists: bool,
    pub metadata: Option<Metadata>,
}

/// Handle to one project's on-disk index. All mutating operations
/// (`create`, `reindex_project`, `reindex_file`, `delete`) serialize through
/// the process-wide indexing lock keyed by the project's directory digest;
/// a second concurrent caller fails fast with [`Error::Busy`] rather than
/// queuing.
pub struct Index {
    project_dir: PathBuf,
    index_dir: PathBuf,
    project_key: String,
    config: config::Config,
    provider: Arc<dyn EmbeddingProvider>,
}

impl Index {
    /// Open a handle for `project_dir` without requiring an index to already
    /// exist. Loads `config.json` if present, else defaults.
    pub fn open(project_dir: impl AsRef<Path>, provider: Arc<dyn EmbeddingProvider>) -> Result<Self> {
        let project_dir = project_dir.as_ref().to_path_buf();
        let index_dir = paths::project_dir(&project_dir)?;
        let project_key = paths::project_dir_name(&project_dir)?;
        let config = config::Config::load(&paths::config_path(&index_dir));
        Ok(Self {
            project_dir,
            index_dir,
            project_key,
            config,
            provider,
        })
    }

    fn pipeline(&self) -> Result<IndexingPipeline> {
        IndexingPipeline::new(
            self.project_dir.clone(),
            self.index_dir.clone(),
            self.config.clone(),
            self.provider.clone(),
        )
    }

    /// Build a fresh index from scratch, replacing any existing one for this
    /// project.
    pub async fn create_index(&self, on_progress: Option<ProgressCallback>) -> Result<IndexStats> {
        let _lock = lock::try_acquire(&self.project_key)?;
        self.config.save(&paths::config_path(&self.index_dir))?;
        self.pipeline()?.run_full(on_progress).await
    }

    /// Rebuild the index from scratch: same contract as [`Index::create_index`],
    /// preserving config but wiping everything else. Requires an index to
    /// already exist; use [`Index::create_index`] to build the first one.
    pub async fn reindex_project(&self, on_progress: Option<ProgressCallback>) -> Result<IndexStats> {
        let _lock = lock::try_acquire(&self.project_key)?;
        if !self.index_dir.exists() {
            return Err(Error::IndexNotFound {
                path: self.project_dir.clone(),
            });
        }
        self.pipeline()?.run_full(on_progress).await
    }

    /// Reindex exactly one project-relative file, bypassing the walker.
    pub async fn reindex_file(&self, rel_path: &str) -> Result<()> {
        let _lock = lock::try_acquire(&self.project_key)?;
        if !self.index_dir.exists() {
            return Err(Error::IndexNotFound {
                path: self.project_dir.clone(),
            });
        }
        self.pipeline()?.reindex_file(rel_path).await
    }

    /// Semantic search: embed `query` and return the `k` nearest chunks.
    pub async fn search_code(&self, query: &str, k: usize) -> Result<Vec<SearchHit>> {
        let store = self.open_store().await?;
        let vector = self.provider.embed(query).await?;
        let hits = store.search(&vector, k).await?;
        Ok(hits.into_iter().map(|(chunk, score)| to_hit(chunk, score)).collect())
    }

    /// Path-glob search: list indexed files matching `glob`, most relevant
    /// (alphabetically, since this is not a ranked search) first.
    pub async fn search_by_path(&self, glob: &str, limit: usize) -> Result<Vec<String>> {
        let store = self.open_store().await?;
        store.search_by_path(glob, limit).await
    }

    /// Look up specific chunks by id.
    pub async fn get_chunks(&self, ids: &[Uuid]) -> Result<Vec<Chunk>> {
        let store = self.open_store().await?;
        let map = store.get_by_ids(ids).await?;
        Ok(map.into_values().collect())
    }

    /// Current on-disk index state without mutating anything.
    pub async fn status(&self) -> Result<IndexStatus> {
        let metadata_path = paths::metadata_path(&self.index_dir);
        if !metadata_path.exists() {
            return Ok(IndexStatus {
                exists: false,
                metadata: None,
            });
        }
        let journal = metadata::MetadataJournal::load_or_create(
            &metadata_path,
            &self.project_dir.to_string_lossy(),
        )?;
        Ok(IndexStatus {
            exists: true,
            metadata: Some(journal.record().clone()),
        })
    }

    /// Permanently delete this project's index directory. Refuses to touch
    /// anything outside the global indexes root.
    pub async fn delete_index(&self) -> Result<()> {
        let _lock = lock::try_acquire(&self.project_key)?;
        if !self.index_dir.exists() {
            return Ok(());
        }
        paths::require_within_indexes_root(&self.index_dir)?;
        std::fs::remove_dir_all(&self.index_dir)?;
        Ok(())
    }

    async fn open_store(&self) -> Result<storage::VectorStore> {
        if !self.index_dir.exists() {
            return Err(Error::IndexNotFound {
                path: self.project_dir.clone(),
            });
        }
        storage::VectorStore::open(&paths::code_store_dir(&self.index_dir), self.provider.dimension()).await
    }
}

fn to_hit(chunk: Chunk, score: f32) -> SearchHit {
    SearchHit {
        path: chunk.path,
        text: chunk.text,
        start_line: chunk.start_line,
        end_line: chunk.end_line,
        score,
    }
}

#[cfg(test)]
#[path = "lib.test.rs"]
mod tests;
