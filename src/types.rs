//! Shared vocabulary: the on-disk/in-memory records every component passes around.

use std::collections::HashMap;

use serde::Deserialize;
use serde::Serialize;
use uuid::Uuid;

/// Reserved prefix marking a dirty-queue entry as a pending deletion rather than a
/// pending add/modify. Part of the on-disk contract (other tools may read
/// `dirty-files.json` directly), not an implementation detail.
pub const TOMBSTONE_PREFIX: &str = "__deleted__:";

/// A single embedded window of a file's text. Immutable once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Chunk {
    pub id: Uuid,
    pub path: String,
    pub text: String,
    pub vector: Vec<f32>,
    pub start_line: u32,
    pub end_line: u32,
    pub content_hash: String,
    pub chunk_hash: Option<String>,
}

impl Chunk {
    pub fn new(
        path: impl Into<String>,
        text: impl Into<String>,
        vector: Vec<f32>,
        start_line: u32,
        end_line: u32,
        content_hash: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            path: path.into(),
            text: text.into(),
            vector,
            start_line,
            end_line,
            content_hash: content_hash.into(),
            chunk_hash: None,
        }
    }
}

/// A chunk boundary produced by the chunker, before embedding.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawChunk {
    pub text: String,
    pub start_line: u32,
    pub end_line: u32,
}

/// `path -> content digest` map representing what the index believes is on disk.
pub type FingerprintMap = HashMap<String, String>;

/// Four-way classification of paths between a stored fingerprint map and a current
/// filesystem snapshot. The sets are disjoint and jointly cover
/// `current_paths ∪ domain(stored)`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Delta {
    pub added: Vec<String>,
    pub modified: Vec<String>,
    pub removed: Vec<String>,
    pub unchanged: Vec<String>,
}

impl Delta {
    pub fn changed(&self) -> impl Iterator<Item = &String> {
        self.added.iter().chain(self.modified.iter())
    }
}

/// State of the one in-progress/complete/failed run tracked by the metadata journal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IndexingState {
    Complete,
    InProgress,
    Failed,
}

impl Default for IndexingState {
    fn default() -> Self {
        IndexingState::Complete
    }
}

/// Embedded indexing-state sub-record of [`Metadata`].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexingStateRecord {
    #[serde(default)]
    pub state: IndexingState,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub started_at: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_checkpoint: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected_files: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub processed_files: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct IndexStats {
    #[serde(default)]
    pub total_files: usize,
    #[serde(default)]
    pub total_chunks: usize,
    #[serde(default)]
    pub storage_size_bytes: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_embeddings: Option<usize>,
}

/// Index version, timestamps, counts, and the indexing state machine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Metadata {
    pub version: String,
    pub project_path: String,
    pub created_at: chrono::DateTime<chrono::Utc>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_full_index: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_incremental_update: Option<chrono::DateTime<chrono::Utc>>,
    #[serde(default)]
    pub stats: IndexStats,
    /// Legacy records without this field are read as `complete` via `#[serde(default)]`.
    #[serde(default)]
    pub indexing_state: IndexingStateRecord,
}

impl Metadata {
    pub fn new(project_path: impl Into<String>) -> Self {
        Self {
            version: "1.0.0".to_string(),
            project_path: project_path.into(),
            created_at: chrono::Utc::now(),
            last_full_index: None,
            last_incremental_update: None,
            stats: IndexStats::default(),
            indexing_state: IndexingStateRecord::default(),
        }
    }
}

/// Progress phases reported by the indexing pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    Scanning,
    Hashing,
    Chunking,
    Embedding,
    Writing,
}

#[derive(Debug, Clone, Copy)]
pub struct Progress {
    pub phase: Phase,
    pub processed: usize,
    pub total: usize,
}

#[cfg(test)]
#[path = "types.test.rs"]
mod tests;
