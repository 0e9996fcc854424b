//! Dirty queue: a crash-safe set of paths pending indexing. Adds/modifies and
//! tombstoned removals share one persistent set, distinguished by the reserved
//! tombstone prefix.

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;
use serde::Serialize;

use crate::error::Result;
use crate::types::TOMBSTONE_PREFIX;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DirtyDocument {
    version: String,
    #[serde(rename = "dirtyFiles")]
    dirty_files: Vec<String>,
    #[serde(rename = "lastModified")]
    last_modified: chrono::DateTime<chrono::Utc>,
}

pub struct DirtyQueue {
    path: std::path::PathBuf,
    entries: HashSet<String>,
    dirty: bool,
}

impl DirtyQueue {
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                entries: HashSet::new(),
                dirty: false,
            });
        }
        let raw = std::fs::read_to_string(path)?;
        let doc: DirtyDocument = serde_json::from_str(&raw)?;
        Ok(Self {
            path: path.to_path_buf(),
            entries: doc.dirty_files.into_iter().collect(),
            dirty: false,
        })
    }

    /// Mark `p` as pending add/modify, clearing any tombstone for the same path.
    pub fn add(&mut self, p: &str) {
        let tombstone = format!("{TOMBSTONE_PREFIX}{p}");
        let changed = self.entries.remove(&tombstone) | self.entries.insert(p.to_string());
        self.dirty |= changed;
    }

    /// Mark `p` as pending removal, clearing any plain entry for the same path.
    pub fn mark_deleted(&mut self, p: &str) {
        let tombstone = format!("{TOMBSTONE_PREFIX}{p}");
        let changed = self.entries.remove(p) | self.entries.insert(tombstone);
        self.dirty |= changed;
    }

    /// Clear both the plain entry and the tombstone for `p`.
    pub fn remove(&mut self, p: &str) {
        let tombstone = format!("{TOMBSTONE_PREFIX}{p}");
        let changed = self.entries.remove(p) | self.entries.remove(&tombstone);
        self.dirty |= changed;
    }

    pub fn get_pending(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter(|e| !e.starts_with(TOMBSTONE_PREFIX))
            .cloned()
            .collect()
    }

    pub fn get_tombstoned(&self) -> Vec<String> {
        self.entries
            .iter()
            .filter_map(|e| e.strip_prefix(TOMBSTONE_PREFIX).map(str::to_string))
            .collect()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Persist with an atomic write, but only if the set has been modified since
    /// the last save (dirty-bit optimization).
    pub fn save(&mut self) -> Result<()> {
        if !self.dirty {
            return Ok(());
        }
        let mut files: Vec<String> = self.entries.iter().cloned().collect();
        files.sort();
        let doc = DirtyDocument {
            version: "1.0.0".to_string(),
            dirty_files: files,
            last_modified: chrono::Utc::now(),
        };
        let text = serde_json::to_string_pretty(&doc)?;
        crate::paths::atomic_write(&self.path, text.as_bytes())?;
        self.dirty = false;
        Ok(())
    }
}

#[cfg(test)]
#[path = "dirty_queue.test.rs"]
mod tests;
