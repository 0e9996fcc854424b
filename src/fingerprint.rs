//! Fingerprint ledger: the authoritative `path -> content digest` map and the
//! delta algorithm that classifies the current filesystem against it.

use std::path::Path;

use sha2::Digest;
use sha2::Sha256;

use crate::error::Error;
use crate::error::Result;
use crate::types::Delta;
use crate::types::FingerprintMap;

/// Reject fingerprint files larger than this; a legitimate ledger for even a huge
/// monorepo stays well under it, so exceeding it signals corruption.
const MAX_FINGERPRINT_FILE_BYTES: u64 = 256 * 1024 * 1024;
/// Batch size for bounded-parallel hashing (§5 resource ceilings).
const HASH_BATCH_SIZE: usize = 50;

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct FingerprintDocument {
    version: String,
    fingerprints: FingerprintMap,
}

pub struct FingerprintLedger {
    path: std::path::PathBuf,
    map: FingerprintMap,
}

impl FingerprintLedger {
    /// Load the ledger from `path`. A missing file yields an empty map; an
    /// oversized or structurally invalid file is `INDEX_CORRUPT`.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self {
                path: path.to_path_buf(),
                map: FingerprintMap::new(),
            });
        }
        let size = std::fs::metadata(path)?.len();
        if size > MAX_FINGERPRINT_FILE_BYTES {
            return Err(Error::IndexCorrupt {
                reason: format!(
                    "fingerprints.json is {size} bytes, exceeding the {MAX_FINGERPRINT_FILE_BYTES} byte limit"
                ),
                source: None,
            });
        }
        let raw = std::fs::read_to_string(path)?;
        let doc: FingerprintDocument = serde_json::from_str(&raw).map_err(|err| Error::IndexCorrupt {
            reason: "fingerprints.json is not valid".to_string(),
            source: Some(Box::new(err)),
        })?;
        Ok(Self {
            path: path.to_path_buf(),
            map: doc.fingerprints,
        })
    }

    pub fn get(&self, path: &str) -> Option<&String> {
        self.map.get(path)
    }

    pub fn map(&self) -> &FingerprintMap {
        &self.map
    }

    /// Atomic save: serialize to a temporary sibling, then rename.
    pub fn save(&self) -> Result<()> {
        let doc = FingerprintDocument {
            version: "1.0.0".to_string(),
            fingerprints: self.map.clone(),
        };
        let text = serde_json::to_string_pretty(&doc)?;
        crate::paths::atomic_write(&self.path, text.as_bytes())
    }

    /// Upsert a digest for `path`.
    pub fn upsert(&mut self, path: impl Into<String>, digest: impl Into<String>) {
        self.map.insert(path.into(), digest.into());
    }

    /// Remove the entry for `path`, if present.
    pub fn remove(&mut self, path: &str) {
        self.map.remove(path);
    }

    /// Apply the outcome of a pipeline run: drop `removed` entries, upsert new
    /// digests for everything actually indexed.
    pub fn apply_delta(&mut self, removed: &[String], indexed: &[(String, String)]) {
        for path in removed {
            self.map.remove(path);
        }
        for (path, digest) in indexed {
            self.map.insert(path.clone(), digest.clone());
        }
    }

    /// Compute the four-way delta of `current_paths` (relative to `project_dir`)
    /// against this ledger, hashing surviving files in bounded-parallel batches.
    pub async fn delta(&self, project_dir: &Path, current_paths: &[String]) -> Result<Delta> {
        let mut delta = Delta::default();
        let mut seen = std::collections::HashSet::new();

        for batch in current_paths.chunks(HASH_BATCH_SIZE) {
            let mut join_set = tokio::task::JoinSet::new();
            for rel_path in batch {
                let rel_path = rel_path.clone();
                let project_dir = project_dir.to_path_buf();
                join_set.spawn(async move {
                    let outcome = classify_one(&project_dir, &rel_path).await;
                    (rel_path, outcome)
                });
            }
            while let Some(joined) = join_set.join_next().await {
                let (rel_path, outcome) = joined.map_err(|err| Error::IndexCorrupt {
                    reason: "fingerprint hashing task panicked".to_string(),
                    source: Some(Box::new(err)),
                })?;
                seen.insert(rel_path.clone());
                match outcome {
                    ClassifyOutcome::Skip => {}
                    ClassifyOutcome::Classified(digest) => {
                        match self.map.get(&rel_path) {
                            None => delta.added.push(rel_path),
                            Some(existing) if *existing == digest => delta.unchanged.push(rel_path),
                            Some(_) => delta.modified.push(rel_path),
                        }
                    }
                }
            }
        }

        for path in self.map.keys() {
            if !seen.contains(path) {
                delta.removed.push(path.clone());
            }
        }

        delta.added.sort();
        delta.modified.sort();
        delta.removed.sort();
        delta.unchanged.sort();
        Ok(delta)
    }
}

enum ClassifyOutcome {
    /// Symlinks are always rejected here (§4.5); a prior entry is handled by the
    /// caller treating it as "removed if previously indexed" via the `removed` set.
    Skip,
    Classified(String),
}

async fn classify_one(project_dir: &Path, rel_path: &str) -> ClassifyOutcome {
    let full_path = match crate::paths::safe_join(project_dir, Path::new(rel_path)) {
        Ok(p) => p,
        Err(_) => return ClassifyOutcome::Skip,
    };

    let metadata = match tokio::fs::symlink_metadata(&full_path).await {
        Ok(m) => m,
        Err(err) => {
            use std::io::ErrorKind;
            match err.kind() {
                ErrorKind::NotFound => tracing::debug!(path = rel_path, "file vanished before hashing"),
                _ => tracing::warn!(path = rel_path, error = %err, "could not stat file"),
            }
            // The pipeline will attempt a fresh hash at indexing time; treat as
            // added here so it isn't silently dropped.
            return ClassifyOutcome::Classified(String::new());
        }
    };

    if metadata.is_symlink() {
        return ClassifyOutcome::Skip;
    }

    match tokio::fs::read(&full_path).await {
        Ok(bytes) => ClassifyOutcome::Classified(hash_bytes(&bytes)),
        Err(err) => {
            use std::io::ErrorKind;
            match err.kind() {
                ErrorKind::NotFound => tracing::debug!(path = rel_path, "file vanished before hashing"),
                _ => tracing::warn!(path = rel_path, error = %err, "read error while hashing"),
            }
            ClassifyOutcome::Classified(String::new())
        }
    }
}

pub fn hash_bytes(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    hex::encode(hasher.finalize())
}

pub async fn hash_file(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    Ok(hash_bytes(&bytes))
}

#[cfg(test)]
#[path = "fingerprint.test.rs"]
mod tests;
