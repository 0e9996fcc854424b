//! On-disk storage layout: the global indexes root, per-project directory naming,
//! and the atomic-write primitive every component's save path uses.

use std::path::Path;
use std::path::PathBuf;

use sha2::Digest;
use sha2::Sha256;

use crate::error::Error;
use crate::error::Result;

/// Root directory under which every project's index lives: `<home>/.mcp/search/`.
pub fn indexes_root() -> Result<PathBuf> {
    let home = dirs::home_dir().ok_or_else(|| Error::IndexCorrupt {
        reason: "could not determine home directory".to_string(),
        source: None,
    })?;
    Ok(home.join(".mcp").join("search"))
}

/// Per-project directory name: hex digest of the canonicalized project path.
pub fn project_dir_name(project_path: &Path) -> Result<String> {
    let canonical = project_path.canonicalize()?;
    let mut hasher = Sha256::new();
    hasher.update(canonical.to_string_lossy().as_bytes());
    Ok(hex::encode(hasher.finalize()))
}

/// Full per-project index directory: `<indexes_root>/<hex digest>`.
pub fn project_dir(project_path: &Path) -> Result<PathBuf> {
    Ok(indexes_root()?.join(project_dir_name(project_path)?))
}

pub fn fingerprints_path(index_dir: &Path) -> PathBuf {
    index_dir.join("fingerprints.json")
}

pub fn docs_fingerprints_path(index_dir: &Path) -> PathBuf {
    index_dir.join("docs-fingerprints.json")
}

pub fn dirty_files_path(index_dir: &Path) -> PathBuf {
    index_dir.join("dirty-files.json")
}

pub fn config_path(index_dir: &Path) -> PathBuf {
    index_dir.join("config.json")
}

pub fn metadata_path(index_dir: &Path) -> PathBuf {
    index_dir.join("metadata.json")
}

pub fn code_store_dir(index_dir: &Path) -> PathBuf {
    index_dir.join("index.lancedb")
}

pub fn docs_store_dir(index_dir: &Path) -> PathBuf {
    index_dir.join("docs.lancedb")
}

pub fn embed_cache_path(index_dir: &Path) -> PathBuf {
    index_dir.join("embed-cache.sqlite3")
}

/// Verify `candidate` is contained within `root` after canonicalization, rejecting
/// traversal escapes. Used by every delete path and by the fingerprint ledger's
/// safe-join against the project directory.
pub fn safe_join(root: &Path, candidate: &Path) -> Result<PathBuf> {
    if candidate
        .components()
        .any(|c| matches!(c, std::path::Component::ParentDir))
    {
        return Err(Error::PermissionDenied {
            reason: format!("{} escapes {}", candidate.display(), root.display()),
        });
    }

    let joined = root.join(candidate);
    let canonical_root = root.canonicalize()?;
    let canonical_joined = match joined.canonicalize() {
        Ok(p) => p,
        // The target may not exist yet (e.g. a path about to be created); lexical
        // containment is sound here since `candidate` was already checked above
        // to contain no `..` component.
        Err(_) => joined.clone(),
    };
    if canonical_joined.starts_with(&canonical_root) {
        Ok(joined)
    } else {
        Err(Error::PermissionDenied {
            reason: format!("{} escapes {}", candidate.display(), root.display()),
        })
    }
}

/// Reject a delete target outside the global indexes root, even if the directory
/// exists and is otherwise a well-formed project directory.
pub fn require_within_indexes_root(target: &Path) -> Result<()> {
    let root = indexes_root()?;
    let canonical_root = root.canonicalize().unwrap_or(root);
    let canonical_target = target.canonicalize().unwrap_or_else(|_| target.to_path_buf());
    if canonical_target.starts_with(&canonical_root) {
        Ok(())
    } else {
        Err(Error::PermissionDenied {
            reason: format!(
                "{} is outside the indexes root {}",
                target.display(),
                canonical_root.display()
            ),
        })
    }
}

/// Atomic write: serialize to a temporary sibling, then rename. Never
/// truncate-in-place, so a crash mid-write leaves the previous file intact.
pub fn atomic_write(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let tmp_path = path.with_extension(format!(
        "{}.tmp",
        path.extension().and_then(|e| e.to_str()).unwrap_or("")
    ));
    std::fs::write(&tmp_path, contents)?;
    std::fs::rename(&tmp_path, path)?;
    Ok(())
}

#[cfg(test)]
#[path = "paths.test.rs"]
mod tests;
