//! Error taxonomy for the index lifecycle subsystem.
//!
//! Every fallible operation returns [`Error`], a tagged-variant sum type rather than
//! a string. Each variant maps to one abstract error code from the external error
//! catalog and carries both a user-facing remediation and (via `source()`) the full
//! developer-facing cause chain.

use std::path::PathBuf;

use thiserror::Error;

/// Abstract error code, stable across implementations, usable by callers that need
/// to branch on error kind rather than match on message text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    IndexNotFound,
    IndexCorrupt,
    FileNotFound,
    PermissionDenied,
    InvalidPattern,
    DimensionMismatch,
    ModelDownloadFailed,
    DiskFull,
    Busy,
    SymlinkNotAllowed,
    FileLimitWarning,
}

#[derive(Debug, Error)]
pub enum Error {
    #[error("no index found at {path}")]
    IndexNotFound { path: PathBuf },

    #[error("index is corrupt: {reason}")]
    IndexCorrupt {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("permission denied: {reason}")]
    PermissionDenied { reason: String },

    #[error("invalid pattern {pattern:?}: {reason}")]
    InvalidPattern { pattern: String, reason: String },

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("embedding model download failed: {reason}")]
    ModelDownloadFailed { reason: String },

    #[error("disk full while writing {path}")]
    DiskFull { path: PathBuf },

    #[error("another mutating operation is already in progress")]
    Busy,

    #[error("symlinks are not indexed: {path}")]
    SymlinkNotAllowed { path: PathBuf },

    #[error("file count limit reached: {count} exceeds configured max {max}")]
    FileLimitWarning { count: usize, max: usize },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

impl Error {
    pub fn code(&self) -> ErrorCode {
        match self {
            Error::IndexNotFound { .. } => ErrorCode::IndexNotFound,
            Error::IndexCorrupt { .. } => ErrorCode::IndexCorrupt,
            Error::FileNotFound { .. } => ErrorCode::FileNotFound,
            Error::PermissionDenied { .. } => ErrorCode::PermissionDenied,
            Error::InvalidPattern { .. } => ErrorCode::InvalidPattern,
            Error::DimensionMismatch { .. } => ErrorCode::DimensionMismatch,
            Error::ModelDownloadFailed { .. } => ErrorCode::ModelDownloadFailed,
            Error::DiskFull { .. } => ErrorCode::DiskFull,
            Error::Busy => ErrorCode::Busy,
            Error::SymlinkNotAllowed { .. } => ErrorCode::SymlinkNotAllowed,
            Error::FileLimitWarning { .. } => ErrorCode::FileLimitWarning,
            // Uncategorized lower-layer errors surface as corruption: the caller
            // asked for a read/write against the on-disk index and didn't get one.
            Error::Io(_) | Error::Sqlite(_) | Error::Json(_) => ErrorCode::IndexCorrupt,
        }
    }

    /// Short, action-oriented message with no technical jargon.
    pub fn user_message(&self) -> String {
        match self {
            Error::IndexNotFound { .. } => {
                "No index exists for this project yet. Run create_index first.".to_string()
            }
            Error::IndexCorrupt { .. } => {
                "The index appears damaged. Run reindex_project to rebuild it.".to_string()
            }
            Error::FileNotFound { path } => format!("File not found: {}", path.display()),
            Error::PermissionDenied { reason } => format!("Not allowed: {reason}"),
            Error::InvalidPattern { pattern, .. } => {
                format!("The pattern {pattern:?} isn't valid. Check the glob syntax and retry.")
            }
            Error::DimensionMismatch { .. } => {
                "The query doesn't match this index's embedding model. Rebuild the index."
                    .to_string()
            }
            Error::ModelDownloadFailed { .. } => {
                "Could not download the embedding model. Check your network connection."
                    .to_string()
            }
            Error::DiskFull { .. } => "Out of disk space. Free some space and try again.".to_string(),
            Error::Busy => {
                "Another indexing operation is already running. Try again shortly.".to_string()
            }
            Error::SymlinkNotAllowed { .. } => "Symlinks are not indexed.".to_string(),
            Error::FileLimitWarning { count, max } => format!(
                "This project has {count} files, above the configured limit of {max}. Confirm to proceed anyway."
            ),
            Error::Io(_) | Error::Sqlite(_) | Error::Json(_) => {
                "The index appears damaged. Run reindex_project to rebuild it.".to_string()
            }
        }
    }

    /// Developer-facing message including the full cause chain.
    pub fn dev_message(&self) -> String {
        let mut out = self.to_string();
        let mut cause = std::error::Error::source(self);
        while let Some(err) = cause {
            out.push_str(": ");
            out.push_str(&err.to_string());
            cause = err.source();
        }
        out
    }
}

pub type Result<T> = std::result::Result<T, Error>;
