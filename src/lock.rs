//! Process-wide indexing lock.
//!
//! Exactly one mutating operation (full index, incremental update, single-file
//! reindex, delete) may run per project at a time. Call sites use `try_lock`
//! rather than blocking so a second caller fails fast with `BUSY` instead of
//! queuing silently behind an unbounded wait.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::Mutex as StdMutex;

use once_cell::sync::Lazy;
use tokio::sync::Mutex;
use tokio::sync::OwnedMutexGuard;

use crate::error::Error;
use crate::error::Result;

static LOCKS: Lazy<StdMutex<HashMap<String, Arc<Mutex<()>>>>> =
    Lazy::new(|| StdMutex::new(HashMap::new()));

/// RAII guard; dropping it releases the per-project indexing lock.
pub struct IndexingLock {
    _guard: OwnedMutexGuard<()>,
}

/// Acquire the indexing lock for `project_key` (typically the project's hex
/// digest directory name), failing immediately with [`Error::Busy`] if another
/// mutating operation already holds it.
pub fn try_acquire(project_key: &str) -> Result<IndexingLock> {
    let mutex = {
        let mut locks = LOCKS.lock().unwrap();
        locks
            .entry(project_key.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    };
    match mutex.try_lock_owned() {
        Ok(guard) => Ok(IndexingLock { _guard: guard }),
        Err(_) => Err(Error::Busy),
    }
}

#[cfg(test)]
#[path = "lock.test.rs"]
mod tests;
