//! Filesystem watcher and periodic integrity sweep.
//!
//! The watcher emits debounced, policy-filtered relative paths over an mpsc
//! channel so the caller can feed them into [`crate::pipeline::IndexingPipeline`]
//! (typically via the dirty queue rather than indexing inline). A separate
//! integrity sweep re-walks the project on a fixed interval and reconciles the
//! fingerprint ledger against the filesystem, catching changes the OS watch
//! missed (a `notify` channel overflow, or changes made while the process was
//! not running).

use std::collections::HashMap;
use std::path::Path;
use std::path::PathBuf;
use std::time::Duration;
use std::time::Instant;

use notify::RecursiveMode;
use notify::Watcher as _;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::error::Error;
use crate::error::Result;
use crate::policy::PolicyFilter;

/// Debounce window: raw filesystem events for the same path within this
/// window are collapsed into one.
const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);
/// How often the integrity sweep re-walks the project from scratch.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(600);

/// A batch of project-relative paths that changed, ready for the dirty queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeBatch {
    pub changed: Vec<String>,
    pub removed: Vec<String>,
}

pub struct FileWatcher {
    _watcher: notify::RecommendedWatcher,
    rx: mpsc::Receiver<ChangeBatch>,
    cancel: CancellationToken,
}

impl FileWatcher {
    /// Start watching `project_dir`. Debounced, policy-filtered batches arrive
    /// on the returned watcher's channel; call [`FileWatcher::recv`] in a loop.
    pub fn start(project_dir: &Path, policy: PolicyFilter) -> Result<Self> {
        Self::start_with_debounce(project_dir, policy, DEFAULT_DEBOUNCE)
    }

    pub fn start_with_debounce(
        project_dir: &Path,
        policy: PolicyFilter,
        debounce: Duration,
    ) -> Result<Self> {
        let (raw_tx, raw_rx) = mpsc::unbounded_channel::<notify::Event>();
        let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
            if let Ok(event) = res {
                let _ = raw_tx.send(event);
            }
        })
        .map_err(|err| Error::IndexCorrupt {
            reason: "failed to start filesystem watcher".to_string(),
            source: Some(Box::new(err)),
        })?;
        watcher
            .watch(project_dir, RecursiveMode::Recursive)
            .map_err(|err| Error::IndexCorrupt {
                reason: format!("failed to watch {}", project_dir.display()),
                source: Some(Box::new(err)),
            })?;

        let (batch_tx, batch_rx) = mpsc::channel(64);
        let cancel = CancellationToken::new();
        let project_dir = project_dir.to_path_buf();
        let task_cancel = cancel.clone();
        tokio::spawn(async move {
            run_debounce_loop(project_dir, policy, raw_rx, batch_tx, debounce, task_cancel).await;
        });

        Ok(Self {
            _watcher: watcher,
            rx: batch_rx,
            cancel,
        })
    }

    pub async fn recv(&mut self) -> Option<ChangeBatch> {
        self.rx.recv().await
    }

    /// Whether a raw path should never reach the dirty queue regardless of
    /// debounce timing — hidden files and the hard deny list.
    pub fn should_skip(rel_path: &str) -> bool {
        Path::new(rel_path)
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|name| name.starts_with('.'))
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn run_debounce_loop(
    project_dir: PathBuf,
    policy: PolicyFilter,
    mut raw_rx: mpsc::UnboundedReceiver<notify::Event>,
    batch_tx: mpsc::Sender<ChangeBatch>,
    debounce: Duration,
    cancel: CancellationToken,
) {
    let mut pending: HashMap<String, Instant> = HashMap::new();
    let mut removed: HashMap<String, Instant> = HashMap::new();
    let tick = tokio::time::interval(debounce);
    tokio::pin!(tick);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            event = raw_rx.recv() => {
                let Some(event) = event else { break };
                for path in &event.paths {
                    let Ok(rel) = path.strip_prefix(&project_dir) else { continue };
                    let rel_str = rel.to_string_lossy().replace('\\', "/");
                    if FileWatcher::should_skip(&rel_str) || policy.is_hard_denied(&rel_str) {
                        continue;
                    }
                    if matches!(event.kind, notify::EventKind::Remove(_)) {
                        removed.insert(rel_str, Instant::now());
                    } else {
                        pending.insert(rel_str, Instant::now());
                    }
                }
            }
            _ = tick.tick() => {
                if pending.is_empty() && removed.is_empty() {
                    continue;
                }
                let now = Instant::now();
                let changed: Vec<String> = pending
                    .iter()
                    .filter(|(_, t)| now.duration_since(**t) >= debounce)
                    .map(|(p, _)| p.clone())
                    .collect();
                let gone: Vec<String> = removed
                    .iter()
                    .filter(|(_, t)| now.duration_since(**t) >= debounce)
                    .map(|(p, _)| p.clone())
                    .collect();
                if changed.is_empty() && gone.is_empty() {
                    continue;
                }
                for p in &changed { pending.remove(p); }
                for p in &gone { removed.remove(p); }
                let mut changed = changed;
                changed.sort();
                let mut gone = gone;
                gone.sort();
                if batch_tx.send(ChangeBatch { changed, removed: gone }).await.is_err() {
                    break;
                }
            }
        }
    }
}

/// Periodically re-walk the project and reconcile the fingerprint ledger,
/// returning the same four-way delta an incremental update would compute.
/// Intended to run on a background interval alongside the watcher so missed
/// or coalesced filesystem events are eventually caught.
pub struct IntegritySweep {
    interval: Duration,
}

impl IntegritySweep {
    pub fn new(interval: Duration) -> Self {
        Self { interval }
    }

    pub fn default_interval() -> Self {
        Self::new(DEFAULT_SWEEP_INTERVAL)
    }

    /// Run one sweep: walk `project_dir` under `policy` and diff against
    /// `ledger`. Does not mutate the ledger; the caller applies the delta
    /// through the normal incremental indexing path so failures are retried.
    pub async fn run_once(
        &self,
        project_dir: &Path,
        policy: &PolicyFilter,
        ledger: &crate::fingerprint::FingerprintLedger,
        max_files: usize,
    ) -> Result<crate::types::Delta> {
        let candidates = policy.walk(max_files)?;
        ledger.delta(project_dir, &candidates).await
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }
}

#[cfg(test)]
#[path = "watcher.test.rs"]
mod tests;
