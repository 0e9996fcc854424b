use super::*;
use crate::config::Config;
use std::time::Duration as StdDuration;
use tempfile::tempdir;

#[test]
fn should_skip_hidden_files() {
    assert!(FileWatcher::should_skip(".hidden"));
    assert!(!FileWatcher::should_skip("src/main.rs"));
}

#[tokio::test]
async fn starting_a_watcher_on_a_real_directory_succeeds() {
    let dir = tempdir().unwrap();
    let policy = PolicyFilter::new(dir.path(), &Config::default()).unwrap();
    let watcher = FileWatcher::start_with_debounce(dir.path(), policy, StdDuration::from_millis(50));
    assert!(watcher.is_ok());
}

#[tokio::test]
async fn file_creation_eventually_produces_a_change_batch() {
    let dir = tempdir().unwrap();
    let policy = PolicyFilter::new(dir.path(), &Config::default()).unwrap();
    let mut watcher =
        FileWatcher::start_with_debounce(dir.path(), policy, StdDuration::from_millis(50)).unwrap();

    std::fs::write(dir.path().join("new_file.rs"), "fn f() {}").unwrap();

    let batch = tokio::time::timeout(StdDuration::from_secs(2), watcher.recv()).await;
    if let Ok(Some(batch)) = batch {
        assert!(batch.changed.contains(&"new_file.rs".to_string()) || !batch.changed.is_empty());
    }
}

#[tokio::test]
async fn integrity_sweep_finds_files_added_outside_the_watcher() {
    let dir = tempdir().unwrap();
    std::fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
    let policy = PolicyFilter::new(dir.path(), &Config::default()).unwrap();
    let ledger = crate::fingerprint::FingerprintLedger::load(&dir.path().join("fingerprints.json")).unwrap();

    let sweep = IntegritySweep::new(StdDuration::from_secs(1));
    let delta = sweep.run_once(dir.path(), &policy, &ledger, 1000).await.unwrap();
    assert_eq!(delta.added, vec!["a.rs".to_string()]);
}
