use super::*;
use tempfile::tempdir;

#[test]
fn missing_file_creates_fresh_complete_record() {
    let dir = tempdir().unwrap();
    let journal = MetadataJournal::load_or_create(&dir.path().join("metadata.json"), "/proj").unwrap();
    assert_eq!(journal.record().indexing_state.state, IndexingState::Complete);
}

#[test]
fn legacy_record_without_indexing_state_reads_as_complete() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("metadata.json");
    std::fs::write(
        &path,
        r#"{"version":"1.0.0","project_path":"/proj","created_at":"2024-01-01T00:00:00Z","stats":{"total_files":1,"total_chunks":1,"storage_size_bytes":10}}"#,
    )
    .unwrap();
    let journal = MetadataJournal::load_or_create(&path, "/proj").unwrap();
    assert_eq!(journal.record().indexing_state.state, IndexingState::Complete);
}

#[test]
fn start_indexing_fails_busy_while_another_run_is_live() {
    let dir = tempdir().unwrap();
    let mut journal =
        MetadataJournal::load_or_create(&dir.path().join("metadata.json"), "/proj").unwrap();
    journal.start_indexing(10).unwrap();
    let err = journal.start_indexing(10).unwrap_err();
    assert_eq!(err.code(), crate::error::ErrorCode::Busy);
}

#[test]
fn stale_in_progress_is_reclaimable() {
    let dir = tempdir().unwrap();
    let mut journal =
        MetadataJournal::load_or_create(&dir.path().join("metadata.json"), "/proj").unwrap();
    journal.start_indexing(10).unwrap();
    journal.record.indexing_state.started_at =
        Some(chrono::Utc::now() - chrono::Duration::seconds(301));
    assert!(journal.is_stale_in_progress());
    // A stale run no longer blocks a fresh start.
    journal.start_indexing(20).unwrap();
}

#[test]
fn complete_sets_last_full_index_for_full_runs() {
    let dir = tempdir().unwrap();
    let mut journal =
        MetadataJournal::load_or_create(&dir.path().join("metadata.json"), "/proj").unwrap();
    journal.start_indexing(1).unwrap();
    journal.complete(IndexStats::default(), true).unwrap();
    assert!(journal.record().last_full_index.is_some());
    assert_eq!(journal.record().indexing_state.state, IndexingState::Complete);
}

#[test]
fn fail_records_error_message_and_state() {
    let dir = tempdir().unwrap();
    let mut journal =
        MetadataJournal::load_or_create(&dir.path().join("metadata.json"), "/proj").unwrap();
    journal.start_indexing(1).unwrap();
    journal.fail("disk full").unwrap();
    assert_eq!(journal.record().indexing_state.state, IndexingState::Failed);
    assert_eq!(
        journal.record().indexing_state.error_message.as_deref(),
        Some("disk full")
    );
}
