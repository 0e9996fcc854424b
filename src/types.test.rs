use super::*;

#[test]
fn chunk_new_has_nil_chunk_hash_and_fresh_uuid() {
    let a = Chunk::new("src/a.rs", "fn main() {}", vec![0.0; 4], 1, 1, "deadbeef");
    let b = Chunk::new("src/a.rs", "fn main() {}", vec![0.0; 4], 1, 1, "deadbeef");
    assert_ne!(a.id, b.id);
    assert!(a.chunk_hash.is_none());
}

#[test]
fn indexing_state_defaults_to_complete() {
    let record = IndexingStateRecord::default();
    assert_eq!(record.state, IndexingState::Complete);
}

#[test]
fn legacy_metadata_without_indexing_state_reads_as_complete() {
    let json = serde_json::json!({
        "version": "1.0.0",
        "project_path": "/tmp/proj",
        "created_at": "2024-01-01T00:00:00Z",
        "stats": {"total_files": 1, "total_chunks": 1, "storage_size_bytes": 10}
    });
    let metadata: Metadata = serde_json::from_value(json).unwrap();
    assert_eq!(metadata.indexing_state.state, IndexingState::Complete);
}

#[test]
fn delta_changed_chains_added_and_modified() {
    let delta = Delta {
        added: vec!["a".to_string()],
        modified: vec!["b".to_string()],
        removed: vec!["c".to_string()],
        unchanged: vec!["d".to_string()],
    };
    let changed: Vec<&String> = delta.changed().collect();
    assert_eq!(changed, vec!["a", "b"]);
}
