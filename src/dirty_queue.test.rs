use super::*;
use tempfile::tempdir;

#[test]
fn add_clears_existing_tombstone_for_same_path() {
    let dir = tempdir().unwrap();
    let mut queue = DirtyQueue::load(&dir.path().join("dirty-files.json")).unwrap();
    queue.mark_deleted("a.rs");
    queue.add("a.rs");
    assert_eq!(queue.get_pending(), vec!["a.rs".to_string()]);
    assert!(queue.get_tombstoned().is_empty());
}

#[test]
fn mark_deleted_clears_existing_plain_entry() {
    let dir = tempdir().unwrap();
    let mut queue = DirtyQueue::load(&dir.path().join("dirty-files.json")).unwrap();
    queue.add("a.rs");
    queue.mark_deleted("a.rs");
    assert!(queue.get_pending().is_empty());
    assert_eq!(queue.get_tombstoned(), vec!["a.rs".to_string()]);
}

#[test]
fn path_and_tombstone_never_coexist() {
    let dir = tempdir().unwrap();
    let mut queue = DirtyQueue::load(&dir.path().join("dirty-files.json")).unwrap();
    queue.add("a.rs");
    queue.mark_deleted("a.rs");
    queue.add("a.rs");
    queue.mark_deleted("a.rs");
    let total = queue.get_pending().len() + queue.get_tombstoned().len();
    assert_eq!(total, 1);
}

#[test]
fn save_then_load_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dirty-files.json");
    let mut queue = DirtyQueue::load(&path).unwrap();
    queue.add("a.rs");
    queue.mark_deleted("b.rs");
    queue.save().unwrap();

    let reloaded = DirtyQueue::load(&path).unwrap();
    assert_eq!(reloaded.get_pending(), vec!["a.rs".to_string()]);
    assert_eq!(reloaded.get_tombstoned(), vec!["b.rs".to_string()]);
}

#[test]
fn save_is_a_no_op_when_not_dirty() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("dirty-files.json");
    let mut queue = DirtyQueue::load(&path).unwrap();
    queue.save().unwrap();
    assert!(!path.exists(), "save with no modifications should not write a file");
}
