use super::*;
use tempfile::tempdir;

#[test]
fn project_dir_name_is_stable_for_same_canonical_path() {
    let dir = tempdir().unwrap();
    let a = project_dir_name(dir.path()).unwrap();
    let b = project_dir_name(dir.path()).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 64);
}

#[test]
fn atomic_write_then_read_round_trips() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("sub").join("file.json");
    atomic_write(&path, b"hello").unwrap();
    assert_eq!(std::fs::read(&path).unwrap(), b"hello");
    // no leftover temp file
    let entries: Vec<_> = std::fs::read_dir(dir.path().join("sub"))
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(entries.len(), 1);
}

#[test]
fn safe_join_rejects_traversal_escape() {
    let dir = tempdir().unwrap();
    let outside = std::path::PathBuf::from("../../etc/passwd");
    let result = safe_join(dir.path(), &outside);
    assert!(result.is_err());
}

#[test]
fn safe_join_allows_nested_path() {
    let dir = tempdir().unwrap();
    let nested = std::path::PathBuf::from("src/main.rs");
    let result = safe_join(dir.path(), &nested).unwrap();
    assert!(result.starts_with(dir.path()));
}

#[test]
fn require_within_indexes_root_rejects_outside_directory_even_if_it_exists() {
    let dir = tempdir().unwrap();
    // dir.path() is not under the real indexes root, so this must fail even though
    // the directory genuinely exists on disk.
    let result = require_within_indexes_root(dir.path());
    assert!(result.is_err());
}
