use super::*;
use crate::types::Chunk;
use tempfile::tempdir;

fn chunk(path: &str, vector: Vec<f32>, start: u32, end: u32) -> Chunk {
    Chunk::new(path, "some text", vector, start, end, "hash")
}

#[tokio::test]
async fn insert_and_search_returns_closest_first() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), 4).await.unwrap();

    store
        .insert(&[
            chunk("a.rs", vec![1.0, 0.0, 0.0, 0.0], 1, 1),
            chunk("b.rs", vec![0.0, 1.0, 0.0, 0.0], 1, 1),
        ])
        .await
        .unwrap();

    let results = store.search(&[1.0, 0.0, 0.0, 0.0], 2).await.unwrap();
    assert_eq!(results[0].0.path, "a.rs");
    assert!(results[0].1 >= results[1].1);
}

#[tokio::test]
async fn search_rejects_dimension_mismatch() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), 4).await.unwrap();
    let err = store.search(&[1.0, 0.0], 5).await.unwrap_err();
    assert_eq!(err.code(), crate::error::ErrorCode::DimensionMismatch);
}

#[tokio::test]
async fn search_clamps_k_into_range() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), 4).await.unwrap();
    store
        .insert(&[chunk("a.rs", vec![1.0, 0.0, 0.0, 0.0], 1, 1)])
        .await
        .unwrap();
    // k=0 and k=1000 must not panic; both clamp into [1, 100].
    let low = store.search(&[1.0, 0.0, 0.0, 0.0], 0).await.unwrap();
    let high = store.search(&[1.0, 0.0, 0.0, 0.0], 1000).await.unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(high.len(), 1);
}

#[tokio::test]
async fn search_by_path_glob_matches_expected_set() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), 4).await.unwrap();
    store
        .insert(&[
            chunk("src/index.ts", vec![0.0; 4], 1, 1),
            chunk("src/util/hash.ts", vec![0.0; 4], 1, 1),
            chunk("README.md", vec![0.0; 4], 1, 1),
        ])
        .await
        .unwrap();

    let matches = store.search_by_path("src/%", 20).await.unwrap();
    assert_eq!(matches, vec!["src/index.ts", "src/util/hash.ts"]);
}

#[tokio::test]
async fn search_by_path_with_no_matches_returns_empty_not_error() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), 4).await.unwrap();
    let matches = store.search_by_path("nonexistent/%", 20).await.unwrap();
    assert_eq!(matches, Vec::<String>::new());
}

#[tokio::test]
async fn get_by_ids_drops_malformed_ids_silently() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), 4).await.unwrap();
    let c = chunk("a.rs", vec![0.0; 4], 1, 1);
    let id = c.id;
    store.insert(&[c]).await.unwrap();

    let result = store.get_by_ids(&[id, Uuid::nil()]).await.unwrap();
    assert_eq!(result.len(), 1);
    assert!(result.contains_key(&id));
}

#[tokio::test]
async fn delete_by_path_removes_all_chunks_for_path() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), 4).await.unwrap();
    store
        .insert(&[
            chunk("a.rs", vec![0.0; 4], 1, 1),
            chunk("a.rs", vec![0.0; 4], 2, 2),
            chunk("b.rs", vec![0.0; 4], 1, 1),
        ])
        .await
        .unwrap();

    let deleted = store.delete_by_path("a.rs").await.unwrap();
    assert_eq!(deleted, 2);
    assert_eq!(store.count().await.unwrap(), 1);
}

#[tokio::test]
async fn list_files_is_deduplicated_and_sorted() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), 4).await.unwrap();
    store
        .insert(&[
            chunk("b.rs", vec![0.0; 4], 1, 1),
            chunk("a.rs", vec![0.0; 4], 1, 1),
            chunk("a.rs", vec![0.0; 4], 2, 2),
        ])
        .await
        .unwrap();
    let files = store.list_files(10).await.unwrap();
    assert_eq!(files, vec!["a.rs", "b.rs"]);
}

#[tokio::test]
async fn create_vector_index_reports_brute_force_below_threshold() {
    let dir = tempdir().unwrap();
    let store = VectorStore::open(dir.path(), 4).await.unwrap();
    let strategy = store.create_vector_index().await.unwrap();
    assert_eq!(strategy, IndexStrategy::BruteForce);
}

#[test]
fn escape_sql_value_rejects_comment_sequences() {
    assert!(escape_sql_value("a'; --").is_err());
    assert!(escape_sql_value("normal/path.rs").is_ok());
}

#[test]
fn glob_to_like_translates_double_star_and_escapes_literals() {
    assert_eq!(glob_to_like("src/**/*.ts").unwrap(), "src/%/%.ts");
    assert_eq!(glob_to_like("100%_done").unwrap(), "100\\%\\_done");
}
