use super::*;
use async_trait::async_trait;
use tempfile::tempdir;

struct StubProvider;

#[async_trait]
impl EmbeddingProvider for StubProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vec![text.len() as f32; 4])
    }

    fn dimension(&self) -> usize {
        4
    }

    fn artifact_id(&self) -> &str {
        "stub-v1"
    }
}

fn pipeline_for(project_dir: &Path, index_dir: &Path) -> IndexingPipeline {
    IndexingPipeline::new(
        project_dir.to_path_buf(),
        index_dir.to_path_buf(),
        Config::default(),
        Arc::new(StubProvider),
    )
    .unwrap()
}

#[tokio::test]
async fn full_index_covers_every_eligible_file() {
    let project = tempdir().unwrap();
    std::fs::write(project.path().join("a.rs"), "fn a() {}").unwrap();
    std::fs::write(project.path().join("b.rs"), "fn b() {}").unwrap();
    let index_dir = tempdir().unwrap();

    let pipeline = pipeline_for(project.path(), index_dir.path());
    let stats = pipeline.run_full(None).await.unwrap();
    assert_eq!(stats.total_files, 2);
    assert!(stats.total_chunks >= 2);
}

#[tokio::test]
async fn incremental_update_only_touches_changed_files() {
    let project = tempdir().unwrap();
    std::fs::write(project.path().join("a.rs"), "fn a() {}").unwrap();
    let index_dir = tempdir().unwrap();
    let pipeline = pipeline_for(project.path(), index_dir.path());
    pipeline.run_full(None).await.unwrap();

    std::fs::write(project.path().join("b.rs"), "fn b() {}").unwrap();
    let stats = pipeline.run_incremental(None).await.unwrap();
    assert_eq!(stats.total_files, 1);
}

#[tokio::test]
async fn reindex_file_replaces_a_single_files_chunks() {
    let project = tempdir().unwrap();
    std::fs::write(project.path().join("a.rs"), "fn a() {}").unwrap();
    let index_dir = tempdir().unwrap();
    let pipeline = pipeline_for(project.path(), index_dir.path());
    pipeline.run_full(None).await.unwrap();

    std::fs::write(project.path().join("a.rs"), "fn a() { /* changed */ }").unwrap();
    pipeline.reindex_file("a.rs").await.unwrap();

    let store = VectorStore::open(&crate::paths::code_store_dir(index_dir.path()), 4)
        .await
        .unwrap();
    let files = store.list_files(10).await.unwrap();
    assert_eq!(files, vec!["a.rs".to_string()]);
}

#[tokio::test]
async fn hard_denied_directories_are_never_indexed() {
    let project = tempdir().unwrap();
    std::fs::create_dir_all(project.path().join("node_modules")).unwrap();
    std::fs::write(project.path().join("node_modules/pkg.js"), "module.exports = {}").unwrap();
    std::fs::write(project.path().join("real.rs"), "fn real() {}").unwrap();
    let index_dir = tempdir().unwrap();

    let pipeline = pipeline_for(project.path(), index_dir.path());
    let stats = pipeline.run_full(None).await.unwrap();
    assert_eq!(stats.total_files, 1);
}
