use super::*;

fn config() -> HttpProviderConfig {
    HttpProviderConfig {
        endpoint: "http://localhost:9999/v1/embeddings".to_string(),
        model: "test-embed-v1".to_string(),
        api_key: None,
        dimension: 8,
    }
}

#[test]
fn dimension_and_artifact_id_reflect_config() {
    let provider = HttpEmbeddingProvider::new(config());
    assert_eq!(provider.dimension(), 8);
    assert_eq!(provider.artifact_id(), "test-embed-v1");
}

#[tokio::test]
async fn embed_batch_of_empty_input_short_circuits_without_a_request() {
    let provider = HttpEmbeddingProvider::new(config());
    let out = provider.embed_batch(&[]).await.unwrap();
    assert!(out.is_empty());
}

#[tokio::test]
async fn unreachable_endpoint_surfaces_as_model_download_failed() {
    let provider = HttpEmbeddingProvider::new(config());
    let err = provider.embed("fn main() {}").await.unwrap_err();
    assert_eq!(err.code(), crate::error::ErrorCode::ModelDownloadFailed);
}
