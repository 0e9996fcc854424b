use super::*;
use async_trait::async_trait;

struct StubProvider {
    dim: usize,
}

#[async_trait]
impl EmbeddingProvider for StubProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(vec![text.len() as f32; self.dim])
    }

    fn dimension(&self) -> usize {
        self.dim
    }

    fn artifact_id(&self) -> &str {
        "stub-v1"
    }
}

#[tokio::test]
async fn default_embed_batch_embeds_each_item_in_order() {
    let provider = StubProvider { dim: 3 };
    let out = provider
        .embed_batch(&["a".to_string(), "bb".to_string()])
        .await
        .unwrap();
    assert_eq!(out, vec![vec![1.0, 1.0, 1.0], vec![2.0, 2.0, 2.0]]);
}
