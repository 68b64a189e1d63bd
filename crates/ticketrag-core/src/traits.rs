use crate::types::RetrievalHit;

pub trait Embedder: Send + Sync {
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;
}

/// Nearest-neighbour lookup over the vectors of the reference table.
///
/// Results are ordered by ascending distance and hold at most `k` hits.
/// Searching an empty index is an error.
#[async_trait::async_trait]
pub trait SimilarityIndex: Send + Sync {
    async fn count(&self) -> anyhow::Result<usize>;
    async fn search(&self, query_vec: &[f32], k: usize) -> anyhow::Result<Vec<RetrievalHit>>;
}

pub trait Generator: Send + Sync {
    fn model_name(&self) -> &str;
    fn generate(&self, prompt: &str, max_output_length: usize) -> anyhow::Result<String>;
}
