use tracing::debug;

use deskrag_core::error::{Error, Result};
use deskrag_core::traits::Embedder;
use deskrag_core::types::RetrievalResult;
use deskrag_vector::VectorIndex;

/// The single best document for `query`.
pub fn retrieve(query: &str, embedder: &dyn Embedder, index: &VectorIndex) -> Result<RetrievalResult> {
    retrieve_top_k(query, embedder, index, 1)?.into_iter().next().ok_or(Error::EmptyIndex)
}

/// Up to `k` documents for `query`, best first.
///
/// The query must be embedded by the same model that built the index;
/// anything else makes the similarity scores meaningless, so it is refused.
pub fn retrieve_top_k(query: &str, embedder: &dyn Embedder, index: &VectorIndex, k: usize) -> Result<Vec<RetrievalResult>> {
    let configured = embedder.identity();
    if index.model() != &configured {
        return Err(Error::ModelMismatch { persisted: index.model().to_string(), configured: configured.to_string() });
    }
    if index.is_empty() {
        return Err(Error::EmptyIndex);
    }

    let query_vec = embedder.embed(query).map_err(|e| Error::Embedding(format!("{:#}", e)))?;
    let hits = index.search(&query_vec, k)?;
    if let Some(top) = hits.first() {
        debug!("Top match {} (score {:.4})", top.document.source_name, top.score);
    }
    Ok(hits)
}
