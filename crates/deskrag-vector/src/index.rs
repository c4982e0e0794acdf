use deskrag_core::error::{Error, Result};
use deskrag_core::types::{Document, ModelIdentity, RetrievalResult};

/// Exact nearest-neighbour index over one vector per document.
///
/// `vectors[i]` is the embedding of `documents[i]`, and `documents[i].id == i`.
/// Both are checked on construction; the index is immutable afterwards.
#[derive(Debug, Clone)]
pub struct VectorIndex {
    model: ModelIdentity,
    documents: Vec<Document>,
    vectors: Vec<Vec<f32>>,
}

impl VectorIndex {
    pub fn empty(model: ModelIdentity) -> Self {
        Self { model, documents: Vec::new(), vectors: Vec::new() }
    }

    pub fn from_parts(model: ModelIdentity, documents: Vec<Document>, vectors: Vec<Vec<f32>>) -> Result<Self> {
        if documents.len() != vectors.len() {
            return Err(Error::Misaligned { documents: documents.len(), vectors: vectors.len() });
        }
        if let Some((pos, doc)) = documents.iter().enumerate().find(|(i, d)| d.id != *i) {
            return Err(Error::IdOutOfOrder { position: pos, id: doc.id });
        }
        if let Some(bad) = vectors.iter().find(|v| v.len() != model.dim) {
            return Err(Error::DimensionMismatch { expected: model.dim, actual: bad.len() });
        }
        if let Some(pos) = vectors.iter().position(|v| !is_finite(v)) {
            return Err(Error::NonFiniteVector(format!("document {}", pos)));
        }
        Ok(Self { model, documents, vectors })
    }

    pub fn model(&self) -> &ModelIdentity { &self.model }
    pub fn len(&self) -> usize { self.documents.len() }
    pub fn is_empty(&self) -> bool { self.documents.is_empty() }
    pub fn documents(&self) -> &[Document] { &self.documents }
    pub fn vectors(&self) -> &[Vec<f32>] { &self.vectors }

    /// Up to `k` documents by descending cosine similarity; ties go to the lower id.
    pub fn search(&self, query: &[f32], k: usize) -> Result<Vec<RetrievalResult>> {
        if self.is_empty() {
            return Err(Error::EmptyIndex);
        }
        if query.len() != self.model.dim {
            return Err(Error::DimensionMismatch { expected: self.model.dim, actual: query.len() });
        }
        if !is_finite(query) {
            return Err(Error::NonFiniteVector("query".to_string()));
        }

        let query_norm = magnitude(query);
        let mut scored: Vec<(usize, f32)> = self
            .vectors
            .iter()
            .enumerate()
            .map(|(i, v)| (i, cosine_similarity(query, v, query_norm)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        Ok(scored
            .into_iter()
            .map(|(i, score)| RetrievalResult { document: self.documents[i].clone(), score })
            .collect())
    }
}

fn is_finite(v: &[f32]) -> bool {
    v.iter().all(|x| x.is_finite())
}

pub fn magnitude(v: &[f32]) -> f32 {
    v.iter().map(|x| x * x).sum::<f32>().sqrt()
}

/// Cosine similarity; zero vectors score 0.
pub fn cosine_similarity(a: &[f32], b: &[f32], mag_a: f32) -> f32 {
    let mag_b = magnitude(b);
    if mag_a == 0.0 || mag_b == 0.0 {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b).map(|(x, y)| x * y).sum();
    dot / (mag_a * mag_b)
}
