//! Domain types shared by the store, the index and the answer pipeline.

use serde::{Deserialize, Serialize};

use crate::error::GenerationError;

/// Position of a document in the knowledge base's sorted file order.
///
/// The same number addresses the document's vector in the index, so it is
/// only meaningful together with the index it was built into.
pub type DocumentId = usize;

/// One knowledge-base file.
///
/// - `id`: position in lexicographic file-name order
/// - `source_name`: file name, shown to the user as the citation
/// - `text`: full file contents
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: DocumentId,
    pub source_name: String,
    pub text: String,
}

/// Identity of the embedding model that produced a set of vectors.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ModelIdentity {
    pub name: String,
    pub dim: usize,
}

impl ModelIdentity {
    pub fn new(name: impl Into<String>, dim: usize) -> Self {
        Self { name: name.into(), dim }
    }
}

impl std::fmt::Display for ModelIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} (d{})", self.name, self.dim)
    }
}

/// A document returned by the index with its cosine similarity to the query.
/// Higher is better.
#[derive(Debug, Clone)]
pub struct RetrievalResult {
    pub document: Document,
    pub score: f32,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Citation {
    Source(String),
    NoSource,
}

impl Citation {
    pub fn source_name(&self) -> Option<&str> {
        match self {
            Citation::Source(name) => Some(name),
            Citation::NoSource => None,
        }
    }
}

impl std::fmt::Display for Citation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Citation::Source(name) => f.write_str(name),
            Citation::NoSource => f.write_str("none"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnswerStatus {
    /// The generator answered from the retrieved document.
    Answered,
    /// The generator saw the retrieved document and declined to answer.
    Refused,
    /// The index is empty; the generator was not called.
    NoKnowledgeBase,
    /// The generation call itself failed. Eligible for a caller-driven retry.
    GenerationFailed(GenerationError),
}

/// Final response for one question.
#[derive(Debug, Clone)]
pub struct Answer {
    pub text: String,
    pub citation: Citation,
    pub status: AnswerStatus,
}

impl Answer {
    pub fn is_failure(&self) -> bool {
        matches!(self.status, AnswerStatus::GenerationFailed(_))
    }
}
