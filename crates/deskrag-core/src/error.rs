use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),

    #[error("No knowledge base available: the index holds zero documents")]
    EmptyIndex,

    #[error("Index was built with embedding model '{persisted}' but the configured model is '{configured}'; rebuild the index")]
    ModelMismatch { persisted: String, configured: String },

    #[error("Failed to load index from '{path}': {reason}")]
    IndexLoad { path: PathBuf, reason: String },

    #[error("Failed to write index to '{path}': {source}")]
    IndexWrite {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("Documents and vectors are misaligned: {documents} documents, {vectors} vectors")]
    Misaligned { documents: usize, vectors: usize },

    #[error("Document at position {position} carries id {id}")]
    IdOutOfOrder { position: usize, id: usize },

    #[error("Vector for {0} has NaN or infinite components")]
    NonFiniteVector(String),

    #[error("Embedding failed: {0}")]
    Embedding(String),

    #[error(transparent)]
    Generation(#[from] GenerationError),

    #[error("Question is empty")]
    EmptyQuestion,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// Per-query failures leave the shared index untouched; everything else is a startup failure.
    pub fn is_fatal_at_startup(&self) -> bool {
        matches!(
            self,
            Error::Ingestion(_)
                | Error::ModelMismatch { .. }
                | Error::IndexLoad { .. }
                | Error::IndexWrite { .. }
                | Error::InvalidConfig(_)
        )
    }
}

#[derive(Debug, Error)]
pub enum IngestionError {
    #[error("Knowledge base directory '{0}' does not exist")]
    MissingDirectory(PathBuf),

    #[error("Knowledge base path '{0}' is not a directory")]
    NotADirectory(PathBuf),

    #[error("Knowledge base directory '{dir}' contains no eligible .{extension} files")]
    NoEligibleFiles { dir: PathBuf, extension: String },

    #[error("Failed to read '{path}': {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Failure of the external generation call.
///
/// A model that answered with a refusal is NOT a `GenerationError`; that is a
/// normal answer and is reported through `AnswerStatus::Refused`.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum GenerationError {
    #[error("Generation timed out after {0:?}")]
    Timeout(Duration),

    #[error("Generation request failed: {0}")]
    Transport(String),

    #[error("Generation API returned status {code}: {body}")]
    Status { code: u16, body: String },

    #[error("Generation API returned an unusable response: {0}")]
    InvalidResponse(String),

    #[error("No credentials configured for the generation provider")]
    MissingCredentials,
}

impl GenerationError {
    /// Whether the caller may reasonably retry the same request.
    pub fn is_retryable(&self) -> bool {
        match self {
            GenerationError::Timeout(_) | GenerationError::Transport(_) => true,
            GenerationError::Status { code, .. } => *code == 429 || *code >= 500,
            GenerationError::InvalidResponse(_) | GenerationError::MissingCredentials => false,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
