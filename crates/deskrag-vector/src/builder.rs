//! Builds the vector index from the knowledge base and manages its artifact.
//!
//! Typical flow at startup:
//! 1) If the artifact exists, load it and check the embedding model identity
//! 2) Otherwise read the knowledge base, embed every document, persist
//!
//! Changes to the knowledge base are not detected; `rebuild` is the explicit
//! operator action.

use std::path::Path;

use indicatif::{ProgressBar, ProgressStyle};
use tracing::{info, warn};

use deskrag_core::document_store::DocumentStore;
use deskrag_core::error::{Error, IngestionError, Result};
use deskrag_core::traits::Embedder;
use deskrag_core::types::Document;

use crate::artifact;
use crate::index::VectorIndex;

pub struct IndexBuilder<'a> {
    embedder: &'a dyn Embedder,
    store: DocumentStore,
    batch_size: usize,
    show_progress: bool,
}

impl<'a> IndexBuilder<'a> {
    pub fn new(embedder: &'a dyn Embedder) -> Self {
        Self { embedder, store: DocumentStore::default(), batch_size: 16, show_progress: false }
    }

    pub fn with_store(mut self, store: DocumentStore) -> Self {
        self.store = store;
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    /// Embed each document once, keeping vector order identical to document order.
    pub fn build(&self, documents: Vec<Document>) -> Result<VectorIndex> {
        let model = self.embedder.identity();
        if documents.is_empty() {
            return Ok(VectorIndex::empty(model));
        }
        info!("Embedding {} documents with {}", documents.len(), model);

        let pb = self.progress_bar(documents.len());
        let mut vectors = Vec::with_capacity(documents.len());
        for batch in documents.chunks(self.batch_size) {
            let texts: Vec<String> = batch.iter().map(|d| d.text.clone()).collect();
            let embedded = self
                .embedder
                .embed_batch(&texts)
                .map_err(|e| Error::Embedding(format!("{:#}", e)))?;
            if embedded.len() != batch.len() {
                return Err(Error::Misaligned { documents: batch.len(), vectors: embedded.len() });
            }
            vectors.extend(embedded);
            pb.inc(batch.len() as u64);
        }
        pb.finish_and_clear();

        VectorIndex::from_parts(model, documents, vectors)
    }

    /// Load the persisted index, or build and persist one if none exists.
    pub fn load_or_build(&self, kb_dir: &Path, artifact_path: &Path) -> Result<VectorIndex> {
        if artifact_path.exists() {
            return artifact::read(artifact_path, &self.embedder.identity());
        }
        info!("No index at {}. Building a new one...", artifact_path.display());
        self.build_and_persist(kb_dir, artifact_path)
    }

    /// Discard any persisted index and build from the knowledge base again.
    pub fn rebuild(&self, kb_dir: &Path, artifact_path: &Path) -> Result<VectorIndex> {
        info!("Rebuilding index from {}", kb_dir.display());
        let index = self.build_and_persist(kb_dir, artifact_path)?;
        if index.is_empty() && artifact_path.exists() {
            std::fs::remove_file(artifact_path)
                .map_err(|source| Error::IndexWrite { path: artifact_path.to_path_buf(), source })?;
            info!("Removed stale index at {}", artifact_path.display());
        }
        Ok(index)
    }

    fn build_and_persist(&self, kb_dir: &Path, artifact_path: &Path) -> Result<VectorIndex> {
        let documents = match self.store.load(kb_dir) {
            Ok(docs) => docs,
            Err(Error::Ingestion(IngestionError::NoEligibleFiles { dir, .. })) => {
                warn!("No documents found in {}. Questions will get the no-knowledge-base answer.", dir.display());
                return Ok(VectorIndex::empty(self.embedder.identity()));
            }
            Err(e) => return Err(e),
        };
        let index = self.build(documents)?;
        artifact::write(&index, artifact_path)?;
        Ok(index)
    }

    fn progress_bar(&self, len: usize) -> ProgressBar {
        if !self.show_progress {
            return ProgressBar::hidden();
        }
        let pb = ProgressBar::new(len as u64);
        if let Ok(style) = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} documents ({percent}%)")
        {
            pb.set_style(style.progress_chars("#>-"));
        }
        pb
    }
}
