use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{debug, info};

use deskrag_core::config::Settings;
use deskrag_core::error::{Error, GenerationError, Result};
use deskrag_core::traits::{Embedder, Generator};
use deskrag_core::types::{Answer, RetrievalResult};
use deskrag_vector::{IndexHandle, VectorIndex};

use crate::answer;
use crate::prompt::PromptComposer;
use crate::retriever;

/// Answers questions against the live index.
///
/// Per question: embed, retrieve the best document, compose the framed
/// prompt, generate, then attach the citation. Nothing is shared between
/// questions except the read-only index snapshot.
pub struct ServiceDesk {
    index: Arc<IndexHandle>,
    embedder: Arc<dyn Embedder>,
    generator: Arc<dyn Generator>,
    composer: PromptComposer,
    k: usize,
    generation_timeout: Duration,
}

impl ServiceDesk {
    pub fn new(index: Arc<IndexHandle>, embedder: Arc<dyn Embedder>, generator: Arc<dyn Generator>) -> Self {
        Self {
            index,
            embedder,
            generator,
            composer: PromptComposer::default(),
            k: 1,
            generation_timeout: Duration::from_secs(30),
        }
    }

    pub fn from_settings(
        settings: &Settings,
        index: Arc<IndexHandle>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
    ) -> Self {
        Self::new(index, embedder, generator)
            .with_k(settings.retrieval.k)
            .with_composer(PromptComposer::new(settings.prompt.max_context_chars))
            .with_generation_timeout(settings.generation.deadline())
    }

    pub fn with_k(mut self, k: usize) -> Self {
        self.k = k.max(1);
        self
    }

    pub fn with_composer(mut self, composer: PromptComposer) -> Self {
        self.composer = composer;
        self
    }

    /// Limit for one whole generation call, retries included.
    pub fn with_generation_timeout(mut self, timeout: Duration) -> Self {
        self.generation_timeout = timeout;
        self
    }

    pub fn index(&self) -> &IndexHandle {
        &self.index
    }

    /// Answer one question.
    ///
    /// An empty index yields the no-knowledge-base answer without calling the
    /// generator. A failed generation call yields an answer with
    /// `AnswerStatus::GenerationFailed`; it is never reported as a refusal.
    /// `Err` is reserved for problems with the question or the index itself.
    pub async fn ask(&self, question: &str) -> Result<Answer> {
        let question = question.trim();
        if question.is_empty() {
            return Err(Error::EmptyQuestion);
        }
        let started = Instant::now();
        let snapshot = self.index.current();

        let top = match self.retrieve(question, snapshot).await {
            Ok(top) => top,
            Err(Error::EmptyIndex) => {
                info!("Question received but the knowledge base is empty");
                return Ok(answer::no_knowledge_base());
            }
            Err(e) => return Err(e),
        };

        let prompt = self.composer.compose(question, &top.document.text);
        let generated = match tokio::time::timeout(self.generation_timeout, self.generator.generate(&prompt)).await {
            Ok(result) => result,
            Err(_) => Err(GenerationError::Timeout(self.generation_timeout)),
        };

        let answer = match generated {
            Ok(text) => answer::assemble(text, &top.document),
            Err(e) => {
                tracing::warn!("Generation via {} failed: {}", self.generator.name(), e);
                answer::generation_failed(e)
            }
        };
        debug!("Answered from {} in {:?} ({:?})", top.document.source_name, started.elapsed(), answer.status);
        Ok(answer)
    }

    async fn retrieve(&self, question: &str, snapshot: Arc<VectorIndex>) -> Result<RetrievalResult> {
        let embedder = Arc::clone(&self.embedder);
        let query = question.to_string();
        let k = self.k;
        let hits = tokio::task::spawn_blocking(move || retriever::retrieve_top_k(&query, embedder.as_ref(), &snapshot, k))
            .await
            .map_err(|e| Error::Embedding(format!("embedding task failed: {}", e)))??;
        hits.into_iter().next().ok_or(Error::EmptyIndex)
    }
}
