use async_trait::async_trait;

use crate::error::GenerationError;
use crate::types::ModelIdentity;

pub trait Embedder: Send + Sync {
    /// Stable name of the model (and revision) producing the vectors.
    fn model_name(&self) -> &str;
    fn dim(&self) -> usize;
    fn max_len(&self) -> usize;
    /// Embed a batch; output order matches input order.
    fn embed_batch(&self, texts: &[String]) -> anyhow::Result<Vec<Vec<f32>>>;

    fn embed(&self, text: &str) -> anyhow::Result<Vec<f32>> {
        self.embed_batch(&[text.to_string()])?
            .pop()
            .ok_or_else(|| anyhow::anyhow!("embedder returned no vector"))
    }

    fn identity(&self) -> ModelIdentity {
        ModelIdentity::new(self.model_name(), self.dim())
    }
}

/// A system instruction plus the user turn that carries context and question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Prompt {
    pub system: String,
    pub user: String,
    /// The context document was cut to fit the prompt budget.
    pub truncated: bool,
}

impl Prompt {
    /// Single-string form for generators without a separate system channel.
    pub fn render(&self) -> String {
        format!("{}\n\n{}", self.system, self.user)
    }
}

#[async_trait]
pub trait Generator: Send + Sync {
    fn name(&self) -> &str;
    async fn generate(&self, prompt: &Prompt) -> Result<String, GenerationError>;
}
