use deskrag_core::error::GenerationError;
use deskrag_core::types::{Answer, AnswerStatus, Citation, Document};

use crate::prompt::is_refusal;

pub const NO_KNOWLEDGE_BASE: &str = "I'm sorry, no knowledge base is available to answer questions yet. \
Please contact a human IT support agent.";

pub const GENERATION_FAILED: &str = "I'm sorry, I encountered an error while generating a response. Please try again.";

/// Attach the consulted document's citation to the generated text.
///
/// The citation is kept for refusals too: it names the document that was
/// judged insufficient.
pub fn assemble(generated: String, retrieved: &Document) -> Answer {
    let status = if is_refusal(&generated) { AnswerStatus::Refused } else { AnswerStatus::Answered };
    Answer { text: generated.trim().to_string(), citation: Citation::Source(retrieved.source_name.clone()), status }
}

pub fn no_knowledge_base() -> Answer {
    Answer { text: NO_KNOWLEDGE_BASE.to_string(), citation: Citation::NoSource, status: AnswerStatus::NoKnowledgeBase }
}

pub fn generation_failed(error: GenerationError) -> Answer {
    Answer {
        text: GENERATION_FAILED.to_string(),
        citation: Citation::NoSource,
        status: AnswerStatus::GenerationFailed(error),
    }
}
