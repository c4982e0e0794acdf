//! Anti-hallucination prompt framing.
//!
//! Every prompt carries the same system instruction and wraps the retrieved
//! document in fixed markers, followed by a restatement of the rule. The
//! document is the only factual context the generator is given.

use tracing::warn;

use deskrag_core::traits::Prompt;

/// What the generator must say when the context lacks the answer.
pub const REFUSAL: &str = "I'm sorry, my knowledge base does not have the information to answer this question. \
Please contact a human IT support agent.";

/// Case-insensitive fragment of `REFUSAL` used to recognise refusals.
pub const REFUSAL_MARKER: &str = "knowledge base does not have the information";

pub const TRUNCATION_MARKER: &str = "[document truncated]";

const SYSTEM_INSTRUCTION: &str = "You are a helpful and professional IT Service Desk assistant. \
You must answer the user's question only using the CONTEXT provided. \
Do not make up information or answer questions not found in the CONTEXT. \
If the CONTEXT does not contain the answer, you MUST reply with exactly: ";

pub struct PromptComposer {
    max_context_chars: usize,
}

impl Default for PromptComposer {
    fn default() -> Self {
        Self { max_context_chars: 12_000 }
    }
}

impl PromptComposer {
    pub fn new(max_context_chars: usize) -> Self {
        Self { max_context_chars: max_context_chars.max(1) }
    }

    /// Frame `document_text` as the sole context for `question`.
    ///
    /// Documents longer than the budget keep their first `max_context_chars`
    /// characters, followed by `TRUNCATION_MARKER`.
    pub fn compose(&self, question: &str, document_text: &str) -> Prompt {
        let (context, truncated) = head(document_text, self.max_context_chars);
        if truncated {
            warn!(
                "Context truncated to {} of {} characters",
                self.max_context_chars,
                document_text.chars().count()
            );
        }
        let context = if truncated { format!("{}\n{}", context, TRUNCATION_MARKER) } else { context.to_string() };

        let system = format!("{}'{}'", SYSTEM_INSTRUCTION, REFUSAL);
        let user = format!(
            "CONTEXT:\n---\n{}\n---\n\nUSER QUESTION:\n{}\n\n\
             Answer using only the CONTEXT above. If it does not contain the answer, reply with exactly: '{}'",
            context,
            question.trim(),
            REFUSAL
        );
        Prompt { system, user, truncated }
    }
}

/// First `max_chars` characters of `text`, cut on a char boundary.
fn head(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

pub fn is_refusal(answer: &str) -> bool {
    answer.to_lowercase().contains(REFUSAL_MARKER)
}
