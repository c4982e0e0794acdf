//! Question answering over the knowledge base: retrieve one document, frame
//! it as the only allowed context, generate, and attach the citation.

pub mod answer;
pub mod generate;
pub mod pipeline;
pub mod prompt;
pub mod retriever;

pub use pipeline::ServiceDesk;
pub use prompt::PromptComposer;
