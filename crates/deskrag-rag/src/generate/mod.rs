//! Generation Provider boundary.
//!
//! The pipeline only sees `deskrag_core::traits::Generator`; `gemini` is the
//! network-backed implementation wired in by the CLI.

use std::sync::Arc;

use deskrag_core::config::GenerationSettings;
use deskrag_core::traits::Generator;

pub mod gemini;

pub use deskrag_core::traits::Prompt;
pub use gemini::GeminiGenerator;

pub fn load_generator(settings: &GenerationSettings) -> Arc<dyn Generator> {
    Arc::new(GeminiGenerator::from_settings(settings))
}
