//! Language-model side of the pipeline: prompt construction, completion, SQL extraction.

pub mod extract;
pub mod ollama;
pub mod prompt;

pub use extract::{extract_sql, Extraction, CLOSE_FENCE, OPEN_FENCE};
pub use ollama::{CompletionModel, OllamaClient};
pub use prompt::{Prompt, PROMPT_TEMPLATE};
