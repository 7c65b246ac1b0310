//! text2sql - natural language questions answered with model-generated SQL
//!
//! One request flows through:
//! - Prompt construction from the user's message
//! - A completion call to a local Ollama model
//! - Extraction of the first ```sql fenced block
//! - Verbatim execution against PostgreSQL on a fresh connection
//! - JSON rendering of the rows in projection order
//!
//! Can be used as:
//! - Standalone Rust library (`Pipeline` over any `CompletionModel` / `StatementExecutor`)
//! - HTTP service (`text2sql-server` binary)

pub mod config;
pub mod db;
pub mod llm;
pub mod otel;
pub mod pipeline;
pub mod server;
pub mod types;

pub use config::{Config, DatabaseConfig, LlmConfig, LogFormat, PipelineOptions};
pub use pipeline::{Pipeline, PipelineReport};
pub use types::{PipelineError, Result, ResultRow, ResultSet, ScalarValue, Stage, Text2SqlError};
