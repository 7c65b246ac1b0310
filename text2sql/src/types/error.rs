//! Error types for the text-to-SQL pipeline.
//!
//! Uses `thiserror` for ergonomic error definitions with automatic `From` implementations.
//! `Text2SqlError` is what components return internally; `PipelineError` is the
//! stage-tagged outcome that crosses the request boundary.

use serde::Serialize;
use std::fmt;
use thiserror::Error;

/// Error type for component operations.
#[derive(Error, Debug)]
pub enum Text2SqlError {
    /// Completion endpoint failed or returned an unusable payload
    #[error("Model query failed: {0}")]
    ModelError(String),

    /// Invalid or missing configuration
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// HTTP client error (completion endpoint)
    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl Text2SqlError {
    /// Create a model error with context.
    pub fn model(msg: impl Into<String>) -> Self {
        Self::ModelError(msg.into())
    }

    /// Pipeline stage this error belongs to.
    ///
    /// Transport and decoding errors only ever come from the completion
    /// endpoint. Execution failures never reach this type; they travel as
    /// `ExecutionOutcome::Failed`.
    pub fn stage(&self) -> Stage {
        match self {
            Self::ModelError(_) | Self::HttpError(_) | Self::JsonError(_) => Stage::ModelQuery,
            Self::ConfigError(_) => Stage::Internal,
        }
    }
}

/// Result type alias for component operations.
pub type Result<T> = std::result::Result<T, Text2SqlError>;

/// Stage of the pipeline at which a request failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Inbound request was unusable
    Request,
    /// Language model call
    ModelQuery,
    /// SQL extraction from the completion
    Extraction,
    /// Statement execution
    Execution,
    /// Coordinator glue logic
    Internal,
}

impl Stage {
    /// Stage name as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Request => "request",
            Self::ModelQuery => "model_query",
            Self::Extraction => "extraction",
            Self::Execution => "execution",
            Self::Internal => "internal",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Failure outcome of one pipeline run.
///
/// Only `message` is rendered to the caller; the stage stays server-side
/// for logs and status mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineError {
    /// Stage that failed
    pub stage: Stage,

    /// Human-readable message (no diagnostics beyond the error text)
    pub message: String,
}

impl PipelineError {
    /// Create a pipeline error for a stage.
    pub fn new(stage: Stage, message: impl Into<String>) -> Self {
        Self {
            stage,
            message: message.into(),
        }
    }
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.stage, self.message)
    }
}

impl std::error::Error for PipelineError {}

impl From<Text2SqlError> for PipelineError {
    fn from(err: Text2SqlError) -> Self {
        Self::new(err.stage(), err.to_string())
    }
}
