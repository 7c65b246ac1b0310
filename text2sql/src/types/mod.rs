//! Core data types for the text-to-SQL pipeline.
//!
//! Defines fundamental types used throughout the system:
//! - `ResultRow` / `ResultSet`: Tabular query output in projection order
//! - `ScalarValue`: Column values
//! - `Text2SqlError`: Component errors
//! - `PipelineError`: Stage-tagged failure surfaced at the request boundary

pub mod error;
pub mod row;

pub use error::{PipelineError, Result, Stage, Text2SqlError};
pub use row::{ResultRow, ResultSet, ScalarValue};
