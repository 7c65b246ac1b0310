//! Tracing instrumentation for the pipeline.
//!
//! Follows OpenTelemetry semantic conventions:
//! - https://opentelemetry.io/docs/specs/semconv/database/database-spans/
//! - https://opentelemetry.io/docs/specs/semconv/gen-ai/
//!
//! # Span layout
//!
//! One `pipeline` span per request (carrying `request.id`), with children:
//! - `llm.generate`: the completion call (`gen_ai.request.model`)
//! - `db.query`: statement execution (`db.system.name = "postgresql"`,
//!   `db.query.text`, `db.response.returned_rows`)
//!
//! # Example
//!
//! ```rust,ignore
//! use text2sql::otel::db_query_span;
//!
//! let span = db_query_span("SELECT * FROM sensors", "iot");
//! let _guard = span.enter();
//! ```

pub mod db;
pub mod init;
pub mod llm;

pub use db::{db_query_span, record_db_error, record_db_metrics, DbOperation, DB_SYSTEM};
pub use init::init_tracing;
pub use llm::{llm_span, pipeline_span, record_outcome};
