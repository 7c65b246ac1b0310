//! Database operation instrumentation.
//!
//! Implements OpenTelemetry semantic conventions for PostgreSQL operations.

use tracing::{field, span, Level, Span};

/// Database system name reported on every span.
pub const DB_SYSTEM: &str = "postgresql";

/// Database operation types (maps to `db.operation.name`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbOperation {
    /// Open a connection
    Connect,
    /// Describe the statement (column descriptor)
    Prepare,
    /// Run the statement and fetch rows
    Query,
}

impl DbOperation {
    /// Get operation name as string.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Connect => "connect",
            Self::Prepare => "prepare",
            Self::Query => "query",
        }
    }
}

/// Create database query span with semantic conventions.
///
/// # Arguments
///
/// * `query_text` - Statement text as executed
/// * `namespace` - Database name
///
/// # Returns
///
/// Tracing span with query attributes; `db.response.returned_rows` and
/// `error.type` are recorded later
///
/// # Example
///
/// ```rust,ignore
/// let span = db_query_span("SELECT * FROM sensors", "iot");
/// let _guard = span.enter();
/// ```
pub fn db_query_span(query_text: &str, namespace: &str) -> Span {
    span!(
        Level::INFO,
        "db.query",
        otel.name = format!("{} {}", DbOperation::Query.as_str(), namespace),
        otel.kind = "client",
        db.system.name = DB_SYSTEM,
        db.operation.name = DbOperation::Query.as_str(),
        db.namespace = namespace,
        db.query.text = query_text,
        db.response.returned_rows = field::Empty,
        error.type = field::Empty,
    )
}

/// Record rows returned on the current span.
pub fn record_db_metrics(rows_returned: usize) {
    Span::current().record("db.response.returned_rows", rows_returned);
}

/// Record a failed operation on the current span.
pub fn record_db_error(operation: DbOperation) {
    Span::current().record("error.type", operation.as_str());
}
