//! Language model and request instrumentation.
//!
//! Uses the OpenTelemetry GenAI attribute names so completion calls line up
//! with database spans in the same trace.

use tracing::{field, span, Level, Span};
use uuid::Uuid;

/// Create span for one completion call.
///
/// # Arguments
///
/// * `model` - Model identifier sent to the endpoint
/// * `endpoint` - Full endpoint URL
pub fn llm_span(model: &str, endpoint: &str) -> Span {
    span!(
        Level::INFO,
        "llm.generate",
        otel.name = format!("generate {}", model),
        otel.kind = "client",
        gen_ai.operation.name = "text_completion",
        gen_ai.request.model = model,
        server.address = endpoint,
        gen_ai.response.length = field::Empty,
    )
}

/// Create root span for one pipeline run.
///
/// Each request gets a fresh id so interleaved concurrent requests can be
/// told apart in the logs.
pub fn pipeline_span() -> Span {
    span!(
        Level::INFO,
        "pipeline",
        otel.kind = "server",
        request.id = %Uuid::new_v4(),
        pipeline.outcome = field::Empty,
    )
}

/// Record pipeline outcome (`"results"` or `"error"`) on the current span.
pub fn record_outcome(outcome: &str) {
    Span::current().record("pipeline.outcome", outcome);
}
