//! HTTP request boundary.
//!
//! Thin transport over `Pipeline`: decode the body, run the pipeline, render
//! either `{"results": [...]}` or `{"error": "..."}`. Only the error text
//! crosses this boundary; details stay in the server logs.

use crate::db::StatementExecutor;
use crate::llm::CompletionModel;
use crate::pipeline::Pipeline;
use crate::types::{PipelineError, ResultSet, Stage};
use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::any::Any;
use std::sync::Arc;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Chat page served at `/`.
const INDEX_HTML: &str = include_str!("index.html");

/// `POST /chat` body.
#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    /// Natural language request
    #[serde(default)]
    pub message: Option<String>,
}

/// `POST /chat` response body.
#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum ChatResponse {
    /// Rows in database order
    Results { results: ResultSet },

    /// Error text only
    Error { error: String },
}

impl ChatResponse {
    fn error(err: &PipelineError) -> (StatusCode, Json<Self>) {
        let status = match err.stage {
            Stage::Request => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (
            status,
            Json(Self::Error {
                error: err.message.clone(),
            }),
        )
    }
}

/// Build the application router.
///
/// # Arguments
///
/// * `pipeline` - Shared, immutable pipeline; each request runs it independently
pub fn router<M, E>(pipeline: Arc<Pipeline<M, E>>) -> Router
where
    M: CompletionModel + 'static,
    E: StatementExecutor + 'static,
{
    Router::new()
        .route("/", get(index))
        .route("/chat", post(chat::<M, E>))
        .route("/health", get(health))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(pipeline)
}

async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "ok"}))
}

async fn chat<M, E>(
    State(pipeline): State<Arc<Pipeline<M, E>>>,
    body: Result<Json<ChatRequest>, JsonRejection>,
) -> (StatusCode, Json<ChatResponse>)
where
    M: CompletionModel + 'static,
    E: StatementExecutor + 'static,
{
    let message = match body {
        Ok(Json(ChatRequest {
            message: Some(message),
        })) => message,
        Ok(Json(ChatRequest { message: None })) => {
            return ChatResponse::error(&PipelineError::new(
                Stage::Request,
                "request body must contain a `message` field",
            ));
        }
        Err(rejection) => {
            tracing::warn!(error = %rejection.body_text(), "rejected chat request body");
            return ChatResponse::error(&PipelineError::new(Stage::Request, rejection.body_text()));
        }
    };

    match pipeline.run(&message).await {
        Ok(report) => (
            StatusCode::OK,
            Json(ChatResponse::Results {
                results: report.into_results(),
            }),
        ),
        Err(err) => ChatResponse::error(&err),
    }
}

/// Render a handler panic as an internal pipeline error.
fn panic_response(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else {
        "internal error".to_string()
    };
    tracing::error!(stage = %Stage::Internal, error = %message, "request handler panicked");

    ChatResponse::error(&PipelineError::new(Stage::Internal, message)).into_response()
}
