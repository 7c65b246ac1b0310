//! End-to-end `/chat` scenarios through the HTTP router.

use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{header, Request, StatusCode};
use axum::Router;
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use text2sql::db::{
    ExecutionFailure, ExecutionOutcome, FailurePhase, PostgresExecutor, StatementExecutor,
    UntrustedSql,
};
use text2sql::llm::{CompletionModel, OllamaClient, Prompt};
use text2sql::{
    server, DatabaseConfig, LlmConfig, Pipeline, PipelineOptions, ResultRow, ScalarValue,
};
use tower::ServiceExt;

struct CannedModel(&'static str);

#[async_trait]
impl CompletionModel for CannedModel {
    async fn complete(&self, _prompt: &Prompt) -> text2sql::Result<String> {
        Ok(self.0.to_string())
    }

    fn model(&self) -> &str {
        "canned"
    }
}

/// Serves a fixed `sensors` table for the one statement it knows.
#[derive(Default)]
struct SensorTable {
    seen: Mutex<Vec<String>>,
}

#[async_trait]
impl StatementExecutor for SensorTable {
    async fn execute_untrusted(&self, sql: &UntrustedSql) -> ExecutionOutcome {
        self.seen.lock().unwrap().push(sql.as_str().to_string());
        if sql.as_str() != "SELECT * FROM sensors;" {
            return ExecutionOutcome::Failed(ExecutionFailure::new(
                FailurePhase::Prepare,
                "syntax error",
            ));
        }
        let rows = [(1, "temp-north", 21.5), (2, "temp-south", 19.0), (3, "humidity", 0.43)]
            .into_iter()
            .map(|(id, name, reading)| {
                ResultRow::from_pairs(
                    ["id", "name", "reading"],
                    vec![
                        ScalarValue::Int(id),
                        ScalarValue::Text(name.to_string()),
                        ScalarValue::Float(reading),
                    ],
                )
            })
            .collect();
        ExecutionOutcome::Rows(rows)
    }
}

/// Port 9 (discard) never speaks HTTP or the PostgreSQL protocol.
fn unreachable_llm() -> LlmConfig {
    LlmConfig {
        base_url: "http://127.0.0.1:9".to_string(),
        ..Default::default()
    }
}

fn unreachable_db() -> DatabaseConfig {
    DatabaseConfig {
        host: "127.0.0.1".to_string(),
        port: 9,
        ..Default::default()
    }
}

async fn post_chat(app: Router, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri("/chat")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[tokio::test]
async fn test_fenced_sql_returns_rows_in_order() {
    let pipeline = Arc::new(Pipeline::new(
        CannedModel("Here you go:\n```sql\nSELECT * FROM sensors;\n```\nEnjoy."),
        SensorTable::default(),
        PipelineOptions::default(),
    ));
    let (status, body) = post_chat(
        server::router(pipeline.clone()),
        json!({"message": "show all sensors"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert!(body.get("error").is_none());
    let results = body["results"].as_array().unwrap();
    assert_eq!(results.len(), 3);
    assert_eq!(results[0], json!({"id": 1, "name": "temp-north", "reading": 21.5}));
    assert_eq!(results[2]["name"], "humidity");

    // Column order follows the projection, not alphabetical order
    let raw = serde_json::to_string(&results[0]).unwrap();
    assert!(raw.find("\"name\"").unwrap() < raw.find("\"reading\"").unwrap());
}

#[tokio::test]
async fn test_unreachable_model_is_error_without_results() {
    let pipeline = Arc::new(Pipeline::new(
        OllamaClient::new(&unreachable_llm()),
        SensorTable::default(),
        PipelineOptions::default(),
    ));
    let (status, body) = post_chat(
        server::router(pipeline.clone()),
        json!({"message": "show all sensors"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body["error"].as_str().is_some_and(|e| !e.is_empty()));
    assert!(body.get("results").is_none());
}

#[tokio::test]
async fn test_completion_without_fence_is_empty_results() {
    let pipeline = Arc::new(Pipeline::new(
        CannedModel("I'm not sure which table you mean."),
        PostgresExecutor::new(&unreachable_db()),
        PipelineOptions::default(),
    ));
    let (status, body) = post_chat(
        server::router(pipeline),
        json!({"message": "show all sensors"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
}

#[tokio::test]
async fn test_rejected_statement_is_empty_results() {
    let pipeline = Arc::new(Pipeline::new(
        CannedModel("```sql\nSELECT * FROM sensor;\n```"),
        SensorTable::default(),
        PipelineOptions::default(),
    ));
    let (status, body) = post_chat(
        server::router(pipeline),
        json!({"message": "show all sensors"}),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({"results": []}));
}

#[tokio::test]
async fn test_surfaced_execution_error() {
    let pipeline = Arc::new(Pipeline::new(
        CannedModel("```sql\nSELECT * FROM sensor;\n```"),
        SensorTable::default(),
        PipelineOptions {
            surface_execution_errors: true,
            ..Default::default()
        },
    ));
    let (status, body) = post_chat(
        server::router(pipeline),
        json!({"message": "show all sensors"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({"error": "prepare failed: syntax error"}));
}

#[tokio::test]
async fn test_strict_extraction_error() {
    let pipeline = Arc::new(Pipeline::new(
        CannedModel("SELECT * FROM sensors;"),
        SensorTable::default(),
        PipelineOptions {
            strict_extraction: true,
            ..Default::default()
        },
    ));
    let (status, body) = post_chat(
        server::router(pipeline.clone()),
        json!({"message": "show all sensors"}),
    )
    .await;

    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert!(body.get("error").is_some());
}
