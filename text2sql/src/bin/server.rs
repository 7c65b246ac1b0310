//! text2sql HTTP server
//!
//! Serves the chat page and the `/chat` endpoint.

use anyhow::Context;
use clap::Parser;
use std::sync::Arc;
use text2sql::db::PostgresExecutor;
use text2sql::llm::OllamaClient;
use text2sql::otel::init_tracing;
use text2sql::{server, Config, Pipeline};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = Config::parse();
    init_tracing(config.log_format)?;

    tracing::info!(
        bind = %config.bind,
        ollama = %config.llm.generate_url(),
        model = %config.llm.model,
        database = ?config.database,
        strict_extraction = config.pipeline.strict_extraction,
        surface_execution_errors = config.pipeline.surface_execution_errors,
        "starting text2sql server"
    );

    let pipeline = Pipeline::new(
        OllamaClient::new(&config.llm),
        PostgresExecutor::new(&config.database),
        config.pipeline,
    );
    let app = server::router(Arc::new(pipeline));

    let listener = tokio::net::TcpListener::bind(config.bind)
        .await
        .with_context(|| format!("failed to bind {}", config.bind))?;
    tracing::info!(addr = %config.bind, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("server error")?;

    tracing::info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}
