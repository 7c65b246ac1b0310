//! Process configuration.
//!
//! Loaded once at startup from command-line flags with environment fallbacks,
//! then split into per-component sections that are handed to each component at
//! construction. Nothing here is mutated after startup.

use clap::{Args, Parser, ValueEnum};
use std::fmt;
use std::net::SocketAddr;

/// Default Ollama endpoint.
pub const DEFAULT_OLLAMA_URL: &str = "http://localhost:11434";

/// Default completion model.
pub const DEFAULT_OLLAMA_MODEL: &str = "mistral:latest";

/// Full process configuration.
#[derive(Debug, Clone, Parser)]
#[command(name = "text2sql-server")]
#[command(about = "Answer natural language questions with SQL generated by a local model", long_about = None)]
pub struct Config {
    /// Address the HTTP server listens on
    #[arg(long, env = "TEXT2SQL_BIND", default_value = "127.0.0.1:5000")]
    pub bind: SocketAddr,

    /// Log output format
    #[arg(long, env = "TEXT2SQL_LOG_FORMAT", value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(flatten)]
    pub llm: LlmConfig,

    #[command(flatten)]
    pub database: DatabaseConfig,

    #[command(flatten)]
    pub pipeline: PipelineOptions,
}

/// Completion endpoint settings.
#[derive(Debug, Clone, Args)]
pub struct LlmConfig {
    /// Ollama base URL (the client appends `/api/generate`)
    #[arg(long = "ollama-url", env = "OLLAMA_URL", default_value = DEFAULT_OLLAMA_URL)]
    pub base_url: String,

    /// Model identifier sent with every request
    #[arg(long = "ollama-model", env = "OLLAMA_MODEL", default_value = DEFAULT_OLLAMA_MODEL)]
    pub model: String,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_OLLAMA_URL.to_string(),
            model: DEFAULT_OLLAMA_MODEL.to_string(),
        }
    }
}

impl LlmConfig {
    /// Full URL of the generate endpoint.
    pub fn generate_url(&self) -> String {
        format!("{}/api/generate", self.base_url.trim_end_matches('/'))
    }
}

/// PostgreSQL connection settings.
#[derive(Clone, Args)]
pub struct DatabaseConfig {
    /// Database host
    #[arg(long = "pg-host", env = "PGHOST", default_value = "localhost")]
    pub host: String,

    /// Database port
    #[arg(long = "pg-port", env = "PGPORT", default_value_t = 5432)]
    pub port: u16,

    /// Database name
    #[arg(long = "pg-database", env = "PGDATABASE", default_value = "iot")]
    pub dbname: String,

    /// Database user
    #[arg(long = "pg-user", env = "PGUSER", default_value = "postgres")]
    pub user: String,

    /// Database password
    #[arg(long = "pg-password", env = "PGPASSWORD", default_value = "", hide_env_values = true)]
    pub password: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5432,
            dbname: "iot".to_string(),
            user: "postgres".to_string(),
            password: String::new(),
        }
    }
}

impl DatabaseConfig {
    /// Build driver connection settings.
    pub fn to_pg_config(&self) -> tokio_postgres::Config {
        let mut config = tokio_postgres::Config::new();
        config
            .host(&self.host)
            .port(self.port)
            .dbname(&self.dbname)
            .user(&self.user)
            .application_name("text2sql");
        if !self.password.is_empty() {
            config.password(&self.password);
        }
        config
    }
}

// Keep the password out of logs.
impl fmt::Debug for DatabaseConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"***")
            .finish()
    }
}

/// Behaviour switches for the coordinator.
///
/// Both default to off: a completion without a SQL fence yields an empty
/// statement, and execution failures render as an empty result list.
#[derive(Debug, Clone, Copy, Default, Args)]
pub struct PipelineOptions {
    /// Fail the request when the completion has no opening SQL fence
    #[arg(long, env = "TEXT2SQL_STRICT_EXTRACTION")]
    pub strict_extraction: bool,

    /// Report execution failures as errors instead of empty results
    #[arg(long, env = "TEXT2SQL_SURFACE_EXECUTION_ERRORS")]
    pub surface_execution_errors: bool,
}

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    /// Human-readable lines
    Pretty,
    /// One JSON object per event
    Json,
}
