//! Statement execution against PostgreSQL.
//!
//! Every call opens its own connection and closes it before returning; nothing
//! is pooled or shared between requests. Failures are reported as an
//! `ExecutionOutcome::Failed` value rather than an `Err`, so the caller decides
//! how a failed query is rendered.

use crate::config::DatabaseConfig;
use crate::db::decode;
use crate::otel::{db_query_span, record_db_error, record_db_metrics, DbOperation};
use crate::types::{ResultRow, ResultSet};
use async_trait::async_trait;
use std::fmt;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};
use tracing::Instrument;

/// SQL text produced by a language model.
///
/// Executed verbatim: no parameter binding, no allow-list, no validation.
/// Anything that can reach the model prompt can therefore run arbitrary SQL with
/// the configured database role. Only `StatementExecutor::execute_untrusted`
/// accepts this type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UntrustedSql(String);

impl UntrustedSql {
    /// Wrap model-generated text.
    pub fn from_model_output(sql: impl Into<String>) -> Self {
        Self(sql.into())
    }

    /// Statement text.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Check if there is nothing to execute.
    pub fn is_blank(&self) -> bool {
        self.0.trim().is_empty()
    }
}

/// Where a failed execution stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePhase {
    /// Statement was empty; nothing was sent
    EmptyStatement,
    /// Connection or authentication failed
    Connect,
    /// Server rejected the statement (syntax, unknown relation, permissions)
    Prepare,
    /// Statement failed while running
    Query,
    /// A returned value could not be decoded
    Decode,
}

impl FailurePhase {
    /// Phase name as used in logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmptyStatement => "empty_statement",
            Self::Connect => "connect",
            Self::Prepare => "prepare",
            Self::Query => "query",
            Self::Decode => "decode",
        }
    }
}

/// Failed execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutionFailure {
    /// Where it failed
    pub phase: FailurePhase,

    /// Driver or validation message
    pub message: String,
}

impl ExecutionFailure {
    /// Create a failure for a phase.
    pub fn new(phase: FailurePhase, message: impl Into<String>) -> Self {
        Self {
            phase,
            message: message.into(),
        }
    }

    /// Create a failure from a driver error, keeping the server's own message.
    ///
    /// `tokio_postgres::Error` displays server-side errors as just "db error";
    /// the relation, column or permission detail lives in the `DbError`.
    pub fn from_driver(phase: FailurePhase, err: &tokio_postgres::Error) -> Self {
        let message = match err.as_db_error() {
            Some(db) => db.to_string(),
            None => err.to_string(),
        };
        Self::new(phase, message)
    }
}

impl fmt::Display for ExecutionFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} failed: {}", self.phase.as_str(), self.message)
    }
}

/// Result of running one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecutionOutcome {
    /// Statement ran; zero or more rows
    Rows(ResultSet),

    /// Statement did not run to completion
    Failed(ExecutionFailure),
}

impl ExecutionOutcome {
    /// Check if execution failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Self::Failed(_))
    }

    /// Rows as shown to callers: a failure is an empty result set.
    pub fn into_result_set(self) -> ResultSet {
        match self {
            Self::Rows(rows) => rows,
            Self::Failed(_) => Vec::new(),
        }
    }
}

/// Executes model-generated statements.
#[async_trait]
pub trait StatementExecutor: Send + Sync {
    /// Run a statement exactly as given.
    ///
    /// Never returns an error: every failure is folded into
    /// `ExecutionOutcome::Failed`.
    async fn execute_untrusted(&self, sql: &UntrustedSql) -> ExecutionOutcome;
}

/// One connection plus the task driving its socket.
///
/// Dropping the client ends the driver task; `close` additionally waits for
/// the socket to shut down.
struct ScopedConnection {
    client: Client,
    driver: JoinHandle<()>,
}

impl ScopedConnection {
    async fn open(config: &tokio_postgres::Config) -> Result<Self, tokio_postgres::Error> {
        let (client, connection) = config.connect(NoTls).await?;
        let driver = tokio::spawn(async move {
            if let Err(e) = connection.await {
                tracing::warn!(error = %e, "postgres connection closed with error");
            }
        });
        Ok(Self { client, driver })
    }

    async fn close(self) {
        drop(self.client);
        if let Err(e) = self.driver.await {
            tracing::warn!(error = %e, "postgres driver task did not finish cleanly");
        }
    }
}

/// PostgreSQL executor, one connection per statement.
pub struct PostgresExecutor {
    config: tokio_postgres::Config,
    dbname: String,
}

impl PostgresExecutor {
    /// Create new executor.
    ///
    /// No connection is opened here; credentials are only checked on first use.
    pub fn new(config: &DatabaseConfig) -> Self {
        Self {
            config: config.to_pg_config(),
            dbname: config.dbname.clone(),
        }
    }

    /// Describe and run the statement, pairing column names with values.
    async fn fetch(client: &Client, sql: &str) -> Result<ResultSet, ExecutionFailure> {
        let statement = client
            .prepare(sql)
            .await
            .map_err(|e| ExecutionFailure::from_driver(FailurePhase::Prepare, &e))?;

        let names: Vec<String> = statement
            .columns()
            .iter()
            .map(|column| column.name().to_string())
            .collect();

        let rows = client
            .query(&statement, &[])
            .await
            .map_err(|e| ExecutionFailure::from_driver(FailurePhase::Query, &e))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            let values = decode::row_values(row)
                .map_err(|e| ExecutionFailure::from_driver(FailurePhase::Decode, &e))?;
            results.push(ResultRow::from_pairs(names.iter().cloned(), values));
        }
        Ok(results)
    }

    async fn run(&self, sql: &UntrustedSql) -> Result<ResultSet, ExecutionFailure> {
        if sql.is_blank() {
            return Err(ExecutionFailure::new(
                FailurePhase::EmptyStatement,
                "can't execute an empty query",
            ));
        }

        let connection = ScopedConnection::open(&self.config)
            .await
            .map_err(|e| ExecutionFailure::from_driver(FailurePhase::Connect, &e))?;

        let result = Self::fetch(&connection.client, sql.as_str()).await;
        connection.close().await;
        result
    }
}

#[async_trait]
impl StatementExecutor for PostgresExecutor {
    async fn execute_untrusted(&self, sql: &UntrustedSql) -> ExecutionOutcome {
        let span = db_query_span(sql.as_str(), &self.dbname);
        async {
            match self.run(sql).await {
                Ok(rows) => {
                    record_db_metrics(rows.len());
                    ExecutionOutcome::Rows(rows)
                }
                Err(failure) => {
                    let operation = match failure.phase {
                        FailurePhase::Connect => DbOperation::Connect,
                        FailurePhase::EmptyStatement | FailurePhase::Prepare => DbOperation::Prepare,
                        FailurePhase::Query | FailurePhase::Decode => DbOperation::Query,
                    };
                    record_db_error(operation);
                    tracing::error!(
                        phase = failure.phase.as_str(),
                        error = %failure.message,
                        "Error querying PostgreSQL"
                    );
                    ExecutionOutcome::Failed(failure)
                }
            }
        }
        .instrument(span)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ScalarValue;

    #[test]
    fn test_failed_outcome_renders_empty() {
        let outcome = ExecutionOutcome::Failed(ExecutionFailure::new(
            FailurePhase::Prepare,
            "relation \"sensor\" does not exist",
        ));
        assert!(outcome.is_failure());
        assert!(outcome.into_result_set().is_empty());
    }

    #[test]
    fn test_rows_outcome_passes_through() {
        let row = ResultRow::from_pairs(["id"], vec![ScalarValue::Int(7)]);
        let outcome = ExecutionOutcome::Rows(vec![row.clone()]);
        assert!(!outcome.is_failure());
        assert_eq!(outcome.into_result_set(), vec![row]);
    }

    #[test]
    fn test_blank_statement_detection() {
        assert!(UntrustedSql::from_model_output("  \n\t").is_blank());
        assert!(!UntrustedSql::from_model_output("SELECT 1").is_blank());
    }

    #[tokio::test]
    async fn test_client_side_error_keeps_driver_text() {
        let err = tokio_postgres::Config::new()
            .host("127.0.0.1")
            .port(9)
            .user("postgres")
            .connect(NoTls)
            .await
            .err()
            .expect("nothing listens on port 9");

        let failure = ExecutionFailure::from_driver(FailurePhase::Connect, &err);
        assert_eq!(failure.message, err.to_string());
        assert_ne!(failure.message, "db error");
    }

    #[tokio::test]
    async fn test_empty_statement_never_connects() {
        // Port 9 is never a PostgreSQL server; reaching it would be a connect failure
        let executor = PostgresExecutor::new(&DatabaseConfig {
            port: 9,
            ..Default::default()
        });

        let outcome = executor
            .execute_untrusted(&UntrustedSql::from_model_output(""))
            .await;
        match outcome {
            ExecutionOutcome::Failed(failure) => {
                assert_eq!(failure.phase, FailurePhase::EmptyStatement)
            }
            other => panic!("expected failure, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_unreachable_server_is_connect_failure() {
        let executor = PostgresExecutor::new(&DatabaseConfig {
            host: "127.0.0.1".to_string(),
            port: 9,
            ..Default::default()
        });

        let outcome = executor
            .execute_untrusted(&UntrustedSql::from_model_output("SELECT 1"))
            .await;
        match outcome {
            ExecutionOutcome::Failed(failure) => assert_eq!(failure.phase, FailurePhase::Connect),
            other => panic!("expected failure, got {:?}", other),
        }
        // Still renders as an empty list at the boundary
        assert!(executor
            .execute_untrusted(&UntrustedSql::from_model_output("SELECT 1"))
            .await
            .into_result_set()
            .is_empty());
    }
}
