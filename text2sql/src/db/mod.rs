//! Database side of the pipeline.

pub mod decode;
pub mod executor;

pub use executor::{
    ExecutionFailure, ExecutionOutcome, FailurePhase, PostgresExecutor, StatementExecutor,
    UntrustedSql,
};
