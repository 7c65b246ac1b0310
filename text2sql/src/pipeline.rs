//! Request pipeline: prompt → completion → extraction → execution.
//!
//! One `Pipeline::run` call handles exactly one user message. The two external
//! calls happen strictly in sequence and nothing is carried over between runs.
//!
//! Failures are asymmetric:
//! - model-stage failures end the run with a `PipelineError`
//! - execution failures end the run successfully with an empty result set,
//!   unless `PipelineOptions::surface_execution_errors` is set

use crate::config::PipelineOptions;
use crate::db::{ExecutionOutcome, StatementExecutor, UntrustedSql};
use crate::llm::{extract_sql, CompletionModel, Extraction, Prompt};
use crate::otel::{pipeline_span, record_outcome};
use crate::types::{PipelineError, ResultSet, Stage};
use tracing::Instrument;

/// Everything one successful run produced.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    /// How the statement was found in the completion
    pub extraction: Extraction,

    /// What the executor reported
    pub outcome: ExecutionOutcome,
}

impl PipelineReport {
    /// Statement that was handed to the executor.
    pub fn sql(&self) -> &str {
        self.extraction.statement()
    }

    /// Rows as returned to the caller (empty if execution failed).
    pub fn into_results(self) -> ResultSet {
        self.outcome.into_result_set()
    }
}

/// Coordinator over a completion model and a statement executor.
pub struct Pipeline<M, E> {
    model: M,
    executor: E,
    options: PipelineOptions,
}

impl<M, E> Pipeline<M, E>
where
    M: CompletionModel,
    E: StatementExecutor,
{
    /// Create new pipeline.
    ///
    /// # Arguments
    ///
    /// * `model` - Completion endpoint
    /// * `executor` - Statement executor
    /// * `options` - Extraction and error-reporting switches
    pub fn new(model: M, executor: E, options: PipelineOptions) -> Self {
        Self {
            model,
            executor,
            options,
        }
    }

    /// Handle one user message.
    ///
    /// # Arguments
    ///
    /// * `message` - Natural language request, embedded verbatim in the prompt
    ///
    /// # Returns
    ///
    /// `PipelineReport` with the extraction and the execution outcome
    ///
    /// # Errors
    ///
    /// Returns `PipelineError` tagged `model_query` if the completion call fails.
    /// With strict extraction, a completion without a SQL fence fails with
    /// `extraction`; with surfaced execution errors, a failed statement fails
    /// with `execution`.
    pub async fn run(&self, message: &str) -> Result<PipelineReport, PipelineError> {
        let span = pipeline_span();
        async {
            let result = self.run_stages(message).await;
            match &result {
                Ok(_) => record_outcome("results"),
                Err(err) => {
                    record_outcome("error");
                    tracing::error!(stage = %err.stage, error = %err.message, "Error occurred");
                }
            }
            result
        }
        .instrument(span)
        .await
    }

    async fn run_stages(&self, message: &str) -> Result<PipelineReport, PipelineError> {
        tracing::info!(user_message = message, "User message");

        let prompt = Prompt::for_message(message);
        let completion = self.model.complete(&prompt).await?;
        tracing::debug!(model = self.model.model(), completion = %completion, "Ollama response");

        let extraction = extract_sql(&completion);
        if !extraction.is_fenced() {
            tracing::warn!(kind = extraction.kind(), "completion has no complete SQL block");
        }
        if self.options.strict_extraction && extraction == Extraction::MissingOpenFence {
            return Err(PipelineError::new(
                Stage::Extraction,
                "model response did not contain a ```sql block",
            ));
        }

        let sql = UntrustedSql::from_model_output(extraction.statement());
        tracing::info!(sql = sql.as_str(), "Generated SQL query");

        let outcome = self.executor.execute_untrusted(&sql).await;
        if let ExecutionOutcome::Failed(failure) = &outcome {
            if self.options.surface_execution_errors {
                return Err(PipelineError::new(Stage::Execution, failure.to_string()));
            }
            tracing::info!("execution failed, returning empty results");
        }

        Ok(PipelineReport {
            extraction,
            outcome,
        })
    }
}
