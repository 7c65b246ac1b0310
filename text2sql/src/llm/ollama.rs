//! Ollama completion client.

use crate::config::LlmConfig;
use crate::llm::prompt::Prompt;
use crate::otel::llm_span;
use crate::types::{Result, Text2SqlError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::Instrument;

/// Text-completion endpoint.
///
/// One prompt in, the whole completion out. Implementations must not retry
/// or cache.
#[async_trait]
pub trait CompletionModel: Send + Sync {
    /// Complete a prompt.
    ///
    /// # Errors
    ///
    /// Returns `Text2SqlError::HttpError` if the endpoint is unreachable,
    /// `Text2SqlError::ModelError` on a non-success status and
    /// `Text2SqlError::JsonError` if the body is not a generate response
    async fn complete(&self, prompt: &Prompt) -> Result<String>;

    /// Model identifier, for logs.
    fn model(&self) -> &str;
}

/// Ollama `/api/generate` request body.
#[derive(Debug, Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
}

/// Ollama `/api/generate` response body (non-streamed).
///
/// Only `response` is read. A missing or null field is an empty completion.
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

/// Ollama API client.
pub struct OllamaClient {
    endpoint: String,
    model: String,
    client: Client,
}

impl OllamaClient {
    /// Create new client.
    ///
    /// # Arguments
    ///
    /// * `config` - Base URL and model identifier
    ///
    /// # Returns
    ///
    /// New `OllamaClient` with a shared HTTP connection pool and no request timeout
    pub fn new(config: &LlmConfig) -> Self {
        Self {
            endpoint: config.generate_url(),
            model: config.model.clone(),
            client: Client::new(),
        }
    }

    /// Parse a generate response body into completion text.
    fn parse_body(body: &str) -> Result<String> {
        let parsed: GenerateResponse = serde_json::from_str(body)?;
        Ok(parsed.response.unwrap_or_default())
    }

    /// POST one non-streamed generate request and read the completion.
    async fn generate(&self, prompt: &Prompt) -> Result<String> {
        let request = GenerateRequest {
            model: &self.model,
            prompt: prompt.as_str(),
            stream: false,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(Text2SqlError::model(format!(
                "Ollama API error {}: {}",
                status, body
            )));
        }

        tracing::debug!(body = %body, "Ollama raw response");

        let completion = Self::parse_body(&body)?;
        tracing::Span::current().record("gen_ai.response.length", completion.len());
        Ok(completion)
    }
}

#[async_trait]
impl CompletionModel for OllamaClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String> {
        let span = llm_span(&self.model, &self.endpoint);
        self.generate(prompt).instrument(span).await
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Stage;

    #[test]
    fn test_request_disables_streaming() {
        let request = GenerateRequest {
            model: "mistral:latest",
            prompt: "hello",
            stream: false,
        };
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            serde_json::json!({"model": "mistral:latest", "prompt": "hello", "stream": false})
        );
    }

    #[test]
    fn test_parse_body_reads_response_field() {
        let body = r#"{"model":"mistral","response":"```sql\nSELECT 1;\n```","done":true}"#;
        assert_eq!(
            OllamaClient::parse_body(body).unwrap(),
            "```sql\nSELECT 1;\n```"
        );
    }

    #[test]
    fn test_parse_body_missing_response_is_empty() {
        assert_eq!(OllamaClient::parse_body(r#"{"done":true}"#).unwrap(), "");
        assert_eq!(OllamaClient::parse_body(r#"{"response":null}"#).unwrap(), "");
    }

    #[test]
    fn test_parse_body_malformed_is_json_error() {
        let err = OllamaClient::parse_body("<html>502</html>").unwrap_err();
        assert!(matches!(err, Text2SqlError::JsonError(_)));
        assert_eq!(err.stage(), Stage::ModelQuery);
    }

    #[test]
    fn test_endpoint_from_config() {
        let client = OllamaClient::new(&LlmConfig::default());
        assert_eq!(client.endpoint, "http://localhost:11434/api/generate");
        assert_eq!(client.model(), "mistral:latest");
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_http_error() {
        let client = OllamaClient::new(&LlmConfig {
            // Port 9 (discard) on loopback: nothing listens in test environments
            base_url: "http://127.0.0.1:9".to_string(),
            model: "mistral:latest".to_string(),
        });

        let err = client
            .complete(&Prompt::for_message("show all sensors"))
            .await
            .unwrap_err();
        assert!(matches!(err, Text2SqlError::HttpError(_)));
        assert_eq!(err.stage(), Stage::ModelQuery);
    }
}
