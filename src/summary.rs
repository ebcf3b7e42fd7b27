//! Student profile summaries generated by a local Ollama runtime.
//!
//! Each call first polls the version endpoint with a short timeout and only then submits a
//! non-streaming generation request. No failure is retried or raised: every branch ends in a
//! [`SummaryOutcome`] the HTTP layer maps to a status code.

use crate::config::Config;
use crate::models::Student;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

const NO_SUMMARY_RETURNED: &str = "No summary returned.";

/// Result of a single summary attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SummaryOutcome {
    /// The model produced a summary.
    Generated(String),
    /// The model answered without a `response` field.
    Empty,
    /// Summaries are switched off in configuration.
    Disabled,
    /// The liveness check failed; no generation was attempted.
    Unreachable,
    /// The generation request exceeded its timeout.
    Timeout,
    /// The generation endpoint answered with a 5xx status.
    ServerError {
        /// HTTP status code returned by Ollama.
        status: u16,
    },
    /// The request failed at the transport level or with a non-success status.
    Transport(String),
    /// Anything else, such as an undecodable response body.
    Unexpected(String),
}

impl SummaryOutcome {
    /// Whether the outcome should be reported to clients as an upstream failure.
    pub fn is_failure(&self) -> bool {
        !matches!(self, Self::Generated(_) | Self::Empty | Self::Disabled)
    }

    /// Text shown to clients: the summary itself or a short failure marker.
    pub fn text(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for SummaryOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Generated(text) => f.write_str(text),
            Self::Empty => f.write_str(NO_SUMMARY_RETURNED),
            Self::Disabled => f.write_str("Summary generation is disabled."),
            Self::Unreachable => f.write_str("Ollama API is not reachable or not running."),
            Self::Timeout => f.write_str("Ollama request timed out."),
            Self::ServerError { status } => write!(f, "Ollama API returned status {status}"),
            Self::Transport(detail) => write!(f, "Ollama error: {detail}"),
            Self::Unexpected(detail) => write!(f, "Unexpected error: {detail}"),
        }
    }
}

/// Interface implemented by summary providers.
#[async_trait]
pub trait SummaryClient: Send + Sync {
    /// Produce a narrative summary for `student`.
    async fn summarize(&self, student: &Student) -> SummaryOutcome;
}

/// Build the summary client described by `config`.
pub fn get_summary_client(config: &Config) -> Arc<dyn SummaryClient> {
    if !config.ollama_enabled {
        tracing::info!("Summary generation disabled by configuration");
        return Arc::new(DisabledSummaryClient);
    }
    match OllamaSummaryClient::from_config(config) {
        Ok(client) => Arc::new(client),
        Err(error) => {
            tracing::error!(%error, "Failed to build Ollama HTTP client; summaries disabled");
            Arc::new(DisabledSummaryClient)
        }
    }
}

/// Client used when summaries are switched off.
pub struct DisabledSummaryClient;

#[async_trait]
impl SummaryClient for DisabledSummaryClient {
    async fn summarize(&self, _student: &Student) -> SummaryOutcome {
        SummaryOutcome::Disabled
    }
}

/// Summary client backed by the Ollama HTTP API.
pub struct OllamaSummaryClient {
    http: Client,
    generate_url: String,
    version_url: String,
    model: String,
    health_timeout: Duration,
    generate_timeout: Duration,
}

impl OllamaSummaryClient {
    /// Construct a client from the loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, reqwest::Error> {
        let http = Client::builder().user_agent("student-api/summary").build()?;
        Ok(Self {
            http,
            generate_url: config.ollama_api_url.clone(),
            version_url: config.ollama_version_url.clone(),
            model: config.ollama_model.clone(),
            health_timeout: config.ollama_health_timeout,
            generate_timeout: config.ollama_generate_timeout,
        })
    }

    async fn is_alive(&self) -> bool {
        match self
            .http
            .get(&self.version_url)
            .timeout(self.health_timeout)
            .send()
            .await
        {
            Ok(response) if response.status().is_success() => true,
            Ok(response) => {
                tracing::warn!(
                    url = %self.version_url,
                    status = response.status().as_u16(),
                    "Ollama liveness check returned non-success status"
                );
                false
            }
            Err(error) => {
                tracing::warn!(url = %self.version_url, %error, "Ollama liveness check failed");
                false
            }
        }
    }

    async fn generate(&self, prompt: String) -> SummaryOutcome {
        let payload = json!({
            "model": self.model,
            "prompt": prompt,
            "stream": false,
        });

        let response = match self
            .http
            .post(&self.generate_url)
            .timeout(self.generate_timeout)
            .json(&payload)
            .send()
            .await
        {
            Ok(response) => response,
            Err(error) => return classify_transport_error(error),
        };

        let status = response.status();
        if status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body, "Ollama generation failed");
            return SummaryOutcome::ServerError {
                status: status.as_u16(),
            };
        }
        if !status.is_success() {
            tracing::error!(status = status.as_u16(), "Ollama rejected generation request");
            return SummaryOutcome::Transport(format!("HTTP {}", status.as_u16()));
        }

        let body = match response.bytes().await {
            Ok(body) => body,
            Err(error) => return classify_transport_error(error),
        };
        match serde_json::from_slice::<GenerateResponse>(&body) {
            Ok(GenerateResponse {
                response: Some(text),
            }) => SummaryOutcome::Generated(text),
            Ok(GenerateResponse { response: None }) => {
                tracing::warn!("Ollama response did not include a summary");
                SummaryOutcome::Empty
            }
            Err(error) => {
                tracing::error!(%error, "Failed to decode Ollama response");
                SummaryOutcome::Unexpected(format!("failed to decode Ollama response: {error}"))
            }
        }
    }
}

#[async_trait]
impl SummaryClient for OllamaSummaryClient {
    async fn summarize(&self, student: &Student) -> SummaryOutcome {
        if !self.is_alive().await {
            return SummaryOutcome::Unreachable;
        }
        let outcome = self.generate(build_prompt(student)).await;
        tracing::debug!(id = student.id, failed = outcome.is_failure(), "Summary attempt finished");
        outcome
    }
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: Option<String>,
}

fn classify_transport_error(error: reqwest::Error) -> SummaryOutcome {
    if error.is_timeout() {
        tracing::error!(%error, "Ollama request timed out");
        SummaryOutcome::Timeout
    } else {
        tracing::error!(%error, "Ollama request error");
        SummaryOutcome::Transport(error.to_string())
    }
}

/// Build the generation prompt for `student`.
pub fn build_prompt(student: &Student) -> String {
    format!(
        "Create a professional student profile summary for:\n\
         \n\
         Name: {name}\n\
         Age: {age}\n\
         Email: {email}\n\
         \n\
         Generate a brief, professional summary (2-3 sentences) that highlights:\n\
         - Their academic potential\n\
         - Communication readiness\n\
         - Any relevant observations based on their profile\n\
         \n\
         Keep it positive and professional.",
        name = student.name,
        age = student.age,
        email = student.email,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::{
        Method::{GET, POST},
        MockServer,
    };

    fn student() -> Student {
        Student {
            id: 1,
            name: "Ada Lovelace".into(),
            age: 36,
            email: "ada@example.com".into(),
        }
    }

    fn test_config(server: &MockServer) -> Config {
        Config {
            ollama_api_url: server.url("/api/generate"),
            ollama_version_url: server.url("/api/version"),
            ollama_model: "llama-test".into(),
            ollama_enabled: true,
            ollama_health_timeout: Duration::from_millis(500),
            ollama_generate_timeout: Duration::from_millis(300),
            server_port: None,
        }
    }

    fn client_for(server: &MockServer) -> OllamaSummaryClient {
        OllamaSummaryClient::from_config(&test_config(server)).expect("client")
    }

    async fn mock_alive(server: &MockServer) {
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/version");
                then.status(200).json_body(json!({ "version": "0.5.0" }));
            })
            .await;
    }

    #[test]
    fn prompt_embeds_student_fields() {
        let prompt = build_prompt(&student());
        assert!(prompt.contains("Name: Ada Lovelace"));
        assert!(prompt.contains("Age: 36"));
        assert!(prompt.contains("Email: ada@example.com"));
        assert!(prompt.contains("2-3 sentences"));
        assert_eq!(prompt, build_prompt(&student()));
    }

    #[tokio::test]
    async fn unreachable_service_skips_generation() {
        let server = MockServer::start_async().await;
        let health = server
            .mock_async(|when, then| {
                when.method(GET).path("/api/version");
                then.status(503);
            })
            .await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({ "response": "unused" }));
            })
            .await;

        let outcome = client_for(&server).summarize(&student()).await;

        assert_eq!(outcome, SummaryOutcome::Unreachable);
        assert!(outcome.is_failure());
        health.assert_async().await;
        generate.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn refused_connection_is_unreachable() {
        let server = MockServer::start_async().await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({ "response": "unused" }));
            })
            .await;
        let config = Config {
            ollama_version_url: "http://127.0.0.1:1/api/version".into(),
            ..test_config(&server)
        };
        let client = OllamaSummaryClient::from_config(&config).expect("client");

        let outcome = client.summarize(&student()).await;

        assert_eq!(outcome, SummaryOutcome::Unreachable);
        generate.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn slow_liveness_check_is_unreachable() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/version");
                then.status(200)
                    .delay(Duration::from_secs(2))
                    .json_body(json!({ "version": "0.5.0" }));
            })
            .await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({ "response": "unused" }));
            })
            .await;
        let config = Config {
            ollama_health_timeout: Duration::from_millis(200),
            ..test_config(&server)
        };
        let client = OllamaSummaryClient::from_config(&config).expect("client");

        let outcome = client.summarize(&student()).await;

        assert_eq!(outcome, SummaryOutcome::Unreachable);
        generate.assert_hits_async(0).await;
    }

    #[tokio::test]
    async fn generation_timeout_is_reported() {
        let server = MockServer::start_async().await;
        mock_alive(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200)
                    .delay(Duration::from_secs(2))
                    .json_body(json!({ "response": "too late" }));
            })
            .await;

        let outcome = client_for(&server).summarize(&student()).await;

        assert_eq!(outcome, SummaryOutcome::Timeout);
        assert_eq!(outcome.text(), "Ollama request timed out.");
    }

    #[tokio::test]
    async fn server_error_status_is_embedded_in_marker() {
        let server = MockServer::start_async().await;
        mock_alive(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(500).body("model crashed");
            })
            .await;

        let outcome = client_for(&server).summarize(&student()).await;

        assert_eq!(outcome, SummaryOutcome::ServerError { status: 500 });
        assert!(outcome.text().contains("500"));
        assert!(outcome.is_failure());
    }

    #[tokio::test]
    async fn successful_generation_returns_text_verbatim() {
        let server = MockServer::start_async().await;
        mock_alive(&server).await;
        let generate = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/api/generate")
                    .json_body_partial(r#"{ "model": "llama-test", "stream": false }"#);
                then.status(200)
                    .json_body(json!({ "response": "Great student.", "done": true }));
            })
            .await;

        let outcome = client_for(&server).summarize(&student()).await;

        generate.assert_async().await;
        assert_eq!(outcome, SummaryOutcome::Generated("Great student.".into()));
        assert_eq!(outcome.text(), "Great student.");
    }

    #[tokio::test]
    async fn missing_response_field_is_not_a_failure() {
        let server = MockServer::start_async().await;
        mock_alive(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).json_body(json!({ "done": true }));
            })
            .await;

        let outcome = client_for(&server).summarize(&student()).await;

        assert_eq!(outcome, SummaryOutcome::Empty);
        assert!(!outcome.is_failure());
        assert_eq!(outcome.text(), NO_SUMMARY_RETURNED);
    }

    #[tokio::test]
    async fn undecodable_body_is_unexpected() {
        let server = MockServer::start_async().await;
        mock_alive(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(200).body("not json");
            })
            .await;

        let outcome = client_for(&server).summarize(&student()).await;

        assert!(matches!(outcome, SummaryOutcome::Unexpected(_)));
        assert!(outcome.text().starts_with("Unexpected error:"));
    }

    #[tokio::test]
    async fn client_error_status_is_a_transport_failure() {
        let server = MockServer::start_async().await;
        mock_alive(&server).await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/generate");
                then.status(404).body("model not found");
            })
            .await;

        let outcome = client_for(&server).summarize(&student()).await;

        assert_eq!(outcome, SummaryOutcome::Transport("HTTP 404".into()));
        assert_eq!(outcome.text(), "Ollama error: HTTP 404");
    }

    #[tokio::test]
    async fn disabled_client_never_calls_out() {
        let config = Config {
            ollama_enabled: false,
            ..Config::default()
        };
        let outcome = get_summary_client(&config).summarize(&student()).await;
        assert_eq!(outcome, SummaryOutcome::Disabled);
        assert!(!outcome.is_failure());
    }
}
