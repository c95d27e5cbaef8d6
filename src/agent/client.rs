//! Ollama-backed AnalysisAgent.
//!
//! Every invocation is one non-streaming `/api/chat` request whose reply
//! content is parsed as JSON. Transport failures are retried with
//! exponential backoff; the caller sees a single outcome.

use crate::agent::response::parse_json_reply;
use crate::agent::{AgentRequest, AnalysisAgent};
use crate::config::{Config, RetryConfig};
use crate::error::AgentError;
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the agent.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    pub ollama_url: String,
    pub model_name: String,
    pub temperature: f32,
    /// Floor for the per-request token budget.
    pub max_tokens: usize,
    pub timeout_seconds: u64,
    pub retry: RetryConfig,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            ollama_url: "http://localhost:11434".to_string(),
            model_name: "llama3.2:latest".to_string(),
            temperature: 0.3,
            max_tokens: 500,
            timeout_seconds: 300,
            retry: RetryConfig::default(),
        }
    }
}

impl From<&Config> for AgentConfig {
    fn from(config: &Config) -> Self {
        Self {
            ollama_url: config.model.ollama_url.clone(),
            model_name: config.model.name.clone(),
            temperature: config.model.temperature,
            max_tokens: config.model.max_tokens,
            timeout_seconds: config.model.timeout_seconds,
            retry: config.retry.clone(),
        }
    }
}

/// Message in the chat history.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

/// Ollama chat API request.
#[derive(Debug, Serialize)]
struct OllamaChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    format: &'static str,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: usize,
}

/// Ollama chat API response.
#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    content: String,
}

/// The analysis agent talking to a local Ollama server.
pub struct OllamaAgent {
    config: AgentConfig,
    http_client: reqwest::Client,
}

impl OllamaAgent {
    /// Create a new agent.
    pub fn new(config: AgentConfig) -> Result<Self> {
        info!(
            "Initializing agent with model {} at {}",
            config.model_name, config.ollama_url
        );

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Send one chat request and parse the reply content as JSON.
    async fn send_once(&self, request: &AgentRequest) -> Result<Value, AgentError> {
        let url = format!("{}/api/chat", self.config.ollama_url);

        let body = OllamaChatRequest {
            model: self.config.model_name.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: request.system.clone(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: request.prompt.clone(),
                },
            ],
            stream: false,
            format: "json",
            options: OllamaOptions {
                temperature: self.config.temperature,
                num_predict: request.max_tokens.max(self.config.max_tokens),
            },
        };

        debug!("Sending {} request ({} prompt bytes)", request.task, request.prompt.len());

        let response = self
            .http_client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AgentError::Timeout(self.config.timeout_seconds)
                } else if e.is_connect() {
                    AgentError::Transport(format!(
                        "cannot connect to Ollama at {}",
                        self.config.ollama_url
                    ))
                } else {
                    AgentError::Transport(e.to_string())
                }
            })?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::Status { status, body });
        }

        let chat_response: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Transport(format!("failed to read Ollama response: {}", e)))?;

        parse_json_reply(&chat_response.message.content)
    }
}

#[async_trait]
impl AnalysisAgent for OllamaAgent {
    async fn invoke(&self, request: AgentRequest) -> Result<Value, AgentError> {
        let attempts = self.config.retry.attempts.max(1);
        let mut last_error = AgentError::Failed("no attempt was made".to_string());

        for attempt in 0..attempts {
            match self.send_once(&request).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self.config.retry.delay_for(attempt);
                    warn!(
                        "{} call failed (attempt {}/{}): {}. Retrying in {:?}",
                        request.task,
                        attempt + 1,
                        attempts,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                    last_error = e;
                }
                Err(e) => {
                    last_error = e;
                    break;
                }
            }
        }

        Err(last_error)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::AgentTask;

    #[test]
    fn test_agent_config_default() {
        let config = AgentConfig::default();
        assert_eq!(config.model_name, "llama3.2:latest");
        assert_eq!(config.retry.attempts, 3);
    }

    #[test]
    fn test_agent_config_from_config() {
        let mut config = Config::default();
        config.model.name = "qwen2.5:14b".to_string();
        config.retry.attempts = 1;

        let agent_config = AgentConfig::from(&config);
        assert_eq!(agent_config.model_name, "qwen2.5:14b");
        assert_eq!(agent_config.retry.attempts, 1);
    }

    #[test]
    fn test_retryable_errors() {
        assert!(AgentError::Timeout(10).is_retryable());
        assert!(AgentError::Status {
            status: 503,
            body: String::new()
        }
        .is_retryable());
        assert!(!AgentError::InvalidJson("x".into()).is_retryable());
        assert!(!AgentError::SchemaMismatch("x".into()).is_retryable());
    }

    #[tokio::test]
    async fn test_unreachable_server_fails_after_retries() {
        let config = AgentConfig {
            ollama_url: "http://127.0.0.1:9".to_string(),
            timeout_seconds: 2,
            retry: RetryConfig {
                attempts: 2,
                base_delay_ms: 1,
                factor: 2.0,
            },
            ..AgentConfig::default()
        };
        let agent = OllamaAgent::new(config).unwrap();

        let result = agent
            .invoke(AgentRequest::new(AgentTask::Classify, "system", "prompt"))
            .await;

        let err = result.unwrap_err();
        assert!(err.is_retryable(), "unexpected error: {}", err);
    }
}
