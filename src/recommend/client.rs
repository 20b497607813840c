//! Chat client for the recommendation model.
//!
//! Talks to an Ollama-compatible `/api/chat` endpoint. The client is
//! constructed from explicit configuration and passed to whoever needs it;
//! there is no ambient global instance.

use crate::recommend::prompt::{
    build_user_content, collapse_blank_lines, strip_think_blocks, RecommendationInput,
    SYSTEM_PROMPT,
};
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Configuration for the recommendation client.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    pub temperature: f32,
    pub timeout_seconds: u64,
    pub retries: usize,
    /// Proxy authentication token, sent as `X-Proxy-Auth` when present.
    pub token: Option<String>,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            model: "qwen2.5:14b".to_string(),
            temperature: 0.2,
            timeout_seconds: 90,
            retries: 3,
            token: None,
        }
    }
}

/// Chat message in the request body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Chat API request.
#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<ChatMessage>,
    stream: bool,
    options: ChatOptions,
}

#[derive(Debug, Serialize)]
struct ChatOptions {
    temperature: f32,
}

/// Chat API response.
#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: String,
}

/// The recommendation-generating client.
pub struct RecommendationClient {
    config: LlmConfig,
    http_client: reqwest::Client,
}

impl RecommendationClient {
    /// Create a client from explicit configuration.
    pub fn new(config: LlmConfig) -> Result<Self> {
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            config,
            http_client,
        })
    }

    /// Name of the configured model.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    /// Generate development recommendations for one report.
    ///
    /// Retries transient failures with a short backoff; the cleaned-up
    /// model output is returned verbatim for the report.
    pub async fn generate(&self, input: &RecommendationInput<'_>) -> Result<String> {
        let user_content = build_user_content(input);
        let attempts = self.config.retries.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            debug!(
                "Requesting recommendations (attempt {}/{})",
                attempt, attempts
            );
            match self.send_chat(&user_content).await {
                Ok(content) => {
                    let cleaned = collapse_blank_lines(&strip_think_blocks(&content));
                    if cleaned.trim().is_empty() {
                        anyhow::bail!("The model returned an empty response");
                    }
                    info!("Recommendations generated ({} chars)", cleaned.len());
                    return Ok(cleaned);
                }
                Err(e) => {
                    warn!("Recommendation attempt {} failed: {}", attempt, e);
                    last_error = Some(e);
                    if attempt < attempts {
                        tokio::time::sleep(Duration::from_secs(2 * attempt as u64)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| anyhow::anyhow!("Recommendation generation failed")))
    }

    /// Send one chat request and return the raw assistant content.
    async fn send_chat(&self, user_content: &str) -> Result<String> {
        let url = format!(
            "{}/api/chat",
            self.config.base_url.trim_end_matches('/')
        );

        let request = ChatRequest {
            model: self.config.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system".to_string(),
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user".to_string(),
                    content: user_content.to_string(),
                },
            ],
            stream: false,
            options: ChatOptions {
                temperature: self.config.temperature,
            },
        };

        let mut builder = self.http_client.post(&url).json(&request);
        if let Some(ref token) = self.config.token {
            builder = builder.header("X-Proxy-Auth", token);
        }

        let response = builder.send().await.map_err(|e| {
            if e.is_timeout() {
                anyhow::anyhow!(
                    "Request timed out after {}s",
                    self.config.timeout_seconds
                )
            } else if e.is_connect() {
                anyhow::anyhow!("Cannot connect to LLM endpoint at {}", self.config.base_url)
            } else {
                anyhow::anyhow!("Failed to send request: {}", e)
            }
        })?;

        let status = response.status();
        if status.as_u16() == 401 {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM endpoint rejected the proxy token (401): {}", body);
        }
        if status.as_u16() == 403 {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Access to model {} denied (403): {}",
                self.config.model,
                body
            );
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("LLM API error {}: {}", status, body);
        }

        let chat_response: ChatResponse = response
            .json()
            .await
            .context("Failed to parse LLM response")?;

        Ok(chat_response.message.content)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_config_default() {
        let config = LlmConfig::default();
        assert_eq!(config.model, "qwen2.5:14b");
        assert_eq!(config.retries, 3);
        assert!(config.token.is_none());
    }

    #[test]
    fn test_chat_request_shape() {
        let request = ChatRequest {
            model: "qwen2.5:14b".to_string(),
            messages: vec![ChatMessage {
                role: "system".to_string(),
                content: "hello".to_string(),
            }],
            stream: false,
            options: ChatOptions { temperature: 0.2 },
        };

        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["model"], "qwen2.5:14b");
        assert_eq!(json["stream"], false);
        assert_eq!(json["messages"][0]["role"], "system");
        assert!((json["options"]["temperature"].as_f64().unwrap() - 0.2).abs() < 1e-6);
    }

    #[test]
    fn test_client_construction() {
        let client = RecommendationClient::new(LlmConfig::default()).unwrap();
        assert_eq!(client.model(), "qwen2.5:14b");
    }
}
