use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use log::{error, warn};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{
    preview, status_error, ChatMessage, CompletionRequest, CompletionResponse, Provider,
    RetryPolicy,
};

/// Ollama client for interacting with Ollama API
#[derive(Debug)]
pub struct Ollama {
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Model name to use for generation
    model: String,
    /// Retry and pacing settings
    retry: RetryPolicy,
}

/// Generation options for the Ollama API
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    stream: bool,
}

/// Chat response from the Ollama API
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(default)]
    pub eval_count: Option<u64>,
}

/// Build `scheme://host:port`, keeping an explicit scheme or port
fn build_base_url(host: &str, port: u16) -> String {
    match host.split_once("://") {
        Some((scheme, host_part)) if !host_part.is_empty() => {
            if host_part.contains(':') {
                host.trim_end_matches('/').to_string()
            } else {
                format!("{}://{}:{}", scheme, host_part.trim_end_matches('/'), port)
            }
        }
        Some(_) => format!("http://localhost:{}", port),
        None => format!("http://{}:{}", host, port),
    }
}

/// Parse a chat response body, falling back to JSONL streaming output
fn parse_chat_body(response_text: &str) -> Result<ChatResponse> {
    if let Ok(parsed) = serde_json::from_str::<ChatResponse>(response_text) {
        return Ok(parsed);
    }

    // Streamed output: one JSON object per line, content split across them
    let mut content = String::new();
    let mut prompt_eval_count = None;
    let mut eval_count = None;
    let mut seen_any = false;

    for line in response_text.lines().filter(|l| !l.trim().is_empty()) {
        let value: serde_json::Value = serde_json::from_str(line)
            .with_context(|| format!("Invalid JSON line in Ollama response: {}", preview(line, 120)))?;
        seen_any = true;
        if let Some(part) = value.pointer("/message/content").and_then(|v| v.as_str()) {
            content.push_str(part);
        }
        if value.get("done").and_then(|v| v.as_bool()).unwrap_or(false) {
            prompt_eval_count = value.get("prompt_eval_count").and_then(|v| v.as_u64());
            eval_count = value.get("eval_count").and_then(|v| v.as_u64());
        }
    }

    if !seen_any {
        return Err(anyhow!("Ollama response contains no JSON"));
    }

    Ok(ChatResponse {
        message: ChatMessage { role: "assistant".to_string(), content },
        done: true,
        prompt_eval_count,
        eval_count,
    })
}

/// Completion from a parsed chat body; blank content is `EmptyResponse`
fn into_completion(chat: ChatResponse) -> Result<CompletionResponse, ProviderError> {
    if chat.message.content.trim().is_empty() {
        return Err(ProviderError::EmptyResponse);
    }

    Ok(CompletionResponse {
        text: chat.message.content,
        prompt_tokens: chat.prompt_eval_count,
        completion_tokens: chat.eval_count,
    })
}

impl Ollama {
    /// Create a new Ollama client with configuration
    ///
    /// Ollama speaks HTTP/1.1; connections are pooled for parallel requests.
    pub fn new(host: impl Into<String>, port: u16, model: impl Into<String>, timeout_secs: u64, retry: RetryPolicy) -> Self {
        Self {
            base_url: build_base_url(&host.into(), port),
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .http1_only()
                .pool_idle_timeout(Duration::from_secs(90))
                .pool_max_idle_per_host(20)
                .tcp_keepalive(Duration::from_secs(60))
                .build()
                .unwrap_or_default(),
            model: model.into(),
            retry,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn chat_once(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let url = format!("{}/api/chat", self.base_url);
        let body = ChatRequest {
            model: &self.model,
            messages: &request.messages,
            options: Some(GenerationOptions {
                temperature: request.temperature,
                num_predict: request.max_tokens,
            }),
            stream: false,
        };

        let response = self.client.post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to send chat request to Ollama API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, preview(&error_text, 500));
            return Err(status_error(status, error_text));
        }

        let response_text = response.text().await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to get response text from Ollama API: {}", e)))?;

        let chat = parse_chat_body(&response_text).map_err(|e| {
            error!("Failed to parse Ollama API chat response: {}. Raw response (first 500 chars): {}",
                   e, preview(&response_text, 500));
            ProviderError::ParseError(e.to_string())
        })?;

        into_completion(chat)
    }

    /// Get the Ollama API version
    pub async fn version(&self) -> Result<String> {
        let url = format!("{}/api/version", self.base_url);
        let response: serde_json::Value = self.client.get(&url)
            .send()
            .await
            .context("Failed to connect to Ollama")?
            .json()
            .await
            .context("Failed to parse Ollama version response")?;

        let version = response["version"].as_str()
            .ok_or_else(|| anyhow!("Invalid version format in response"))?
            .to_string();

        Ok(version)
    }
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        "ollama"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                if let Some(delay) = self.retry.pacing_delay() {
                    tokio::time::sleep(delay).await;
                }
            }

            match self.chat_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry.max_retries && RetryPolicy::is_retryable(&e) => {
                    attempt += 1;
                    warn!("Ollama request failed: {} - attempt {}/{}", e, attempt, self.retry.max_retries + 1);
                    tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        self.version()
            .await
            .map(|_| ())
            .map_err(|e| ProviderError::ConnectionError(e.to_string()))
    }
}
