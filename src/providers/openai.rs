use async_trait::async_trait;
use log::{debug, error, warn};
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::errors::ProviderError;
use crate::providers::{
    preview, status_error, ChatMessage, CompletionRequest, CompletionResponse, Provider,
    RetryPolicy,
};

/// Public OpenAI API root
pub const DEFAULT_OPENAI_ENDPOINT: &str = "https://api.openai.com/v1";

/// Client for OpenAI-compatible chat completion APIs
///
/// Works against api.openai.com as well as Azure deployments and other
/// gateways that speak the same protocol at a different base URL.
#[derive(Debug)]
pub struct OpenAi {
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// API root, without the trailing `/chat/completions`
    endpoint: String,
    /// Model or deployment name
    model: String,
    /// Retry and pacing settings
    retry: RetryPolicy,
}

/// Chat completion request body
#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
struct TokenUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Chat completion response body
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

impl OpenAi {
    /// Create a new client
    pub fn new(
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        model: impl Into<String>,
        timeout_secs: u64,
        retry: RetryPolicy,
    ) -> Self {
        let endpoint = endpoint.into();
        let endpoint = if endpoint.trim().is_empty() {
            DEFAULT_OPENAI_ENDPOINT.to_string()
        } else {
            endpoint.trim_end_matches('/').to_string()
        };

        Self {
            client: Client::builder()
                .timeout(Duration::from_secs(timeout_secs))
                .pool_idle_timeout(Duration::from_secs(90))
                .build()
                .unwrap_or_default(),
            api_key: api_key.into(),
            endpoint,
            model: model.into(),
            retry,
        }
    }

    /// Full chat completions URL
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint)
    }

    /// Model or deployment requests are sent to
    pub fn model(&self) -> &str {
        &self.model
    }

    async fn send_once(&self, request: &CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages: &request.messages,
            temperature: request.temperature,
            max_tokens: request.max_tokens,
        };

        let response = self.client.post(self.completions_url())
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&body)
            .send()
            .await
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to send request to OpenAI API: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("OpenAI API error ({}): {}", status, preview(&error_text, 500));
            return Err(status_error(status, error_text));
        }

        let response_text = response.text().await
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to read OpenAI API response: {}", e)))?;

        let parsed: ChatCompletionResponse = serde_json::from_str(&response_text).map_err(|e| {
            error!("Failed to parse OpenAI API response: {}. Raw response (first 500 chars): {}",
                   e, preview(&response_text, 500));
            ProviderError::ParseError(e.to_string())
        })?;

        into_completion(parsed)
    }
}

/// First choice's text, or `EmptyResponse` when there is none
fn into_completion(parsed: ChatCompletionResponse) -> Result<CompletionResponse, ProviderError> {
    let text = parsed.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or(ProviderError::EmptyResponse)?;

    Ok(CompletionResponse {
        text,
        prompt_tokens: parsed.usage.as_ref().map(|u| u.prompt_tokens),
        completion_tokens: parsed.usage.as_ref().map(|u| u.completion_tokens),
    })
}

#[async_trait]
impl Provider for OpenAi {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: CompletionRequest) -> Result<CompletionResponse, ProviderError> {
        let mut attempt = 0;

        loop {
            if attempt > 0 {
                if let Some(delay) = self.retry.pacing_delay() {
                    tokio::time::sleep(delay).await;
                }
            }

            match self.send_once(&request).await {
                Ok(response) => return Ok(response),
                Err(e) if attempt < self.retry.max_retries && RetryPolicy::is_retryable(&e) => {
                    attempt += 1;
                    warn!("OpenAI request failed: {} - attempt {}/{}", e, attempt, self.retry.max_retries + 1);
                    tokio::time::sleep(self.retry.backoff_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn test_connection(&self) -> Result<(), ProviderError> {
        debug!("Testing OpenAI connection at {}", self.endpoint);
        let request = CompletionRequest::new().user("Hello").max_tokens(5);
        match self.send_once(&request).await {
            // Five tokens may legitimately produce no text; the endpoint answered
            Ok(_) | Err(ProviderError::EmptyResponse) => Ok(()),
            Err(e) => Err(e),
        }
    }
}
