use crate::ai::Message;
use reqwest::{header, Client};
use serde::Serialize;
use serde_json::Value;
use std::env;
use std::time::Duration;

const DEFAULT_API_VERSION: &str = "2024-05-01-preview";

/// Chat client for an Azure OpenAI deployment
#[derive(Clone)]
pub struct AzureChatClient {
    client: Client,
    endpoint: String,
    deployment: String,
    api_version: String,
}

#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    messages: Vec<Message>,
    temperature: f32,
}

impl AzureChatClient {
    /// Build a client from `AZURE_OPENAI_*` environment variables.
    ///
    /// Returns an error when the deployment is not fully configured; callers
    /// are expected to fall back to canned agent responses in that case.
    pub fn from_env() -> Result<Self, String> {
        let endpoint = env::var("AZURE_OPENAI_ENDPOINT")
            .unwrap_or_default()
            .trim()
            .trim_end_matches('/')
            .to_string();
        let deployment = env::var("AZURE_OPENAI_DEPLOYMENT")
            .unwrap_or_default()
            .trim()
            .to_string();
        if endpoint.is_empty() || deployment.is_empty() {
            return Err(
                "AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_DEPLOYMENT must be configured via .env"
                    .to_string(),
            );
        }

        let api_version = env::var("AZURE_OPENAI_API_VERSION")
            .ok()
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| DEFAULT_API_VERSION.to_string());

        let api_key = env::var("AZURE_OPENAI_API_KEY")
            .unwrap_or_default()
            .trim()
            .to_string();
        if api_key.is_empty() {
            return Err("AZURE_OPENAI_API_KEY must be configured to enable live agents".to_string());
        }

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );
        let key_value = header::HeaderValue::from_str(&api_key)
            .map_err(|e| format!("Invalid API key format: {}", e))?;
        headers.insert("api-key", key_value);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint,
            deployment,
            api_version,
        })
    }

    /// Send a chat completion request and return the generated text.
    pub async fn generate_text(&self, messages: Vec<Message>) -> Result<String, String> {
        let url = format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.endpoint, self.deployment, self.api_version
        );
        let request = ChatCompletionRequest {
            messages,
            temperature: 0.4,
        };

        log::debug!("[AZURE] Sending chat request to deployment {}", self.deployment);

        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Azure OpenAI request failed: {}", e))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| format!("Failed to read Azure OpenAI response: {}", e))?;

        if !status.is_success() {
            return Err(format!(
                "Azure OpenAI returned error status {}: {}",
                status, body
            ));
        }

        let value: Value = serde_json::from_str(&body)
            .map_err(|e| format!("Failed to parse Azure OpenAI response: {} - body: {}", e, body))?;

        Ok(extract_text(&value))
    }
}

/// Pull the first usable text field out of a chat completion response.
///
/// Gateways in front of Azure OpenAI do not all agree on the response shape,
/// so extraction is a prioritized walk over the known field layouts with a
/// stringified-value fallback. Never panics on unknown shapes.
pub fn extract_text(value: &Value) -> String {
    // Standard chat completion shape
    if let Some(content) = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
    {
        let trimmed = content.trim();
        if !trimmed.is_empty() {
            return trimmed.to_string();
        }
    }

    // Segmented content arrays, either nested in choices or at the top level
    let segments = value
        .pointer("/choices/0/message/content")
        .and_then(Value::as_array)
        .or_else(|| value.get("content").and_then(Value::as_array));
    if let Some(items) = segments {
        let pieces: Vec<&str> = items
            .iter()
            .filter_map(|item| item.get("text").and_then(Value::as_str))
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if !pieces.is_empty() {
            return pieces.join(" ");
        }
    }

    // Flat message/text fields used by some relays
    for field in ["message", "text"] {
        if let Some(text) = value.get(field).and_then(Value::as_str) {
            let trimmed = text.trim();
            if !trimmed.is_empty() {
                return trimmed.to_string();
            }
        }
    }

    if let Some(text) = value.as_str() {
        return text.trim().to_string();
    }

    value.to_string()
}
