use crate::ai::{ChatModel, CompletionRequest};
use crate::config::DEFAULT_OPENAI_ENDPOINT;
use async_trait::async_trait;
use reqwest::{header, Client};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Client for any OpenAI-compatible chat-completions endpoint
#[derive(Clone)]
pub struct OpenAIClient {
    client: Client,
    endpoint: String,
    max_tokens: u32,
}

#[derive(Debug, Serialize)]
struct OpenAICompletionRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct OpenAIMessage {
    pub role: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAICompletionResponse {
    choices: Vec<OpenAIChoice>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIErrorResponse {
    error: OpenAIError,
}

#[derive(Debug, Deserialize)]
struct OpenAIError {
    message: String,
}

impl OpenAIClient {
    pub fn new(api_key: &str, endpoint: Option<&str>, max_tokens: Option<u32>) -> Result<Self, String> {
        let endpoint_url = endpoint.unwrap_or(DEFAULT_OPENAI_ENDPOINT).to_string();

        let mut headers = header::HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        // Only add auth header if API key is provided and not empty
        if !api_key.is_empty() {
            let auth_value = header::HeaderValue::from_str(&format!("Bearer {}", api_key))
                .map_err(|e| format!("Invalid API key format: {}", e))?;
            headers.insert(header::AUTHORIZATION, auth_value);
        }

        let client = Client::builder()
            .default_headers(headers)
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| format!("Failed to create HTTP client: {}", e))?;

        Ok(Self {
            client,
            endpoint: endpoint_url,
            max_tokens: max_tokens.unwrap_or(4096),
        })
    }

    fn build_request(&self, request: CompletionRequest) -> OpenAICompletionRequest {
        OpenAICompletionRequest {
            model: request.model,
            messages: request
                .messages
                .into_iter()
                .map(|m| OpenAIMessage {
                    role: m.role.to_string(),
                    content: Some(m.content),
                })
                .collect(),
            max_tokens: request.max_tokens.unwrap_or(self.max_tokens),
            temperature: request.temperature,
        }
    }
}

/// Turn a non-success body into an error message, preferring the API's own
fn error_from_body(status: reqwest::StatusCode, body: &str) -> String {
    if let Ok(error_response) = serde_json::from_str::<OpenAIErrorResponse>(body) {
        return format!("OpenAI API error: {}", error_response.error.message);
    }
    format!("OpenAI API returned error status: {}, body: {}", status, body)
}

/// Pull the first choice's text out of a completion body
fn content_from_body(body: &str) -> Result<String, String> {
    let response_data: OpenAICompletionResponse = serde_json::from_str(body)
        .map_err(|e| format!("Failed to parse OpenAI response: {} - body: {}", e, body))?;

    let choice = response_data
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| "OpenAI API returned no choices".to_string())?;

    log::info!(
        "[OPENAI] Response - content_len: {}, finish_reason: {:?}",
        choice.message.content.as_ref().map(|c| c.len()).unwrap_or(0),
        choice.finish_reason
    );

    Ok(choice.message.content.unwrap_or_default())
}

#[async_trait]
impl ChatModel for OpenAIClient {
    async fn generate_text(&self, request: CompletionRequest) -> Result<String, String> {
        let request = self.build_request(request);

        log::info!(
            "[OPENAI] Sending request to {} with model {} ({} messages)",
            self.endpoint,
            request.model,
            request.messages.len()
        );
        log::debug!(
            "[OPENAI] Full request:\n{}",
            serde_json::to_string_pretty(&request).unwrap_or_default()
        );

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("OpenAI API request failed: {}", e))?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(error_from_body(status, &error_text));
        }

        let response_text = response
            .text()
            .await
            .map_err(|e| format!("Failed to read OpenAI response: {}", e))?;

        log::debug!("[OPENAI] Raw response:\n{}", response_text);

        content_from_body(&response_text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::Message;

    #[test]
    fn test_build_request_uses_client_max_tokens() {
        let client = OpenAIClient::new("sk-test", None, Some(512)).unwrap();
        let request = client.build_request(CompletionRequest::new(
            "gpt-4o",
            vec![Message::system("be brief"), Message::user("hi")],
        ));
        let body = serde_json::to_value(&request).unwrap();

        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["max_tokens"], 512);
        assert_eq!(body["messages"][0]["role"], "system");
        assert_eq!(body["messages"][1]["content"], "hi");
        assert!(body.get("temperature").is_none());
    }

    #[test]
    fn test_request_overrides() {
        let client = OpenAIClient::new("", Some("http://localhost:1/v1/chat/completions"), None).unwrap();
        let mut request = CompletionRequest::new("gpt-4o-mini", vec![Message::user("hi")]);
        request.max_tokens = Some(1000);
        request.temperature = Some(0.7);
        let body = serde_json::to_value(client.build_request(request)).unwrap();

        assert_eq!(body["max_tokens"], 1000);
        assert!((body["temperature"].as_f64().unwrap() - 0.7).abs() < 1e-6);
    }

    #[test]
    fn test_content_from_body() {
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"Hello"},"finish_reason":"stop"}]}"#;
        assert_eq!(content_from_body(body).unwrap(), "Hello");

        assert_eq!(content_from_body(r#"{"choices":[]}"#).unwrap_err(), "OpenAI API returned no choices");
        assert!(content_from_body("<html>").is_err());
    }

    #[test]
    fn test_error_from_body() {
        let status = reqwest::StatusCode::UNAUTHORIZED;
        assert_eq!(
            error_from_body(status, r#"{"error":{"message":"bad key"}}"#),
            "OpenAI API error: bad key"
        );
        assert!(error_from_body(status, "nope").contains("401"));
    }
}
