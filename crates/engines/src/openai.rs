//! OpenAI chat-completions engine.
//!
//! Sends a single-turn completion: one fixed system message plus the
//! assembled tutoring prompt as the only user message, with fixed sampling
//! parameters, and extracts the first choice's reply text.

use async_trait::async_trait;
use codetutor_core::engine::{Engine, EngineRequest};
use codetutor_core::error::EngineError;
use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const USER_AGENT: &str = "codetutor-backend";

/// An OpenAI chat-completions engine.
pub struct OpenAiEngine {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl OpenAiEngine {
    /// Create a new OpenAI engine.
    pub fn new(api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .timeout(std::time::Duration::from_secs(120))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            base_url: DEFAULT_BASE_URL.into(),
            api_key: api_key.into(),
            client,
        }
    }

    /// Create with a custom base URL (e.g., for testing or proxies).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }
}

#[async_trait]
impl Engine for OpenAiEngine {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: EngineRequest) -> Result<String, EngineError> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = serde_json::json!({
            "model": request.model,
            "messages": [
                { "role": "system", "content": request.system },
                { "role": "user", "content": request.prompt },
            ],
            "temperature": request.sampling.temperature,
            "top_p": request.sampling.top_p,
            "frequency_penalty": request.sampling.frequency_penalty,
            "presence_penalty": request.sampling.presence_penalty,
            "max_tokens": request.sampling.max_output_tokens,
        });

        debug!(model = %request.model, prompt_len = request.prompt.len(), "Sending OpenAI completion request");

        let response = self
            .client
            .post(&url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Content-Type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| EngineError::Network(e.to_string()))?;

        let status = response.status().as_u16();

        if status == 401 || status == 403 {
            return Err(EngineError::AuthenticationFailed(
                "Invalid API key or insufficient permissions".into(),
            ));
        }

        if status != 200 {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status, body = %error_body, "OpenAI returned error");
            return Err(EngineError::ApiError {
                status_code: status,
                message: error_body,
            });
        }

        let api_response: ApiResponse =
            response.json().await.map_err(|e| EngineError::ApiError {
                status_code: 200,
                message: format!("Failed to parse response: {e}"),
            })?;

        let reply = api_response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or(EngineError::EmptyReply)?;

        Ok(reply)
    }
}

// --- OpenAI API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn custom_base_url_trims_trailing_slash() {
        let engine = OpenAiEngine::new("sk-test").with_base_url("http://localhost:1234/v1/");
        assert_eq!(engine.base_url, "http://localhost:1234/v1");
    }

    #[test]
    fn parses_first_choice_content() {
        let data = r#"{"choices":[{"message":{"role":"assistant","content":"Try checking your loop bound."}}]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert_eq!(
            parsed.choices[0].message.content.as_deref(),
            Some("Try checking your loop bound.")
        );
    }

    #[test]
    fn parses_empty_choices() {
        let data = r#"{"choices":[]}"#;
        let parsed: ApiResponse = serde_json::from_str(data).unwrap();
        assert!(parsed.choices.is_empty());
    }
}
