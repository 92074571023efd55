//! Gemini generateContent engine.
//!
//! Starts a stateless one-message session seeded with the system instruction,
//! with content-safety thresholds set to block medium-and-above across the
//! harassment, hate-speech, sexually-explicit, and dangerous-content
//! categories, and extracts the first candidate's text.

use async_trait::async_trait;
use codetutor_core::engine::{Engine, EngineRequest};
use codetutor_core::error::EngineError;
use serde::Deserialize;
use tracing::{debug, warn};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const USER_AGENT: &str = "codetutor-backend";

const SAFETY_CATEGORIES: [&str; 4] = [
    "HARM_CATEGORY_HARASSMENT",
    "HARM_CATEGORY_HATE_SPEECH",
    "HARM_CATEGORY_SEXUALLY_EXPLICIT",
    "HARM_CATEGORY_DANGEROUS_CONTENT",
];

/// A Gemini generateContent engine.
pub struct GeminiEngine {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl GeminiEngine {
    /// Create a new Gemini engine.
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

    /// Safety settings: block medium and above for every category.
    fn safety_settings() -> Vec<serde_json::Value> {
        SAFETY_CATEGORIES
            .iter()
            .map(|category| {
                serde_json::json!({
                    "category": category,
                    "threshold": "BLOCK_MEDIUM_AND_ABOVE",
                })
            })
            .collect()
    }
}

#[async_trait]
impl Engine for GeminiEngine {
    fn name(&self) -> &str {
        "gemini"
    }

    async fn complete(&self, request: EngineRequest) -> Result<String, EngineError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.base_url, request.model
        );

        let body = serde_json::json!({
            "systemInstruction": {
                "parts": [{ "text": request.system }]
            },
            "contents": [
                { "role": "user", "parts": [{ "text": request.prompt }] }
            ],
            "safetySettings": Self::safety_settings(),
            "generationConfig": {
                "temperature": request.sampling.temperature,
                "topP": request.sampling.top_p,
                "maxOutputTokens": request.sampling.max_output_tokens,
            },
        });

        debug!(model = %request.model, prompt_len = request.prompt.len(), "Sending Gemini completion request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
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
            warn!(status, body = %error_body, "Gemini returned error");
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
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or(EngineError::EmptyReply)?;

        Ok(reply)
    }
}

// --- Gemini API types (internal) ---

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    candidates: Vec<ApiCandidate>,
}

#[derive(Debug, Deserialize)]
struct ApiCandidate {
    content: ApiContent,
}

#[derive(Debug, Deserialize)]
struct ApiContent {
    #[serde(default)]
    parts: Vec<ApiPart>,
}

#[derive(Debug, Deserialize)]
struct ApiPart {
    text: String,
}
