//! Engine trait — the abstraction over LLM backends.
//!
//! An Engine knows how to send one system message plus one user prompt to a
//! model and return the reply text. The tutoring pipeline calls `complete()`
//! without knowing which provider family is behind it.
//!
//! Implementations: OpenAI chat completions, Gemini generateContent.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::EngineError;

/// Fixed sampling parameters for a tutoring completion.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SamplingConfig {
    pub temperature: f32,
    pub top_p: f32,
    pub frequency_penalty: f32,
    pub presence_penalty: f32,

    /// Bound on reply length.
    pub max_output_tokens: u32,
}

impl Default for SamplingConfig {
    fn default() -> Self {
        // The tutor always samples at full temperature with no penalties.
        Self {
            temperature: 1.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            max_output_tokens: 1024,
        }
    }
}

/// A single-turn completion request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineRequest {
    /// The model within the engine family (e.g., "gpt-4o", "gemini-1.5-flash").
    pub model: String,

    /// The fixed system-role instruction.
    pub system: String,

    /// The assembled tutoring prompt, sent as the only user message.
    pub prompt: String,

    pub sampling: SamplingConfig,
}

/// The core Engine trait.
///
/// Every LLM backend implements this. Stateless: each call is a fresh
/// single-turn conversation seeded with the system instruction.
#[async_trait]
pub trait Engine: Send + Sync {
    /// A human-readable family name (e.g., "openai", "gemini").
    fn name(&self) -> &str;

    /// Send the request and extract the reply text.
    async fn complete(&self, request: EngineRequest) -> Result<String, EngineError>;
}
