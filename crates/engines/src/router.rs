//! Engine router — maps an engine identifier to a concrete backend.
//!
//! Selection is a pure prefix test on the identifier:
//! - `openai-<model>` → the OpenAI engine, model = the part after the prefix
//! - `gemini*`        → the Gemini engine, model = the identifier itself
//!
//! Families whose credential is missing are never registered, so dispatching
//! to them is a soft no-op (`None`) rather than an error — the envelope still
//! reports success with no reply. Unrecognized identifiers behave the same
//! way by design.

use std::sync::Arc;

use codetutor_config::AppConfig;
use codetutor_core::engine::Engine;
use tracing::{debug, info};

use crate::gemini::GeminiEngine;
use crate::openai::OpenAiEngine;

const OPENAI_PREFIX: &str = "openai-";
const GEMINI_PREFIX: &str = "gemini";

/// A resolved dispatch target: the engine plus the model name to request.
pub struct Dispatch {
    pub engine: Arc<dyn Engine>,
    pub model: String,
}

/// Routes engine identifiers to the correct backend.
pub struct EngineRouter {
    openai: Option<Arc<dyn Engine>>,
    gemini: Option<Arc<dyn Engine>>,
}

impl EngineRouter {
    /// Build a router from configuration. Each family is registered only when
    /// its API key is configured.
    pub fn from_config(config: &AppConfig) -> Self {
        let openai: Option<Arc<dyn Engine>> = config
            .openai_api_key
            .as_deref()
            .map(|key| Arc::new(OpenAiEngine::new(key)) as Arc<dyn Engine>);
        let gemini: Option<Arc<dyn Engine>> = config
            .gemini_api_key
            .as_deref()
            .map(|key| Arc::new(GeminiEngine::new(key)) as Arc<dyn Engine>);

        info!(
            openai = openai.is_some(),
            gemini = gemini.is_some(),
            "Engine router built"
        );

        Self { openai, gemini }
    }

    /// A router with explicit engines (useful for testing).
    pub fn new(openai: Option<Arc<dyn Engine>>, gemini: Option<Arc<dyn Engine>>) -> Self {
        Self { openai, gemini }
    }

    /// Resolve an engine identifier to a backend and model name.
    ///
    /// Returns `None` for unrecognized identifiers and for families without a
    /// configured credential.
    pub fn dispatch(&self, engine_id: &str) -> Option<Dispatch> {
        if let Some(model) = engine_id.strip_prefix(OPENAI_PREFIX) {
            let engine = self.openai.clone()?;
            return Some(Dispatch {
                engine,
                model: model.to_string(),
            });
        }

        if engine_id.starts_with(GEMINI_PREFIX) {
            let engine = self.gemini.clone()?;
            return Some(Dispatch {
                engine,
                model: engine_id.to_string(),
            });
        }

        debug!(engine_id, "No engine family matches identifier");
        None
    }
}
