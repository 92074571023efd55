//! LLM engine implementations for the codetutor backend.

pub mod gemini;
pub mod openai;
pub mod router;

pub use gemini::GeminiEngine;
pub use openai::OpenAiEngine;
pub use router::{Dispatch, EngineRouter};
