//! # codetutor Core
//!
//! Domain types, traits, and error definitions for the codetutor backend.
//! This crate has **zero framework dependencies** — it defines the domain model
//! that all other crates implement against.
//!
//! ## Design Philosophy
//!
//! Every external collaborator is defined as a trait here: the LLM engines and
//! the user-record store. Implementations live in their respective crates, so
//! the tutoring pipeline can be tested against in-memory stubs and new engine
//! families can be added without touching the rate limiter or the prompt
//! assembler.

pub mod engine;
pub mod error;
pub mod identity;
pub mod problem;
pub mod record;

// Re-export key types at crate root for ergonomics
pub use engine::{Engine, EngineRequest, SamplingConfig};
pub use error::{EngineError, HelpError, IdentityError, StoreError};
pub use identity::GithubUser;
pub use problem::{MagicLink, ProblemData, TestCase, TestResults, TestSlot, TestStatus, UserData};
pub use record::{UserRecord, UserRecordStore};
