//! The tutoring pipeline: rate-limit gate, prompt assembly, engine dispatch
//! glue, and the response envelope.

pub mod envelope;
pub mod gate;
pub mod prompt;
pub mod service;

pub use envelope::HelpResponse;
pub use gate::{Admission, Denial, Gate};
pub use prompt::{Outcome, PromptConfig};
pub use service::{HelpRequest, TutorService};
