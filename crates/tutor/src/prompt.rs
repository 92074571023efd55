//! Prompt assembly — renders problem, test, and memory state into text.
//!
//! Assembly is a pure function: identical inputs always produce byte-identical
//! output, and no network or clock access happens here. Sections appear in a
//! fixed order:
//!
//! 1. **Problem framing** — title, description, and the confidential solution
//!    under a non-disclosure directive
//! 2. **Memory recap** — the last N prior tutoring notes, oldest first
//! 3. **Outcome narrative** — exactly one branch of [`Outcome`]
//! 4. **Code listing** — the student's code in a fenced, line-numbered block
//! 5. **Closing directive** — the one-issue rule and the reply format

use codetutor_core::problem::{ProblemData, TestCase, TestSlot, UserData};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Default system-role instruction sent with every completion.
pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a patient coding tutor helping a student \
work through a programming exercise. You guide with hints and explanations; you never \
write the full solution for the student.";

/// The reply-format directive appended to every prompt. Echoed back to the
/// caller as `rememberingPrompt` so the frontend can parse the reply.
pub const REMEMBER_DIRECTIVE: &str = "End your reply with exactly three sections. \
A \"Thinking out loud\" section where you reason about the student's situation (the \
student will not be shown this). A \"My response\" section containing only what the \
student should read. A \"Remembering\" section, started with the heading \
\"# Remembering\", summarizing in a few sentences what you want to recall about this \
student next time.";

/// Immutable prompt-assembly configuration. Injected, never ambient.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// The system-role instruction for the engine.
    pub system_prompt: String,

    /// How many of the most recent memory entries to replay.
    pub memory_window: usize,

    /// Maximum number of hidden failing tests rendered into the prompt.
    /// Hidden failures beyond the cap are silently omitted.
    pub hidden_render_cap: usize,
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            memory_window: 5,
            hidden_render_cap: 4,
        }
    }
}

/// The single outcome narrative chosen for a test run.
///
/// Classification happens exactly once, with strict precedence: all-passed
/// beats failing enumeration beats parse error beats runtime error beats
/// unknown failure. Only one variant ever renders.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// Run completed and every recorded result passed.
    Success,

    /// Run completed with at least one Failed or Exception; carries the flat
    /// indices of the failing tests, in order.
    PartialFailure(Vec<usize>),

    /// Run did not complete and a parse error was captured.
    ParseError,

    /// Run did not complete and a runtime error was captured.
    RuntimeError,

    /// Run did not complete and nothing specific was captured.
    UnknownFailure,
}

impl Outcome {
    /// Classify a test run. Evaluated once per request.
    pub fn classify(user: &UserData) -> Self {
        let results = &user.test_results;
        if results.all_passed() {
            return Self::Success;
        }
        if results.ran_successfully {
            let failing = results.failing_indices();
            if !failing.is_empty() {
                return Self::PartialFailure(failing);
            }
        }
        if !results.ran_successfully && !results.parse_error.is_empty() {
            return Self::ParseError;
        }
        if !results.ran_successfully && !results.runtime_error.is_empty() {
            return Self::RuntimeError;
        }
        Self::UnknownFailure
    }
}

/// Assemble the full tutoring prompt for one request.
pub fn assemble(config: &PromptConfig, problem: &ProblemData, user: &UserData) -> String {
    let mut out = String::new();

    render_problem_framing(&mut out, problem);
    render_memory_recap(&mut out, &user.ai_remember_response, config.memory_window);

    let outcome = Outcome::classify(user);
    debug!(?outcome, "Outcome classified");
    render_outcome(&mut out, &outcome, problem, user, config.hidden_render_cap);

    render_code_listing(&mut out, &user.current_code, &problem.code_lang);
    render_closing_directive(&mut out);

    out
}

fn render_problem_framing(out: &mut String, problem: &ProblemData) {
    out.push_str("The student is working on the following problem:\n\n");
    out.push_str(&format!("Title: {}\n", problem.title));
    out.push_str(&format!("Description: {}\n\n", problem.description));
    out.push_str(
        "The reference solution below is strictly confidential. Never reveal it, quote \
         from it, or mention that you have it. It exists only so you can judge the \
         student's approach.\n\n",
    );
    out.push_str(&format!("Reference solution:\n{}\n\n", problem.solution));
}

fn render_memory_recap(out: &mut String, memory: &[String], window: usize) {
    if memory.is_empty() {
        out.push_str("You have no prior history with this student.\n\n");
        return;
    }

    out.push_str(
        "These are your notes from previous conversations with this student, oldest \
         first:\n\n",
    );
    let start = memory.len().saturating_sub(window);
    let recent: Vec<&str> = memory[start..].iter().map(String::as_str).collect();
    out.push_str(&recent.join("\n\n"));
    out.push_str(
        "\n\nIf these notes show you made a mistake in earlier advice, acknowledge it \
         and apologize before moving on.\n\n",
    );
}

fn render_outcome(
    out: &mut String,
    outcome: &Outcome,
    problem: &ProblemData,
    user: &UserData,
    hidden_cap: usize,
) {
    match outcome {
        Outcome::Success => {
            out.push_str(
                "The student's code passed every test. Congratulate them on solving the \
                 problem.\n\n",
            );
        }
        Outcome::PartialFailure(failing) => {
            out.push_str("The student's code ran, but some tests failed:\n\n");
            render_failing_tests(out, failing, problem, user, hidden_cap);
        }
        Outcome::ParseError => {
            out.push_str(&format!(
                "The student's code failed to parse. The parser reported:\n{}\nThe error \
                 is on line {}.\n\n",
                user.test_results.parse_error, user.test_results.error_line
            ));
        }
        Outcome::RuntimeError => {
            out.push_str(&format!(
                "The student's code raised a runtime error:\n{}\n\n",
                user.test_results.runtime_error
            ));
        }
        Outcome::UnknownFailure => {
            out.push_str(
                "The student's code failed to run, but no specific error was captured. \
                 Tell the student plainly that something went wrong and you do not know \
                 what.\n\n",
            );
        }
    }
}

fn render_failing_tests(
    out: &mut String,
    failing: &[usize],
    problem: &ProblemData,
    user: &UserData,
    hidden_cap: usize,
) {
    let results = &user.test_results;
    let mut hidden_seen = 0usize;

    for &index in failing {
        let Some((slot, case)) = problem.test_case_at(index) else {
            // A result index beyond the known tests; nothing to render.
            continue;
        };

        match slot {
            TestSlot::Visible(_) => {
                out.push_str(&format!("Test {}: {}\n", index + 1, case.display));
                render_test_detail(out, case, results, index);
            }
            TestSlot::Hidden(_) => {
                // The counter advances for every hidden failure, but rendering
                // stops at the cap. The remainder is never disclosed, not even
                // as a count.
                hidden_seen += 1;
                if hidden_seen > hidden_cap {
                    continue;
                }
                out.push_str(&format!("Hidden Test: {}\n", case.display));
                out.push_str(
                    "This is a hidden test. Never reveal its parameters or expected \
                     values to the student; describe the failure only in general \
                     terms.\n",
                );
                render_test_detail(out, case, results, index);
            }
        }
    }

    out.push('\n');
}

fn render_test_detail(
    out: &mut String,
    case: &TestCase,
    results: &codetutor_core::problem::TestResults,
    index: usize,
) {
    for link in &case.magic_links {
        out.push_str(&format!("  {} = {}\n", link.key, link.value));
    }
    if let Some(returned) = results.returned_results.get(index) {
        out.push_str(&format!("  Returned: {returned}\n"));
    }
    if let Some(expected) = results.expected_results.get(index) {
        out.push_str(&format!("  Expected: {expected}\n"));
    }
}

fn render_code_listing(out: &mut String, code: &str, lang: &str) {
    let trimmed = code.trim_end();
    let line_count = trimmed.lines().count().max(1);

    out.push_str("This is the student's current code:\n\n");
    out.push_str(&format!("```{lang}\n"));
    out.push_str("// This is line 1 of the student's code\n");
    out.push_str(trimmed);
    out.push_str(&format!(
        "\n// This is line {line_count} of the student's code\n"
    ));
    out.push_str("```\n\n");
}

fn render_closing_directive(out: &mut String) {
    out.push_str(
        "Address exactly one blocking issue in the student's code, the one most likely \
         to be holding them up right now. Keep the reference solution and all hidden \
         test details confidential throughout. ",
    );
    out.push_str(REMEMBER_DIRECTIVE);
    out.push('\n');
}
