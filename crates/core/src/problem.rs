//! Problem, test, and session snapshot types.
//!
//! These arrive fresh with every request from the frontend; nothing here is
//! shared across requests. Field names follow the frontend's JSON (camelCase).

use serde::{Deserialize, Serialize};

/// A key/value substitution pair rendered alongside a test's display string.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MagicLink {
    pub key: String,
    pub value: String,
}

/// A single test case.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestCase {
    /// The test id/expression.
    pub test: String,

    /// Human-readable display string for the test.
    pub display: String,

    /// Ordered substitution pairs for the display string.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub magic_links: Vec<MagicLink>,
}

/// Immutable per-request snapshot of a coding problem.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProblemData {
    pub title: String,
    pub description: String,

    /// Confidential reference solution. Included in the LLM prompt with a
    /// non-disclosure instruction; never echoed back to the student.
    pub solution: String,

    /// Language tag used for the fenced code block in the prompt.
    pub code_lang: String,

    /// Visible tests, in display order.
    #[serde(default)]
    pub tests: Vec<TestCase>,

    /// Hidden tests. Their parameters must never reach the student in
    /// plaintext; they only appear inside the prompt under a confidentiality
    /// warning.
    #[serde(default)]
    pub hidden_tests: Vec<TestCase>,
}

/// Where a flat result index lands in the visible ++ hidden concatenation.
///
/// The contained number is the 0-based position within that sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestSlot {
    Visible(usize),
    Hidden(usize),
}

impl ProblemData {
    /// Resolve a flat result index into the visible/hidden split.
    ///
    /// `TestResults::test_results` is index-aligned with the concatenation of
    /// visible then hidden tests; this is the single place that boundary is
    /// interpreted.
    pub fn test_case_at(&self, index: usize) -> Option<(TestSlot, &TestCase)> {
        if index < self.tests.len() {
            Some((TestSlot::Visible(index), &self.tests[index]))
        } else {
            let hidden_index = index - self.tests.len();
            self.hidden_tests
                .get(hidden_index)
                .map(|tc| (TestSlot::Hidden(hidden_index), tc))
        }
    }
}

/// The outcome of a single test, index-aligned with visible ++ hidden tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TestStatus {
    Passed,
    Failed,
    Exception,
    NotRun,
}

/// Pre-computed test run results supplied by the caller.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestResults {
    pub ran_successfully: bool,

    #[serde(default)]
    pub test_results: Vec<TestStatus>,

    #[serde(default)]
    pub returned_results: Vec<String>,

    #[serde(default)]
    pub expected_results: Vec<String>,

    /// Populated only when `ran_successfully` is false. Parse errors take
    /// precedence over runtime errors over unknown failures.
    #[serde(default)]
    pub parse_error: String,

    /// 1-based line of the parse error.
    #[serde(default)]
    pub error_line: u32,

    #[serde(default)]
    pub runtime_error: String,

    #[serde(default)]
    pub output: String,
}

impl TestResults {
    /// True when the run completed and every recorded result passed.
    pub fn all_passed(&self) -> bool {
        self.ran_successfully
            && self
                .test_results
                .iter()
                .all(|r| matches!(r, TestStatus::Passed))
    }

    /// Flat indices of failing tests (Failed or Exception), in order.
    pub fn failing_indices(&self) -> Vec<usize> {
        self.test_results
            .iter()
            .enumerate()
            .filter(|(_, r)| matches!(r, TestStatus::Failed | TestStatus::Exception))
            .map(|(i, _)| i)
            .collect()
    }
}

/// Per-student session snapshot accompanying a help request.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserData {
    /// The student's current code. Required; never empty-by-omission at call
    /// time.
    pub current_code: String,

    #[serde(default)]
    pub test_results: TestResults,

    /// Free-text memory entries written by prior tutoring turns, oldest-first.
    /// Only the most recent entries are surfaced to the model; the full
    /// history is retained by the caller.
    #[serde(default)]
    pub ai_remember_response: Vec<String>,
}

impl Default for TestStatus {
    fn default() -> Self {
        Self::NotRun
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tc(name: &str) -> TestCase {
        TestCase {
            test: name.into(),
            display: format!("{name}()"),
            magic_links: vec![],
        }
    }

    fn problem(visible: usize, hidden: usize) -> ProblemData {
        ProblemData {
            title: "Two Sum".into(),
            description: "Find two numbers that add to a target.".into(),
            solution: "secret".into(),
            code_lang: "javascript".into(),
            tests: (0..visible).map(|i| tc(&format!("v{i}"))).collect(),
            hidden_tests: (0..hidden).map(|i| tc(&format!("h{i}"))).collect(),
        }
    }

    #[test]
    fn index_split_round_trip() {
        let p = problem(3, 2);
        // Rendering uses test_case_at; re-deriving the flat index from the
        // slot must recover the same TestCase.
        for flat in 0..5 {
            let (slot, case) = p.test_case_at(flat).unwrap();
            let recovered = match slot {
                TestSlot::Visible(n) => n,
                TestSlot::Hidden(n) => p.tests.len() + n,
            };
            assert_eq!(recovered, flat);
            let direct = p.test_case_at(recovered).unwrap().1;
            assert_eq!(direct, case);
        }
        assert!(p.test_case_at(5).is_none());
    }

    #[test]
    fn boundary_index_is_first_hidden() {
        let p = problem(2, 1);
        let (slot, case) = p.test_case_at(2).unwrap();
        assert_eq!(slot, TestSlot::Hidden(0));
        assert_eq!(case.test, "h0");
    }

    #[test]
    fn all_passed_requires_successful_run() {
        let results = TestResults {
            ran_successfully: false,
            test_results: vec![TestStatus::Passed],
            ..Default::default()
        };
        assert!(!results.all_passed());

        let results = TestResults {
            ran_successfully: true,
            test_results: vec![TestStatus::Passed, TestStatus::Passed],
            ..Default::default()
        };
        assert!(results.all_passed());
    }

    #[test]
    fn failing_indices_include_exceptions() {
        let results = TestResults {
            ran_successfully: true,
            test_results: vec![
                TestStatus::Passed,
                TestStatus::Failed,
                TestStatus::Exception,
                TestStatus::NotRun,
            ],
            ..Default::default()
        };
        assert_eq!(results.failing_indices(), vec![1, 2]);
    }

    #[test]
    fn problem_data_deserializes_frontend_json() {
        let json = r#"{
            "title": "Two Sum",
            "description": "desc",
            "solution": "s",
            "codeLang": "python",
            "tests": [{"test": "t1", "display": "t1(1)", "magicLinks": [{"key": "a", "value": "1"}]}],
            "hiddenTests": []
        }"#;
        let p: ProblemData = serde_json::from_str(json).unwrap();
        assert_eq!(p.code_lang, "python");
        assert_eq!(p.tests[0].magic_links[0].key, "a");
        assert!(p.hidden_tests.is_empty());
    }
}
