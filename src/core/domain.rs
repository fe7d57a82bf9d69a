use serde::Serialize;

use crate::constants::{
    INIT_FAILED_ERROR, INIT_FAILED_OUTPUT, NO_OUTPUT_SENTINEL, SOME_TESTS_FAILED,
};
use crate::core::errors::EngineError;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestCase {
    pub input: String,
    pub expected: String,
}

impl TestCase {
    pub fn new(input: impl Into<String>, expected: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            expected: expected.into(),
        }
    }
}

/// The only artifact handed back to callers of `execute_code`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ExecutionResult {
    pub passed: bool,
    pub output: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    pub fn success(stdout: String) -> Self {
        let output = if stdout.is_empty() {
            NO_OUTPUT_SENTINEL.to_string()
        } else {
            stdout
        };
        Self {
            passed: true,
            output,
            error: None,
        }
    }

    pub fn failure(output: String, error: impl Into<String>) -> Self {
        Self {
            passed: false,
            output,
            error: Some(error.into()),
        }
    }

    pub fn graded(output: String, all_passed: bool) -> Self {
        Self {
            passed: all_passed,
            output,
            error: (!all_passed).then(|| SOME_TESTS_FAILED.to_string()),
        }
    }

    pub fn timed_out(limit_ms: u128) -> Self {
        Self::failure(
            String::new(),
            format!(
                "TimeoutError: execution exceeded {limit_ms} ms; the interpreter was restarted"
            ),
        )
    }
}

/// Display fallback for callers that render an engine failure like any other result.
impl From<&EngineError> for ExecutionResult {
    fn from(err: &EngineError) -> Self {
        match err {
            EngineError::Initialization(_) => {
                Self::failure(INIT_FAILED_OUTPUT.to_string(), INIT_FAILED_ERROR)
            }
            other => Self::failure(String::new(), format!("Python execution failed: {other}")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum InterpreterState {
    Uninitialized,
    Initializing,
    Ready,
    Failed(String),
}

/// An error raised by user code, either at top level or inside the entry point.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ScriptError {
    /// Last traceback line, e.g. `ZeroDivisionError: division by zero`.
    pub summary: String,
    /// Full traceback text as the interpreter rendered it.
    pub details: String,
}

impl ScriptError {
    pub fn new(summary: impl Into<String>, details: impl Into<String>) -> Self {
        Self {
            summary: summary.into(),
            details: details.into(),
        }
    }

    /// Builds an error from a rendered traceback, taking its last non-empty line as summary.
    pub fn from_traceback(traceback: &str) -> Self {
        let details = traceback.trim().to_string();
        let summary = details
            .lines()
            .rev()
            .find(|line| !line.trim().is_empty())
            .unwrap_or_default()
            .trim()
            .to_string();
        Self { summary, details }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestOutcome {
    pub index: usize,
    pub input: String,
    pub expected: String,
    pub verdict: Verdict,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Verdict {
    Passed { actual: String },
    Failed { actual: String },
    Errored { message: String },
}

impl TestOutcome {
    pub fn passed(&self) -> bool {
        matches!(self.verdict, Verdict::Passed { .. })
    }

    pub fn report_line(&self) -> String {
        match &self.verdict {
            Verdict::Passed { actual } => {
                format!("✓ Test {}: PASSED ({} → {})", self.index, self.input, actual)
            }
            Verdict::Failed { actual } => format!(
                "✗ Test {}: FAILED ({} → {}, expected {})",
                self.index, self.input, actual, self.expected
            ),
            Verdict::Errored { message } => {
                format!("✗ Test {}: ERROR ({}) - {}", self.index, self.input, message)
            }
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestReport {
    pub outcomes: Vec<TestOutcome>,
    /// Placeholder cases dropped before grading.
    pub skipped: usize,
}

impl TestReport {
    /// True when nothing was gradable.
    pub fn is_empty(&self) -> bool {
        self.outcomes.is_empty()
    }

    pub fn all_passed(&self) -> bool {
        self.outcomes.iter().all(TestOutcome::passed)
    }

    pub fn render(&self) -> String {
        self.outcomes
            .iter()
            .map(|outcome| format!("{}\n", outcome.report_line()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::errors::{InitError, StreamRedirectionError};

    fn outcome(index: usize, verdict: Verdict) -> TestOutcome {
        TestOutcome {
            index,
            input: "21".to_string(),
            expected: "43".to_string(),
            verdict,
        }
    }

    #[test]
    fn test_report_lines() {
        let passed = outcome(
            1,
            Verdict::Passed {
                actual: "42".to_string(),
            },
        );
        let failed = outcome(
            2,
            Verdict::Failed {
                actual: "42".to_string(),
            },
        );
        let errored = outcome(
            3,
            Verdict::Errored {
                message: "ZeroDivisionError: division by zero".to_string(),
            },
        );

        assert_eq!(passed.report_line(), "✓ Test 1: PASSED (21 → 42)");
        assert_eq!(
            failed.report_line(),
            "✗ Test 2: FAILED (21 → 42, expected 43)"
        );
        assert_eq!(
            errored.report_line(),
            "✗ Test 3: ERROR (21) - ZeroDivisionError: division by zero"
        );
    }

    #[test]
    fn test_report_render_and_verdict() {
        let report = TestReport {
            outcomes: vec![
                outcome(
                    1,
                    Verdict::Passed {
                        actual: "42".to_string(),
                    },
                ),
                outcome(
                    2,
                    Verdict::Failed {
                        actual: "42".to_string(),
                    },
                ),
            ],
            skipped: 1,
        };

        assert!(!report.all_passed());
        assert!(!report.is_empty());
        assert_eq!(
            report.render(),
            "✓ Test 1: PASSED (21 → 42)\n✗ Test 2: FAILED (21 → 42, expected 43)\n"
        );
    }

    #[test]
    fn test_empty_report_passes_vacuously() {
        let report = TestReport::default();
        assert!(report.is_empty());
        assert!(report.all_passed());
        assert_eq!(report.render(), "");
    }

    #[test]
    fn test_script_error_from_traceback() {
        let err = ScriptError::from_traceback(
            "Traceback (most recent call last):\n  File \"<exec>\", line 1, in <module>\nZeroDivisionError: division by zero\n",
        );
        assert_eq!(err.summary, "ZeroDivisionError: division by zero");
        assert!(err.details.starts_with("Traceback"));
        assert!(!err.details.ends_with('\n'));
    }

    #[test]
    fn test_success_uses_sentinel_for_empty_output() {
        let result = ExecutionResult::success(String::new());
        assert!(result.passed);
        assert_eq!(result.output, "Code executed successfully (no output)");
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_engine_error_display_fallback() {
        let init = EngineError::Initialization(InitError::new("no runtime"));
        let result = ExecutionResult::from(&init);
        assert!(!result.passed);
        assert_eq!(result.output, "Python interpreter not available");
        assert_eq!(
            result.error.as_deref(),
            Some("Failed to initialize Python environment")
        );

        let stream = EngineError::StreamRedirection(StreamRedirectionError::NothingToRestore);
        let result = ExecutionResult::from(&stream);
        assert_eq!(result.output, "");
        assert!(
            result
                .error
                .unwrap()
                .starts_with("Python execution failed: ")
        );
    }

    #[test]
    fn test_result_json_omits_absent_error() {
        let json = serde_json::to_string(&ExecutionResult::success("hi\n".to_string())).unwrap();
        assert_eq!(json, r#"{"passed":true,"output":"hi\n"}"#);
    }
}
