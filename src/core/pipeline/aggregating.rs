use crate::{
    constants::{RESULTS_HEADING, RESULTS_SEPARATOR},
    core::domain::{ExecutionResult, TestReport},
};

/// Folds one capture window and its optional test report into the caller-facing result.
///
/// Anything written to stderr fails the run regardless of test outcomes. A
/// missing or empty report means there was nothing to grade.
pub fn aggregate(stdout: String, stderr: &str, report: Option<&TestReport>) -> ExecutionResult {
    let stderr = stderr.trim();
    if !stderr.is_empty() {
        return ExecutionResult::failure(stdout, stderr);
    }

    let Some(report) = report.filter(|report| !report.is_empty()) else {
        return ExecutionResult::success(stdout);
    };

    let mut output = stdout;
    if !output.is_empty() {
        output.push_str(RESULTS_SEPARATOR);
    }
    output.push_str(RESULTS_HEADING);
    output.push_str(&report.render());

    ExecutionResult::graded(output, report.all_passed())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::domain::{TestOutcome, Verdict};

    fn report(verdict: Verdict) -> TestReport {
        TestReport {
            outcomes: vec![TestOutcome {
                index: 1,
                input: "21".to_string(),
                expected: "42".to_string(),
                verdict,
            }],
            skipped: 0,
        }
    }

    fn passing() -> TestReport {
        report(Verdict::Passed {
            actual: "42".to_string(),
        })
    }

    #[test]
    fn test_plain_run() {
        let result = aggregate("hi\n".to_string(), "", None);
        assert_eq!(result, ExecutionResult::success("hi\n".to_string()));

        let result = aggregate(String::new(), "  \n", None);
        assert!(result.passed);
        assert_eq!(result.output, "Code executed successfully (no output)");
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_stderr_wins_over_tests() {
        let result = aggregate("out".to_string(), "warning: careful\n", Some(&passing()));
        assert!(!result.passed);
        assert_eq!(result.output, "out");
        assert_eq!(result.error.as_deref(), Some("warning: careful"));
    }

    #[test]
    fn test_report_appended_after_stdout() {
        let result = aggregate("debug\n".to_string(), "", Some(&passing()));
        assert!(result.passed);
        assert_eq!(
            result.output,
            "debug\n\n\n=== Test Results ===\n✓ Test 1: PASSED (21 → 42)\n"
        );
        assert_eq!(result.error, None);
    }

    #[test]
    fn test_report_without_stdout() {
        let failing = report(Verdict::Failed {
            actual: "41".to_string(),
        });
        let result = aggregate(String::new(), "", Some(&failing));
        assert!(!result.passed);
        assert_eq!(
            result.output,
            "=== Test Results ===\n✗ Test 1: FAILED (21 → 41, expected 42)\n"
        );
        assert_eq!(result.error.as_deref(), Some("Some tests failed"));
    }

    #[test]
    fn test_empty_report_is_plain_success() {
        let skipped_only = TestReport {
            outcomes: vec![],
            skipped: 3,
        };
        let result = aggregate("x".to_string(), "", Some(&skipped_only));
        assert_eq!(result, ExecutionResult::success("x".to_string()));
    }
}
