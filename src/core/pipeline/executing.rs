use crate::core::{
    domain::{ExecutionResult, ScriptError, TestCase, TestReport},
    errors::StreamRedirectionError,
    pipeline::{
        aggregating::aggregate,
        capture::{CaptureSinks, with_captured_output},
        testing::run_test_cases,
    },
    traits::interpreter::Interpreter,
};

/// Runs one submission inside a capture window over `sinks` and grades it.
///
/// A top-level error in the submission short-circuits grading and yields an
/// empty output with the full traceback as the error. Only a failure to
/// redirect or restore the streams is returned as `Err`.
#[tracing::instrument(skip_all, fields(cases = cases.len()))]
pub fn execute_submission<I>(
    interpreter: &mut I,
    sinks: &CaptureSinks,
    entry_point: &str,
    source: &str,
    cases: &[TestCase],
) -> Result<ExecutionResult, StreamRedirectionError>
where
    I: Interpreter + ?Sized,
{
    let captured = with_captured_output(
        interpreter,
        sinks,
        |interpreter, sinks| -> Result<Option<TestReport>, ScriptError> {
            interpreter.run_source(source)?;
            if cases.is_empty() {
                return Ok(None);
            }
            if !sinks.stderr.is_blank() {
                tracing::debug!("submission wrote to stderr, skipping test cases");
                return Ok(None);
            }
            Ok(Some(run_test_cases(interpreter, cases, entry_point)))
        },
    )?;

    match captured.value {
        Ok(report) => Ok(aggregate(
            captured.stdout,
            &captured.stderr,
            report.as_ref(),
        )),
        Err(err) => {
            tracing::debug!(error = %err.summary, "submission raised at top level");
            Ok(ExecutionResult::failure(String::new(), err.details))
        }
    }
}
