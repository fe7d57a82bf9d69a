use crate::{
    constants::{MISSING_ENTRY_POINT, PLACEHOLDER_SENTINELS},
    core::{
        domain::{TestCase, TestOutcome, TestReport, Verdict},
        literal::parse_literal,
        traits::interpreter::{Interpreter, Invocation},
    },
};

/// A case generated from a template rather than a real example.
pub fn is_placeholder(case: &TestCase) -> bool {
    PLACEHOLDER_SENTINELS
        .iter()
        .any(|sentinel| case.input.contains(sentinel) || case.expected.contains(sentinel))
}

/// Calls the entry point once per gradable case and compares the results.
///
/// Placeholder cases are dropped and do not get a number. An error raised by
/// one invocation only fails that case.
#[tracing::instrument(skip(interpreter, cases), fields(cases = cases.len()))]
pub fn run_test_cases<I>(interpreter: &mut I, cases: &[TestCase], entry_point: &str) -> TestReport
where
    I: Interpreter + ?Sized,
{
    let (gradable, placeholders): (Vec<&TestCase>, Vec<&TestCase>) =
        cases.iter().partition(|case| !is_placeholder(case));
    if !placeholders.is_empty() {
        tracing::debug!(skipped = placeholders.len(), "skipping placeholder cases");
    }

    let outcomes = gradable
        .into_iter()
        .enumerate()
        .map(|(position, case)| grade_case(&mut *interpreter, position + 1, case, entry_point))
        .collect();

    TestReport {
        outcomes,
        skipped: placeholders.len(),
    }
}

fn grade_case<I>(interpreter: &mut I, index: usize, case: &TestCase, entry_point: &str) -> TestOutcome
where
    I: Interpreter + ?Sized,
{
    let argument = parse_literal(&case.input);
    let verdict = match interpreter.invoke(entry_point, &argument) {
        Invocation::Missing => compare(MISSING_ENTRY_POINT.to_string(), &case.expected),
        Invocation::Returned(actual) => compare(actual, &case.expected),
        Invocation::Raised(err) => {
            tracing::debug!(index, error = %err.summary, "entry point raised");
            Verdict::Errored {
                message: err.summary,
            }
        }
    };

    TestOutcome {
        index,
        input: case.input.clone(),
        expected: case.expected.clone(),
        verdict,
    }
}

fn compare(actual: String, expected: &str) -> Verdict {
    if actual == expected {
        Verdict::Passed { actual }
    } else {
        Verdict::Failed { actual }
    }
}
