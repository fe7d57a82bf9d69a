pub const DEFAULT_ENTRY_POINT: &str = "solution";

/// Substrings marking a generated, non-committal test case that must not be graded.
pub const PLACEHOLDER_SENTINELS: [&str; 5] = [
    "basic input",
    "test case",
    "sample input",
    "expected output",
    "expected result",
];

pub const MISSING_ENTRY_POINT: &str = "No solution function found";
pub const RESULTS_HEADING: &str = "=== Test Results ===\n";
pub const RESULTS_SEPARATOR: &str = "\n\n";
pub const NO_OUTPUT_SENTINEL: &str = "Code executed successfully (no output)";
pub const SOME_TESTS_FAILED: &str = "Some tests failed";

pub const INIT_FAILED_OUTPUT: &str = "Python interpreter not available";
pub const INIT_FAILED_ERROR: &str = "Failed to initialize Python environment";

pub const WORKER_THREAD_NAME: &str = "interpreter-worker";
