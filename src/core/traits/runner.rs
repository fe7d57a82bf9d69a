use crate::core::{
    domain::{ExecutionResult, TestCase},
    errors::EngineError,
};

#[mockall::automock]
#[async_trait::async_trait]
pub trait CodeRunner: Send + Sync {
    /// Runs `source` and, when given, grades it against `test_cases`.
    ///
    /// Errors raised by the submission are part of the returned result. Only
    /// engine failures come back as `Err`.
    async fn execute_code(
        &self,
        source: &str,
        test_cases: Option<Vec<TestCase>>,
    ) -> Result<ExecutionResult, EngineError>;
}
