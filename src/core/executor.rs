use std::sync::Arc;

use tokio::sync::watch;
use tracing::Instrument;
use uuid::Uuid;

use crate::{
    config::EngineSettings,
    core::{
        domain::{ExecutionResult, InterpreterState, TestCase},
        errors::{EngineError, InitError},
        lifecycle::InterpreterManager,
        traits::{interpreter::RuntimeFactory, runner::CodeRunner},
    },
    python::runtime::PythonRuntimeFactory,
};

/// Async entry point of the engine, backed by the embedded Python interpreter.
pub struct CodeExecutor {
    manager: InterpreterManager,
}

impl CodeExecutor {
    pub fn new(settings: EngineSettings) -> Self {
        let factory = PythonRuntimeFactory::new(settings.stdlib_paths.clone());
        Self::with_factory(Arc::new(factory), settings)
    }

    pub fn with_factory(factory: Arc<dyn RuntimeFactory>, settings: EngineSettings) -> Self {
        Self {
            manager: InterpreterManager::new(factory, settings),
        }
    }

    pub fn state(&self) -> InterpreterState {
        self.manager.state()
    }

    pub fn subscribe(&self) -> watch::Receiver<InterpreterState> {
        self.manager.subscribe()
    }

    /// Builds the interpreter ahead of the first submission.
    pub async fn ensure_ready(&self) -> Result<(), InitError> {
        self.manager.ensure_ready().await
    }
}

#[async_trait::async_trait]
impl CodeRunner for CodeExecutor {
    async fn execute_code(
        &self,
        source: &str,
        test_cases: Option<Vec<TestCase>>,
    ) -> Result<ExecutionResult, EngineError> {
        let execution_id = Uuid::new_v4();
        let span = tracing::info_span!("execute_code", %execution_id);

        async move {
            let cases = test_cases.unwrap_or_default();
            tracing::info!(
                source_bytes = source.len(),
                cases = cases.len(),
                entry_point = %self.manager.settings().entry_point,
                "execution requested"
            );

            let result = self.manager.execute(source.to_string(), cases).await;
            match &result {
                Ok(result) => tracing::info!(passed = result.passed, "execution finished"),
                Err(err) => tracing::error!(%err, "execution failed"),
            }
            result
        }
        .instrument(span)
        .await
    }
}
