/// The interpreter could not be constructed. Sticky for the rest of the process.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("interpreter initialization failed: {msg}")]
pub struct InitError {
    pub msg: String,
}

impl InitError {
    pub fn new(msg: impl Into<String>) -> Self {
        Self { msg: msg.into() }
    }
}

/// Installing or restoring the capture sinks failed; the interpreter can no longer be trusted.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamRedirectionError {
    #[error("failed to install capture sinks: {msg}")]
    Install { msg: String },
    #[error("failed to restore original streams: {msg}")]
    Restore { msg: String },
    #[error("no saved streams to restore")]
    NothingToRestore,
}

/// Failures escalated to callers instead of being folded into an `ExecutionResult`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EngineError {
    #[error(transparent)]
    Initialization(#[from] InitError),
    #[error(transparent)]
    StreamRedirection(#[from] StreamRedirectionError),
    #[error("interpreter worker terminated unexpectedly")]
    WorkerLost,
}
