use crate::core::{
    domain::ScriptError,
    errors::{InitError, StreamRedirectionError},
    literal::Literal,
    pipeline::capture::CaptureSinks,
};

/// Result of calling the entry point with one test argument.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    /// Nothing callable is bound to the entry-point name.
    Missing,
    /// The call returned; holds the interpreter's string conversion of the value.
    Returned(String),
    Raised(ScriptError),
}

/// A live interpreter. Implementations are usually not `Send` and stay on the
/// thread that built them.
#[mockall::automock]
pub trait Interpreter {
    /// Replaces stdout/stderr with the given sinks, saving the current targets.
    fn install_sinks(&mut self, sinks: &CaptureSinks) -> Result<(), StreamRedirectionError>;

    /// Puts back the targets saved by the matching `install_sinks`.
    fn restore_streams(&mut self) -> Result<(), StreamRedirectionError>;

    /// Runs source text in the persistent top-level scope.
    fn run_source(&mut self, source: &str) -> Result<(), ScriptError>;

    fn invoke(&mut self, entry_point: &str, argument: &Literal) -> Invocation;
}

#[mockall::automock]
pub trait RuntimeFactory: Send + Sync {
    /// Constructs a fresh interpreter. Called on the thread that will own it.
    fn build(&self) -> Result<Box<dyn Interpreter>, InitError>;
}
