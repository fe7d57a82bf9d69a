use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::{errors::StreamRedirectionError, traits::interpreter::Interpreter};

/// In-memory text sink shared between the engine and an interpreter-side writer.
///
/// Once closed the buffer drops every further write, so a job nobody is
/// waiting for can no longer grow it.
#[derive(Clone, Debug, Default)]
pub struct CaptureBuffer {
    text: Arc<Mutex<String>>,
    closed: Arc<AtomicBool>,
}

impl CaptureBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_str(&self, text: &str) {
        if self.is_closed() {
            return;
        }
        self.lock().push_str(text);
    }

    pub fn close(&self) {
        self.closed.store(true, Ordering::Release);
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    pub fn contents(&self) -> String {
        self.lock().clone()
    }

    pub fn is_blank(&self) -> bool {
        self.lock().trim().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, String> {
        self.text.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

#[derive(Clone, Debug, Default)]
pub struct CaptureSinks {
    pub stdout: CaptureBuffer,
    pub stderr: CaptureBuffer,
}

impl CaptureSinks {
    /// Closes both streams. Used when the job they belong to is abandoned.
    pub fn close(&self) {
        self.stdout.close();
        self.stderr.close();
    }
}

#[derive(Debug)]
pub struct Captured<T> {
    pub value: T,
    pub stdout: String,
    pub stderr: String,
}

/// Runs `body` with the interpreter's stdout/stderr redirected into `sinks`.
///
/// The original streams are restored on every exit path, including a panic
/// unwinding out of `body`, which is resumed after restoration. If the sinks
/// cannot be installed `body` does not run.
#[tracing::instrument(skip_all)]
pub fn with_captured_output<I, T>(
    interpreter: &mut I,
    sinks: &CaptureSinks,
    body: impl FnOnce(&mut I, &CaptureSinks) -> T,
) -> Result<Captured<T>, StreamRedirectionError>
where
    I: Interpreter + ?Sized,
{
    interpreter.install_sinks(sinks)?;
    tracing::trace!("capture window opened");

    let outcome = panic::catch_unwind(AssertUnwindSafe(|| body(&mut *interpreter, sinks)));
    let restored = interpreter.restore_streams();
    tracing::trace!(restored = restored.is_ok(), "capture window closed");

    let value = match outcome {
        Ok(value) => value,
        Err(payload) => {
            if let Err(err) = &restored {
                tracing::error!(%err, "failed to restore streams while unwinding");
            }
            panic::resume_unwind(payload);
        }
    };
    restored?;

    Ok(Captured {
        value,
        stdout: sinks.stdout.contents(),
        stderr: sinks.stderr.contents(),
    })
}
