use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread;

use tokio::sync::{mpsc, oneshot};

use crate::{
    constants::WORKER_THREAD_NAME,
    core::{
        domain::{ExecutionResult, TestCase},
        errors::{EngineError, InitError, StreamRedirectionError},
        pipeline::{capture::CaptureSinks, executing::execute_submission},
        traits::interpreter::RuntimeFactory,
    },
};

pub type JobReply = Result<ExecutionResult, StreamRedirectionError>;

struct Job {
    source: String,
    cases: Vec<TestCase>,
    sinks: CaptureSinks,
    span: tracing::Span,
    reply: oneshot::Sender<JobReply>,
}

/// Handle to the thread that owns the interpreter. Jobs run one at a time in
/// submission order. Dropping the handle lets the thread exit once its current
/// job is done.
#[derive(Debug)]
pub struct Worker {
    jobs: mpsc::UnboundedSender<Job>,
}

impl Worker {
    /// Spawns the worker thread and waits until it has built its interpreter.
    pub async fn start(
        factory: Arc<dyn RuntimeFactory>,
        entry_point: String,
        stack_size: usize,
    ) -> Result<Self, InitError> {
        let (ready_tx, ready_rx) = oneshot::channel();
        let (jobs_tx, jobs_rx) = mpsc::unbounded_channel();

        thread::Builder::new()
            .name(WORKER_THREAD_NAME.to_string())
            .stack_size(stack_size)
            .spawn(move || serve(factory, entry_point, ready_tx, jobs_rx))
            .map_err(|err| InitError::new(format!("failed to spawn interpreter thread: {err}")))?;

        match ready_rx.await {
            Ok(Ok(())) => Ok(Self { jobs: jobs_tx }),
            Ok(Err(err)) => Err(err),
            Err(_) => Err(InitError::new(
                "interpreter thread exited during initialization",
            )),
        }
    }

    /// Queues a submission whose output goes to `sinks`. The receiver resolves
    /// when the worker is done with it and errors if the worker dies first.
    pub fn submit(
        &self,
        source: String,
        cases: Vec<TestCase>,
        sinks: CaptureSinks,
    ) -> Result<oneshot::Receiver<JobReply>, EngineError> {
        let (reply, receiver) = oneshot::channel();
        let job = Job {
            source,
            cases,
            sinks,
            span: tracing::Span::current(),
            reply,
        };
        self.jobs.send(job).map_err(|_| EngineError::WorkerLost)?;
        Ok(receiver)
    }
}

fn serve(
    factory: Arc<dyn RuntimeFactory>,
    entry_point: String,
    ready: oneshot::Sender<Result<(), InitError>>,
    mut jobs: mpsc::UnboundedReceiver<Job>,
) {
    let built = panic::catch_unwind(AssertUnwindSafe(|| factory.build()));
    let mut interpreter = match built {
        Ok(Ok(interpreter)) => interpreter,
        Ok(Err(err)) => {
            let _ = ready.send(Err(err));
            return;
        }
        Err(payload) => {
            let msg = format!(
                "interpreter construction panicked: {}",
                panic_message(&*payload)
            );
            let _ = ready.send(Err(InitError::new(msg)));
            return;
        }
    };

    if ready.send(Ok(())).is_err() {
        tracing::debug!("nobody waited for the interpreter, worker exiting");
        return;
    }

    while let Some(job) = jobs.blocking_recv() {
        let _entered = job.span.enter();
        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            execute_submission(
                interpreter.as_mut(),
                &job.sinks,
                &entry_point,
                &job.source,
                &job.cases,
            )
        }));

        match outcome {
            Ok(result) => {
                if job.reply.send(result).is_err() {
                    tracing::debug!("caller went away before the result was ready");
                }
            }
            Err(payload) => {
                tracing::error!(
                    panic = %panic_message(&*payload),
                    "interpreter panicked, worker exiting"
                );
                return;
            }
        }
    }

    tracing::debug!("job channel closed, worker exiting");
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::traits::interpreter::{
        Interpreter, MockInterpreter, MockRuntimeFactory,
    };

    const STACK: usize = 2 * 1024 * 1024;

    fn quiet_interpreter() -> MockInterpreter {
        let mut interpreter = MockInterpreter::new();
        interpreter.expect_install_sinks().returning(|_| Ok(()));
        interpreter.expect_restore_streams().returning(|| Ok(()));
        interpreter.expect_run_source().returning(|_| Ok(()));
        interpreter
    }

    fn factory_with(build: fn() -> MockInterpreter) -> Arc<dyn RuntimeFactory> {
        let mut factory = MockRuntimeFactory::new();
        factory
            .expect_build()
            .returning(move || Ok(Box::new(build()) as Box<dyn Interpreter>));
        Arc::new(factory)
    }

    #[tokio::test]
    async fn test_runs_submitted_jobs() {
        let worker = Worker::start(factory_with(quiet_interpreter), "solution".to_string(), STACK)
            .await
            .unwrap();

        let reply = worker
            .submit("pass".to_string(), vec![], CaptureSinks::default())
            .unwrap();
        let result = reply.await.unwrap().unwrap();

        assert_eq!(result, ExecutionResult::success(String::new()));
    }

    #[tokio::test]
    async fn test_factory_error_is_reported() {
        let mut factory = MockRuntimeFactory::new();
        factory
            .expect_build()
            .returning(|| Err(InitError::new("no stdlib")));

        let err = Worker::start(Arc::new(factory), "solution".to_string(), STACK)
            .await
            .unwrap_err();

        assert_eq!(err, InitError::new("no stdlib"));
    }

    #[tokio::test]
    async fn test_factory_panic_is_reported() {
        let mut factory = MockRuntimeFactory::new();
        factory
            .expect_build()
            .returning(|| panic!("vm exploded"));

        let err = Worker::start(Arc::new(factory), "solution".to_string(), STACK)
            .await
            .unwrap_err();

        assert!(err.msg.contains("vm exploded"));
    }

    #[tokio::test]
    async fn test_interpreter_panic_drops_reply() {
        fn panicking() -> MockInterpreter {
            let mut interpreter = MockInterpreter::new();
            interpreter.expect_install_sinks().returning(|_| Ok(()));
            interpreter.expect_restore_streams().returning(|| Ok(()));
            interpreter
                .expect_run_source()
                .returning(|_| panic!("internal interpreter bug"));
            interpreter
        }
        let worker = Worker::start(factory_with(panicking), "solution".to_string(), STACK)
            .await
            .unwrap();

        let reply = worker
            .submit("boom".to_string(), vec![], CaptureSinks::default())
            .unwrap();

        assert!(reply.await.is_err());
    }
}
