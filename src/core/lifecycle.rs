use std::sync::Arc;

use tokio::sync::{Mutex, watch};

use crate::{
    config::EngineSettings,
    core::{
        domain::{ExecutionResult, InterpreterState, TestCase},
        errors::{EngineError, InitError},
        pipeline::capture::CaptureSinks,
        traits::interpreter::RuntimeFactory,
        worker::Worker,
    },
};

enum Slot {
    Vacant,
    Ready(Worker),
    /// Sticky until the process restarts.
    Failed(InitError),
}

/// Closes a job's sinks when the call that submitted it returns or is dropped.
/// A job left running on a discarded worker then stops accumulating output.
struct CloseOnDrop(CaptureSinks);

impl Drop for CloseOnDrop {
    fn drop(&mut self) {
        self.0.close();
    }
}

/// Holds the state at `Initializing` and puts it back to `Uninitialized` if
/// the caller is cancelled before the build settles.
struct PendingInit<'a> {
    state: &'a watch::Sender<InterpreterState>,
    settled: bool,
}

impl<'a> PendingInit<'a> {
    fn begin(state: &'a watch::Sender<InterpreterState>) -> Self {
        state.send_replace(InterpreterState::Initializing);
        Self {
            state,
            settled: false,
        }
    }

    fn settle(mut self, state: InterpreterState) {
        self.settled = true;
        self.state.send_replace(state);
    }
}

impl Drop for PendingInit<'_> {
    fn drop(&mut self) {
        if !self.settled {
            tracing::warn!("interpreter initialization cancelled");
            self.state.send_replace(InterpreterState::Uninitialized);
        }
    }
}

/// Owns the single interpreter worker.
///
/// Every caller goes through one FIFO mutex, which gives single-flight
/// initialization and one execution at a time. A worker that timed out or
/// broke is discarded and rebuilt on the next call.
pub struct InterpreterManager {
    slot: Mutex<Slot>,
    state: watch::Sender<InterpreterState>,
    factory: Arc<dyn RuntimeFactory>,
    settings: EngineSettings,
}

impl InterpreterManager {
    pub fn new(factory: Arc<dyn RuntimeFactory>, settings: EngineSettings) -> Self {
        let (state, _) = watch::channel(InterpreterState::Uninitialized);
        Self {
            slot: Mutex::new(Slot::Vacant),
            state,
            factory,
            settings,
        }
    }

    pub fn state(&self) -> InterpreterState {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<InterpreterState> {
        self.state.subscribe()
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    #[tracing::instrument(skip(self))]
    pub async fn ensure_ready(&self) -> Result<(), InitError> {
        let mut slot = self.slot.lock().await;
        self.ready_worker(&mut slot).await.map(|_| ())
    }

    #[tracing::instrument(skip_all, fields(cases = cases.len()))]
    pub async fn execute(
        &self,
        source: String,
        cases: Vec<TestCase>,
    ) -> Result<ExecutionResult, EngineError> {
        let mut slot = self.slot.lock().await;
        let worker = self.ready_worker(&mut slot).await?;
        let sinks = CaptureSinks::default();
        let _close_sinks = CloseOnDrop(sinks.clone());
        let reply = match worker.submit(source, cases, sinks.clone()) {
            Ok(reply) => reply,
            Err(err) => {
                tracing::error!(%err, "interpreter worker is gone");
                self.discard(&mut slot);
                return Err(err);
            }
        };

        let received = match self.settings.time_limit {
            Some(limit) => match tokio::time::timeout(limit, reply).await {
                Ok(received) => received,
                Err(_) => {
                    let limit_ms = limit.as_millis();
                    tracing::warn!(limit_ms, "execution timed out, discarding interpreter");
                    sinks.close();
                    self.discard(&mut slot);
                    return Ok(ExecutionResult::timed_out(limit_ms));
                }
            },
            None => reply.await,
        };

        match received {
            Ok(Ok(result)) => Ok(result),
            Ok(Err(err)) => {
                tracing::error!(%err, "stream redirection failed, discarding interpreter");
                self.discard(&mut slot);
                Err(err.into())
            }
            Err(_) => {
                tracing::error!("interpreter worker died mid-execution");
                self.discard(&mut slot);
                Err(EngineError::WorkerLost)
            }
        }
    }

    /// Builds the worker if the slot is vacant.
    ///
    /// A cancelled caller leaves the slot vacant and the state `Uninitialized`.
    /// Its builder thread still runs to completion and exits once it finds
    /// nobody waiting, so it can overlap with the next caller's build.
    async fn ready_worker<'s>(&self, slot: &'s mut Slot) -> Result<&'s Worker, InitError> {
        if matches!(slot, Slot::Vacant) {
            let pending = PendingInit::begin(&self.state);
            tracing::info!("initializing interpreter");

            let started = Worker::start(
                self.factory.clone(),
                self.settings.entry_point.clone(),
                self.settings.worker_stack_size,
            )
            .await;

            *slot = match started {
                Ok(worker) => {
                    tracing::info!("interpreter ready");
                    pending.settle(InterpreterState::Ready);
                    Slot::Ready(worker)
                }
                Err(err) => {
                    tracing::error!(%err, "interpreter initialization failed");
                    pending.settle(InterpreterState::Failed(err.msg.clone()));
                    Slot::Failed(err)
                }
            };
        }

        match slot {
            Slot::Ready(worker) => Ok(&*worker),
            Slot::Failed(err) => Err(err.clone()),
            Slot::Vacant => Err(InitError::new("interpreter slot is empty")),
        }
    }

    fn discard(&self, slot: &mut Slot) {
        *slot = Slot::Vacant;
        self.set_state(InterpreterState::Uninitialized);
    }

    fn set_state(&self, state: InterpreterState) {
        self.state.send_replace(state);
    }
}
