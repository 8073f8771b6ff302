use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::watch;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::config::RunConfig;
use crate::errors::RunError;

use super::host::RunHost;
use super::run::{run_worker, WorkerInput};
use super::types::{RunState, SourceBuffer};

struct ActiveRun {
    id: String,
    cancel: Arc<watch::Sender<bool>>,
}

type ActiveSlot = Arc<Mutex<Option<ActiveRun>>>;

/// Releases the runner's busy slot when the worker is done with it, even if
/// the worker task panics.
pub(crate) struct SlotGuard {
    slot: ActiveSlot,
    id: String,
}

impl Drop for SlotGuard {
    fn drop(&mut self) {
        let mut active = self.slot.lock().unwrap_or_else(PoisonError::into_inner);
        if active.as_ref().is_some_and(|a| a.id == self.id) {
            *active = None;
        }
    }
}

/// Starts run sessions, one at a time. A start while a session is active is
/// rejected with [`RunError::Busy`].
#[derive(Clone)]
pub struct Runner {
    cfg: Arc<RunConfig>,
    active: ActiveSlot,
}

impl Runner {
    pub fn new(cfg: RunConfig) -> Self {
        Self {
            cfg: Arc::new(cfg),
            active: Arc::new(Mutex::new(None)),
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.cfg
    }

    pub fn is_busy(&self) -> bool {
        self.lock_active().is_some()
    }

    /// Snapshots `source` into a scratch file and executes it on a tokio task.
    ///
    /// Returns immediately. Spawn and I/O failures are delivered through
    /// `host.on_run_complete`; only `Busy` is returned here. Must be called
    /// from within a tokio runtime.
    pub fn start(
        &self,
        source: SourceBuffer,
        host: Arc<dyn RunHost>,
    ) -> Result<RunSession, RunError> {
        let session_id = Uuid::new_v4().to_string();
        let (cancel_tx, cancel_rx) = watch::channel(false);
        let cancel = Arc::new(cancel_tx);

        {
            let mut active = self.lock_active();
            if let Some(current) = active.as_ref() {
                tracing::warn!(
                    target: "runpad.runner",
                    active = %current.id,
                    "run rejected, another session is active"
                );
                return Err(RunError::Busy {
                    active: current.id.clone(),
                });
            }
            *active = Some(ActiveRun {
                id: session_id.clone(),
                cancel: cancel.clone(),
            });
        }

        tracing::info!(
            target: "runpad.runner",
            session_id = %session_id,
            interpreter = %self.cfg.interpreter,
            source_bytes = source.as_str().len(),
            "run started"
        );

        let (state_tx, state_rx) = watch::channel(RunState::Idle);
        let input = WorkerInput {
            session_id: session_id.clone(),
            source,
            cfg: self.cfg.clone(),
            host,
            state_tx,
            cancel_rx,
            slot: SlotGuard {
                slot: self.active.clone(),
                id: session_id.clone(),
            },
        };
        let join = tokio::spawn(run_worker(input));

        Ok(RunSession {
            id: session_id,
            state_rx,
            cancel,
            join,
        })
    }

    /// Stops the active session, if any. Returns whether one was signalled.
    pub fn stop_active(&self) -> bool {
        match self.lock_active().as_ref() {
            Some(active) => {
                tracing::info!(target: "runpad.runner", session_id = %active.id, "stop requested");
                active.cancel.send_replace(true);
                true
            }
            None => false,
        }
    }

    fn lock_active(&self) -> std::sync::MutexGuard<'_, Option<ActiveRun>> {
        self.active.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Handle to one run. Dropping it does not stop the run.
pub struct RunSession {
    id: String,
    state_rx: watch::Receiver<RunState>,
    cancel: Arc<watch::Sender<bool>>,
    join: JoinHandle<()>,
}

impl RunSession {
    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn state(&self) -> RunState {
        *self.state_rx.borrow()
    }

    /// A receiver that observes every state transition.
    pub fn state_changes(&self) -> watch::Receiver<RunState> {
        self.state_rx.clone()
    }

    /// Asks the worker to kill the child and end the session as `Stopped`.
    pub fn stop(&self) {
        self.cancel.send_replace(true);
    }

    pub fn is_finished(&self) -> bool {
        self.join.is_finished()
    }

    /// Waits for the worker to finish and returns the terminal state.
    pub async fn wait(self) -> RunState {
        if let Err(e) = self.join.await {
            tracing::error!(target: "runpad.runner", session_id = %self.id, error = %e, "run worker panicked");
            return RunState::Failed;
        }
        *self.state_rx.borrow()
    }
}

impl std::fmt::Debug for RunSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunSession")
            .field("id", &self.id)
            .field("state", &self.state())
            .finish()
    }
}
