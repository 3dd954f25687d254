//! Async owner of the focus machine.
//!
//! One tokio task owns the [`FocusMachine`]. A one-second interval is the
//! only thing that advances the countdown, commands arrive over an mpsc
//! channel and are answered over oneshot channels, and registry changes are
//! reconciled inside the same loop. The session bridge runs as a separate
//! task on the machine's event subscription, so ledger round-trips never
//! hold up a tick.
//!
//! ```ignore
//! let mut handle = FocusRuntime::new(settings)
//!     .with_registry(registry.clone())
//!     .with_bridge(SessionBridge::new(ledger))
//!     .spawn();
//! let mut notices = handle.take_notices();
//! handle.start_work(Some(task)).await?;
//! ```

use std::time::Duration;

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant};

use crate::error::{CoreError, Rejection, RuntimeError};
use crate::events::FocusEvent;
use crate::sync::{SessionBridge, SyncGuard, SyncNotice};
use crate::task::{TaskRecord, TaskReconciler, TaskRef, TaskRegistry};
use crate::timer::{FocusMachine, FocusState, Phase, SettingsPatch, TimerSettings};

const TICK_PERIOD: Duration = Duration::from_secs(1);
const COMMAND_BUFFER: usize = 32;

/// A state-changing request for the machine.
#[derive(Debug, Clone)]
enum Op {
    StartWork(Option<TaskRef>),
    StartBreak,
    Pause,
    Resume,
    Reset,
    Skip,
    Cancel,
    UpdateSettings(SettingsPatch),
}

impl Op {
    /// Operations after which the next tick should be a full period away.
    fn restarts_countdown(&self) -> bool {
        matches!(self, Op::StartWork(_) | Op::StartBreak | Op::Resume | Op::Reset)
    }
}

enum Command {
    Apply {
        op: Op,
        reply: oneshot::Sender<Result<FocusState, Rejection>>,
    },
    Subscribe {
        reply: oneshot::Sender<mpsc::UnboundedReceiver<FocusEvent>>,
    },
    Shutdown,
}

/// Builder for a running focus loop.
pub struct FocusRuntime {
    machine: FocusMachine,
    registry: Option<TaskRegistry>,
    bridge: Option<SessionBridge>,
}

impl FocusRuntime {
    pub fn new(settings: TimerSettings) -> Self {
        Self {
            machine: FocusMachine::new(settings),
            registry: None,
            bridge: None,
        }
    }

    /// Observe `registry` for reconciliation and report finished work
    /// intervals to it.
    pub fn with_registry(mut self, registry: TaskRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Mirror work intervals into a session ledger.
    pub fn with_bridge(mut self, bridge: SessionBridge) -> Self {
        self.bridge = Some(bridge);
        self
    }

    /// Start the loop (and the bridge, if any) on the current tokio runtime.
    pub fn spawn(self) -> FocusHandle {
        let FocusRuntime {
            mut machine,
            registry,
            bridge,
        } = self;

        let (notices, bridge_task) = match bridge {
            Some(bridge) => {
                let events = machine.subscribe();
                let (tx, rx) = mpsc::unbounded_channel();
                (Some(rx), Some(tokio::spawn(bridge.run(events, Some(tx)))))
            }
            None => (None, None),
        };

        let (commands_tx, commands_rx) = mpsc::channel(COMMAND_BUFFER);
        let (state_tx, state_rx) = watch::channel(machine.snapshot());

        let driver = Driver {
            machine,
            registry,
            reconciler: TaskReconciler::new(),
            state: state_tx,
        };
        let loop_task = tokio::spawn(driver.run(commands_rx));

        FocusHandle {
            commands: commands_tx,
            state: state_rx,
            notices,
            loop_task,
            bridge_task,
        }
    }
}

/// Caller side of a spawned [`FocusRuntime`].
pub struct FocusHandle {
    commands: mpsc::Sender<Command>,
    state: watch::Receiver<FocusState>,
    notices: Option<mpsc::UnboundedReceiver<SyncNotice>>,
    loop_task: JoinHandle<()>,
    bridge_task: Option<JoinHandle<SyncGuard>>,
}

impl FocusHandle {
    // ── Commands ─────────────────────────────────────────────────────

    pub async fn start_work(&self, task: Option<TaskRef>) -> Result<FocusState, CoreError> {
        self.apply(Op::StartWork(task)).await
    }

    pub async fn start_break(&self) -> Result<FocusState, CoreError> {
        self.apply(Op::StartBreak).await
    }

    pub async fn pause(&self) -> Result<FocusState, CoreError> {
        self.apply(Op::Pause).await
    }

    pub async fn resume(&self) -> Result<FocusState, CoreError> {
        self.apply(Op::Resume).await
    }

    pub async fn reset(&self) -> Result<FocusState, CoreError> {
        self.apply(Op::Reset).await
    }

    pub async fn skip(&self) -> Result<FocusState, CoreError> {
        self.apply(Op::Skip).await
    }

    pub async fn cancel(&self) -> Result<FocusState, CoreError> {
        self.apply(Op::Cancel).await
    }

    pub async fn update_settings(&self, patch: SettingsPatch) -> Result<FocusState, CoreError> {
        self.apply(Op::UpdateSettings(patch)).await
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Latest published state.
    pub fn snapshot(&self) -> FocusState {
        self.state.borrow().clone()
    }

    pub fn watch_state(&self) -> watch::Receiver<FocusState> {
        self.state.clone()
    }

    /// Receive every machine event published from now on.
    pub async fn subscribe(&self) -> Result<mpsc::UnboundedReceiver<FocusEvent>, RuntimeError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Subscribe { reply })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        rx.await.map_err(|_| RuntimeError::Stopped)
    }

    /// Bridge notices. Available once, and only when a bridge was attached.
    pub fn take_notices(&mut self) -> Option<mpsc::UnboundedReceiver<SyncNotice>> {
        self.notices.take()
    }

    /// Stop the loop and wait for the bridge to drain the remaining events.
    ///
    /// Returns the bridge's final guard when a bridge was attached.
    pub async fn shutdown(self) -> Result<Option<SyncGuard>, RuntimeError> {
        // The loop may already be gone; joining below still works.
        let _ = self.commands.send(Command::Shutdown).await;
        drop(self.commands);

        self.loop_task
            .await
            .map_err(|e| RuntimeError::Join(e.to_string()))?;

        match self.bridge_task {
            Some(task) => task
                .await
                .map(Some)
                .map_err(|e| RuntimeError::Join(e.to_string())),
            None => Ok(None),
        }
    }

    async fn apply(&self, op: Op) -> Result<FocusState, CoreError> {
        let (reply, rx) = oneshot::channel();
        self.commands
            .send(Command::Apply { op, reply })
            .await
            .map_err(|_| RuntimeError::Stopped)?;
        let outcome = rx.await.map_err(|_| RuntimeError::Stopped)?;
        Ok(outcome?)
    }
}

/// State owned by the loop task.
struct Driver {
    machine: FocusMachine,
    registry: Option<TaskRegistry>,
    reconciler: TaskReconciler,
    state: watch::Sender<FocusState>,
}

impl Driver {
    async fn run(mut self, mut commands: mpsc::Receiver<Command>) {
        let mut ticker = time::interval_at(Instant::now() + TICK_PERIOD, TICK_PERIOD);
        let ticks = self.machine.schedule_ticks();
        let mut tasks = self.registry.as_ref().map(TaskRegistry::subscribe);

        tracing::debug!(generation = ticks.generation(), "focus loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    let events = self.machine.tick_with(&ticks);
                    self.after_events(&events);
                }
                command = commands.recv() => {
                    match command {
                        None | Some(Command::Shutdown) => break,
                        Some(Command::Subscribe { reply }) => {
                            let _ = reply.send(self.machine.subscribe());
                        }
                        Some(Command::Apply { op, reply }) => {
                            let restarts = op.restarts_countdown();
                            let outcome = self.apply(op);
                            if outcome.is_ok() && restarts {
                                ticker.reset();
                            }
                            // Callers read the watch right after the reply.
                            self.publish_state();
                            let _ = reply.send(outcome);
                        }
                    }
                }
                changed = registry_changed(&mut tasks) => {
                    match changed {
                        Some(snapshot) => self.reconcile(&snapshot),
                        None => tasks = None,
                    }
                }
            }
            self.publish_state();
        }

        self.machine.invalidate_ticks(ticks);
        tracing::debug!(summary = ?self.reconciler.summary(), "focus loop stopped");
    }

    fn apply(&mut self, op: Op) -> Result<FocusState, Rejection> {
        let binds_task = matches!(op, Op::StartWork(Some(_)));
        let events = match op {
            Op::StartWork(task) => self.machine.start_work(task)?,
            Op::StartBreak => self.machine.start_break()?,
            Op::Pause => self.machine.pause(),
            Op::Resume => self.machine.resume()?,
            Op::Reset => self.machine.reset(),
            Op::Skip => self.machine.skip()?,
            Op::Cancel => self.machine.cancel()?,
            Op::UpdateSettings(patch) => self.machine.update_settings(&patch)?,
        };
        self.after_events(&events);

        // A task may have been confirmed before this interval started.
        if binds_task {
            if let Some(snapshot) = self.registry.as_ref().map(TaskRegistry::snapshot) {
                self.reconcile(&snapshot);
            }
        }
        Ok(self.machine.snapshot())
    }

    /// Credit finished work intervals to their task.
    fn after_events(&self, events: &[FocusEvent]) {
        let Some(registry) = &self.registry else {
            return;
        };
        for event in events {
            if let FocusEvent::IntervalCompleted {
                phase: Phase::Working,
                task: Some(task),
                ..
            } = event
            {
                if task.is_provisional() {
                    tracing::debug!(task_id = %task.id, "not crediting unconfirmed task");
                    continue;
                }
                match registry.increment_progress(&task.id) {
                    Some(count) => tracing::info!(task_id = %task.id, count, "task progress recorded"),
                    None => tracing::warn!(task_id = %task.id, "finished task is missing from registry"),
                }
            }
        }
    }

    fn reconcile(&mut self, snapshot: &[TaskRecord]) {
        let outcome = self
            .reconciler
            .reconcile(self.machine.active_task(), snapshot);
        if let Some(task) = outcome.replacement() {
            if let Err(rejection) = self.machine.rebind_task(task.clone()) {
                tracing::debug!(%rejection, "reconciled task could not be rebound");
            }
        }
    }

    fn publish_state(&self) {
        let snapshot = self.machine.snapshot();
        self.state.send_if_modified(|current| {
            if *current == snapshot {
                false
            } else {
                *current = snapshot;
                true
            }
        });
    }
}

/// Wait for the next registry snapshot. Pending forever without a registry;
/// `None` once the registry side is gone.
async fn registry_changed(
    tasks: &mut Option<watch::Receiver<Vec<TaskRecord>>>,
) -> Option<Vec<TaskRecord>> {
    match tasks {
        Some(rx) => match rx.changed().await {
            Ok(()) => Some(rx.borrow_and_update().clone()),
            Err(_) => None,
        },
        None => std::future::pending().await,
    }
}
