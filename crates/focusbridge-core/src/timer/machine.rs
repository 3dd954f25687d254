//! Focus state machine.
//!
//! Wraps the [`Countdown`] with phases, the bound task and the timer
//! settings. Every operation is synchronous and never suspends; remote I/O
//! happens elsewhere, driven by the events this machine publishes.
//!
//! ## Transitions
//!
//! ```text
//! Idle --start_work--> Working --countdown 0--> ShortBreak --countdown 0--> Idle
//!                         |                         |
//!                         +----skip / cancel--------+--------skip / cancel--> Idle
//! ```
//!
//! `reset` reloads the current phase's duration without changing phase.
//! `pause`/`resume` toggle the countdown without changing phase.
//!
//! ## Usage
//!
//! ```ignore
//! let mut machine = FocusMachine::new(TimerSettings::default());
//! let mut events = machine.subscribe();
//! machine.start_work(Some(task))?;
//! // Once per second:
//! machine.tick();
//! ```

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use super::countdown::Countdown;
use super::settings::{SettingsPatch, TimerSettings};
use super::ticker::{TickHandle, TickScope};
use crate::error::Rejection;
use crate::events::FocusEvent;
use crate::task::TaskRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Idle,
    Working,
    ShortBreak,
}

/// Read-only view of the machine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FocusState {
    pub phase: Phase,
    pub time_left_secs: u64,
    pub running: bool,
    pub completed_intervals: u32,
    pub active_task: Option<TaskRef>,
}

/// The focus state machine. Owns its state exclusively; other components
/// read snapshots and request transitions through the public operations.
#[derive(Debug)]
pub struct FocusMachine {
    settings: TimerSettings,
    phase: Phase,
    countdown: Countdown,
    completed_intervals: u32,
    active_task: Option<TaskRef>,
    ticks: TickScope,
    subscribers: Vec<mpsc::UnboundedSender<FocusEvent>>,
}

impl FocusMachine {
    /// Create an idle machine showing the full work duration.
    pub fn new(settings: TimerSettings) -> Self {
        let mut countdown = Countdown::default();
        countdown.arm(settings.work_duration_secs, false);
        Self {
            settings,
            phase: Phase::Idle,
            countdown,
            completed_intervals: 0,
            active_task: None,
            ticks: TickScope::default(),
            subscribers: Vec::new(),
        }
    }

    // ── Queries ──────────────────────────────────────────────────────

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn settings(&self) -> &TimerSettings {
        &self.settings
    }

    pub fn active_task(&self) -> Option<&TaskRef> {
        self.active_task.as_ref()
    }

    pub fn snapshot(&self) -> FocusState {
        FocusState {
            phase: self.phase,
            time_left_secs: self.countdown.time_left_secs(),
            running: self.countdown.is_running(),
            completed_intervals: self.completed_intervals,
            active_task: self.active_task.clone(),
        }
    }

    /// Register a subscriber. Every event published after this call is
    /// delivered in order; dropping the receiver unsubscribes.
    pub fn subscribe(&mut self) -> mpsc::UnboundedReceiver<FocusEvent> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.subscribers.push(tx);
        rx
    }

    // ── Commands ─────────────────────────────────────────────────────

    /// Begin a work interval, optionally bound to `task`.
    ///
    /// Rejected while already working. Starting from a break ends the break
    /// first.
    pub fn start_work(&mut self, task: Option<TaskRef>) -> Result<Vec<FocusEvent>, Rejection> {
        if self.phase == Phase::Working {
            return Err(Rejection::AlreadyWorking);
        }

        let mut events = Vec::new();
        if self.phase == Phase::ShortBreak {
            events.push(FocusEvent::Skipped {
                from: Phase::ShortBreak,
                at: Utc::now(),
            });
            self.go_idle();
        }

        self.phase = Phase::Working;
        self.countdown.arm(self.settings.work_duration_secs, true);
        self.active_task = task;
        events.push(FocusEvent::WorkStarted {
            time_left_secs: self.countdown.time_left_secs(),
            task: self.active_task.clone(),
            at: Utc::now(),
        });
        Ok(self.publish(events))
    }

    /// Start (or release a held) short break.
    pub fn start_break(&mut self) -> Result<Vec<FocusEvent>, Rejection> {
        match self.phase {
            Phase::Working => Err(Rejection::BreakDuringWork),
            Phase::ShortBreak if self.countdown.is_running() => Err(Rejection::AlreadyOnBreak),
            Phase::ShortBreak => {
                self.countdown.resume();
                let event = FocusEvent::BreakStarted {
                    time_left_secs: self.countdown.time_left_secs(),
                    running: true,
                    at: Utc::now(),
                };
                Ok(self.publish(vec![event]))
            }
            Phase::Idle => {
                self.phase = Phase::ShortBreak;
                self.countdown
                    .arm(self.settings.short_break_duration_secs, true);
                let event = FocusEvent::BreakStarted {
                    time_left_secs: self.countdown.time_left_secs(),
                    running: true,
                    at: Utc::now(),
                };
                Ok(self.publish(vec![event]))
            }
        }
    }

    /// Advance the countdown by one second, performing the automatic
    /// transition if the interval just ended.
    pub fn tick(&mut self) -> Vec<FocusEvent> {
        if self.phase == Phase::Idle || !self.countdown.tick() {
            return Vec::new();
        }
        let events = self.complete_interval();
        self.publish(events)
    }

    /// Issue a tick handle. Supersedes any handle issued before.
    pub fn schedule_ticks(&mut self) -> TickHandle {
        self.ticks.schedule()
    }

    /// Retire `handle`; ticks carrying it become no-ops.
    pub fn invalidate_ticks(&mut self, handle: TickHandle) -> bool {
        self.ticks.invalidate(handle)
    }

    /// Tick on behalf of a scheduled trigger. Ignored if `handle` is dead.
    pub fn tick_with(&mut self, handle: &TickHandle) -> Vec<FocusEvent> {
        if !self.ticks.is_live(handle) {
            tracing::trace!(generation = handle.generation(), "dropping tick from retired handle");
            return Vec::new();
        }
        self.tick()
    }

    /// Hold the countdown. Idempotent; a no-op when idle or at zero.
    pub fn pause(&mut self) -> Vec<FocusEvent> {
        if self.phase == Phase::Idle || !self.countdown.pause() {
            return Vec::new();
        }
        let event = FocusEvent::Paused {
            phase: self.phase,
            time_left_secs: self.countdown.time_left_secs(),
            at: Utc::now(),
        };
        self.publish(vec![event])
    }

    /// Release a held countdown. Idempotent while already running.
    pub fn resume(&mut self) -> Result<Vec<FocusEvent>, Rejection> {
        if self.phase == Phase::Idle {
            return Err(Rejection::NothingToResume);
        }
        if !self.countdown.resume() {
            return Ok(Vec::new());
        }
        let event = FocusEvent::Resumed {
            phase: self.phase,
            time_left_secs: self.countdown.time_left_secs(),
            task: self.active_task.clone(),
            at: Utc::now(),
        };
        Ok(self.publish(vec![event]))
    }

    /// Reload the current phase's full duration. A no-op when idle.
    pub fn reset(&mut self) -> Vec<FocusEvent> {
        let secs = match self.phase {
            Phase::Idle => return Vec::new(),
            Phase::Working => self.settings.work_duration_secs,
            Phase::ShortBreak => self.settings.short_break_duration_secs,
        };
        self.countdown.rearm(secs);
        let event = FocusEvent::Reset {
            phase: self.phase,
            time_left_secs: secs,
            running: self.countdown.is_running(),
            task: self.active_task.clone(),
            at: Utc::now(),
        };
        self.publish(vec![event])
    }

    /// Abandon the current interval and return to idle.
    pub fn skip(&mut self) -> Result<Vec<FocusEvent>, Rejection> {
        if self.phase == Phase::Idle {
            return Err(Rejection::NothingToSkip);
        }
        let event = FocusEvent::Skipped {
            from: self.phase,
            at: Utc::now(),
        };
        self.go_idle();
        Ok(self.publish(vec![event]))
    }

    /// Explicit user cancellation. Same transition as [`skip`](Self::skip)
    /// but reported as a cancellation.
    pub fn cancel(&mut self) -> Result<Vec<FocusEvent>, Rejection> {
        if self.phase == Phase::Idle {
            return Err(Rejection::NothingToCancel);
        }
        let event = FocusEvent::Cancelled {
            from: self.phase,
            at: Utc::now(),
        };
        self.go_idle();
        Ok(self.publish(vec![event]))
    }

    /// Replace the settings. An interval already in progress keeps its
    /// remaining time; an idle machine shows the new work duration.
    pub fn update_settings(&mut self, patch: &SettingsPatch) -> Result<Vec<FocusEvent>, Rejection> {
        let settings = self.settings.merged(patch)?;
        self.settings = settings;
        if self.phase == Phase::Idle {
            self.countdown.arm(settings.work_duration_secs, false);
        }
        let event = FocusEvent::SettingsUpdated {
            settings,
            at: Utc::now(),
        };
        Ok(self.publish(vec![event]))
    }

    /// Swap the bound task for a fresher copy of it. Used by reconciliation;
    /// does not start a new interval.
    pub fn rebind_task(&mut self, task: TaskRef) -> Result<Vec<FocusEvent>, Rejection> {
        match &self.active_task {
            None => Err(Rejection::NoActiveTask),
            Some(current) if *current == task => Ok(Vec::new()),
            Some(_) => {
                self.active_task = Some(task.clone());
                let event = FocusEvent::TaskRebound {
                    task,
                    at: Utc::now(),
                };
                Ok(self.publish(vec![event]))
            }
        }
    }

    // ── Internal ─────────────────────────────────────────────────────

    fn complete_interval(&mut self) -> Vec<FocusEvent> {
        match self.phase {
            Phase::Working => {
                self.completed_intervals += 1;
                let completed = FocusEvent::IntervalCompleted {
                    phase: Phase::Working,
                    completed_intervals: self.completed_intervals,
                    task: self.active_task.clone(),
                    at: Utc::now(),
                };
                self.phase = Phase::ShortBreak;
                self.countdown.arm(
                    self.settings.short_break_duration_secs,
                    self.settings.auto_start_breaks,
                );
                let started = FocusEvent::BreakStarted {
                    time_left_secs: self.countdown.time_left_secs(),
                    running: self.countdown.is_running(),
                    at: Utc::now(),
                };
                vec![completed, started]
            }
            Phase::ShortBreak => {
                let completed = FocusEvent::IntervalCompleted {
                    phase: Phase::ShortBreak,
                    completed_intervals: self.completed_intervals,
                    task: self.active_task.clone(),
                    at: Utc::now(),
                };
                self.go_idle();
                vec![completed]
            }
            Phase::Idle => Vec::new(),
        }
    }

    fn go_idle(&mut self) {
        self.phase = Phase::Idle;
        self.countdown.arm(self.settings.work_duration_secs, false);
        self.active_task = None;
    }

    fn publish(&mut self, events: Vec<FocusEvent>) -> Vec<FocusEvent> {
        for event in &events {
            tracing::debug!(?event, "focus transition");
        }
        self.subscribers.retain(|tx| {
            events
                .iter()
                .all(|event| tx.send(event.clone()).is_ok())
        });
        events
    }
}

impl Default for FocusMachine {
    fn default() -> Self {
        Self::new(TimerSettings::default())
    }
}
