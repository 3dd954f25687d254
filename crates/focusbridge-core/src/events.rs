use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::task::TaskRef;
use crate::timer::{Phase, TimerSettings};

/// Every transition of the focus machine produces one or more events.
/// Subscribers (the session bridge, the CLI printer) receive them in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FocusEvent {
    WorkStarted {
        time_left_secs: u64,
        task: Option<TaskRef>,
        at: DateTime<Utc>,
    },
    BreakStarted {
        time_left_secs: u64,
        running: bool,
        at: DateTime<Utc>,
    },
    /// A countdown reached zero on its own.
    IntervalCompleted {
        phase: Phase,
        completed_intervals: u32,
        task: Option<TaskRef>,
        at: DateTime<Utc>,
    },
    Paused {
        phase: Phase,
        time_left_secs: u64,
        at: DateTime<Utc>,
    },
    Resumed {
        phase: Phase,
        time_left_secs: u64,
        task: Option<TaskRef>,
        at: DateTime<Utc>,
    },
    Reset {
        phase: Phase,
        time_left_secs: u64,
        running: bool,
        task: Option<TaskRef>,
        at: DateTime<Utc>,
    },
    Skipped {
        from: Phase,
        at: DateTime<Utc>,
    },
    Cancelled {
        from: Phase,
        at: DateTime<Utc>,
    },
    TaskRebound {
        task: TaskRef,
        at: DateTime<Utc>,
    },
    SettingsUpdated {
        settings: TimerSettings,
        at: DateTime<Utc>,
    },
}

/// How a work interval ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkEnd {
    /// The countdown reached zero.
    Completed,
    /// The user skipped or cancelled it.
    Cancelled,
}

impl FocusEvent {
    /// If this event leaves the machine working with the countdown running,
    /// the remaining seconds and the bound task.
    pub fn running_work(&self) -> Option<(u64, Option<&TaskRef>)> {
        match self {
            FocusEvent::WorkStarted {
                time_left_secs,
                task,
                ..
            }
            | FocusEvent::Resumed {
                phase: Phase::Working,
                time_left_secs,
                task,
                ..
            }
            | FocusEvent::Reset {
                phase: Phase::Working,
                running: true,
                time_left_secs,
                task,
                ..
            } => Some((*time_left_secs, task.as_ref())),
            _ => None,
        }
    }

    /// If this event ends a work interval, how it ended.
    pub fn work_end(&self) -> Option<WorkEnd> {
        match self {
            FocusEvent::IntervalCompleted {
                phase: Phase::Working,
                ..
            } => Some(WorkEnd::Completed),
            FocusEvent::Skipped {
                from: Phase::Working,
                ..
            }
            | FocusEvent::Cancelled {
                from: Phase::Working,
                ..
            } => Some(WorkEnd::Cancelled),
            _ => None,
        }
    }
}
