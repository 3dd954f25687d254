//! Task references bound to focus intervals, the task registry they are
//! drawn from, and the reconciliation that keeps the two in step.
//!
//! A task may be created locally before the backend has assigned it a
//! permanent identifier. Such tasks carry a *provisional* id with the
//! [`PROVISIONAL_PREFIX`] prefix until the registry swaps it out.

mod optimistic;
mod reconciliation;
mod registry;

pub use optimistic::{Optimistic, OptimisticError};
pub use reconciliation::{reconcile, ReconcileOutcome, ReconciliationSummary, TaskReconciler};
pub use registry::TaskRegistry;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix marking a client-assigned id that the backend has not confirmed.
pub const PROVISIONAL_PREFIX: &str = "temp_";

/// Whether `id` is a provisional (client-assigned) identifier.
pub fn is_provisional(id: &str) -> bool {
    id.starts_with(PROVISIONAL_PREFIX)
}

/// Generate a fresh provisional identifier.
pub fn new_provisional_id() -> String {
    format!("{PROVISIONAL_PREFIX}{}", Uuid::new_v4().simple())
}

/// One entry of a task registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed_intervals: u32,
    #[serde(default)]
    pub class_id: Option<String>,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed_intervals: 0,
            class_id: None,
        }
    }

    pub fn with_class(mut self, class_id: impl Into<String>) -> Self {
        self.class_id = Some(class_id.into());
        self
    }

    pub fn with_completed(mut self, completed_intervals: u32) -> Self {
        self.completed_intervals = completed_intervals;
        self
    }

    pub fn is_provisional(&self) -> bool {
        is_provisional(&self.id)
    }
}

/// The task bound to the focus state machine.
///
/// This is a copy of a registry entry taken at bind time, not a live alias;
/// reconciliation replaces it wholesale when the registry moves on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRef {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub completed_intervals: u32,
    #[serde(default)]
    pub class_id: Option<String>,
}

impl TaskRef {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            completed_intervals: 0,
            class_id: None,
        }
    }

    pub fn is_provisional(&self) -> bool {
        is_provisional(&self.id)
    }
}

impl From<&TaskRecord> for TaskRef {
    fn from(record: &TaskRecord) -> Self {
        Self {
            id: record.id.clone(),
            title: record.title.clone(),
            completed_intervals: record.completed_intervals,
            class_id: record.class_id.clone(),
        }
    }
}

impl From<TaskRecord> for TaskRef {
    fn from(record: TaskRecord) -> Self {
        Self {
            id: record.id,
            title: record.title,
            completed_intervals: record.completed_intervals,
            class_id: record.class_id,
        }
    }
}
