//! Active-task reconciliation against the task registry.
//!
//! The focus state machine holds a *copy* of the task it is working on.
//! Whenever the registry snapshot changes, that copy may be stale in one of
//! two ways:
//!
//! - it still carries a provisional id, and the registry now has the
//!   confirmed entry under a permanent id (remap by title);
//! - it carries a permanent id, and the registry has a newer progress count
//!   for it (refresh from the registry).
//!
//! ## Usage
//! ```rust,ignore
//! let reconciler = TaskReconciler::new();
//! let outcome = reconciler.reconcile(state.active_task.as_ref(), &registry.snapshot());
//! if let Some(task) = outcome.replacement() {
//!     machine.rebind_task(task.clone())?;
//! }
//! ```
//!
//! Reconciliation never mutates the registry, and running it twice on the
//! same snapshot yields the same result as running it once.

use serde::{Deserialize, Serialize};

use super::{TaskRecord, TaskRef};

/// Result of reconciling one active task against one registry snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The active task is already up to date.
    Unchanged,
    /// A provisional id was replaced by the confirmed permanent entry.
    Remapped { from_id: String, task: TaskRef },
    /// The registry holds a different progress count for the same id.
    Refreshed { task: TaskRef },
    /// A provisional task has no confirmed counterpart yet. Retry on the
    /// next snapshot.
    Miss { provisional_id: String },
}

impl ReconcileOutcome {
    /// The task that should replace the active one, if any.
    pub fn replacement(&self) -> Option<&TaskRef> {
        match self {
            ReconcileOutcome::Remapped { task, .. } | ReconcileOutcome::Refreshed { task } => {
                Some(task)
            }
            ReconcileOutcome::Unchanged | ReconcileOutcome::Miss { .. } => None,
        }
    }

    pub fn is_change(&self) -> bool {
        self.replacement().is_some()
    }
}

/// Reconcile `active` against `snapshot`.
///
/// Pure function; the caller applies any replacement.
pub fn reconcile(active: &TaskRef, snapshot: &[TaskRecord]) -> ReconcileOutcome {
    if active.is_provisional() {
        return match snapshot
            .iter()
            .find(|record| !record.is_provisional() && record.title == active.title)
        {
            Some(record) => ReconcileOutcome::Remapped {
                from_id: active.id.clone(),
                task: TaskRef {
                    title: active.title.clone(),
                    ..TaskRef::from(record)
                },
            },
            None => ReconcileOutcome::Miss {
                provisional_id: active.id.clone(),
            },
        };
    }

    match snapshot.iter().find(|record| record.id == active.id) {
        Some(record) if record.completed_intervals != active.completed_intervals => {
            ReconcileOutcome::Refreshed {
                task: TaskRef::from(record),
            }
        }
        _ => ReconcileOutcome::Unchanged,
    }
}

/// Summary counters across every reconciliation pass an observer has run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconciliationSummary {
    pub passes: u64,
    pub remapped: u64,
    pub refreshed: u64,
    pub misses: u64,
}

/// Observer wrapper around [`reconcile`] that logs outcomes and keeps
/// running counters.
#[derive(Debug, Clone, Default)]
pub struct TaskReconciler {
    summary: ReconciliationSummary,
}

impl TaskReconciler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(&self) -> &ReconciliationSummary {
        &self.summary
    }

    /// Run one pass. `None` for `active` (no task bound) is always `Unchanged`.
    pub fn reconcile(
        &mut self,
        active: Option<&TaskRef>,
        snapshot: &[TaskRecord],
    ) -> ReconcileOutcome {
        let Some(active) = active else {
            return ReconcileOutcome::Unchanged;
        };

        self.summary.passes += 1;
        let outcome = reconcile(active, snapshot);
        match &outcome {
            ReconcileOutcome::Remapped { from_id, task } => {
                self.summary.remapped += 1;
                tracing::info!(from = %from_id, to = %task.id, "active task remapped to permanent id");
            }
            ReconcileOutcome::Refreshed { task } => {
                self.summary.refreshed += 1;
                tracing::debug!(
                    task_id = %task.id,
                    completed = task.completed_intervals,
                    "active task progress refreshed"
                );
            }
            ReconcileOutcome::Miss { provisional_id } => {
                self.summary.misses += 1;
                tracing::debug!(task_id = %provisional_id, "no confirmed task yet for provisional id");
            }
            ReconcileOutcome::Unchanged => {}
        }
        outcome
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn snapshot() -> Vec<TaskRecord> {
        vec![
            TaskRecord::new("real_7", "Reading").with_completed(2),
            TaskRecord::new("real_42", "Essay").with_class("class-1"),
        ]
    }

    #[test]
    fn provisional_task_is_remapped_by_title() {
        let active = TaskRef::new("temp_1", "Essay");
        let outcome = reconcile(&active, &snapshot());
        match outcome {
            ReconcileOutcome::Remapped { from_id, task } => {
                assert_eq!(from_id, "temp_1");
                assert_eq!(task.id, "real_42");
                assert_eq!(task.title, "Essay");
                assert_eq!(task.class_id.as_deref(), Some("class-1"));
            }
            other => panic!("expected remap, got {other:?}"),
        }
    }

    #[test]
    fn provisional_entries_in_registry_are_not_remap_targets() {
        let active = TaskRef::new("temp_1", "Essay");
        let records = vec![TaskRecord::new("temp_2", "Essay")];
        assert_eq!(
            reconcile(&active, &records),
            ReconcileOutcome::Miss {
                provisional_id: "temp_1".into()
            }
        );
    }

    #[test]
    fn miss_leaves_task_untouched() {
        let active = TaskRef::new("temp_1", "Unknown");
        let outcome = reconcile(&active, &snapshot());
        assert!(outcome.replacement().is_none());
    }

    #[test]
    fn permanent_task_refreshes_progress() {
        let active = TaskRef::new("real_7", "Reading");
        match reconcile(&active, &snapshot()) {
            ReconcileOutcome::Refreshed { task } => assert_eq!(task.completed_intervals, 2),
            other => panic!("expected refresh, got {other:?}"),
        }
    }

    #[test]
    fn permanent_task_with_same_progress_is_unchanged() {
        let mut active = TaskRef::new("real_7", "Reading");
        active.completed_intervals = 2;
        assert_eq!(reconcile(&active, &snapshot()), ReconcileOutcome::Unchanged);
    }

    #[test]
    fn permanent_task_missing_from_registry_is_unchanged() {
        let active = TaskRef::new("real_99", "Gone");
        assert_eq!(reconcile(&active, &snapshot()), ReconcileOutcome::Unchanged);
    }

    #[test]
    fn reconciler_counts_outcomes() {
        let mut reconciler = TaskReconciler::new();
        let records = snapshot();
        reconciler.reconcile(Some(&TaskRef::new("temp_1", "Essay")), &records);
        reconciler.reconcile(Some(&TaskRef::new("temp_2", "Nope")), &records);
        reconciler.reconcile(Some(&TaskRef::new("real_7", "Reading")), &records);
        reconciler.reconcile(None, &records);

        let summary = reconciler.summary();
        assert_eq!(summary.passes, 3);
        assert_eq!(summary.remapped, 1);
        assert_eq!(summary.misses, 1);
        assert_eq!(summary.refreshed, 1);
    }

    fn arb_active() -> impl Strategy<Value = TaskRef> {
        (
            prop_oneof![Just("temp_"), Just("real_")],
            0usize..6,
            prop_oneof![Just("Essay"), Just("Reading"), Just("Math")],
            0u32..4,
        )
            .prop_map(|(prefix, n, title, done)| {
                TaskRef::from(TaskRecord::new(format!("{prefix}{n}"), title).with_completed(done))
            })
    }

    // Registry ids are unique, so they are derived from the position.
    fn arb_snapshot() -> impl Strategy<Value = Vec<TaskRecord>> {
        proptest::collection::vec(
            (
                any::<bool>(),
                prop_oneof![Just("Essay"), Just("Reading"), Just("Math")],
                0u32..4,
            ),
            0..6,
        )
        .prop_map(|entries| {
            entries
                .into_iter()
                .enumerate()
                .map(|(i, (provisional, title, done))| {
                    let prefix = if provisional { "temp_" } else { "real_" };
                    TaskRecord::new(format!("{prefix}{i}"), title).with_completed(done)
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn reconciliation_is_idempotent(
            active in arb_active(),
            records in arb_snapshot(),
        ) {
            let once = match reconcile(&active, &records).replacement() {
                Some(task) => task.clone(),
                None => active.clone(),
            };
            let twice = match reconcile(&once, &records).replacement() {
                Some(task) => task.clone(),
                None => once.clone(),
            };
            prop_assert_eq!(once, twice);
        }
    }
}
