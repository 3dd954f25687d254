//! In-process task registry.
//!
//! Holds the authoritative task list as a `watch` snapshot. Whoever owns the
//! registry (the task-list collaborator) mutates it; the focus runtime only
//! subscribes and reads.

use std::future::Future;
use std::sync::Arc;

use tokio::sync::watch;

use super::optimistic::{Optimistic, OptimisticError};
use super::{new_provisional_id, TaskRecord};

/// Shared handle to the task registry. Cloning is cheap and every clone
/// observes the same snapshot.
#[derive(Debug, Clone)]
pub struct TaskRegistry {
    tx: Arc<watch::Sender<Vec<TaskRecord>>>,
}

impl Default for TaskRegistry {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TaskRegistry {
    pub fn new(records: Vec<TaskRecord>) -> Self {
        let (tx, _rx) = watch::channel(records);
        Self { tx: Arc::new(tx) }
    }

    // ── Queries ──────────────────────────────────────────────────────

    /// Copy of the current snapshot.
    pub fn snapshot(&self) -> Vec<TaskRecord> {
        self.tx.borrow().clone()
    }

    pub fn get(&self, id: &str) -> Option<TaskRecord> {
        self.tx.borrow().iter().find(|t| t.id == id).cloned()
    }

    pub fn len(&self) -> usize {
        self.tx.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.tx.borrow().is_empty()
    }

    /// Receiver notified every time the snapshot changes.
    pub fn subscribe(&self) -> watch::Receiver<Vec<TaskRecord>> {
        self.tx.subscribe()
    }

    // ── Mutations ────────────────────────────────────────────────────

    /// Replace the whole snapshot (a periodic refresh from the backend).
    pub fn replace_all(&self, records: Vec<TaskRecord>) {
        self.tx.send_replace(records);
    }

    /// Add a task under a fresh provisional id.
    pub fn create_provisional(
        &self,
        title: impl Into<String>,
        class_id: Option<String>,
    ) -> TaskRecord {
        let record = TaskRecord {
            id: new_provisional_id(),
            title: title.into(),
            completed_intervals: 0,
            class_id,
        };
        let inserted = record.clone();
        self.tx.send_modify(|tasks| tasks.push(inserted));
        record
    }

    /// Swap a provisional id for the permanent one assigned by the backend.
    ///
    /// Returns the updated record, or `None` if no task has that id.
    pub fn confirm(&self, provisional_id: &str, permanent_id: &str) -> Option<TaskRecord> {
        let mut confirmed = None;
        self.tx.send_if_modified(|tasks| {
            match tasks.iter_mut().find(|t| t.id == provisional_id) {
                Some(task) => {
                    task.id = permanent_id.to_string();
                    confirmed = Some(task.clone());
                    true
                }
                None => false,
            }
        });
        confirmed
    }

    /// Bump the completed-interval count of a task.
    ///
    /// Called by the owner of the focus loop when a work interval completes
    /// with this task bound. Returns the new count.
    pub fn increment_progress(&self, id: &str) -> Option<u32> {
        let mut updated = None;
        self.tx.send_if_modified(|tasks| {
            match tasks.iter_mut().find(|t| t.id == id) {
                Some(task) => {
                    task.completed_intervals = task.completed_intervals.saturating_add(1);
                    updated = Some(task.completed_intervals);
                    true
                }
                None => false,
            }
        });
        updated
    }

    /// Apply `mutation` immediately, then await `remote`. If `remote` fails
    /// the snapshot is restored to what it was before the mutation.
    pub async fn apply_optimistic<T, E, Fut>(
        &self,
        mutation: impl FnOnce(&mut Vec<TaskRecord>),
        remote: Fut,
    ) -> Result<T, OptimisticError<E>>
    where
        Fut: Future<Output = Result<T, E>>,
        E: std::error::Error + 'static,
    {
        let mut pending = None;
        self.tx
            .send_modify(|tasks| pending = Some(Optimistic::apply(tasks, mutation)));

        match remote.await {
            Ok(value) => {
                if let Some(pending) = pending {
                    pending.commit();
                }
                Ok(value)
            }
            Err(err) => {
                if let Some(pending) = pending {
                    self.tx.send_modify(|tasks| pending.rollback(tasks));
                }
                tracing::warn!(error = %err, "optimistic task change rolled back");
                Err(OptimisticError::RolledBack(err))
            }
        }
    }

    /// Create a task optimistically under a provisional id and confirm it
    /// with the id returned by `remote`. On failure the provisional entry is
    /// removed again.
    pub async fn create_with<E, F, Fut>(
        &self,
        title: impl Into<String>,
        class_id: Option<String>,
        remote: F,
    ) -> Result<TaskRecord, OptimisticError<E>>
    where
        F: FnOnce(TaskRecord) -> Fut,
        Fut: Future<Output = Result<String, E>>,
        E: std::error::Error + 'static,
    {
        let record = TaskRecord {
            id: new_provisional_id(),
            title: title.into(),
            completed_intervals: 0,
            class_id,
        };
        let inserted = record.clone();
        let provisional_id = record.id.clone();
        let title = record.title.clone();

        let permanent_id = self
            .apply_optimistic(move |tasks| tasks.push(inserted), remote(record))
            .await?;

        // The provisional entry may have been replaced by a refresh while the
        // remote call was in flight.
        Ok(self
            .confirm(&provisional_id, &permanent_id)
            .unwrap_or_else(|| TaskRecord::new(permanent_id, title)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LedgerError;

    #[test]
    fn provisional_task_is_confirmed_in_place() {
        let registry = TaskRegistry::default();
        let task = registry.create_provisional("Essay", Some("class-1".into()));
        assert!(task.is_provisional());

        let confirmed = registry.confirm(&task.id, "real_42").unwrap();
        assert_eq!(confirmed.id, "real_42");
        assert_eq!(confirmed.title, "Essay");
        assert_eq!(registry.len(), 1);
        assert!(registry.get(&task.id).is_none());
    }

    #[test]
    fn confirm_unknown_id_is_none() {
        let registry = TaskRegistry::default();
        assert!(registry.confirm("temp_x", "real_1").is_none());
    }

    #[test]
    fn increment_progress_updates_count() {
        let registry = TaskRegistry::new(vec![TaskRecord::new("real_1", "Essay")]);
        assert_eq!(registry.increment_progress("real_1"), Some(1));
        assert_eq!(registry.increment_progress("real_1"), Some(2));
        assert_eq!(registry.increment_progress("missing"), None);
        assert_eq!(registry.get("real_1").unwrap().completed_intervals, 2);
    }

    #[tokio::test]
    async fn subscribers_see_changes() {
        let registry = TaskRegistry::default();
        let mut rx = registry.subscribe();
        registry.replace_all(vec![TaskRecord::new("real_1", "Essay")]);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow().len(), 1);
    }

    #[tokio::test]
    async fn failed_remote_rolls_back_mutation() {
        let registry = TaskRegistry::new(vec![TaskRecord::new("real_1", "Essay")]);
        let result: Result<(), _> = registry
            .apply_optimistic(
                |tasks| tasks.clear(),
                async { Err(LedgerError::Transport("offline".into())) },
            )
            .await;

        assert!(matches!(
            result,
            Err(OptimisticError::RolledBack(LedgerError::Transport(_)))
        ));
        assert_eq!(registry.snapshot(), vec![TaskRecord::new("real_1", "Essay")]);
    }

    #[tokio::test]
    async fn create_with_confirms_permanent_id() {
        let registry = TaskRegistry::default();
        let created = registry
            .create_with("Essay", None, |_| async {
                Ok::<_, LedgerError>("real_42".to_string())
            })
            .await
            .unwrap();
        assert_eq!(created.id, "real_42");
        assert_eq!(registry.snapshot(), vec![TaskRecord::new("real_42", "Essay")]);
    }

    #[tokio::test]
    async fn create_with_failure_removes_provisional_entry() {
        let registry = TaskRegistry::default();
        let result = registry
            .create_with("Essay", None, |_| async {
                Err::<String, _>(LedgerError::Rejected("validation".into()))
            })
            .await;
        assert!(result.is_err());
        assert!(registry.is_empty());
    }
}
