//! Remote session ledger boundary.
//!
//! The ledger is the authoritative store of session records. Transports
//! (HTTP, local file) implement [`SessionLedger`]; the bridge only ever talks
//! to the trait.

use std::sync::Mutex;

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use super::types::{NewSession, RemoteSession, SessionStatus};
use crate::error::LedgerError;

#[async_trait]
pub trait SessionLedger: Send + Sync {
    /// Create a session in the `active` state.
    async fn create_session(&self, payload: NewSession) -> Result<RemoteSession, LedgerError>;

    /// Mark a session completed, optionally attaching notes.
    async fn complete_session(
        &self,
        id: &str,
        notes: Option<String>,
    ) -> Result<RemoteSession, LedgerError>;

    /// Mark a session cancelled.
    async fn cancel_session(&self, id: &str) -> Result<RemoteSession, LedgerError>;

    /// The user's single active session, if any.
    async fn active_session(&self) -> Result<Option<RemoteSession>, LedgerError>;
}

/// Ledger kept entirely in memory.
///
/// Useful for embedding without a backend, and as the store behind the
/// file-backed ledger.
#[derive(Debug, Default)]
pub struct MemoryLedger {
    sessions: Mutex<Vec<RemoteSession>>,
}

impl MemoryLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_sessions(sessions: Vec<RemoteSession>) -> Self {
        Self {
            sessions: Mutex::new(sessions),
        }
    }

    /// Copy of every session, oldest first.
    pub fn sessions(&self) -> Result<Vec<RemoteSession>, LedgerError> {
        Ok(self.lock()?.clone())
    }

    pub fn insert(&self, payload: NewSession) -> Result<RemoteSession, LedgerError> {
        self.insert_with(payload, |_| Ok(()))
    }

    /// Insert a new active session, committing it only once `persist`
    /// accepts the resulting list.
    pub fn insert_with(
        &self,
        payload: NewSession,
        persist: impl FnOnce(&[RemoteSession]) -> Result<(), LedgerError>,
    ) -> Result<RemoteSession, LedgerError> {
        let now = Utc::now();
        let session = RemoteSession {
            id: Uuid::new_v4().to_string(),
            kind: payload.kind,
            target_duration_minutes: payload.target_duration_minutes,
            task_id: payload.task_id,
            class_id: payload.class_id,
            status: SessionStatus::Active,
            notes: None,
            created_at: now,
            updated_at: now,
        };
        self.update(persist, |sessions| {
            sessions.push(session.clone());
            Ok(session)
        })
    }

    /// Move an active session to `status`. Finished sessions are immutable.
    pub fn settle(
        &self,
        id: &str,
        status: SessionStatus,
        notes: Option<String>,
    ) -> Result<RemoteSession, LedgerError> {
        self.settle_with(id, status, notes, |_| Ok(()))
    }

    /// [`settle`](Self::settle), committed only once `persist` succeeds.
    pub fn settle_with(
        &self,
        id: &str,
        status: SessionStatus,
        notes: Option<String>,
        persist: impl FnOnce(&[RemoteSession]) -> Result<(), LedgerError>,
    ) -> Result<RemoteSession, LedgerError> {
        self.update(persist, |sessions| {
            let session = sessions
                .iter_mut()
                .find(|s| s.id == id)
                .ok_or_else(|| LedgerError::NotFound(id.to_string()))?;
            if !session.is_active() {
                return Err(LedgerError::Rejected(format!(
                    "session {id} is already {:?}",
                    session.status
                )));
            }
            session.status = status;
            if notes.is_some() {
                session.notes = notes;
            }
            session.updated_at = Utc::now();
            Ok(session.clone())
        })
    }

    pub fn active(&self) -> Result<Option<RemoteSession>, LedgerError> {
        Ok(self.lock()?.iter().find(|s| s.is_active()).cloned())
    }

    /// Apply `change` to a copy of the sessions, hand the copy to `persist`
    /// and swap it in only if both succeed. The store is untouched otherwise.
    fn update<R>(
        &self,
        persist: impl FnOnce(&[RemoteSession]) -> Result<(), LedgerError>,
        change: impl FnOnce(&mut Vec<RemoteSession>) -> Result<R, LedgerError>,
    ) -> Result<R, LedgerError> {
        let mut sessions = self.lock()?;
        let mut staged = sessions.clone();
        let result = change(&mut staged)?;
        persist(&staged)?;
        *sessions = staged;
        Ok(result)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Vec<RemoteSession>>, LedgerError> {
        self.sessions
            .lock()
            .map_err(|_| LedgerError::Storage("session store lock poisoned".into()))
    }
}

#[async_trait]
impl SessionLedger for MemoryLedger {
    async fn create_session(&self, payload: NewSession) -> Result<RemoteSession, LedgerError> {
        self.insert(payload)
    }

    async fn complete_session(
        &self,
        id: &str,
        notes: Option<String>,
    ) -> Result<RemoteSession, LedgerError> {
        self.settle(id, SessionStatus::Completed, notes)
    }

    async fn cancel_session(&self, id: &str) -> Result<RemoteSession, LedgerError> {
        self.settle(id, SessionStatus::Cancelled, None)
    }

    async fn active_session(&self) -> Result<Option<RemoteSession>, LedgerError> {
        self.active()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn session_lifecycle() {
        let ledger = MemoryLedger::new();
        let created = ledger
            .create_session(NewSession::focus(1500, None))
            .await
            .unwrap();
        assert!(created.is_active());
        assert_eq!(
            ledger.active_session().await.unwrap().map(|s| s.id),
            Some(created.id.clone())
        );

        let done = ledger
            .complete_session(&created.id, Some("Essay".into()))
            .await
            .unwrap();
        assert_eq!(done.status, SessionStatus::Completed);
        assert_eq!(done.notes.as_deref(), Some("Essay"));
        assert!(ledger.active_session().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn finished_sessions_cannot_be_settled_again() {
        let ledger = MemoryLedger::new();
        let created = ledger
            .create_session(NewSession::focus(60, None))
            .await
            .unwrap();
        ledger.cancel_session(&created.id).await.unwrap();
        assert!(matches!(
            ledger.complete_session(&created.id, None).await,
            Err(LedgerError::Rejected(_))
        ));
    }

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let ledger = MemoryLedger::new();
        assert_eq!(
            ledger.cancel_session("nope").await,
            Err(LedgerError::NotFound("nope".into()))
        );
    }

    #[test]
    fn failed_persist_leaves_store_untouched() {
        let ledger = MemoryLedger::new();
        let refuse = |_: &[RemoteSession]| Err(LedgerError::Storage("disk full".into()));

        assert!(ledger
            .insert_with(NewSession::focus(60, None), refuse)
            .is_err());
        assert!(ledger.sessions().unwrap().is_empty());

        let created = ledger.insert(NewSession::focus(60, None)).unwrap();
        assert!(ledger
            .settle_with(&created.id, SessionStatus::Completed, None, refuse)
            .is_err());
        assert_eq!(ledger.active().unwrap().map(|s| s.id), Some(created.id));
    }
}
