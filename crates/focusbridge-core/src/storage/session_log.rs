//! File-backed session ledger.
//!
//! Keeps every session in a JSON array on disk. Used by the CLI when no
//! remote backend is configured; the file is rewritten after each mutation.

use std::path::{Path, PathBuf};

use async_trait::async_trait;

use crate::error::LedgerError;
use crate::sync::{MemoryLedger, NewSession, RemoteSession, SessionLedger, SessionStatus};

#[derive(Debug)]
pub struct JsonFileLedger {
    path: PathBuf,
    inner: MemoryLedger,
}

impl JsonFileLedger {
    /// Open the ledger at `path`. A missing file is an empty ledger.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, LedgerError> {
        let path = path.into();
        let sessions = Self::load(&path)?;
        tracing::debug!(path = %path.display(), sessions = sessions.len(), "opened session ledger");
        Ok(Self {
            path,
            inner: MemoryLedger::with_sessions(sessions),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn sessions(&self) -> Result<Vec<RemoteSession>, LedgerError> {
        self.inner.sessions()
    }

    fn load(path: &Path) -> Result<Vec<RemoteSession>, LedgerError> {
        if !path.exists() {
            return Ok(Vec::new());
        }
        let content = std::fs::read_to_string(path)?;
        if content.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&content)?)
    }

    /// Write `sessions` to disk. Called before the in-memory store is
    /// updated, so a failed write leaves both sides as they were.
    fn persist(&self, sessions: &[RemoteSession]) -> Result<(), LedgerError> {
        let data = serde_json::to_string_pretty(sessions)?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }
        std::fs::write(&self.path, data)?;
        Ok(())
    }

    fn settle_and_persist(
        &self,
        id: &str,
        status: SessionStatus,
        notes: Option<String>,
    ) -> Result<RemoteSession, LedgerError> {
        self.inner
            .settle_with(id, status, notes, |sessions| self.persist(sessions))
    }
}

#[async_trait]
impl SessionLedger for JsonFileLedger {
    async fn create_session(&self, payload: NewSession) -> Result<RemoteSession, LedgerError> {
        self.inner
            .insert_with(payload, |sessions| self.persist(sessions))
    }

    async fn complete_session(
        &self,
        id: &str,
        notes: Option<String>,
    ) -> Result<RemoteSession, LedgerError> {
        self.settle_and_persist(id, SessionStatus::Completed, notes)
    }

    async fn cancel_session(&self, id: &str) -> Result<RemoteSession, LedgerError> {
        self.settle_and_persist(id, SessionStatus::Cancelled, None)
    }

    async fn active_session(&self) -> Result<Option<RemoteSession>, LedgerError> {
        self.inner.active()
    }
}
