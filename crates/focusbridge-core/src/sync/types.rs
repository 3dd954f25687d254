//! Core types for session synchronization.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::LedgerError;
use crate::task::TaskRef;

/// Kind of interval a remote session mirrors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SessionKind {
    Focus,
    ShortBreak,
    LongBreak,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SessionStatus {
    Active,
    Completed,
    Cancelled,
}

/// A session record as held by the remote ledger.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemoteSession {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub target_duration_minutes: u64,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
    pub status: SessionStatus,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl RemoteSession {
    pub fn is_active(&self) -> bool {
        self.status == SessionStatus::Active
    }
}

/// Payload for creating a session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewSession {
    #[serde(rename = "type")]
    pub kind: SessionKind,
    pub target_duration_minutes: u64,
    #[serde(default)]
    pub task_id: Option<String>,
    #[serde(default)]
    pub class_id: Option<String>,
}

impl NewSession {
    /// Focus session for a work interval with `time_left_secs` remaining.
    /// The target is rounded up to whole minutes.
    pub fn focus(time_left_secs: u64, task: Option<&TaskRef>) -> Self {
        Self {
            kind: SessionKind::Focus,
            target_duration_minutes: time_left_secs.div_ceil(60),
            task_id: task.map(|t| t.id.clone()),
            class_id: task.and_then(|t| t.class_id.clone()),
        }
    }
}

/// The bridge's idempotency guard for the current work interval.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SyncGuard {
    pub session_created: bool,
    pub pending_remote_session_id: Option<String>,
}

impl SyncGuard {
    pub fn mark_created(&mut self, session_id: String) {
        self.session_created = true;
        self.pending_remote_session_id = Some(session_id);
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_clear(&self) -> bool {
        !self.session_created && self.pending_remote_session_id.is_none()
    }
}

/// Outcome of one bridge reaction, surfaced to whoever runs the bridge.
///
/// Failures here are informational: the focus machine has already moved
/// on and is never rolled back.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "notice", rename_all = "snake_case")]
pub enum SyncNotice {
    SessionCreated { session_id: String },
    SessionCompleted { session_id: String },
    SessionCancelled { session_id: String },
    /// The ledger already has an active session; no new one was created.
    ActiveSessionExists { session_id: String },
    CreateFailed { error: LedgerError },
    CompleteFailed { session_id: String, error: LedgerError },
    CancelFailed { session_id: String, error: LedgerError },
}

impl SyncNotice {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            SyncNotice::CreateFailed { .. }
                | SyncNotice::CompleteFailed { .. }
                | SyncNotice::CancelFailed { .. }
        )
    }
}
