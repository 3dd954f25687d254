//! Shared fakes for integration tests.

#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use focusbridge_core::sync::{NewSession, RemoteSession};
use focusbridge_core::{FocusEvent, FocusMachine, LedgerError, MemoryLedger, SessionBridge, SessionLedger, SyncNotice};
use tokio::sync::mpsc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    Create(NewSession),
    Complete { id: String, notes: Option<String> },
    Cancel { id: String },
    Active,
}

/// In-memory ledger that records every call and can be told to fail.
#[derive(Debug, Default)]
pub struct RecordingLedger {
    inner: MemoryLedger,
    calls: Mutex<Vec<Call>>,
    fail_create: AtomicBool,
}

impl RecordingLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_create() -> Self {
        let ledger = Self::default();
        ledger.fail_create.store(true, Ordering::SeqCst);
        ledger
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn creates(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Create(_)))
            .count()
    }

    pub fn completes(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Complete { .. }))
            .count()
    }

    pub fn cancels(&self) -> usize {
        self.calls()
            .iter()
            .filter(|c| matches!(c, Call::Cancel { .. }))
            .count()
    }

    pub fn sessions(&self) -> Vec<RemoteSession> {
        self.inner.sessions().unwrap()
    }

    fn record(&self, call: Call) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl SessionLedger for RecordingLedger {
    async fn create_session(&self, payload: NewSession) -> Result<RemoteSession, LedgerError> {
        self.record(Call::Create(payload.clone()));
        if self.fail_create.load(Ordering::SeqCst) {
            return Err(LedgerError::Transport("connection refused".into()));
        }
        self.inner.insert(payload)
    }

    async fn complete_session(
        &self,
        id: &str,
        notes: Option<String>,
    ) -> Result<RemoteSession, LedgerError> {
        self.record(Call::Complete {
            id: id.to_string(),
            notes: notes.clone(),
        });
        self.inner
            .settle(id, focusbridge_core::sync::SessionStatus::Completed, notes)
    }

    async fn cancel_session(&self, id: &str) -> Result<RemoteSession, LedgerError> {
        self.record(Call::Cancel { id: id.to_string() });
        self.inner
            .settle(id, focusbridge_core::sync::SessionStatus::Cancelled, None)
    }

    async fn active_session(&self) -> Result<Option<RemoteSession>, LedgerError> {
        self.record(Call::Active);
        self.inner.active()
    }
}

/// Feed every queued machine event through the bridge, in order.
pub async fn pump(
    bridge: &mut SessionBridge,
    events: &mut mpsc::UnboundedReceiver<FocusEvent>,
) -> Vec<SyncNotice> {
    let mut notices = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Some(notice) = bridge.handle(&event).await {
            notices.push(notice);
        }
    }
    notices
}

/// Tick until the machine leaves its current phase, at most `limit` times.
pub fn tick_until_phase_changes(machine: &mut FocusMachine, limit: usize) -> usize {
    let start = machine.phase();
    for n in 1..=limit {
        machine.tick();
        if machine.phase() != start {
            return n;
        }
    }
    limit
}
