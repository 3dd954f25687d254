//! Session synchronization bridge.
//!
//! Mirrors work intervals of the focus machine into the remote session
//! ledger. Consumes [`FocusEvent`]s strictly in order, so for any interval
//! the create call is always issued before the complete/cancel call.
//!
//! Guarantees:
//! - at most one `create_session` per work interval ([`SyncGuard`]);
//! - at most one `complete_session`/`cancel_session` per created session;
//! - the guard is cleared once a completion round-trip settles, whether it
//!   succeeded or not.
//!
//! Ledger failures never reach back into the focus machine. They are logged
//! and surfaced as [`SyncNotice`]s.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::ledger::SessionLedger;
use super::types::{NewSession, SyncGuard, SyncNotice};
use crate::error::Rejection;
use crate::events::{FocusEvent, WorkEnd};
use crate::task::TaskRef;

pub struct SessionBridge {
    ledger: Arc<dyn SessionLedger>,
    guard: SyncGuard,
    record_notes: bool,
}

impl SessionBridge {
    pub fn new(ledger: Arc<dyn SessionLedger>) -> Self {
        Self {
            ledger,
            guard: SyncGuard::default(),
            record_notes: true,
        }
    }

    /// Attach the bound task's title as notes when completing a session.
    pub fn with_notes(mut self, record_notes: bool) -> Self {
        self.record_notes = record_notes;
        self
    }

    pub fn guard(&self) -> &SyncGuard {
        &self.guard
    }

    /// React to one focus event. Returns a notice when a ledger call was
    /// made or deliberately skipped.
    pub async fn handle(&mut self, event: &FocusEvent) -> Option<SyncNotice> {
        if let Some((time_left_secs, task)) = event.running_work() {
            return self.ensure_session(time_left_secs, task).await;
        }

        let end = event.work_end()?;
        let notes = match event {
            FocusEvent::IntervalCompleted {
                task: Some(task), ..
            } if self.record_notes => Some(task.title.clone()),
            _ => None,
        };
        match self.finish(end, notes).await {
            Ok(notice) => Some(notice),
            Err(rejection) => {
                // Creation failed or was skipped for this interval.
                tracing::debug!(%rejection, "work interval ended without a remote session");
                None
            }
        }
    }

    /// Close the pending session: complete it if the interval ran out,
    /// cancel it if the user ended it early.
    ///
    /// Rejected when no session is pending; nothing is sent in that case.
    pub async fn finish(
        &mut self,
        end: WorkEnd,
        notes: Option<String>,
    ) -> Result<SyncNotice, Rejection> {
        let session_id = self
            .guard
            .pending_remote_session_id
            .clone()
            .ok_or(Rejection::NoPendingSession)?;

        let notice = match end {
            WorkEnd::Completed => match self.ledger.complete_session(&session_id, notes).await {
                Ok(_) => {
                    tracing::info!(%session_id, "remote session completed");
                    SyncNotice::SessionCompleted { session_id }
                }
                Err(error) => {
                    tracing::warn!(%session_id, %error, "failed to complete remote session");
                    SyncNotice::CompleteFailed { session_id, error }
                }
            },
            WorkEnd::Cancelled => match self.ledger.cancel_session(&session_id).await {
                Ok(_) => {
                    tracing::info!(%session_id, "remote session cancelled");
                    SyncNotice::SessionCancelled { session_id }
                }
                Err(error) => {
                    tracing::warn!(%session_id, %error, "failed to cancel remote session");
                    SyncNotice::CancelFailed { session_id, error }
                }
            },
        };

        self.guard.reset();
        Ok(notice)
    }

    /// Drive the bridge from a focus machine subscription until the machine
    /// side hangs up. Notices are forwarded to `notices` when given.
    ///
    /// Returns the final guard.
    pub async fn run(
        mut self,
        mut events: mpsc::UnboundedReceiver<FocusEvent>,
        notices: Option<mpsc::UnboundedSender<SyncNotice>>,
    ) -> SyncGuard {
        while let Some(event) = events.recv().await {
            let Some(notice) = self.handle(&event).await else {
                continue;
            };
            if let Some(tx) = &notices {
                // The caller may stop listening; the bridge keeps going.
                let _ = tx.send(notice);
            }
        }
        tracing::debug!(guard = ?self.guard, "session bridge stopped");
        self.guard
    }

    async fn ensure_session(
        &mut self,
        time_left_secs: u64,
        task: Option<&TaskRef>,
    ) -> Option<SyncNotice> {
        if self.guard.session_created {
            return None;
        }

        match self.ledger.active_session().await {
            Ok(None) => {}
            Ok(Some(existing)) => {
                tracing::warn!(session_id = %existing.id, "ledger already has an active session; not creating another");
                return Some(SyncNotice::ActiveSessionExists {
                    session_id: existing.id,
                });
            }
            Err(error) => {
                tracing::warn!(%error, "could not query active session; skipping create");
                return Some(SyncNotice::CreateFailed { error });
            }
        }

        let payload = NewSession::focus(time_left_secs, task);
        match self.ledger.create_session(payload).await {
            Ok(session) => {
                tracing::info!(
                    session_id = %session.id,
                    minutes = session.target_duration_minutes,
                    task_id = ?session.task_id,
                    "remote session created"
                );
                self.guard.mark_created(session.id.clone());
                Some(SyncNotice::SessionCreated {
                    session_id: session.id,
                })
            }
            Err(error) => {
                tracing::warn!(%error, "failed to create remote session; timer continues");
                Some(SyncNotice::CreateFailed { error })
            }
        }
    }
}
