//! Session synchronization layer.
//!
//! Mirrors focus work intervals into a remote session ledger. The ledger is
//! an external collaborator behind [`SessionLedger`]; [`SessionBridge`]
//! decides when to call it.

pub mod bridge;
pub mod ledger;
pub mod types;

pub use bridge::SessionBridge;
pub use ledger::{MemoryLedger, SessionLedger};
pub use types::{NewSession, RemoteSession, SessionKind, SessionStatus, SyncGuard, SyncNotice};
