//! # Focusbridge Core Library
//!
//! This library provides the focus-session state machine and the bridge that
//! mirrors work intervals into a remote session ledger. The CLI binary is a
//! thin layer over the same core.
//!
//! ## Architecture
//!
//! - **Timer**: A tick-driven state machine (idle, working, short break) that
//!   requires the caller to invoke `tick()` once per second
//! - **Sync**: A bridge that consumes machine events and creates, completes or
//!   cancels exactly one remote session per work interval
//! - **Task**: Optimistic task registry and reconciliation of provisional
//!   task ids against confirmed records
//! - **Runtime**: A tokio task that owns the machine and drives all of the above
//! - **Storage**: TOML configuration and a JSON file-backed session ledger
//!
//! ## Key Components
//!
//! - [`FocusMachine`]: Core timer state machine
//! - [`SessionBridge`]: Remote session mirroring
//! - [`TaskReconciler`]: Provisional-to-permanent task remapping
//! - [`FocusRuntime`]: Async owner of the machine
//! - [`Config`]: Application configuration management

pub mod error;
pub mod events;
pub mod runtime;
pub mod storage;
pub mod sync;
pub mod task;
pub mod timer;

pub use error::{ConfigError, CoreError, LedgerError, Rejection, RuntimeError};
pub use events::{FocusEvent, WorkEnd};
pub use runtime::{FocusHandle, FocusRuntime};
pub use storage::{Config, JsonFileLedger};
pub use sync::{MemoryLedger, SessionBridge, SessionLedger, SyncGuard, SyncNotice};
pub use task::{TaskRecord, TaskReconciler, TaskRef, TaskRegistry};
pub use timer::{FocusMachine, FocusState, Phase, SettingsPatch, TimerSettings};
