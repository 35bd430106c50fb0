// src/lifecycle/mod.rs

//! Lifecycle engine
//!
//! Derives per-script lifecycle states from the merged catalog and the
//! local store, tracks user-chosen target states in an explicit session,
//! and commits batches of transitions against the store with per-item
//! failure tolerance.

pub mod commit;
pub mod session;
pub mod state;
pub mod updates;

pub use commit::{CommitAction, CommitItemError, CommitOutcome, commit};
pub use session::{PendingChange, Session};
pub use state::{ScriptState, ScriptStatus, reconcile};
pub use updates::{UPDATE_CHECK_INTERVAL_SECS, check_updates_in_background};
