// src/lib.rs

//! Scriptman
//!
//! Self-updating local manager for independently versioned script
//! packages published across one or more remote registries.
//!
//! # Architecture
//!
//! - Database-first: installed scripts, registries, and settings all live
//!   in SQLite; there are no config files
//! - Catalog aggregation: one concurrent fetch per registry, merged into
//!   a de-duplicated view with a short-lived cache in front
//! - Reconciliation: pure derivation of a lifecycle state per script from
//!   catalog, store, and authorization snapshots
//! - Batch commits: sequential, per-item failure tolerant application of
//!   user-chosen target states
//! - Authorization gating: suspension of scripts whose registry access is
//!   lost, self-healing once a valid token is back on file

pub mod db;
pub mod directives;
pub mod dispatch;
mod error;
pub mod lifecycle;
pub mod manager;
pub mod registry;
pub mod version;

pub use dispatch::{DispatchReport, dispatch_startup, pattern_matches};
pub use error::{Error, Result};
pub use lifecycle::{
    CommitAction, CommitItemError, CommitOutcome, ScriptState, ScriptStatus, Session, commit,
    reconcile,
};
pub use manager::Manager;
pub use registry::{
    AccessProbe, AccessSnapshot, AggregatedCatalog, CatalogCache, CatalogEntry, RegistryClient,
    RegistrySource,
};
pub use version::{ScriptVersion, compare_versions};
