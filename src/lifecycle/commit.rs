// src/lifecycle/commit.rs

//! Batch commit of staged lifecycle changes
//!
//! Applies a session's pending changes against the store, sequentially and
//! deliberately non-atomically: each item is fetched and persisted on its
//! own, a failing item is recorded and skipped, and the remaining items
//! are still attempted. After the batch the caller re-reconciles against
//! the store, which is the source of truth from that point on.

use crate::db::models::{InstalledScript, Meta, Registry, ScriptSettings};
use crate::directives;
use crate::error::{Error, Result};
use crate::lifecycle::session::{PendingChange, Session};
use crate::lifecycle::state::ScriptState;
use crate::registry::client::RegistrySource;
use indicatif::ProgressBar;
use rusqlite::Connection;
use sha2::{Digest, Sha256};
use strum_macros::Display;
use tracing::{debug, info, warn};

/// The store operation a pending change maps to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
#[strum(serialize_all = "lowercase")]
pub enum CommitAction {
    Install,
    Update,
    Downgrade,
    Activate,
    Deactivate,
    Uninstall,
}

impl CommitAction {
    fn for_change(change: &PendingChange) -> Option<Self> {
        match change.target {
            ScriptState::PendingInstall => Some(CommitAction::Install),
            ScriptState::UpdateAvailable => Some(CommitAction::Update),
            ScriptState::DowngradeAvailable => Some(CommitAction::Downgrade),
            ScriptState::Inactive => Some(CommitAction::Deactivate),
            ScriptState::Active => Some(CommitAction::Activate),
            ScriptState::PendingUninstall => Some(CommitAction::Uninstall),
            _ => None,
        }
    }
}

/// One failed item in a batch
#[derive(Debug, Clone)]
pub struct CommitItemError {
    pub name: String,
    pub action: CommitAction,
    pub message: String,
}

/// Aggregate result of a batch commit
#[derive(Debug, Default)]
pub struct CommitOutcome {
    pub applied: Vec<(String, CommitAction)>,
    pub errors: Vec<CommitItemError>,
}

impl CommitOutcome {
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}

/// Apply all pending changes in a session against the store
///
/// Items are processed in name order. A per-item failure leaves that
/// item's previously persisted state untouched and never prevents the
/// remaining items from being attempted.
pub fn commit(
    conn: &Connection,
    source: &dyn RegistrySource,
    session: &Session,
    progress: Option<&ProgressBar>,
) -> Result<CommitOutcome> {
    let pending = session.pending();
    let mut outcome = CommitOutcome::default();

    if pending.is_empty() {
        debug!("Commit requested with no pending changes");
        return Ok(outcome);
    }

    info!("Committing {} staged change(s)", pending.len());
    if let Some(pb) = progress {
        pb.set_length(pending.len() as u64);
    }

    for change in &pending {
        let Some(action) = CommitAction::for_change(change) else {
            continue;
        };
        if let Some(pb) = progress {
            pb.set_message(format!("{} {}", action, change.name));
        }

        match apply_change(conn, source, session, change, action) {
            Ok(()) => outcome.applied.push((change.name.clone(), action)),
            Err(e) => {
                warn!("Failed to {} '{}': {}", action, change.name, e);
                outcome.errors.push(CommitItemError {
                    name: change.name.clone(),
                    action,
                    message: e.to_string(),
                });
            }
        }

        if let Some(pb) = progress {
            pb.inc(1);
        }
    }

    // The pending-update signal is stale either way after a commit pass.
    Meta::set_flag(conn, Meta::UPDATE_AVAILABLE, false)?;

    info!(
        "Batch commit finished: {} applied, {} failed",
        outcome.applied.len(),
        outcome.errors.len()
    );
    Ok(outcome)
}

fn apply_change(
    conn: &Connection,
    source: &dyn RegistrySource,
    session: &Session,
    change: &PendingChange,
    action: CommitAction,
) -> Result<()> {
    match action {
        CommitAction::Install | CommitAction::Update | CommitAction::Downgrade => {
            install_from_catalog(conn, source, session, &change.name)
        }
        CommitAction::Activate => InstalledScript::set_active(conn, &change.name, true),
        CommitAction::Deactivate => InstalledScript::set_active(conn, &change.name, false),
        CommitAction::Uninstall => {
            if change.initial == ScriptState::Suspended {
                debug!("Removing suspended script '{}'", change.name);
            }
            InstalledScript::delete(conn, &change.name)?;
            // Uninstall also discards the script's configuration state.
            ScriptSettings::delete(conn, &change.name)
        }
    }
}

/// Fetch the payload for a catalog entry and persist the installed record
fn install_from_catalog(
    conn: &Connection,
    source: &dyn RegistrySource,
    session: &Session,
    name: &str,
) -> Result<()> {
    let status = session
        .status(name)
        .ok_or_else(|| Error::NotFoundError(format!("Unknown script '{name}'")))?;
    let entry = status
        .remote
        .as_ref()
        .ok_or_else(|| Error::NotFoundError(format!("'{name}' is not in the catalog")))?;

    let registry = Registry::find_by_ident(conn, &entry.origin)?.ok_or_else(|| {
        Error::NotFoundError(format!(
            "Origin registry {} is not configured",
            entry.origin
        ))
    })?;

    let payload = source.fetch_payload(&registry, &entry.payload_ref)?;
    let sha256 = hex::encode(Sha256::digest(&payload));
    let code = String::from_utf8(payload)
        .map_err(|e| Error::ParseError(format!("Payload for '{name}' is not UTF-8: {e}")))?;

    let context_patterns = directives::extract_context_patterns(&code);
    let has_config = directives::declares_config(&code);

    let script = InstalledScript::new(
        name.to_string(),
        entry.version.as_str().to_string(),
        code.clone(),
        context_patterns,
        has_config,
        entry.origin.clone(),
        sha256,
    );
    script.upsert(conn)?;

    // Seed settings from the payload's declared defaults, once.
    if has_config && ScriptSettings::find(conn, name)?.is_none() {
        if let Some(defaults) = directives::extract_config_defaults(&code) {
            ScriptSettings::put(conn, name, &defaults)?;
        }
    }

    Ok(())
}
