// src/registry/auth.rs

//! Registry authorization gate
//!
//! Decides, per registry, whether access is currently permitted, and owns
//! the suspension flag on installed scripts. Suspension is a steady-state
//! condition, not an error path: it is entered when a script's origin
//! registry loses authorization and it clears itself on the first
//! reconciliation pass after a valid token is back on file.

use crate::db::models::{InstalledScript, Registry, RegistryId};
use crate::error::{Error, Result};
use crate::registry::aggregator::AggregatedCatalog;
use crate::registry::client::{AccessProbe, RegistrySource};
use rusqlite::Connection;
use std::collections::HashMap;
use tracing::{info, warn};

/// Snapshot of per-registry access validity
///
/// Built once per reconciliation pass so state derivation stays pure.
#[derive(Debug, Clone, Default)]
pub struct AccessSnapshot {
    usable: HashMap<RegistryId, bool>,
}

impl AccessSnapshot {
    /// Derive the snapshot from the configured registries
    ///
    /// A registry is usable while its last fetch or probe was not rejected
    /// for authorization. Registries absent from configuration have no
    /// entry at all; their scripts are an orphan question, not an
    /// authorization one.
    pub fn from_registries(registries: &[Registry]) -> Self {
        let usable = registries
            .iter()
            .map(|r| (r.ident(), !r.auth_failed))
            .collect();
        Self { usable }
    }

    /// Whether the registry is configured and currently authorized
    ///
    /// `None` means the registry is not configured at all.
    pub fn usable(&self, ident: &RegistryId) -> Option<bool> {
        self.usable.get(ident).copied()
    }

    #[cfg(test)]
    pub fn with_entries(entries: &[(RegistryId, bool)]) -> Self {
        Self {
            usable: entries.iter().cloned().collect(),
        }
    }
}

/// Verify access to the primary registry at startup
///
/// A denied probe blocks the whole system and surfaces the remediation
/// path; network unreachability fails open so an offline host still runs
/// its installed scripts.
pub fn check_primary(conn: &Connection, source: &dyn RegistrySource) -> Result<()> {
    let Some(primary) = Registry::find_primary(conn)? else {
        return Ok(());
    };

    match source.probe_access(&primary) {
        AccessProbe::Ok => {
            if primary.auth_failed {
                Registry::set_auth_failed(conn, &primary.ident(), false)?;
            }
            Ok(())
        }
        AccessProbe::Unreachable => {
            warn!(
                "Primary registry {} unreachable, continuing offline",
                primary.ident()
            );
            Ok(())
        }
        AccessProbe::Denied => {
            Registry::set_auth_failed(conn, &primary.ident(), true)?;
            Err(Error::AuthError(format!(
                "Access to primary registry {} was denied. \
                 Store a valid token with: scriptman registry token {} <token>",
                primary.ident(),
                primary.ident()
            )))
        }
    }
}

/// Persist per-registry authorization outcomes from an aggregation pass
pub fn record_fetch_outcomes(conn: &Connection, outcome: &AggregatedCatalog) -> Result<()> {
    for ident in &outcome.auth_failures {
        Registry::set_auth_failed(conn, ident, true)?;
    }
    for ident in &outcome.reachable {
        Registry::set_auth_failed(conn, ident, false)?;
    }
    Ok(())
}

/// Names changed by a suspension sync pass
#[derive(Debug, Default)]
pub struct SuspensionChanges {
    pub suspended: Vec<String>,
    pub healed: Vec<String>,
}

/// Apply suspension side effects to the store
///
/// Scripts whose origin registry has lost authorization are flagged
/// suspended and forced inactive. Scripts flagged suspended whose registry
/// is authorized again are healed: the flag clears and the script returns
/// to active, since the deactivation was gate-caused, not user intent.
pub fn sync_suspensions(conn: &Connection, access: &AccessSnapshot) -> Result<SuspensionChanges> {
    let mut changes = SuspensionChanges::default();

    for script in InstalledScript::list_all(conn)? {
        match access.usable(&script.origin()) {
            Some(false) => {
                if !script.suspended || script.active {
                    InstalledScript::set_suspended(conn, &script.name, true)?;
                    changes.suspended.push(script.name);
                }
            }
            Some(true) => {
                if script.suspended {
                    InstalledScript::set_suspended(conn, &script.name, false)?;
                    changes.healed.push(script.name);
                }
            }
            // Origin registry no longer configured: an orphan concern,
            // leave the flags untouched.
            None => {}
        }
    }

    if !changes.suspended.is_empty() {
        info!("Suspended {} script(s)", changes.suspended.len());
    }
    if !changes.healed.is_empty() {
        info!("Healed suspension on {} script(s)", changes.healed.len());
    }

    Ok(changes)
}
