// src/lifecycle/updates.rs

//! Background update checking
//!
//! Best-effort and rate-limited: at most one catalog probe per interval,
//! with every failure swallowed. The only observable output is the
//! persisted "update available" signal, which the status display surfaces
//! and a batch commit clears.

use crate::db::models::{InstalledScript, Meta, Registry};
use crate::db::{current_timestamp, parse_timestamp};
use crate::registry::aggregator;
use crate::registry::client::RegistrySource;
use crate::version::ScriptVersion;
use rusqlite::Connection;
use tracing::{debug, info};

/// Minimum seconds between background catalog probes
pub const UPDATE_CHECK_INTERVAL_SECS: i64 = 60 * 60;

/// Run the rate-limited background update check
///
/// Returns the current value of the update signal. Never returns an
/// error: a failed probe simply leaves the signal unset.
pub fn check_updates_in_background(conn: &Connection, source: &dyn RegistrySource) -> bool {
    match run_check(conn, source) {
        Ok(flag) => flag,
        Err(e) => {
            debug!("Background update check failed: {}", e);
            false
        }
    }
}

fn run_check(conn: &Connection, source: &dyn RegistrySource) -> crate::error::Result<bool> {
    let now = chrono::Utc::now().timestamp();
    let last = Meta::get(conn, Meta::LAST_UPDATE_CHECK)?
        .and_then(|ts| parse_timestamp(&ts).ok())
        .unwrap_or(0);

    if now - last < UPDATE_CHECK_INTERVAL_SECS {
        return Meta::get_flag(conn, Meta::UPDATE_AVAILABLE);
    }

    Meta::set(conn, Meta::LAST_UPDATE_CHECK, &current_timestamp())?;
    Meta::set_flag(conn, Meta::UPDATE_AVAILABLE, false)?;

    let active: Vec<InstalledScript> = InstalledScript::list_all(conn)?
        .into_iter()
        .filter(|s| s.active && !s.suspended)
        .collect();
    if active.is_empty() {
        return Ok(false);
    }

    let registries = Registry::list_all(conn)?;
    let outcome = aggregator::aggregate(source, &registries);

    let update_found = active.iter().any(|local| {
        outcome
            .entries
            .iter()
            .find(|e| e.name == local.name)
            .is_some_and(|e| e.version > ScriptVersion::parse(&local.version))
    });

    if update_found {
        info!("Background check found at least one update");
        Meta::set_flag(conn, Meta::UPDATE_AVAILABLE, true)?;
    }

    Ok(update_found)
}
