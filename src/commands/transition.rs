// src/commands/transition.rs
//! Lifecycle transition commands: install, update, enable, disable, remove
//!
//! Each command stages target states on a session over a fresh snapshot,
//! then applies the whole batch in one commit and reports per-item
//! results.

use super::{open_manager, report_commit};
use anyhow::{Context, Result};
use indicatif::ProgressBar;
use scriptman::{Manager, ScriptState, Session};
use tracing::info;

fn commit_session(manager: &mut Manager, session: &Session) -> Result<()> {
    let progress = ProgressBar::new(0);
    let (outcome, _) = manager.commit(session, Some(&progress))?;
    progress.finish_and_clear();

    if outcome.applied.is_empty() && outcome.errors.is_empty() {
        println!("Nothing to do.");
        return Ok(());
    }
    report_commit(&outcome)
}

/// Install scripts from the merged catalog
pub fn cmd_install(db_path: &str, names: &[String]) -> Result<()> {
    info!("Installing: {}", names.join(", "));
    let mut manager = open_manager(db_path)?;
    let mut session = manager.session(false)?;

    // Installing should not sweep unrelated updates into the batch.
    defer_unrelated_refetches(&mut session, names);
    for name in names {
        session
            .mark_install(name)
            .with_context(|| format!("Cannot install '{name}' (try: scriptman refresh)"))?;
    }

    commit_session(&mut manager, &session)
}

/// Apply available updates and recommended downgrades
///
/// With no names, every script currently at UpdateAvailable or
/// DowngradeAvailable is re-fetched; with names, only those.
pub fn cmd_update(db_path: &str, names: &[String]) -> Result<()> {
    let mut manager = open_manager(db_path)?;
    let mut session = manager.session(false)?;

    if names.is_empty() {
        let eligible: Vec<String> = session
            .pending()
            .iter()
            .map(|p| p.name.clone())
            .collect();
        if eligible.is_empty() {
            println!("All scripts are up to date.");
            return Ok(());
        }
        info!("Updating all eligible scripts: {}", eligible.join(", "));
    } else {
        for name in names {
            match session.target(name) {
                Some(ScriptState::UpdateAvailable) | Some(ScriptState::DowngradeAvailable) => {}
                Some(_) => anyhow::bail!("No update available for '{name}'"),
                None => anyhow::bail!("Unknown script '{name}' (try: scriptman refresh)"),
            }
        }
        defer_unrelated_refetches(&mut session, names);
    }

    commit_session(&mut manager, &session)
}

/// Activate installed scripts
pub fn cmd_enable(db_path: &str, names: &[String]) -> Result<()> {
    info!("Enabling: {}", names.join(", "));
    let mut manager = open_manager(db_path)?;
    let mut session = manager.session(false)?;

    defer_unrelated_refetches(&mut session, names);
    for name in names {
        session.mark_activate(name)?;
    }

    commit_session(&mut manager, &session)
}

/// Deactivate installed scripts without removing them
pub fn cmd_disable(db_path: &str, names: &[String]) -> Result<()> {
    info!("Disabling: {}", names.join(", "));
    let mut manager = open_manager(db_path)?;
    let mut session = manager.session(false)?;

    defer_unrelated_refetches(&mut session, names);
    for name in names {
        session.mark_deactivate(name)?;
    }

    commit_session(&mut manager, &session)
}

/// Uninstall scripts and discard their settings
pub fn cmd_remove(db_path: &str, names: &[String]) -> Result<()> {
    info!("Removing: {}", names.join(", "));
    let mut manager = open_manager(db_path)?;
    let mut session = manager.session(false)?;

    defer_unrelated_refetches(&mut session, names);
    for name in names {
        session.mark_uninstall(name)?;
    }

    commit_session(&mut manager, &session)
}

/// Keep scripts the user did not name out of the commit batch
fn defer_unrelated_refetches(session: &mut Session, names: &[String]) {
    let unrelated: Vec<String> = session
        .pending()
        .iter()
        .map(|p| p.name.clone())
        .filter(|name| !names.contains(name))
        .collect();
    for name in unrelated {
        session.defer_refetch(&name);
    }
}
