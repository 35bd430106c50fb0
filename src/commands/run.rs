// src/commands/run.rs
//! Startup execution command
//!
//! The host-startup path: gate on primary registry access, apply
//! suspension effects from the stored authorization flags, dispatch every
//! eligible script against the runtime context, then kick the
//! rate-limited background update check.

use super::open_manager;
use anyhow::Result;
use scriptman::dispatch;
use tracing::info;

/// Execute all active scripts matching the runtime context
pub fn cmd_run(db_path: &str, context: &str) -> Result<()> {
    info!("Dispatching scripts for context '{}'", context);

    // open_manager runs the primary access probe; a denial aborts here
    // with the remediation message before anything executes.
    let manager = open_manager(db_path)?;

    // A registry that lost authorization since the last session must
    // suspend its scripts before any of them can run; a registry whose
    // token was fixed heals here without a reinstall.
    let changes = manager.sync_authorization()?;
    for name in &changes.suspended {
        println!("  [SUSPENDED] {name}: registry authorization missing");
    }

    let scripts = manager.installed()?;
    let report = dispatch::dispatch_startup(&scripts, context);

    println!(
        "{} script(s) executed, {} skipped",
        report.executed.len(),
        report.skipped
    );
    for (name, message) in &report.failures {
        println!("  [FAILED] {name}: {message}");
    }

    if manager.check_updates_in_background() {
        println!("Updates are available; run: scriptman status");
    }

    Ok(())
}
