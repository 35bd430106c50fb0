// src/commands/mod.rs
//! Command handlers for the scriptman CLI

mod config;
mod init;
mod refresh;
mod registry;
mod run;
mod status;
mod transition;

pub use config::cmd_config;
pub use init::cmd_init;
pub use refresh::cmd_refresh;
pub use registry::{cmd_registry_add, cmd_registry_list, cmd_registry_remove, cmd_registry_token};
pub use run::cmd_run;
pub use status::cmd_status;
pub use transition::{cmd_disable, cmd_enable, cmd_install, cmd_remove, cmd_update};

use anyhow::{Context, Result};
use scriptman::lifecycle::CommitOutcome;
use scriptman::registry::RegistryClient;
use scriptman::Manager;

/// Resolve the database path, falling back to the per-user default
pub fn resolve_db_path(db_path: Option<String>) -> String {
    db_path.unwrap_or_else(scriptman::db::default_db_path)
}

/// Open the manager over the real HTTP registry client
///
/// Runs the primary-registry access check; a denied primary blocks the
/// command and surfaces the remediation path.
pub fn open_manager(db_path: &str) -> Result<Manager> {
    let client = RegistryClient::new().context("Failed to create registry client")?;
    let manager = Manager::open(db_path, Box::new(client))
        .with_context(|| format!("Failed to open script store at {db_path}"))?;
    manager.startup_check()?;
    Ok(manager)
}

/// Print a batch commit outcome; errors become the command's failure
pub fn report_commit(outcome: &CommitOutcome) -> Result<()> {
    for (name, action) in &outcome.applied {
        println!("  [OK] {action} {name}");
    }
    for error in &outcome.errors {
        println!("  [FAILED] {} {}: {}", error.action, error.name, error.message);
    }

    if !outcome.errors.is_empty() {
        anyhow::bail!(
            "{} of {} change(s) failed",
            outcome.errors.len(),
            outcome.applied.len() + outcome.errors.len()
        );
    }
    Ok(())
}
