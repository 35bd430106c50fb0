// src/commands/status.rs
//! Lifecycle status display

use super::open_manager;
use anyhow::Result;
use scriptman::ScriptState;
use scriptman::db::models::Meta;
use scriptman::lifecycle::ScriptStatus;
use scriptman::registry::DEFAULT_CATEGORY;
use std::collections::BTreeMap;

/// Show the lifecycle state of every known script
pub fn cmd_status(db_path: &str, by_category: bool) -> Result<()> {
    let mut manager = open_manager(db_path)?;
    let statuses = manager.snapshot(false)?;

    if statuses.is_empty() {
        println!("No scripts known. Configure a registry and refresh.");
        return Ok(());
    }

    let installed: Vec<&ScriptStatus> =
        statuses.iter().filter(|s| s.state.is_installed()).collect();
    let active = installed
        .iter()
        .filter(|s| {
            matches!(
                s.state,
                ScriptState::Active | ScriptState::UpdateAvailable | ScriptState::DowngradeAvailable
            )
        })
        .count();
    let updates = installed
        .iter()
        .filter(|s| {
            matches!(
                s.state,
                ScriptState::UpdateAvailable | ScriptState::DowngradeAvailable
            )
        })
        .count();

    println!(
        "Available: {} | Installed: {} (active: {}) | Updates: {}",
        statuses.len(),
        installed.len(),
        active,
        updates
    );
    if Meta::get_flag(manager.conn(), Meta::UPDATE_AVAILABLE)? {
        println!("Updates were found by the background check; run: scriptman update");
    }
    println!();

    if by_category {
        print_by_category(&statuses);
    } else {
        for status in &statuses {
            print_status_line(status);
        }
    }
    Ok(())
}

fn print_status_line(status: &ScriptStatus) {
    let version = match (&status.installed, &status.remote) {
        (Some(local), Some(remote)) if status.state == ScriptState::UpdateAvailable
            || status.state == ScriptState::DowngradeAvailable =>
        {
            format!("{} -> {}", local.version, remote.version)
        }
        (Some(local), _) => local.version.clone(),
        (None, Some(remote)) => remote.version.to_string(),
        (None, None) => String::new(),
    };

    let origin = status
        .installed
        .as_ref()
        .map(|s| s.origin().to_string())
        .or_else(|| status.remote.as_ref().map(|r| r.origin.to_string()))
        .unwrap_or_default();

    println!(
        "  {:<28} {:<20} {:<12} {}",
        status.name, status.state, version, origin
    );
}

fn print_by_category(statuses: &[ScriptStatus]) {
    let mut by_category: BTreeMap<&str, Vec<&ScriptStatus>> = BTreeMap::new();
    for status in statuses {
        let categories: Vec<&str> = status
            .remote
            .as_ref()
            .map(|r| r.categories.iter().map(String::as_str).collect())
            .unwrap_or_else(|| vec![DEFAULT_CATEGORY]);
        for category in categories {
            by_category.entry(category).or_default().push(status);
        }
    }

    for (category, group) in by_category {
        let installed = group.iter().filter(|s| s.state.is_installed()).count();
        println!("{category} ({} scripts, {installed} installed)", group.len());
        for status in group {
            print_status_line(status);
        }
        println!();
    }
}
