// src/commands/refresh.rs
//! Catalog refresh command

use super::open_manager;
use anyhow::Result;
use tracing::info;

/// Force a catalog re-aggregation across all registries
pub fn cmd_refresh(db_path: &str) -> Result<()> {
    info!("Refreshing catalogs");
    let mut manager = open_manager(db_path)?;

    let outcome = manager.aggregate(true)?;

    println!("Merged catalog: {} script(s)", outcome.entries.len());
    for (ident, message) in &outcome.failures {
        println!("  [WARN] {ident}: {message}");
    }
    for ident in &outcome.auth_failures {
        println!(
            "  [WARN] {ident}: authorization failed; store a token with: \
             scriptman registry token {ident} <token>"
        );
    }
    Ok(())
}
