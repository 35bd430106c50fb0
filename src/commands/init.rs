// src/commands/init.rs
//! Database initialization command

use anyhow::{Context, Result};
use tracing::info;

/// Initialize the script store
pub fn cmd_init(db_path: &str) -> Result<()> {
    info!("Initializing script store at: {}", db_path);
    scriptman::db::init(db_path).context("Failed to initialize database")?;
    println!("Script store initialized at: {db_path}");
    println!("Add a registry next: scriptman registry add <owner>/<name> --primary");
    Ok(())
}
