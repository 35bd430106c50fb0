// src/commands/config.rs
//! Per-script settings commands

use anyhow::{Context, Result};
use scriptman::db;
use scriptman::db::models::{InstalledScript, ScriptSettings};
use tracing::info;

/// Show or change a script's settings
///
/// With no `--set` arguments the current settings are printed. Values are
/// parsed as JSON where possible, falling back to plain strings, so
/// `--set interval=30` stores a number and `--set label=blue` a string.
pub fn cmd_config(db_path: &str, name: &str, assignments: &[String]) -> Result<()> {
    let conn = db::open(db_path)?;

    let script = InstalledScript::find_by_name(&conn, name)?
        .ok_or_else(|| anyhow::anyhow!("Script '{name}' is not installed"))?;
    if !script.has_config && assignments.is_empty() {
        println!("'{name}' declares no configurable settings.");
        return Ok(());
    }

    let mut settings = ScriptSettings::find(&conn, name)?
        .map(|s| s.data)
        .unwrap_or_else(|| serde_json::json!({}));

    if assignments.is_empty() {
        println!("{}", serde_json::to_string_pretty(&settings)?);
        return Ok(());
    }

    let object = settings
        .as_object_mut()
        .context("Stored settings are not a JSON object")?;
    for assignment in assignments {
        let (key, raw) = assignment.split_once('=').ok_or_else(|| {
            anyhow::anyhow!("Invalid assignment '{assignment}': expected key=value")
        })?;
        let value = serde_json::from_str(raw)
            .unwrap_or_else(|_| serde_json::Value::String(raw.to_string()));
        object.insert(key.to_string(), value);
    }

    ScriptSettings::put(&conn, name, &settings)?;
    info!("Updated settings for '{}'", name);
    println!("{}", serde_json::to_string_pretty(&settings)?);
    Ok(())
}
