// src/commands/registry.rs
//! Registry management commands

use anyhow::{Context, Result};
use scriptman::db;
use scriptman::db::models::{Registry, RegistryId};
use tracing::info;

/// Add a new registry
///
/// The first registry added becomes primary automatically; `--primary`
/// moves the flag explicitly. Exactly one registry is primary at any time.
pub fn cmd_registry_add(
    db_path: &str,
    ident: &str,
    label: Option<String>,
    token: Option<String>,
    primary: bool,
) -> Result<()> {
    let ident: RegistryId = ident.parse()?;
    info!("Adding registry: {}", ident);

    let conn = db::open(db_path)?;
    if Registry::find_by_ident(&conn, &ident)?.is_some() {
        if primary {
            // Re-adding an existing registry with --primary promotes it.
            Registry::set_primary(&conn, &ident)?;
            println!("Registry '{ident}' is now primary");
            return Ok(());
        }
        anyhow::bail!("Registry '{ident}' already exists");
    }

    let first = Registry::list_all(&conn)?.is_empty();
    let mut registry = Registry::new(
        ident.clone(),
        label.unwrap_or_else(|| ident.to_string()),
    );
    registry.token = token;
    registry.is_primary = primary || first;

    if registry.is_primary {
        // Demote any current primary before inserting the new one.
        conn.execute("UPDATE registries SET is_primary = 0", [])
            .context("Failed to demote current primary registry")?;
    }
    registry.insert(&conn)?;

    println!("Added registry: {ident}");
    println!("  Label: {}", registry.label);
    println!("  Primary: {}", registry.is_primary);
    println!("  Token: {}", if registry.token.is_some() { "stored" } else { "none" });
    Ok(())
}

/// Remove a registry
pub fn cmd_registry_remove(db_path: &str, ident: &str) -> Result<()> {
    let ident: RegistryId = ident.parse()?;
    info!("Removing registry: {}", ident);

    let conn = db::open(db_path)?;
    let registry = Registry::find_by_ident(&conn, &ident)?
        .ok_or_else(|| anyhow::anyhow!("Registry '{ident}' not found"))?;

    if registry.is_primary && Registry::list_all(&conn)?.len() > 1 {
        anyhow::bail!(
            "Registry '{ident}' is primary. Promote another registry first \
             with: scriptman registry add <owner>/<name> --primary"
        );
    }

    Registry::delete(&conn, &ident)?;
    println!("Removed registry: {ident}");
    println!("Installed scripts from it will show as orphaned; remove them when ready.");
    Ok(())
}

/// List configured registries
pub fn cmd_registry_list(db_path: &str) -> Result<()> {
    let conn = db::open(db_path)?;
    let registries = Registry::list_all(&conn)?;

    if registries.is_empty() {
        println!("No registries configured");
        return Ok(());
    }

    println!("Registries:");
    for registry in registries {
        let primary_mark = if registry.is_primary { "[primary]" } else { "" };
        let auth = if registry.auth_failed {
            "auth failed"
        } else if registry.token.is_some() {
            "token stored"
        } else {
            "public"
        };
        println!(
            "  {} ({}) {} {}",
            registry.ident(),
            registry.label,
            auth,
            primary_mark
        );
    }
    Ok(())
}

/// Store an access token for a registry
///
/// Clears any recorded authorization failure; suspended scripts from this
/// registry heal on the next reconciliation pass.
pub fn cmd_registry_token(db_path: &str, ident: &str, token: &str) -> Result<()> {
    let ident: RegistryId = ident.parse()?;
    info!("Storing token for registry: {}", ident);

    let conn = db::open(db_path)?;
    Registry::store_token(&conn, &ident, token)?;

    println!("Token stored for {ident}");
    println!("Suspended scripts from this registry will recover on the next run.");
    Ok(())
}
