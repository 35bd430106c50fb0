// src/db/models/script.rs

//! InstalledScript model - the persisted record of an installed package

use super::RegistryId;
use crate::db::current_timestamp;
use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};

/// A locally installed script package
///
/// Keyed uniquely by `name`; the record outlives the session and is
/// destroyed only by explicit uninstall. `suspended` is owned by the
/// authorization gate and is never set directly by user intent.
#[derive(Debug, Clone)]
pub struct InstalledScript {
    pub name: String,
    pub version: String,
    pub code: String,
    pub context_patterns: Vec<String>,
    pub has_config: bool,
    pub active: bool,
    pub suspended: bool,
    pub origin_owner: String,
    pub origin_name: String,
    pub sha256: String,
    pub installed_at: Option<String>,
    pub updated_at: Option<String>,
}

impl InstalledScript {
    pub fn new(
        name: String,
        version: String,
        code: String,
        context_patterns: Vec<String>,
        has_config: bool,
        origin: RegistryId,
        sha256: String,
    ) -> Self {
        Self {
            name,
            version,
            code,
            context_patterns,
            has_config,
            active: true,
            suspended: false,
            origin_owner: origin.owner,
            origin_name: origin.name,
            sha256,
            installed_at: None,
            updated_at: None,
        }
    }

    pub fn origin(&self) -> RegistryId {
        RegistryId::new(self.origin_owner.clone(), self.origin_name.clone())
    }

    /// Insert or overwrite the record for this script name
    pub fn upsert(&self, conn: &Connection) -> Result<()> {
        let patterns_json = serde_json::to_string(&self.context_patterns)
            .map_err(|e| Error::ParseError(format!("Failed to encode context patterns: {e}")))?;

        conn.execute(
            "INSERT INTO scripts
                 (name, version, code, context_patterns, has_config, active, suspended,
                  origin_owner, origin_name, sha256, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
             ON CONFLICT (name) DO UPDATE SET
                 version = excluded.version,
                 code = excluded.code,
                 context_patterns = excluded.context_patterns,
                 has_config = excluded.has_config,
                 active = excluded.active,
                 suspended = excluded.suspended,
                 origin_owner = excluded.origin_owner,
                 origin_name = excluded.origin_name,
                 sha256 = excluded.sha256,
                 updated_at = excluded.updated_at",
            params![
                &self.name,
                &self.version,
                &self.code,
                &patterns_json,
                self.has_config as i32,
                self.active as i32,
                self.suspended as i32,
                &self.origin_owner,
                &self.origin_name,
                &self.sha256,
                current_timestamp(),
            ],
        )?;

        Ok(())
    }

    /// Find an installed script by name
    pub fn find_by_name(conn: &Connection, name: &str) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, version, code, context_patterns, has_config, active, suspended,
                    origin_owner, origin_name, sha256, installed_at, updated_at
             FROM scripts WHERE name = ?1",
        )?;

        let script = stmt.query_row([name], Self::from_row).optional()?;

        Ok(script)
    }

    /// List all installed scripts ordered by name
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT name, version, code, context_patterns, has_config, active, suspended,
                    origin_owner, origin_name, sha256, installed_at, updated_at
             FROM scripts ORDER BY name",
        )?;

        let scripts = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(scripts)
    }

    /// Flip the user-facing active flag
    pub fn set_active(conn: &Connection, name: &str, active: bool) -> Result<()> {
        let changed = conn.execute(
            "UPDATE scripts SET active = ?1, updated_at = ?2 WHERE name = ?3",
            params![active as i32, current_timestamp(), name],
        )?;
        if changed == 0 {
            return Err(Error::NotFoundError(format!(
                "Script '{name}' is not installed"
            )));
        }
        Ok(())
    }

    /// Gate-owned suspension write: suspending forces the script inactive,
    /// healing restores it
    pub fn set_suspended(conn: &Connection, name: &str, suspended: bool) -> Result<()> {
        let changed = conn.execute(
            "UPDATE scripts SET suspended = ?1, active = ?2, updated_at = ?3 WHERE name = ?4",
            params![
                suspended as i32,
                !suspended as i32,
                current_timestamp(),
                name
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFoundError(format!(
                "Script '{name}' is not installed"
            )));
        }
        Ok(())
    }

    /// Delete the record for this script name
    pub fn delete(conn: &Connection, name: &str) -> Result<()> {
        let changed = conn.execute("DELETE FROM scripts WHERE name = ?1", [name])?;
        if changed == 0 {
            return Err(Error::NotFoundError(format!(
                "Script '{name}' is not installed"
            )));
        }
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        let patterns_json: String = row.get(3)?;
        // Tolerate hand-edited rows: a bad JSON column reads as no patterns
        let context_patterns = serde_json::from_str(&patterns_json).unwrap_or_default();

        Ok(Self {
            name: row.get(0)?,
            version: row.get(1)?,
            code: row.get(2)?,
            context_patterns,
            has_config: row.get::<_, i32>(4)? != 0,
            active: row.get::<_, i32>(5)? != 0,
            suspended: row.get::<_, i32>(6)? != 0,
            origin_owner: row.get(7)?,
            origin_name: row.get(8)?,
            sha256: row.get(9)?,
            installed_at: row.get(10)?,
            updated_at: row.get(11)?,
        })
    }
}
