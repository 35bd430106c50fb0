// src/db/models/registry.rs

//! Registry model - a configured remote source of script packages

use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::fmt;
use std::str::FromStr;

/// Identity of a registry: an owner plus a repository name
///
/// Stable across refreshes; installed scripts record the identity of the
/// registry they came from.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RegistryId {
    pub owner: String,
    pub name: String,
}

impl RegistryId {
    pub fn new(owner: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            name: name.into(),
        }
    }
}

impl fmt::Display for RegistryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

impl FromStr for RegistryId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.split_once('/') {
            Some((owner, name)) if !owner.is_empty() && !name.is_empty() => {
                Ok(Self::new(owner, name))
            }
            _ => Err(Error::ParseError(format!(
                "Invalid registry identifier '{s}': expected <owner>/<name>"
            ))),
        }
    }
}

/// A configured registry
///
/// Registries form an ordered list; the position drives the merge
/// tie-break when two registries publish the same script at the same
/// version. Exactly one registry is primary.
#[derive(Debug, Clone)]
pub struct Registry {
    pub id: Option<i64>,
    pub owner: String,
    pub name: String,
    pub token: Option<String>,
    pub label: String,
    pub is_primary: bool,
    pub position: i64,
    pub auth_failed: bool,
    pub added_at: Option<String>,
}

impl Registry {
    pub fn new(ident: RegistryId, label: String) -> Self {
        Self {
            id: None,
            owner: ident.owner,
            name: ident.name,
            token: None,
            label,
            is_primary: false,
            position: 0,
            auth_failed: false,
            added_at: None,
        }
    }

    pub fn ident(&self) -> RegistryId {
        RegistryId::new(self.owner.clone(), self.name.clone())
    }

    /// Insert this registry at the end of the configuration order
    pub fn insert(&mut self, conn: &Connection) -> Result<i64> {
        let next_position: i64 = conn.query_row(
            "SELECT COALESCE(MAX(position), -1) + 1 FROM registries",
            [],
            |row| row.get(0),
        )?;
        self.position = next_position;

        conn.execute(
            "INSERT INTO registries (owner, name, token, label, is_primary, position, auth_failed)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                &self.owner,
                &self.name,
                &self.token,
                &self.label,
                self.is_primary as i32,
                self.position,
                self.auth_failed as i32,
            ],
        )?;

        let id = conn.last_insert_rowid();
        self.id = Some(id);
        Ok(id)
    }

    /// Find a registry by its owner/name identity
    pub fn find_by_ident(conn: &Connection, ident: &RegistryId) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, owner, name, token, label, is_primary, position, auth_failed, added_at
             FROM registries WHERE owner = ?1 AND name = ?2",
        )?;

        let registry = stmt
            .query_row([&ident.owner, &ident.name], Self::from_row)
            .optional()?;

        Ok(registry)
    }

    /// List all registries in configuration order
    pub fn list_all(conn: &Connection) -> Result<Vec<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, owner, name, token, label, is_primary, position, auth_failed, added_at
             FROM registries ORDER BY position",
        )?;

        let registries = stmt
            .query_map([], Self::from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        Ok(registries)
    }

    /// The primary registry, if one is configured
    pub fn find_primary(conn: &Connection) -> Result<Option<Self>> {
        let mut stmt = conn.prepare(
            "SELECT id, owner, name, token, label, is_primary, position, auth_failed, added_at
             FROM registries WHERE is_primary = 1",
        )?;

        let registry = stmt.query_row([], Self::from_row).optional()?;

        Ok(registry)
    }

    /// Update mutable registry fields
    pub fn update(&self, conn: &Connection) -> Result<()> {
        let id = self
            .id
            .ok_or_else(|| Error::InitError("Cannot update registry without ID".to_string()))?;

        conn.execute(
            "UPDATE registries SET token = ?1, label = ?2, is_primary = ?3, auth_failed = ?4
             WHERE id = ?5",
            params![
                &self.token,
                &self.label,
                self.is_primary as i32,
                self.auth_failed as i32,
                id,
            ],
        )?;

        Ok(())
    }

    /// Make this registry the single primary
    pub fn set_primary(conn: &Connection, ident: &RegistryId) -> Result<()> {
        conn.execute("UPDATE registries SET is_primary = 0", [])?;
        let changed = conn.execute(
            "UPDATE registries SET is_primary = 1 WHERE owner = ?1 AND name = ?2",
            [&ident.owner, &ident.name],
        )?;
        if changed == 0 {
            return Err(Error::NotFoundError(format!(
                "Registry '{ident}' not found"
            )));
        }
        Ok(())
    }

    /// Store a token and clear any previous authorization failure
    pub fn store_token(conn: &Connection, ident: &RegistryId, token: &str) -> Result<()> {
        let changed = conn.execute(
            "UPDATE registries SET token = ?1, auth_failed = 0 WHERE owner = ?2 AND name = ?3",
            params![token, &ident.owner, &ident.name],
        )?;
        if changed == 0 {
            return Err(Error::NotFoundError(format!(
                "Registry '{ident}' not found"
            )));
        }
        Ok(())
    }

    /// Record whether the last fetch against this registry was rejected
    /// for authorization reasons
    pub fn set_auth_failed(conn: &Connection, ident: &RegistryId, failed: bool) -> Result<()> {
        conn.execute(
            "UPDATE registries SET auth_failed = ?1 WHERE owner = ?2 AND name = ?3",
            params![failed as i32, &ident.owner, &ident.name],
        )?;
        Ok(())
    }

    /// Delete a registry by identity
    pub fn delete(conn: &Connection, ident: &RegistryId) -> Result<()> {
        let changed = conn.execute(
            "DELETE FROM registries WHERE owner = ?1 AND name = ?2",
            [&ident.owner, &ident.name],
        )?;
        if changed == 0 {
            return Err(Error::NotFoundError(format!(
                "Registry '{ident}' not found"
            )));
        }
        Ok(())
    }

    fn from_row(row: &Row) -> rusqlite::Result<Self> {
        Ok(Self {
            id: Some(row.get(0)?),
            owner: row.get(1)?,
            name: row.get(2)?,
            token: row.get(3)?,
            label: row.get(4)?,
            is_primary: row.get::<_, i32>(5)? != 0,
            position: row.get(6)?,
            auth_failed: row.get::<_, i32>(7)? != 0,
            added_at: row.get(8)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_registry_id_parse() {
        let ident: RegistryId = "taskforce/public".parse().unwrap();
        assert_eq!(ident.owner, "taskforce");
        assert_eq!(ident.name, "public");
        assert_eq!(ident.to_string(), "taskforce/public");
    }

    #[test]
    fn test_registry_id_parse_rejects_malformed() {
        assert!("no-slash".parse::<RegistryId>().is_err());
        assert!("/missing-owner".parse::<RegistryId>().is_err());
        assert!("missing-name/".parse::<RegistryId>().is_err());
    }

    #[test]
    fn test_insert_assigns_positions_in_order() {
        let conn = db::open_in_memory().unwrap();
        let mut a = Registry::new(RegistryId::new("alpha", "scripts"), "Alpha".into());
        let mut b = Registry::new(RegistryId::new("beta", "scripts"), "Beta".into());
        a.insert(&conn).unwrap();
        b.insert(&conn).unwrap();

        let all = Registry::list_all(&conn).unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].owner, "alpha");
        assert_eq!(all[1].owner, "beta");
        assert!(all[0].position < all[1].position);
    }

    #[test]
    fn test_set_primary_is_exclusive() {
        let conn = db::open_in_memory().unwrap();
        let mut a = Registry::new(RegistryId::new("alpha", "scripts"), "Alpha".into());
        let mut b = Registry::new(RegistryId::new("beta", "scripts"), "Beta".into());
        a.is_primary = true;
        a.insert(&conn).unwrap();
        b.insert(&conn).unwrap();

        Registry::set_primary(&conn, &RegistryId::new("beta", "scripts")).unwrap();

        let all = Registry::list_all(&conn).unwrap();
        let primaries: Vec<_> = all.iter().filter(|r| r.is_primary).collect();
        assert_eq!(primaries.len(), 1);
        assert_eq!(primaries[0].owner, "beta");
    }

    #[test]
    fn test_store_token_clears_auth_failure() {
        let conn = db::open_in_memory().unwrap();
        let ident = RegistryId::new("alpha", "scripts");
        let mut reg = Registry::new(ident.clone(), "Alpha".into());
        reg.insert(&conn).unwrap();

        Registry::set_auth_failed(&conn, &ident, true).unwrap();
        assert!(
            Registry::find_by_ident(&conn, &ident)
                .unwrap()
                .unwrap()
                .auth_failed
        );

        Registry::store_token(&conn, &ident, "tok-123").unwrap();
        let reg = Registry::find_by_ident(&conn, &ident).unwrap().unwrap();
        assert!(!reg.auth_failed);
        assert_eq!(reg.token.as_deref(), Some("tok-123"));
    }

    #[test]
    fn test_delete_unknown_registry_errors() {
        let conn = db::open_in_memory().unwrap();
        let result = Registry::delete(&conn, &RegistryId::new("ghost", "repo"));
        assert!(result.is_err());
    }
}
