// src/db/models/meta.rs

//! Small persisted key/value pairs
//!
//! Holds bookkeeping values such as the timestamp of the last background
//! update check and the pending "update available" signal.

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

pub struct Meta;

impl Meta {
    pub const LAST_UPDATE_CHECK: &'static str = "last_update_check";
    pub const UPDATE_AVAILABLE: &'static str = "update_available";

    pub fn get(conn: &Connection, key: &str) -> Result<Option<String>> {
        let value = conn
            .query_row("SELECT value FROM meta WHERE key = ?1", [key], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(value)
    }

    pub fn set(conn: &Connection, key: &str, value: &str) -> Result<()> {
        conn.execute(
            "INSERT INTO meta (key, value) VALUES (?1, ?2)
             ON CONFLICT (key) DO UPDATE SET value = excluded.value",
            [key, value],
        )?;
        Ok(())
    }

    pub fn delete(conn: &Connection, key: &str) -> Result<()> {
        conn.execute("DELETE FROM meta WHERE key = ?1", [key])?;
        Ok(())
    }

    /// Convenience for boolean-valued keys
    pub fn get_flag(conn: &Connection, key: &str) -> Result<bool> {
        Ok(Self::get(conn, key)?.as_deref() == Some("true"))
    }

    pub fn set_flag(conn: &Connection, key: &str, value: bool) -> Result<()> {
        Self::set(conn, key, if value { "true" } else { "false" })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;

    #[test]
    fn test_set_get_overwrite() {
        let conn = db::open_in_memory().unwrap();
        assert_eq!(Meta::get(&conn, "k").unwrap(), None);

        Meta::set(&conn, "k", "v1").unwrap();
        Meta::set(&conn, "k", "v2").unwrap();
        assert_eq!(Meta::get(&conn, "k").unwrap().as_deref(), Some("v2"));
    }

    #[test]
    fn test_flags() {
        let conn = db::open_in_memory().unwrap();
        assert!(!Meta::get_flag(&conn, Meta::UPDATE_AVAILABLE).unwrap());

        Meta::set_flag(&conn, Meta::UPDATE_AVAILABLE, true).unwrap();
        assert!(Meta::get_flag(&conn, Meta::UPDATE_AVAILABLE).unwrap());

        Meta::set_flag(&conn, Meta::UPDATE_AVAILABLE, false).unwrap();
        assert!(!Meta::get_flag(&conn, Meta::UPDATE_AVAILABLE).unwrap());
    }
}
