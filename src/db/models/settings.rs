// src/db/models/settings.rs

//! Per-script settings storage
//!
//! Settings are an opaque JSON object keyed by script name, seeded from the
//! payload's `@config` defaults at install time and deleted together with
//! the script on uninstall.

use crate::db::current_timestamp;
use crate::error::{Error, Result};
use rusqlite::{Connection, OptionalExtension, params};

#[derive(Debug, Clone)]
pub struct ScriptSettings {
    pub script: String,
    pub data: serde_json::Value,
}

impl ScriptSettings {
    /// Load settings for a script, if any exist
    pub fn find(conn: &Connection, script: &str) -> Result<Option<Self>> {
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM script_settings WHERE script = ?1",
                [script],
                |row| row.get(0),
            )
            .optional()?;

        match raw {
            Some(json) => {
                let data = serde_json::from_str(&json).map_err(|e| {
                    Error::ParseError(format!("Corrupt settings for '{script}': {e}"))
                })?;
                Ok(Some(Self {
                    script: script.to_string(),
                    data,
                }))
            }
            None => Ok(None),
        }
    }

    /// Insert or overwrite settings for a script
    pub fn put(conn: &Connection, script: &str, data: &serde_json::Value) -> Result<()> {
        let json = serde_json::to_string(data)
            .map_err(|e| Error::ParseError(format!("Failed to encode settings: {e}")))?;

        conn.execute(
            "INSERT INTO script_settings (script, data, updated_at) VALUES (?1, ?2, ?3)
             ON CONFLICT (script) DO UPDATE SET
                 data = excluded.data,
                 updated_at = excluded.updated_at",
            params![script, json, current_timestamp()],
        )?;

        Ok(())
    }

    /// Delete settings for a script; silent if none exist
    pub fn delete(conn: &Connection, script: &str) -> Result<()> {
        conn.execute("DELETE FROM script_settings WHERE script = ?1", [script])?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db;
    use serde_json::json;

    #[test]
    fn test_put_and_find() {
        let conn = db::open_in_memory().unwrap();
        ScriptSettings::put(&conn, "greeter", &json!({"interval": 30})).unwrap();

        let loaded = ScriptSettings::find(&conn, "greeter").unwrap().unwrap();
        assert_eq!(loaded.data, json!({"interval": 30}));
    }

    #[test]
    fn test_put_overwrites() {
        let conn = db::open_in_memory().unwrap();
        ScriptSettings::put(&conn, "greeter", &json!({"interval": 30})).unwrap();
        ScriptSettings::put(&conn, "greeter", &json!({"interval": 60})).unwrap();

        let loaded = ScriptSettings::find(&conn, "greeter").unwrap().unwrap();
        assert_eq!(loaded.data, json!({"interval": 60}));
    }

    #[test]
    fn test_delete_is_silent_when_absent() {
        let conn = db::open_in_memory().unwrap();
        ScriptSettings::delete(&conn, "ghost").unwrap();
        assert!(ScriptSettings::find(&conn, "ghost").unwrap().is_none());
    }
}
