// src/db/mod.rs

//! Local script store
//!
//! SQLite-backed persistence for installed scripts, configured registries,
//! per-script settings, and small bookkeeping values. All state lives in the
//! database; there are no config files.

use crate::error::{Error, Result};
use rusqlite::Connection;
use std::path::PathBuf;

pub mod models;
pub mod schema;

/// Default database location under the user's data directory
pub fn default_db_path() -> String {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("scriptman")
        .join("scriptman.db")
        .to_string_lossy()
        .into_owned()
}

/// Open an existing database, applying any pending migrations
pub fn open(db_path: &str) -> Result<Connection> {
    let conn = Connection::open(db_path)
        .map_err(|e| Error::InitError(format!("Failed to open database {db_path}: {e}")))?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Initialize a new database at the given path
///
/// Creates parent directories as needed. Idempotent: re-running against an
/// existing database only applies pending migrations.
pub fn init(db_path: &str) -> Result<Connection> {
    if let Some(parent) = std::path::Path::new(db_path).parent() {
        std::fs::create_dir_all(parent).map_err(|e| {
            Error::IoError(format!(
                "Failed to create directory {}: {e}",
                parent.display()
            ))
        })?;
    }
    open(db_path)
}

/// Open an in-memory database with the full schema, for tests
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    conn.execute("PRAGMA foreign_keys = ON", [])?;
    schema::migrate(&conn)?;
    Ok(conn)
}

/// Get current timestamp as an RFC 3339 string
pub fn current_timestamp() -> String {
    chrono::Utc::now().to_rfc3339()
}

/// Parse an RFC 3339 timestamp to Unix seconds
pub fn parse_timestamp(timestamp: &str) -> Result<i64> {
    let dt = chrono::DateTime::parse_from_rfc3339(timestamp)
        .map_err(|e| Error::ParseError(format!("Invalid timestamp '{timestamp}': {e}")))?;
    Ok(dt.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_in_memory_migrates() {
        let conn = open_in_memory().unwrap();
        let version = schema::get_schema_version(&conn).unwrap();
        assert_eq!(version, schema::SCHEMA_VERSION);
    }

    #[test]
    fn test_timestamp_roundtrip() {
        let ts = current_timestamp();
        let secs = parse_timestamp(&ts).unwrap();
        let now = chrono::Utc::now().timestamp();
        assert!((now - secs).abs() < 5);
    }

    #[test]
    fn test_init_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("scripts.db");
        let conn = init(path.to_str().unwrap()).unwrap();
        drop(conn);
        assert!(path.exists());
    }
}
