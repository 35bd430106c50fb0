// src/registry/catalog.rs

//! Catalog documents and entries
//!
//! Each registry publishes a catalog: a JSON list of the script packages it
//! offers. Entries are validated individually; a malformed entry is skipped
//! without discarding the rest of the document. The merged, de-duplicated
//! view across all registries is built in the aggregator.

use crate::db::models::RegistryId;
use crate::error::{Error, Result};
use crate::version::ScriptVersion;
use regex::Regex;
use serde::Deserialize;
use tracing::warn;

/// Fallback category for entries that declare none
pub const DEFAULT_CATEGORY: &str = "uncategorized";

/// A validated catalog entry from one registry
///
/// Ephemeral: rebuilt on every refresh, never persisted.
#[derive(Debug, Clone)]
pub struct CatalogEntry {
    pub name: String,
    pub version: ScriptVersion,
    pub payload_ref: String,
    pub categories: Vec<String>,
    pub description: String,
    pub changelog: String,
    pub origin: RegistryId,
}

/// Raw catalog entry as published, before validation
#[derive(Debug, Deserialize)]
struct RawEntry {
    name: Option<String>,
    version: Option<String>,
    #[serde(alias = "fileName")]
    file: Option<String>,
    categories: Option<Vec<String>>,
    description: Option<String>,
    changelog: Option<String>,
}

/// Parse the payload naming convention `<name>.v<major>.<minor>.<patch>.<ext>`
///
/// Returns the embedded script name and version, or None when the file name
/// does not follow the convention.
pub fn parse_payload_name(file_name: &str) -> Option<(String, ScriptVersion)> {
    let re = Regex::new(r"^(.+)\.v(\d+\.\d+\.\d+)\.[A-Za-z0-9_.-]+$").unwrap();
    let caps = re.captures(file_name)?;
    Some((caps[1].to_string(), ScriptVersion::parse(&caps[2])))
}

/// Parse a registry's catalog document
///
/// The document must be a JSON array. Per-entry validation: the name comes
/// from the entry or the payload file name; the version is authoritative
/// from the entry, with the file name as fallback; the payload reference is
/// required. Entries failing validation are skipped with a warning.
pub fn parse_catalog(document: &str, origin: &RegistryId) -> Result<Vec<CatalogEntry>> {
    let raw: Vec<RawEntry> = serde_json::from_str(document).map_err(|e| {
        Error::ParseError(format!("Malformed catalog document from {origin}: {e}"))
    })?;

    let mut entries = Vec::with_capacity(raw.len());
    for item in raw {
        match validate_entry(item, origin) {
            Some(entry) => entries.push(entry),
            None => warn!("Skipping malformed catalog entry from {}", origin),
        }
    }

    Ok(entries)
}

fn validate_entry(raw: RawEntry, origin: &RegistryId) -> Option<CatalogEntry> {
    let payload_ref = raw.file?;
    let from_file = parse_payload_name(&payload_ref);

    let name = raw
        .name
        .or_else(|| from_file.as_ref().map(|(n, _)| n.clone()))?;
    let version = raw
        .version
        .map(|v| ScriptVersion::parse(&v))
        .or_else(|| from_file.map(|(_, v)| v))?;

    let categories = match raw.categories {
        Some(cats) if !cats.is_empty() => cats,
        _ => vec![DEFAULT_CATEGORY.to_string()],
    };

    Some(CatalogEntry {
        name,
        version,
        payload_ref,
        categories,
        description: raw.description.unwrap_or_default(),
        changelog: raw.changelog.unwrap_or_default(),
        origin: origin.clone(),
    })
}
