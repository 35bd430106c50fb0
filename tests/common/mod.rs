// tests/common/mod.rs
//! Shared test fixtures: an in-memory registry source and store setup

use rusqlite::Connection;
use scriptman::db;
use scriptman::db::models::{Registry, RegistryId};
use scriptman::registry::{AccessProbe, RegistrySource};
use scriptman::{CatalogEntry, Manager, Result, ScriptVersion};
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;

/// One published script in a fake registry
#[derive(Debug, Clone)]
pub struct Published {
    pub name: String,
    pub version: String,
    pub payload: String,
}

impl Published {
    pub fn new(name: &str, version: &str, payload: &str) -> Self {
        Self {
            name: name.to_string(),
            version: version.to_string(),
            payload: payload.to_string(),
        }
    }

    fn payload_ref(&self) -> String {
        format!("{}.v{}.sh", self.name, self.version)
    }
}

/// In-memory registry source serving canned catalogs and payloads
#[derive(Default)]
pub struct MockRegistries {
    catalogs: HashMap<RegistryId, Vec<Published>>,
    /// Registries that reject every request for authorization reasons
    denied: HashSet<RegistryId>,
    /// Registries that are unreachable at the network level
    offline: HashSet<RegistryId>,
    /// Payload refs that fail to download even though listed
    broken_payloads: HashSet<String>,
    pub fetch_log: Mutex<Vec<String>>,
}

impl MockRegistries {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn publish(mut self, owner: &str, scripts: Vec<Published>) -> Self {
        self.catalogs
            .insert(RegistryId::new(owner, "scripts"), scripts);
        self
    }

    pub fn deny(mut self, owner: &str) -> Self {
        self.denied.insert(RegistryId::new(owner, "scripts"));
        self
    }

    pub fn offline(mut self, owner: &str) -> Self {
        self.offline.insert(RegistryId::new(owner, "scripts"));
        self
    }

    pub fn break_payload(mut self, payload_ref: &str) -> Self {
        self.broken_payloads.insert(payload_ref.to_string());
        self
    }
}

impl RegistrySource for MockRegistries {
    fn fetch_catalog(&self, registry: &Registry) -> Result<Vec<CatalogEntry>> {
        let ident = registry.ident();
        self.fetch_log
            .lock()
            .unwrap()
            .push(format!("catalog {ident}"));

        if self.denied.contains(&ident) {
            return Err(scriptman::Error::AuthError(format!(
                "{ident} rejected credentials"
            )));
        }
        if self.offline.contains(&ident) {
            return Err(scriptman::Error::DownloadError(format!(
                "{ident} unreachable"
            )));
        }

        let published = self.catalogs.get(&ident).cloned().unwrap_or_default();
        Ok(published
            .into_iter()
            .map(|p| CatalogEntry {
                name: p.name.clone(),
                version: ScriptVersion::parse(&p.version),
                payload_ref: p.payload_ref(),
                categories: vec!["tools".to_string()],
                description: String::new(),
                changelog: String::new(),
                origin: ident.clone(),
            })
            .collect())
    }

    fn fetch_payload(&self, registry: &Registry, payload_ref: &str) -> Result<Vec<u8>> {
        let ident = registry.ident();
        if self.denied.contains(&ident) {
            return Err(scriptman::Error::AuthError(format!(
                "{ident} rejected credentials"
            )));
        }
        if self.broken_payloads.contains(payload_ref) {
            return Err(scriptman::Error::DownloadError(format!(
                "payload {payload_ref} missing"
            )));
        }

        self.catalogs
            .get(&ident)
            .and_then(|scripts| scripts.iter().find(|p| p.payload_ref() == payload_ref))
            .map(|p| p.payload.clone().into_bytes())
            .ok_or_else(|| {
                scriptman::Error::DownloadError(format!("payload {payload_ref} not published"))
            })
    }

    fn probe_access(&self, registry: &Registry) -> AccessProbe {
        let ident = registry.ident();
        if self.denied.contains(&ident) {
            AccessProbe::Denied
        } else if self.offline.contains(&ident) {
            AccessProbe::Unreachable
        } else {
            AccessProbe::Ok
        }
    }
}

/// Fresh in-memory store with the given registry owners configured
///
/// The first owner becomes the primary registry. Each registry is named
/// `<owner>/scripts`.
pub fn store_with_registries(owners: &[&str]) -> Connection {
    let conn = db::open_in_memory().unwrap();
    for (i, owner) in owners.iter().enumerate() {
        let mut registry = Registry::new(
            RegistryId::new(*owner, "scripts"),
            format!("{owner} scripts"),
        );
        registry.is_primary = i == 0;
        registry.insert(&conn).unwrap();
    }
    conn
}

/// Manager over a fresh store and the given mock source
pub fn manager_with(owners: &[&str], source: MockRegistries) -> Manager {
    let conn = store_with_registries(owners);
    Manager::with_connection(conn, Box::new(source))
}
