// src/registry/aggregator.rs

//! Catalog aggregation across registries
//!
//! Fans out one fetch per configured registry concurrently, then merges the
//! per-registry catalogs into a single de-duplicated set keyed by script
//! name. A registry that fails contributes an empty list; its failure never
//! aborts aggregation of the others. The merged result is cached for a
//! short interval so repeated lookups do not refetch.

use crate::db::models::{Registry, RegistryId};
use crate::registry::catalog::CatalogEntry;
use crate::registry::client::RegistrySource;
use rayon::prelude::*;
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// How long an aggregated catalog stays fresh
pub const CATALOG_TTL: Duration = Duration::from_secs(60);

/// Outcome of one aggregation pass
#[derive(Debug, Clone, Default)]
pub struct AggregatedCatalog {
    /// Merged, de-duplicated entries sorted by name
    pub entries: Vec<CatalogEntry>,
    /// Registries whose fetch was rejected for authorization reasons
    pub auth_failures: Vec<RegistryId>,
    /// Registries that succeeded (their auth flag can be cleared)
    pub reachable: Vec<RegistryId>,
    /// Non-auth failures, kept for reporting
    pub failures: Vec<(RegistryId, String)>,
}

/// Fetch every registry's catalog concurrently and merge the results
pub fn aggregate(source: &dyn RegistrySource, registries: &[Registry]) -> AggregatedCatalog {
    // One fetch per registry, in parallel; collect preserves the
    // configuration order needed for the merge tie-break.
    let results: Vec<(RegistryId, crate::error::Result<Vec<CatalogEntry>>)> = registries
        .par_iter()
        .map(|registry| (registry.ident(), source.fetch_catalog(registry)))
        .collect();

    let mut outcome = AggregatedCatalog::default();
    let mut per_registry = Vec::with_capacity(results.len());

    for (ident, result) in results {
        match result {
            Ok(entries) => {
                outcome.reachable.push(ident);
                per_registry.push(entries);
            }
            Err(crate::error::Error::AuthError(msg)) => {
                warn!("Registry {} authorization failed: {}", ident, msg);
                outcome.auth_failures.push(ident);
                per_registry.push(Vec::new());
            }
            Err(e) => {
                warn!("Registry {} fetch failed: {}", ident, e);
                outcome.failures.push((ident, e.to_string()));
                per_registry.push(Vec::new());
            }
        }
    }

    outcome.entries = merge_catalogs(per_registry);
    info!(
        "Aggregated {} unique scripts from {} registries",
        outcome.entries.len(),
        registries.len()
    );
    outcome
}

/// Merge per-registry catalogs into one de-duplicated list
///
/// For a name published by more than one registry, the entry with the
/// higher version wins; on a version tie the entry from the earlier
/// registry in configuration order is kept. Output is sorted by name so
/// merging the same inputs always yields the same result.
pub fn merge_catalogs(per_registry: Vec<Vec<CatalogEntry>>) -> Vec<CatalogEntry> {
    let mut merged: HashMap<String, CatalogEntry> = HashMap::new();

    for entries in per_registry {
        for entry in entries {
            match merged.get(&entry.name) {
                Some(existing) if entry.version > existing.version => {
                    debug!(
                        "Catalog merge: {} {} from {} supersedes {} from {}",
                        entry.name,
                        entry.version,
                        entry.origin,
                        existing.version,
                        existing.origin
                    );
                    merged.insert(entry.name.clone(), entry);
                }
                Some(_) => {}
                None => {
                    merged.insert(entry.name.clone(), entry);
                }
            }
        }
    }

    let mut entries: Vec<CatalogEntry> = merged.into_values().collect();
    entries.sort_by(|a, b| a.name.cmp(&b.name));
    entries
}

/// TTL cache in front of the aggregator
///
/// Session-scoped: one cache per running command or embedding session, no
/// module-level state. An explicit refresh bypasses and repopulates it.
pub struct CatalogCache {
    cached: Option<(AggregatedCatalog, Instant)>,
    ttl: Duration,
}

impl Default for CatalogCache {
    fn default() -> Self {
        Self::new()
    }
}

impl CatalogCache {
    pub fn new() -> Self {
        Self {
            cached: None,
            ttl: CATALOG_TTL,
        }
    }

    #[cfg(test)]
    pub fn with_ttl(ttl: Duration) -> Self {
        Self { cached: None, ttl }
    }

    /// Get the aggregated catalog, refetching when stale or forced
    pub fn get(
        &mut self,
        source: &dyn RegistrySource,
        registries: &[Registry],
        force_refresh: bool,
    ) -> &AggregatedCatalog {
        let stale = match &self.cached {
            Some((_, fetched_at)) => fetched_at.elapsed() > self.ttl,
            None => true,
        };

        if force_refresh || stale {
            let outcome = aggregate(source, registries);
            self.cached = Some((outcome, Instant::now()));
        }

        &self.cached.as_ref().unwrap().0
    }

    /// Drop any cached result
    pub fn invalidate(&mut self) {
        self.cached = None;
    }
}
