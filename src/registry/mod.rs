// src/registry/mod.rs

//! Registry access and catalog aggregation
//!
//! This module provides functionality for:
//! - Fetching catalog documents and script payloads from registries
//! - Aggregating per-registry catalogs into one de-duplicated view
//! - Caching the aggregated catalog for a short interval
//! - Gating access by registry authorization and suspending scripts
//!   whose registry access has been lost

pub mod aggregator;
pub mod auth;
pub mod catalog;
pub mod client;

pub use aggregator::{AggregatedCatalog, CatalogCache, aggregate, merge_catalogs, CATALOG_TTL};
pub use auth::{AccessSnapshot, SuspensionChanges, check_primary, record_fetch_outcomes, sync_suspensions};
pub use catalog::{CatalogEntry, DEFAULT_CATEGORY, parse_catalog, parse_payload_name};
pub use client::{AccessProbe, RegistryClient, RegistrySource};
