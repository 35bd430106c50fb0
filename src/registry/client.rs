// src/registry/client.rs

//! HTTP client for registry operations
//!
//! Wraps reqwest's blocking client with bounded retries for fetching
//! catalog documents and raw script payloads from GitHub-compatible
//! registries, optionally authenticated with a per-registry token.

use crate::db::models::Registry;
use crate::error::{Error, Result};
use crate::registry::catalog::{self, CatalogEntry};
use base64::Engine;
use reqwest::StatusCode;
use reqwest::blocking::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

/// Default timeout for HTTP requests (30 seconds)
const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Maximum retry attempts for transient network failures
const MAX_RETRIES: u32 = 3;

/// Retry delay in milliseconds
const RETRY_DELAY_MS: u64 = 1000;

/// Catalog document file name within a registry
const CATALOG_FILE: &str = "manifest.json";

/// Result of probing a registry for access
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessProbe {
    /// Registry reachable and the request was accepted
    Ok,
    /// Registry rejected the request for authorization reasons
    Denied,
    /// Network-level failure; treated as fail-open
    Unreachable,
}

/// Abstraction over registry transport
///
/// The aggregator, committer, and authorization gate all consume this trait
/// rather than a concrete client, so tests can substitute an in-memory
/// source and never touch the network.
pub trait RegistrySource: Sync {
    /// Fetch and parse one registry's catalog document
    fn fetch_catalog(&self, registry: &Registry) -> Result<Vec<CatalogEntry>>;

    /// Fetch a raw script payload by its catalog reference
    fn fetch_payload(&self, registry: &Registry, payload_ref: &str) -> Result<Vec<u8>>;

    /// Probe whether the registry currently accepts our credentials
    fn probe_access(&self, registry: &Registry) -> AccessProbe;
}

/// Contents-API response body for a single file
#[derive(Debug, Deserialize)]
struct ContentsResponse {
    content: Option<String>,
}

/// Repository metadata returned by the API root
#[derive(Debug, Deserialize)]
struct RepoResponse {
    default_branch: Option<String>,
}

/// HTTP registry client with retry support
pub struct RegistryClient {
    client: Client,
    api_base: String,
    raw_base: String,
    max_retries: u32,
    branch_cache: Mutex<HashMap<String, String>>,
}

impl RegistryClient {
    /// Create a client against the default public endpoints
    pub fn new() -> Result<Self> {
        Self::with_endpoints("https://api.github.com", "https://raw.githubusercontent.com")
    }

    /// Create a client against explicit API and raw-content endpoints
    pub fn with_endpoints(api_base: &str, raw_base: &str) -> Result<Self> {
        for endpoint in [api_base, raw_base] {
            Url::parse(endpoint).map_err(|e| {
                Error::InitError(format!("Invalid registry endpoint '{endpoint}': {e}"))
            })?;
        }

        let client = Client::builder()
            .timeout(HTTP_TIMEOUT)
            .user_agent(concat!("scriptman/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| Error::InitError(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            api_base: api_base.trim_end_matches('/').to_string(),
            raw_base: raw_base.trim_end_matches('/').to_string(),
            max_retries: MAX_RETRIES,
            branch_cache: Mutex::new(HashMap::new()),
        })
    }

    /// GET a URL with optional token auth, retrying transient failures
    ///
    /// Authorization rejections are returned immediately without retry.
    fn get_with_retry(&self, url: &str, token: Option<&str>) -> Result<(StatusCode, Vec<u8>)> {
        let mut attempt = 0;
        loop {
            attempt += 1;
            let mut request = self.client.get(url);
            if let Some(token) = token {
                request = request.header("Authorization", format!("token {token}"));
            }

            match request.send() {
                Ok(response) => {
                    let status = response.status();
                    let body = response.bytes().map_err(|e| {
                        Error::DownloadError(format!("Failed to read response from {url}: {e}"))
                    })?;
                    return Ok((status, body.to_vec()));
                }
                Err(e) => {
                    if attempt >= self.max_retries {
                        return Err(Error::DownloadError(format!(
                            "Failed to fetch {url} after {attempt} attempts: {e}"
                        )));
                    }
                    warn!("Fetch attempt {} for {} failed: {}, retrying...", attempt, url, e);
                    std::thread::sleep(Duration::from_millis(RETRY_DELAY_MS * attempt as u64));
                }
            }
        }
    }

    /// Look up the registry's default branch, cached per registry
    fn default_branch(&self, registry: &Registry) -> String {
        let key = registry.ident().to_string();
        if let Some(branch) = self.branch_cache.lock().unwrap().get(&key) {
            return branch.clone();
        }

        let url = format!("{}/repos/{}/{}", self.api_base, registry.owner, registry.name);
        let branch = match self.get_with_retry(&url, registry.token.as_deref()) {
            Ok((status, body)) if status.is_success() => {
                serde_json::from_slice::<RepoResponse>(&body)
                    .ok()
                    .and_then(|r| r.default_branch)
                    .unwrap_or_else(|| "main".to_string())
            }
            _ => "main".to_string(),
        };

        self.branch_cache
            .lock()
            .unwrap()
            .insert(key, branch.clone());
        branch
    }

    /// Fetch a file through the contents API, decoding the base64 body
    fn fetch_api_file(&self, registry: &Registry, path: &str) -> Result<String> {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, registry.owner, registry.name, path
        );
        let (status, body) = self.get_with_retry(&url, registry.token.as_deref())?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::AuthError(format!(
                "Registry {} rejected credentials (HTTP {status})",
                registry.ident()
            )));
        }
        if !status.is_success() {
            return Err(Error::DownloadError(format!(
                "HTTP {status} from {url}"
            )));
        }

        let contents: ContentsResponse = serde_json::from_slice(&body)
            .map_err(|e| Error::ParseError(format!("Malformed contents response: {e}")))?;
        let encoded = contents
            .content
            .ok_or_else(|| Error::ParseError(format!("No content field in {url}")))?;

        // The API wraps base64 bodies at 60 columns
        let stripped: String = encoded.chars().filter(|c| !c.is_whitespace()).collect();
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(&stripped)
            .map_err(|e| Error::ParseError(format!("Invalid base64 content from {url}: {e}")))?;

        String::from_utf8(decoded)
            .map_err(|e| Error::ParseError(format!("Invalid UTF-8 content from {url}: {e}")))
    }

    /// Fetch a file from the raw-content endpoint
    fn fetch_raw_file(&self, registry: &Registry, path: &str) -> Result<Vec<u8>> {
        let branch = self.default_branch(registry);
        let url = format!(
            "{}/{}/{}/{}/{}",
            self.raw_base, registry.owner, registry.name, branch, path
        );
        let (status, body) = self.get_with_retry(&url, registry.token.as_deref())?;

        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(Error::AuthError(format!(
                "Registry {} rejected credentials (HTTP {status})",
                registry.ident()
            )));
        }
        if !status.is_success() {
            return Err(Error::DownloadError(format!("HTTP {status} from {url}")));
        }

        Ok(body)
    }
}

impl RegistrySource for RegistryClient {
    fn fetch_catalog(&self, registry: &Registry) -> Result<Vec<CatalogEntry>> {
        debug!("Fetching catalog from {}", registry.ident());

        // Prefer the contents API (works on private registries with a
        // token); fall back to the raw endpoint for public ones.
        let document = match self.fetch_api_file(registry, CATALOG_FILE) {
            Ok(doc) => doc,
            Err(Error::AuthError(msg)) => return Err(Error::AuthError(msg)),
            Err(e) => {
                debug!(
                    "Contents API fetch failed for {} ({}), trying raw endpoint",
                    registry.ident(),
                    e
                );
                let bytes = self.fetch_raw_file(registry, CATALOG_FILE)?;
                String::from_utf8(bytes).map_err(|e| {
                    Error::ParseError(format!("Invalid UTF-8 catalog document: {e}"))
                })?
            }
        };

        let entries = catalog::parse_catalog(&document, &registry.ident())?;
        info!(
            "Fetched {} catalog entries from {}",
            entries.len(),
            registry.ident()
        );
        Ok(entries)
    }

    fn fetch_payload(&self, registry: &Registry, payload_ref: &str) -> Result<Vec<u8>> {
        debug!("Fetching payload {} from {}", payload_ref, registry.ident());
        self.fetch_raw_file(registry, payload_ref)
    }

    fn probe_access(&self, registry: &Registry) -> AccessProbe {
        let url = format!(
            "{}/repos/{}/{}/contents/{}",
            self.api_base, registry.owner, registry.name, CATALOG_FILE
        );

        let mut request = self.client.get(&url);
        if let Some(token) = registry.token.as_deref() {
            request = request.header("Authorization", format!("token {token}"));
        }

        match request.send() {
            Ok(response) => match response.status() {
                s if s.is_success() => AccessProbe::Ok,
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN | StatusCode::NOT_FOUND => {
                    AccessProbe::Denied
                }
                _ => AccessProbe::Unreachable,
            },
            Err(_) => AccessProbe::Unreachable,
        }
    }
}
