// src/manager.rs

//! Manager context
//!
//! Ties the store connection, a registry source, and the catalog cache
//! into one explicit value threaded through aggregation, reconciliation,
//! and commits. There is no module-level state, so several managers can
//! coexist in one process (tests, embedders) without interfering.

use crate::db;
use crate::db::models::{InstalledScript, Registry};
use crate::error::Result;
use crate::lifecycle::commit::CommitOutcome;
use crate::lifecycle::session::Session;
use crate::lifecycle::state::{ScriptStatus, reconcile};
use crate::lifecycle::{commit, updates};
use crate::registry::aggregator::{AggregatedCatalog, CatalogCache};
use crate::registry::auth::{self, AccessSnapshot};
use crate::registry::client::RegistrySource;
use indicatif::ProgressBar;
use rusqlite::Connection;

pub struct Manager {
    conn: Connection,
    source: Box<dyn RegistrySource>,
    cache: CatalogCache,
}

impl Manager {
    /// Open the store and wrap it with a registry source
    pub fn open(db_path: &str, source: Box<dyn RegistrySource>) -> Result<Self> {
        let conn = db::open(db_path)?;
        Ok(Self::with_connection(conn, source))
    }

    /// Build a manager over an existing connection (tests, embedders)
    pub fn with_connection(conn: Connection, source: Box<dyn RegistrySource>) -> Self {
        Self {
            conn,
            source,
            cache: CatalogCache::new(),
        }
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Give the connection back, e.g. to re-wrap it with another source
    pub fn into_connection(self) -> Connection {
        self.conn
    }

    /// Verify primary registry access; a denial blocks everything else
    pub fn startup_check(&self) -> Result<()> {
        auth::check_primary(&self.conn, self.source.as_ref())
    }

    /// Apply authorization gating from the stored registry flags alone
    ///
    /// Used on the dispatch path, which must not depend on the network
    /// beyond the primary probe: suspension and healing both derive from
    /// the flags already on file.
    pub fn sync_authorization(&self) -> Result<auth::SuspensionChanges> {
        let registries = Registry::list_all(&self.conn)?;
        let access = AccessSnapshot::from_registries(&registries);
        auth::sync_suspensions(&self.conn, &access)
    }

    /// Aggregate catalogs, apply authorization side effects, and derive
    /// the current lifecycle state of every known script
    pub fn snapshot(&mut self, force_refresh: bool) -> Result<Vec<ScriptStatus>> {
        let registries = Registry::list_all(&self.conn)?;
        let outcome = self
            .cache
            .get(self.source.as_ref(), &registries, force_refresh)
            .clone();

        auth::record_fetch_outcomes(&self.conn, &outcome)?;

        // Re-read the registries: the fetch outcomes may have changed
        // their authorization flags.
        let registries = Registry::list_all(&self.conn)?;
        let access = AccessSnapshot::from_registries(&registries);
        auth::sync_suspensions(&self.conn, &access)?;

        let installed = InstalledScript::list_all(&self.conn)?;
        Ok(reconcile(&outcome.entries, &installed, &access))
    }

    /// The aggregation outcome itself, for registry-level reporting
    pub fn aggregate(&mut self, force_refresh: bool) -> Result<AggregatedCatalog> {
        let registries = Registry::list_all(&self.conn)?;
        let outcome = self
            .cache
            .get(self.source.as_ref(), &registries, force_refresh)
            .clone();
        auth::record_fetch_outcomes(&self.conn, &outcome)?;
        Ok(outcome)
    }

    /// Start a target-state session over a fresh snapshot
    pub fn session(&mut self, force_refresh: bool) -> Result<Session> {
        Ok(Session::new(self.snapshot(force_refresh)?))
    }

    /// Commit a session's staged changes, then re-derive states from the
    /// store, which is the source of truth after a commit
    pub fn commit(
        &mut self,
        session: &Session,
        progress: Option<&ProgressBar>,
    ) -> Result<(CommitOutcome, Vec<ScriptStatus>)> {
        let outcome = commit::commit(&self.conn, self.source.as_ref(), session, progress)?;
        let statuses = self.snapshot(false)?;
        Ok((outcome, statuses))
    }

    /// All installed scripts as currently persisted
    pub fn installed(&self) -> Result<Vec<InstalledScript>> {
        InstalledScript::list_all(&self.conn)
    }

    /// Best-effort, rate-limited background update check
    pub fn check_updates_in_background(&self) -> bool {
        updates::check_updates_in_background(&self.conn, self.source.as_ref())
    }
}
