// src/lifecycle/session.rs

//! Target-state tracking for a batch of user intents
//!
//! Each script carries a target state distinct from its derived state.
//! User actions only mutate targets in memory; nothing touches the store
//! until the batch is committed. A session is an explicit value, created
//! from one reconciliation pass, so several sessions can exist in
//! isolation (tests, future embedders) without shared globals.

use crate::error::{Error, Result};
use crate::lifecycle::state::{ScriptState, ScriptStatus};
use std::collections::{BTreeMap, BTreeSet};

/// One entry in the commit work list
#[derive(Debug, Clone)]
pub struct PendingChange {
    pub name: String,
    pub initial: ScriptState,
    pub target: ScriptState,
}

/// In-memory session over one reconciliation snapshot
#[derive(Debug)]
pub struct Session {
    statuses: BTreeMap<String, ScriptStatus>,
    initial: BTreeMap<String, ScriptState>,
    targets: BTreeMap<String, ScriptState>,
    deferred: BTreeSet<String>,
}

impl Session {
    /// Build a session from derived statuses; targets start equal to the
    /// derived states
    pub fn new(statuses: Vec<ScriptStatus>) -> Self {
        let initial: BTreeMap<String, ScriptState> = statuses
            .iter()
            .map(|s| (s.name.clone(), s.state))
            .collect();
        let targets = initial.clone();
        let statuses = statuses.into_iter().map(|s| (s.name.clone(), s)).collect();

        Self {
            statuses,
            initial,
            targets,
            deferred: BTreeSet::new(),
        }
    }

    pub fn status(&self, name: &str) -> Option<&ScriptStatus> {
        self.statuses.get(name)
    }

    pub fn target(&self, name: &str) -> Option<ScriptState> {
        self.targets.get(name).copied()
    }

    fn known(&self, name: &str) -> Result<(ScriptState, ScriptState)> {
        match (self.initial.get(name), self.targets.get(name)) {
            (Some(&initial), Some(&target)) => Ok((initial, target)),
            _ => Err(Error::NotFoundError(format!("Unknown script '{name}'"))),
        }
    }

    /// Toggle a script between its natural pair of states
    ///
    /// Mirrors the one-click cycle: running states toggle to inactive and
    /// back, an uninstalled script toggles its pending install, a pending
    /// uninstall reverts to whatever was targeted before.
    pub fn toggle(&mut self, name: &str) -> Result<ScriptState> {
        let (initial, target) = self.known(name)?;

        let next = match target {
            ScriptState::Active
            | ScriptState::UpdateAvailable
            | ScriptState::DowngradeAvailable => ScriptState::Inactive,
            ScriptState::Inactive => {
                if initial == ScriptState::Inactive {
                    ScriptState::Active
                } else {
                    initial
                }
            }
            ScriptState::NotInstalled => ScriptState::PendingInstall,
            ScriptState::PendingInstall => ScriptState::NotInstalled,
            ScriptState::PendingUninstall => initial,
            ScriptState::Orphaned => {
                return Err(Error::ConflictError(format!(
                    "'{name}' is no longer published; removal is the only valid action"
                )));
            }
            ScriptState::Suspended => {
                return Err(Error::ConflictError(format!(
                    "'{name}' is suspended pending registry authorization"
                )));
            }
        };

        self.targets.insert(name.to_string(), next);
        Ok(next)
    }

    /// Target an uninstalled script for installation
    pub fn mark_install(&mut self, name: &str) -> Result<()> {
        let (_, target) = self.known(name)?;
        match target {
            ScriptState::NotInstalled | ScriptState::PendingInstall => {
                self.targets
                    .insert(name.to_string(), ScriptState::PendingInstall);
                Ok(())
            }
            _ => Err(Error::ConflictError(format!(
                "'{name}' is already installed"
            ))),
        }
    }

    /// Target an installed script for removal
    ///
    /// The one transition accepted from every installed state, orphans
    /// included.
    pub fn mark_uninstall(&mut self, name: &str) -> Result<()> {
        let (_, target) = self.known(name)?;
        if !target.is_installed() {
            return Err(Error::NotFoundError(format!(
                "'{name}' is not installed"
            )));
        }
        self.targets
            .insert(name.to_string(), ScriptState::PendingUninstall);
        Ok(())
    }

    /// Target an inactive script for activation
    pub fn mark_activate(&mut self, name: &str) -> Result<()> {
        let (initial, target) = self.known(name)?;
        match target {
            ScriptState::Inactive => {
                let next = match initial {
                    ScriptState::Active
                    | ScriptState::UpdateAvailable
                    | ScriptState::DowngradeAvailable => initial,
                    _ => ScriptState::Active,
                };
                self.targets.insert(name.to_string(), next);
                Ok(())
            }
            ScriptState::Active
            | ScriptState::UpdateAvailable
            | ScriptState::DowngradeAvailable => Ok(()),
            ScriptState::Orphaned => Err(Error::ConflictError(format!(
                "'{name}' is no longer published; removal is the only valid action"
            ))),
            ScriptState::Suspended => Err(Error::ConflictError(format!(
                "'{name}' is suspended pending registry authorization"
            ))),
            _ => Err(Error::NotFoundError(format!("'{name}' is not installed"))),
        }
    }

    /// Target a running script for deactivation
    pub fn mark_deactivate(&mut self, name: &str) -> Result<()> {
        let (_, target) = self.known(name)?;
        match target {
            ScriptState::Active
            | ScriptState::UpdateAvailable
            | ScriptState::DowngradeAvailable => {
                self.targets.insert(name.to_string(), ScriptState::Inactive);
                Ok(())
            }
            ScriptState::Inactive => Ok(()),
            ScriptState::Orphaned => Err(Error::ConflictError(format!(
                "'{name}' is no longer published; removal is the only valid action"
            ))),
            ScriptState::Suspended => Err(Error::ConflictError(format!(
                "'{name}' is suspended pending registry authorization"
            ))),
            _ => Err(Error::NotFoundError(format!("'{name}' is not installed"))),
        }
    }

    /// Keep a script's implicit re-fetch out of the next commit
    ///
    /// Only suppresses the always-eligible UpdateAvailable/
    /// DowngradeAvailable rule; an explicit target change still commits.
    pub fn defer_refetch(&mut self, name: &str) {
        self.deferred.insert(name.to_string());
    }

    /// The commit work list
    ///
    /// Every name whose target differs from its derived state, plus names
    /// still sitting at UpdateAvailable/DowngradeAvailable: those are
    /// always eligible for a re-fetch even without an explicit toggle.
    pub fn pending(&self) -> Vec<PendingChange> {
        self.targets
            .iter()
            .filter_map(|(name, &target)| {
                let initial = self.initial[name];
                let always_refetch = matches!(
                    target,
                    ScriptState::UpdateAvailable | ScriptState::DowngradeAvailable
                ) && !self.deferred.contains(name);
                if target != initial || always_refetch {
                    Some(PendingChange {
                        name: name.clone(),
                        initial,
                        target,
                    })
                } else {
                    None
                }
            })
            .collect()
    }
}
