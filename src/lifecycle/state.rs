// src/lifecycle/state.rs

//! Lifecycle state derivation
//!
//! For every script name known remotely, locally, or both, derives one
//! lifecycle state from three snapshots: the merged catalog, the local
//! store, and registry access validity. Derivation is pure; persisting the
//! suspension side effects is the authorization gate's job.

use crate::db::models::InstalledScript;
use crate::registry::auth::AccessSnapshot;
use crate::registry::catalog::CatalogEntry;
use crate::version::ScriptVersion;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use strum_macros::{Display, EnumString};

/// Lifecycle state of one script name
///
/// The first seven variants are derived; the two pending variants exist
/// only as user-chosen targets inside a session and are never derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "kebab-case")]
pub enum ScriptState {
    NotInstalled,
    Active,
    Inactive,
    UpdateAvailable,
    DowngradeAvailable,
    Orphaned,
    Suspended,
    PendingInstall,
    PendingUninstall,
}

impl ScriptState {
    /// Whether this state describes an installed script
    pub fn is_installed(&self) -> bool {
        !matches!(self, ScriptState::NotInstalled | ScriptState::PendingInstall)
    }
}

/// Derived status for one script name
#[derive(Debug, Clone)]
pub struct ScriptStatus {
    pub name: String,
    pub state: ScriptState,
    pub installed: Option<InstalledScript>,
    pub remote: Option<CatalogEntry>,
}

/// Derive a lifecycle state for every known script name
///
/// Evaluation order per name:
/// 1. not installed, present remotely -> NotInstalled
/// 2. installed, origin registry configured but unauthorized -> Suspended
///    (takes precedence over the orphan rule: an unauthorized registry
///    yields an empty catalog, which must not read as removal)
/// 3. installed, name absent from every merged catalog -> Orphaned
/// 4. installed, deactivated -> Inactive
/// 5. installed and listed: version compare decides UpdateAvailable,
///    DowngradeAvailable, or Active
pub fn reconcile(
    catalog: &[CatalogEntry],
    installed: &[InstalledScript],
    access: &AccessSnapshot,
) -> Vec<ScriptStatus> {
    let remote_by_name: BTreeMap<&str, &CatalogEntry> =
        catalog.iter().map(|e| (e.name.as_str(), e)).collect();
    let local_by_name: BTreeMap<&str, &InstalledScript> =
        installed.iter().map(|s| (s.name.as_str(), s)).collect();

    let mut names: Vec<&str> = remote_by_name.keys().copied().collect();
    names.extend(local_by_name.keys().copied());
    names.sort_unstable();
    names.dedup();

    names
        .into_iter()
        .map(|name| {
            let remote = remote_by_name.get(name).copied();
            let local = local_by_name.get(name).copied();
            let state = derive_state(remote, local, access);
            ScriptStatus {
                name: name.to_string(),
                state,
                installed: local.cloned(),
                remote: remote.cloned(),
            }
        })
        .collect()
}

fn derive_state(
    remote: Option<&CatalogEntry>,
    local: Option<&InstalledScript>,
    access: &AccessSnapshot,
) -> ScriptState {
    let Some(local) = local else {
        return ScriptState::NotInstalled;
    };

    if access.usable(&local.origin()) == Some(false) {
        return ScriptState::Suspended;
    }

    let Some(remote) = remote else {
        return ScriptState::Orphaned;
    };

    if !local.active {
        return ScriptState::Inactive;
    }

    match remote.version.compare(&ScriptVersion::parse(&local.version)) {
        Ordering::Greater => ScriptState::UpdateAvailable,
        Ordering::Less => ScriptState::DowngradeAvailable,
        Ordering::Equal => ScriptState::Active,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::RegistryId;

    fn entry(name: &str, version: &str) -> CatalogEntry {
        CatalogEntry {
            name: name.to_string(),
            version: ScriptVersion::parse(version),
            payload_ref: format!("{name}.v{version}.sh"),
            categories: vec!["tools".to_string()],
            description: String::new(),
            changelog: String::new(),
            origin: RegistryId::new("alpha", "scripts"),
        }
    }

    fn unit(name: &str, version: &str, active: bool) -> InstalledScript {
        let mut script = InstalledScript::new(
            name.to_string(),
            version.to_string(),
            "echo hi".to_string(),
            vec![],
            false,
            RegistryId::new("alpha", "scripts"),
            "abc".to_string(),
        );
        script.active = active;
        script
    }

    fn access_ok() -> AccessSnapshot {
        AccessSnapshot::with_entries(&[(RegistryId::new("alpha", "scripts"), true)])
    }

    fn state_of(statuses: &[ScriptStatus], name: &str) -> ScriptState {
        statuses.iter().find(|s| s.name == name).unwrap().state
    }

    #[test]
    fn test_remote_only_is_not_installed() {
        let statuses = reconcile(&[entry("a", "1.0.0")], &[], &access_ok());
        assert_eq!(state_of(&statuses, "a"), ScriptState::NotInstalled);
    }

    #[test]
    fn test_local_only_is_orphaned_even_when_inactive() {
        let statuses = reconcile(&[], &[unit("a", "1.0.0", false)], &access_ok());
        assert_eq!(state_of(&statuses, "a"), ScriptState::Orphaned);
    }

    #[test]
    fn test_version_comparison_drives_state() {
        let catalog = vec![entry("up", "2.1.0"), entry("down", "1.0.0"), entry("same", "1.0.0")];
        let installed = vec![
            unit("up", "2.0.0", true),
            unit("down", "1.5.0", true),
            unit("same", "1.0.0", true),
        ];
        let statuses = reconcile(&catalog, &installed, &access_ok());
        assert_eq!(state_of(&statuses, "up"), ScriptState::UpdateAvailable);
        assert_eq!(state_of(&statuses, "down"), ScriptState::DowngradeAvailable);
        assert_eq!(state_of(&statuses, "same"), ScriptState::Active);
    }

    #[test]
    fn test_padded_version_counts_as_equal() {
        let statuses = reconcile(&[entry("a", "2.0")], &[unit("a", "2.0.0", true)], &access_ok());
        assert_eq!(state_of(&statuses, "a"), ScriptState::Active);
    }

    #[test]
    fn test_inactive_takes_precedence_over_version() {
        let statuses = reconcile(&[entry("a", "9.0.0")], &[unit("a", "1.0.0", false)], &access_ok());
        assert_eq!(state_of(&statuses, "a"), ScriptState::Inactive);
    }

    #[test]
    fn test_unauthorized_registry_suspends_before_orphan_rule() {
        // The registry's fetch failed on auth, so its catalog is empty;
        // the installed script must read as suspended, not orphaned.
        let access =
            AccessSnapshot::with_entries(&[(RegistryId::new("alpha", "scripts"), false)]);
        let statuses = reconcile(&[], &[unit("a", "1.0.0", true)], &access);
        assert_eq!(state_of(&statuses, "a"), ScriptState::Suspended);
    }

    #[test]
    fn test_deleted_registry_is_orphan_not_suspended() {
        let statuses = reconcile(&[], &[unit("a", "1.0.0", true)], &AccessSnapshot::default());
        assert_eq!(state_of(&statuses, "a"), ScriptState::Orphaned);
    }

    #[test]
    fn test_derivation_covers_union_of_names() {
        let statuses = reconcile(
            &[entry("remote-only", "1.0.0"), entry("both", "1.0.0")],
            &[unit("both", "1.0.0", true), unit("local-only", "1.0.0", true)],
            &access_ok(),
        );
        assert_eq!(statuses.len(), 3);
    }
}
