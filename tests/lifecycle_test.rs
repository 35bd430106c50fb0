// tests/lifecycle_test.rs
//! End-to-end lifecycle tests over the manager context
//!
//! Exercises aggregation, reconciliation, batch commits, suspension, and
//! healing against an in-memory store and a mock registry source.

mod common;

use common::{MockRegistries, Published, manager_with};
use pretty_assertions::assert_eq;
use scriptman::db::models::{InstalledScript, Registry, RegistryId, ScriptSettings};
use scriptman::{ScriptState, Session};

fn state_of(statuses: &[scriptman::ScriptStatus], name: &str) -> ScriptState {
    statuses
        .iter()
        .find(|s| s.name == name)
        .unwrap_or_else(|| panic!("no status for {name}"))
        .state
}

#[test]
fn install_then_update_reaches_active() {
    // Catalog starts at 2.0.0; the store is empty.
    let source = MockRegistries::new().publish(
        "alpha",
        vec![Published::new("deploy-hook", "2.0.0", "# @context prod-*\nexit 0\n")],
    );
    let mut manager = manager_with(&["alpha"], source);

    let statuses = manager.snapshot(false).unwrap();
    assert_eq!(state_of(&statuses, "deploy-hook"), ScriptState::NotInstalled);

    let mut session = Session::new(statuses);
    session.mark_install("deploy-hook").unwrap();
    let (outcome, statuses) = manager.commit(&session, None).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(state_of(&statuses, "deploy-hook"), ScriptState::Active);

    let script = InstalledScript::find_by_name(manager.conn(), "deploy-hook")
        .unwrap()
        .unwrap();
    assert_eq!(script.version, "2.0.0");
    assert_eq!(script.context_patterns, vec!["prod-*"]);
    assert!(script.active);
}

#[test]
fn newer_catalog_version_derives_update_and_commit_applies_it() {
    let source = MockRegistries::new().publish(
        "alpha",
        vec![Published::new("deploy-hook", "2.1.0", "echo v2.1\n")],
    );
    let mut manager = manager_with(&["alpha"], source);

    // Pre-seed the store at 2.0.0, active.
    InstalledScript::new(
        "deploy-hook".to_string(),
        "2.0.0".to_string(),
        "echo v2.0".to_string(),
        vec![],
        false,
        RegistryId::new("alpha", "scripts"),
        "old".to_string(),
    )
    .upsert(manager.conn())
    .unwrap();

    let statuses = manager.snapshot(false).unwrap();
    assert_eq!(
        state_of(&statuses, "deploy-hook"),
        ScriptState::UpdateAvailable
    );

    // Update targets are always eligible; no explicit toggle needed.
    let session = Session::new(statuses);
    let (outcome, statuses) = manager.commit(&session, None).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(state_of(&statuses, "deploy-hook"), ScriptState::Active);

    let script = InstalledScript::find_by_name(manager.conn(), "deploy-hook")
        .unwrap()
        .unwrap();
    assert_eq!(script.version, "2.1.0");
    assert_eq!(script.code, "echo v2.1\n");
    assert!(script.active);
}

#[test]
fn merge_prefers_higher_version_across_registries() {
    // Registry x lists C@1.0.0, registry y lists C@1.2.0.
    let source = MockRegistries::new()
        .publish("x", vec![Published::new("c", "1.0.0", "echo old\n")])
        .publish("y", vec![Published::new("c", "1.2.0", "echo new\n")]);
    let mut manager = manager_with(&["x", "y"], source);

    let outcome = manager.aggregate(false).unwrap();
    let c: Vec<_> = outcome.entries.iter().filter(|e| e.name == "c").collect();
    assert_eq!(c.len(), 1);
    assert_eq!(c[0].version.as_str(), "1.2.0");
    assert_eq!(c[0].origin, RegistryId::new("y", "scripts"));
}

#[test]
fn failing_registry_contributes_empty_set_silently() {
    let source = MockRegistries::new()
        .publish("alpha", vec![Published::new("a", "1.0.0", "exit 0\n")])
        .offline("beta");
    let mut manager = manager_with(&["alpha", "beta"], source);

    let outcome = manager.aggregate(false).unwrap();
    assert_eq!(outcome.entries.len(), 1);
    assert_eq!(outcome.failures.len(), 1);
    assert_eq!(outcome.failures[0].0, RegistryId::new("beta", "scripts"));
}

#[test]
fn orphan_accepts_only_removal_and_removal_commits() {
    // Installed script whose name is gone from every catalog.
    let source = MockRegistries::new().publish("alpha", vec![]);
    let mut manager = manager_with(&["alpha"], source);

    InstalledScript::new(
        "withdrawn".to_string(),
        "1.0.0".to_string(),
        "echo bye".to_string(),
        vec![],
        false,
        RegistryId::new("alpha", "scripts"),
        "abc".to_string(),
    )
    .upsert(manager.conn())
    .unwrap();
    ScriptSettings::put(manager.conn(), "withdrawn", &serde_json::json!({"keep": 1})).unwrap();

    let statuses = manager.snapshot(false).unwrap();
    assert_eq!(state_of(&statuses, "withdrawn"), ScriptState::Orphaned);

    let mut session = Session::new(statuses);
    assert!(session.toggle("withdrawn").is_err());
    assert!(session.mark_activate("withdrawn").is_err());

    session.mark_uninstall("withdrawn").unwrap();
    let (outcome, statuses) = manager.commit(&session, None).unwrap();
    assert!(outcome.is_clean());

    assert!(statuses.iter().all(|s| s.name != "withdrawn"));
    assert!(
        InstalledScript::find_by_name(manager.conn(), "withdrawn")
            .unwrap()
            .is_none()
    );
    // Uninstall discards the script's settings too.
    assert!(
        ScriptSettings::find(manager.conn(), "withdrawn")
            .unwrap()
            .is_none()
    );
}

#[test]
fn partial_batch_failure_spares_siblings_and_reports_once() {
    let source = MockRegistries::new()
        .publish(
            "alpha",
            vec![
                Published::new("good-one", "1.0.0", "exit 0\n"),
                Published::new("bad-one", "1.0.0", "exit 0\n"),
                Published::new("good-two", "1.0.0", "exit 0\n"),
            ],
        )
        .break_payload("bad-one.v1.0.0.sh");
    let mut manager = manager_with(&["alpha"], source);

    let mut session = Session::new(manager.snapshot(false).unwrap());
    session.mark_install("good-one").unwrap();
    session.mark_install("bad-one").unwrap();
    session.mark_install("good-two").unwrap();

    let (outcome, statuses) = manager.commit(&session, None).unwrap();
    assert_eq!(outcome.applied.len(), 2);
    assert_eq!(outcome.errors.len(), 1);
    assert_eq!(outcome.errors[0].name, "bad-one");

    assert_eq!(state_of(&statuses, "good-one"), ScriptState::Active);
    assert_eq!(state_of(&statuses, "good-two"), ScriptState::Active);
    // The failing item's prior state is retained: still not installed.
    assert_eq!(state_of(&statuses, "bad-one"), ScriptState::NotInstalled);
}

#[test]
fn denied_registry_suspends_installed_scripts_without_data_loss() {
    let source = MockRegistries::new()
        .publish("alpha", vec![Published::new("a", "1.0.0", "exit 0\n")])
        .deny("private");
    let mut manager = manager_with(&["alpha", "private"], source);

    InstalledScript::new(
        "secret-tool".to_string(),
        "3.0.0".to_string(),
        "echo secret".to_string(),
        vec!["*".to_string()],
        false,
        RegistryId::new("private", "scripts"),
        "abc".to_string(),
    )
    .upsert(manager.conn())
    .unwrap();

    let statuses = manager.snapshot(false).unwrap();
    assert_eq!(state_of(&statuses, "secret-tool"), ScriptState::Suspended);

    let script = InstalledScript::find_by_name(manager.conn(), "secret-tool")
        .unwrap()
        .unwrap();
    assert!(script.suspended);
    assert!(!script.active);
    // Stored code survives suspension.
    assert_eq!(script.code, "echo secret");

    // The registry row carries the failure for later healing.
    let registry =
        Registry::find_by_ident(manager.conn(), &RegistryId::new("private", "scripts"))
            .unwrap()
            .unwrap();
    assert!(registry.auth_failed);
}

#[test]
fn suspension_heals_after_token_is_stored() {
    // Start denied, suspend, then swap in a source that accepts the
    // token and verify the next pass heals without a reinstall.
    let denied = MockRegistries::new().deny("private");
    let mut manager = manager_with(&["private"], denied);

    InstalledScript::new(
        "secret-tool".to_string(),
        "3.0.0".to_string(),
        "echo secret".to_string(),
        vec![],
        false,
        RegistryId::new("private", "scripts"),
        "abc".to_string(),
    )
    .upsert(manager.conn())
    .unwrap();

    let statuses = manager.snapshot(true).unwrap();
    assert_eq!(state_of(&statuses, "secret-tool"), ScriptState::Suspended);

    // Remediation: store a token (clears the failure flag) and re-open
    // the manager against a now-authorized source.
    Registry::store_token(
        manager.conn(),
        &RegistryId::new("private", "scripts"),
        "tok-123",
    )
    .unwrap();

    let authorized = MockRegistries::new().publish(
        "private",
        vec![Published::new("secret-tool", "3.0.0", "echo secret\n")],
    );
    let mut manager =
        scriptman::Manager::with_connection(manager.into_connection(), Box::new(authorized));

    let statuses = manager.snapshot(true).unwrap();
    assert_eq!(state_of(&statuses, "secret-tool"), ScriptState::Active);

    let script = InstalledScript::find_by_name(manager.conn(), "secret-tool")
        .unwrap()
        .unwrap();
    assert!(!script.suspended);
    assert!(script.active);
}

#[test]
fn disable_then_enable_roundtrip() {
    let source = MockRegistries::new().publish(
        "alpha",
        vec![Published::new("toggler", "1.0.0", "exit 0\n")],
    );
    let mut manager = manager_with(&["alpha"], source);

    let mut session = Session::new(manager.snapshot(false).unwrap());
    session.mark_install("toggler").unwrap();
    manager.commit(&session, None).unwrap();

    let mut session = Session::new(manager.snapshot(false).unwrap());
    session.mark_deactivate("toggler").unwrap();
    let (outcome, statuses) = manager.commit(&session, None).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(state_of(&statuses, "toggler"), ScriptState::Inactive);

    let mut session = Session::new(statuses);
    session.mark_activate("toggler").unwrap();
    let (outcome, statuses) = manager.commit(&session, None).unwrap();
    assert!(outcome.is_clean());
    assert_eq!(state_of(&statuses, "toggler"), ScriptState::Active);
}

#[test]
fn catalog_cache_avoids_refetch_within_ttl() {
    use scriptman::CatalogCache;

    let source = MockRegistries::new().publish(
        "alpha",
        vec![Published::new("a", "1.0.0", "exit 0\n")],
    );
    let registries = vec![Registry::new(
        RegistryId::new("alpha", "scripts"),
        "Alpha".to_string(),
    )];

    let mut cache = CatalogCache::new();
    cache.get(&source, &registries, false);
    cache.get(&source, &registries, false);
    assert_eq!(
        source.fetch_log.lock().unwrap().len(),
        1,
        "second lookup should hit the cache"
    );

    cache.get(&source, &registries, true);
    assert_eq!(
        source.fetch_log.lock().unwrap().len(),
        2,
        "forced refresh bypasses the cache"
    );
}
