// src/dispatch.rs

//! Execution dispatcher
//!
//! At startup, every installed script that is active, not suspended, and
//! whose context patterns match the runtime context identifier is executed
//! exactly once. Payloads run full-trust as subprocesses with the host's
//! privileges; a failing script is logged and never prevents dispatch of
//! the remaining ones.

use crate::db::models::InstalledScript;
use crate::error::{Error, Result};
use regex::Regex;
use std::io::Write;
use std::process::Command;
use std::time::Duration;
use tracing::{debug, info, warn};
use wait_timeout::ChildExt;

/// Upper bound on a single script's runtime
const EXEC_TIMEOUT: Duration = Duration::from_secs(60);

/// Result of one dispatch pass
#[derive(Debug, Default)]
pub struct DispatchReport {
    /// Scripts that ran to successful completion
    pub executed: Vec<String>,
    /// Scripts skipped because no pattern matched the context
    pub skipped: usize,
    /// Per-script execution failures, non-fatal to the pass
    pub failures: Vec<(String, String)>,
}

/// Match a context pattern against the runtime context identifier
///
/// The single `*` wildcard matches any substring; the pattern itself is
/// matched anywhere inside the context, so `staging-*` and `*-web-*` both
/// hit `eu-staging-web-04`.
pub fn pattern_matches(pattern: &str, context: &str) -> bool {
    let escaped: Vec<String> = pattern.split('*').map(regex::escape).collect();
    let regex_source = escaped.join(".*");
    match Regex::new(&regex_source) {
        Ok(re) => re.is_match(context),
        Err(_) => false,
    }
}

/// Dispatch all eligible scripts for this startup
///
/// Eligibility is `active && !suspended` plus a pattern match; a script
/// with no declared patterns never matches anything and is skipped.
pub fn dispatch_startup(scripts: &[InstalledScript], context: &str) -> DispatchReport {
    let mut report = DispatchReport::default();

    for script in scripts {
        if !script.active || script.suspended {
            continue;
        }

        let matched = script
            .context_patterns
            .iter()
            .any(|pattern| pattern_matches(pattern, context));
        if !matched {
            debug!("'{}' has no pattern matching context '{}'", script.name, context);
            report.skipped += 1;
            continue;
        }

        match execute_script(script, context) {
            Ok(()) => {
                info!("Executed '{}'", script.name);
                report.executed.push(script.name.clone());
            }
            Err(e) => {
                warn!("Execution of '{}' failed: {}", script.name, e);
                report.failures.push((script.name.clone(), e.to_string()));
            }
        }
    }

    info!(
        "Dispatch complete: {} executed, {} skipped, {} failed",
        report.executed.len(),
        report.skipped,
        report.failures.len()
    );
    report
}

/// Run one script payload as a subprocess with a bounded runtime
fn execute_script(script: &InstalledScript, context: &str) -> Result<()> {
    let mut file = tempfile::Builder::new()
        .prefix("scriptman-")
        .suffix(".sh")
        .tempfile()
        .map_err(|e| Error::IoError(format!("Failed to stage payload: {e}")))?;
    file.write_all(script.code.as_bytes())
        .map_err(|e| Error::IoError(format!("Failed to write payload: {e}")))?;

    let mut child = Command::new("sh")
        .arg(file.path())
        .env("SCRIPTMAN_SCRIPT", &script.name)
        .env("SCRIPTMAN_CONTEXT", context)
        .spawn()
        .map_err(|e| Error::ExecError(format!("Failed to spawn '{}': {e}", script.name)))?;

    match child
        .wait_timeout(EXEC_TIMEOUT)
        .map_err(|e| Error::ExecError(format!("Failed to wait on '{}': {e}", script.name)))?
    {
        Some(status) if status.success() => Ok(()),
        Some(status) => Err(Error::ExecError(format!(
            "'{}' exited with {status}",
            script.name
        ))),
        None => {
            let _ = child.kill();
            let _ = child.wait();
            Err(Error::ExecError(format!(
                "'{}' exceeded the {}s execution timeout",
                script.name,
                EXEC_TIMEOUT.as_secs()
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::RegistryId;

    fn script(name: &str, code: &str, patterns: &[&str], active: bool, suspended: bool) -> InstalledScript {
        let mut s = InstalledScript::new(
            name.to_string(),
            "1.0.0".to_string(),
            code.to_string(),
            patterns.iter().map(|p| p.to_string()).collect(),
            false,
            RegistryId::new("alpha", "scripts"),
            "abc".to_string(),
        );
        s.active = active;
        s.suspended = suspended;
        s
    }

    #[test]
    fn test_pattern_wildcard_matches_any_substring() {
        assert!(pattern_matches("prod-*", "prod-web-01"));
        assert!(pattern_matches("*-web-*", "eu-staging-web-04"));
        assert!(pattern_matches("prod", "eu-prod-db"));
        assert!(!pattern_matches("prod-*", "staging-web-01"));
    }

    #[test]
    fn test_pattern_escapes_regex_metacharacters() {
        assert!(pattern_matches("job[1]*", "job[1]-runner"));
        assert!(!pattern_matches("job[1]*", "job1-runner"));
    }

    #[test]
    fn test_suspended_script_never_dispatched_despite_active_flag() {
        // A stale row can carry active=true alongside suspended=true;
        // the dispatcher must still refuse it.
        let mut s = script("locked", "true", &["*"], true, true);
        s.active = true;
        let report = dispatch_startup(&[s], "anywhere");
        assert!(report.executed.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn test_inactive_script_not_dispatched() {
        let report = dispatch_startup(&[script("off", "true", &["*"], false, false)], "ctx");
        assert!(report.executed.is_empty());
    }

    #[test]
    fn test_non_matching_context_is_skipped() {
        let report = dispatch_startup(&[script("a", "true", &["prod-*"], true, false)], "staging");
        assert_eq!(report.skipped, 1);
        assert!(report.executed.is_empty());
    }

    #[test]
    fn test_no_patterns_means_never_matched() {
        let report = dispatch_startup(&[script("bare", "true", &[], true, false)], "ctx");
        assert_eq!(report.skipped, 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_executes_matching_script() {
        let report = dispatch_startup(&[script("ok", "exit 0", &["*"], true, false)], "ctx");
        assert_eq!(report.executed, vec!["ok"]);
        assert!(report.failures.is_empty());
    }

    #[cfg(unix)]
    #[test]
    fn test_one_failure_does_not_stop_the_rest() {
        let scripts = [
            script("boom", "exit 3", &["*"], true, false),
            script("fine", "exit 0", &["*"], true, false),
        ];
        let report = dispatch_startup(&scripts, "ctx");
        assert_eq!(report.executed, vec!["fine"]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].0, "boom");
    }
}
