// src/directives.rs

//! Payload header directives
//!
//! Script payloads declare their own dispatch and configuration metadata in
//! directive lines anywhere in the source text:
//!
//! - `@context <pattern>` declares a context pattern the script should run
//!   under; a payload may declare several, in order.
//! - `@config <json-object>` declares configurable parameters with their
//!   default values.
//!
//! Directives are extracted with regexes at install and update time and
//! persisted on the installed record, so dispatch never re-parses code.

use regex::Regex;

/// Extract the ordered `@context` patterns from payload code
pub fn extract_context_patterns(code: &str) -> Vec<String> {
    let re = Regex::new(r"@context\s+(\S+)").unwrap();
    re.captures_iter(code)
        .map(|cap| cap[1].to_string())
        .collect()
}

/// Whether the payload declares a `@config` block
pub fn declares_config(code: &str) -> bool {
    extract_config_defaults(code).is_some()
}

/// Extract the `@config` defaults object, if the payload declares one
///
/// The remainder of the directive line must be a JSON object; anything else
/// is ignored rather than failing the install.
pub fn extract_config_defaults(code: &str) -> Option<serde_json::Value> {
    let re = Regex::new(r"@config\s+(\{.*\})").unwrap();
    let cap = re.captures(code)?;
    match serde_json::from_str::<serde_json::Value>(&cap[1]) {
        Ok(value) if value.is_object() => Some(value),
        _ => None,
    }
}
