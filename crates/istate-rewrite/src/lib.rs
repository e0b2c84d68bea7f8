//! URL rewriting for loaded module state.
//!
//! Module state may embed absolute URLs to the sensor-interactive service
//! captured on whichever deployment the state was saved from. Before the
//! state is handed to the module, every such URL is pointed at the domain
//! the host declared, so saved work stays portable across deployments.
//!
//! The traversal is pure: it returns a new tree and never mutates the input,
//! which may still be shared with a UI layer. Rewriting is idempotent.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::{Map, Value};

/// Path segment identifying the auxiliary service whose URLs are rewritten.
pub const SENSOR_INTERACTIVE_PATH: &str = "/sensor-interactive/";

static SENSOR_INTERACTIVE_URL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(https?://)([^/]+)(/sensor-interactive/.*)$")
        .expect("sensor-interactive pattern is valid")
});

/// Rewrite a single string if it is a sensor-interactive URL.
///
/// Surrounding whitespace is ignored when matching and dropped from the
/// result. Returns `None` when the string does not match.
pub fn rewrite_url(value: &str, target_domain: &str) -> Option<String> {
    let captures = SENSOR_INTERACTIVE_URL.captures(value.trim())?;
    Some(format!("{}{}{}", &captures[1], target_domain, &captures[3]))
}

/// Return a copy of `tree` with every sensor-interactive URL retargeted.
///
/// Every string leaf of nested objects and arrays is visited. Numbers,
/// booleans, `null` and non-matching strings are copied unchanged. When no
/// target domain is available the tree is returned as is.
///
/// Input must be tree-shaped, which `serde_json::Value` guarantees.
pub fn rewrite(tree: &Value, target_domain: Option<&str>) -> Value {
    match target_domain.filter(|domain| !domain.is_empty()) {
        Some(domain) => rewrite_value(tree, domain),
        None => tree.clone(),
    }
}

fn rewrite_value(value: &Value, domain: &str) -> Value {
    match value {
        Value::String(s) => match rewrite_url(s, domain) {
            Some(rewritten) => Value::String(rewritten),
            None => value.clone(),
        },
        Value::Array(items) => Value::Array(items.iter().map(|v| rewrite_value(v, domain)).collect()),
        Value::Object(members) => Value::Object(
            members
                .iter()
                .map(|(k, v)| (k.clone(), rewrite_value(v, domain)))
                .collect::<Map<String, Value>>(),
        ),
        Value::Null | Value::Bool(_) | Value::Number(_) => value.clone(),
    }
}

/// Count the sensor-interactive URLs in `tree` that `rewrite` would touch.
pub fn count_rewritable(tree: &Value) -> usize {
    match tree {
        Value::String(s) => usize::from(SENSOR_INTERACTIVE_URL.is_match(s.trim())),
        Value::Array(items) => items.iter().map(count_rewritable).sum(),
        Value::Object(members) => members.values().map(count_rewritable).sum(),
        Value::Null | Value::Bool(_) | Value::Number(_) => 0,
    }
}
