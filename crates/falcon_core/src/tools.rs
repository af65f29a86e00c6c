//! MCP tool modules and the dispatch registry.
//!
//! Every tool follows the same shape: refresh the session token, validate
//! arguments, issue exactly one remote call through the provider, and wrap
//! the raw response in an [`Envelope`](crate::envelope::Envelope).
//! Validation failures and remote API errors are envelope outcomes, never
//! raised errors.

pub mod detects;
pub mod hosts;
pub mod incidents;
pub mod registry;

use serde_json::Value;

/// A non-empty string argument, if supplied. Empty strings count as
/// absent so they are omitted from outgoing query parameters.
pub(crate) fn opt_string_arg(arguments: &Value, key: &str) -> Option<String> {
    arguments
        .get(key)
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

pub(crate) fn u64_arg(arguments: &Value, key: &str, default: u64) -> u64 {
    arguments.get(key).and_then(Value::as_u64).unwrap_or(default)
}

/// A list-of-strings argument; non-string entries are dropped.
pub(crate) fn string_list_arg(arguments: &Value, key: &str) -> Vec<String> {
    arguments
        .get(key)
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Human-readable API name used in error envelopes.
pub(crate) const API_NAME: &str = "CrowdStrike Falcon";

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn empty_string_counts_as_absent() {
        let args = json!({"filter": "", "sort": "hostname.asc"});
        assert_eq!(opt_string_arg(&args, "filter"), None);
        assert_eq!(
            opt_string_arg(&args, "sort"),
            Some("hostname.asc".to_string())
        );
    }

    #[test]
    fn numeric_defaults_apply() {
        let args = json!({"limit": 25});
        assert_eq!(u64_arg(&args, "limit", 100), 25);
        assert_eq!(u64_arg(&args, "offset", 0), 0);
    }

    #[test]
    fn string_lists_drop_non_strings() {
        let args = json!({"device_ids": ["a", 1, "b", null]});
        assert_eq!(string_list_arg(&args, "device_ids"), vec!["a", "b"]);
        assert!(string_list_arg(&args, "missing").is_empty());
    }
}
