//! Per-endpoint access policy
//!
//! Holds each endpoint's params schema and minimum access level. A policy
//! is filled while its route is being built and is read-only afterwards.

use std::collections::HashMap;

use serde_json::Value;

#[derive(Debug, Clone, Default)]
struct PolicyEntry {
    schema: Option<Value>,
    min_level: i64,
}

/// Schema and minimum level for each endpoint of one route.
///
/// Endpoint names are matched ASCII case-insensitively.
#[derive(Debug, Clone, Default)]
pub struct AccessPolicy {
    entries: HashMap<String, PolicyEntry>,
}

impl AccessPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the params schema of `endpoint`
    pub fn register(&mut self, endpoint: &str, schema: Value) {
        self.entry(endpoint).schema = Some(schema);
    }

    /// Sets the minimum access level of `endpoint`
    pub fn set_min_level(&mut self, endpoint: &str, level: i64) {
        self.entry(endpoint).min_level = level;
    }

    /// Params schema, if one was registered
    pub fn schema(&self, endpoint: &str) -> Option<&Value> {
        self.entries
            .get(&key(endpoint))
            .and_then(|e| e.schema.as_ref())
    }

    /// Minimum access level, 0 when unset
    pub fn min_level(&self, endpoint: &str) -> i64 {
        self.entries
            .get(&key(endpoint))
            .map(|e| e.min_level)
            .unwrap_or(0)
    }

    fn entry(&mut self, endpoint: &str) -> &mut PolicyEntry {
        self.entries.entry(key(endpoint)).or_default()
    }
}

fn key(endpoint: &str) -> String {
    endpoint.to_ascii_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_defaults() {
        let policy = AccessPolicy::new();
        assert_eq!(policy.min_level("anything"), 0);
        assert!(policy.schema("anything").is_none());
    }

    #[test]
    fn test_register_and_level_are_independent() {
        let mut policy = AccessPolicy::new();
        policy.register("get_author", json!({"type": "object"}));
        policy.set_min_level("logout", 1);

        assert_eq!(policy.schema("get_author"), Some(&json!({"type": "object"})));
        assert_eq!(policy.min_level("get_author"), 0);
        assert_eq!(policy.min_level("logout"), 1);
        assert!(policy.schema("logout").is_none());
    }

    #[test]
    fn test_lookup_ignores_case() {
        let mut policy = AccessPolicy::new();
        policy.set_min_level("testException", 2);
        assert_eq!(policy.min_level("TESTEXCEPTION"), 2);
    }
}
