//! Compiled route table.
//!
//! # Responsibilities
//! - Store call descriptors per verb, in registration order
//! - Look up the first route matching a verb and normalized path
//!
//! # Design Decisions
//! - Immutable after construction (shared across requests without locks)
//! - First match wins; there is no specificity ranking, so literal routes
//!   must be registered before placeholder routes that would shadow them
//! - Re-registering a pattern replaces its descriptor but keeps its slot
//! - O(n) scan per verb (acceptable for typical route counts)

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use indexmap::IndexMap;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ConfigError;
use crate::metadata::{MetadataRecord, QueryValue};
use crate::routing::matcher::RoutePattern;
use crate::verb::Verb;

/// How a route is protected and how its method must be invoked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Access {
    /// Public method without `@protected`.
    Public,
    /// Protected method, invoked through the legacy public path.
    ProtectedLegacy,
    /// Protected method, invoked through the accessibility override.
    ProtectedReflective,
    /// Public method tagged `@protected`.
    ProtectedExplicit,
}

impl Access {
    pub fn requires_authentication(&self) -> bool {
        !matches!(self, Access::Public)
    }
}

/// One method parameter as the dispatcher sees it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDescriptor {
    pub name: String,
    pub position: usize,
    /// Declared default; `Some(Value::Null)` is a null default.
    #[serde(default, deserialize_with = "present", skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// True iff there is no default.
    pub required: bool,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub validate: BTreeMap<String, QueryValue>,
}

fn present<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Value>, D::Error> {
    Value::deserialize(deserializer).map(Some)
}

/// Everything needed to invoke one handler method.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallDescriptor {
    /// Identifier the class is registered under.
    pub class_name: String,
    /// Base path the class was mounted at, without trailing slash.
    pub path: String,
    pub method_name: String,
    /// Parameter name to position, in declaration order.
    pub arguments: IndexMap<String, usize>,
    /// Default value per position (`null` for required parameters).
    pub defaults: Vec<Value>,
    pub params: Vec<ParameterDescriptor>,
    pub metadata: MetadataRecord,
    pub access: Access,
}

/// A registered route.
#[derive(Debug, Clone)]
pub struct RouteEntry {
    pub pattern: String,
    matcher: RoutePattern,
    pub call: Arc<CallDescriptor>,
}

/// Result of a successful lookup.
#[derive(Debug, Clone)]
pub struct RouteMatch<'a> {
    pub pattern: &'a str,
    pub call: &'a Arc<CallDescriptor>,
    /// Placeholder values keyed by placeholder name.
    pub captures: HashMap<String, String>,
}

/// Verb to ordered (pattern → descriptor) routes.
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: BTreeMap<Verb, IndexMap<String, RouteEntry>>,
}

impl RouteTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `pattern` for `verb`.
    pub fn insert(
        &mut self,
        verb: Verb,
        pattern: impl Into<String>,
        call: Arc<CallDescriptor>,
    ) -> Result<(), ConfigError> {
        let pattern = pattern.into();
        let matcher = RoutePattern::compile(&pattern).map_err(|source| {
            ConfigError::InvalidPattern {
                pattern: pattern.clone(),
                source,
            }
        })?;
        self.routes.entry(verb).or_default().insert(
            pattern.clone(),
            RouteEntry {
                pattern,
                matcher,
                call,
            },
        );
        Ok(())
    }

    /// Find the first route of `verb` matching `path`.
    pub fn find(&self, verb: Verb, path: &str) -> Option<RouteMatch<'_>> {
        self.routes.get(&verb)?.values().find_map(|entry| {
            let captures = entry.matcher.captures(path)?;
            Some(RouteMatch {
                pattern: &entry.pattern,
                call: &entry.call,
                captures: captures.into_iter().collect(),
            })
        })
    }

    /// Routes of `verb` in registration order.
    pub fn routes(&self, verb: Verb) -> impl Iterator<Item = &RouteEntry> {
        self.routes.get(&verb).into_iter().flat_map(|r| r.values())
    }

    /// Patterns of `verb` in registration order.
    pub fn patterns(&self, verb: Verb) -> Vec<&str> {
        self.routes(verb).map(|e| e.pattern.as_str()).collect()
    }

    pub fn verbs(&self) -> impl Iterator<Item = Verb> + '_ {
        self.routes.keys().copied()
    }

    /// Every route, grouped by verb, in registration order within a verb.
    pub fn entries(&self) -> impl Iterator<Item = (Verb, &RouteEntry)> {
        self.routes
            .iter()
            .flat_map(|(verb, routes)| routes.values().map(move |entry| (*verb, entry)))
    }

    /// Total number of registered (verb, pattern) pairs.
    pub fn len(&self) -> usize {
        self.routes.values().map(IndexMap::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl PartialEq for RouteTable {
    fn eq(&self, other: &Self) -> bool {
        self.routes.len() == other.routes.len()
            && self.routes.iter().zip(other.routes.iter()).all(
                |((verb_a, routes_a), (verb_b, routes_b))| {
                    verb_a == verb_b
                        && routes_a.len() == routes_b.len()
                        && routes_a.values().zip(routes_b.values()).all(|(a, b)| {
                            a.pattern == b.pattern && a.call == b.call
                        })
                },
            )
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn call(method: &str, params: &[&str]) -> Arc<CallDescriptor> {
        Arc::new(CallDescriptor {
            class_name: "Users".into(),
            path: "users".into(),
            method_name: method.into(),
            arguments: params
                .iter()
                .enumerate()
                .map(|(i, p)| (p.to_string(), i))
                .collect(),
            defaults: vec![Value::Null; params.len()],
            params: Vec::new(),
            metadata: MetadataRecord::default(),
            access: Access::Public,
        })
    }

    #[test]
    fn test_first_registered_wins() {
        let mut table = RouteTable::new();
        table.insert(Verb::Get, "users/{id}", call("get", &["id"])).unwrap();
        table.insert(Verb::Get, "users/active", call("getActive", &[])).unwrap();

        let found = table.find(Verb::Get, "users/active").unwrap();
        assert_eq!(found.pattern, "users/{id}");
        assert_eq!(found.captures.get("id").map(String::as_str), Some("active"));
    }

    #[test]
    fn test_literal_first_gives_intuitive_order() {
        let mut table = RouteTable::new();
        table.insert(Verb::Get, "users/active", call("getActive", &[])).unwrap();
        table.insert(Verb::Get, "users/{id}", call("get", &["id"])).unwrap();

        assert_eq!(table.find(Verb::Get, "users/active").unwrap().call.method_name, "getActive");
        assert_eq!(table.find(Verb::Get, "users/9").unwrap().call.method_name, "get");
    }

    #[test]
    fn test_reinsert_keeps_position() {
        let mut table = RouteTable::new();
        table.insert(Verb::Get, "a", call("first", &[])).unwrap();
        table.insert(Verb::Get, "b", call("second", &[])).unwrap();
        table.insert(Verb::Get, "a", call("third", &[])).unwrap();

        assert_eq!(table.patterns(Verb::Get), vec!["a", "b"]);
        assert_eq!(table.find(Verb::Get, "a").unwrap().call.method_name, "third");
        assert_eq!(table.len(), 2);
    }

    #[test]
    fn test_verbs_are_separate() {
        let mut table = RouteTable::new();
        table.insert(Verb::Post, "users", call("postUsers", &[])).unwrap();
        assert!(table.find(Verb::Get, "users").is_none());
        assert!(table.find(Verb::Post, "users").is_some());
    }

    #[test]
    fn test_invalid_pattern_is_config_error() {
        let mut table = RouteTable::new();
        let err = table
            .insert(Verb::Get, "users/{bad name}", call("get", &[]))
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPattern { .. }));
        assert!(table.is_empty());
    }
}
