//! Documentation metadata.
//!
//! # Data Flow
//! ```text
//! class doc comment ──► parser::extract ──► MetadataRecord ─┐
//! method doc comment ─► parser::extract ──► MetadataRecord ─┴► merge_over ─► CallDescriptor
//! ```
//!
//! The record is a typed view of the comment tags. Route compilation only
//! reads it; it never looks at comment text.

pub mod parser;

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::verb::Verb;

pub use parser::extract;

/// Tag that keeps a method out of convention-based routing.
pub const SUPPRESS_TAG: &str = "url-";

/// Tag that marks a public method as requiring authentication.
pub const PROTECTED_TAG: &str = "protected";

/// A query-string value; comma-separated input becomes a list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QueryValue {
    One(String),
    Many(Vec<String>),
}

impl QueryValue {
    pub(crate) fn from_raw(raw: &str) -> Self {
        let parts: Vec<&str> = raw.split(',').collect();
        if parts.len() > 1 {
            QueryValue::Many(parts.into_iter().map(str::to_string).collect())
        } else {
            QueryValue::One(raw.to_string())
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            QueryValue::One(value) => Some(value),
            QueryValue::Many(_) => None,
        }
    }
}

/// Configuration for one collaborator class, taken from `@class` tags.
pub type ClassConfig = BTreeMap<String, QueryValue>;

/// `@param type $name {rules} description`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ParamTag {
    #[serde(rename = "type")]
    pub type_name: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Validation rules, rule name to arguments.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub validate: BTreeMap<String, QueryValue>,
}

/// `@return type description`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReturnTag {
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// `@status code reason`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusTag {
    pub code: u16,
    pub reason: String,
}

/// `@throws ExceptionName code reason`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ThrowsTag {
    pub exception: String,
    pub code: u16,
    pub reason: String,
}

/// A parsed `@url VERB /pattern` directive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlDirective {
    pub verb: Verb,
    /// Pattern without its leading slash.
    pub path: String,
}

/// Typed metadata extracted from one doc comment, or the merge of a method
/// record over its class record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MetadataRecord {
    pub description: Option<String>,
    pub long_description: Option<String>,
    pub class_description: Option<String>,
    pub class_long_description: Option<String>,
    pub params: Vec<ParamTag>,
    pub returns: Option<ReturnTag>,
    pub status: Option<StatusTag>,
    pub throws: Vec<ThrowsTag>,
    pub headers: Vec<String>,
    pub urls: Vec<String>,
    /// `@class` configuration keyed by collaborator identifier.
    pub classes: BTreeMap<String, ClassConfig>,
    /// Every other tag, first occurrence only.
    pub tags: BTreeMap<String, String>,
}

impl MetadataRecord {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }

    pub fn has_tag(&self, name: &str) -> bool {
        self.tags.contains_key(name)
    }

    pub fn is_protected(&self) -> bool {
        self.has_tag(PROTECTED_TAG)
    }

    pub fn suppresses_routes(&self) -> bool {
        self.has_tag(SUPPRESS_TAG)
    }

    /// Configuration destined for the collaborator registered as `identifier`.
    pub fn class_config(&self, identifier: &str) -> Option<&ClassConfig> {
        self.classes.get(identifier)
    }

    /// The `@url` entries that name a known verb.
    pub fn url_directives(&self) -> Vec<UrlDirective> {
        self.urls
            .iter()
            .filter_map(|raw| {
                let raw = raw.trim_start();
                let end = raw
                    .find(|c: char| c.is_whitespace() || c == '/')
                    .unwrap_or(raw.len());
                let verb = raw[..end].parse::<Verb>().ok()?;
                // directive verbs are case-sensitive
                if !raw[..end].chars().all(|c| c.is_ascii_uppercase()) {
                    return None;
                }
                let rest = raw[end..].trim_start_matches([' ', '\t']);
                let rest = rest.strip_prefix('/').unwrap_or(rest);
                let path = rest.split_whitespace().next().unwrap_or_default();
                Some(UrlDirective {
                    verb,
                    path: path.to_string(),
                })
            })
            .collect()
    }

    /// Merge this (method-level) record over a class-level record.
    ///
    /// Values present here win. Keyed collections merge per key; sequences
    /// are taken whole from whichever side has entries.
    pub fn merge_over(mut self, class: &MetadataRecord) -> MetadataRecord {
        fn take<T: Clone>(own: &mut Vec<T>, other: &[T]) {
            if own.is_empty() {
                own.extend_from_slice(other);
            }
        }

        self.description = self.description.or_else(|| class.description.clone());
        self.long_description = self
            .long_description
            .or_else(|| class.long_description.clone());
        self.class_description = class.description.clone();
        self.class_long_description = class.long_description.clone();
        self.returns = self.returns.or_else(|| class.returns.clone());
        self.status = self.status.or_else(|| class.status.clone());
        take(&mut self.params, &class.params);
        take(&mut self.throws, &class.throws);
        take(&mut self.headers, &class.headers);
        take(&mut self.urls, &class.urls);
        for (identifier, config) in &class.classes {
            self.classes
                .entry(identifier.clone())
                .or_insert_with(|| config.clone());
        }
        for (name, value) in &class.tags {
            self.tags.entry(name.clone()).or_insert_with(|| value.clone());
        }
        self
    }
}
