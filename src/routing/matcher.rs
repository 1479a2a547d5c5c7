//! Route pattern matching.
//!
//! # Responsibilities
//! - Compile a registered URL pattern once, when it enters the table
//! - Match a normalized request path and capture placeholder values
//!
//! # Design Decisions
//! - Three pattern kinds: literal, `{name}` placeholders, `:name` segments
//! - A placeholder matches a non-empty run of non-slash characters
//! - Patterns are anchored at both ends; literal text is escaped
//! - Literal patterns skip the regex engine entirely

use regex::Regex;

/// A compiled route pattern.
#[derive(Debug, Clone)]
pub enum RoutePattern {
    /// Matches only the identical path.
    Literal(String),
    /// Anchored regex with one named group per placeholder.
    Template { regex: Regex, names: Vec<String> },
}

const CAPTURE: &str = "[^/]+";

impl RoutePattern {
    /// Compile a pattern. `{name}` takes precedence over `:name` when a
    /// pattern contains both.
    pub fn compile(pattern: &str) -> Result<Self, regex::Error> {
        let (source, names) = if pattern.contains('{') {
            braces_to_regex(pattern)
        } else if pattern.contains(':') {
            colons_to_regex(pattern)
        } else {
            return Ok(RoutePattern::Literal(pattern.to_string()));
        };
        if names.is_empty() {
            return Ok(RoutePattern::Literal(pattern.to_string()));
        }
        let regex = Regex::new(&format!("^{}$", source))?;
        Ok(RoutePattern::Template { regex, names })
    }

    /// Match `path`, returning the captured placeholder values in pattern
    /// order.
    pub fn captures(&self, path: &str) -> Option<Vec<(String, String)>> {
        match self {
            RoutePattern::Literal(literal) => (literal == path).then(Vec::new),
            RoutePattern::Template { regex, names } => {
                let caps = regex.captures(path)?;
                Some(
                    names
                        .iter()
                        .filter_map(|name| {
                            caps.name(name)
                                .map(|m| (name.clone(), m.as_str().to_string()))
                        })
                        .collect(),
                )
            }
        }
    }

    pub fn is_match(&self, path: &str) -> bool {
        match self {
            RoutePattern::Literal(literal) => literal == path,
            RoutePattern::Template { regex, .. } => regex.is_match(path),
        }
    }
}

fn group(name: &str) -> String {
    format!("(?P<{}>{})", name, CAPTURE)
}

fn braces_to_regex(pattern: &str) -> (String, Vec<String>) {
    let mut source = String::new();
    let mut names = Vec::new();
    let mut rest = pattern;

    while let Some(open) = rest.find('{') {
        let Some(close) = rest[open..].find('}').map(|i| open + i) else {
            break;
        };
        source.push_str(&regex::escape(&rest[..open]));
        let name = &rest[open + 1..close];
        source.push_str(&group(name));
        names.push(name.to_string());
        rest = &rest[close + 1..];
    }
    source.push_str(&regex::escape(rest));
    (source, names)
}

fn colons_to_regex(pattern: &str) -> (String, Vec<String>) {
    let mut source = String::new();
    let mut names = Vec::new();
    let mut rest = pattern;

    while let Some(colon) = rest.find(':') {
        let after = &rest[colon + 1..];
        let end = after.find('/').unwrap_or(after.len());
        if end == 0 {
            source.push_str(&regex::escape(&rest[..=colon]));
            rest = after;
            continue;
        }
        source.push_str(&regex::escape(&rest[..colon]));
        let name = &after[..end];
        source.push_str(&group(name));
        names.push(name.to_string());
        rest = &after[end..];
    }
    source.push_str(&regex::escape(rest));
    (source, names)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_pattern() {
        let pattern = RoutePattern::compile("users/active").unwrap();
        assert!(matches!(pattern, RoutePattern::Literal(_)));
        assert_eq!(pattern.captures("users/active"), Some(vec![]));
        assert_eq!(pattern.captures("users/active/1"), None);
    }

    #[test]
    fn test_brace_placeholders() {
        let pattern = RoutePattern::compile("users/{id}/posts/{post}").unwrap();
        assert_eq!(
            pattern.captures("users/42/posts/7"),
            Some(vec![
                ("id".to_string(), "42".to_string()),
                ("post".to_string(), "7".to_string())
            ])
        );
        assert!(!pattern.is_match("users/42/posts/"));
        assert!(!pattern.is_match("users/4/2/posts/7"));
        assert!(!pattern.is_match("xusers/42/posts/7"));
    }

    #[test]
    fn test_colon_segments() {
        let pattern = RoutePattern::compile("files/:name/meta").unwrap();
        assert_eq!(
            pattern.captures("files/report.pdf/meta"),
            Some(vec![("name".to_string(), "report.pdf".to_string())])
        );
        assert!(!pattern.is_match("files/a/b/meta"));
    }

    #[test]
    fn test_literal_text_is_escaped() {
        let pattern = RoutePattern::compile("v1.0/{id}").unwrap();
        assert!(pattern.is_match("v1.0/5"));
        assert!(!pattern.is_match("v1x0/5"));
    }

    #[test]
    fn test_invalid_placeholder_name() {
        assert!(RoutePattern::compile("users/{user id}").is_err());
    }

    #[test]
    fn test_lone_colon_is_literal() {
        let pattern = RoutePattern::compile("time/12:/x").unwrap();
        assert!(matches!(pattern, RoutePattern::Literal(_)));
        assert!(pattern.is_match("time/12:/x"));
    }
}
