//! Doc comment parsing.
//!
//! # Responsibilities
//! - Strip comment markup (`/**`, `*/`, leading `*`)
//! - Split description paragraphs from `@tag` lines
//! - Normalize known tags into typed values
//!
//! # Design Decisions
//! - Total: malformed input never fails, it becomes description text
//! - `param`, `throws`, `header` and `url` repeat; other tags keep the
//!   first occurrence, except `class` and `return` which merge with the
//!   later tag winning per key
//! - A `@status` without a numeric code is text, not a tag

use std::collections::BTreeMap;

use url::form_urlencoded;

use crate::metadata::{MetadataRecord, ParamTag, QueryValue, ReturnTag, StatusTag, ThrowsTag};

/// Parse a doc comment into a [`MetadataRecord`].
pub fn extract(comment: &str) -> MetadataRecord {
    let mut record = MetadataRecord::default();
    let mut summary: Vec<&str> = Vec::new();
    let mut rest: Vec<&str> = Vec::new();
    let mut summary_closed = false;

    for line in comment_lines(comment) {
        let line = line.trim();
        let is_break = if line.is_empty() {
            true
        } else if let Some((name, value)) = split_tag(line) {
            apply_tag(&mut record, name, value)
        } else {
            false
        };

        if is_break {
            if !summary.is_empty() {
                summary_closed = true;
            }
        } else if summary_closed {
            rest.push(line);
        } else {
            summary.push(line);
        }
    }

    if !summary.is_empty() {
        record.description = Some(summary.join("\n"));
    }
    let long = rest.join(" ");
    if !long.is_empty() {
        record.long_description = Some(long);
    }
    record
}

fn comment_lines(comment: &str) -> impl Iterator<Item = &str> {
    let body = comment.trim();
    let body = body.strip_prefix("/**").unwrap_or(body);
    let body = body.strip_suffix("*/").unwrap_or(body);
    body.lines().map(|line| {
        let line = line.trim_start();
        line.strip_prefix('*').unwrap_or(line)
    })
}

/// Split `@name value` into its parts; `None` when the line is not a tag.
fn split_tag(line: &str) -> Option<(&str, &str)> {
    let rest = line.strip_prefix('@')?;
    let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let name = &rest[..end];
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
    valid.then(|| (name, rest[end..].trim()))
}

/// Record one tag. Returns false when the tag is malformed and the line
/// should be kept as text.
fn apply_tag(record: &mut MetadataRecord, name: &str, value: &str) -> bool {
    match name {
        "param" => record.params.push(parse_param(value)),
        "throws" => record.throws.push(parse_throws(value)),
        "header" => record.headers.push(value.to_string()),
        "url" => record.urls.push(value.to_string()),
        "return" => {
            let mut parsed = parse_return(value);
            if let Some(existing) = record.returns.take() {
                parsed.description = parsed.description.or(existing.description);
            }
            record.returns = Some(parsed);
        }
        "status" => {
            let Some(parsed) = parse_status(value) else {
                return false;
            };
            if record.status.is_none() {
                record.status = Some(parsed);
            }
        }
        "class" => {
            let (identifier, config) = parse_class(value);
            if !identifier.is_empty() {
                record.classes.entry(identifier).or_default().extend(config);
            }
        }
        _ => {
            record
                .tags
                .entry(name.to_string())
                .or_insert_with(|| value.to_string());
        }
    }
    true
}

/// Split around the first `{...}` block: (before, inside, after).
fn split_braces(value: &str) -> (&str, Option<&str>, Option<&str>) {
    let mut parts = value.split(['{', '}']);
    let before = parts.next().unwrap_or_default();
    (before, parts.next(), parts.next())
}

fn parse_query(query: &str) -> BTreeMap<String, QueryValue> {
    form_urlencoded::parse(query.trim().as_bytes())
        .map(|(key, value)| (key.into_owned(), QueryValue::from_raw(&value)))
        .collect()
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

fn parse_param(value: &str) -> ParamTag {
    let (type_name, rest) = value.split_once(' ').unwrap_or((value, ""));
    let (before, rules, after) = split_braces(rest);
    let before = before.trim_start();
    let (name, description) = before.split_once(' ').unwrap_or((before, ""));

    let mut tag = ParamTag {
        type_name: type_name.to_string(),
        name: name.trim_matches(|c| c == '$' || c == ' ').to_string(),
        description: non_empty(description),
        validate: BTreeMap::new(),
    };
    if let Some(rules) = rules.filter(|r| !r.trim().is_empty()) {
        tag.validate = parse_query(rules);
    }
    if let Some(after) = after.and_then(non_empty) {
        tag.description = Some(after);
    }
    tag
}

fn parse_return(value: &str) -> ReturnTag {
    let (type_name, description) = value.split_once(' ').unwrap_or((value, ""));
    ReturnTag {
        type_name: type_name.to_string(),
        description: non_empty(description),
    }
}

fn parse_status(value: &str) -> Option<StatusTag> {
    let (code, reason) = value.split_once(' ').unwrap_or((value, ""));
    if !code.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    let code = code.parse::<u16>().ok().filter(|&code| code > 0)?;
    Some(StatusTag {
        code,
        reason: reason.trim().to_string(),
    })
}

fn parse_throws(value: &str) -> ThrowsTag {
    let mut parts = value.splitn(3, ' ');
    let exception = parts.next().unwrap_or_default().to_string();
    let code = parts
        .next()
        .and_then(|code| code.parse::<u16>().ok())
        .unwrap_or(500);
    ThrowsTag {
        exception,
        code,
        reason: parts.next().unwrap_or_default().to_string(),
    }
}

fn parse_class(value: &str) -> (String, BTreeMap<String, QueryValue>) {
    let (identifier, config, _) = split_braces(value);
    (
        identifier.trim().to_string(),
        config.map(parse_query).unwrap_or_default(),
    )
}
