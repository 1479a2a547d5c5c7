//! HTTP verbs understood by the route table.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// A verb a route can be registered under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Verb {
    Get,
    Post,
    Put,
    Patch,
    Delete,
    Head,
    Options,
}

impl Verb {
    pub const ALL: [Verb; 7] = [
        Verb::Get,
        Verb::Post,
        Verb::Put,
        Verb::Patch,
        Verb::Delete,
        Verb::Head,
        Verb::Options,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Verb::Get => "GET",
            Verb::Post => "POST",
            Verb::Put => "PUT",
            Verb::Patch => "PATCH",
            Verb::Delete => "DELETE",
            Verb::Head => "HEAD",
            Verb::Options => "OPTIONS",
        }
    }

    /// Whether requests with this verb carry a body the dispatcher decodes.
    pub fn has_body(&self) -> bool {
        matches!(self, Verb::Put | Verb::Patch | Verb::Post)
    }

    /// Split a leading verb name off `name`, ignoring case.
    ///
    /// `"getUsers"` yields `(Get, "Users")`.
    pub fn strip_prefix(name: &str) -> Option<(Verb, &str)> {
        Verb::ALL.into_iter().find_map(|verb| {
            let prefix = verb.as_str();
            let head = name.get(..prefix.len())?;
            head.eq_ignore_ascii_case(prefix)
                .then(|| (verb, &name[prefix.len()..]))
        })
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Verb {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(s))
            .ok_or(())
    }
}
