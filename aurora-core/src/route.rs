//! Route normalization used as the receiver index key when route parsing is on.

use serde::Serialize;
use std::fmt;

/// A route split into trimmed, non-empty `/`-separated segments.
///
/// `" account / deposit/ "` and `"account//deposit"` both parse to `account/deposit`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct ParsedRoute {
    segments: Vec<String>,
}

impl ParsedRoute {
    pub fn parse(route: &str) -> Self {
        let segments = route
            .split('/')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.split_whitespace().collect::<Vec<_>>().join(" "))
            .collect();
        Self { segments }
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }
}

impl fmt::Display for ParsedRoute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.segments.join("/"))
    }
}
