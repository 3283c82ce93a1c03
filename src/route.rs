//! Route normalization and the public route allow-list.
//!
//! DESIGN
//! ======
//! Routes are compared as normalized paths: query strings and fragments never
//! influence whether a page is public, and dot segments are resolved first so
//! `/auth/../dashboard` is gated as `/dashboard`. Entries ending in `/*` match a whole
//! subtree so `/auth/*` covers `/auth/login` and `/auth/callback`.

use std::collections::BTreeSet;

#[cfg(test)]
#[path = "route_test.rs"]
mod tests;

/// Normalize a route path for comparison.
///
/// Strips `?query` and `#fragment`, collapses repeated `/`, resolves `.` and
/// `..` segments (plain or percent-encoded as `%2e`), ensures a leading `/`
/// and drops a trailing `/` everywhere except the root. `..` never climbs
/// above the root.
#[must_use]
pub fn normalize_route(raw: &str) -> String {
    let end = raw.find(['?', '#']).unwrap_or(raw.len());
    let mut segments: Vec<&str> = Vec::new();
    for segment in raw[..end].trim().split('/') {
        match dot_segment(segment) {
            Some(DotSegment::Current) => {}
            Some(DotSegment::Parent) => {
                segments.pop();
            }
            None if segment.is_empty() => {}
            None => segments.push(segment),
        }
    }
    format!("/{}", segments.join("/"))
}

enum DotSegment {
    Current,
    Parent,
}

fn dot_segment(segment: &str) -> Option<DotSegment> {
    match segment.to_ascii_lowercase().replace("%2e", ".").as_str() {
        "." => Some(DotSegment::Current),
        ".." => Some(DotSegment::Parent),
        _ => None,
    }
}

/// Static allow-list of routes exempt from session verification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteSet {
    exact: BTreeSet<String>,
    prefixes: BTreeSet<String>,
}

impl RouteSet {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse a comma-separated list such as `"/, /login, /auth/*"`.
    /// Blank entries are ignored.
    #[must_use]
    pub fn parse(list: &str) -> Self {
        let mut set = Self::new();
        for entry in list.split(',').map(str::trim).filter(|e| !e.is_empty()) {
            set.insert(entry);
        }
        set
    }

    pub fn insert(&mut self, entry: &str) {
        let entry = entry.trim();
        if let Some(prefix) = entry.strip_suffix("/*") {
            self.prefixes.insert(normalize_route(prefix));
        } else {
            self.exact.insert(normalize_route(entry));
        }
    }

    /// Whether `route` is public. The route is normalized before matching.
    #[must_use]
    pub fn contains(&self, route: &str) -> bool {
        let route = normalize_route(route);
        if self.exact.contains(&route) {
            return true;
        }
        self.prefixes.iter().any(|prefix| {
            prefix == "/"
                || route == *prefix
                || route
                    .strip_prefix(prefix.as_str())
                    .is_some_and(|rest| rest.starts_with('/'))
        })
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.exact.is_empty() && self.prefixes.is_empty()
    }
}
