//! Capability tags
//!
//! A tag names a capability a source unit provides or requires, e.g.
//! `Core/Class`. The part before the last separator is the namespace,
//! the rest is the short name. Tags are immutable value objects.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::inflection::mixed_case;

/// Separator between namespace segments and the short name.
pub const SEPARATOR: char = '/';

/// Wildcard marker matching a single path segment in tree queries.
pub const WILDCARD: char = '*';

/// A namespaced capability identifier.
///
/// Equality and hashing cover both namespace and name, after
/// normalization. Segments are normalized to MixedCase so that
/// `core/class` and `Core/Class` compare equal; a segment containing a
/// wildcard marker is kept verbatim so that glob patterns survive
/// construction.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Tag {
    namespace: Option<String>,
    name: String,
}

impl Tag {
    /// Creates a tag from its full name, normalizing every segment.
    ///
    /// A leading `/` or `./` is stripped first. The last segment becomes
    /// the short name; everything before it forms the namespace.
    pub fn new(full_name: &str) -> Self {
        let trimmed = full_name
            .trim()
            .trim_start_matches("./")
            .trim_start_matches(SEPARATOR);

        let mut segments: Vec<String> = trimmed
            .split(SEPARATOR)
            .map(normalize_segment)
            .collect();

        let name = segments.pop().unwrap_or_default();
        let namespace = if segments.is_empty() {
            None
        } else {
            Some(segments.join("/"))
        };

        Tag { namespace, name }
    }

    /// Creates a tag from a possibly-bare name, qualifying it with the
    /// given namespace when the name carries none of its own.
    pub fn namespaced(name: &str, namespace: Option<&str>) -> Self {
        let name = name.trim().trim_start_matches("./").trim_start_matches(SEPARATOR);
        match namespace {
            Some(ns) if !name.contains(SEPARATOR) => Tag::new(&format!("{ns}/{name}")),
            _ => Tag::new(name),
        }
    }

    /// Short name without the namespace.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Namespace part, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.namespace.as_deref()
    }

    /// Full name, `namespace/name` when a namespace is present.
    pub fn full_name(&self) -> String {
        match &self.namespace {
            Some(ns) => format!("{ns}/{}", self.name),
            None => self.name.clone(),
        }
    }

    /// True when the short name is absent or blank.
    pub fn is_empty(&self) -> bool {
        self.name.trim().is_empty()
    }

    /// True when any segment contains a wildcard marker.
    pub fn has_wildcard(&self) -> bool {
        self.name.contains(WILDCARD)
            || self.namespace.as_deref().is_some_and(|ns| ns.contains(WILDCARD))
    }
}

/// Wildcard segments pass through untouched; anything else is folded to
/// one canonical MixedCase form.
fn normalize_segment(segment: &str) -> String {
    if segment.contains(WILDCARD) {
        segment.to_string()
    } else {
        mixed_case(segment)
    }
}

impl fmt::Display for Tag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.full_name())
    }
}

impl From<&str> for Tag {
    fn from(full_name: &str) -> Self {
        Tag::new(full_name)
    }
}

impl From<String> for Tag {
    fn from(full_name: String) -> Self {
        Tag::new(&full_name)
    }
}
