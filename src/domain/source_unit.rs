//! Source units
//!
//! A source unit is a single packageable file: its immutable original
//! text, a mutable working copy used by post-processing, and the
//! metadata parsed once from the YAML header found in the first comment
//! block of the text.
//!
//! Header format:
//!
//! ```text
//! /*
//! ---
//! description: Drag and drop
//! license: MIT
//! authors: [Jane Doe]
//! provides: [Drag]
//! requires: [Core/Class, Core/*]
//! ...
//! */
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::Deserialize;
use thiserror::Error;

use super::tag::Tag;

/// Construction failure for a source unit.
///
/// Any of these is fatal to the unit; a dependency graph with missing
/// nodes is unsound, so callers abort the build rather than skip.
#[derive(Debug, Error)]
pub enum SourceUnitError {
    #[error("{0}: file does not exist")]
    FileNotFound(PathBuf),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("{filename} is missing a header or the header is invalid")]
    MissingHeader { filename: String },

    #[error("{filename} has a malformed header")]
    MalformedHeader {
        filename: String,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Header-derived metadata, immutable after construction.
#[derive(Debug, Clone)]
struct UnitMeta {
    original_text: String,
    filename: Option<PathBuf>,
    namespace: Option<String>,
    description: Option<String>,
    license: Option<String>,
    authors: Vec<String>,
    provides: Vec<Tag>,
    requires: Vec<Tag>,
    replaces: Option<Tag>,
    extends: Option<Tag>,
}

/// A single packageable source file.
///
/// Cloning is cheap for the metadata (shared) and copies only the
/// working text. Two units are equal iff their filenames match; units
/// built from raw text fall back to comparing the original text.
#[derive(Debug, Clone)]
pub struct SourceUnit {
    meta: Arc<UnitMeta>,
    working_text: String,
}

impl SourceUnit {
    /// Parses a unit from raw text.
    pub fn from_text(text: &str, namespace: Option<&str>) -> Result<SourceUnit, SourceUnitError> {
        Self::build(text, None, namespace)
    }

    /// Reads and parses a unit from a file.
    ///
    /// The stored filename is canonicalized so that unit equality and
    /// relative-path projection behave regardless of how the path was
    /// spelled.
    pub fn from_file(
        path: impl AsRef<Path>,
        namespace: Option<&str>,
    ) -> Result<SourceUnit, SourceUnitError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(SourceUnitError::FileNotFound(path.to_path_buf()));
        }
        let canonical = std::fs::canonicalize(path).map_err(|source| SourceUnitError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let text = std::fs::read_to_string(&canonical).map_err(|source| SourceUnitError::Io {
            path: canonical.clone(),
            source,
        })?;
        Self::build(&text, Some(canonical), namespace)
    }

    fn build(
        text: &str,
        filename: Option<PathBuf>,
        namespace: Option<&str>,
    ) -> Result<SourceUnit, SourceUnitError> {
        let original_text = text.replace('\u{feff}', "");
        let display_name = filename
            .as_deref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "(inline source)".to_string());

        let block = extract_header(&original_text).ok_or_else(|| {
            SourceUnitError::MissingHeader {
                filename: display_name.clone(),
            }
        })?;

        let raw: RawHeader =
            serde_yaml::from_str(block).map_err(|source| SourceUnitError::MalformedHeader {
                filename: display_name,
                source,
            })?;

        let authors = raw
            .author
            .into_iter()
            .chain(raw.authors)
            .flat_map(OneOrMany::into_vec)
            .collect();

        let meta = UnitMeta {
            description: raw.description,
            license: raw.license,
            authors,
            provides: process_tag_list(raw.provides, namespace),
            requires: process_tag_list(raw.requires, namespace),
            replaces: raw.replaces.and_then(|t| process_tag(t, namespace)),
            extends: raw.extends.and_then(|t| process_tag(t, namespace)),
            namespace: namespace.map(str::to_string),
            filename,
            original_text,
        };

        let working_text = meta.original_text.clone();
        Ok(SourceUnit {
            meta: Arc::new(meta),
            working_text,
        })
    }

    /// Original text as read from disk, immutable.
    pub fn original_text(&self) -> &str {
        &self.meta.original_text
    }

    /// Working copy of the text, as mutated by post-processing.
    pub fn working_text(&self) -> &str {
        &self.working_text
    }

    /// Returns a copy of this unit carrying different working text.
    pub fn with_working_text(&self, text: impl Into<String>) -> SourceUnit {
        SourceUnit {
            meta: Arc::clone(&self.meta),
            working_text: text.into(),
        }
    }

    /// Returns a copy of this unit with the given filename assigned.
    ///
    /// Mostly useful for units built from raw text.
    pub fn with_filename(&self, filename: impl Into<PathBuf>) -> SourceUnit {
        let mut meta = (*self.meta).clone();
        meta.filename = Some(filename.into());
        SourceUnit {
            meta: Arc::new(meta),
            working_text: self.working_text.clone(),
        }
    }

    pub fn filename(&self) -> Option<&Path> {
        self.meta.filename.as_deref()
    }

    /// Namespace the unit was assigned at load time, if any.
    pub fn namespace(&self) -> Option<&str> {
        self.meta.namespace.as_deref()
    }

    pub fn description(&self) -> Option<&str> {
        self.meta.description.as_deref()
    }

    pub fn license(&self) -> Option<&str> {
        self.meta.license.as_deref()
    }

    pub fn authors(&self) -> &[String] {
        &self.meta.authors
    }

    /// Tags this unit provides.
    pub fn provides(&self) -> &[Tag] {
        &self.meta.provides
    }

    /// Tags this unit requires.
    pub fn requires(&self) -> &[Tag] {
        &self.meta.requires
    }

    /// Tag of the provider this unit replaces wholesale, if any.
    pub fn replaces(&self) -> Option<&Tag> {
        self.meta.replaces.as_ref()
    }

    /// Tag of the provider this unit extends (append-after), if any.
    pub fn extends(&self) -> Option<&Tag> {
        self.meta.extends.as_ref()
    }

    pub fn is_extension(&self) -> bool {
        self.meta.extends.as_ref().is_some_and(|t| !t.is_empty())
    }

    pub fn is_replacement(&self) -> bool {
        self.meta.replaces.as_ref().is_some_and(|t| !t.is_empty())
    }

    /// Ordered list of filesystem paths this unit contributes.
    ///
    /// For a plain unit that is just its own file; extensions and
    /// replacements surface their paths only once selected into an
    /// order, which is the container's job.
    pub fn required_files(&self) -> Vec<PathBuf> {
        self.meta.filename.iter().cloned().collect()
    }
}

impl PartialEq for SourceUnit {
    fn eq(&self, other: &Self) -> bool {
        match (&self.meta.filename, &other.meta.filename) {
            (Some(a), Some(b)) => a == b,
            (None, None) => self.meta.original_text == other.meta.original_text,
            _ => false,
        }
    }
}

impl Eq for SourceUnit {}

impl Hash for SourceUnit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.meta.filename.hash(state);
    }
}

impl fmt::Display for SourceUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.meta.filename {
            Some(path) => write!(f, "{}", path.display()),
            None => write!(f, "(inline source)"),
        }
    }
}

/// Raw header as it appears in the YAML block.
#[derive(Debug, Deserialize)]
struct RawHeader {
    description: Option<String>,
    license: Option<String>,
    author: Option<OneOrMany<String>>,
    authors: Option<OneOrMany<String>>,
    requires: Option<OneOrMany<RawTag>>,
    provides: Option<OneOrMany<RawTag>>,
    replaces: Option<RawTag>,
    extends: Option<RawTag>,
}

/// A scalar that may also appear as a list in the wild.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            OneOrMany::One(item) => vec![item],
            OneOrMany::Many(items) => items,
        }
    }
}

/// Tag reference in a header: either a plain string or the legacy
/// key-value form `{Namespace/1.3.0: Name}`.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawTag {
    Plain(String),
    Legacy(BTreeMap<String, String>),
}

fn process_tag(raw: RawTag, namespace: Option<&str>) -> Option<Tag> {
    let tag = match raw {
        RawTag::Plain(name) => Tag::namespaced(&name, namespace),
        RawTag::Legacy(map) => {
            let (ns, name) = map.into_iter().next()?;
            let ns = strip_version_suffix(&ns);
            Tag::new(&format!("{ns}/{name}"))
        }
    };
    (!tag.is_empty()).then_some(tag)
}

fn process_tag_list(raw: Option<OneOrMany<RawTag>>, namespace: Option<&str>) -> Vec<Tag> {
    raw.into_iter()
        .flat_map(OneOrMany::into_vec)
        .filter_map(|tag| process_tag(tag, namespace))
        .collect()
}

/// Drops a trailing version segment like `/1.3.0` from a legacy
/// namespace key.
fn strip_version_suffix(namespace: &str) -> &str {
    match namespace.rfind('/') {
        Some(pos) => {
            let suffix = &namespace[pos + 1..];
            let looks_like_version = !suffix.is_empty()
                && suffix.chars().all(|c| c.is_ascii_digit() || c == '.')
                && suffix.chars().any(|c| c.is_ascii_digit());
            if looks_like_version {
                &namespace[..pos]
            } else {
                namespace
            }
        }
        None => namespace,
    }
}

/// Finds the YAML payload of the first comment block, which must open at
/// the start of a line and begin with a `---` document marker.
fn extract_header(text: &str) -> Option<&str> {
    let mut search_from = 0;
    while let Some(found) = text[search_from..].find("/*") {
        let open = search_from + found;
        let line_start = text[..open].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let rest = &text[open + 2..];
        let close = rest.find("*/")?;
        let body = &rest[..close];
        if text[line_start..open].trim().is_empty() && body.trim_start().starts_with("---") {
            return Some(body);
        }
        search_from = open + 2 + close + 2;
    }
    None
}
