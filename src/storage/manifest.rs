//! Package manifests
//!
//! A package directory carries its metadata in `package.yml` (YAML) or
//! `package.json` (JSON): the package name, an optional description and
//! bundle filename, and the ordered list of source files.

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::domain::inflection::snake_case;

/// Manifest basenames probed in order.
pub const MANIFEST_NAMES: [&str; 2] = ["package.yml", "package.json"];

#[derive(Debug, Error)]
pub enum ManifestError {
    #[error("{0} does not contain a package.yml or package.json manifest")]
    NotFound(PathBuf),

    #[error("failed to read {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}")]
    Yaml {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    #[error("failed to parse {path}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Parsed manifest document.
#[derive(Debug, Clone, Deserialize)]
pub struct Manifest {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Bundle filename; defaults to the snake-cased name plus `.js`.
    #[serde(default)]
    pub filename: Option<String>,

    /// Ordered list of source files, relative to the package directory.
    #[serde(default, alias = "sources")]
    pub files: Vec<String>,
}

impl Manifest {
    /// Loads the manifest found in a package directory.
    pub fn load(directory: &Path) -> Result<Manifest, ManifestError> {
        let yml = directory.join("package.yml");
        if yml.exists() {
            let text = fs::read_to_string(&yml).map_err(|source| ManifestError::Io {
                path: yml.clone(),
                source,
            })?;
            return serde_yaml::from_str(&text)
                .map_err(|source| ManifestError::Yaml { path: yml, source });
        }

        let json = directory.join("package.json");
        if json.exists() {
            let text = fs::read_to_string(&json).map_err(|source| ManifestError::Io {
                path: json.clone(),
                source,
            })?;
            return serde_json::from_str(&text)
                .map_err(|source| ManifestError::Json { path: json, source });
        }

        Err(ManifestError::NotFound(directory.to_path_buf()))
    }

    /// Effective bundle filename.
    pub fn bundle_filename(&self) -> String {
        self.filename
            .clone()
            .unwrap_or_else(|| format!("{}.js", snake_case(&self.name)))
    }
}

/// True when the directory holds a package manifest.
pub fn has_manifest(directory: &Path) -> bool {
    MANIFEST_NAMES.iter().any(|name| directory.join(name).exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn loads_yaml_manifest() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.yml"),
            "name: Orwik\ndescription: test package\nfiles:\n  - Source/Color.js\n",
        )
        .unwrap();

        let manifest = Manifest::load(dir.path()).unwrap();
        assert_eq!(manifest.name, "Orwik");
        assert_eq!(manifest.description.as_deref(), Some("test package"));
        assert_eq!(manifest.files, ["Source/Color.js"]);
        assert_eq!(manifest.bundle_filename(), "orwik.js");
    }

    #[test]
    fn loads_json_manifest_with_sources_alias() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.json"),
            r#"{"name": "Core", "sources": ["a.js", "b.js"], "filename": "core-bundle.js"}"#,
        )
        .unwrap();

        let manifest = Manifest::load(dir.path()).unwrap();
        assert_eq!(manifest.files, ["a.js", "b.js"]);
        assert_eq!(manifest.bundle_filename(), "core-bundle.js");
    }

    #[test]
    fn yaml_takes_precedence_over_json() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.yml"), "name: FromYaml\n").unwrap();
        fs::write(dir.path().join("package.json"), r#"{"name": "FromJson"}"#).unwrap();

        assert_eq!(Manifest::load(dir.path()).unwrap().name, "FromYaml");
    }

    #[test]
    fn missing_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::NotFound(_)));
    }

    #[test]
    fn malformed_manifest_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("package.json"), "{not json").unwrap();
        let err = Manifest::load(dir.path()).unwrap_err();
        assert!(matches!(err, ManifestError::Json { .. }));
    }

    #[test]
    fn has_manifest_probes_both_names() {
        let dir = TempDir::new().unwrap();
        assert!(!has_manifest(dir.path()));
        fs::write(dir.path().join("package.json"), "{}").unwrap();
        assert!(has_manifest(dir.path()));
    }
}
