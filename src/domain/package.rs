//! Packages
//!
//! A package is a named grouping of source units sharing a namespace.
//! It is mostly a data holder consumed by the resolution pool; loading
//! a package from a manifest on disk lives in the storage layer.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use super::inflection::snake_case;
use super::source_unit::SourceUnit;
use super::tag::Tag;

/// A named collection of source units.
#[derive(Debug, Clone)]
pub struct Package {
    name: String,
    description: Option<String>,
    filename: String,
    directory: Option<PathBuf>,
    units: Vec<SourceUnit>,
    extensions: Vec<SourceUnit>,
}

impl Package {
    /// Creates an empty package. The bundle filename defaults to the
    /// snake-cased package name plus a `.js` extension.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let filename = format!("{}.js", snake_case(&name));
        Package {
            name,
            description: None,
            filename,
            directory: None,
            units: Vec::new(),
            extensions: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn set_description(&mut self, description: impl Into<String>) {
        self.description = Some(description.into());
    }

    /// Filename of the compiled bundle.
    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn set_filename(&mut self, filename: impl Into<String>) {
        self.filename = filename.into();
    }

    /// Directory the package was loaded from, if any.
    pub fn directory(&self) -> Option<&Path> {
        self.directory.as_deref()
    }

    pub fn set_directory(&mut self, directory: impl Into<PathBuf>) {
        self.directory = Some(directory.into());
    }

    /// Adds a unit, separating extensions from regular units.
    pub fn add_unit(&mut self, unit: SourceUnit) {
        if unit.is_extension() {
            self.extensions.push(unit);
        } else {
            self.units.push(unit);
        }
    }

    /// Regular (non-extension) units, in declaration order.
    pub fn units(&self) -> &[SourceUnit] {
        &self.units
    }

    /// Extension units declared by this package.
    pub fn extensions(&self) -> &[SourceUnit] {
        &self.extensions
    }

    /// Union of tags provided by the package's units.
    pub fn provides(&self) -> Vec<Tag> {
        let mut tags = Vec::new();
        for unit in &self.units {
            for tag in unit.provides() {
                if !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        tags
    }

    /// Union of required tags not satisfied within the package.
    pub fn requires(&self) -> Vec<Tag> {
        let provided: HashSet<Tag> = self.provides().into_iter().collect();
        let mut tags = Vec::new();
        for unit in &self.units {
            for tag in unit.requires() {
                if !provided.contains(tag) && !tags.contains(tag) {
                    tags.push(tag.clone());
                }
            }
        }
        tags
    }

    /// Ordered list of the package's own unit files.
    pub fn required_files(&self) -> Vec<PathBuf> {
        self.units.iter().flat_map(|unit| unit.required_files()).collect()
    }
}
