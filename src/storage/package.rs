//! Package loading and compilation artifacts
//!
//! Turns a package directory into a [`domain::Package`](crate::domain::Package)
//! by reading its manifest and parsing every listed source file under the
//! package namespace. Also renders the `scripts.json` and `tree.json`
//! documents describing a compiled package.

use std::fs;
use std::path::{Component, Path, PathBuf};

use serde_json::{json, Map, Value};
use thiserror::Error;

use crate::domain::{Package, SourceUnit, SourceUnitError, Tag};

use super::manifest::{Manifest, ManifestError};

#[derive(Debug, Error)]
pub enum PackageError {
    #[error(transparent)]
    Manifest(#[from] ManifestError),

    #[error("in package {package}: {source}")]
    Unit {
        package: String,
        #[source]
        source: SourceUnitError,
    },
}

/// Loads a package from its directory: manifest first, then every
/// listed source file, namespaced by the package name.
pub fn load_package(directory: &Path) -> Result<Package, PackageError> {
    let directory = fs::canonicalize(directory).map_err(|source| ManifestError::Io {
        path: directory.to_path_buf(),
        source,
    })?;
    let manifest = Manifest::load(&directory)?;

    let mut package = Package::new(&manifest.name);
    if let Some(description) = &manifest.description {
        package.set_description(description);
    }
    package.set_filename(manifest.bundle_filename());
    package.set_directory(&directory);

    for file in &manifest.files {
        let unit = SourceUnit::from_file(directory.join(file), Some(&manifest.name)).map_err(
            |source| PackageError::Unit {
                package: manifest.name.clone(),
                source,
            },
        )?;
        package.add_unit(unit);
    }

    Ok(package)
}

/// The `scripts.json` document: one entry per package, listing what the
/// bundle provides and what it still requires from outside.
pub fn scripts_info(package: &Package) -> Value {
    let provides: Vec<String> = package
        .provides()
        .iter()
        .map(|tag| short_name(tag, package.name()))
        .collect();
    let requires: Vec<String> = package
        .requires()
        .iter()
        .map(|tag| short_name(tag, package.name()))
        .collect();

    json!({
        package.name(): {
            "desc": package.description().unwrap_or(""),
            "provides": provides,
            "requires": requires,
        }
    })
}

/// The `tree.json` document: source units arranged by their location
/// inside the package directory, one summary per unit.
pub fn tree_info(package: &Package) -> Value {
    let mut root = Map::new();
    for unit in package.units() {
        let Some(filename) = unit.filename() else {
            continue;
        };
        let segments = tree_segments(filename, package.directory());
        insert_at_path(&mut root, &segments, unit_summary(unit, package.name()));
    }
    Value::Object(root)
}

fn insert_at_path(node: &mut Map<String, Value>, path: &[String], summary: Value) {
    match path {
        [] => {}
        [leaf] => {
            node.insert(leaf.clone(), summary);
        }
        [head, rest @ ..] => {
            let child = node
                .entry(head.clone())
                .or_insert_with(|| Value::Object(Map::new()));
            if let Value::Object(map) = child {
                insert_at_path(map, rest, summary);
            }
        }
    }
}

/// Writes `scripts.json` into the output directory.
pub fn write_scripts_info(package: &Package, output_dir: &Path) -> anyhow::Result<PathBuf> {
    let path = output_dir.join("scripts.json");
    fs::write(&path, format!("{:#}", scripts_info(package)))?;
    Ok(path)
}

/// Writes `tree.json` into the output directory.
pub fn write_tree_info(package: &Package, output_dir: &Path) -> anyhow::Result<PathBuf> {
    let path = output_dir.join("tree.json");
    fs::write(&path, format!("{:#}", tree_info(package)))?;
    Ok(path)
}

fn unit_summary(unit: &SourceUnit, namespace: &str) -> Value {
    let requires: Vec<String> = unit
        .requires()
        .iter()
        .map(|tag| short_name(tag, namespace))
        .collect();
    let provides: Vec<String> = unit
        .provides()
        .iter()
        .map(|tag| short_name(tag, namespace))
        .collect();
    json!({
        "desc": unit.description().unwrap_or(""),
        "requires": requires,
        "provides": provides,
    })
}

/// Renders a tag relative to the package namespace: tags from the
/// package itself lose their prefix, foreign tags keep the full form.
fn short_name(tag: &Tag, namespace: &str) -> String {
    let local = Tag::namespaced("X", Some(namespace));
    if tag.namespace() == local.namespace() {
        tag.name().to_string()
    } else {
        tag.full_name()
    }
}

/// Path components of a unit file relative to the package directory,
/// with the conventional `Source` prefix elided.
fn tree_segments(filename: &Path, directory: Option<&Path>) -> Vec<String> {
    let relative = directory
        .and_then(|dir| filename.strip_prefix(dir).ok())
        .unwrap_or(filename);
    relative
        .components()
        .filter_map(|component| match component {
            Component::Normal(part) => Some(part.to_string_lossy().into_owned()),
            _ => None,
        })
        .map(|part| {
            part.strip_suffix(".js")
                .map(str::to_string)
                .unwrap_or(part)
        })
        .filter(|part| part != "Source")
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const COLOR: &str = "/*\n---\ndescription: color model\nprovides: [Color]\nrequires: [Core/Class]\n...\n*/\nvar Color = {};\n";
    const WIDGET: &str = "/*\n---\ndescription: widget\nprovides: [Widget]\nrequires: [Color]\n...\n*/\nvar Widget = {};\n";

    fn fixture() -> (TempDir, Package) {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("Source")).unwrap();
        fs::write(dir.path().join("Source/Color.js"), COLOR).unwrap();
        fs::write(dir.path().join("Source/Widget.js"), WIDGET).unwrap();
        fs::write(
            dir.path().join("package.yml"),
            "name: Orwik\ndescription: test\nfiles:\n  - Source/Color.js\n  - Source/Widget.js\n",
        )
        .unwrap();
        let package = load_package(dir.path()).unwrap();
        (dir, package)
    }

    #[test]
    fn loads_units_under_package_namespace() {
        let (_dir, package) = fixture();
        assert_eq!(package.name(), "Orwik");
        assert_eq!(package.units().len(), 2);
        assert_eq!(
            package.provides(),
            vec![Tag::new("Orwik/Color"), Tag::new("Orwik/Widget")]
        );
        assert_eq!(package.requires(), vec![Tag::new("Core/Class")]);
    }

    #[test]
    fn missing_source_file_is_an_error() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join("package.yml"),
            "name: Broken\nfiles:\n  - gone.js\n",
        )
        .unwrap();
        let err = load_package(dir.path()).unwrap_err();
        assert!(matches!(err, PackageError::Unit { .. }));
    }

    #[test]
    fn scripts_info_uses_short_names_for_local_tags() {
        let (_dir, package) = fixture();
        let info = scripts_info(&package);
        let entry = &info["Orwik"];
        assert_eq!(entry["desc"], "test");
        assert_eq!(entry["provides"], json!(["Color", "Widget"]));
        assert_eq!(entry["requires"], json!(["Core/Class"]));
    }

    #[test]
    fn tree_info_elides_source_directory() {
        let (_dir, package) = fixture();
        let tree = tree_info(&package);
        assert_eq!(tree["Color"]["provides"], json!(["Color"]));
        assert_eq!(tree["Widget"]["requires"], json!(["Color"]));
        assert!(tree.get("Source").is_none());
    }

    #[test]
    fn writers_place_documents_in_output_dir() {
        let (_dir, package) = fixture();
        let out = TempDir::new().unwrap();
        let scripts = write_scripts_info(&package, out.path()).unwrap();
        let tree = write_tree_info(&package, out.path()).unwrap();
        assert!(scripts.ends_with("scripts.json"));
        assert!(tree.exists());

        let parsed: Value =
            serde_json::from_str(&fs::read_to_string(&scripts).unwrap()).unwrap();
        assert!(parsed["Orwik"].is_object());
    }
}
