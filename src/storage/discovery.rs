//! Package discovery
//!
//! Walks dependency roots looking for directories that carry a package
//! manifest. By default the walk stops underneath a found package; deep
//! recursion keeps scanning for nested packages below it.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::debug;

use crate::domain::{Package, Pool};

use super::manifest::has_manifest;
use super::package::load_package;

/// Finds every package underneath the given roots. A root that is
/// itself a package is included. A root that is not a directory is an
/// error, not an empty result.
pub fn discover(roots: &[PathBuf], deep_recurse: bool) -> Result<Vec<Package>> {
    let mut packages = Vec::new();
    for root in roots {
        if !root.is_dir() {
            bail!("{} is not a directory", root.display());
        }
        walk(root, deep_recurse, &mut packages)
            .with_context(|| format!("failed to scan {}", root.display()))?;
    }
    Ok(packages)
}

/// Builds a resolution pool from every package found under the roots.
pub fn load_pool(roots: &[PathBuf], deep_recurse: bool) -> Result<Pool> {
    let mut pool = Pool::new();
    for package in discover(roots, deep_recurse)? {
        debug!("registering package {}", package.name());
        pool.register(package);
    }
    Ok(pool)
}

fn walk(dir: &Path, deep_recurse: bool, packages: &mut Vec<Package>) -> Result<()> {
    // A subdirectory can vanish between listing and descent.
    if !dir.is_dir() {
        return Ok(());
    }

    let found = has_manifest(dir);
    if found {
        packages.push(load_package(dir)?);
        if !deep_recurse {
            return Ok(());
        }
    }

    let mut entries: Vec<PathBuf> = dir
        .read_dir()
        .with_context(|| format!("failed to read {}", dir.display()))?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_dir())
        .collect();
    entries.sort();

    for entry in entries {
        walk(&entry, deep_recurse, packages)?;
    }
    Ok(())
}
