//! # Storage Layer
//!
//! Filesystem side of the packager: manifests, package loading, and
//! package discovery.
//!
//! ## On-Disk Layout
//!
//! ```text
//! MyPackage/
//! ├── package.yml           # Manifest (package.json also accepted)
//! └── Source/
//!     ├── Color.js          # Source units with YAML headers
//!     └── Widget.js
//! ```
//!
//! ## Key Types
//!
//! - [`Manifest`] - Parsed `package.yml` / `package.json` document
//! - [`load_package`] - Directory to [`Package`](crate::domain::Package)
//! - [`discover`] / [`load_pool`] - Recursive package discovery

mod discovery;
mod manifest;
mod package;

pub use discovery::{discover, load_pool};
pub use manifest::{has_manifest, Manifest, ManifestError, MANIFEST_NAMES};
pub use package::{
    load_package, scripts_info, tree_info, write_scripts_info, write_tree_info, PackageError,
};
