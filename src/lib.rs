//! Weld - a dependency-aware packager for header-annotated sources
//!
//! Weld reads source files carrying a YAML metadata header (`provides`,
//! `requires`, `extends`, `replaces` tags), resolves their dependencies
//! across packages and concatenates them into a single bundle in
//! topological order.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{Container, Package, Packager, Pool, SourceUnit, Tag};
