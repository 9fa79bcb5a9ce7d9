//! Domain models for weld
//!
//! The dependency-resolution and ordering core, free of filesystem
//! discovery concerns: tags, source units, the wildcard tag index, the
//! sorting container, and the cross-package resolution pool.

pub mod inflection;

mod container;
mod package;
mod packager;
mod pool;
mod postproc;
mod source_unit;
mod tag;
mod tag_tree;

pub use container::{Container, ContainerError, ContainerItem};
pub use package::Package;
pub use packager::Packager;
pub use pool::{LookupKey, Pool, PoolEntry, PoolError};
pub use postproc::{process_all, PostProcessor};
pub use source_unit::{SourceUnit, SourceUnitError};
pub use tag::{Tag, SEPARATOR, WILDCARD};
pub use tag_tree::TagTree;
