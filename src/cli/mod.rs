//! # Command-Line Interface
//!
//! User-facing commands and output formatting.
//!
//! ## Commands
//!
//! | Command | Purpose |
//! |---------|---------|
//! | `compile` | Resolve, order and bundle a package |
//! | `compile --watch` | Recompile on source or manifest changes |
//!
//! ## Output Formats
//!
//! All commands support the `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output:
//! ```bash
//! weld --verbose compile -i MyPackage -o build
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod compile;
mod output;
mod watch;

pub use app::{run, Cli, Commands};
pub use compile::CompileOptions;
pub use output::{Output, OutputFormat};
pub use watch::RebuildGate;
