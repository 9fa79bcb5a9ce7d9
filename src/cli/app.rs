//! Main CLI application structure

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::compile::{self, CompileOptions};
use super::output::{Output, OutputFormat};
use super::watch;

#[derive(Parser)]
#[command(name = "weld")]
#[command(author, version, about = "Dependency-aware packager for header-annotated sources")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format
    #[arg(long, short = 'f', global = true, default_value = "text")]
    pub format: OutputFormat,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Compile a package into a single ordered bundle
    Compile {
        /// Package directory containing package.yml or package.json
        #[arg(long, short = 'i', default_value = ".")]
        input_dir: PathBuf,

        /// Directory to write the bundle and companion documents to
        #[arg(long, short = 'o', default_value = ".")]
        output_dir: PathBuf,

        /// Dependency root to scan for packages (repeatable)
        #[arg(long = "deps-dir", short = 'd')]
        deps_dirs: Vec<PathBuf>,

        /// Keep scanning for nested packages beneath a found package
        #[arg(long)]
        deep_scan: bool,

        /// Also generate an includes.js development loader
        #[arg(long)]
        generate_includes: bool,

        /// Base directory for paths inside includes.js
        #[arg(long, requires = "generate_includes")]
        includes_root: Option<PathBuf>,

        /// Post-processor to apply, e.g. `semicolon` or `strip:MARKER` (repeatable)
        #[arg(long = "postproc")]
        postproc: Vec<String>,

        /// Skip writing scripts.json
        #[arg(long)]
        without_scripts_info: bool,

        /// Skip writing tree.json
        #[arg(long)]
        without_tree_info: bool,

        /// Recompile whenever sources or manifests change
        #[arg(long, short = 'w')]
        watch: bool,

        /// Print pool statistics after compiling
        #[arg(long)]
        stats: bool,
    },
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    let output = Output::new(cli.format, cli.verbose);

    match cli.command {
        Commands::Compile {
            input_dir,
            output_dir,
            deps_dirs,
            deep_scan,
            generate_includes,
            includes_root,
            postproc,
            without_scripts_info,
            without_tree_info,
            watch,
            stats,
        } => {
            let options = CompileOptions {
                input_dir,
                output_dir,
                deps_dirs,
                deep_scan,
                generate_includes,
                includes_root,
                postproc,
                without_scripts_info,
                without_tree_info,
                stats,
            };

            compile::run(&options, &output)?;
            if watch {
                watch::watch_and_recompile(&options, &output)?;
            }
        }
    }

    Ok(())
}
