//! The `compile` command
//!
//! Resolves a package against its dependency pool, orders the sources,
//! runs post-processors and writes the bundle plus its companion
//! documents into the output directory.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};

use crate::domain::{Packager, Pool};
use crate::storage::{self, load_package};

use super::output::Output;

/// Everything the compile pipeline needs, parsed off the command line.
#[derive(Debug, Clone)]
pub struct CompileOptions {
    pub input_dir: PathBuf,
    pub output_dir: PathBuf,
    pub deps_dirs: Vec<PathBuf>,
    pub deep_scan: bool,
    pub generate_includes: bool,
    pub includes_root: Option<PathBuf>,
    pub postproc: Vec<String>,
    pub without_scripts_info: bool,
    pub without_tree_info: bool,
    pub stats: bool,
}

/// Runs one full compilation.
pub fn run(options: &CompileOptions, output: &Output) -> Result<()> {
    fs::create_dir_all(&options.output_dir).with_context(|| {
        format!(
            "failed to create output directory {}",
            options.output_dir.display()
        )
    })?;

    output.verbose_ctx(
        "compile",
        &format!("scanning {} dependency root(s)", options.deps_dirs.len()),
    );
    let mut pool = storage::load_pool(&options.deps_dirs, options.deep_scan)?;

    let package = load_package(&options.input_dir)?;
    output.verbose_ctx(
        "compile",
        &format!(
            "loaded package {} with {} unit(s)",
            package.name(),
            package.units().len()
        ),
    );
    pool.register(package.clone());

    let container = pool.compile_package(&package)?;
    let mut packager = Packager::new(container);
    let bundle = packager
        .pack_with(&options.postproc)
        .with_context(|| format!("cannot order sources of {}", package.name()))?;

    let bundle_path = options.output_dir.join(package.filename());
    fs::write(&bundle_path, &bundle)
        .with_context(|| format!("failed to write {}", bundle_path.display()))?;

    if !options.without_scripts_info {
        storage::write_scripts_info(&package, &options.output_dir)?;
    }
    if !options.without_tree_info {
        storage::write_tree_info(&package, &options.output_dir)?;
    }

    if options.generate_includes {
        let root = options
            .includes_root
            .clone()
            .unwrap_or_else(|| options.output_dir.clone());
        let root = fs::canonicalize(&root)
            .with_context(|| format!("invalid includes root {}", root.display()))?;
        let files = packager.container_mut().required_files(Some(&root))?;
        let includes_path = options.output_dir.join("includes.js");
        fs::write(&includes_path, includes_loader(&files))
            .with_context(|| format!("failed to write {}", includes_path.display()))?;
    }

    if options.stats {
        print_stats(&pool, output);
    }

    if output.is_json() {
        output.data(&serde_json::json!({
            "package": package.name(),
            "bundle": bundle_path.display().to_string(),
            "units": packager.container().all_units().count(),
        }));
    } else {
        output.success(&format!(
            "Compiled {} -> {}",
            package.name(),
            bundle_path.display()
        ));
    }

    Ok(())
}

/// Renders a development loader that `document.write`s one script tag
/// per source file, in dependency order.
fn includes_loader(files: &[PathBuf]) -> String {
    let mut script = String::from("(function() {\n  var sources = [\n");
    for file in files {
        let path = file.display().to_string().replace('\\', "/");
        script.push_str(&format!("    \"{}\",\n", path.replace('"', "\\\"")));
    }
    script.push_str(
        "  ];\n  for (var i = 0; i < sources.length; i++) {\n    \
         document.write('<script src=\"' + sources[i] + '\"></scr' + 'ipt>');\n  }\n})();\n",
    );
    script
}

fn print_stats(pool: &Pool, output: &Output) {
    output.blank();
    output.row(&["PACKAGE", "UNITS", "PROVIDES"]);
    for package in pool.packages() {
        let provides: Vec<String> = package.provides().iter().map(|t| t.full_name()).collect();
        output.row(&[
            package.name(),
            &package.units().len().to_string(),
            &provides.join(", "),
        ]);
    }
    output.blank();
    output.success(&format!(
        "{} package(s), {} unit(s) in pool",
        pool.packages().len(),
        pool.units().len()
    ));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn loader_lists_files_in_order() {
        let files = vec![PathBuf::from("a.js"), PathBuf::from("lib/b.js")];
        let script = includes_loader(&files);
        let a = script.find("\"a.js\"").unwrap();
        let b = script.find("\"lib/b.js\"").unwrap();
        assert!(a < b);
        assert!(script.contains("document.write"));
    }

    #[test]
    fn loader_escapes_quotes() {
        let files = vec![PathBuf::from("we\"ird.js")];
        assert!(includes_loader(&files).contains("we\\\"ird.js"));
    }
}
