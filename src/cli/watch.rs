//! Watch mode: recompile when sources or manifests change.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result};
use notify::RecursiveMode;
use notify_debouncer_mini::new_debouncer;

use super::compile::{self, CompileOptions};
use super::output::Output;

const DEBOUNCE: Duration = Duration::from_millis(300);

/// Single-slot rebuild gate. Triggers arriving while a rebuild is in
/// flight are dropped, not queued; the gate is released whether the
/// rebuild succeeded or failed.
pub struct RebuildGate {
    busy: AtomicBool,
}

impl RebuildGate {
    pub fn new() -> Self {
        RebuildGate {
            busy: AtomicBool::new(false),
        }
    }

    /// Runs the closure if the gate is free, returning its result.
    /// Returns `None` when a rebuild already holds the gate.
    pub fn run<T>(&self, rebuild: impl FnOnce() -> T) -> Option<T> {
        if self
            .busy
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return None;
        }
        let result = rebuild();
        self.busy.store(false, Ordering::Release);
        Some(result)
    }
}

impl Default for RebuildGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Watches the input and dependency directories, recompiling on every
/// relevant change. Runs until the process is interrupted.
pub fn watch_and_recompile(options: &CompileOptions, output: &Output) -> Result<()> {
    let mut dirs: Vec<PathBuf> = vec![options.input_dir.clone()];
    dirs.extend(options.deps_dirs.iter().cloned());

    let (tx, rx) = mpsc::channel();
    let mut debouncer = new_debouncer(DEBOUNCE, tx)?;
    for dir in &dirs {
        debouncer
            .watcher()
            .watch(dir, RecursiveMode::Recursive)
            .with_context(|| format!("cannot watch {}", dir.display()))?;
    }

    output.success(&format!("Watching {} directory(ies)...", dirs.len()));

    // Each trigger gets its own thread racing for the gate. Events
    // arriving while a rebuild is in flight therefore find the gate
    // held and are dropped instead of piling up in the channel.
    let gate = RebuildGate::new();
    thread::scope(|scope| {
        loop {
            match rx.recv() {
                Ok(Ok(events)) => {
                    if !events.iter().any(|event| is_relevant(&event.path)) {
                        continue;
                    }
                    output.verbose_ctx("watch", "change detected, recompiling");
                    scope.spawn(|| match gate.run(|| compile::run(options, output)) {
                        Some(Ok(())) => {}
                        Some(Err(err)) => {
                            output.error(&format!("compilation failed: {err:#}"))
                        }
                        None => {
                            output.verbose_ctx("watch", "rebuild in progress, trigger dropped")
                        }
                    });
                }
                Ok(Err(error)) => output.error(&format!("watch error: {error:?}")),
                Err(_) => break,
            }
        }
    });

    Ok(())
}

/// Only source units and manifests trigger a rebuild. Everything the
/// compiler writes itself is ignored.
fn is_relevant(path: &Path) -> bool {
    let name = match path.file_name().and_then(|n| n.to_str()) {
        Some(name) => name,
        None => return false,
    };
    if name == "package.yml" || name == "package.json" {
        return true;
    }
    path.extension().is_some_and(|ext| ext == "js")
}
