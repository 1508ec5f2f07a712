use super::core;
use crate::config::{Config, Invocation};
use crate::error::BuildError;
use crate::process::CommandRunner;
use crate::ui;
use anyhow::Result;
use notify::{RecursiveMode, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::Duration;

/// Builds once, then rebuilds whenever a watched source folder changes.
/// A failed rebuild is reported and watching continues.
pub fn watch(
    runner: &dyn CommandRunner,
    config: &Config,
    invocation: &Invocation,
    root: &Path,
) -> Result<()> {
    let dirs = watched_dirs(config, invocation, root);
    for dir in &dirs {
        ui::step(&format!("Watching for changes in {}...", dir.display()));
    }

    let (tx, rx) = channel();
    let config_notify = notify::Config::default().with_poll_interval(Duration::from_secs(1));
    let mut watcher = notify::RecommendedWatcher::new(tx, config_notify)?;
    for dir in &dirs {
        watcher.watch(dir, RecursiveMode::Recursive)?;
    }

    // Only the first run honours --clean.
    run_and_report(runner, config, invocation, root);
    let rebuild = rebuild_invocation(invocation);

    while rx.recv().is_ok() {
        // Debounce bursts of events from a single save
        std::thread::sleep(Duration::from_millis(100));
        while rx.try_recv().is_ok() {}
        print!("\x1B[2J\x1B[1;1H");
        ui::warn("File changed. Rebuilding...");
        run_and_report(runner, config, &rebuild, root);
    }
    Ok(())
}

fn watched_dirs(config: &Config, invocation: &Invocation, root: &Path) -> Vec<PathBuf> {
    let mut dirs = vec![root.join(&config.build.source_dir)];
    let tests = root.join(&config.build.tests_dir);
    if invocation.tests && tests.is_dir() {
        dirs.push(tests);
    }
    dirs
}

fn rebuild_invocation(invocation: &Invocation) -> Invocation {
    Invocation {
        clean: false,
        ..invocation.clone()
    }
}

fn run_and_report(runner: &dyn CommandRunner, config: &Config, invocation: &Invocation, root: &Path) {
    if let Err(e) = core::build_and_run(runner, config, invocation, root) {
        let code = e.downcast_ref::<BuildError>().map_or(-1, BuildError::exit_code);
        ui::error(&format!("Build failed: ({}) {:#}", code, e));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Flags;

    fn invocation(tests: bool) -> Invocation {
        Invocation::from_flags(Flags {
            clean: true,
            debug: true,
            tests,
            watch: true,
            ..Default::default()
        })
        .unwrap()
    }

    #[test]
    fn test_tests_dir_watched_only_for_test_builds() {
        let tmp = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(tmp.path().join("src")).unwrap();
        std::fs::create_dir_all(tmp.path().join("tests")).unwrap();
        let config = Config::default();

        assert_eq!(watched_dirs(&config, &invocation(false), tmp.path()).len(), 1);
        assert_eq!(watched_dirs(&config, &invocation(true), tmp.path()).len(), 2);
    }

    #[test]
    fn test_rebuilds_skip_clean() {
        let rebuild = rebuild_invocation(&invocation(true));
        assert!(!rebuild.clean);
        assert!(rebuild.tests);
    }
}
