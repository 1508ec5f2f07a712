//! Build artifact cleanup.
//!
//! `--clean` removes the output directory, the coverage report directory and
//! the coverage data file. Anything that does not exist is skipped.

use crate::config::Config;
use crate::ui;
use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

/// Returns whether anything was removed.
pub fn clean(root: &Path, config: &Config) -> Result<bool> {
    ui::step("Clean...");
    let mut cleaned = false;

    for dir in [&config.build.out_dir, &config.coverage.report_dir] {
        let path = root.join(dir);
        if path.is_dir() {
            fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove {}", path.display()))?;
            cleaned = true;
        }
    }

    let data_file = root.join(&config.coverage.data_file);
    if data_file.exists() {
        fs::remove_file(&data_file)
            .with_context(|| format!("Failed to remove {}", data_file.display()))?;
        cleaned = true;
    }

    if cleaned {
        ui::success("Clean complete.");
    } else {
        ui::warn("Nothing to clean");
    }
    Ok(cleaned)
}
