//! Coverage gate for test builds.
//!
//! Runs the instrumented test executable, then drives the coverage toolchain
//! (capture, filter, render, summarize) and judges the summary:
//!
//! | lines / functions              | verdict |
//! |--------------------------------|---------|
//! | both exactly 100.0             | Pass    |
//! | either below the threshold     | Fail    |
//! | anything else                  | Warn    |
//!
//! Only `Fail` stops the build.

use crate::config::CoverageSettings;
use crate::error::BuildError;
use crate::process::{CommandLine, CommandRunner, RunOptions};
use crate::ui;
use anyhow::Result;
use regex::Regex;
use std::path::Path;
use std::sync::LazyLock;

static LINES_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"lines\.*:\s*(\d+(?:\.\d+)?)%").expect("valid lines pattern"));
static FUNCTIONS_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"functions\.*:\s*(\d+(?:\.\d+)?)%").expect("valid functions pattern")
});

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CoverageReport {
    pub lines: f64,
    pub functions: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Pass,
    Warn,
    Fail,
}

#[derive(Debug, Clone, PartialEq)]
pub struct CoverageOutcome {
    pub report: CoverageReport,
    pub verdict: Verdict,
}

/// Reads the `lines......: 87.5%` / `functions..: 90.0%` fields of an
/// `lcov --summary` listing. A field that is absent counts as 0%.
pub fn parse_summary(text: &str) -> CoverageReport {
    let percent = |re: &Regex| {
        re.captures(text)
            .and_then(|c| c[1].parse::<f64>().ok())
            .unwrap_or(0.0)
    };
    CoverageReport {
        lines: percent(&LINES_RE),
        functions: percent(&FUNCTIONS_RE),
    }
}

pub fn evaluate(report: CoverageReport, threshold: f64) -> Verdict {
    if report.lines == 100.0 && report.functions == 100.0 {
        Verdict::Pass
    } else if report.lines < threshold || report.functions < threshold {
        Verdict::Fail
    } else {
        Verdict::Warn
    }
}

/// Runs the tests and the coverage toolchain from `root`, then applies the gate.
pub fn run_gate(
    runner: &dyn CommandRunner,
    settings: &CoverageSettings,
    root: &Path,
    test_executable: &Path,
) -> Result<CoverageOutcome> {
    ui::step("Running unit tests:");
    let tests = CommandLine::new(test_executable.to_string_lossy()).current_dir(root);
    runner.run(&tests, RunOptions::default())?.check(&tests)?;
    ui::success("Test passed");

    ui::step("Generating coverage info...");
    let capture = tool(&settings.capture, settings, root, "capture")?;
    runner.run(&capture, RunOptions::default())?.check(&capture)?;

    let filter = tool(&settings.filter, settings, root, "filter")?
        .arg(settings.data_file.clone())
        .args(settings.exclude.iter().cloned());
    runner.run(&filter, RunOptions::default())?.check(&filter)?;

    let render = tool(&settings.render, settings, root, "render")?;
    runner.run(&render, RunOptions::default())?.check(&render)?;

    let summary_cmd = tool(&settings.summary, settings, root, "summary")?;
    let summary = runner
        .run(&summary_cmd, RunOptions::default().silent())?
        .check(&summary_cmd)?;
    // Some lcov versions print the summary on stderr.
    let listing = format!("{}{}", summary.stdout, summary.stderr);

    let report = parse_summary(&listing);
    let verdict = evaluate(report, settings.threshold);
    match verdict {
        Verdict::Pass => ui::success(&format!("Code is fully covered:\n{}", listing.trim_end())),
        Verdict::Warn => ui::warn(&format!("Code is not fully covered:\n{}", listing.trim_end())),
        Verdict::Fail => ui::error(&format!(
            "Code coverage is below the threshold:\n{}",
            listing.trim_end()
        )),
    }

    ui::step("For coverage info, open:");
    println!(
        "   {}",
        root.join(&settings.report_dir).join("index.html").display()
    );

    if verdict == Verdict::Fail {
        return Err(BuildError::CoverageThreshold {
            lines: report.lines,
            functions: report.functions,
            threshold: settings.threshold,
        }
        .into());
    }

    Ok(CoverageOutcome { report, verdict })
}

/// Builds a configured tool command, expanding `{data}` and `{report}`.
fn tool(
    parts: &[String],
    settings: &CoverageSettings,
    root: &Path,
    name: &str,
) -> Result<CommandLine, BuildError> {
    let expanded: Vec<String> = parts
        .iter()
        .map(|p| {
            p.replace("{data}", &settings.data_file)
                .replace("{report}", &settings.report_dir)
        })
        .collect();
    CommandLine::from_parts(&expanded)
        .map(|cmd| cmd.current_dir(root))
        .ok_or_else(|| BuildError::config(format!("[coverage] {name} command is empty")))
}
