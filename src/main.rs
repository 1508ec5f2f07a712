//! # incbuild CLI Entry Point
//!
//! Parses the build flags with clap, validates them into an [`Invocation`]
//! and hands over to the build driver. Any failure is reported once here and
//! turned into the process exit code.

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser};
use clap_complete::{Shell, generate};
use std::path::PathBuf;

use incbuild::build;
use incbuild::config::{self, Flags, Invocation};
use incbuild::error::BuildError;
use incbuild::process::ProcessRunner;
use incbuild::ui;

#[derive(Parser)]
#[command(name = "incbuild")]
#[command(about = "Incremental C/C++ builds with a coverage gate", version = env!("CARGO_PKG_VERSION"))]
#[command(after_help = "Examples:\n  release:   incbuild -c -r\n  debug:     incbuild -c -d\n  all tests: incbuild -c -d -t -e")]
struct Cli {
    /// Do a cleanup before build (alone: only clean)
    #[arg(short, long)]
    clean: bool,
    /// Do a release build
    #[arg(short, long)]
    release: bool,
    /// Do a debug build
    #[arg(short, long)]
    debug: bool,
    /// Build the tests, otherwise only the main executable
    #[arg(short, long)]
    tests: bool,
    /// Execute the program (or the tests and the coverage gate) after building
    #[arg(short, long)]
    exec: bool,
    /// Set the main/test .cpp filename, e.g. --main program.cpp
    #[arg(short, long, value_name = "FILE")]
    main: Option<String>,
    /// Rebuild whenever a source file changes
    #[arg(short, long)]
    watch: bool,
    /// Show unit classification and staleness decisions
    #[arg(short, long)]
    verbose: bool,
    /// Path to the configuration file
    #[arg(long, value_name = "PATH", default_value = config::CONFIG_FILE)]
    config: PathBuf,
    /// Print shell completions and exit
    #[arg(long, value_name = "SHELL")]
    completion: Option<Shell>,
}

impl Cli {
    fn flags(&self) -> Flags {
        Flags {
            clean: self.clean,
            release: self.release,
            debug: self.debug,
            tests: self.tests,
            exec: self.exec,
            main: self.main.clone(),
            watch: self.watch,
            verbose: self.verbose,
        }
    }
}

fn main() {
    let cli = Cli::parse();

    if let Some(shell) = cli.completion {
        let mut cmd = Cli::command();
        let bin_name = cmd.get_name().to_string();
        generate(shell, &mut cmd, bin_name, &mut std::io::stdout());
        return;
    }

    if let Err(e) = run(&cli) {
        let code = e.downcast_ref::<BuildError>().map_or(-1, BuildError::exit_code);
        ui::error(&format!("Builder failed: ({}) {:#}", code, e));
        std::process::exit(code);
    }
}

fn run(cli: &Cli) -> Result<()> {
    let invocation = Invocation::from_flags(cli.flags())?;
    let root = std::env::current_dir().context("Failed to read current directory")?;
    let config_path = if cli.config.is_absolute() {
        cli.config.clone()
    } else {
        root.join(&cli.config)
    };
    let config = config::load_config(&config_path)?;

    if invocation.watch {
        return build::watch(&ProcessRunner, &config, &invocation, &root);
    }
    build::build_and_run(&ProcessRunner, &config, &invocation, &root)?;
    Ok(())
}
