//! Build failures that carry an exit code.
//!
//! Everything else (I/O, config parsing) travels as a plain `anyhow::Error`;
//! the CLI downcasts to [`BuildError`] to decide which code the process exits with.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum BuildError {
    /// An external command ran and exited non-zero.
    #[error("Command failed ({code}): {command}")]
    ProcessFailure { command: String, code: i32 },

    /// An external command could not be started at all.
    #[error("Could not start command: {command}")]
    SpawnFailure { command: String },

    /// Invalid flags, invalid `incbuild.toml` or a missing input folder.
    #[error("{0}")]
    Configuration(String),

    #[error(
        "Code coverage is below the acceptable threshold\n(lines: {lines:.1}%, functions: {functions:.1}% < {threshold:.1}%)"
    )]
    CoverageThreshold {
        lines: f64,
        functions: f64,
        threshold: f64,
    },
}

impl BuildError {
    pub fn config(msg: impl Into<String>) -> Self {
        BuildError::Configuration(msg.into())
    }

    /// Exit code reported to the caller of the orchestrator.
    pub fn exit_code(&self) -> i32 {
        match self {
            BuildError::ProcessFailure { code, .. } if *code != 0 => *code,
            _ => -1,
        }
    }
}
