//! # incbuild - Incremental C/C++ Build Orchestrator
//!
//! incbuild rebuilds only what changed in a header/implementation source tree,
//! links the result, and for test builds refuses to pass when code coverage
//! drops below a threshold.
//!
//! ## How a build works
//!
//! 1. **Scan** the source folder for subdirectories and `*.h` headers.
//! 2. **Classify** each header: with a sibling `.cpp` it is a compiled unit,
//!    without one it is header-only and its directory becomes an include path.
//! 3. **Compile** the units whose object is missing or older than its sources.
//! 4. **Link** the entry point (`main.cpp`) with every unit object.
//! 5. For test builds, **run** the tests and **gate** on `lcov` coverage.
//!
//! The compiler and the coverage tools are plain external programs, run
//! through [`process::CommandRunner`].
//!
//! ## Quick Start
//!
//! ```bash
//! # Debug build, then run the program
//! incbuild --debug --exec
//!
//! # Clean release build
//! incbuild -c -r
//!
//! # Build and run the tests, enforcing coverage
//! incbuild -c -d -t -e
//! ```
//!
//! ## Module Organization
//!
//! - [`build`] - Scanning, classification, staleness, pipeline and coverage gate
//! - [`config`] - `incbuild.toml` and validated command-line invocations
//! - [`process`] - External command execution with live, captured output

/// Build pipeline, coverage gate and watch mode.
pub mod build;

/// Configuration file parsing (`incbuild.toml`) and flag validation.
pub mod config;

/// Errors that map to process exit codes.
pub mod error;

/// External process execution.
pub mod process;

/// Terminal output helpers.
pub mod ui;
