//! External process execution.
//!
//! Every compiler, linker and coverage tool invocation goes through a
//! [`CommandRunner`]. The real implementation, [`ProcessRunner`], streams the
//! child's stdout and stderr to the terminal as lines arrive while also
//! capturing both into an [`ExecutionResult`].
//!
//! Each pipe is drained by its own reader thread, so a child that fills one
//! pipe while we are blocked on the other can never deadlock the build.

use crate::error::BuildError;
use crate::ui;
use anyhow::{Context, Result};
use std::fmt;
use std::io::{self, BufRead, BufReader, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::sync::mpsc::{self, Sender};
use std::thread::{self, JoinHandle};

/// A program plus its arguments, optionally pinned to a working directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
    pub cwd: Option<PathBuf>,
}

impl CommandLine {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            cwd: None,
        }
    }

    /// Builds a command from `[program, args...]`, as stored in `incbuild.toml`.
    pub fn from_parts(parts: &[String]) -> Option<Self> {
        let (program, args) = parts.split_first()?;
        Some(Self::new(program.clone()).args(args.iter().cloned()))
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn path_arg(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy().into_owned())
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }
}

impl fmt::Display for CommandLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", quote(&self.program))?;
        for arg in &self.args {
            write!(f, " {}", quote(arg))?;
        }
        Ok(())
    }
}

fn quote(word: &str) -> String {
    if word.is_empty() || word.chars().any(char::is_whitespace) {
        format!("'{}'", word.replace('\'', r"'\''"))
    } else {
        word.to_string()
    }
}

/// Captured output of one external command.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExecutionResult {
    pub stdout: String,
    pub stderr: String,
    /// `None` when the process could not be spawned.
    pub status: Option<i32>,
}

impl ExecutionResult {
    pub fn not_spawned() -> Self {
        Self::default()
    }

    pub fn success(&self) -> bool {
        self.status == Some(0)
    }

    pub fn spawned(&self) -> bool {
        self.status.is_some()
    }

    /// Turns a non-zero or missing status into the matching [`BuildError`].
    pub fn check(self, cmd: &CommandLine) -> Result<Self, BuildError> {
        match self.status {
            Some(0) => Ok(self),
            Some(code) => Err(BuildError::ProcessFailure {
                command: cmd.to_string(),
                code,
            }),
            None => Err(BuildError::SpawnFailure {
                command: cmd.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunOptions {
    /// Do not echo the child's output (it is still captured).
    pub silent: bool,
    /// Return `BuildError::ProcessFailure` on a non-zero exit.
    pub fail_on_error: bool,
}

impl Default for RunOptions {
    fn default() -> Self {
        Self {
            silent: false,
            fail_on_error: true,
        }
    }
}

impl RunOptions {
    pub fn silent(mut self) -> Self {
        self.silent = true;
        self
    }

    pub fn allow_failure(mut self) -> Self {
        self.fail_on_error = false;
        self
    }
}

/// Executes external commands on behalf of the build pipeline.
pub trait CommandRunner {
    /// Runs `cmd` to completion.
    ///
    /// A process that cannot be spawned yields `Ok` with `status: None`; only
    /// a non-zero exit combined with `fail_on_error` is an error.
    fn run(&self, cmd: &CommandLine, opts: RunOptions) -> Result<ExecutionResult>;
}

/// Runs commands as real child processes.
#[derive(Debug, Default, Clone, Copy)]
pub struct ProcessRunner;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Stream {
    Stdout,
    Stderr,
}

impl CommandRunner for ProcessRunner {
    fn run(&self, cmd: &CommandLine, opts: RunOptions) -> Result<ExecutionResult> {
        ui::command(&cmd.to_string());

        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());
        if let Some(dir) = &cmd.cwd {
            command.current_dir(dir);
        }

        let mut child = match command.spawn() {
            Ok(child) => child,
            Err(e) => {
                ui::warn(&format!("Could not start '{}': {}", cmd.program, e));
                return Ok(ExecutionResult::not_spawned());
            }
        };

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::with_capacity(2);
        if let Some(out) = child.stdout.take() {
            readers.push(pump(out, Stream::Stdout, tx.clone()));
        }
        if let Some(err) = child.stderr.take() {
            readers.push(pump(err, Stream::Stderr, tx.clone()));
        }
        // Only the reader threads hold senders now; the loop ends once both pipes close.
        drop(tx);

        let mut result = ExecutionResult::default();
        for (stream, line) in rx {
            if !opts.silent {
                echo(stream, &line);
            }
            match stream {
                Stream::Stdout => result.stdout.push_str(&line),
                Stream::Stderr => result.stderr.push_str(&line),
            }
        }
        for reader in readers {
            let _ = reader.join();
        }

        let status = child
            .wait()
            .with_context(|| format!("Failed to wait for '{}'", cmd.program))?;
        let code = status.code().unwrap_or(-1);
        result.status = Some(code);

        if code != 0 {
            if opts.fail_on_error {
                return Err(BuildError::ProcessFailure {
                    command: cmd.to_string(),
                    code,
                }
                .into());
            }
            ui::warn(&format!("return: {}", code));
        }

        Ok(result)
    }
}

fn pump<R>(pipe: R, stream: Stream, tx: Sender<(Stream, String)>) -> JoinHandle<()>
where
    R: Read + Send + 'static,
{
    thread::spawn(move || {
        let mut reader = BufReader::new(pipe);
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) | Err(_) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf).into_owned();
                    if tx.send((stream, line)).is_err() {
                        break;
                    }
                }
            }
        }
    })
}

fn echo(stream: Stream, line: &str) {
    let _ = match stream {
        Stream::Stdout => {
            let mut out = io::stdout().lock();
            out.write_all(line.as_bytes()).and_then(|_| out.flush())
        }
        Stream::Stderr => {
            let mut err = io::stderr().lock();
            err.write_all(line.as_bytes()).and_then(|_| err.flush())
        }
    };
}
