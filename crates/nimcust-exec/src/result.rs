//! Command and result types

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A program invocation, argv-style (no shell)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CommandSpec {
    /// Program name or path
    pub program: String,
    /// Arguments, passed verbatim
    #[serde(default)]
    pub args: Vec<String>,
}

impl CommandSpec {
    /// Create a command without arguments
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
        }
    }

    /// Append one argument
    #[must_use]
    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Append several arguments
    #[must_use]
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args.extend(args.into_iter().map(Into::into));
        self
    }

    /// Build from a `[program, args...]` vector
    ///
    /// # Errors
    /// Returns `ExecError::InvalidCommand` if the vector is empty.
    pub fn from_argv(argv: &[String]) -> Result<Self, crate::error::ExecError> {
        let (program, args) = argv.split_first().ok_or_else(|| {
            crate::error::ExecError::InvalidCommand("empty command line".to_string())
        })?;
        Ok(Self::new(program.clone()).args(args.iter().cloned()))
    }
}

impl std::fmt::Display for CommandSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.program)?;
        for arg in &self.args {
            write!(f, " {arg}")?;
        }
        Ok(())
    }
}

/// Output stream of a child process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Stdout,
    Stderr,
}

/// One line read from a running child, without its trailing newline
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLine {
    pub stream: StreamKind,
    pub line: String,
}

impl OutputLine {
    pub fn stdout(line: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stdout,
            line: line.into(),
        }
    }

    pub fn stderr(line: impl Into<String>) -> Self {
        Self {
            stream: StreamKind::Stderr,
            line: line.into(),
        }
    }
}

/// Result of a command execution
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandResult {
    /// Exit status code (0 for success, -1 if killed by a signal)
    pub status: i32,
    /// stdout output
    pub stdout: String,
    /// stderr output
    pub stderr: String,
    /// Time taken to execute
    pub duration: Duration,
}

impl CommandResult {
    /// Check if command succeeded (exit code 0)
    #[must_use]
    pub fn success(&self) -> bool {
        self.status == 0
    }

    /// Combine stdout and stderr
    #[must_use]
    pub fn combined_output(&self) -> String {
        if self.stderr.is_empty() {
            self.stdout.clone()
        } else {
            format!("{}\n{}", self.stdout, self.stderr)
        }
    }
}
