//! Local command execution using `tokio::process`

use std::collections::VecDeque;
use std::process::Stdio;
use std::time::Instant;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tracing::{debug, error, instrument};

use crate::error::ExecError;
use crate::result::{CommandResult, CommandSpec, OutputLine};
use crate::traits::CommandExecutor;

/// stdout lines kept in a streamed result; every line still reaches the callback
pub const STREAMED_STDOUT_TAIL: usize = 200;

/// Local command executor
///
/// Executes commands on the local machine using `tokio::process::Command`.
/// Commands are spawned directly, never through a shell.
#[derive(Debug, Clone)]
pub struct LocalExecutor;

impl LocalExecutor {
    /// Create a new local executor
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    fn command(cmd: &CommandSpec) -> Command {
        let mut command = Command::new(&cmd.program);
        command
            .args(&cmd.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        command
    }

    fn spawn_error(cmd: &CommandSpec, e: &std::io::Error) -> ExecError {
        ExecError::SpawnError {
            command: cmd.to_string(),
            reason: e.to_string(),
        }
    }

    fn log_completion(cmd: &CommandSpec, result: &CommandResult) {
        debug!(
            command = %cmd,
            status = result.status,
            duration = ?result.duration,
            "command completed"
        );

        if !result.success() {
            error!(
                command = %cmd,
                status = result.status,
                stderr = %result.stderr,
                "command failed"
            );
        }
    }
}

impl Default for LocalExecutor {
    fn default() -> Self {
        Self::new()
    }
}

/// Decode one raw line, dropping a trailing carriage return
fn decode_line(raw: &[u8]) -> String {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    String::from_utf8_lossy(raw).into_owned()
}

fn push_captured(buf: &mut String, line: &str) {
    buf.push_str(line);
    buf.push('\n');
}

fn push_tail(tail: &mut VecDeque<String>, line: &str) {
    if tail.len() == STREAMED_STDOUT_TAIL {
        tail.pop_front();
    }
    tail.push_back(line.to_string());
}

#[async_trait]
impl CommandExecutor for LocalExecutor {
    #[instrument(skip(self, cmd), fields(command = %cmd), level = "debug")]
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        debug!("executing local command");

        let child = Self::command(cmd)
            .spawn()
            .map_err(|e| Self::spawn_error(cmd, &e))?;

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let result = CommandResult {
            status: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration: start.elapsed(),
        };

        Self::log_completion(cmd, &result);

        Ok(result)
    }

    #[instrument(skip(self, cmd, on_line), fields(command = %cmd), level = "debug")]
    async fn run_streaming(
        &self,
        cmd: &CommandSpec,
        on_line: &mut (dyn FnMut(OutputLine) + Send),
    ) -> Result<CommandResult, ExecError> {
        let start = Instant::now();

        debug!("executing local command with streaming output");

        let mut child = Self::command(cmd)
            .spawn()
            .map_err(|e| Self::spawn_error(cmd, &e))?;

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| ExecError::IoError("child stdout not captured".to_string()))?;
        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| ExecError::IoError("child stderr not captured".to_string()))?;

        let mut stdout_lines = BufReader::new(stdout).split(b'\n');
        let mut stderr_lines = BufReader::new(stderr).split(b'\n');
        let mut stdout_open = true;
        let mut stderr_open = true;
        let mut stdout_tail = VecDeque::with_capacity(STREAMED_STDOUT_TAIL);
        let mut captured_stderr = String::new();

        // Both readers stay armed until EOF so a full pipe on either side
        // never stalls the child.
        while stdout_open || stderr_open {
            tokio::select! {
                segment = stdout_lines.next_segment(), if stdout_open => {
                    match segment.map_err(|e| ExecError::IoError(e.to_string()))? {
                        Some(raw) => {
                            let line = decode_line(&raw);
                            push_tail(&mut stdout_tail, &line);
                            on_line(OutputLine::stdout(line));
                        }
                        None => stdout_open = false,
                    }
                }
                segment = stderr_lines.next_segment(), if stderr_open => {
                    match segment.map_err(|e| ExecError::IoError(e.to_string()))? {
                        Some(raw) => {
                            let line = decode_line(&raw);
                            push_captured(&mut captured_stderr, &line);
                            on_line(OutputLine::stderr(line));
                        }
                        None => stderr_open = false,
                    }
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| ExecError::IoError(e.to_string()))?;

        let result = CommandResult {
            status: status.code().unwrap_or(-1),
            stdout: stdout_tail.iter().fold(String::new(), |mut out, line| {
                push_captured(&mut out, line);
                out
            }),
            stderr: captured_stderr,
            duration: start.elapsed(),
        };

        Self::log_completion(cmd, &result);

        Ok(result)
    }

    fn executor_type(&self) -> &'static str {
        "local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::StreamKind;

    fn sh(script: &str) -> CommandSpec {
        CommandSpec::new("sh").arg("-c").arg(script)
    }

    #[tokio::test]
    async fn test_run_success() {
        let executor = LocalExecutor::new();
        let result = executor.run(&sh("echo hello")).await.unwrap();

        assert!(result.success());
        assert_eq!(result.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn test_run_failure() {
        let executor = LocalExecutor::new();
        let result = executor.run(&sh("exit 42")).await.unwrap();

        assert!(!result.success());
        assert_eq!(result.status, 42);
    }

    #[tokio::test]
    async fn test_run_with_stderr() {
        let executor = LocalExecutor::new();
        let result = executor.run(&sh("echo error >&2")).await.unwrap();

        assert!(result.success());
        assert_eq!(result.stderr.trim(), "error");
    }

    #[tokio::test]
    async fn test_spawn_failure() {
        let executor = LocalExecutor::new();
        let result = executor
            .run(&CommandSpec::new("/nonexistent/nimcust-test-binary"))
            .await;

        assert!(matches!(result, Err(ref e) if e.is_spawn_failure()));
    }

    #[tokio::test]
    async fn test_streaming_delivers_both_streams_in_order() {
        let executor = LocalExecutor::new();
        let mut lines = Vec::new();
        let result = executor
            .run_streaming(
                &sh("echo one; echo warn >&2; echo two; exit 3"),
                &mut |line| lines.push(line),
            )
            .await
            .unwrap();

        assert_eq!(result.status, 3);
        assert_eq!(result.stdout, "one\ntwo\n");
        assert_eq!(result.stderr, "warn\n");

        let stdout: Vec<_> = lines
            .iter()
            .filter(|l| l.stream == StreamKind::Stdout)
            .map(|l| l.line.as_str())
            .collect();
        assert_eq!(stdout, vec!["one", "two"]);
        assert!(lines.contains(&OutputLine::stderr("warn")));
    }

    #[tokio::test]
    async fn test_streaming_large_stderr_does_not_block() {
        let executor = LocalExecutor::new();
        let mut stderr_count = 0usize;
        let result = executor
            .run_streaming(&sh("seq 1 100000 >&2; echo done"), &mut |line| {
                if line.stream == StreamKind::Stderr {
                    stderr_count += 1;
                }
            })
            .await
            .unwrap();

        assert!(result.success());
        assert_eq!(stderr_count, 100_000);
        assert_eq!(result.stdout, "done\n");
    }

    #[tokio::test]
    async fn test_streaming_keeps_only_stdout_tail() {
        let executor = LocalExecutor::new();
        let mut delivered = 0usize;
        let result = executor
            .run_streaming(&sh("seq 1 1000; echo failed >&2"), &mut |line| {
                if line.stream == StreamKind::Stdout {
                    delivered += 1;
                }
            })
            .await
            .unwrap();

        assert_eq!(delivered, 1000);
        let kept: Vec<_> = result.stdout.lines().collect();
        assert_eq!(kept.len(), STREAMED_STDOUT_TAIL);
        assert_eq!(kept.first(), Some(&"801"));
        assert_eq!(kept.last(), Some(&"1000"));
        assert_eq!(result.stderr, "failed\n");
    }

    #[tokio::test]
    async fn test_streaming_strips_carriage_return() {
        let executor = LocalExecutor::new();
        let mut lines = Vec::new();
        executor
            .run_streaming(&sh("printf 'a\\r\\nb'"), &mut |line| lines.push(line.line))
            .await
            .unwrap();

        assert_eq!(lines, vec!["a", "b"]);
    }
}
