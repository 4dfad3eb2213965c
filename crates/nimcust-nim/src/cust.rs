//! NIM `cust` operation driver

use std::sync::Arc;

use async_trait::async_trait;
use nimcust_api::{DiagnosticSink, OutputStream, RunEvent};
use nimcust_exec::{CommandExecutor, CommandResult, CommandSpec, OutputLine, StreamKind};
use tracing::{debug, info, instrument, warn};

use crate::error::NimError;
use crate::output::{
    StdoutLine, classify_captured, classify_outcome, classify_stdout_line, is_benign_noop,
};
use crate::traits::Customizer;
use crate::types::CustClassification;

/// Default nim binary on a NIM master
pub const DEFAULT_NIM_COMMAND: &str = "nim";

/// Runs `nim -o cust` through a command executor
pub struct NimCustomizer {
    /// Executor for running nim
    executor: Arc<dyn CommandExecutor>,
    /// nim program name or path
    nim_command: String,
}

impl NimCustomizer {
    /// Create a customizer using the default `nim` binary
    pub fn new(executor: Arc<dyn CommandExecutor>) -> Self {
        Self {
            executor,
            nim_command: DEFAULT_NIM_COMMAND.to_string(),
        }
    }

    /// Use a different nim binary
    #[must_use]
    pub fn with_nim_command(mut self, nim_command: impl Into<String>) -> Self {
        self.nim_command = nim_command.into();
        self
    }

    /// Build the nim custom operation for `targets`
    ///
    /// `nim -o cust -a lpp_source=<b> -a accept_licenses=yes -a fixes=update_all [-a async=yes] <targets...>`
    #[must_use]
    pub fn cust_command(&self, lpp_source: &str, targets: &[String], is_async: bool) -> CommandSpec {
        let mut cmd = CommandSpec::new(&self.nim_command)
            .args(["-o", "cust"])
            .arg("-a")
            .arg(format!("lpp_source={lpp_source}"))
            .args(["-a", "accept_licenses=yes", "-a", "fixes=update_all"]);
        if is_async {
            cmd = cmd.args(["-a", "async=yes"]);
        }
        cmd.args(targets.iter().cloned())
    }

    fn execution_error(target: &str, e: &nimcust_exec::ExecError) -> NimError {
        NimError::Execution {
            target: target.to_string(),
            reason: e.to_string(),
        }
    }

    fn failure(target: &str, result: &CommandResult) -> NimError {
        let diagnostic = if result.stderr.trim().is_empty() {
            result.stdout.trim_end().to_string()
        } else {
            result.stderr.trim_end().to_string()
        };
        NimError::CustFailed {
            target: target.to_string(),
            status: result.status,
            diagnostic,
        }
    }
}

#[async_trait]
impl Customizer for NimCustomizer {
    #[instrument(skip(self, sink))]
    async fn cust_machine(
        &self,
        lpp_source: &str,
        machine: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<CustClassification, NimError> {
        let cmd = self.cust_command(lpp_source, &[machine.to_string()], false);
        debug!(
            command = %cmd,
            executor = self.executor.executor_type(),
            "starting nim cust"
        );

        let mut benign_seen = false;
        let result = {
            let mut on_line = |output: OutputLine| match output.stream {
                StreamKind::Stdout => {
                    let kind = classify_stdout_line(&output.line);
                    if let StdoutLine::Progress {
                        processed, total, ..
                    } = kind
                    {
                        debug!(host = %machine, processed, total, "fileset progress");
                    }
                    if let Some(text) = kind.progress_text() {
                        sink.emit(RunEvent::Progress {
                            target: machine.to_string(),
                            line: text.to_string(),
                        });
                    }
                }
                StreamKind::Stderr => {
                    if is_benign_noop(&output.line) {
                        benign_seen = true;
                    }
                    sink.emit(RunEvent::Output {
                        target: machine.to_string(),
                        stream: OutputStream::Stderr,
                        line: output.line,
                    });
                }
            };
            self.executor
                .run_streaming(&cmd, &mut on_line)
                .await
                .map_err(|e| Self::execution_error(machine, &e))?
        };

        match classify_outcome(result.success(), benign_seen) {
            CustClassification::Failure => Err(Self::failure(machine, &result)),
            CustClassification::BenignNoop => {
                warn!(
                    host = %machine,
                    status = result.status,
                    "nim reports software already at media level"
                );
                Ok(CustClassification::BenignNoop)
            }
            CustClassification::Success => {
                info!(host = %machine, "nim cust succeeded");
                Ok(CustClassification::Success)
            }
        }
    }

    #[instrument(skip(self, sink))]
    async fn cust_batch(
        &self,
        lpp_source: &str,
        machines: &[String],
        sink: &dyn DiagnosticSink,
    ) -> Result<CustClassification, NimError> {
        let cmd = self.cust_command(lpp_source, machines, true);
        let target = machines.join(" ");
        debug!(
            command = %cmd,
            executor = self.executor.executor_type(),
            "starting asynchronous nim cust"
        );

        let result = self
            .executor
            .run(&cmd)
            .await
            .map_err(|e| Self::execution_error(&target, &e))?;

        for line in result.stderr.lines() {
            sink.emit(RunEvent::Output {
                target: target.clone(),
                stream: OutputStream::Stderr,
                line: line.to_string(),
            });
        }

        let classification = classify_captured(&result);
        if !classification.is_ok() {
            return Err(NimError::CustFailed {
                target,
                status: result.status,
                diagnostic: result.combined_output().trim().to_string(),
            });
        }

        info!(targets = %target, %classification, "asynchronous nim cust accepted");
        Ok(classification)
    }

    fn describe(&self, lpp_source: &str, machines: &[String], is_async: bool) -> String {
        self.cust_command(lpp_source, machines, is_async).to_string()
    }
}
