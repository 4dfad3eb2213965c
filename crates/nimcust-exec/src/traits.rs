//! Command executor trait

use async_trait::async_trait;

use crate::error::ExecError;
use crate::result::{CommandResult, CommandSpec, OutputLine};

#[async_trait]
pub trait CommandExecutor: Send + Sync {
    /// Run to completion and capture both output streams
    async fn run(&self, cmd: &CommandSpec) -> Result<CommandResult, ExecError>;

    /// Run while delivering each output line to `on_line` as it is read
    ///
    /// Both streams are drained concurrently with the child. The returned
    /// result carries all of stderr but only the last lines of stdout.
    async fn run_streaming(
        &self,
        cmd: &CommandSpec,
        on_line: &mut (dyn FnMut(OutputLine) + Send),
    ) -> Result<CommandResult, ExecError>;

    /// Short name of the executor, for logs
    fn executor_type(&self) -> &'static str;
}
