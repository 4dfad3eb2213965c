//! nimcust-exec: Command execution abstraction
//!
//! Provides the executor trait and a local implementation that runs commands
//! either to completion (captured) or with line-by-line streaming of both
//! output streams.

pub mod error;
pub mod local;
pub mod result;
pub mod traits;

pub use error::ExecError;
pub use local::{LocalExecutor, STREAMED_STDOUT_TAIL};
pub use result::{CommandResult, CommandSpec, OutputLine, StreamKind};
pub use traits::CommandExecutor;
