//! nimcust-api: Shared request, report and event types
//!
//! Contains the customization request/report types and the diagnostic event
//! stream shared by the orchestrator, the NIM driver and the CLI.

pub mod events;
pub mod requests;
pub mod responses;
pub mod sink;

pub use events::{EventLevel, OutputStream, RunEvent};
pub use requests::{CustMode, CustRequest};
pub use responses::{MachineOutcome, RunReport};
pub use sink::{DiagnosticSink, MemorySink, NullSink, TracingSink};
