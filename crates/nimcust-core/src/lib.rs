//! nimcust-core: Customization orchestration logic
//!
//! Level parsing and comparison, target resolution, the run state machine
//! and the orchestrator that sequences a customization run.

pub mod error;
pub mod level;
pub mod orchestrator;
pub mod state;
pub mod targets;

pub use error::CoreError;
pub use level::{OsLevel, compare, parse_bundle_level, parse_client_level};
pub use orchestrator::Orchestrator;
pub use state::RunState;
pub use targets::resolve;
