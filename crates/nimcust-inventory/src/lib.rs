//! nimcust-inventory: NIM inventory snapshot access
//!
//! Reads the previously collected description of NIM clients, their current
//! oslevel and the known lpp_source bundles. Read-only.

pub mod error;
pub mod source;
pub mod types;

pub use error::InventoryError;
pub use source::{CommandInventory, InventorySource, JsonFileInventory, StaticInventory};
pub use types::{ClientInfo, InventorySnapshot};
