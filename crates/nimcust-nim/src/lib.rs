//! nimcust-nim: NIM customization driver
//!
//! Builds `nim -o cust` invocations, classifies their free-text output and
//! decides whether an invocation succeeded.

pub mod cust;
pub mod error;
pub mod output;
pub mod traits;
pub mod types;

pub use cust::NimCustomizer;
pub use error::NimError;
pub use traits::Customizer;
pub use types::CustClassification;
