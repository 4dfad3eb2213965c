//! Customizer trait

use async_trait::async_trait;
use nimcust_api::DiagnosticSink;

use crate::error::NimError;
use crate::types::CustClassification;

/// Applies an lpp_source to NIM clients
///
/// `Err` is returned for every genuine failure, so an `Ok` classification is
/// always `Success` or `BenignNoop`.
#[async_trait]
pub trait Customizer: Send + Sync {
    /// Update one machine, streaming progress to `sink`
    async fn cust_machine(
        &self,
        lpp_source: &str,
        machine: &str,
        sink: &dyn DiagnosticSink,
    ) -> Result<CustClassification, NimError>;

    /// Update every machine in a single asynchronous nim invocation
    async fn cust_batch(
        &self,
        lpp_source: &str,
        machines: &[String],
        sink: &dyn DiagnosticSink,
    ) -> Result<CustClassification, NimError>;

    /// Command line that `cust_machine` or `cust_batch` would run
    fn describe(&self, lpp_source: &str, machines: &[String], is_async: bool) -> String;
}
