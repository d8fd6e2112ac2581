//! RecordSink trait - concrete publishing target
//!
//! A sink owns one outbound connection/session and is driven by a single
//! delivery task, one payload at a time.

use crate::ContractError;

/// Data output trait
///
/// All sink implementations must implement this trait.
#[trait_variant::make(RecordSink: Send)]
pub trait LocalRecordSink {
    /// Sink name (used for logging/metrics)
    fn name(&self) -> &str;

    /// Publish one payload
    ///
    /// # Errors
    /// Returns write error (should include context)
    async fn write(&mut self, payload: &[u8]) -> Result<(), ContractError>;

    /// Flush buffer (if any)
    async fn flush(&mut self) -> Result<(), ContractError>;

    /// Close sink
    async fn close(&mut self) -> Result<(), ContractError>;
}
