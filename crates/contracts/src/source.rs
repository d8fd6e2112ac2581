//! RecordSource trait - upstream scan abstraction
//!
//! Shard discovery, checkpointing and throttling belong to the implementation.
//! The dispatcher only sees a cancellable scan that pushes records into a handler.

use tokio_util::sync::CancellationToken;

use crate::{ContractError, Record};

/// Per-record callback driven by a source scan
///
/// Returning an error aborts the scan; the source must surface that error
/// as the result of [`RecordSource::scan`].
#[trait_variant::make(RecordHandler: Send)]
pub trait LocalRecordHandler {
    /// Handle one record
    async fn on_record(&mut self, record: Record) -> Result<(), ContractError>;
}

/// Sequenced record source
///
/// # Example
///
/// ```ignore
/// let source = factory.open("orders").await?;
/// source.scan(&cancel, &mut handler).await?;
/// ```
#[trait_variant::make(RecordSource: Send)]
pub trait LocalRecordSource {
    /// Source identifier (used in logs and error attribution)
    fn source_id(&self) -> &str;

    /// Scan the source, invoking `handler` once per record
    ///
    /// Returns `Ok(())` when the source is exhausted or `cancel` fires.
    ///
    /// # Errors
    /// The first handler error, or a scan error raised by the source itself
    async fn scan<H: RecordHandler>(
        &self,
        cancel: &CancellationToken,
        handler: &mut H,
    ) -> Result<(), ContractError>;
}

/// Builds sources from identifiers
///
/// Construction options (credentials, base paths, pacing) live in the factory,
/// so a group of sources can be opened from a list of identifiers.
#[trait_variant::make(SourceFactory: Send)]
pub trait LocalSourceFactory {
    /// Source produced by this factory
    type Source: RecordSource + Send + Sync + 'static;

    /// Open the source named `source_id`
    ///
    /// # Errors
    /// [`ContractError::SourceConstruction`] when the source cannot be set up
    async fn open(&self, source_id: &str) -> Result<Self::Source, ContractError>;
}
