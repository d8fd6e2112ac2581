//! Receiver trait - boundary between the coordinator and a downstream sink

use async_trait::async_trait;
use bytes::Bytes;
use tokio_util::sync::CancellationToken;

use crate::ContractError;

/// Downstream receiver driven by the stream coordinator
///
/// A receiver owns an internal handoff channel: dispatch tasks push payloads
/// through [`Receiver::enqueue`] while exactly one delivery task, running
/// [`Receiver::send`], drains it. Receivers are shared as `Arc<dyn Receiver>`.
#[async_trait]
pub trait Receiver: Send + Sync {
    /// Identifier used for error attribution
    fn identifier(&self) -> &str;

    /// Drive delivery until `stop` fires
    ///
    /// Called once per receiver per stream call. Returns `Ok(())` after `stop`
    /// is triggered and pending output is flushed.
    ///
    /// # Errors
    /// A delivery error; it terminates the enclosing stream call.
    async fn send(&self, stop: &CancellationToken) -> Result<(), ContractError>;

    /// Hand a payload to the delivery task
    ///
    /// Blocks until the delivery task has accepted the payload.
    ///
    /// # Errors
    /// [`ContractError::ReceiverClosed`] when the delivery task went away
    async fn enqueue(&self, payload: Bytes) -> Result<(), ContractError>;

    /// Whether payloads must go through [`Receiver::transform`] first
    fn needs_transform(&self) -> bool;

    /// Reshape and filter a payload
    ///
    /// Returns `Ok(None)` when the record is filtered out.
    ///
    /// # Errors
    /// [`ContractError::Transform`] when the payload cannot be processed
    fn transform(&self, payload: &[u8]) -> Result<Option<Bytes>, ContractError>;
}
