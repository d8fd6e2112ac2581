//! Record - the unit emitted by a record source

use bytes::Bytes;

/// One opaque record read from an upstream source.
///
/// The payload is never interpreted by the source; receivers that need a
/// structured view parse it themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Identifier of the source that produced the record
    pub source_id: String,

    /// Position of the record inside its source
    pub sequence_number: u64,

    /// Optional partitioning key reported by the source
    pub partition_key: Option<String>,

    /// Raw payload
    pub payload: Bytes,
}

impl Record {
    /// Create a record without a partition key
    pub fn new(source_id: impl Into<String>, sequence_number: u64, payload: impl Into<Bytes>) -> Self {
        Self {
            source_id: source_id.into(),
            sequence_number,
            partition_key: None,
            payload: payload.into(),
        }
    }

    /// Attach a partition key
    pub fn with_partition_key(mut self, key: impl Into<String>) -> Self {
        self.partition_key = Some(key.into());
        self
    }

    /// Payload length in bytes
    pub fn len(&self) -> usize {
        self.payload.len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}
