//! Dispatcher error types

use contracts::ContractError;
use thiserror::Error;

/// Dispatcher-specific errors
#[derive(Debug, Error)]
pub enum DispatcherError {
    /// Receiver/sink creation error
    #[error("failed to create receiver '{name}': {message}")]
    SinkCreation { name: String, message: String },

    /// The accepting side of a rendezvous is gone
    #[error("handoff channel closed")]
    HandoffClosed,

    /// The delivery task dropped the item without acknowledging it
    #[error("handoff was not acknowledged")]
    HandoffRejected,

    /// Error from contract
    #[error("{0}")]
    Contract(#[from] ContractError),

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl DispatcherError {
    /// Create a sink creation error
    pub fn sink_creation(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SinkCreation {
            name: name.into(),
            message: message.into(),
        }
    }
}

impl From<DispatcherError> for ContractError {
    fn from(err: DispatcherError) -> Self {
        match err {
            DispatcherError::SinkCreation { name, message } => {
                ContractError::config_validation(format!("receivers.{name}"), message)
            }
            DispatcherError::Contract(inner) => inner,
            DispatcherError::Io(io) => ContractError::Io(io),
            other => ContractError::Other(other.to_string()),
        }
    }
}
