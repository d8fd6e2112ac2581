//! Error types for CLI operations.

use contracts::ContractError;
use thiserror::Error;

/// CLI-specific error types
#[derive(Error, Debug)]
pub enum CliError {
    /// Configuration file not found
    #[error("Configuration file not found: {path}")]
    ConfigNotFound { path: String },

    /// Configuration could not be loaded or failed validation
    #[error("Invalid configuration: {0}")]
    Config(#[source] ContractError),

    /// Receivers could not be built
    #[error("Failed to create receivers: {message}")]
    ReceiverSetup { message: String },

    /// A stream ended with an error
    #[error("Stream failed ({kind}): {source}")]
    Stream {
        kind: &'static str,
        #[source]
        source: ContractError,
    },
}

impl CliError {
    pub fn config_not_found(path: impl Into<String>) -> Self {
        Self::ConfigNotFound { path: path.into() }
    }

    pub fn receiver_setup(message: impl Into<String>) -> Self {
        Self::ReceiverSetup {
            message: message.into(),
        }
    }

    pub fn stream(source: ContractError) -> Self {
        Self::Stream {
            kind: source.kind(),
            source,
        }
    }
}
