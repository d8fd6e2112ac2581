//! Layered error definitions
//!
//! Categorized by source: config / source / receiver

use thiserror::Error;

/// Unified error type
#[derive(Debug, Error)]
pub enum ContractError {
    // ===== Configuration Errors =====
    /// Configuration parse error
    #[error("config parse error: {message}")]
    ConfigParse {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Configuration validation error
    #[error("config validation error at '{field}': {message}")]
    ConfigValidation { field: String, message: String },

    // ===== Source Errors =====
    /// Source could not be set up
    #[error("source '{source_id}' construction error: {message}")]
    SourceConstruction { source_id: String, message: String },

    /// Upstream scan failed
    #[error("source '{source_id}' scan error: {message}")]
    Scan { source_id: String, message: String },

    // ===== Receiver Errors =====
    /// Receiver delivery failed
    #[error("receiver service {receiver} error: {message}")]
    Delivery { receiver: String, message: String },

    /// Receiver transformation failed
    #[error("receiver service {receiver} transform error: {message}")]
    Transform { receiver: String, message: String },

    /// Delivery task is gone, handoff impossible
    #[error("receiver '{receiver}' is not accepting records")]
    ReceiverClosed { receiver: String },

    /// Delivery loop is already driven by another stream call
    #[error("receiver '{receiver}' is already being driven")]
    ReceiverBusy { receiver: String },

    // ===== General Errors =====
    /// Operation cancelled before it could complete
    #[error("operation cancelled")]
    Cancelled,

    /// IO error
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Other error
    #[error("{0}")]
    Other(String),
}

impl ContractError {
    /// Create configuration parse error
    pub fn config_parse(message: impl Into<String>) -> Self {
        Self::ConfigParse {
            message: message.into(),
            source: None,
        }
    }

    /// Create configuration validation error
    pub fn config_validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::ConfigValidation {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create source construction error
    pub fn source_construction(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::SourceConstruction {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create scan error
    pub fn scan(source_id: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Scan {
            source_id: source_id.into(),
            message: message.into(),
        }
    }

    /// Create delivery error
    pub fn delivery(receiver: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Delivery {
            receiver: receiver.into(),
            message: message.into(),
        }
    }

    /// Create transform error
    pub fn transform(receiver: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Transform {
            receiver: receiver.into(),
            message: message.into(),
        }
    }

    /// Create receiver closed error
    pub fn receiver_closed(receiver: impl Into<String>) -> Self {
        Self::ReceiverClosed {
            receiver: receiver.into(),
        }
    }

    /// Short label of the error category (used as a metrics label)
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConfigParse { .. } | Self::ConfigValidation { .. } => "config",
            Self::SourceConstruction { .. } => "construction",
            Self::Scan { .. } => "scan",
            Self::Delivery { .. } | Self::ReceiverClosed { .. } | Self::ReceiverBusy { .. } => {
                "delivery"
            }
            Self::Transform { .. } => "transform",
            Self::Cancelled => "cancelled",
            Self::Io(_) | Self::Other(_) => "other",
        }
    }
}
