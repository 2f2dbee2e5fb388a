//! Error types for the zolt toolkit

use thiserror::Error;

/// Result type alias for zolt runtime operations
pub type Result<T> = std::result::Result<T, ZoltError>;

/// Main error type for zolt runtime operations
#[derive(Debug, Error)]
pub enum ZoltError {
    /// A membership witness returned by the witness service is inconsistent
    #[error("Invalid membership witness: {0}")]
    InvalidWitness(String),

    /// Field configuration outside the supported bit widths
    #[error("Invalid field configuration: {0}")]
    InvalidFieldConfig(String),

    /// Malformed field element or preimage encoding
    #[error("Serialization error: {0}")]
    SerializationError(String),

    /// I/O error wrapper
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// Other errors not covered by specific variants
    #[error("{0}")]
    Other(String),
}

impl ZoltError {
    pub fn invalid_witness(msg: impl Into<String>) -> Self {
        Self::InvalidWitness(msg.into())
    }

    pub fn invalid_field_config(msg: impl Into<String>) -> Self {
        Self::InvalidFieldConfig(msg.into())
    }

    pub fn serialization_error(msg: impl Into<String>) -> Self {
        Self::SerializationError(msg.into())
    }

    pub fn other(msg: impl Into<String>) -> Self {
        Self::Other(msg.into())
    }
}
