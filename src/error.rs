//! Error types for the S3 bridge operator

use thiserror::Error;

/// Main error type for bridge operations
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum Error {
    /// Kubernetes API error
    #[error("kubernetes error: {0}")]
    Kube(#[from] kube::Error),

    /// Invalid or incomplete bridge configuration
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Credential secret exists but lacks required keys
    #[error("credential error: {0}")]
    Credential(String),

    /// The provisioning engine rejected or failed to materialize a resource
    #[error("provisioning error: {0}")]
    Provisioning(String),

    /// Serialization/deserialization error
    #[error("serialization error: {0}")]
    Serialization(String),
}

impl Error {
    /// Create a configuration error with the given message
    pub fn configuration(msg: impl Into<String>) -> Self {
        Self::Configuration(msg.into())
    }

    /// Create a credential error with the given message
    pub fn credential(msg: impl Into<String>) -> Self {
        Self::Credential(msg.into())
    }

    /// Create a provisioning error with the given message
    pub fn provisioning(msg: impl Into<String>) -> Self {
        Self::Provisioning(msg.into())
    }

    /// Create a serialization error with the given message
    pub fn serialization(msg: impl Into<String>) -> Self {
        Self::Serialization(msg.into())
    }
}
