//! Error types for the extension.

use crate::digest::{Digest, DigestError};
use thiserror::Error;

/// Result type alias for extension operations.
pub type Result<T> = std::result::Result<T, ExtensionError>;

/// Errors surfaced to the scripting host.
#[derive(Error, Debug)]
pub enum ExtensionError {
    #[error("invalid docker environment: {0}")]
    Config(String),

    #[error("docker error: {0}")]
    Docker(#[from] bollard::errors::Error),

    #[error("images module not initialized")]
    Uninitialized,

    #[error("images module already initialized")]
    AlreadyInitialized,

    #[error("invalid connection option: {0}")]
    InvalidOption(String),

    #[error("invalid reference {reference}: {reason}")]
    InvalidReference { reference: String, reason: String },

    #[error(transparent)]
    Digest(#[from] DigestError),

    #[error("blob {0} not found in content store")]
    BlobMissing(Digest),

    #[error("blob {0} does not match its descriptor")]
    BlobMismatch(Digest),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to prepare the config for the {name}, error: {source}")]
    PrepareConfig {
        name: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to push {name}, error: {source}")]
    Push {
        name: String,
        #[source]
        source: Box<ExtensionError>,
    },

    #[error("registry error: {0}")]
    Registry(#[from] oci_distribution::errors::OciDistributionError),
}
