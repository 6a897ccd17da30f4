//! Error types for reprov.

use thiserror::Error;

/// Errors produced while provisioning a repository.
#[derive(Error, Debug)]
pub enum ProvisionError {
    /// The repository URL does not name exactly one `owner/name` pair.
    #[error("invalid repository reference: {0}")]
    InvalidReference(String),

    /// Secret names are limited to `[A-Za-z0-9_]`, not starting with a digit.
    #[error("invalid secret name: {0:?}")]
    InvalidSecretName(String),

    /// A git subprocess exited non-zero or could not be spawned.
    #[error("git {command} failed: {stderr}")]
    Git { command: String, stderr: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(String),

    /// The API answered with a status the operation does not accept.
    #[error("unexpected status {status}: {body}")]
    UnexpectedStatus { status: u16, body: String },

    /// The repository public key could not be decoded.
    #[error("invalid public key: {0}")]
    InvalidPublicKey(String),

    /// Sealed-box encryption failed.
    #[error("sealing failed: {0}")]
    Sealing(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<reqwest::Error> for ProvisionError {
    fn from(err: reqwest::Error) -> Self {
        ProvisionError::Http(err.to_string())
    }
}

/// Result type for reprov operations.
pub type Result<T> = std::result::Result<T, ProvisionError>;
