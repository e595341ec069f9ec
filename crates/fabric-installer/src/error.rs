//! Error types for rule installation

use std::time::Duration;
use thiserror::Error;

/// Why a rule was not installed.
#[derive(Error, Debug)]
pub enum InstallError {
    /// The controller answered with a status other than 200/201
    #[error("rejected by controller (HTTP {status}): {body}")]
    Rejected { status: u16, body: String },

    /// The controller could not be reached
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// No answer within the request timeout
    #[error("no response within {0:?}")]
    Timeout(Duration),

    /// The submission task ended without producing a result
    #[error("submission aborted: {0}")]
    Aborted(String),

    #[error("invalid controller configuration: {0}")]
    Configuration(String),
}

impl InstallError {
    pub fn rejected(status: u16, body: impl Into<String>) -> Self {
        Self::Rejected {
            status,
            body: body.into(),
        }
    }
}

/// Result type for installer operations
pub type InstallResult<T> = std::result::Result<T, InstallError>;
