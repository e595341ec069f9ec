//! Error types for fabricd

use fabric_compiler::{CompileError, TopologyError};
use std::path::PathBuf;
use thiserror::Error;

/// Daemon errors
#[derive(Error, Debug)]
pub enum FabricdError {
    /// File could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File could not be parsed
    #[error("cannot parse {}: {message}", path.display())]
    Parse { path: PathBuf, message: String },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Topology cannot be modelled
    #[error("Topology error: {0}")]
    Topology(#[from] TopologyError),

    /// Fatal compilation error
    #[error("Compilation failed: {0}")]
    Compile(#[from] CompileError),

    /// Output could not be written
    #[error("Output error: {0}")]
    Output(#[from] std::io::Error),

    #[error("Encoding error: {0}")]
    Encode(#[from] serde_json::Error),
}

impl FabricdError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn parse(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        Self::Parse {
            path: path.into(),
            message: message.to_string(),
        }
    }
}

/// Result type for fabricd operations
pub type Result<T> = std::result::Result<T, FabricdError>;
