//! Error handling and custom error types
//!
//! Provides unified error handling across the provisioner using thiserror.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
    /// Invalid or missing input, detected before anything reaches AWS.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The provisioning backend refused the declaration.
    #[error("Provisioning error: {0}")]
    Provisioning(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Environment variable error: {0}")]
    EnvVar(#[from] dotenvy::Error),
}

impl Error {
    pub fn is_config(&self) -> bool {
        matches!(self, Error::Config(_))
    }
}

pub type Result<T> = std::result::Result<T, Error>;
