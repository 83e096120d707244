//! Error handling for the apigw-sync library.
//!
//! This module defines the error type for loading settings, along with a
//! convenient `Result` alias. Each domain keeps its own error enum, and the
//! application layer gathers them in `ApplicationError`.
//!
//! # Examples
//!
//! ```
//! use apigw_sync::core::error::{Error, Result};
//!
//! fn might_fail() -> Result<()> {
//!     Err(Error::config("stage name is empty"))
//! }
//!
//! assert!(might_fail().is_err());
//! ```

use thiserror::Error;

/// Result type for apigw-sync operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for apigw-sync operations
#[derive(Debug, Error)]
pub enum Error {
    /// Settings file could not be parsed
    #[error("Settings error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    /// Create a new configuration error
    pub fn config<S: Into<String>>(msg: S) -> Self {
        Self::Config(msg.into())
    }
}
