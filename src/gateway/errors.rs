//! Error types reported by gateway directories

use thiserror::Error;

/// Failure of a single directory call against the remote gateway
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DirectoryError {
    /// The addressed entity does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: String, id: String },

    /// The call was rejected (validation failure, duplicate, bad reference)
    #[error("Conflict: {0}")]
    Conflict(String),

    /// Transport faults, throttling and anything else
    #[error("Remote failure: {0}")]
    Failure(String),
}

impl DirectoryError {
    pub fn not_found<E: Into<String>, I: Into<String>>(entity: E, id: I) -> Self {
        Self::NotFound {
            entity: entity.into(),
            id: id.into(),
        }
    }

    pub fn conflict<S: Into<String>>(msg: S) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn failure<S: Into<String>>(msg: S) -> Self {
        Self::Failure(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

/// Extension for turning a not-found result into `None`
pub trait OptionalExt<T> {
    /// Map `NotFound` to `Ok(None)` and keep every other error
    fn optional(self) -> Result<Option<T>, DirectoryError>;
}

impl<T> OptionalExt<T> for Result<T, DirectoryError> {
    fn optional(self) -> Result<Option<T>, DirectoryError> {
        match self {
            Ok(value) => Ok(Some(value)),
            Err(e) if e.is_not_found() => Ok(None),
            Err(e) => Err(e),
        }
    }
}
