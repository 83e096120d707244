//! Application layer error types

use thiserror::Error;

use crate::gateway::DirectoryError;
use crate::openapi::ResolutionError;
use crate::sync::{ImportFailure, SyncError};

/// Application layer errors
#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Validation error: {0}")]
    ValidationError(#[from] ValidationError),

    #[error("Resolution error: {0}")]
    ResolutionError(#[from] ResolutionError),

    #[error("Gateway error: {0}")]
    DirectoryError(#[from] DirectoryError),

    #[error("Sync error: {0}")]
    SyncError(#[from] SyncError),

    /// The import stopped; `rolled_back` tells whether the partial API was deleted
    #[error("{failure}{}", rollback_note(.rolled_back))]
    ImportFailed {
        failure: Box<ImportFailure>,
        rolled_back: bool,
    },
}

fn rollback_note(rolled_back: &bool) -> &'static str {
    if *rolled_back {
        " (partial API deleted)"
    } else {
        ""
    }
}

/// Validation errors for requests
#[derive(Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("API id cannot be empty")]
    EmptyApiId,

    #[error("Invalid path '{0}': it must start with '/' and have no empty segments")]
    InvalidPath(String),

    #[error("Missing required field: {0}")]
    MissingField(String),
}
