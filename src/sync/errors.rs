//! Error types for the synchronization domain

use crate::gateway::DirectoryError;
use thiserror::Error;

/// Errors that can occur while reconciling desired state against a gateway
#[derive(Error, Debug)]
pub enum SyncError {
    #[error("Directory error: {0}")]
    Directory(#[from] DirectoryError),

    #[error("API {api_id} has no root resource")]
    MissingRoot { api_id: String },

    #[error("Invalid integration target: {0}")]
    InvalidTarget(String),

    #[error("Invalid document: {0}")]
    InvalidDocument(String),
}

impl SyncError {
    /// The underlying directory error, if this is one
    pub fn directory_error(&self) -> Option<&DirectoryError> {
        match self {
            SyncError::Directory(e) => Some(e),
            _ => None,
        }
    }
}
