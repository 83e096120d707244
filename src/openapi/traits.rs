//! Port interfaces for document loading

use crate::openapi::ResolutionError;
use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;

/// Reads and parses a single document from a path
#[async_trait]
pub trait DocumentLoader: Send + Sync {
    /// Load the document at `path` without resolving any references
    async fn load(&self, path: &Path) -> Result<Value, ResolutionError>;
}
