//! File-based document loader
//!
//! This loader handles file I/O and format detection only. Reference
//! resolution is done by the `ReferenceResolver`.

use async_trait::async_trait;
use serde_json::Value;
use std::path::Path;
use tokio::fs;

use crate::openapi::{DocumentLoader, ResolutionError};

/// Loads JSON or YAML documents from local files
pub struct FileDocumentLoader;

impl FileDocumentLoader {
    pub fn new() -> Self {
        Self
    }
}

impl Default for FileDocumentLoader {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentLoader for FileDocumentLoader {
    async fn load(&self, path: &Path) -> Result<Value, ResolutionError> {
        let content = fs::read_to_string(path)
            .await
            .map_err(|source| ResolutionError::Unreadable {
                path: path.to_path_buf(),
                source,
            })?;

        tracing::debug!("FileDocumentLoader: read {} bytes from {}", content.len(), path.display());
        parse_document(path, &content)
    }
}

/// Parse `content` as JSON or YAML, choosing by the extension of `path`.
///
/// Unknown extensions try JSON first, then YAML.
pub fn parse_document(path: &Path, content: &str) -> Result<Value, ResolutionError> {
    let unparseable = |message: String| ResolutionError::Unparseable {
        path: path.to_path_buf(),
        message,
    };

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => serde_json::from_str(content).map_err(|e| unparseable(e.to_string())),
        Some("yaml") | Some("yml") => serde_yaml::from_str(content)
            .map_err(|e| unparseable(format!("Failed to parse YAML: {e}"))),
        _ => serde_json::from_str(content)
            .or_else(|_| serde_yaml::from_str(content))
            .map_err(|e| unparseable(format!("Failed to parse document: {e}"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_file_loader_json() {
        let mut temp_file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .expect("Failed to create temp file");
        temp_file
            .write_all(br#"{"openapi": "3.0.0", "info": {"title": "Test API"}}"#)
            .expect("Failed to write temp file");

        let doc = FileDocumentLoader::new()
            .load(temp_file.path())
            .await
            .unwrap();
        assert_eq!(doc["info"]["title"], "Test API");
    }

    #[tokio::test]
    async fn test_file_loader_yaml() {
        let mut temp_file = tempfile::Builder::new()
            .suffix(".yaml")
            .tempfile()
            .expect("Failed to create temp file");
        temp_file
            .write_all(b"openapi: 3.0.0\ninfo:\n  title: Test API\npaths: {}\n")
            .expect("Failed to write temp file");

        let doc = FileDocumentLoader::new()
            .load(temp_file.path())
            .await
            .unwrap();
        assert_eq!(doc["openapi"], "3.0.0");
        assert!(doc["paths"].as_object().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_file_loader_unknown_extension_falls_back_to_yaml() {
        let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
        temp_file
            .write_all(b"swagger: '2.0'\n")
            .expect("Failed to write temp file");

        let doc = FileDocumentLoader::new()
            .load(temp_file.path())
            .await
            .unwrap();
        assert_eq!(doc["swagger"], "2.0");
    }

    #[tokio::test]
    async fn test_file_loader_not_found() {
        let result = FileDocumentLoader::new()
            .load(Path::new("/nonexistent/file.yaml"))
            .await;
        assert!(matches!(result, Err(ResolutionError::Unreadable { .. })));
    }

    #[test]
    fn test_parse_document_reports_bad_json() {
        let result = parse_document(Path::new("broken.json"), "{not json");
        assert!(matches!(result, Err(ResolutionError::Unparseable { .. })));
    }
}
