//! Loading OpenAPI documents from disk

pub mod file_loader;

pub use file_loader::{FileDocumentLoader, parse_document};
