//! Error types for document loading and reference resolution

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while loading documents or resolving `$ref` nodes
#[derive(Error, Debug)]
pub enum ResolutionError {
    #[error("Cannot read document {path}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Cannot parse document {path}: {message}")]
    Unparseable { path: PathBuf, message: String },

    #[error("Unresolved reference '{reference}' from {base}")]
    UnresolvedPointer { reference: String, base: PathBuf },

    #[error("Reference '{reference}' exceeds the maximum nesting depth of {max_depth}")]
    DepthExceeded { reference: String, max_depth: usize },
}
