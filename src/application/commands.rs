//! Requests and responses of the gateway use cases

use serde::Serialize;
use std::path::PathBuf;

use crate::application::ValidationError;
use crate::gateway::{Deployment, HttpVerb, RestApi};
use crate::sync::{ImportJournal, IntegrationTarget, PathItemReport};

fn validate_api_id(api_id: &str) -> Result<(), ValidationError> {
    if api_id.trim().is_empty() {
        return Err(ValidationError::EmptyApiId);
    }
    Ok(())
}

/// `/` or `/a/b`; no empty segments and no trailing slash
pub fn validate_path(path: &str) -> Result<(), ValidationError> {
    let valid = path == "/"
        || (path.starts_with('/') && path[1..].split('/').all(|segment| !segment.is_empty()));
    if valid {
        Ok(())
    } else {
        Err(ValidationError::InvalidPath(path.to_string()))
    }
}

/// Request to declare a method on a path, creating the path as needed
#[derive(Debug, Clone)]
pub struct CreateEndpointRequest {
    pub api_id: String,
    pub path: String,
    pub method: HttpVerb,
}

impl CreateEndpointRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_api_id(&self.api_id)?;
        validate_path(&self.path)
    }
}

/// Request to rewire a method's integration
#[derive(Debug, Clone)]
pub struct UpdateIntegrationRequest {
    pub api_id: String,
    pub resource_id: String,
    pub method: HttpVerb,
    pub target: IntegrationTarget,
    /// Forward the rest of the path through the greedy `{proxy}` parameter
    pub proxy_enabled: bool,
}

impl UpdateIntegrationRequest {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_api_id(&self.api_id)?;
        if self.resource_id.trim().is_empty() {
            return Err(ValidationError::MissingField("resource_id".to_string()));
        }
        Ok(())
    }
}

/// Request to import a document from disk
#[derive(Debug, Clone)]
pub struct ImportRequest {
    pub path: PathBuf,
    /// Overrides the name found in the document
    pub api_name: Option<String>,
}

/// Which kind of document an import consumed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportKind {
    FullApi,
    OpenApi,
}

/// Result of an import
#[derive(Debug, Clone, Serialize)]
pub struct ImportResponse {
    pub kind: ImportKind,
    pub api: RestApi,
    pub deployment: Option<Deployment>,
    /// Steps of a full API import
    #[serde(skip_serializing_if = "Option::is_none")]
    pub journal: Option<ImportJournal>,
    /// Paths applied from an OpenAPI document
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub paths: Vec<PathItemReport>,
}
