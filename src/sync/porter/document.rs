//! Self-contained snapshot of one API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::gateway::{
    Authorizer, IntegrationConfig, MethodConfig, Model, RequestValidator, ResourceNode, RestApi,
    Stage,
};
use crate::sync::SyncError;

/// An exported API, suitable for replay into a fresh API
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FullApiDocument {
    pub api: RestApi,
    pub resources: Vec<ExportedResource>,
    #[serde(default)]
    pub stages: Vec<Stage>,
    #[serde(default)]
    pub validators: Vec<RequestValidator>,
    #[serde(default)]
    pub models: Vec<Model>,
    #[serde(default)]
    pub authorizers: Vec<Authorizer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedResource {
    pub resource: ResourceNode,
    #[serde(default)]
    pub methods: Vec<ExportedMethod>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExportedMethod {
    pub method: MethodConfig,
    #[serde(default)]
    pub integration: Option<IntegrationConfig>,
}

impl FullApiDocument {
    /// A loaded document is a full API document when it has both `api` and
    /// `resources` at the top level
    pub fn is_full_document(document: &Value) -> bool {
        document.get("api").is_some() && document.get("resources").is_some()
    }

    pub fn from_value(document: Value) -> Result<Self, SyncError> {
        serde_json::from_value(document)
            .map_err(|e| SyncError::InvalidDocument(format!("full API document: {e}")))
    }

    /// Resource paths in document order
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.resources.iter().map(|r| r.resource.path.as_str())
    }

    pub fn method_count(&self) -> usize {
        self.resources.iter().map(|r| r.methods.len()).sum()
    }
}
