//! Running an import plan against a gateway

use std::collections::HashMap;
use tracing::{debug, warn};

use crate::gateway::{
    AUTHORIZATION_NONE, Deployment, Directories, MethodConfig, PatchOperation, RestApi,
    path_segments,
};
use crate::sync::SyncError;
use crate::sync::porter::plan::{ImportStep, requires_authorizer};

/// New resource ids keyed by `<parentNewId>/<segment>`, rooted at the new
/// API's root resource
#[derive(Debug, Clone, Default)]
pub struct ResourceIdMap {
    root: String,
    children: HashMap<String, String>,
}

impl ResourceIdMap {
    pub fn seeded(root_id: impl Into<String>) -> Self {
        Self {
            root: root_id.into(),
            children: HashMap::new(),
        }
    }

    fn key(parent_id: &str, segment: &str) -> String {
        format!("{parent_id}/{segment}")
    }

    pub fn child(&self, parent_id: &str, segment: &str) -> Option<&str> {
        self.children
            .get(&Self::key(parent_id, segment))
            .map(String::as_str)
    }

    pub fn insert(&mut self, parent_id: &str, segment: &str, id: String) {
        self.children.insert(Self::key(parent_id, segment), id);
    }

    /// New id of the resource at `path`, if every segment has been created
    pub fn resolve(&self, path: &str) -> Option<&str> {
        path_segments(path)
            .into_iter()
            .try_fold(self.root.as_str(), |parent, segment| self.child(parent, segment))
    }
}

/// State carried from one step to the next
pub(crate) struct ImportRun<'a> {
    directories: &'a Directories,
    api: Option<RestApi>,
    ids: ResourceIdMap,
    validator_ids: HashMap<String, String>,
    authorizer_ids: HashMap<String, String>,
    deployment: Option<Deployment>,
}

impl<'a> ImportRun<'a> {
    pub(crate) fn new(directories: &'a Directories) -> Self {
        Self {
            directories,
            api: None,
            ids: ResourceIdMap::default(),
            validator_ids: HashMap::new(),
            authorizer_ids: HashMap::new(),
            deployment: None,
        }
    }

    pub(crate) fn into_parts(self) -> (Option<RestApi>, Option<Deployment>) {
        (self.api, self.deployment)
    }

    fn api_id(&self) -> Result<String, SyncError> {
        self.api
            .as_ref()
            .map(|api| api.id.clone())
            .ok_or_else(|| {
                SyncError::InvalidDocument("import plan must create the API first".to_string())
            })
    }

    fn resource_id(&self, path: &str) -> Result<String, SyncError> {
        self.ids
            .resolve(path)
            .map(str::to_string)
            .ok_or_else(|| SyncError::InvalidDocument(format!("resource {path} was not created")))
    }

    /// Run one step, returning the id of what it created
    pub(crate) async fn apply(&mut self, step: &ImportStep) -> Result<Option<String>, SyncError> {
        let d = self.directories;
        match step {
            ImportStep::CreateApi { name, description } => {
                let api = d.apis.create_api(name, description.as_deref()).await?;
                let root_id = match api.root_resource_id.clone() {
                    Some(root_id) => root_id,
                    None => d
                        .resources
                        .list_resources(&api.id)
                        .await?
                        .into_iter()
                        .find(|r| r.is_root())
                        .map(|r| r.id)
                        .ok_or_else(|| SyncError::MissingRoot {
                            api_id: api.id.clone(),
                        })?,
                };
                self.ids = ResourceIdMap::seeded(root_id);
                let id = api.id.clone();
                self.api = Some(api);
                Ok(Some(id))
            }
            ImportStep::UpdatePolicy { policy } => {
                let api_id = self.api_id()?;
                let updated = d
                    .apis
                    .update_api(&api_id, &[PatchOperation::replace("/policy", policy.clone())])
                    .await?;
                self.api = Some(updated);
                Ok(None)
            }
            ImportStep::CreateModel { model } => {
                let created = d.models.create_model(&self.api_id()?, model).await?;
                Ok(created.id)
            }
            ImportStep::CreateValidator { validator } => {
                let created = d
                    .validators
                    .create_validator(&self.api_id()?, validator)
                    .await?;
                if let (Some(old), Some(new)) = (&validator.id, &created.id) {
                    self.validator_ids.insert(old.clone(), new.clone());
                }
                Ok(created.id)
            }
            ImportStep::CreateAuthorizer { authorizer } => {
                let created = d
                    .authorizers
                    .create_authorizer(&self.api_id()?, authorizer)
                    .await?;
                if let (Some(old), Some(new)) = (&authorizer.id, &created.id) {
                    self.authorizer_ids.insert(old.clone(), new.clone());
                }
                Ok(created.id)
            }
            ImportStep::CreateResource {
                parent_path,
                path_part,
            } => {
                let parent_id = self.resource_id(parent_path)?;
                if let Some(existing) = self.ids.child(&parent_id, path_part) {
                    return Ok(Some(existing.to_string()));
                }
                let created = d
                    .resources
                    .create_resource(&self.api_id()?, &parent_id, path_part)
                    .await?;
                self.ids.insert(&parent_id, path_part, created.id.clone());
                Ok(Some(created.id))
            }
            ImportStep::PutMethod { path, method } => {
                let resource_id = self.resource_id(path)?;
                let method = self.remap(method);
                d.methods
                    .put_method(&self.api_id()?, &resource_id, &method)
                    .await?;
                Ok(None)
            }
            ImportStep::PutIntegration {
                path,
                verb,
                integration,
            } => {
                let resource_id = self.resource_id(path)?;
                d.integrations
                    .put_integration(&self.api_id()?, &resource_id, *verb, integration)
                    .await?;
                Ok(None)
            }
            ImportStep::PutMethodResponse {
                path,
                verb,
                response,
            } => {
                let resource_id = self.resource_id(path)?;
                d.integrations
                    .put_method_response(&self.api_id()?, &resource_id, *verb, response)
                    .await?;
                Ok(None)
            }
            ImportStep::PutIntegrationResponse {
                path,
                verb,
                response,
            } => {
                let resource_id = self.resource_id(path)?;
                d.integrations
                    .put_integration_response(&self.api_id()?, &resource_id, *verb, response)
                    .await?;
                Ok(None)
            }
            ImportStep::CreateDeployment { stage_name } => {
                let deployment = d
                    .deployments
                    .create_deployment(&self.api_id()?, stage_name)
                    .await?;
                let id = deployment.id.clone();
                self.deployment = Some(deployment);
                Ok(Some(id))
            }
        }
    }

    /// Point validator and authorizer ids at the entities this run created.
    ///
    /// Ids with no counterpart are dropped; a method left without the
    /// authorizer its type needs falls back to `NONE`.
    fn remap(&self, source: &MethodConfig) -> MethodConfig {
        let mut method = source.clone();
        let verb = method.http_method;

        method.request_validator_id = source.request_validator_id.as_ref().and_then(|old| {
            let new = self.validator_ids.get(old).cloned();
            if new.is_none() {
                warn!("Validator {old} of {verb} was not imported, dropping it");
            }
            new
        });
        method.authorizer_id = source.authorizer_id.as_ref().and_then(|old| {
            let new = self.authorizer_ids.get(old).cloned();
            if new.is_none() {
                warn!("Authorizer {old} of {verb} was not imported, dropping it");
            }
            new
        });
        if method.authorizer_id.is_none() && requires_authorizer(&method.authorization_type) {
            debug!(
                "{verb} had authorization {} without an authorizer, using NONE",
                method.authorization_type
            );
            method.authorization_type = AUTHORIZATION_NONE.to_string();
        }
        method
    }
}
