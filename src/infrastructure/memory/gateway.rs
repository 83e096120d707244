//! In-process gateway implementing every directory port
//!
//! Behaves like the remote resource API for the parts this crate relies on:
//! sibling path parts are unique, missing entities report `NotFound`, putting
//! an existing method is a no-op and parameter patches apply atomically.
//! Every call is journaled so callers can assert on the exact traffic, and
//! one-shot failures can be injected for any call.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard, PoisonError};
use uuid::Uuid;

use crate::gateway::{
    ApiDirectory, Authorizer, AuthorizerDirectory, Deployment, DeploymentDirectory,
    DirectoryError, DirectoryResult, HttpVerb, IntegrationConfig, IntegrationDirectory,
    IntegrationResponse, IntegrationType, MethodConfig, MethodDirectory, MethodResponse, Model,
    ModelDirectory, PatchOp, PatchOperation, RequestValidator, ResourceDirectory, ResourceNode,
    RestApi, Stage, StageDirectory, ValidatorDirectory, key_from_patch_path,
};

/// One call received by the gateway, in arrival order
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordedCall {
    CreateApi { name: String },
    GetApi { api_id: String },
    ListApis,
    UpdateApi {
        api_id: String,
        operations: Vec<PatchOperation>,
    },
    DeleteApi { api_id: String },
    ListResources { api_id: String },
    CreateResource {
        api_id: String,
        parent_id: String,
        path_part: String,
    },
    GetMethod {
        api_id: String,
        resource_id: String,
        verb: HttpVerb,
    },
    PutMethod {
        api_id: String,
        resource_id: String,
        verb: HttpVerb,
    },
    UpdateMethod {
        api_id: String,
        resource_id: String,
        verb: HttpVerb,
        operations: Vec<PatchOperation>,
    },
    DeleteMethod {
        api_id: String,
        resource_id: String,
        verb: HttpVerb,
    },
    GetIntegration {
        api_id: String,
        resource_id: String,
        verb: HttpVerb,
    },
    PutIntegration {
        api_id: String,
        resource_id: String,
        verb: HttpVerb,
        integration_type: IntegrationType,
    },
    PutMethodResponse {
        api_id: String,
        resource_id: String,
        verb: HttpVerb,
        status_code: String,
    },
    PutIntegrationResponse {
        api_id: String,
        resource_id: String,
        verb: HttpVerb,
        status_code: String,
    },
    ListModels { api_id: String },
    CreateModel { api_id: String, name: String },
    ListValidators { api_id: String },
    CreateValidator { api_id: String, name: String },
    ListAuthorizers { api_id: String },
    CreateAuthorizer { api_id: String, name: String },
    ListStages { api_id: String },
    CreateDeployment { api_id: String, stage_name: String },
}

type CallMatcher = Box<dyn Fn(&RecordedCall) -> bool + Send>;

struct ApiState {
    api: RestApi,
    resources: Vec<ResourceNode>,
    methods: BTreeMap<(String, HttpVerb), MethodConfig>,
    integrations: BTreeMap<(String, HttpVerb), IntegrationConfig>,
    models: Vec<Model>,
    validators: Vec<RequestValidator>,
    authorizers: Vec<Authorizer>,
    stages: Vec<Stage>,
    deployments: Vec<Deployment>,
}

impl ApiState {
    fn resource(&self, resource_id: &str) -> DirectoryResult<&ResourceNode> {
        self.resources
            .iter()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| DirectoryError::not_found("Resource", resource_id))
    }

    fn resource_mut(&mut self, resource_id: &str) -> DirectoryResult<&mut ResourceNode> {
        self.resources
            .iter_mut()
            .find(|r| r.id == resource_id)
            .ok_or_else(|| DirectoryError::not_found("Resource", resource_id))
    }

    fn method_mut(
        &mut self,
        resource_id: &str,
        verb: HttpVerb,
    ) -> DirectoryResult<&mut MethodConfig> {
        self.resource(resource_id)?;
        self.methods
            .get_mut(&(resource_id.to_string(), verb))
            .ok_or_else(|| DirectoryError::not_found("Method", format!("{resource_id}/{verb}")))
    }
}

#[derive(Default)]
struct State {
    apis: BTreeMap<String, ApiState>,
    calls: Vec<RecordedCall>,
    failures: Vec<(CallMatcher, DirectoryError)>,
}

impl State {
    /// Journal `call` and fire the first matching injected failure
    fn record(&mut self, call: RecordedCall) -> DirectoryResult<()> {
        let triggered = self.failures.iter().position(|(matches, _)| matches(&call));
        self.calls.push(call);
        match triggered {
            Some(index) => Err(self.failures.remove(index).1),
            None => Ok(()),
        }
    }

    fn api(&self, api_id: &str) -> DirectoryResult<&ApiState> {
        self.apis
            .get(api_id)
            .ok_or_else(|| DirectoryError::not_found("RestApi", api_id))
    }

    fn api_mut(&mut self, api_id: &str) -> DirectoryResult<&mut ApiState> {
        self.apis
            .get_mut(api_id)
            .ok_or_else(|| DirectoryError::not_found("RestApi", api_id))
    }
}

fn new_id() -> String {
    Uuid::new_v4().simple().to_string()[..10].to_string()
}

/// Gateway kept entirely in memory
#[derive(Default)]
pub struct InMemoryGateway {
    state: Mutex<State>,
}

impl InMemoryGateway {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Make the next call matching `matcher` fail with `error`
    pub fn fail_when<F>(&self, matcher: F, error: DirectoryError)
    where
        F: Fn(&RecordedCall) -> bool + Send + 'static,
    {
        self.lock().failures.push((Box::new(matcher), error));
    }

    /// Calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.lock().calls.clone()
    }

    pub fn clear_calls(&self) {
        self.lock().calls.clear();
    }

    pub fn api_ids(&self) -> Vec<String> {
        self.lock().apis.keys().cloned().collect()
    }

    pub fn root_id(&self, api_id: &str) -> Option<String> {
        self.lock()
            .apis
            .get(api_id)
            .and_then(|state| state.api.root_resource_id.clone())
    }

    /// Resources of an API without journaling a call
    pub fn snapshot_resources(&self, api_id: &str) -> Vec<ResourceNode> {
        self.lock()
            .apis
            .get(api_id)
            .map(|state| state.resources.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl ApiDirectory for InMemoryGateway {
    async fn create_api(&self, name: &str, description: Option<&str>) -> DirectoryResult<RestApi> {
        let mut state = self.lock();
        state.record(RecordedCall::CreateApi {
            name: name.to_string(),
        })?;

        let root = ResourceNode {
            id: new_id(),
            parent_id: None,
            path_part: None,
            path: "/".to_string(),
            resource_methods: Default::default(),
        };
        let api = RestApi {
            id: new_id(),
            name: name.to_string(),
            description: description.map(str::to_string),
            policy: None,
            root_resource_id: Some(root.id.clone()),
            created_date: Some(Utc::now()),
        };
        state.apis.insert(
            api.id.clone(),
            ApiState {
                api: api.clone(),
                resources: vec![root],
                methods: BTreeMap::new(),
                integrations: BTreeMap::new(),
                models: Vec::new(),
                validators: Vec::new(),
                authorizers: Vec::new(),
                stages: Vec::new(),
                deployments: Vec::new(),
            },
        );
        Ok(api)
    }

    async fn get_api(&self, api_id: &str) -> DirectoryResult<RestApi> {
        let mut state = self.lock();
        state.record(RecordedCall::GetApi {
            api_id: api_id.to_string(),
        })?;
        Ok(state.api(api_id)?.api.clone())
    }

    async fn list_apis(&self) -> DirectoryResult<Vec<RestApi>> {
        let mut state = self.lock();
        state.record(RecordedCall::ListApis)?;
        Ok(state.apis.values().map(|s| s.api.clone()).collect())
    }

    async fn update_api(
        &self,
        api_id: &str,
        operations: &[PatchOperation],
    ) -> DirectoryResult<RestApi> {
        let mut state = self.lock();
        state.record(RecordedCall::UpdateApi {
            api_id: api_id.to_string(),
            operations: operations.to_vec(),
        })?;

        let mut api = state.api(api_id)?.api.clone();
        for operation in operations {
            let value = match operation.op {
                PatchOp::Remove => None,
                PatchOp::Add | PatchOp::Replace => operation.value.clone(),
            };
            match operation.path.as_str() {
                "/policy" => api.policy = value,
                "/description" => api.description = value,
                "/name" => {
                    api.name = value.ok_or_else(|| DirectoryError::conflict("name is required"))?
                }
                other => {
                    return Err(DirectoryError::conflict(format!(
                        "Unsupported patch path {other}"
                    )));
                }
            }
        }
        state.api_mut(api_id)?.api = api.clone();
        Ok(api)
    }

    async fn delete_api(&self, api_id: &str) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.record(RecordedCall::DeleteApi {
            api_id: api_id.to_string(),
        })?;
        state
            .apis
            .remove(api_id)
            .map(|_| ())
            .ok_or_else(|| DirectoryError::not_found("RestApi", api_id))
    }
}

#[async_trait]
impl ResourceDirectory for InMemoryGateway {
    async fn list_resources(&self, api_id: &str) -> DirectoryResult<Vec<ResourceNode>> {
        let mut state = self.lock();
        state.record(RecordedCall::ListResources {
            api_id: api_id.to_string(),
        })?;
        Ok(state.api(api_id)?.resources.clone())
    }

    async fn create_resource(
        &self,
        api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> DirectoryResult<ResourceNode> {
        let mut state = self.lock();
        state.record(RecordedCall::CreateResource {
            api_id: api_id.to_string(),
            parent_id: parent_id.to_string(),
            path_part: path_part.to_string(),
        })?;

        if path_part.is_empty() || path_part.contains('/') {
            return Err(DirectoryError::conflict(format!(
                "Invalid path part '{path_part}'"
            )));
        }
        let api = state.api_mut(api_id)?;
        let parent_path = api.resource(parent_id)?.path.clone();
        let duplicate = api.resources.iter().any(|r| {
            r.parent_id.as_deref() == Some(parent_id) && r.path_part.as_deref() == Some(path_part)
        });
        if duplicate {
            return Err(DirectoryError::conflict(format!(
                "Another resource with the same parent already has the path part '{path_part}'"
            )));
        }

        let path = if parent_path == "/" {
            format!("/{path_part}")
        } else {
            format!("{parent_path}/{path_part}")
        };
        let node = ResourceNode {
            id: new_id(),
            parent_id: Some(parent_id.to_string()),
            path_part: Some(path_part.to_string()),
            path,
            resource_methods: Default::default(),
        };
        api.resources.push(node.clone());
        Ok(node)
    }
}

#[async_trait]
impl MethodDirectory for InMemoryGateway {
    async fn get_method(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> DirectoryResult<MethodConfig> {
        let mut state = self.lock();
        state.record(RecordedCall::GetMethod {
            api_id: api_id.to_string(),
            resource_id: resource_id.to_string(),
            verb,
        })?;
        Ok(state.api_mut(api_id)?.method_mut(resource_id, verb)?.clone())
    }

    async fn put_method(
        &self,
        api_id: &str,
        resource_id: &str,
        method: &MethodConfig,
    ) -> DirectoryResult<MethodConfig> {
        let verb = method.http_method;
        let mut state = self.lock();
        state.record(RecordedCall::PutMethod {
            api_id: api_id.to_string(),
            resource_id: resource_id.to_string(),
            verb,
        })?;

        let api = state.api_mut(api_id)?;
        api.resource_mut(resource_id)?.resource_methods.insert(verb);
        let stored = api
            .methods
            .entry((resource_id.to_string(), verb))
            .or_insert_with(|| method.clone());
        Ok(stored.clone())
    }

    async fn update_method(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        operations: &[PatchOperation],
    ) -> DirectoryResult<MethodConfig> {
        let mut state = self.lock();
        state.record(RecordedCall::UpdateMethod {
            api_id: api_id.to_string(),
            resource_id: resource_id.to_string(),
            verb,
            operations: operations.to_vec(),
        })?;

        let method = state.api_mut(api_id)?.method_mut(resource_id, verb)?;
        let mut updated = method.clone();
        for operation in operations {
            let key = key_from_patch_path(&operation.path).ok_or_else(|| {
                DirectoryError::conflict(format!("Unsupported patch path {}", operation.path))
            })?;
            match operation.op {
                PatchOp::Add | PatchOp::Replace => {
                    let required = match operation.value.as_deref() {
                        Some("true") => true,
                        Some("false") | None => false,
                        Some(other) => {
                            return Err(DirectoryError::conflict(format!(
                                "Invalid boolean '{other}' for {key}"
                            )));
                        }
                    };
                    updated.request_parameters.insert(key.to_string(), required);
                }
                PatchOp::Remove => {
                    if updated.request_parameters.remove(key).is_none() {
                        return Err(DirectoryError::not_found("Request parameter", key));
                    }
                }
            }
        }
        *method = updated.clone();
        Ok(updated)
    }

    async fn delete_method(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.record(RecordedCall::DeleteMethod {
            api_id: api_id.to_string(),
            resource_id: resource_id.to_string(),
            verb,
        })?;

        let api = state.api_mut(api_id)?;
        api.method_mut(resource_id, verb)?;
        let key = (resource_id.to_string(), verb);
        api.methods.remove(&key);
        api.integrations.remove(&key);
        api.resource_mut(resource_id)?.resource_methods.remove(&verb);
        Ok(())
    }
}

#[async_trait]
impl IntegrationDirectory for InMemoryGateway {
    async fn get_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> DirectoryResult<IntegrationConfig> {
        let mut state = self.lock();
        state.record(RecordedCall::GetIntegration {
            api_id: api_id.to_string(),
            resource_id: resource_id.to_string(),
            verb,
        })?;

        let api = state.api_mut(api_id)?;
        api.method_mut(resource_id, verb)?;
        api.integrations
            .get(&(resource_id.to_string(), verb))
            .cloned()
            .ok_or_else(|| integration_not_found(resource_id, verb))
    }

    async fn put_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        integration: &IntegrationConfig,
    ) -> DirectoryResult<IntegrationConfig> {
        let mut state = self.lock();
        state.record(RecordedCall::PutIntegration {
            api_id: api_id.to_string(),
            resource_id: resource_id.to_string(),
            verb,
            integration_type: integration.integration_type,
        })?;

        if integration.integration_type != IntegrationType::Mock && integration.uri.is_none() {
            return Err(DirectoryError::conflict(format!(
                "Integrations of type {} require a uri",
                integration.integration_type
            )));
        }
        let api = state.api_mut(api_id)?;
        api.method_mut(resource_id, verb)?;
        api.integrations
            .insert((resource_id.to_string(), verb), integration.clone());
        Ok(integration.clone())
    }

    async fn put_method_response(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        response: &MethodResponse,
    ) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.record(RecordedCall::PutMethodResponse {
            api_id: api_id.to_string(),
            resource_id: resource_id.to_string(),
            verb,
            status_code: response.status_code.clone(),
        })?;

        state
            .api_mut(api_id)?
            .method_mut(resource_id, verb)?
            .method_responses
            .insert(response.status_code.clone(), response.clone());
        Ok(())
    }

    async fn put_integration_response(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        response: &IntegrationResponse,
    ) -> DirectoryResult<()> {
        let mut state = self.lock();
        state.record(RecordedCall::PutIntegrationResponse {
            api_id: api_id.to_string(),
            resource_id: resource_id.to_string(),
            verb,
            status_code: response.status_code.clone(),
        })?;

        let api = state.api_mut(api_id)?;
        api.method_mut(resource_id, verb)?;
        let integration = api
            .integrations
            .get_mut(&(resource_id.to_string(), verb))
            .ok_or_else(|| integration_not_found(resource_id, verb))?;
        integration
            .integration_responses
            .insert(response.status_code.clone(), response.clone());
        Ok(())
    }
}

#[async_trait]
impl ModelDirectory for InMemoryGateway {
    async fn list_models(&self, api_id: &str) -> DirectoryResult<Vec<Model>> {
        let mut state = self.lock();
        state.record(RecordedCall::ListModels {
            api_id: api_id.to_string(),
        })?;
        Ok(state.api(api_id)?.models.clone())
    }

    async fn create_model(&self, api_id: &str, model: &Model) -> DirectoryResult<Model> {
        let mut state = self.lock();
        state.record(RecordedCall::CreateModel {
            api_id: api_id.to_string(),
            name: model.name.clone(),
        })?;

        let api = state.api_mut(api_id)?;
        if api.models.iter().any(|m| m.name == model.name) {
            return Err(DirectoryError::conflict(format!(
                "Model name already exists: {}",
                model.name
            )));
        }
        let created = Model {
            id: Some(new_id()),
            ..model.clone()
        };
        api.models.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl ValidatorDirectory for InMemoryGateway {
    async fn list_validators(&self, api_id: &str) -> DirectoryResult<Vec<RequestValidator>> {
        let mut state = self.lock();
        state.record(RecordedCall::ListValidators {
            api_id: api_id.to_string(),
        })?;
        Ok(state.api(api_id)?.validators.clone())
    }

    async fn create_validator(
        &self,
        api_id: &str,
        validator: &RequestValidator,
    ) -> DirectoryResult<RequestValidator> {
        let mut state = self.lock();
        state.record(RecordedCall::CreateValidator {
            api_id: api_id.to_string(),
            name: validator.name.clone(),
        })?;

        let created = RequestValidator {
            id: Some(new_id()),
            ..validator.clone()
        };
        state.api_mut(api_id)?.validators.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl AuthorizerDirectory for InMemoryGateway {
    async fn list_authorizers(&self, api_id: &str) -> DirectoryResult<Vec<Authorizer>> {
        let mut state = self.lock();
        state.record(RecordedCall::ListAuthorizers {
            api_id: api_id.to_string(),
        })?;
        Ok(state.api(api_id)?.authorizers.clone())
    }

    async fn create_authorizer(
        &self,
        api_id: &str,
        authorizer: &Authorizer,
    ) -> DirectoryResult<Authorizer> {
        let mut state = self.lock();
        state.record(RecordedCall::CreateAuthorizer {
            api_id: api_id.to_string(),
            name: authorizer.name.clone(),
        })?;

        let created = Authorizer {
            id: Some(new_id()),
            ..authorizer.clone()
        };
        state.api_mut(api_id)?.authorizers.push(created.clone());
        Ok(created)
    }
}

#[async_trait]
impl StageDirectory for InMemoryGateway {
    async fn list_stages(&self, api_id: &str) -> DirectoryResult<Vec<Stage>> {
        let mut state = self.lock();
        state.record(RecordedCall::ListStages {
            api_id: api_id.to_string(),
        })?;
        Ok(state.api(api_id)?.stages.clone())
    }
}

#[async_trait]
impl DeploymentDirectory for InMemoryGateway {
    async fn create_deployment(
        &self,
        api_id: &str,
        stage_name: &str,
    ) -> DirectoryResult<Deployment> {
        let mut state = self.lock();
        state.record(RecordedCall::CreateDeployment {
            api_id: api_id.to_string(),
            stage_name: stage_name.to_string(),
        })?;

        let api = state.api_mut(api_id)?;
        let deployment = Deployment {
            id: new_id(),
            description: None,
            created_date: Utc::now(),
        };
        api.deployments.push(deployment.clone());
        match api.stages.iter_mut().find(|s| s.stage_name == stage_name) {
            Some(stage) => stage.deployment_id = Some(deployment.id.clone()),
            None => api.stages.push(Stage {
                stage_name: stage_name.to_string(),
                deployment_id: Some(deployment.id.clone()),
                description: None,
            }),
        }
        Ok(deployment)
    }
}

fn integration_not_found(resource_id: &str, verb: HttpVerb) -> DirectoryError {
    DirectoryError::not_found("Integration", format!("{resource_id}/{verb}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_new_api_has_root_resource() {
        let gateway = InMemoryGateway::new();
        let api = gateway.create_api("a", Some("desc")).await.unwrap();

        let resources = gateway.list_resources(&api.id).await.unwrap();
        assert_eq!(resources.len(), 1);
        assert!(resources[0].is_root());
        assert_eq!(api.root_resource_id.as_deref(), Some(resources[0].id.as_str()));
    }

    #[tokio::test]
    async fn test_duplicate_sibling_is_a_conflict() {
        let gateway = InMemoryGateway::new();
        let api = gateway.create_api("a", None).await.unwrap();
        let root = api.root_resource_id.unwrap();

        gateway.create_resource(&api.id, &root, "users").await.unwrap();
        let error = gateway
            .create_resource(&api.id, &root, "users")
            .await
            .unwrap_err();
        assert!(matches!(error, DirectoryError::Conflict(_)));
    }

    #[tokio::test]
    async fn test_put_method_is_idempotent() {
        let gateway = InMemoryGateway::new();
        let api = gateway.create_api("a", None).await.unwrap();
        let root = api.root_resource_id.unwrap();

        let mut method = MethodConfig::new(HttpVerb::Get);
        method
            .request_parameters
            .insert("method.request.header.x".to_string(), true);
        gateway.put_method(&api.id, &root, &method).await.unwrap();

        let stored = gateway
            .put_method(&api.id, &root, &MethodConfig::new(HttpVerb::Get))
            .await
            .unwrap();
        assert_eq!(stored.request_parameters.len(), 1);
    }

    #[tokio::test]
    async fn test_update_method_is_atomic() {
        let gateway = InMemoryGateway::new();
        let api = gateway.create_api("a", None).await.unwrap();
        let root = api.root_resource_id.unwrap();
        gateway
            .put_method(&api.id, &root, &MethodConfig::new(HttpVerb::Get))
            .await
            .unwrap();

        let result = gateway
            .update_method(
                &api.id,
                &root,
                HttpVerb::Get,
                &[
                    PatchOperation::add("/requestParameters/method.request.path.a", "true"),
                    PatchOperation::remove("/requestParameters/method.request.path.missing"),
                ],
            )
            .await;
        assert!(result.unwrap_err().is_not_found());

        let method = gateway.get_method(&api.id, &root, HttpVerb::Get).await.unwrap();
        assert!(method.request_parameters.is_empty());
    }

    #[tokio::test]
    async fn test_integration_requires_uri_unless_mock() {
        let gateway = InMemoryGateway::new();
        let api = gateway.create_api("a", None).await.unwrap();
        let root = api.root_resource_id.unwrap();
        gateway
            .put_method(&api.id, &root, &MethodConfig::new(HttpVerb::Post))
            .await
            .unwrap();

        let http = IntegrationConfig::new(IntegrationType::HttpProxy);
        assert!(
            gateway
                .put_integration(&api.id, &root, HttpVerb::Post, &http)
                .await
                .is_err()
        );
        let mock = IntegrationConfig::new(IntegrationType::Mock);
        assert!(
            gateway
                .put_integration(&api.id, &root, HttpVerb::Post, &mock)
                .await
                .is_ok()
        );
    }

    #[tokio::test]
    async fn test_injected_failure_fires_once() {
        let gateway = InMemoryGateway::new();
        gateway.fail_when(
            |call| matches!(call, RecordedCall::CreateApi { .. }),
            DirectoryError::failure("throttled"),
        );

        assert_eq!(
            gateway.create_api("a", None).await.unwrap_err(),
            DirectoryError::failure("throttled")
        );
        assert!(gateway.create_api("a", None).await.is_ok());
        assert_eq!(gateway.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_deployment_creates_stage() {
        let gateway = InMemoryGateway::new();
        let api = gateway.create_api("a", None).await.unwrap();

        let deployment = gateway.create_deployment(&api.id, "dev").await.unwrap();
        let stages = gateway.list_stages(&api.id).await.unwrap();
        assert_eq!(stages.len(), 1);
        assert_eq!(stages[0].deployment_id.as_deref(), Some(deployment.id.as_str()));
    }
}
