//! Port interfaces for the remote gateway
//!
//! Each directory is a thin view over the remote resource API. Every call is
//! one round trip; timeouts and retries belong to the implementation.
//! Missing entities must be reported as [`DirectoryError::NotFound`].

use async_trait::async_trait;
use std::sync::Arc;

use crate::gateway::{
    Authorizer, Deployment, DirectoryError, HttpVerb, IntegrationConfig, IntegrationResponse,
    MethodConfig, MethodResponse, Model, PatchOperation, RequestValidator, ResourceNode, RestApi,
    Stage,
};

pub type DirectoryResult<T> = Result<T, DirectoryError>;

/// API shells
#[async_trait]
pub trait ApiDirectory: Send + Sync {
    async fn create_api(&self, name: &str, description: Option<&str>) -> DirectoryResult<RestApi>;
    async fn get_api(&self, api_id: &str) -> DirectoryResult<RestApi>;
    async fn list_apis(&self) -> DirectoryResult<Vec<RestApi>>;
    async fn update_api(
        &self,
        api_id: &str,
        operations: &[PatchOperation],
    ) -> DirectoryResult<RestApi>;
    async fn delete_api(&self, api_id: &str) -> DirectoryResult<()>;
}

/// The resource tree of an API
#[async_trait]
pub trait ResourceDirectory: Send + Sync {
    async fn list_resources(&self, api_id: &str) -> DirectoryResult<Vec<ResourceNode>>;
    async fn create_resource(
        &self,
        api_id: &str,
        parent_id: &str,
        path_part: &str,
    ) -> DirectoryResult<ResourceNode>;
}

/// Methods bound to resources
#[async_trait]
pub trait MethodDirectory: Send + Sync {
    async fn get_method(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> DirectoryResult<MethodConfig>;

    /// Create the method; putting an existing method leaves it unchanged
    async fn put_method(
        &self,
        api_id: &str,
        resource_id: &str,
        method: &MethodConfig,
    ) -> DirectoryResult<MethodConfig>;

    /// Apply a batch of patches atomically
    async fn update_method(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        operations: &[PatchOperation],
    ) -> DirectoryResult<MethodConfig>;

    async fn delete_method(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> DirectoryResult<()>;
}

/// Integrations and the responses around them
#[async_trait]
pub trait IntegrationDirectory: Send + Sync {
    async fn get_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> DirectoryResult<IntegrationConfig>;

    async fn put_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        integration: &IntegrationConfig,
    ) -> DirectoryResult<IntegrationConfig>;

    async fn put_method_response(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        response: &MethodResponse,
    ) -> DirectoryResult<()>;

    async fn put_integration_response(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        response: &IntegrationResponse,
    ) -> DirectoryResult<()>;
}

#[async_trait]
pub trait ModelDirectory: Send + Sync {
    async fn list_models(&self, api_id: &str) -> DirectoryResult<Vec<Model>>;
    async fn create_model(&self, api_id: &str, model: &Model) -> DirectoryResult<Model>;
}

#[async_trait]
pub trait ValidatorDirectory: Send + Sync {
    async fn list_validators(&self, api_id: &str) -> DirectoryResult<Vec<RequestValidator>>;
    async fn create_validator(
        &self,
        api_id: &str,
        validator: &RequestValidator,
    ) -> DirectoryResult<RequestValidator>;
}

#[async_trait]
pub trait AuthorizerDirectory: Send + Sync {
    async fn list_authorizers(&self, api_id: &str) -> DirectoryResult<Vec<Authorizer>>;
    async fn create_authorizer(
        &self,
        api_id: &str,
        authorizer: &Authorizer,
    ) -> DirectoryResult<Authorizer>;
}

#[async_trait]
pub trait StageDirectory: Send + Sync {
    async fn list_stages(&self, api_id: &str) -> DirectoryResult<Vec<Stage>>;
}

#[async_trait]
pub trait DeploymentDirectory: Send + Sync {
    async fn create_deployment(&self, api_id: &str, stage_name: &str)
    -> DirectoryResult<Deployment>;
}

/// Every directory at once, as offered by a complete gateway client
pub trait Gateway:
    ApiDirectory
    + ResourceDirectory
    + MethodDirectory
    + IntegrationDirectory
    + ModelDirectory
    + ValidatorDirectory
    + AuthorizerDirectory
    + StageDirectory
    + DeploymentDirectory
{
}

impl<T> Gateway for T where
    T: ApiDirectory
        + ResourceDirectory
        + MethodDirectory
        + IntegrationDirectory
        + ModelDirectory
        + ValidatorDirectory
        + AuthorizerDirectory
        + StageDirectory
        + DeploymentDirectory
{
}

/// Shared handles to each directory, usually all backed by one gateway
#[derive(Clone)]
pub struct Directories {
    pub apis: Arc<dyn ApiDirectory>,
    pub resources: Arc<dyn ResourceDirectory>,
    pub methods: Arc<dyn MethodDirectory>,
    pub integrations: Arc<dyn IntegrationDirectory>,
    pub models: Arc<dyn ModelDirectory>,
    pub validators: Arc<dyn ValidatorDirectory>,
    pub authorizers: Arc<dyn AuthorizerDirectory>,
    pub stages: Arc<dyn StageDirectory>,
    pub deployments: Arc<dyn DeploymentDirectory>,
}

impl Directories {
    pub fn from_gateway<G: Gateway + 'static>(gateway: Arc<G>) -> Self {
        Self {
            apis: gateway.clone(),
            resources: gateway.clone(),
            methods: gateway.clone(),
            integrations: gateway.clone(),
            models: gateway.clone(),
            validators: gateway.clone(),
            authorizers: gateway.clone(),
            stages: gateway.clone(),
            deployments: gateway,
        }
    }
}
