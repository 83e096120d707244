//! Gateway use cases
//!
//! `GatewayService` strings the synchronizers together into the operations a
//! user performs: declaring endpoints, editing parameters and integrations,
//! importing documents, exporting APIs and deploying.

use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::application::{
    ApplicationError, CreateEndpointRequest, ImportKind, ImportRequest, ImportResponse,
    UpdateIntegrationRequest, ValidationError, validate_path,
};
use crate::core::config::Settings;
use crate::gateway::{
    Deployment, Directories, Endpoint, HttpVerb, IntegrationConfig, RequestParameter, RestApi,
};
use crate::openapi::{DocumentLoader, ReferenceResolver};
use crate::sync::{
    FullApiDocument, FullApiPorter, ImportFailure, IntegrationManager, MethodReconciler,
    ParameterDiff, PathItemReport, PathItemSynchronizer, ResourceTreeSynchronizer,
};

/// Use-case facade over one gateway
pub struct GatewayService {
    directories: Directories,
    resolver: ReferenceResolver,
    settings: Settings,
    tree: ResourceTreeSynchronizer,
    methods: MethodReconciler,
    integrations: IntegrationManager,
}

impl GatewayService {
    pub fn new(
        directories: Directories,
        loader: Arc<dyn DocumentLoader>,
        settings: Settings,
    ) -> Self {
        let methods = MethodReconciler::new(Arc::clone(&directories.methods));
        Self {
            resolver: ReferenceResolver::new(loader, settings.resolution.clone()),
            tree: ResourceTreeSynchronizer::new(Arc::clone(&directories.resources)),
            integrations: IntegrationManager::new(
                Arc::clone(&directories.integrations),
                methods.clone(),
                settings.gateway.clone(),
            ),
            methods,
            directories,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub async fn list_apis(&self) -> Result<Vec<RestApi>, ApplicationError> {
        Ok(self.directories.apis.list_apis().await?)
    }

    pub async fn create_api(
        &self,
        name: &str,
        description: Option<&str>,
    ) -> Result<RestApi, ApplicationError> {
        if name.trim().is_empty() {
            return Err(ValidationError::MissingField("name".to_string()).into());
        }
        let api = self.directories.apis.create_api(name, description).await?;
        info!("Created API {} ({})", api.name, api.id);
        Ok(api)
    }

    pub async fn delete_api(&self, api_id: &str) -> Result<(), ApplicationError> {
        self.directories.apis.delete_api(api_id).await?;
        info!("Deleted API {api_id}");
        Ok(())
    }

    /// Every (resource, method) pair of an API
    pub async fn list_endpoints(&self, api_id: &str) -> Result<Vec<Endpoint>, ApplicationError> {
        let resources = self.directories.resources.list_resources(api_id).await?;
        Ok(resources
            .into_iter()
            .flat_map(|resource| {
                let verbs: Vec<HttpVerb> = resource.resource_methods.iter().copied().collect();
                verbs.into_iter().map(move |method| Endpoint {
                    resource_id: resource.id.clone(),
                    path: resource.path.clone(),
                    method,
                })
            })
            .collect())
    }

    /// Create the path's missing segments and declare the method on it
    pub async fn create_endpoint(
        &self,
        request: CreateEndpointRequest,
    ) -> Result<Endpoint, ApplicationError> {
        request.validate()?;

        let resource_id = self
            .tree
            .ensure_resource(&request.api_id, &request.path)
            .await?;
        self.methods
            .ensure_method(&request.api_id, &resource_id, request.method)
            .await?;
        info!("Endpoint {} {} ready", request.method, request.path);
        Ok(Endpoint {
            resource_id,
            path: request.path,
            method: request.method,
        })
    }

    /// Delete a method and redeploy
    pub async fn delete_endpoint(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> Result<Deployment, ApplicationError> {
        self.methods.delete_method(api_id, resource_id, verb).await?;
        info!("Deleted {verb} on {resource_id}");
        self.deploy(api_id).await
    }

    /// Make the method's declared parameters exactly `parameters`
    pub async fn update_parameters(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        parameters: &[RequestParameter],
    ) -> Result<ParameterDiff, ApplicationError> {
        Ok(self
            .methods
            .sync_parameters(api_id, resource_id, verb, parameters)
            .await?)
    }

    /// Rewire a method and redeploy
    pub async fn update_integration(
        &self,
        request: UpdateIntegrationRequest,
    ) -> Result<IntegrationConfig, ApplicationError> {
        request.validate()?;

        let applied = self
            .integrations
            .update_integration(
                &request.api_id,
                &request.resource_id,
                request.method,
                &request.target,
                request.proxy_enabled,
            )
            .await?;
        self.deploy(&request.api_id).await?;
        Ok(applied)
    }

    /// Give every method without request templates a MOCK integration.
    ///
    /// Returns the number of methods that were backfilled.
    pub async fn ensure_integrations(&self, api_id: &str) -> Result<usize, ApplicationError> {
        let mut backfilled = 0;
        for endpoint in self.list_endpoints(api_id).await? {
            if self
                .integrations
                .ensure_mock_integration(api_id, &endpoint.resource_id, endpoint.method)
                .await?
            {
                backfilled += 1;
            }
        }
        if backfilled > 0 {
            info!("Backfilled {backfilled} MOCK integration(s) on {api_id}");
        }
        Ok(backfilled)
    }

    /// Give a MOCK integration to every method that has none; declared
    /// integrations are left alone
    async fn fill_missing_integrations(&self, api_id: &str) -> Result<usize, ApplicationError> {
        let mut backfilled = 0;
        for endpoint in self.list_endpoints(api_id).await? {
            if self
                .integrations
                .backfill_mock_integration(api_id, &endpoint.resource_id, endpoint.method)
                .await?
            {
                backfilled += 1;
            }
        }
        debug!("Backfilled {backfilled} missing integration(s) on {api_id}");
        Ok(backfilled)
    }

    /// Apply one OpenAPI path item to an existing API and redeploy
    pub async fn put_path_item(
        &self,
        api_id: &str,
        path: &str,
        path_item: &Value,
    ) -> Result<PathItemReport, ApplicationError> {
        validate_path(path)?;
        let report = self
            .path_items()
            .put_path_item(api_id, path, path_item)
            .await?;
        self.deploy(api_id).await?;
        Ok(report)
    }

    /// Resolve a document from disk and import it as a new API.
    ///
    /// Full API documents are replayed by the porter. Anything else is
    /// treated as OpenAPI: its paths are applied to a fresh API, methods the
    /// document gave no integration get a MOCK one and the API is deployed.
    pub async fn import_file(
        &self,
        request: ImportRequest,
    ) -> Result<ImportResponse, ApplicationError> {
        let document = self.resolver.load(&request.path).await?;

        if FullApiDocument::is_full_document(&document) {
            let mut full = FullApiDocument::from_value(document)?;
            if let Some(name) = request.api_name {
                full.api.name = name;
            }
            return self.import_full_api(&full).await;
        }

        let name = request
            .api_name
            .or_else(|| text_at(&document, "/info/title"))
            .or_else(|| {
                request
                    .path
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().into_owned())
            })
            .ok_or_else(|| ValidationError::MissingField("api name".to_string()))?;
        let description = text_at(&document, "/info/description");
        let api = self.create_api(&name, description.as_deref()).await?;

        match self.populate(&api.id, &document).await {
            Ok((paths, deployment)) => Ok(ImportResponse {
                kind: ImportKind::OpenApi,
                api,
                deployment: Some(deployment),
                journal: None,
                paths,
            }),
            Err(error) => {
                if self.settings.import.rollback_on_failure {
                    self.roll_back(&api.id).await;
                }
                Err(error)
            }
        }
    }

    async fn populate(
        &self,
        api_id: &str,
        document: &Value,
    ) -> Result<(Vec<PathItemReport>, Deployment), ApplicationError> {
        let paths = self.path_items().put_paths(api_id, document).await?;
        self.fill_missing_integrations(api_id).await?;
        let deployment = self.deploy(api_id).await?;
        Ok((paths, deployment))
    }

    /// Replay a full API document into a new API
    pub async fn import_full_api(
        &self,
        document: &FullApiDocument,
    ) -> Result<ImportResponse, ApplicationError> {
        match self.porter().import(document).await {
            Ok(outcome) => Ok(ImportResponse {
                kind: ImportKind::FullApi,
                api: outcome.api,
                deployment: outcome.deployment,
                journal: Some(outcome.journal),
                paths: Vec::new(),
            }),
            Err(failure) => Err(self.handle_import_failure(failure).await),
        }
    }

    async fn handle_import_failure(&self, failure: ImportFailure) -> ApplicationError {
        let mut rolled_back = false;
        if self.settings.import.rollback_on_failure {
            if let Some(api_id) = failure.journal.api_id.as_deref() {
                rolled_back = self.roll_back(api_id).await;
            }
        }
        ApplicationError::ImportFailed {
            failure: Box::new(failure),
            rolled_back,
        }
    }

    /// Delete a partially imported API; a failed delete is only logged
    async fn roll_back(&self, api_id: &str) -> bool {
        match self.directories.apis.delete_api(api_id).await {
            Ok(()) => {
                info!("Rolled back partially imported API {api_id}");
                true
            }
            Err(error) => {
                warn!("Could not roll back API {api_id}: {error}");
                false
            }
        }
    }

    pub async fn export_full_api(&self, api_id: &str) -> Result<FullApiDocument, ApplicationError> {
        Ok(self.porter().export(api_id).await?)
    }

    /// Deploy to the configured stage
    pub async fn deploy(&self, api_id: &str) -> Result<Deployment, ApplicationError> {
        let stage = &self.settings.gateway.stage_name;
        let deployment = self
            .directories
            .deployments
            .create_deployment(api_id, stage)
            .await?;
        info!("Deployed {api_id} to {stage} ({})", deployment.id);
        Ok(deployment)
    }

    fn porter(&self) -> FullApiPorter {
        FullApiPorter::new(
            self.directories.clone(),
            &self.settings.gateway,
            &self.settings.import,
        )
    }

    fn path_items(&self) -> PathItemSynchronizer {
        PathItemSynchronizer::new(&self.directories, self.settings.gateway.clone())
    }
}

fn text_at(document: &Value, pointer: &str) -> Option<String> {
    document
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{
        DirectoryError, IntegrationDirectory, IntegrationType, MethodDirectory, ParameterLocation,
    };
    use crate::infrastructure::memory::{InMemoryGateway, RecordedCall};
    use crate::infrastructure::openapi::FileDocumentLoader;
    use crate::sync::IntegrationTarget;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn service_with(gateway: Arc<InMemoryGateway>, settings: Settings) -> GatewayService {
        GatewayService::new(
            Directories::from_gateway(gateway),
            Arc::new(FileDocumentLoader::new()),
            settings,
        )
    }

    fn service(gateway: Arc<InMemoryGateway>) -> GatewayService {
        service_with(gateway, Settings::default())
    }

    fn deployments(gateway: &InMemoryGateway) -> usize {
        gateway
            .calls()
            .iter()
            .filter(|c| matches!(c, RecordedCall::CreateDeployment { .. }))
            .count()
    }

    #[tokio::test]
    async fn test_create_and_list_endpoints() {
        let gateway = Arc::new(InMemoryGateway::new());
        let service = service(gateway.clone());
        let api = service.create_api("shop", None).await.unwrap();

        let endpoint = service
            .create_endpoint(CreateEndpointRequest {
                api_id: api.id.clone(),
                path: "/items/{id}".to_string(),
                method: HttpVerb::Get,
            })
            .await
            .unwrap();
        service
            .create_endpoint(CreateEndpointRequest {
                api_id: api.id.clone(),
                path: "/items/{id}".to_string(),
                method: HttpVerb::Delete,
            })
            .await
            .unwrap();

        let endpoints = service.list_endpoints(&api.id).await.unwrap();
        assert_eq!(endpoints.len(), 2);
        assert!(endpoints.contains(&endpoint));
        assert_eq!(gateway.snapshot_resources(&api.id).len(), 3);
    }

    #[tokio::test]
    async fn test_create_endpoint_rejects_bad_paths() {
        let service = service(Arc::new(InMemoryGateway::new()));
        let result = service
            .create_endpoint(CreateEndpointRequest {
                api_id: "x".to_string(),
                path: "items".to_string(),
                method: HttpVerb::Get,
            })
            .await;
        assert!(matches!(
            result,
            Err(ApplicationError::ValidationError(ValidationError::InvalidPath(_)))
        ));
    }

    #[tokio::test]
    async fn test_delete_endpoint_redeploys() {
        let gateway = Arc::new(InMemoryGateway::new());
        let service = service(gateway.clone());
        let api = service.create_api("shop", None).await.unwrap();
        let endpoint = service
            .create_endpoint(CreateEndpointRequest {
                api_id: api.id.clone(),
                path: "/a".to_string(),
                method: HttpVerb::Post,
            })
            .await
            .unwrap();

        service
            .delete_endpoint(&api.id, &endpoint.resource_id, HttpVerb::Post)
            .await
            .unwrap();

        assert!(service.list_endpoints(&api.id).await.unwrap().is_empty());
        assert_eq!(deployments(&gateway), 1);
    }

    #[tokio::test]
    async fn test_update_integration_and_parameters() {
        let gateway = Arc::new(InMemoryGateway::new());
        let service = service(gateway.clone());
        let api = service.create_api("files", None).await.unwrap();
        let endpoint = service
            .create_endpoint(CreateEndpointRequest {
                api_id: api.id.clone(),
                path: "/files/{proxy+}".to_string(),
                method: HttpVerb::Get,
            })
            .await
            .unwrap();

        let applied = service
            .update_integration(UpdateIntegrationRequest {
                api_id: api.id.clone(),
                resource_id: endpoint.resource_id.clone(),
                method: HttpVerb::Get,
                target: IntegrationTarget::Http {
                    base_uri: "files.internal:8080/".to_string(),
                    path_template: "/files".to_string(),
                    integration_type: None,
                },
                proxy_enabled: true,
            })
            .await
            .unwrap();
        assert_eq!(applied.integration_type, IntegrationType::HttpProxy);
        assert_eq!(
            applied.uri.as_deref(),
            Some("http://files.internal:8080/files/{proxy}")
        );

        let diff = service
            .update_parameters(
                &api.id,
                &endpoint.resource_id,
                HttpVerb::Get,
                &[
                    RequestParameter::proxy(),
                    RequestParameter::new(ParameterLocation::Header, "x-tenant", true),
                ],
            )
            .await
            .unwrap();
        assert_eq!(diff.to_add.len(), 1);
        assert!(diff.to_remove.is_empty());
    }

    #[tokio::test]
    async fn test_ensure_integrations_backfills_once() {
        let gateway = Arc::new(InMemoryGateway::new());
        let service = service(gateway.clone());
        let api = service.create_api("svc", None).await.unwrap();
        for path in ["/a", "/b"] {
            service
                .create_endpoint(CreateEndpointRequest {
                    api_id: api.id.clone(),
                    path: path.to_string(),
                    method: HttpVerb::Get,
                })
                .await
                .unwrap();
        }

        assert_eq!(service.ensure_integrations(&api.id).await.unwrap(), 2);
        assert_eq!(service.ensure_integrations(&api.id).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_import_openapi_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("petstore.yaml");
        fs::write(
            &path,
            r#"
openapi: 3.0.0
info:
  title: Petstore
paths:
  /pets:
    get:
      parameters:
        - $ref: '#/components/parameters/limit'
      responses:
        '200':
          description: ok
components:
  parameters:
    limit:
      name: limit
      in: query
"#,
        )
        .unwrap();

        let gateway = Arc::new(InMemoryGateway::new());
        let service = service(gateway.clone());
        let response = service
            .import_file(ImportRequest {
                path,
                api_name: None,
            })
            .await
            .unwrap();

        assert_eq!(response.kind, ImportKind::OpenApi);
        assert_eq!(response.api.name, "Petstore");
        assert!(response.deployment.is_some());
        let pets = &response.paths[0];
        let method = gateway
            .get_method(&response.api.id, &pets.resource_id, HttpVerb::Get)
            .await
            .unwrap();
        assert!(
            method
                .request_parameters
                .contains_key("method.request.querystring.limit")
        );
        // backfilled because the document names no integration
        let integration = gateway
            .get_integration(&response.api.id, &pets.resource_id, HttpVerb::Get)
            .await
            .unwrap();
        assert_eq!(integration.integration_type, IntegrationType::Mock);
    }

    #[tokio::test]
    async fn test_failed_full_import_rolls_back_when_enabled() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.fail_when(
            |call| matches!(call, RecordedCall::PutMethod { .. }),
            DirectoryError::failure("throttled"),
        );
        let mut settings = Settings::default();
        settings.import.rollback_on_failure = true;
        let service = service_with(gateway.clone(), settings);

        let document = FullApiDocument::from_value(json!({
            "api": {"id": "old", "name": "x"},
            "resources": [{"resource": {"id": "r", "path": "/a"},
                           "methods": [{"method": {"httpMethod": "GET"}}]}]
        }))
        .unwrap();
        let error = service.import_full_api(&document).await.unwrap_err();

        match error {
            ApplicationError::ImportFailed {
                failure,
                rolled_back,
            } => {
                assert!(rolled_back);
                assert_eq!(failure.journal.created_resources().len(), 1);
            }
            other => panic!("unexpected error {other}"),
        }
        assert!(gateway.api_ids().is_empty());
    }

    #[tokio::test]
    async fn test_failed_full_import_is_kept_by_default() {
        let gateway = Arc::new(InMemoryGateway::new());
        gateway.fail_when(
            |call| matches!(call, RecordedCall::CreateDeployment { .. }),
            DirectoryError::failure("stage locked"),
        );
        let service = service(gateway.clone());
        let document = FullApiDocument::from_value(json!({
            "api": {"id": "old", "name": "x"},
            "resources": []
        }))
        .unwrap();

        let error = service.import_full_api(&document).await.unwrap_err();
        assert!(error.to_string().contains("stage locked"));
        assert!(!error.to_string().contains("partial API deleted"));
        assert_eq!(gateway.api_ids().len(), 1);
    }
}
