//! Applying OpenAPI path items to a gateway
//!
//! A path item is mapped onto one resource: each operation becomes a method,
//! its `parameters` become declared request parameters, an
//! `x-amazon-apigateway-integration` extension becomes the integration and
//! the operation's responses become method and integration responses.

use serde::Serialize;
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};

use crate::core::config::GatewaySettings;
use crate::gateway::{
    CONNECTION_INTERNET, Directories, EMPTY_MODEL, HttpVerb, IntegrationConfig,
    IntegrationResponse, IntegrationType, MethodResponse, PASSTHROUGH_WHEN_NO_MATCH,
    ParameterLocation, RequestParameter,
};
use crate::sync::{IntegrationManager, MethodReconciler, ResourceTreeSynchronizer, SyncError};

/// Vendor extension carrying the integration of an operation
pub const INTEGRATION_EXTENSION: &str = "x-amazon-apigateway-integration";

/// What was applied for one path item
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PathItemReport {
    pub path: String,
    pub resource_id: String,
    pub methods: Vec<HttpVerb>,
    /// Methods that received an integration from the extension
    pub integrated: Vec<HttpVerb>,
}

/// Applies path items to an API one operation at a time
pub struct PathItemSynchronizer {
    tree: ResourceTreeSynchronizer,
    methods: MethodReconciler,
    integrations: IntegrationManager,
    settings: GatewaySettings,
}

impl PathItemSynchronizer {
    pub fn new(directories: &Directories, settings: GatewaySettings) -> Self {
        let methods = MethodReconciler::new(Arc::clone(&directories.methods));
        Self {
            tree: ResourceTreeSynchronizer::new(Arc::clone(&directories.resources)),
            integrations: IntegrationManager::new(
                Arc::clone(&directories.integrations),
                methods.clone(),
                settings.clone(),
            ),
            methods,
            settings,
        }
    }

    /// Apply every entry of the document's `paths` object, in document order
    pub async fn put_paths(
        &self,
        api_id: &str,
        document: &Value,
    ) -> Result<Vec<PathItemReport>, SyncError> {
        let Some(paths) = document.get("paths") else {
            return Ok(Vec::new());
        };
        let paths = paths
            .as_object()
            .ok_or_else(|| SyncError::InvalidDocument("'paths' is not an object".to_string()))?;

        let mut reports = Vec::with_capacity(paths.len());
        for (path, item) in paths {
            reports.push(self.put_path_item(api_id, path, item).await?);
        }
        Ok(reports)
    }

    /// Apply one path item to the resource at `path`
    pub async fn put_path_item(
        &self,
        api_id: &str,
        path: &str,
        path_item: &Value,
    ) -> Result<PathItemReport, SyncError> {
        let item = path_item.as_object().ok_or_else(|| {
            SyncError::InvalidDocument(format!("path item {path} is not an object"))
        })?;

        let resource_id = self.tree.ensure_resource(api_id, path).await?;
        let shared = parse_parameters(item.get("parameters"));
        let mut report = PathItemReport {
            path: path.to_string(),
            resource_id: resource_id.clone(),
            methods: Vec::new(),
            integrated: Vec::new(),
        };

        for (key, operation) in item {
            let Ok(verb) = key.parse::<HttpVerb>() else {
                continue;
            };
            let Some(operation) = operation.as_object() else {
                debug!("Skipping {key} {path}: operation is not an object");
                continue;
            };

            let integrated = self
                .put_operation(api_id, &resource_id, verb, operation, &shared)
                .await?;
            report.methods.push(verb);
            if integrated {
                report.integrated.push(verb);
            }
        }

        info!(
            "Applied {} method(s) to {path} ({resource_id})",
            report.methods.len()
        );
        Ok(report)
    }

    async fn put_operation(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        operation: &Map<String, Value>,
        shared: &[RequestParameter],
    ) -> Result<bool, SyncError> {
        self.methods.ensure_method(api_id, resource_id, verb).await?;

        let parameters = merge_parameters(shared, &parse_parameters(operation.get("parameters")));
        self.methods
            .sync_parameters(api_id, resource_id, verb, &parameters)
            .await?;

        let integration = match operation.get(INTEGRATION_EXTENSION) {
            Some(extension) => self.integration_from_extension(verb, extension)?,
            None => None,
        };
        let integrated = integration.is_some();
        if let Some(config) = integration {
            self.integrations
                .put_integration(api_id, resource_id, verb, &config)
                .await?;
        }

        let Some(responses) = operation.get("responses").and_then(Value::as_object) else {
            return Ok(integrated);
        };
        for (status, response) in responses {
            if status.parse::<u16>().is_err() {
                debug!("Skipping non-numeric response '{status}' of {verb} {resource_id}");
                continue;
            }
            let (method_response, integration_response) = responses_for(status, response);
            self.integrations
                .put_responses(
                    api_id,
                    resource_id,
                    verb,
                    &method_response,
                    integration_response.as_ref().filter(|_| integrated),
                )
                .await?;
        }
        Ok(integrated)
    }

    /// Integration settings from the vendor extension.
    ///
    /// `None` unless the extension names a type, a URI and an HTTP method;
    /// a MOCK integration needs the type only.
    fn integration_from_extension(
        &self,
        verb: HttpVerb,
        extension: &Value,
    ) -> Result<Option<IntegrationConfig>, SyncError> {
        let text = |key: &str| extension.get(key).and_then(Value::as_str);

        let Some(kind) = text("type") else {
            return Ok(None);
        };
        let integration_type: IntegrationType = kind.parse().map_err(SyncError::InvalidDocument)?;
        let uri = text("uri");
        let http_method = text("httpMethod");
        if integration_type != IntegrationType::Mock && (uri.is_none() || http_method.is_none()) {
            debug!("Ignoring incomplete {INTEGRATION_EXTENSION} on {verb}");
            return Ok(None);
        }

        let mut config = IntegrationConfig::new(integration_type);
        config.uri = uri.map(str::to_string);
        config.integration_http_method = Some(http_method.unwrap_or(verb.as_str()).to_uppercase());
        config.connection_type = Some(CONNECTION_INTERNET.to_string());
        config.passthrough_behavior = Some(
            text("passthroughBehavior")
                .unwrap_or(PASSTHROUGH_WHEN_NO_MATCH)
                .to_string(),
        );
        config.request_parameters = string_map(extension.get("requestParameters"));
        config.request_templates = string_map(extension.get("requestTemplates"));
        config.timeout_in_millis = extension
            .get("timeoutInMillis")
            .and_then(Value::as_u64)
            .or(Some(self.settings.default_timeout_millis));
        Ok(Some(config))
    }
}

/// Declared parameters of a path item or operation.
///
/// Entries in unsupported locations (such as `cookie`) or without a name are
/// skipped.
pub fn parse_parameters(parameters: Option<&Value>) -> Vec<RequestParameter> {
    let Some(entries) = parameters.and_then(Value::as_array) else {
        return Vec::new();
    };

    entries
        .iter()
        .filter_map(|entry| {
            let name = entry.get("name")?.as_str()?;
            let location = entry.get("in")?.as_str()?;
            let Ok(location) = location.parse::<ParameterLocation>() else {
                debug!("Skipping parameter {name} in unsupported location {location}");
                return None;
            };
            let required = entry
                .get("required")
                .and_then(Value::as_bool)
                .unwrap_or(false);
            Some(RequestParameter::new(location, name, required))
        })
        .collect()
}

/// Operation-level parameters override path-level ones with the same key
fn merge_parameters(
    shared: &[RequestParameter],
    own: &[RequestParameter],
) -> Vec<RequestParameter> {
    let mut merged: BTreeMap<String, RequestParameter> = BTreeMap::new();
    for param in shared.iter().chain(own) {
        merged.insert(param.key(), param.clone());
    }
    merged.into_values().collect()
}

/// Method response with `Empty` models per content type, and the integration
/// response that templates each content type with the serialized schema
fn responses_for(status: &str, response: &Value) -> (MethodResponse, Option<IntegrationResponse>) {
    let content = response.get("content").and_then(Value::as_object);

    let response_models = content
        .map(|content| {
            content
                .keys()
                .map(|ct| (ct.clone(), EMPTY_MODEL.to_string()))
                .collect()
        })
        .unwrap_or_default();
    let method_response = MethodResponse {
        status_code: status.to_string(),
        response_models,
    };

    let integration_response = content.map(|content| IntegrationResponse {
        status_code: status.to_string(),
        selection_pattern: None,
        response_templates: content
            .iter()
            .map(|(ct, media)| {
                let schema = media.get("schema").cloned().unwrap_or(Value::Null);
                (ct.clone(), schema.to_string())
            })
            .collect(),
    });
    (method_response, integration_response)
}

fn string_map(value: Option<&Value>) -> BTreeMap<String, String> {
    value
        .and_then(Value::as_object)
        .map(|map| {
            map.iter()
                .filter_map(|(k, v)| v.as_str().map(|s| (k.clone(), s.to_string())))
                .collect()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gateway::{ApiDirectory, IntegrationDirectory, MethodDirectory};
    use crate::infrastructure::memory::{InMemoryGateway, RecordedCall};
    use serde_json::json;

    async fn setup() -> (Arc<InMemoryGateway>, String, PathItemSynchronizer) {
        let gateway = Arc::new(InMemoryGateway::new());
        let api = gateway.create_api("pets", None).await.unwrap();
        let sync = PathItemSynchronizer::new(
            &Directories::from_gateway(gateway.clone()),
            GatewaySettings::default(),
        );
        (gateway, api.id, sync)
    }

    fn resource_id(gateway: &InMemoryGateway, api_id: &str, path: &str) -> String {
        gateway
            .snapshot_resources(api_id)
            .into_iter()
            .find(|r| r.path == path)
            .map(|r| r.id)
            .unwrap()
    }

    #[test]
    fn test_parse_parameters_skips_cookies() {
        let params = parse_parameters(Some(&json!([
            {"name": "id", "in": "path", "required": true},
            {"name": "session", "in": "cookie"},
            {"in": "query"},
            {"name": "page", "in": "query"}
        ])));
        assert_eq!(
            params,
            vec![
                RequestParameter::new(ParameterLocation::Path, "id", true),
                RequestParameter::new(ParameterLocation::Query, "page", false),
            ]
        );
    }

    #[test]
    fn test_operation_parameters_override_shared_ones() {
        let shared = vec![RequestParameter::new(ParameterLocation::Header, "x", false)];
        let own = vec![RequestParameter::new(ParameterLocation::Header, "x", true)];
        assert_eq!(merge_parameters(&shared, &own), own);
    }

    #[tokio::test]
    async fn test_put_path_item_declares_methods_and_parameters() {
        let (gateway, api_id, sync) = setup().await;
        let item = json!({
            "summary": "one pet",
            "parameters": [{"name": "petId", "in": "path", "required": true}],
            "get": {
                "parameters": [{"name": "verbose", "in": "query"}],
                "responses": {"200": {"description": "ok"}}
            },
            "delete": {}
        });

        let report = sync.put_path_item(&api_id, "/pets/{petId}", &item).await.unwrap();

        assert_eq!(report.methods, vec![HttpVerb::Get, HttpVerb::Delete]);
        assert!(report.integrated.is_empty());
        let get = gateway
            .get_method(&api_id, &report.resource_id, HttpVerb::Get)
            .await
            .unwrap();
        assert_eq!(
            get.request_parameters,
            BTreeMap::from([
                ("method.request.path.petId".to_string(), true),
                ("method.request.querystring.verbose".to_string(), false),
            ])
        );
        assert!(get.method_responses.contains_key("200"));
    }

    #[tokio::test]
    async fn test_integration_extension_is_applied_with_responses() {
        let (gateway, api_id, sync) = setup().await;
        let document = json!({
            "paths": {
                "/orders": {
                    "post": {
                        "x-amazon-apigateway-integration": {
                            "type": "http",
                            "uri": "http://orders.internal/orders",
                            "httpMethod": "post"
                        },
                        "responses": {
                            "201": {
                                "content": {
                                    "application/json": {"schema": {"type": "object"}}
                                }
                            },
                            "default": {"description": "error"}
                        }
                    }
                }
            }
        });

        let reports = sync.put_paths(&api_id, &document).await.unwrap();
        assert_eq!(reports[0].integrated, vec![HttpVerb::Post]);

        let orders = resource_id(&gateway, &api_id, "/orders");
        let integration = gateway
            .get_integration(&api_id, &orders, HttpVerb::Post)
            .await
            .unwrap();
        assert_eq!(integration.integration_type, IntegrationType::Http);
        assert_eq!(integration.integration_http_method.as_deref(), Some("POST"));
        assert_eq!(
            integration.integration_responses["201"].response_templates["application/json"],
            r#"{"type":"object"}"#
        );

        let method = gateway
            .get_method(&api_id, &orders, HttpVerb::Post)
            .await
            .unwrap();
        assert_eq!(
            method.method_responses["201"].response_models["application/json"],
            EMPTY_MODEL
        );
        assert!(!method.method_responses.contains_key("default"));
    }

    #[tokio::test]
    async fn test_incomplete_extension_skips_integration_responses() {
        let (gateway, api_id, sync) = setup().await;
        let item = json!({
            "get": {
                "x-amazon-apigateway-integration": {"type": "HTTP_PROXY"},
                "responses": {
                    "200": {"content": {"application/json": {"schema": {}}}}
                }
            }
        });

        let report = sync.put_path_item(&api_id, "/a", &item).await.unwrap();

        assert!(report.integrated.is_empty());
        let puts = gateway
            .calls()
            .into_iter()
            .filter(|c| {
                matches!(
                    c,
                    RecordedCall::PutIntegration { .. }
                        | RecordedCall::PutIntegrationResponse { .. }
                )
            })
            .count();
        assert_eq!(puts, 0);
    }

    #[tokio::test]
    async fn test_reapplying_removes_dropped_parameters() {
        let (gateway, api_id, sync) = setup().await;
        sync.put_path_item(
            &api_id,
            "/search",
            &json!({"get": {"parameters": [
                {"name": "q", "in": "query"},
                {"name": "old", "in": "query"}
            ]}}),
        )
        .await
        .unwrap();
        sync.put_path_item(
            &api_id,
            "/search",
            &json!({"get": {"parameters": [{"name": "q", "in": "query"}]}}),
        )
        .await
        .unwrap();

        let search = resource_id(&gateway, &api_id, "/search");
        let method = gateway
            .get_method(&api_id, &search, HttpVerb::Get)
            .await
            .unwrap();
        assert_eq!(
            method.request_parameters.keys().collect::<Vec<_>>(),
            vec!["method.request.querystring.q"]
        );
    }

    #[tokio::test]
    async fn test_non_object_path_item_is_invalid() {
        let (_, api_id, sync) = setup().await;
        let result = sync.put_path_item(&api_id, "/a", &json!([])).await;
        assert!(matches!(result, Err(SyncError::InvalidDocument(_))));
    }
}
