//! Integration backends: choosing, building and applying them

use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info};
use url::Url;

use crate::core::config::GatewaySettings;
use crate::gateway::{
    CONNECTION_INTERNET, HttpVerb, IntegrationConfig, IntegrationDirectory, IntegrationResponse,
    IntegrationType, JSON_CONTENT_TYPE, MethodResponse, OptionalExt, PASSTHROUGH_WHEN_NO_MATCH,
    PROXY_INTEGRATION_KEY, PROXY_PARAMETER_KEY, RequestParameter,
};
use crate::sync::{MethodReconciler, SyncError};

/// Request template that makes a MOCK integration answer 200
pub const MOCK_REQUEST_TEMPLATE: &str = r#"{ "statusCode": 200 }"#;
const GREEDY_PROXY_SEGMENT: &str = "{proxy}";
const LAMBDA_INVOKE_PATH: &str = "lambda:path/2015-03-31/functions";

/// What the user wants a method to be wired to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IntegrationTarget {
    Mock,
    /// A function name or full function ARN, proxied as `AWS_PROXY`
    Function(String),
    /// An HTTP backend; the URI is `base_uri` followed by `path_template`
    Http {
        base_uri: String,
        path_template: String,
        integration_type: Option<IntegrationType>,
    },
}

/// Integration settings computed from a target, ready to apply
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DesiredIntegration {
    pub integration_type: IntegrationType,
    pub uri: Option<String>,
    pub proxy_enabled: bool,
}

/// Chooses and applies integration backends for methods
pub struct IntegrationManager {
    integrations: Arc<dyn IntegrationDirectory>,
    methods: MethodReconciler,
    settings: GatewaySettings,
}

impl IntegrationManager {
    pub fn new(
        integrations: Arc<dyn IntegrationDirectory>,
        methods: MethodReconciler,
        settings: GatewaySettings,
    ) -> Self {
        Self {
            integrations,
            methods,
            settings,
        }
    }

    /// Turn a target into concrete integration settings
    pub fn plan(
        &self,
        target: &IntegrationTarget,
        proxy_enabled: bool,
    ) -> Result<DesiredIntegration, SyncError> {
        let (integration_type, uri) = match target {
            IntegrationTarget::Mock => (IntegrationType::Mock, None),
            IntegrationTarget::Function(function) => {
                (IntegrationType::AwsProxy, Some(self.function_uri(function)?))
            }
            IntegrationTarget::Http {
                base_uri,
                path_template,
                integration_type,
            } => (
                integration_type.unwrap_or(self.settings.default_integration_type),
                Some(http_uri(base_uri, path_template)?),
            ),
        };
        check_proxy(integration_type, proxy_enabled)?;

        Ok(DesiredIntegration {
            integration_type,
            uri,
            proxy_enabled,
        })
    }

    /// Invocation URI for a function name or ARN
    pub fn function_uri(&self, function: &str) -> Result<String, SyncError> {
        let function = function.trim();
        if function.is_empty() {
            return Err(SyncError::InvalidTarget(
                "function identifier is empty".to_string(),
            ));
        }

        let region = &self.settings.region;
        let arn = if function.starts_with("arn:") {
            function.to_string()
        } else {
            format!(
                "arn:aws:lambda:{region}:{}:function:{function}",
                self.settings.account_id
            )
        };
        Ok(format!(
            "arn:aws:apigateway:{region}:{LAMBDA_INVOKE_PATH}/{arn}/invocations"
        ))
    }

    /// The wire configuration `apply_integration` would send
    pub fn build_config(&self, verb: HttpVerb, desired: &DesiredIntegration) -> IntegrationConfig {
        let mut config = IntegrationConfig::new(desired.integration_type);
        config.integration_http_method = Some(verb.to_string());
        config.connection_type = Some(CONNECTION_INTERNET.to_string());
        config.passthrough_behavior = Some(PASSTHROUGH_WHEN_NO_MATCH.to_string());

        if desired.integration_type == IntegrationType::Mock {
            config.request_templates = mock_request_templates();
            return config;
        }

        config.uri = desired.uri.as_ref().map(|uri| {
            if desired.proxy_enabled && desired.integration_type.is_http() {
                with_proxy_segment(uri)
            } else {
                uri.clone()
            }
        });
        if desired.proxy_enabled {
            config.request_parameters = BTreeMap::from([(
                PROXY_INTEGRATION_KEY.to_string(),
                PROXY_PARAMETER_KEY.to_string(),
            )]);
        }
        config
    }

    /// Apply `desired` to a method, toggling the greedy proxy parameter first.
    ///
    /// Enabling declares `path.proxy` unless it already is; disabling removes
    /// it and treats an absent parameter as already removed.
    pub async fn apply_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        desired: &DesiredIntegration,
    ) -> Result<IntegrationConfig, SyncError> {
        check_proxy(desired.integration_type, desired.proxy_enabled)?;
        if desired.proxy_enabled {
            self.methods
                .ensure_parameter(api_id, resource_id, verb, &RequestParameter::proxy())
                .await?;
        } else {
            self.methods
                .remove_parameter(api_id, resource_id, verb, PROXY_PARAMETER_KEY)
                .await?;
        }

        let config = self.build_config(verb, desired);
        let applied = self
            .integrations
            .put_integration(api_id, resource_id, verb, &config)
            .await?;
        info!(
            "Integration of {verb} {resource_id} set to {} {}",
            applied.integration_type,
            applied.uri.as_deref().unwrap_or("-")
        );
        Ok(applied)
    }

    /// Plan and apply in one go
    pub async fn update_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        target: &IntegrationTarget,
        proxy_enabled: bool,
    ) -> Result<IntegrationConfig, SyncError> {
        let desired = self.plan(target, proxy_enabled)?;
        self.apply_integration(api_id, resource_id, verb, &desired)
            .await
    }

    /// Put an integration exactly as given, without proxy handling
    pub async fn put_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        config: &IntegrationConfig,
    ) -> Result<IntegrationConfig, SyncError> {
        Ok(self
            .integrations
            .put_integration(api_id, resource_id, verb, config)
            .await?)
    }

    /// Current integration, `None` when the method has none
    pub async fn current_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> Result<Option<IntegrationConfig>, SyncError> {
        Ok(self
            .integrations
            .get_integration(api_id, resource_id, verb)
            .await
            .optional()?)
    }

    pub async fn put_responses(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
        method_response: &MethodResponse,
        integration_response: Option<&IntegrationResponse>,
    ) -> Result<(), SyncError> {
        self.integrations
            .put_method_response(api_id, resource_id, verb, method_response)
            .await?;
        if let Some(response) = integration_response {
            self.integrations
                .put_integration_response(api_id, resource_id, verb, response)
                .await?;
        }
        Ok(())
    }

    /// Give the method a MOCK integration answering 200 `{"message": "OK"}`
    /// unless its current integration already has request templates.
    ///
    /// Returns whether anything was written.
    pub async fn ensure_mock_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> Result<bool, SyncError> {
        let current = self.current_integration(api_id, resource_id, verb).await?;
        if current.is_some_and(|i| i.has_request_templates()) {
            return Ok(false);
        }
        self.put_mock_integration(api_id, resource_id, verb).await?;
        Ok(true)
    }

    /// Like [`Self::ensure_mock_integration`], but any existing integration
    /// is kept whether or not it has request templates.
    ///
    /// Returns whether anything was written.
    pub async fn backfill_mock_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> Result<bool, SyncError> {
        if self
            .current_integration(api_id, resource_id, verb)
            .await?
            .is_some()
        {
            return Ok(false);
        }
        self.put_mock_integration(api_id, resource_id, verb).await?;
        Ok(true)
    }

    async fn put_mock_integration(
        &self,
        api_id: &str,
        resource_id: &str,
        verb: HttpVerb,
    ) -> Result<(), SyncError> {
        debug!("Backfilling MOCK integration for {verb} {resource_id}");
        let mut config = IntegrationConfig::new(IntegrationType::Mock);
        config.request_templates = mock_request_templates();
        self.put_integration(api_id, resource_id, verb, &config)
            .await?;
        self.put_responses(
            api_id,
            resource_id,
            verb,
            &MethodResponse::ok_empty(),
            Some(&IntegrationResponse::ok_message()),
        )
        .await
    }
}

/// A MOCK integration has no request path to forward the greedy parameter to
fn check_proxy(integration_type: IntegrationType, proxy_enabled: bool) -> Result<(), SyncError> {
    if proxy_enabled && integration_type == IntegrationType::Mock {
        return Err(SyncError::InvalidTarget(
            "a MOCK integration cannot forward the proxy path".to_string(),
        ));
    }
    Ok(())
}

fn mock_request_templates() -> BTreeMap<String, String> {
    BTreeMap::from([(
        JSON_CONTENT_TYPE.to_string(),
        MOCK_REQUEST_TEMPLATE.to_string(),
    )])
}

/// Join an HTTP base and a path template.
///
/// Trailing `:` and `/` are stripped from the base so the join never yields a
/// double slash, and a base without scheme gets `http://`.
pub fn http_uri(base_uri: &str, path_template: &str) -> Result<String, SyncError> {
    let trimmed = base_uri.trim().trim_end_matches(&['/', ':'][..]);
    let base = if trimmed.contains("://") {
        trimmed.to_string()
    } else {
        format!("http://{trimmed}")
    };
    Url::parse(&base).map_err(|e| SyncError::InvalidTarget(format!("{base}: {e}")))?;

    let path = path_template.trim();
    Ok(if path.is_empty() || path.starts_with('/') {
        format!("{base}{path}")
    } else {
        format!("{base}/{path}")
    })
}

/// Ensure an HTTP URI ends in the greedy `{proxy}` segment
fn with_proxy_segment(uri: &str) -> String {
    if uri.contains(GREEDY_PROXY_SEGMENT) {
        uri.to_string()
    } else {
        format!("{}/{GREEDY_PROXY_SEGMENT}", uri.trim_end_matches('/'))
    }
}
