//! Turning a full API document into an ordered list of import steps

use serde::Serialize;
use std::collections::BTreeSet;
use std::fmt;

use crate::core::config::ResponseNormalization;
use crate::gateway::{
    AUTHORIZATION_NONE, Authorizer, HttpVerb, IntegrationConfig, IntegrationResponse,
    MethodConfig, MethodResponse, Model, PASSTHROUGH_WHEN_NO_MATCH, RequestValidator,
    path_segments,
};
use crate::sync::porter::document::{ExportedMethod, FullApiDocument};

const DEFAULT_INTEGRATION_METHOD: &str = "POST";
const EMPTY_SCHEMA: &str = "{}";

/// Knobs that shape a plan
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlanOptions {
    pub responses: ResponseNormalization,
    pub stage_name: String,
    pub default_timeout_millis: u64,
}

/// One remote write of an import.
///
/// Ids inside steps (validators, authorizers) are the source document's ids;
/// they are remapped when the step runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum ImportStep {
    CreateApi {
        name: String,
        description: Option<String>,
    },
    UpdatePolicy {
        policy: String,
    },
    CreateModel {
        model: Model,
    },
    CreateValidator {
        validator: RequestValidator,
    },
    CreateAuthorizer {
        authorizer: Authorizer,
    },
    CreateResource {
        parent_path: String,
        path_part: String,
    },
    PutMethod {
        path: String,
        method: MethodConfig,
    },
    PutIntegration {
        path: String,
        verb: HttpVerb,
        integration: IntegrationConfig,
    },
    PutMethodResponse {
        path: String,
        verb: HttpVerb,
        response: MethodResponse,
    },
    PutIntegrationResponse {
        path: String,
        verb: HttpVerb,
        response: IntegrationResponse,
    },
    CreateDeployment {
        stage_name: String,
    },
}

impl fmt::Display for ImportStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ImportStep::CreateApi { name, .. } => write!(f, "create API '{name}'"),
            ImportStep::UpdatePolicy { .. } => f.write_str("update policy"),
            ImportStep::CreateModel { model } => write!(f, "create model '{}'", model.name),
            ImportStep::CreateValidator { validator } => {
                write!(f, "create validator '{}'", validator.name)
            }
            ImportStep::CreateAuthorizer { authorizer } => {
                write!(f, "create authorizer '{}'", authorizer.name)
            }
            ImportStep::CreateResource {
                parent_path,
                path_part,
            } => write!(f, "create resource {}", join_path(parent_path, path_part)),
            ImportStep::PutMethod { path, method } => {
                write!(f, "put method {} {path}", method.http_method)
            }
            ImportStep::PutIntegration { path, verb, .. } => {
                write!(f, "put integration {verb} {path}")
            }
            ImportStep::PutMethodResponse {
                path,
                verb,
                response,
            } => write!(f, "put method response {} {verb} {path}", response.status_code),
            ImportStep::PutIntegrationResponse {
                path,
                verb,
                response,
            } => write!(
                f,
                "put integration response {} {verb} {path}",
                response.status_code
            ),
            ImportStep::CreateDeployment { stage_name } => write!(f, "deploy to {stage_name}"),
        }
    }
}

/// Ordered steps replaying a full API document into a new API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ImportPlan {
    steps: Vec<ImportStep>,
}

impl ImportPlan {
    /// Lay out the steps for `document`.
    ///
    /// Resources are taken in document order, so a parent has to appear
    /// before its children. Segments shared between resources are created
    /// once.
    pub fn build(document: &FullApiDocument, options: &PlanOptions) -> Self {
        let mut steps = vec![ImportStep::CreateApi {
            name: document.api.name.clone(),
            description: document.api.description.clone(),
        }];

        if let Some(policy) = document.policy.as_ref().filter(|p| !p.is_empty()) {
            steps.push(ImportStep::UpdatePolicy {
                policy: policy.clone(),
            });
        }
        steps.extend(document.models.iter().map(|model| ImportStep::CreateModel {
            model: Model {
                schema: model.schema.clone().or_else(|| Some(EMPTY_SCHEMA.to_string())),
                ..model.clone()
            },
        }));
        steps.extend(
            document
                .validators
                .iter()
                .map(|validator| ImportStep::CreateValidator {
                    validator: validator.clone(),
                }),
        );
        steps.extend(
            document
                .authorizers
                .iter()
                .map(|authorizer| ImportStep::CreateAuthorizer {
                    authorizer: authorizer.clone(),
                }),
        );

        let mut planned: BTreeSet<String> = BTreeSet::from(["/".to_string()]);
        for exported in &document.resources {
            let mut parent_path = "/".to_string();
            for segment in path_segments(&exported.resource.path) {
                let path = join_path(&parent_path, segment);
                if planned.insert(path.clone()) {
                    steps.push(ImportStep::CreateResource {
                        parent_path: parent_path.clone(),
                        path_part: segment.to_string(),
                    });
                }
                parent_path = path;
            }

            for method in &exported.methods {
                steps.extend(method_steps(&parent_path, method, options));
            }
        }

        steps.push(ImportStep::CreateDeployment {
            stage_name: options.stage_name.clone(),
        });
        Self { steps }
    }

    /// Steps in execution order; the first one always creates the API
    pub fn steps(&self) -> &[ImportStep] {
        &self.steps
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

fn method_steps(path: &str, exported: &ExportedMethod, options: &PlanOptions) -> Vec<ImportStep> {
    let source = &exported.method;
    let verb = source.http_method;
    let mut steps = vec![ImportStep::PutMethod {
        path: path.to_string(),
        method: MethodConfig {
            method_responses: Default::default(),
            ..source.clone()
        },
    }];

    let integration = exported.integration.as_ref().map(|source| IntegrationConfig {
        integration_http_method: source
            .integration_http_method
            .clone()
            .or_else(|| Some(DEFAULT_INTEGRATION_METHOD.to_string())),
        passthrough_behavior: source
            .passthrough_behavior
            .clone()
            .or_else(|| Some(PASSTHROUGH_WHEN_NO_MATCH.to_string())),
        timeout_in_millis: source
            .timeout_in_millis
            .or(Some(options.default_timeout_millis)),
        integration_responses: Default::default(),
        ..source.clone()
    });

    if let Some(integration) = integration {
        steps.push(ImportStep::PutIntegration {
            path: path.to_string(),
            verb,
            integration,
        });
    }

    let method_responses: Vec<MethodResponse> = match options.responses {
        ResponseNormalization::PreserveSource if !source.method_responses.is_empty() => {
            source.method_responses.values().cloned().collect()
        }
        _ => vec![MethodResponse::ok_empty()],
    };
    steps.extend(
        method_responses
            .into_iter()
            .map(|response| ImportStep::PutMethodResponse {
                path: path.to_string(),
                verb,
                response,
            }),
    );

    // integration responses need an integration to hang off
    if let Some(source_integration) = exported.integration.as_ref() {
        let integration_responses: Vec<IntegrationResponse> = match options.responses {
            ResponseNormalization::PreserveSource
                if !source_integration.integration_responses.is_empty() =>
            {
                source_integration
                    .integration_responses
                    .values()
                    .cloned()
                    .collect()
            }
            _ => vec![IntegrationResponse::ok_message()],
        };
        steps.extend(
            integration_responses
                .into_iter()
                .map(|response| ImportStep::PutIntegrationResponse {
                    path: path.to_string(),
                    verb,
                    response,
                }),
        );
    }

    steps
}

/// Whether a method's authorization type needs an authorizer id
pub(crate) fn requires_authorizer(authorization_type: &str) -> bool {
    authorization_type != AUTHORIZATION_NONE && authorization_type != "AWS_IAM"
}

pub(crate) fn join_path(parent: &str, segment: &str) -> String {
    if parent == "/" {
        format!("/{segment}")
    } else {
        format!("{parent}/{segment}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn options(responses: ResponseNormalization) -> PlanOptions {
        PlanOptions {
            responses,
            stage_name: "dev".to_string(),
            default_timeout_millis: 29_000,
        }
    }

    fn document() -> FullApiDocument {
        FullApiDocument::from_value(json!({
            "api": {"id": "old", "name": "shop"},
            "policy": "{\"Version\":\"2012-10-17\"}",
            "models": [{"name": "Item"}],
            "resources": [
                {"resource": {"id": "r0", "path": "/"}},
                {"resource": {"id": "r2", "path": "/a/{id}"},
                 "methods": [{
                    "method": {
                        "httpMethod": "GET",
                        "requestParameters": {"method.request.path.id": true},
                        "methodResponses": {"404": {"statusCode": "404"}}
                    },
                    "integration": {
                        "type": "HTTP",
                        "uri": "http://backend/a/{id}",
                        "integrationResponses": {"404": {"statusCode": "404"}}
                    }
                 }]},
                {"resource": {"id": "r1", "path": "/a"},
                 "methods": [{"method": {"httpMethod": "POST"}}]}
            ]
        }))
        .unwrap()
    }

    fn summaries(plan: &ImportPlan) -> Vec<String> {
        plan.steps.iter().map(ToString::to_string).collect()
    }

    #[test]
    fn test_plan_orders_steps() {
        let plan = ImportPlan::build(&document(), &options(ResponseNormalization::SynthesizeOk));

        assert_eq!(
            summaries(&plan),
            vec![
                "create API 'shop'",
                "update policy",
                "create model 'Item'",
                "create resource /a",
                "create resource /a/{id}",
                "put method GET /a/{id}",
                "put integration GET /a/{id}",
                "put method response 200 GET /a/{id}",
                "put integration response 200 GET /a/{id}",
                "put method POST /a",
                "put method response 200 POST /a",
                "deploy to dev",
            ]
        );
    }

    #[test]
    fn test_plan_fills_integration_defaults() {
        let plan = ImportPlan::build(&document(), &options(ResponseNormalization::SynthesizeOk));
        let integration = plan
            .steps
            .iter()
            .find_map(|step| match step {
                ImportStep::PutIntegration { integration, .. } => Some(integration),
                _ => None,
            })
            .unwrap();

        assert_eq!(integration.integration_http_method.as_deref(), Some("POST"));
        assert_eq!(
            integration.passthrough_behavior.as_deref(),
            Some(PASSTHROUGH_WHEN_NO_MATCH)
        );
        assert_eq!(integration.timeout_in_millis, Some(29_000));
        assert!(integration.integration_responses.is_empty());
    }

    #[test]
    fn test_plan_defaults_model_schema() {
        let plan = ImportPlan::build(&document(), &options(ResponseNormalization::SynthesizeOk));
        match &plan.steps[2] {
            ImportStep::CreateModel { model } => assert_eq!(model.schema.as_deref(), Some("{}")),
            other => panic!("unexpected step {other}"),
        }
    }

    #[test]
    fn test_preserve_source_replays_responses() {
        let plan = ImportPlan::build(&document(), &options(ResponseNormalization::PreserveSource));
        let steps = summaries(&plan);

        assert!(steps.contains(&"put method response 404 GET /a/{id}".to_string()));
        assert!(steps.contains(&"put integration response 404 GET /a/{id}".to_string()));
        assert!(!steps.contains(&"put method response 200 GET /a/{id}".to_string()));
        // no source responses: falls back to the synthesized one
        assert!(steps.contains(&"put method response 200 POST /a".to_string()));
    }

    #[test]
    fn test_requires_authorizer() {
        assert!(!requires_authorizer("NONE"));
        assert!(!requires_authorizer("AWS_IAM"));
        assert!(requires_authorizer("CUSTOM"));
        assert!(requires_authorizer("COGNITO_USER_POOLS"));
    }
}
