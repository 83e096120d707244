//! Data types of the remote API Gateway resource model
//!
//! Field names serialize in camelCase so that exported documents match the
//! shapes the gateway itself reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::str::FromStr;

/// Authorization type used for every method this crate creates
pub const AUTHORIZATION_NONE: &str = "NONE";
/// Connection type for internet-routed integrations
pub const CONNECTION_INTERNET: &str = "INTERNET";
/// Passthrough behavior applied when no request template matches
pub const PASSTHROUGH_WHEN_NO_MATCH: &str = "WHEN_NO_MATCH";
/// Name of the built-in empty response model
pub const EMPTY_MODEL: &str = "Empty";
pub const JSON_CONTENT_TYPE: &str = "application/json";

/// HTTP verbs a gateway method can be bound to
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpVerb {
    Get,
    Post,
    Put,
    Delete,
    Patch,
    Head,
    Options,
    Any,
}

impl HttpVerb {
    pub fn all() -> &'static [HttpVerb] {
        &[
            HttpVerb::Get,
            HttpVerb::Post,
            HttpVerb::Put,
            HttpVerb::Delete,
            HttpVerb::Patch,
            HttpVerb::Head,
            HttpVerb::Options,
            HttpVerb::Any,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            HttpVerb::Get => "GET",
            HttpVerb::Post => "POST",
            HttpVerb::Put => "PUT",
            HttpVerb::Delete => "DELETE",
            HttpVerb::Patch => "PATCH",
            HttpVerb::Head => "HEAD",
            HttpVerb::Options => "OPTIONS",
            HttpVerb::Any => "ANY",
        }
    }
}

impl fmt::Display for HttpVerb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpVerb {
    type Err = String;

    /// Case-insensitive; also accepts the OpenAPI `x-amazon-apigateway-any-method` key
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET" => Ok(HttpVerb::Get),
            "POST" => Ok(HttpVerb::Post),
            "PUT" => Ok(HttpVerb::Put),
            "DELETE" => Ok(HttpVerb::Delete),
            "PATCH" => Ok(HttpVerb::Patch),
            "HEAD" => Ok(HttpVerb::Head),
            "OPTIONS" => Ok(HttpVerb::Options),
            "ANY" | "X-AMAZON-APIGATEWAY-ANY-METHOD" => Ok(HttpVerb::Any),
            _ => Err(format!("Unsupported HTTP method: {s}")),
        }
    }
}

/// `resourceMethods` is a map keyed by verb; only the keys matter here
mod verb_map {
    use super::HttpVerb;
    use serde::de::{Error, IgnoredAny};
    use serde::ser::SerializeMap;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::collections::{BTreeMap, BTreeSet};

    pub fn serialize<S: Serializer>(verbs: &BTreeSet<HttpVerb>, s: S) -> Result<S::Ok, S::Error> {
        let mut map = s.serialize_map(Some(verbs.len()))?;
        for verb in verbs {
            map.serialize_entry(verb.as_str(), &BTreeMap::<String, String>::new())?;
        }
        map.end()
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<BTreeSet<HttpVerb>, D::Error> {
        let raw = Option::<BTreeMap<String, IgnoredAny>>::deserialize(d)?.unwrap_or_default();
        raw.into_keys()
            .map(|key| key.parse::<HttpVerb>().map_err(D::Error::custom))
            .collect()
    }
}

/// One path segment of an API's resource tree
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceNode {
    pub id: String,
    /// `None` only for the root resource
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_id: Option<String>,
    /// Segment literal, e.g. `users` or `{id}`; `None` for the root
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path_part: Option<String>,
    /// Accumulated full path, `/` for the root
    pub path: String,
    #[serde(default, with = "verb_map", skip_serializing_if = "BTreeSet::is_empty")]
    pub resource_methods: BTreeSet<HttpVerb>,
}

impl ResourceNode {
    pub fn is_root(&self) -> bool {
        self.path == "/"
    }

    /// Non-empty path segments of this resource's full path
    pub fn segments(&self) -> Vec<&str> {
        path_segments(&self.path)
    }
}

/// Split a resource path into its non-empty segments
pub fn path_segments(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn default_authorization() -> String {
    AUTHORIZATION_NONE.to_string()
}

/// A method bound to a resource
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodConfig {
    pub http_method: HttpVerb,
    #[serde(default = "default_authorization")]
    pub authorization_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizer_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_validator_id: Option<String>,
    #[serde(default)]
    pub api_key_required: bool,
    /// Encoded parameter key (`method.request.<location>.<name>`) to required flag
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_parameters: BTreeMap<String, bool>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_models: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub method_responses: BTreeMap<String, MethodResponse>,
}

impl MethodConfig {
    pub fn new(http_method: HttpVerb) -> Self {
        Self {
            http_method,
            authorization_type: default_authorization(),
            authorizer_id: None,
            request_validator_id: None,
            api_key_required: false,
            request_parameters: BTreeMap::new(),
            request_models: BTreeMap::new(),
            method_responses: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MethodResponse {
    pub status_code: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub response_models: BTreeMap<String, String>,
}

impl MethodResponse {
    /// 200 response with the empty JSON model
    pub fn ok_empty() -> Self {
        Self {
            status_code: "200".to_string(),
            response_models: BTreeMap::from([(
                JSON_CONTENT_TYPE.to_string(),
                EMPTY_MODEL.to_string(),
            )]),
        }
    }
}

/// Backend kinds an integration can use
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IntegrationType {
    Mock,
    Http,
    HttpProxy,
    Aws,
    AwsProxy,
}

impl IntegrationType {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntegrationType::Mock => "MOCK",
            IntegrationType::Http => "HTTP",
            IntegrationType::HttpProxy => "HTTP_PROXY",
            IntegrationType::Aws => "AWS",
            IntegrationType::AwsProxy => "AWS_PROXY",
        }
    }

    /// HTTP-backed types whose URI is a plain URL
    pub fn is_http(&self) -> bool {
        matches!(self, IntegrationType::Http | IntegrationType::HttpProxy)
    }
}

impl fmt::Display for IntegrationType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IntegrationType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "MOCK" => Ok(IntegrationType::Mock),
            "HTTP" => Ok(IntegrationType::Http),
            "HTTP_PROXY" => Ok(IntegrationType::HttpProxy),
            "AWS" => Ok(IntegrationType::Aws),
            "AWS_PROXY" => Ok(IntegrationType::AwsProxy),
            _ => Err(format!("Unsupported integration type: {s}")),
        }
    }
}

/// Backend wiring of one method
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationConfig {
    #[serde(rename = "type")]
    pub integration_type: IntegrationType,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uri: Option<String>,
    /// Method used towards the backend
    #[serde(rename = "httpMethod", default, skip_serializing_if = "Option::is_none")]
    pub integration_http_method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub connection_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub passthrough_behavior: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_parameters: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub request_templates: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_in_millis: Option<u64>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub integration_responses: BTreeMap<String, IntegrationResponse>,
}

impl IntegrationConfig {
    pub fn new(integration_type: IntegrationType) -> Self {
        Self {
            integration_type,
            uri: None,
            integration_http_method: None,
            connection_type: None,
            passthrough_behavior: None,
            request_parameters: BTreeMap::new(),
            request_templates: BTreeMap::new(),
            timeout_in_millis: None,
            integration_responses: BTreeMap::new(),
        }
    }

    pub fn has_request_templates(&self) -> bool {
        !self.request_templates.is_empty()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IntegrationResponse {
    pub status_code: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub selection_pattern: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub response_templates: BTreeMap<String, String>,
}

impl IntegrationResponse {
    /// 200 response answering `{"message": "OK"}`
    pub fn ok_message() -> Self {
        Self {
            status_code: "200".to_string(),
            selection_pattern: None,
            response_templates: BTreeMap::from([(
                JSON_CONTENT_TYPE.to_string(),
                r#"{"message": "OK"}"#.to_string(),
            )]),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Add,
    Remove,
    Replace,
}

/// A single JSON-patch style update sent to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PatchOperation {
    pub op: PatchOp,
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
}

impl PatchOperation {
    pub fn add(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Add,
            path: path.into(),
            value: Some(value.into()),
        }
    }

    pub fn remove(path: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Remove,
            path: path.into(),
            value: None,
        }
    }

    pub fn replace(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: Some(value.into()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RestApi {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub policy: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub root_resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_date: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Stage {
    pub stage_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub deployment_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

fn default_content_type() -> String {
    JSON_CONTENT_TYPE.to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Model {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// JSON schema, kept as the raw string the gateway stores
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<String>,
    #[serde(default = "default_content_type")]
    pub content_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestValidator {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default)]
    pub validate_request_body: bool,
    #[serde(default)]
    pub validate_request_parameters: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Authorizer {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    /// `TOKEN`, `REQUEST` or `COGNITO_USER_POOLS`
    #[serde(rename = "type")]
    pub authorizer_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizer_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub identity_source: Option<String>,
    #[serde(rename = "providerARNs", default, skip_serializing_if = "Vec::is_empty")]
    pub provider_arns: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorizer_result_ttl_in_seconds: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deployment {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub created_date: DateTime<Utc>,
}

/// A (resource, method) pair as listed to users
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Endpoint {
    pub resource_id: String,
    pub path: String,
    pub method: HttpVerb,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_http_verb_parsing() {
        assert_eq!("get".parse::<HttpVerb>().unwrap(), HttpVerb::Get);
        assert_eq!("PATCH".parse::<HttpVerb>().unwrap(), HttpVerb::Patch);
        assert_eq!(
            "x-amazon-apigateway-any-method".parse::<HttpVerb>().unwrap(),
            HttpVerb::Any
        );
        assert!("parameters".parse::<HttpVerb>().is_err());
        assert_eq!(HttpVerb::Delete.to_string(), "DELETE");
    }

    #[test]
    fn test_resource_node_serializes_methods_as_map() {
        let node = ResourceNode {
            id: "r1".to_string(),
            parent_id: Some("root".to_string()),
            path_part: Some("users".to_string()),
            path: "/users".to_string(),
            resource_methods: BTreeSet::from([HttpVerb::Get, HttpVerb::Post]),
        };

        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["resourceMethods"], json!({"GET": {}, "POST": {}}));
        assert_eq!(value["pathPart"], "users");

        let back: ResourceNode = serde_json::from_value(value).unwrap();
        assert_eq!(back, node);
    }

    #[test]
    fn test_root_resource_without_methods() {
        let root: ResourceNode = serde_json::from_value(json!({"id": "abc", "path": "/"})).unwrap();
        assert!(root.is_root());
        assert!(root.parent_id.is_none());
        assert!(root.resource_methods.is_empty());
        assert!(root.segments().is_empty());
    }

    #[test]
    fn test_integration_config_wire_names() {
        let mut config = IntegrationConfig::new(IntegrationType::HttpProxy);
        config.uri = Some("http://backend/{proxy}".to_string());
        config.integration_http_method = Some("GET".to_string());

        let value = serde_json::to_value(&config).unwrap();
        assert_eq!(value["type"], "HTTP_PROXY");
        assert_eq!(value["httpMethod"], "GET");
        assert!(value.get("requestTemplates").is_none());
    }

    #[test]
    fn test_patch_operation_serialization() {
        let add =
            serde_json::to_value(PatchOperation::add("/requestParameters/x", "true")).unwrap();
        assert_eq!(add, json!({"op": "add", "path": "/requestParameters/x", "value": "true"}));

        let remove = serde_json::to_value(PatchOperation::remove("/requestParameters/x")).unwrap();
        assert_eq!(remove, json!({"op": "remove", "path": "/requestParameters/x"}));
    }

    #[test]
    fn test_method_config_defaults() {
        let method: MethodConfig = serde_json::from_value(json!({"httpMethod": "GET"})).unwrap();
        assert_eq!(method.authorization_type, AUTHORIZATION_NONE);
        assert!(method.request_parameters.is_empty());
    }
}
