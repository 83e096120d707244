//! Method request parameters and their encoded gateway keys
//!
//! The gateway stores declared parameters as `method.request.<location>.<name>`
//! keys. Query parameters use the `querystring` keyword, not `query`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

const METHOD_REQUEST_PREFIX: &str = "method.request.";
const REQUEST_PARAMETERS_PATH: &str = "/requestParameters/";

/// Encoded key of the greedy proxy path parameter
pub const PROXY_PARAMETER_KEY: &str = "method.request.path.proxy";
/// Integration-side key the proxy parameter is mapped onto
pub const PROXY_INTEGRATION_KEY: &str = "integration.request.path.proxy";

/// Where a request parameter is carried
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    Path,
    Query,
    Header,
}

impl ParameterLocation {
    /// Keyword used inside encoded gateway keys
    pub fn keyword(&self) -> &'static str {
        match self {
            ParameterLocation::Path => "path",
            ParameterLocation::Query => "querystring",
            ParameterLocation::Header => "header",
        }
    }

    fn from_keyword(keyword: &str) -> Option<Self> {
        match keyword {
            "path" => Some(ParameterLocation::Path),
            "querystring" => Some(ParameterLocation::Query),
            "header" => Some(ParameterLocation::Header),
            _ => None,
        }
    }
}

impl fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterLocation::Path => f.write_str("path"),
            ParameterLocation::Query => f.write_str("query"),
            ParameterLocation::Header => f.write_str("header"),
        }
    }
}

impl FromStr for ParameterLocation {
    type Err = String;

    /// Accepts OpenAPI `in` values as well as the `querystring` keyword
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "path" => Ok(ParameterLocation::Path),
            "query" | "querystring" => Ok(ParameterLocation::Query),
            "header" => Ok(ParameterLocation::Header),
            _ => Err(format!("Unsupported parameter location: {s}")),
        }
    }
}

/// A declared method request parameter
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RequestParameter {
    #[serde(rename = "in")]
    pub location: ParameterLocation,
    pub name: String,
    #[serde(default)]
    pub required: bool,
}

impl RequestParameter {
    pub fn new(location: ParameterLocation, name: impl Into<String>, required: bool) -> Self {
        Self {
            location,
            name: name.into(),
            required,
        }
    }

    /// The greedy `{proxy+}` path parameter
    pub fn proxy() -> Self {
        Self::new(ParameterLocation::Path, "proxy", true)
    }

    /// Encoded gateway key, e.g. `method.request.querystring.page`
    pub fn key(&self) -> String {
        format!("{METHOD_REQUEST_PREFIX}{}.{}", self.location.keyword(), self.name)
    }

    /// Parse an encoded gateway key; the required flag is supplied separately
    pub fn from_key(key: &str, required: bool) -> Option<Self> {
        let rest = key.strip_prefix(METHOD_REQUEST_PREFIX)?;
        let (keyword, name) = rest.split_once('.')?;
        if name.is_empty() {
            return None;
        }
        let location = ParameterLocation::from_keyword(keyword)?;
        Some(Self::new(location, name, required))
    }
}

/// Patch path addressing an encoded parameter key
pub fn parameter_patch_path(key: &str) -> String {
    format!("{REQUEST_PARAMETERS_PATH}{key}")
}

/// Encoded key addressed by a parameter patch path, if it is one
pub fn key_from_patch_path(path: &str) -> Option<&str> {
    path.strip_prefix(REQUEST_PARAMETERS_PATH)
}

/// Boolean-string form used as patch value
pub fn required_value(required: bool) -> &'static str {
    if required { "true" } else { "false" }
}
