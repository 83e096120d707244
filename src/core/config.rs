//! Runtime settings
//!
//! Settings come from a TOML file. Every field has a default, so an empty
//! file (or no file at all) is a valid configuration:
//!
//! ```toml
//! [resolution]
//! mode = "strict"
//! max_depth = 32
//!
//! [gateway]
//! region = "us-east-1"
//! account_id = "000000000000"
//! stage_name = "dev"
//! default_integration_type = "HTTP_PROXY"
//! default_timeout_millis = 29000
//!
//! [import]
//! responses = "preserve_source"
//! rollback_on_failure = true
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::error::{Error, Result};
use crate::gateway::IntegrationType;
use crate::openapi::ResolverOptions;

const APP_DIR: &str = "apigw-sync";
const CONFIG_FILE: &str = "config.toml";

/// Top-level settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub resolution: ResolverOptions,
    pub gateway: GatewaySettings,
    pub import: ImportSettings,
}

/// Values used when talking to the gateway
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewaySettings {
    pub region: String,
    pub account_id: String,
    /// Stage every deployment targets
    pub stage_name: String,
    /// Used for HTTP targets that do not name a type
    pub default_integration_type: IntegrationType,
    pub default_timeout_millis: u64,
}

impl Default for GatewaySettings {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            account_id: "000000000000".to_string(),
            stage_name: "dev".to_string(),
            default_integration_type: IntegrationType::HttpProxy,
            default_timeout_millis: 29_000,
        }
    }
}

/// How imported methods get their responses
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseNormalization {
    /// Always a 200 method response with the `Empty` model and a 200
    /// integration response answering `{"message": "OK"}`
    #[default]
    SynthesizeOk,
    /// Replay the source's responses, synthesizing only when it has none
    PreserveSource,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportSettings {
    pub responses: ResponseNormalization,
    /// Delete the partially created API when an import fails
    pub rollback_on_failure: bool,
}

impl Settings {
    /// Parse settings from TOML text
    pub fn from_toml(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load from `path`, or from the default location when `path` is `None`.
    ///
    /// A missing default file yields the defaults; a missing explicit file is
    /// an error.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path = match path {
            Some(path) => path.to_path_buf(),
            None => match Self::default_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    tracing::debug!("No settings file found, using defaults");
                    return Ok(Self::default());
                }
            },
        };

        let content = std::fs::read_to_string(&path)
            .map_err(|e| Error::config(format!("Cannot read {}: {e}", path.display())))?;
        tracing::debug!("Loaded settings from {}", path.display());
        Self::from_toml(&content)
    }

    /// `<config dir>/apigw-sync/config.toml`, when a config dir exists
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join(APP_DIR).join(CONFIG_FILE))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::openapi::ResolutionMode;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_empty_toml_gives_defaults() {
        let settings = Settings::from_toml("").unwrap();
        assert_eq!(settings, Settings::default());
        assert_eq!(settings.gateway.stage_name, "dev");
        assert_eq!(settings.resolution.mode, ResolutionMode::Lenient);
        assert_eq!(settings.resolution.max_depth, 64);
        assert_eq!(settings.import.responses, ResponseNormalization::SynthesizeOk);
    }

    #[test]
    fn test_partial_toml_overrides_fields() {
        let settings = Settings::from_toml(
            r#"
            [resolution]
            mode = "strict"

            [gateway]
            region = "eu-west-1"
            default_integration_type = "HTTP"

            [import]
            responses = "preserve_source"
            rollback_on_failure = true
            "#,
        )
        .unwrap();

        assert_eq!(settings.resolution.mode, ResolutionMode::Strict);
        assert_eq!(settings.resolution.max_depth, 64);
        assert_eq!(settings.gateway.region, "eu-west-1");
        assert_eq!(settings.gateway.account_id, "000000000000");
        assert_eq!(
            settings.gateway.default_integration_type,
            IntegrationType::Http
        );
        assert_eq!(settings.import.responses, ResponseNormalization::PreserveSource);
        assert!(settings.import.rollback_on_failure);
    }

    #[test]
    fn test_invalid_toml_is_an_error() {
        let result = Settings::from_toml("[gateway]\nregion = 5\n");
        assert!(matches!(result, Err(Error::Toml(_))));
    }

    #[test]
    fn test_load_explicit_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[gateway]\nstage_name = \"qa\"\n").unwrap();

        let settings = Settings::load(Some(file.path())).unwrap();
        assert_eq!(settings.gateway.stage_name, "qa");
    }

    #[test]
    fn test_load_missing_explicit_file_fails() {
        let result = Settings::load(Some(Path::new("/nonexistent/apigw-sync.toml")));
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
