//! Configuration system for callmodel.
//!
//! Uses `figment` for layered configuration: defaults -> config file -> environment -> overrides.
//! Configuration is loaded from `~/.config/callmodel/config.toml` and/or
//! `.callmodel/config.toml` in the workspace directory.

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::ConfigError;
use crate::gateway::GatewayConfig;

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallModelConfig {
    pub runtime: RuntimeConfig,
    pub store: StoreConfig,
    pub gateway: GatewayConfig,
}

/// Remote inference endpoint configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeConfig {
    /// Region used to derive the default endpoint.
    pub region: String,
    /// Optional endpoint override (local proxies, VPC endpoints).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    /// Environment variable holding a bearer token for the endpoint.
    pub api_key_env: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            region: "us-east-1".to_string(),
            endpoint_url: None,
            api_key_env: "AWS_BEARER_TOKEN_BEDROCK".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> String {
        self.endpoint_url
            .clone()
            .unwrap_or_else(|| format!("https://bedrock-runtime.{}.amazonaws.com", self.region))
    }
}

/// Blob store layout for conditioning and generated images.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Root directory of the filesystem store.
    pub root: PathBuf,
    /// Bucket holding both the conditioning image and generated images.
    pub bucket: String,
    /// Key of the optional conditioning image read by multimodal requests.
    pub conditioning_key: String,
    /// Key prefix for generated images.
    pub generated_prefix: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        let root = directories::ProjectDirs::from("dev", "callmodel", "callmodel")
            .map(|d| d.data_dir().join("store"))
            .unwrap_or_else(|| PathBuf::from(".callmodel").join("store"));
        Self {
            root,
            bucket: "bedrock-agent-images".to_string(),
            conditioning_key: "mypic.png".to_string(),
            generated_prefix: "generated_images".to_string(),
        }
    }
}

impl CallModelConfig {
    /// Reject values that cannot work at all.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.store.bucket.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "store.bucket must not be empty".to_string(),
            });
        }
        if self.store.conditioning_key.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "store.conditioning_key must not be empty".to_string(),
            });
        }
        if self.runtime.endpoint_url.is_none() && self.runtime.region.trim().is_empty() {
            return Err(ConfigError::Invalid {
                message: "runtime.region is required when runtime.endpoint_url is unset"
                    .to_string(),
            });
        }
        Ok(())
    }

    /// Render the configuration as TOML.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })
    }
}

/// Load configuration from layered sources.
///
/// Priority (highest to lowest):
/// 1. Explicit overrides (passed as argument)
/// 2. Environment variables (prefixed with `CALLMODEL_`)
/// 3. Workspace-local config (`.callmodel/config.toml`)
/// 4. User config (`~/.config/callmodel/config.toml`)
/// 5. Built-in defaults
pub fn load_config(
    workspace: Option<&Path>,
    overrides: Option<&CallModelConfig>,
) -> Result<CallModelConfig, Box<figment::Error>> {
    let mut figment = Figment::from(Serialized::defaults(CallModelConfig::default()));

    // User-level config
    if let Some(config_dir) = directories::ProjectDirs::from("dev", "callmodel", "callmodel") {
        let user_config = config_dir.config_dir().join("config.toml");
        if user_config.exists() {
            figment = figment.merge(Toml::file(&user_config));
        }
    }

    // Workspace-level config
    if let Some(ws) = workspace {
        let ws_config = ws.join(".callmodel").join("config.toml");
        if ws_config.exists() {
            figment = figment.merge(Toml::file(&ws_config));
        }
    }

    // Environment variables (CALLMODEL_RUNTIME__REGION, CALLMODEL_STORE__BUCKET, etc.)
    figment = figment.merge(Env::prefixed("CALLMODEL_").split("__"));

    if let Some(overrides) = overrides {
        figment = figment.merge(Serialized::defaults(overrides));
    }

    figment.extract().map_err(Box::new)
}
