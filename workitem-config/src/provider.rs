//! Configuration provider using Figment for the work item engine

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Json, Serialized, Toml, Yaml},
    Figment,
};
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::types::EngineConfig;
use crate::ConfigResult;

/// Prefix of environment variables read by the provider.
pub const ENV_PREFIX: &str = "WORKITEM_";
/// Separator between nested keys in environment variable names.
pub const ENV_NESTING_SEPARATOR: &str = "__";

/// Configuration provider using figment
///
/// Sources are merged in precedence order (later sources override earlier ones):
/// 1. Default values
/// 2. An optional configuration file (TOML, YAML or JSON by extension)
/// 3. `WORKITEM_` environment variables, `__` separating nested keys
///    (`WORKITEM_CODEBASE__STACK_ID` sets `codebase.stack_id`)
#[derive(Debug, Clone, Default)]
pub struct ConfigProvider {
    file: Option<PathBuf>,
}

impl ConfigProvider {
    /// Create a provider reading defaults and environment variables only
    pub fn new() -> Self {
        Self { file: None }
    }

    /// Also read the given configuration file
    pub fn with_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.file = Some(path.into());
        self
    }

    /// Load and validate the engine configuration
    pub fn load(&self) -> ConfigResult<EngineConfig> {
        let config: EngineConfig = self.build_figment()?.extract()?;
        config.validate()?;
        debug!(
            api_base_url = %config.api_base_url,
            codebase_kind = %config.codebase.kind,
            "Loaded engine configuration"
        );
        Ok(config)
    }

    fn build_figment(&self) -> ConfigResult<Figment> {
        let mut figment = Figment::from(Serialized::defaults(EngineConfig::default()));
        if let Some(path) = &self.file {
            figment = figment.merge(Self::load_config_file(path)?);
        }
        trace!(prefix = ENV_PREFIX, "Merging environment variables");
        Ok(figment.merge(Env::prefixed(ENV_PREFIX).split(ENV_NESTING_SEPARATOR)))
    }

    fn load_config_file(path: &Path) -> ConfigResult<Figment> {
        if !path.is_file() {
            return Err(ConfigError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        trace!(path = %path.display(), "Loading config file");
        let extension = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "toml" => Ok(Figment::from(Toml::file(path))),
            "yaml" | "yml" => Ok(Figment::from(Yaml::file(path))),
            "json" => Ok(Figment::from(Json::file(path))),
            other => Err(ConfigError::UnsupportedFormat {
                format: other.to_string(),
            }),
        }
    }
}
