//! Configuration values consumed by the conversion engine

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::ConfigResult;

/// Default prefix for every link in projected resources.
pub const DEFAULT_API_BASE_URL: &str = "http://localhost:8080/api";
/// Default kind of codebases created on demand.
pub const DEFAULT_CODEBASE_KIND: &str = "git";
/// Default stack of codebases created on demand.
pub const DEFAULT_CODEBASE_STACK_ID: &str = "java-centos";

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Absolute URL prefix of the API; links are built beneath it.
    pub api_base_url: String,
    pub codebase: CodebaseConfig,
}

/// Values used when a codebase is registered for a new repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodebaseConfig {
    pub kind: String,
    pub stack_id: String,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            codebase: CodebaseConfig::default(),
        }
    }
}

impl Default for CodebaseConfig {
    fn default() -> Self {
        Self {
            kind: DEFAULT_CODEBASE_KIND.to_string(),
            stack_id: DEFAULT_CODEBASE_STACK_ID.to_string(),
        }
    }
}

impl EngineConfig {
    /// Check that the loaded values are usable.
    pub fn validate(&self) -> ConfigResult<()> {
        let parsed = url::Url::parse(&self.api_base_url)
            .map_err(|e| ConfigError::invalid_value("api_base_url", e.to_string()))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::invalid_value(
                "api_base_url",
                format!("unsupported scheme '{}'", parsed.scheme()),
            ));
        }
        if self.codebase.kind.trim().is_empty() {
            return Err(ConfigError::invalid_value("codebase.kind", "must not be empty"));
        }
        if self.codebase.stack_id.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "codebase.stack_id",
                "must not be empty",
            ));
        }
        Ok(())
    }

    /// The base URL without a trailing slash.
    pub fn base_url(&self) -> &str {
        self.api_base_url.trim_end_matches('/')
    }
}
