//! Configuration for the work item engine
//!
//! [`ConfigProvider`] merges defaults, an optional file and `WORKITEM_`
//! environment variables into an [`EngineConfig`].

pub mod error;
pub mod provider;
pub mod types;

pub use error::ConfigError;
pub use provider::{ConfigProvider, ENV_NESTING_SEPARATOR, ENV_PREFIX};
pub use types::{
    CodebaseConfig, EngineConfig, DEFAULT_API_BASE_URL, DEFAULT_CODEBASE_KIND,
    DEFAULT_CODEBASE_STACK_ID,
};

/// Result type for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;
