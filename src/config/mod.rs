//! Configuration loading and management

use std::sync::OnceLock;

use serde::{Deserialize, Serialize};

use crate::core::error::{FilterError, Result};

/// Process-wide settings for predicate compilation and pagination.
///
/// # Example
/// ```yaml
/// cache_compiled_predicates: true
/// wildcard: "*"
/// default_page_size: 25
/// max_page_size: 200
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    /// Share compiled evaluators between predicates of the same shape
    pub cache_compiled_predicates: bool,

    /// Wildcard character used by `like` and JSON filter documents
    pub wildcard: char,

    /// Page size used when a request does not give one
    pub default_page_size: usize,

    /// Upper bound applied to requested page sizes
    pub max_page_size: usize,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            cache_compiled_predicates: true,
            wildcard: '%',
            default_page_size: 20,
            max_page_size: 100,
        }
    }
}

static INSTALLED: OnceLock<FilterConfig> = OnceLock::new();

impl FilterConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| FilterError::Config(format!("cannot read '{}': {}", path, e)))?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).map_err(|e| FilterError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Check the page size bounds
    pub fn validate(&self) -> Result<()> {
        if self.default_page_size == 0 {
            return Err(FilterError::Config(
                "default_page_size must be greater than 0".to_string(),
            ));
        }
        if self.max_page_size < self.default_page_size {
            return Err(FilterError::Config(format!(
                "max_page_size ({}) must be at least default_page_size ({})",
                self.max_page_size, self.default_page_size
            )));
        }
        Ok(())
    }

    /// Make this the process-wide configuration.
    ///
    /// Can only happen once, and only before the first call to
    /// [`FilterConfig::current`]; later attempts fail.
    pub fn install(self) -> Result<()> {
        self.validate()?;
        INSTALLED
            .set(self)
            .map_err(|_| FilterError::Config("configuration already installed".to_string()))?;
        tracing::debug!("filter configuration installed");
        Ok(())
    }

    /// The installed configuration, or the defaults when none was installed
    pub fn current() -> &'static FilterConfig {
        INSTALLED.get_or_init(FilterConfig::default)
    }
}
