//! Runtime configuration.
//!
//! ```rust,ignore
//! let config = RuntimeConfig::from_json(r#"{ "duplicate_keys": "warn" }"#)?;
//! let root = Root::with_config(HostTree::new(), config);
//! ```

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// What to do when siblings share a key.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DuplicateKeyPolicy {
    /// Fail the render of the parent.
    #[default]
    Error,

    /// Log a warning; the first occurrence keeps the previous instance.
    Warn,
}

/// Knobs for one root.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RuntimeConfig {
    pub duplicate_keys: DuplicateKeyPolicy,

    /// Render passes a single flush may run before the tree is aborted.
    pub max_nested_updates: usize,

    /// Convert panics in render functions and effects into errors.
    pub catch_panics: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            duplicate_keys: DuplicateKeyPolicy::Error,
            max_nested_updates: 50,
            catch_panics: true,
        }
    }
}

impl RuntimeConfig {
    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nested_updates == 0 {
            return Err(ConfigError::ZeroNestedUpdates);
        }
        Ok(())
    }
}
