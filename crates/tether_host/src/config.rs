//! # Executor Configuration
//!
//! Loaded once at startup, from TOML or built in code.
//!
//! ```toml
//! queue_name = "js"
//! queue_capacity = 1024
//! enable_inspector = true
//! inspector_name = "Tether"
//! engine_tag = "mock"
//! ```

use std::path::Path;

use serde::Deserialize;

use crate::error::{HostError, HostResult};

/// Default owner thread name.
pub const DEFAULT_QUEUE_NAME: &str = "tether-runtime";

/// Default inspector page title.
pub const DEFAULT_INSPECTOR_NAME: &str = "Tether";

/// Configuration for [`crate::ExecutorFactory`].
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutorConfig {
    /// Name of the owner thread.
    pub queue_name: String,
    /// Job queue capacity. 0 means unbounded.
    pub queue_capacity: usize,
    /// Register an inspector page for each runtime.
    pub enable_inspector: bool,
    /// Inspector page title.
    pub inspector_name: String,
    /// Value stored in the `jsEngine` global after creation, if any.
    pub engine_tag: Option<String>,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            queue_name: DEFAULT_QUEUE_NAME.to_owned(),
            queue_capacity: 0,
            enable_inspector: false,
            inspector_name: DEFAULT_INSPECTOR_NAME.to_owned(),
            engine_tag: None,
        }
    }
}

impl ExecutorConfig {
    /// Parses and validates a TOML document.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidConfig`] on malformed TOML, unknown keys,
    /// or values rejected by [`Self::validate`].
    pub fn from_toml_str(source: &str) -> HostResult<Self> {
        let config: Self =
            toml::from_str(source).map_err(|e| HostError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reads, parses and validates a TOML file.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidConfig`] if the file cannot be read or
    /// does not parse.
    pub fn from_toml_file(path: impl AsRef<Path>) -> HostResult<Self> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|e| {
            HostError::InvalidConfig(format!("failed to read {}: {e}", path.display()))
        })?;
        Self::from_toml_str(&source)
    }

    /// Checks values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns [`HostError::InvalidConfig`] for an empty queue name, or an
    /// empty inspector name while the inspector is enabled.
    pub fn validate(&self) -> HostResult<()> {
        if self.queue_name.trim().is_empty() {
            return Err(HostError::InvalidConfig("queue_name must not be empty".to_owned()));
        }
        if self.enable_inspector && self.inspector_name.trim().is_empty() {
            return Err(HostError::InvalidConfig(
                "inspector_name must not be empty when the inspector is enabled".to_owned(),
            ));
        }
        Ok(())
    }

    /// Sets the owner thread name.
    #[must_use]
    pub fn with_queue_name(mut self, name: impl Into<String>) -> Self {
        self.queue_name = name.into();
        self
    }

    /// Sets the job queue capacity (0 = unbounded).
    #[must_use]
    pub fn with_queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity;
        self
    }

    /// Enables the inspector under the given page title.
    #[must_use]
    pub fn with_inspector(mut self, name: impl Into<String>) -> Self {
        self.enable_inspector = true;
        self.inspector_name = name.into();
        self
    }

    /// Sets the engine tag stored in the `jsEngine` global.
    #[must_use]
    pub fn with_engine_tag(mut self, tag: impl Into<String>) -> Self {
        self.engine_tag = Some(tag.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = ExecutorConfig::default();
        assert_eq!(config.queue_name, DEFAULT_QUEUE_NAME);
        assert_eq!(config.queue_capacity, 0);
        assert!(!config.enable_inspector);
        assert!(config.engine_tag.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_full_document() {
        let config = ExecutorConfig::from_toml_str(
            r#"
            queue_name = "js"
            queue_capacity = 64
            enable_inspector = true
            inspector_name = "Debug Page"
            engine_tag = "hermes"
            "#,
        )
        .unwrap();

        assert_eq!(
            config,
            ExecutorConfig::default()
                .with_queue_name("js")
                .with_queue_capacity(64)
                .with_inspector("Debug Page")
                .with_engine_tag("hermes")
        );
    }

    #[test]
    fn test_missing_keys_take_defaults() {
        let config = ExecutorConfig::from_toml_str("queue_capacity = 8").unwrap();
        assert_eq!(config.queue_name, DEFAULT_QUEUE_NAME);
        assert_eq!(config.queue_capacity, 8);
    }

    #[test]
    fn test_unknown_key_rejected() {
        let err = ExecutorConfig::from_toml_str("enable_jit = true").unwrap_err();
        assert!(matches!(err, HostError::InvalidConfig(_)));
    }

    #[test]
    fn test_validation() {
        let err = ExecutorConfig::from_toml_str(r#"queue_name = "  ""#).unwrap_err();
        assert_eq!(err, HostError::InvalidConfig("queue_name must not be empty".to_owned()));

        let config = ExecutorConfig::default().with_inspector("");
        assert!(config.validate().is_err());

        // Empty name is fine while the inspector is off.
        let config = ExecutorConfig {
            inspector_name: String::new(),
            ..ExecutorConfig::default()
        };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_missing_file() {
        let err = ExecutorConfig::from_toml_file("/nonexistent/tether.toml").unwrap_err();
        assert!(matches!(err, HostError::InvalidConfig(msg) if msg.contains("failed to read")));
    }
}
