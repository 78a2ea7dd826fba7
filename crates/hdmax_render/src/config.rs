//! Render delegate configuration.

use hdmax_core::PrimvarNaming;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from loading a configuration.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("max_nesting_depth must be at least 1")]
    ZeroNestingDepth,
}

/// Render delegate configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Which instancer primvar names the scene delegate authors
    pub primvar_naming: PrimvarNaming,
    /// Deepest instancer nesting that is flattened; deeper levels are skipped
    pub max_nesting_depth: usize,
    /// Sync draw items on the rayon thread pool
    pub parallel_sync: bool,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            primvar_naming: PrimvarNaming::Modern,
            max_nesting_depth: 16,
            parallel_sync: true,
        }
    }
}

impl RenderConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: RenderConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_nesting_depth == 0 {
            return Err(ConfigError::ZeroNestingDepth);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = RenderConfig::from_json_str(r#"{ "primvar_naming": "legacy" }"#).unwrap();

        assert_eq!(config.primvar_naming, PrimvarNaming::Legacy);
        assert_eq!(config.max_nesting_depth, 16);
        assert!(config.parallel_sync);
    }

    #[test]
    fn test_zero_depth_is_rejected() {
        let err = RenderConfig::from_json_str(r#"{ "max_nesting_depth": 0 }"#).unwrap_err();
        assert!(matches!(err, ConfigError::ZeroNestingDepth));
    }

    #[test]
    fn test_malformed_json() {
        let err = RenderConfig::from_json_str("{ not json").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
