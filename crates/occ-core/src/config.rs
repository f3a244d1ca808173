//! Facade configuration
//!
//! Tolerances and numeric settings, serializable so they can be loaded from a
//! RON configuration file.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] ron::error::SpannedError),
}

/// Numeric settings for the in-memory reference kernel
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct KernelConfig {
    /// Distance under which two points are considered coincident
    pub linear_tolerance: f64,
    /// Angle (radians) under which two directions are considered parallel
    pub angular_tolerance: f64,
    /// Number of Simpson intervals per curve span for numeric integration
    pub integration_intervals: usize,
}

impl Default for KernelConfig {
    fn default() -> Self {
        Self {
            linear_tolerance: 1e-7,
            angular_tolerance: 1e-9,
            integration_intervals: 64,
        }
    }
}

/// Top-level facade configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OccConfig {
    /// Reference kernel settings
    pub kernel: KernelConfig,
    /// Tolerance used when sewing faces and the request does not name one
    pub sewing_tolerance: f64,
}

impl Default for OccConfig {
    fn default() -> Self {
        Self {
            kernel: KernelConfig::default(),
            sewing_tolerance: 1e-7,
        }
    }
}

impl OccConfig {
    /// Parse a configuration from RON text
    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        Ok(ron::from_str(text)?)
    }

    /// Load a configuration from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    /// Serialize the configuration to pretty RON
    pub fn to_ron_string(&self) -> Result<String, ron::Error> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_config_keeps_defaults() {
        let config = OccConfig::from_ron_str("(sewing_tolerance: 0.001)").unwrap();
        assert_eq!(config.sewing_tolerance, 0.001);
        assert_eq!(config.kernel, KernelConfig::default());
    }

    #[test]
    fn test_roundtrip_through_file() {
        let mut config = OccConfig::default();
        config.kernel.integration_intervals = 128;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(config.to_ron_string().unwrap().as_bytes())
            .unwrap();

        let loaded = OccConfig::load(file.path()).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_invalid_config_is_parse_error() {
        let err = OccConfig::from_ron_str("(sewing_tolerance: \"wide\")").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }
}
