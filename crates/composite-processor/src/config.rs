//! Configuration for compositing.

use serde::{Deserialize, Serialize};

/// Configuration shared by the resolver and the reducers.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositeConfig {
    /// Rows per tile when a grid is split for parallel processing.
    pub tile_rows: usize,

    /// Minimum pixel count before tiles are processed on the thread pool.
    pub parallel_threshold: usize,

    /// Value written to every band of an invalid result pixel.
    pub fill_value: f32,

    /// What to do when a stack has no layers.
    pub empty_stack: EmptyStackPolicy,

    /// Sentinel value treated as missing when stacks are loaded.
    pub nodata: Option<f32>,
}

impl Default for CompositeConfig {
    fn default() -> Self {
        Self {
            tile_rows: 256,
            parallel_threshold: 65_536, // 256x256 or larger
            fill_value: f32::NAN,
            empty_stack: EmptyStackPolicy::AllInvalid,
            nodata: None,
        }
    }
}

impl CompositeConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("COMPOSITE_TILE_ROWS") {
            if let Ok(rows) = val.parse() {
                config.tile_rows = rows;
            }
        }

        if let Ok(val) = std::env::var("COMPOSITE_PARALLEL_THRESHOLD") {
            if let Ok(threshold) = val.parse() {
                config.parallel_threshold = threshold;
            }
        }

        if let Ok(val) = std::env::var("COMPOSITE_FILL_VALUE") {
            if let Ok(fill) = val.parse() {
                config.fill_value = fill;
            }
        }

        if let Ok(val) = std::env::var("COMPOSITE_EMPTY_STACK") {
            config.empty_stack = EmptyStackPolicy::from_str(&val);
        }

        if let Ok(val) = std::env::var("COMPOSITE_NODATA") {
            config.nodata = val.parse().ok();
        }

        config
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), String> {
        if self.tile_rows == 0 {
            return Err("tile_rows must be > 0".to_string());
        }

        if self.parallel_threshold == 0 {
            return Err("parallel_threshold must be > 0".to_string());
        }

        if matches!(self.nodata, Some(v) if v.is_nan()) {
            return Err("nodata must be a number; NaN is always treated as missing".to_string());
        }

        Ok(())
    }
}

/// Behaviour for a stack with no layers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmptyStackPolicy {
    /// Return an all-invalid grid of the stack's shape.
    #[default]
    AllInvalid,
    /// Fail with `CompositeError::EmptyInput`.
    Error,
}

impl EmptyStackPolicy {
    /// Parse from string (case-insensitive).
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "error" | "fail" => Self::Error,
            _ => Self::AllInvalid,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllInvalid => "all_invalid",
            Self::Error => "error",
        }
    }
}

impl std::fmt::Display for EmptyStackPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CompositeConfig::default();
        assert_eq!(config.tile_rows, 256);
        assert_eq!(config.parallel_threshold, 65_536);
        assert!(config.fill_value.is_nan());
        assert_eq!(config.empty_stack, EmptyStackPolicy::AllInvalid);
        assert_eq!(config.nodata, None);
    }

    #[test]
    fn test_config_validation() {
        let mut config = CompositeConfig::default();
        assert!(config.validate().is_ok());

        config.tile_rows = 0;
        assert!(config.validate().is_err());

        config = CompositeConfig::default();
        config.parallel_threshold = 0;
        assert!(config.validate().is_err());

        config = CompositeConfig::default();
        config.nodata = Some(f32::NAN);
        assert!(config.validate().is_err());

        config.nodata = Some(-9999.0);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_empty_stack_policy_from_str() {
        assert_eq!(EmptyStackPolicy::from_str("error"), EmptyStackPolicy::Error);
        assert_eq!(EmptyStackPolicy::from_str("FAIL"), EmptyStackPolicy::Error);
        assert_eq!(
            EmptyStackPolicy::from_str("all_invalid"),
            EmptyStackPolicy::AllInvalid
        );
        assert_eq!(
            EmptyStackPolicy::from_str("whatever"),
            EmptyStackPolicy::AllInvalid
        );
    }

    #[test]
    fn test_partial_config_deserializes_with_defaults() {
        let config: CompositeConfig =
            serde_json::from_str(r#"{"tile_rows": 64, "empty_stack": "error"}"#).unwrap();
        assert_eq!(config.tile_rows, 64);
        assert_eq!(config.empty_stack, EmptyStackPolicy::Error);
        assert_eq!(config.parallel_threshold, 65_536);
    }
}
