//! Compositor configuration.
//!
//! Loaded from a YAML file when one is given, otherwise from `COMPOSITE_*`
//! environment variables (after `.env` has been read).

use anyhow::{Context, Result};
use composite_processor::{CompositeConfig, CompositeError, FlagMask};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::Path;

/// Top-level compositor configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CompositorConfig {
    /// Tiling, fill value and empty-stack behaviour
    pub composite: CompositeConfig,

    /// Flag values that mark a pixel unusable
    pub flags: FlagMask,
}

impl CompositorConfig {
    /// Load configuration from a YAML file. Missing keys take their defaults.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;
        let config: Self = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from environment variables.
    ///
    /// `COMPOSITE_INVALID_FLAGS` is a comma-separated list such as `0,1,3,8,9,10`.
    pub fn from_env() -> Result<Self> {
        let mut config = Self {
            composite: CompositeConfig::from_env(),
            flags: FlagMask::default(),
        };

        if let Ok(val) = env::var("COMPOSITE_INVALID_FLAGS") {
            let flags = val
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(|s| {
                    s.parse::<u16>()
                        .with_context(|| format!("Invalid flag value in COMPOSITE_INVALID_FLAGS: {s}"))
                })
                .collect::<Result<Vec<_>>>()?;
            config.flags = FlagMask::new(flags);
        }

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.composite
            .validate()
            .map_err(CompositeError::config)
            .context("Invalid composite configuration")
    }
}
