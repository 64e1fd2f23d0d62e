//! Runtime configuration
//!
//! Loaded from TOML, falls back to defaults if no config file exists.

use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{Error, Result};
use crate::types::{Context, DEFAULT_RESPECT_LEVEL};

/// Top-level runtime configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Context applied when neither an explicit nor an ambient one is active.
    pub default_context: DefaultContextConfig,
    /// Concept map sizing.
    pub registry: RegistryConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultContextConfig {
    pub name: String,
    pub source: String,
    pub future_usage: String,
    pub respect_level: i32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// Initial capacity of the concept map. The map still grows without bound.
    pub capacity_hint: usize,
}

// ============================================================
// Defaults
// ============================================================

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            default_context: DefaultContextConfig::default(),
            registry: RegistryConfig::default(),
        }
    }
}

impl Default for DefaultContextConfig {
    fn default() -> Self {
        Self {
            name: "default".into(),
            source: "unknown".into(),
            future_usage: "undeclared".into(),
            respect_level: DEFAULT_RESPECT_LEVEL,
        }
    }
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self { capacity_hint: 64 }
    }
}

// ============================================================
// Loading
// ============================================================

impl RuntimeConfig {
    /// Load config from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match Self::from_file(path) {
            Ok(config) => {
                tracing::info!("Loaded config from {}", path.display());
                config
            }
            Err(Error::Io(_)) => {
                tracing::info!("No config at {} - using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to parse {}: {} - using defaults", path.display(), e);
                Self::default()
            }
        }
    }

    /// Strict load; errors instead of falling back.
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// Strict parse; errors instead of falling back.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.default_context.name.trim().is_empty() {
            return Err(Error::Config("default_context.name must not be blank".into()));
        }
        Ok(())
    }

    /// Write the current config as TOML (for generating a default config file).
    pub fn to_toml(&self) -> String {
        toml::to_string_pretty(self).unwrap_or_default()
    }

    /// The implicit context as a full `Context` value.
    pub fn default_context(&self) -> Context {
        self.default_context.to_context()
    }
}

impl DefaultContextConfig {
    pub fn to_context(&self) -> Context {
        Context::new(self.name.clone())
            .with_source(self.source.clone())
            .with_future_usage(self.future_usage.clone())
            .with_respect_level(self.respect_level)
    }
}
