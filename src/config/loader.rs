//! Configuration loading functionality.
//!
//! This module provides the [`ConfigLoader`] type for loading the engine
//! configuration from a YAML file.

use std::fs;
use std::path::Path;

use crate::error::{EngineError, EngineResult};

use super::types::{AggregationConfig, EngineConfig, SyncConfig};

/// The file name looked up inside a configuration directory.
pub const CONFIG_FILE_NAME: &str = "engine.yaml";

/// Loads and provides access to engine configuration.
///
/// # Directory Structure
///
/// ```text
/// config/
/// └── engine.yaml   # sync + aggregation settings
/// ```
///
/// # Example
///
/// ```no_run
/// use payroll_engine::config::ConfigLoader;
///
/// let loader = ConfigLoader::load("./config")?;
/// println!("Chunk size: {}", loader.sync().chunk_size);
/// # Ok::<(), payroll_engine::error::EngineError>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    config: EngineConfig,
}

impl ConfigLoader {
    /// Loads configuration from the specified directory.
    ///
    /// Returns an error if `engine.yaml` is missing, is not valid YAML, or
    /// contains out-of-range values.
    pub fn load<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let file = path.as_ref().join(CONFIG_FILE_NAME);
        let config = Self::load_yaml(&file)?;
        config.validate()?;
        Ok(Self { config })
    }

    /// Wraps an already-built configuration after validating it.
    pub fn from_config(config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    /// Parses configuration from YAML text.
    pub fn from_yaml_str(content: &str) -> EngineResult<Self> {
        let config: EngineConfig =
            serde_yaml::from_str(content).map_err(|e| EngineError::ConfigParseError {
                path: "<inline>".to_string(),
                message: e.to_string(),
            })?;
        Self::from_config(config)
    }

    fn load_yaml(path: &Path) -> EngineResult<EngineConfig> {
        let path_str = path.display().to_string();

        let content = fs::read_to_string(path).map_err(|_| EngineError::ConfigNotFound {
            path: path_str.clone(),
        })?;

        // An empty file is a valid "all defaults" config.
        if content.trim().is_empty() {
            return Ok(EngineConfig::default());
        }

        serde_yaml::from_str(&content).map_err(|e| EngineError::ConfigParseError {
            path: path_str,
            message: e.to_string(),
        })
    }

    /// Returns the underlying configuration.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// Returns the synchronizer settings.
    pub fn sync(&self) -> &SyncConfig {
        &self.config.sync
    }

    /// Returns the aggregation settings.
    pub fn aggregation(&self) -> &AggregationConfig {
        &self.config.aggregation
    }
}
