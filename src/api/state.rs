//! Shared state for the report service.
//!
//! Handlers only need the aggregation settings, so the state is a cheap
//! clone around the loaded configuration.

use std::path::Path;
use std::sync::Arc;

use crate::config::ConfigLoader;
use crate::error::EngineResult;

/// State handed to every report handler.
#[derive(Clone)]
pub struct AppState {
    config: Arc<ConfigLoader>,
}

impl AppState {
    /// Wraps an already loaded configuration.
    pub fn new(config: ConfigLoader) -> Self {
        Self {
            config: Arc::new(config),
        }
    }

    /// Loads `engine.yaml` from `dir` and wraps it in a new state.
    pub fn load<P: AsRef<Path>>(dir: P) -> EngineResult<Self> {
        ConfigLoader::load(dir).map(Self::new)
    }

    /// The engine configuration used for every report.
    pub fn config(&self) -> &ConfigLoader {
        &self.config
    }
}
