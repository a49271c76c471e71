//! Configuration loading and management for the aggregation engine.
//!
//! Settings live in a single `engine.yaml`: the synchronizer chunk size and
//! the aggregation rules (PTO policy, reconciliation tolerance).
//!
//! # Example
//!
//! ```no_run
//! use payroll_engine::config::ConfigLoader;
//!
//! let config = ConfigLoader::load("./config").unwrap();
//! println!("Chunk size: {}", config.sync().chunk_size);
//! ```

mod loader;
mod types;

pub use loader::{CONFIG_FILE_NAME, ConfigLoader};
pub use types::{AggregationConfig, DEFAULT_CHUNK_SIZE, EngineConfig, PtoPolicy, SyncConfig};
