//! Configuration types for the aggregation engine.
//!
//! These structures are deserialized from `engine.yaml`. Every section has
//! defaults so a partial file (or no file at all) yields a usable config.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::{EngineError, EngineResult};

/// The maximum number of values a store accepts in one "in" filter.
pub const DEFAULT_CHUNK_SIZE: usize = 10;

/// How holiday pay on hourly relationships is reported.
///
/// Some export paths report hourly holiday pay as PTO while per-diem
/// relationships carry PTO as a flat amount. Both readings are supported.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PtoPolicy {
    /// Holiday pay stays in the hourly bucket; PTO is only the flat amount.
    #[default]
    Separate,
    /// Holiday pay of hourly relationships moves to the PTO bucket.
    HolidayAsPto,
}

/// Settings for the chunked query synchronizer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Maximum values per "in" filter chunk.
    pub chunk_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

/// Settings for report aggregation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AggregationConfig {
    /// PTO reporting policy for hourly relationships.
    pub pto_policy: PtoPolicy,
    /// Largest accepted difference between stored and computed check totals.
    pub reconciliation_tolerance: Decimal,
}

impl Default for AggregationConfig {
    fn default() -> Self {
        Self {
            pto_policy: PtoPolicy::Separate,
            reconciliation_tolerance: Decimal::new(1, 2),
        }
    }
}

/// The complete engine configuration.
///
/// # Example
///
/// ```
/// use payroll_engine::config::EngineConfig;
///
/// let config = EngineConfig::default();
/// assert_eq!(config.sync.chunk_size, 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Synchronizer settings.
    pub sync: SyncConfig,
    /// Aggregation settings.
    pub aggregation: AggregationConfig,
}

impl EngineConfig {
    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> EngineResult<()> {
        if self.sync.chunk_size == 0 {
            return Err(EngineError::InvalidConfig {
                field: "sync.chunk_size".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        if self.aggregation.reconciliation_tolerance.is_sign_negative() {
            return Err(EngineError::InvalidConfig {
                field: "aggregation.reconciliation_tolerance".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}
