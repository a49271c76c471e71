//! Request types for the report service.
//!
//! Both report endpoints accept the same body: the reference data, the
//! checks, the caller's security scope, and optional filters.

use serde::{Deserialize, Serialize};

use crate::aggregation::{ReportFilters, SecurityScope};
use crate::error::EngineResult;
use crate::models::{Check, Client, Company};

/// Request body for `/reports` and `/reports/client-stats`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportRequest {
    /// Companies to report on.
    #[serde(default)]
    pub companies: Vec<Company>,
    /// Clients used for division lookup and display names.
    #[serde(default)]
    pub clients: Vec<Client>,
    /// The checks to aggregate.
    pub checks: Vec<Check>,
    /// The caller's role and visible clients.
    pub scope: SecurityScope,
    /// Optional filters applied before aggregation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub filters: Option<ReportFilters>,
}

impl ReportRequest {
    /// Validates the filters and returns the checks that pass them.
    pub fn filtered_checks(&self) -> EngineResult<Vec<Check>> {
        match &self.filters {
            Some(filters) => {
                filters.validate()?;
                Ok(filters.apply(&self.checks))
            }
            None => Ok(self.checks.clone()),
        }
    }
}
