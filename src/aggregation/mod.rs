//! Report aggregation.
//!
//! Turns scoped checks into the company → division → client hierarchy,
//! flattens it into cross-company client statistics, and holds the filter
//! state that selects which checks feed a report.

mod client_stats;
mod filters;
mod report;
mod security;

pub use client_stats::{EXPENSES_CLIENT_ID, build_client_department_stats};
pub use filters::{CHECKS_COLLECTION, CLIENT_FIELDS, ReportFilters};
pub use report::{UNASSIGNED_CLIENT_NAME, build_company_report, build_report};
pub use security::{Role, SecurityScope, filter_visible};
