//! HTTP API module for the payroll report service.
//!
//! This module exposes report aggregation over REST: the full hierarchical
//! report and the flat client/division statistics.

mod handlers;
mod request;
mod response;
mod state;

pub use handlers::create_router;
pub use request::ReportRequest;
pub use response::{ApiError, ApiErrorResponse};
pub use state::AppState;
