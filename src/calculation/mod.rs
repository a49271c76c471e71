//! Pure calculation logic for the aggregation engine.
//!
//! This module contains division classification, pay calculation for checks
//! and their relationships, and reconciliation of stored totals against
//! computed pay. Nothing here performs I/O, and no numeric input can make
//! it fail or panic.

mod division;
mod pay;
mod reconcile;

pub use division::{CONTAINER_DIVISION, PROJECTS_CLIENT_NAME, classify, has_container_projects_pair};
pub use pay::{
    HourlyPay, PayBreakdown, calculate_hourly, calculate_other_pay, calculate_perdiem,
    compute_check_pay, compute_pay, compute_unit_pay, effective_pay_type, holiday_multiplier,
    max_component_amount, overtime_multiplier, pay_units,
};
pub use reconcile::{
    AMOUNT_OUT_OF_RANGE, INCONSISTENT_TOTAL, reconcile_check, reconcile_checks,
};
