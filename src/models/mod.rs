//! Core data models for the payroll aggregation engine.
//!
//! Store documents (checks, clients, companies, employees) and the derived
//! report structures.

mod check;
mod directory;
mod numeric;
mod report;

pub use check::{Check, OtherPayItem, PayType, PerDiemDays, RelationshipDetail};
pub use directory::{Client, ClientDirectory, Company, Employee};
pub use numeric::parse_decimal;
pub use report::{
    AggregateReport, ClientDepartmentStats, ClientReport, CompanyReport, DivisionReport,
    EXPENSES_DIVISION, NO_DIVISION, PayTotals, ReportWarning,
};
