//! Payroll Check Aggregation Engine
//!
//! This crate turns payroll checks into company → division → client reports.
//! It classifies each check (or each client relationship on a multi-client
//! check) into a division, computes pay buckets from the pay fields, scopes
//! visibility by client, and keeps the input live through a chunked query
//! synchronizer that works around store limits on "in" filters.

#![warn(missing_docs)]

pub mod aggregation;
pub mod api;
pub mod calculation;
pub mod config;
pub mod error;
pub mod models;
pub mod sync;
