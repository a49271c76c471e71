//! Error types for the payroll aggregation engine.
//!
//! This module provides strongly-typed errors using the `thiserror` crate
//! for every failure the engine can surface. Classification and pay
//! computation never fail; errors come from configuration, queries, and the
//! document store boundary.

use thiserror::Error;

/// The main error type for the payroll aggregation engine.
///
/// # Example
///
/// ```
/// use payroll_engine::error::EngineError;
///
/// let error = EngineError::ConfigNotFound {
///     path: "/missing/engine.yaml".to_string(),
/// };
/// assert_eq!(error.to_string(), "Configuration file not found: /missing/engine.yaml");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    /// Configuration file was not found at the specified path.
    #[error("Configuration file not found: {path}")]
    ConfigNotFound {
        /// The path that was not found.
        path: String,
    },

    /// Configuration file could not be parsed.
    #[error("Failed to parse configuration file '{path}': {message}")]
    ConfigParseError {
        /// The path to the file that failed to parse.
        path: String,
        /// A description of the parse error.
        message: String,
    },

    /// A configuration value was present but not usable.
    #[error("Invalid configuration value '{field}': {message}")]
    InvalidConfig {
        /// The offending field.
        field: String,
        /// Why the value was rejected.
        message: String,
    },

    /// A query could not be issued as described.
    #[error("Invalid query: {message}")]
    InvalidQuery {
        /// A description of the problem.
        message: String,
    },

    /// A live listener for one chunk of a query failed.
    #[error("Subscription to '{collection}' failed on chunk {chunk}: {message}")]
    Subscription {
        /// The collection being listened to.
        collection: String,
        /// Zero-based chunk index.
        chunk: usize,
        /// The underlying store message.
        message: String,
    },

    /// At least one chunk re-fetch failed during a merge cycle.
    #[error("{failed} of {total} chunk fetches for '{collection}' failed: {message}")]
    PartialChunkFailure {
        /// The collection being fetched.
        collection: String,
        /// Number of chunks that failed.
        failed: usize,
        /// Number of chunks in the cycle.
        total: usize,
        /// The first failure message.
        message: String,
    },

    /// A live subscription was opened outside of an async runtime.
    #[error("No async runtime available for live subscription: {message}")]
    RuntimeUnavailable {
        /// The runtime lookup failure.
        message: String,
    },

    /// A document store operation failed outside of a subscription.
    #[error("Store error: {message}")]
    Store {
        /// The underlying store message.
        message: String,
    },
}

/// A type alias for Results that return EngineError.
pub type EngineResult<T> = Result<T, EngineError>;
