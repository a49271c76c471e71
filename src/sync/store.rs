//! The document store boundary.
//!
//! The synchronizer only needs two things from a backend: a one-shot fetch
//! and a live listener that pushes full result sets. Listener registrations
//! are detached explicitly or on drop.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::error::EngineError;
use crate::models::{Check, Client, Company, Employee};

use super::query::QuerySpec;

/// A failure reported by a document store.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{message}")]
pub struct StoreError {
    /// The backend's description of the failure.
    pub message: String,
}

impl StoreError {
    /// Creates a store error.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<StoreError> for EngineError {
    fn from(error: StoreError) -> Self {
        EngineError::Store {
            message: error.message,
        }
    }
}

/// A record that lives in a collection under a unique id.
pub trait Document: Clone + Send + Sync + 'static {
    /// The record's unique id within its collection.
    fn document_id(&self) -> &str;
}

impl Document for Check {
    fn document_id(&self) -> &str {
        &self.id
    }
}

impl Document for Client {
    fn document_id(&self) -> &str {
        &self.id
    }
}

impl Document for Company {
    fn document_id(&self) -> &str {
        &self.id
    }
}

impl Document for Employee {
    fn document_id(&self) -> &str {
        &self.id
    }
}

/// Something a live listener observed.
#[derive(Debug, Clone, PartialEq)]
pub enum ListenerEvent<T> {
    /// The complete current result set of the listened query.
    Snapshot(Vec<T>),
    /// The listener failed.
    Error(StoreError),
}

/// Receives listener events. Stores may call it from any thread.
pub type ListenerSink<T> = Arc<dyn Fn(ListenerEvent<T>) + Send + Sync>;

/// An attached live listener.
///
/// Dropping the registration detaches the listener.
pub struct ListenerRegistration {
    detach: Option<Box<dyn FnOnce() + Send>>,
}

impl ListenerRegistration {
    /// Wraps the backend's detach action.
    pub fn new(detach: impl FnOnce() + Send + 'static) -> Self {
        Self {
            detach: Some(Box::new(detach)),
        }
    }

    /// A registration with nothing to detach.
    pub fn inert() -> Self {
        Self { detach: None }
    }

    /// Detaches the listener. Later calls do nothing.
    pub fn detach(&mut self) {
        if let Some(detach) = self.detach.take() {
            detach();
        }
    }

    /// Returns true until the listener has been detached.
    pub fn is_attached(&self) -> bool {
        self.detach.is_some()
    }
}

impl fmt::Debug for ListenerRegistration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListenerRegistration")
            .field("attached", &self.is_attached())
            .finish()
    }
}

impl Drop for ListenerRegistration {
    fn drop(&mut self) {
        self.detach();
    }
}

/// A backend holding collections of `T`.
#[async_trait]
pub trait DocumentStore<T: Document>: Send + Sync {
    /// Runs `query` once.
    async fn fetch(&self, query: &QuerySpec) -> Result<Vec<T>, StoreError>;

    /// Attaches a live listener for `query`.
    ///
    /// The sink receives the current result set once attached and again
    /// after every change that affects it, until the registration is
    /// detached.
    fn listen(&self, query: &QuerySpec, sink: ListenerSink<T>) -> ListenerRegistration;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_registration_detaches_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let mut registration = ListenerRegistration::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        });
        assert!(registration.is_attached());
        registration.detach();
        registration.detach();
        drop(registration);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_registration_detaches_on_drop() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        {
            let _registration = ListenerRegistration::new(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            });
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_store_error_converts() {
        let error: EngineError = StoreError::new("unavailable").into();
        assert_eq!(
            error,
            EngineError::Store {
                message: "unavailable".to_string()
            }
        );
    }

    #[test]
    fn test_document_ids() {
        let check = Check {
            id: "chk_1".to_string(),
            ..Check::default()
        };
        assert_eq!(check.document_id(), "chk_1");
    }
}
