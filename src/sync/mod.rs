//! Live data synchronization.
//!
//! This module connects the engine to a document store: query descriptions,
//! the store boundary trait, an in-memory store, the chunked synchronizer
//! that works around "in"-filter size caps, and a live query wrapper that
//! handles parameter changes.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use payroll_engine::models::Check;
//! use payroll_engine::sync::{ChunkedSynchronizer, DocumentStore, LiveQuery, MemoryStore, QuerySpec};
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() {
//! let store: MemoryStore<Check> = MemoryStore::new();
//! let backend: Arc<dyn DocumentStore<Check>> = Arc::new(store.clone());
//! let mut query = LiveQuery::new(ChunkedSynchronizer::new(backend, 10));
//!
//! let client_ids: Vec<String> = (0..25).map(|i| format!("cl_{}", i)).collect();
//! query.set_query(Some(QuerySpec::new("checks").where_in("clientId", client_ids))).unwrap();
//! assert_eq!(store.active_listeners(), 3);
//!
//! drop(query);
//! assert_eq!(store.active_listeners(), 0);
//! # }
//! ```

mod live_query;
mod memory_store;
mod query;
mod store;
mod synchronizer;

pub use live_query::{LiveQuery, QueryState};
pub use memory_store::MemoryStore;
pub use query::{InFilter, QuerySpec};
pub use store::{
    Document, DocumentStore, ListenerEvent, ListenerRegistration, ListenerSink, StoreError,
};
pub use synchronizer::{ChunkedSynchronizer, Subscription, merge_chunks};
