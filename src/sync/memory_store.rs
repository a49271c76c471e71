//! An in-process document store.
//!
//! `MemoryStore` keeps collections in insertion order, evaluates queries
//! against each record's serialized JSON form, and pushes fresh snapshots to
//! listeners whenever a write touches their results. It also counts fetches
//! and listeners and can inject failures, which makes it the backend of
//! choice for tests and benchmarks.

use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use tracing::debug;

use super::query::QuerySpec;
use super::store::{
    Document, DocumentStore, ListenerEvent, ListenerRegistration, ListenerSink, StoreError,
};

struct Listener<T> {
    query: QuerySpec,
    sink: ListenerSink<T>,
}

struct FetchFault {
    value: Option<Value>,
    message: String,
}

impl FetchFault {
    fn applies_to(&self, query: &QuerySpec) -> bool {
        match (&self.value, &query.one_of) {
            (None, _) => true,
            (Some(value), Some(filter)) => filter.values.contains(value),
            (Some(_), None) => false,
        }
    }
}

struct Inner<T> {
    collections: HashMap<String, Vec<T>>,
    listeners: HashMap<u64, Listener<T>>,
    next_listener: u64,
    listens: usize,
    fetches: usize,
    fault: Option<FetchFault>,
    fetch_delay: Option<Duration>,
}

impl<T> Default for Inner<T> {
    fn default() -> Self {
        Self {
            collections: HashMap::new(),
            listeners: HashMap::new(),
            next_listener: 0,
            listens: 0,
            fetches: 0,
            fault: None,
            fetch_delay: None,
        }
    }
}

/// A thread-safe in-memory [`DocumentStore`].
///
/// Cloning the store yields another handle to the same data.
///
/// # Example
///
/// ```
/// use payroll_engine::models::Company;
/// use payroll_engine::sync::{DocumentStore, MemoryStore, QuerySpec};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let store = MemoryStore::new();
/// store.upsert("companies", Company { id: "co_1".to_string(), name: "North".to_string(), active: true });
///
/// let found = store.fetch(&QuerySpec::new("companies").where_eq("active", true)).await.unwrap();
/// assert_eq!(found.len(), 1);
/// # }
/// ```
pub struct MemoryStore<T> {
    inner: Arc<Mutex<Inner<T>>>,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Clone for MemoryStore<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
            _marker: PhantomData,
        }
    }
}

impl<T: Document + Serialize> Default for MemoryStore<T> {
    fn default() -> Self {
        Self::new()
    }
}

fn evaluate<T: Serialize + Clone>(records: Option<&Vec<T>>, query: &QuerySpec) -> Vec<T> {
    records
        .map(|records| {
            records
                .iter()
                .filter(|record| {
                    serde_json::to_value(record)
                        .map(|value| query.matches(&value))
                        .unwrap_or(false)
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

impl<T: Document + Serialize> MemoryStore<T> {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self {
            inner: Arc::new(Mutex::new(Inner::default())),
            _marker: PhantomData,
        }
    }

    fn lock(&self) -> MutexGuard<'_, Inner<T>> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Inserts or replaces records (matched by id) and notifies listeners.
    pub fn upsert_many<I>(&self, collection: &str, records: I)
    where
        I: IntoIterator<Item = T>,
    {
        let notifications = {
            let mut inner = self.lock();
            let stored = inner.collections.entry(collection.to_string()).or_default();
            let mut touched = Vec::new();
            for record in records {
                touched.extend(serde_json::to_value(&record).ok());
                match stored
                    .iter_mut()
                    .find(|existing| existing.document_id() == record.document_id())
                {
                    Some(existing) => {
                        touched.extend(serde_json::to_value(&*existing).ok());
                        *existing = record;
                    }
                    None => stored.push(record),
                }
            }
            Self::snapshots_for(&inner, collection, &touched)
        };
        Self::deliver(notifications);
    }

    /// Inserts or replaces one record and notifies listeners.
    pub fn upsert(&self, collection: &str, record: T) {
        self.upsert_many(collection, [record]);
    }

    /// Removes a record by id. Returns true when it existed.
    pub fn remove(&self, collection: &str, id: &str) -> bool {
        let (removed, notifications) = {
            let mut inner = self.lock();
            let mut touched = Vec::new();
            let removed = match inner.collections.get_mut(collection) {
                Some(stored) => {
                    let before = stored.len();
                    stored.retain(|record| {
                        if record.document_id() != id {
                            return true;
                        }
                        touched.extend(serde_json::to_value(record).ok());
                        false
                    });
                    stored.len() != before
                }
                None => false,
            };
            let notifications = if removed {
                Self::snapshots_for(&inner, collection, &touched)
            } else {
                Vec::new()
            };
            (removed, notifications)
        };
        Self::deliver(notifications);
        removed
    }

    /// Reports an error to every listener on `collection`.
    pub fn emit_listener_error(&self, collection: &str, message: &str) {
        let sinks: Vec<ListenerSink<T>> = {
            let inner = self.lock();
            inner
                .listeners
                .values()
                .filter(|l| l.query.collection == collection)
                .map(|l| Arc::clone(&l.sink))
                .collect()
        };
        for sink in sinks {
            sink(ListenerEvent::Error(StoreError::new(message)));
        }
    }

    /// Makes every later fetch fail with `message`.
    pub fn fail_fetches(&self, message: &str) {
        self.lock().fault = Some(FetchFault {
            value: None,
            message: message.to_string(),
        });
    }

    /// Makes later fetches fail when their membership filter contains
    /// `value`.
    pub fn fail_fetches_containing(&self, value: impl Into<Value>, message: &str) {
        self.lock().fault = Some(FetchFault {
            value: Some(value.into()),
            message: message.to_string(),
        });
    }

    /// Removes any injected fetch failure.
    pub fn clear_faults(&self) {
        self.lock().fault = None;
    }

    /// Delays every fetch by `delay`.
    pub fn set_fetch_delay(&self, delay: Option<Duration>) {
        self.lock().fetch_delay = delay;
    }

    /// Number of listeners currently attached.
    pub fn active_listeners(&self) -> usize {
        self.lock().listeners.len()
    }

    /// Number of listeners ever attached.
    pub fn total_listens(&self) -> usize {
        self.lock().listens
    }

    /// Number of fetches issued.
    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    /// Number of records in `collection`.
    pub fn len(&self, collection: &str) -> usize {
        self.lock().collections.get(collection).map_or(0, Vec::len)
    }

    /// Returns true when `collection` holds no records.
    pub fn is_empty(&self, collection: &str) -> bool {
        self.len(collection) == 0
    }

    /// Snapshots for the listeners whose results include any of the
    /// `touched` record versions, before or after the write.
    fn snapshots_for(
        inner: &Inner<T>,
        collection: &str,
        touched: &[Value],
    ) -> Vec<(ListenerSink<T>, Vec<T>)> {
        let records = inner.collections.get(collection);
        inner
            .listeners
            .values()
            .filter(|l| l.query.collection == collection)
            .filter(|l| touched.iter().any(|record| l.query.matches(record)))
            .map(|l| (Arc::clone(&l.sink), evaluate(records, &l.query)))
            .collect()
    }

    fn deliver(notifications: Vec<(ListenerSink<T>, Vec<T>)>) {
        for (sink, records) in notifications {
            sink(ListenerEvent::Snapshot(records));
        }
    }
}

#[async_trait]
impl<T: Document + Serialize> DocumentStore<T> for MemoryStore<T> {
    async fn fetch(&self, query: &QuerySpec) -> Result<Vec<T>, StoreError> {
        let delay = {
            let mut inner = self.lock();
            inner.fetches += 1;
            inner.fetch_delay
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let inner = self.lock();
        if let Some(fault) = inner.fault.as_ref().filter(|f| f.applies_to(query)) {
            return Err(StoreError::new(fault.message.clone()));
        }
        Ok(evaluate(inner.collections.get(&query.collection), query))
    }

    fn listen(&self, query: &QuerySpec, sink: ListenerSink<T>) -> ListenerRegistration {
        let (id, initial) = {
            let mut inner = self.lock();
            let id = inner.next_listener;
            inner.next_listener += 1;
            inner.listens += 1;
            inner.listeners.insert(
                id,
                Listener {
                    query: query.clone(),
                    sink: Arc::clone(&sink),
                },
            );
            (id, evaluate(inner.collections.get(&query.collection), query))
        };
        debug!(listener = id, collection = %query.collection, "Listener attached");
        sink(ListenerEvent::Snapshot(initial));

        let inner = Arc::clone(&self.inner);
        ListenerRegistration::new(move || {
            let removed = inner
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .listeners
                .remove(&id);
            drop(removed);
            debug!(listener = id, "Listener detached");
        })
    }
}
