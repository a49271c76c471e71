//! Chunked live-query synchronization.
//!
//! Stores cap the number of values in a membership filter. A query that
//! exceeds the cap is split into chunks, each with its own live listener.
//! Whenever any chunk reports a change, every chunk is re-fetched
//! concurrently and the results are merged into one deduplicated set, so
//! subscribers always see a single consistent snapshot.
//!
//! Each subscription is driven by one task that reads listener events from
//! a channel. Events that arrive while a merge cycle runs are coalesced into
//! the next cycle.

use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tokio::task::{JoinHandle, JoinSet};
use tracing::{debug, warn};

use crate::config::SyncConfig;
use crate::error::{EngineError, EngineResult};

use super::query::QuerySpec;
use super::store::{Document, DocumentStore, ListenerEvent, ListenerRegistration, ListenerSink};

type UpdateCallback<T> = Box<dyn FnMut(Vec<T>) + Send>;
type ErrorCallback = Box<dyn FnMut(EngineError) + Send>;

struct Callbacks<T> {
    on_update: UpdateCallback<T>,
    on_error: ErrorCallback,
}

/// Callback slot shared between a subscription and its driver task.
/// Emptied on unsubscribe so nothing fires afterwards.
type CallbackSlot<T> = Arc<Mutex<Option<Callbacks<T>>>>;

fn emit_update<T>(slot: &Mutex<Option<Callbacks<T>>>, records: Vec<T>) {
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(callbacks) = guard.as_mut() {
        (callbacks.on_update)(records);
    }
}

fn emit_error<T>(slot: &Mutex<Option<Callbacks<T>>>, error: EngineError) {
    let mut guard = slot.lock().unwrap_or_else(PoisonError::into_inner);
    if let Some(callbacks) = guard.as_mut() {
        (callbacks.on_error)(error);
    }
}

/// Merges per-chunk result sets into one list without duplicate ids.
///
/// Records keep the position of their first appearance; when an id appears
/// again the later copy replaces the earlier one.
///
/// # Example
///
/// ```
/// use payroll_engine::models::Company;
/// use payroll_engine::sync::merge_chunks;
///
/// let company = |id: &str, name: &str| Company { id: id.to_string(), name: name.to_string(), active: true };
/// let merged = merge_chunks(vec![
///     vec![company("a", "old"), company("b", "B")],
///     vec![company("a", "new")],
/// ]);
/// assert_eq!(merged.len(), 2);
/// assert_eq!(merged[0].name, "new");
/// ```
pub fn merge_chunks<T, I>(chunks: I) -> Vec<T>
where
    T: Document,
    I: IntoIterator<Item = Vec<T>>,
{
    let mut merged: Vec<T> = Vec::new();
    let mut positions: HashMap<String, usize> = HashMap::new();
    for record in chunks.into_iter().flatten() {
        match positions.get(record.document_id()) {
            Some(&position) => merged[position] = record,
            None => {
                positions.insert(record.document_id().to_string(), merged.len());
                merged.push(record);
            }
        }
    }
    merged
}

struct ChunkEvent<T> {
    chunk: usize,
    event: ListenerEvent<T>,
}

struct Driver<T: Document> {
    store: Arc<dyn DocumentStore<T>>,
    collection: String,
    chunks: Vec<QuerySpec>,
    callbacks: CallbackSlot<T>,
    events: mpsc::UnboundedReceiver<ChunkEvent<T>>,
}

impl<T: Document> Driver<T> {
    async fn run(mut self) {
        while let Some(first) = self.events.recv().await {
            let mut batch = vec![first];
            while let Ok(next) = self.events.try_recv() {
                batch.push(next);
            }
            self.handle_batch(batch).await;
        }
        debug!(collection = %self.collection, "Subscription driver finished");
    }

    async fn handle_batch(&mut self, batch: Vec<ChunkEvent<T>>) {
        let mut latest: Option<Vec<T>> = None;
        for ChunkEvent { chunk, event } in batch {
            match event {
                ListenerEvent::Snapshot(records) => latest = Some(records),
                ListenerEvent::Error(error) => {
                    warn!(
                        collection = %self.collection,
                        chunk,
                        error = %error,
                        "Chunk listener failed"
                    );
                    emit_error(
                        &self.callbacks,
                        EngineError::Subscription {
                            collection: self.collection.clone(),
                            chunk,
                            message: error.message,
                        },
                    );
                }
            }
        }

        let Some(latest) = latest else {
            return;
        };

        if self.chunks.len() == 1 {
            emit_update(&self.callbacks, merge_chunks([latest]));
            return;
        }

        match self.fetch_all().await {
            Ok(records) => {
                debug!(
                    collection = %self.collection,
                    chunks = self.chunks.len(),
                    records = records.len(),
                    "Merged chunk results"
                );
                emit_update(&self.callbacks, records);
            }
            Err(error) => {
                warn!(collection = %self.collection, error = %error, "Chunk re-fetch failed");
                emit_error(&self.callbacks, error);
            }
        }
    }

    async fn fetch_all(&self) -> EngineResult<Vec<T>> {
        let mut fetches = JoinSet::new();
        for (index, query) in self.chunks.iter().cloned().enumerate() {
            let store = Arc::clone(&self.store);
            fetches.spawn(async move { (index, store.fetch(&query).await) });
        }

        let mut results: Vec<Option<Vec<T>>> = (0..self.chunks.len()).map(|_| None).collect();
        let mut failures: Vec<(usize, String)> = Vec::new();
        while let Some(joined) = fetches.join_next().await {
            match joined {
                Ok((index, Ok(records))) => results[index] = Some(records),
                Ok((index, Err(error))) => failures.push((index, error.message)),
                Err(error) => failures.push((usize::MAX, error.to_string())),
            }
        }

        if !failures.is_empty() {
            failures.sort_by_key(|(index, _)| *index);
            return Err(EngineError::PartialChunkFailure {
                collection: self.collection.clone(),
                failed: failures.len(),
                total: self.chunks.len(),
                message: failures.swap_remove(0).1,
            });
        }

        Ok(merge_chunks(results.into_iter().flatten()))
    }
}

/// A live subscription created by [`ChunkedSynchronizer::subscribe`].
///
/// Dropping the subscription unsubscribes it.
pub struct Subscription {
    close_callbacks: Option<Box<dyn FnOnce() + Send>>,
    registrations: Vec<ListenerRegistration>,
    task: Option<JoinHandle<()>>,
    chunk_count: usize,
}

impl Subscription {
    fn inert() -> Self {
        Self {
            close_callbacks: None,
            registrations: Vec::new(),
            task: None,
            chunk_count: 0,
        }
    }

    /// Number of chunk listeners this subscription opened.
    pub fn chunk_count(&self) -> usize {
        self.chunk_count
    }

    /// Returns true until the subscription is closed.
    pub fn is_active(&self) -> bool {
        self.registrations.iter().any(ListenerRegistration::is_attached)
    }

    /// Detaches every chunk listener and cancels in-flight fetches.
    ///
    /// No callback runs after this returns. Must not be called from inside
    /// the subscription's own callbacks.
    pub fn unsubscribe(&mut self) {
        if let Some(close) = self.close_callbacks.take() {
            close();
        }
        if let Some(task) = self.task.take() {
            task.abort();
        }
        for registration in &mut self.registrations {
            registration.detach();
        }
        if self.chunk_count > 0 {
            debug!(chunks = self.chunk_count, "Subscription closed");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("chunk_count", &self.chunk_count)
            .field("active", &self.is_active())
            .finish()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

/// Opens live queries whose membership filters may exceed the store's cap.
pub struct ChunkedSynchronizer<T: Document> {
    store: Arc<dyn DocumentStore<T>>,
    chunk_size: usize,
}

impl<T: Document> Clone for ChunkedSynchronizer<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            chunk_size: self.chunk_size,
        }
    }
}

impl<T: Document> ChunkedSynchronizer<T> {
    /// Creates a synchronizer over `store`. A `chunk_size` of zero is
    /// treated as one.
    pub fn new(store: Arc<dyn DocumentStore<T>>, chunk_size: usize) -> Self {
        Self {
            store,
            chunk_size: chunk_size.max(1),
        }
    }

    /// Creates a synchronizer using the configured chunk size.
    pub fn from_config(store: Arc<dyn DocumentStore<T>>, config: &SyncConfig) -> Self {
        Self::new(store, config.chunk_size)
    }

    /// The maximum membership values per chunk.
    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    /// Opens a live subscription.
    ///
    /// A query whose membership filter fits in one chunk gets a single
    /// listener whose snapshots are emitted directly. Larger filters get
    /// one listener per chunk, and every change triggers a concurrent
    /// re-fetch of all chunks followed by one merged emission. An empty
    /// membership filter emits an empty set immediately and opens nothing.
    ///
    /// Listener failures reach `on_error` as [`EngineError::Subscription`];
    /// a failed merge cycle reaches it as
    /// [`EngineError::PartialChunkFailure`] and emits no update, so the
    /// subscriber keeps its last good state.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn subscribe<U, E>(
        &self,
        query: QuerySpec,
        mut on_update: U,
        on_error: E,
    ) -> EngineResult<Subscription>
    where
        U: FnMut(Vec<T>) + Send + 'static,
        E: FnMut(EngineError) + Send + 'static,
    {
        query.validate()?;

        let chunks = query.chunks(self.chunk_size);
        if chunks.is_empty() {
            debug!(collection = %query.collection, "Empty membership filter; nothing to listen to");
            on_update(Vec::new());
            return Ok(Subscription::inert());
        }

        let runtime = Handle::try_current().map_err(|error| EngineError::RuntimeUnavailable {
            message: error.to_string(),
        })?;

        let callbacks: CallbackSlot<T> = Arc::new(Mutex::new(Some(Callbacks {
            on_update: Box::new(on_update),
            on_error: Box::new(on_error),
        })));

        let (sender, receiver) = mpsc::unbounded_channel();
        let registrations: Vec<ListenerRegistration> = chunks
            .iter()
            .enumerate()
            .map(|(chunk, chunk_query)| {
                let sender = sender.clone();
                let sink: ListenerSink<T> = Arc::new(move |event: ListenerEvent<T>| {
                    let _ = sender.send(ChunkEvent { chunk, event });
                });
                self.store.listen(chunk_query, sink)
            })
            .collect();
        drop(sender);

        let chunk_count = chunks.len();
        debug!(
            collection = %query.collection,
            chunks = chunk_count,
            chunk_size = self.chunk_size,
            "Subscription opened"
        );

        let driver = Driver {
            store: Arc::clone(&self.store),
            collection: query.collection,
            chunks,
            callbacks: Arc::clone(&callbacks),
            events: receiver,
        };
        let task = runtime.spawn(driver.run());

        Ok(Subscription {
            close_callbacks: Some(Box::new(move || {
                callbacks
                    .lock()
                    .unwrap_or_else(PoisonError::into_inner)
                    .take();
            })),
            registrations,
            task: Some(task),
            chunk_count,
        })
    }
}
