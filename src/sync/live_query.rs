//! A query whose parameters can change over time.
//!
//! [`LiveQuery`] owns at most one subscription. Setting a different query
//! tears the old subscription down before opening the new one, and results
//! that belong to a superseded query are discarded. State is published on a
//! `tokio::sync::watch` channel.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

use super::query::QuerySpec;
use super::store::Document;
use super::synchronizer::{ChunkedSynchronizer, Subscription};

/// The published state of a [`LiveQuery`].
#[derive(Debug, Clone, PartialEq)]
pub struct QueryState<T> {
    /// The latest merged records.
    pub records: Vec<T>,
    /// True from the moment a query is set until its first result or error.
    pub loading: bool,
    /// The most recent error, cleared by the next successful update.
    pub error: Option<EngineError>,
}

impl<T> Default for QueryState<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            loading: false,
            error: None,
        }
    }
}

struct ActiveQuery {
    query: QuerySpec,
    _subscription: Subscription,
}

/// A live view over a query that may change or be switched off.
pub struct LiveQuery<T: Document> {
    synchronizer: ChunkedSynchronizer<T>,
    state: Arc<watch::Sender<QueryState<T>>>,
    generation: Arc<AtomicU64>,
    active: Option<ActiveQuery>,
}

impl<T: Document> LiveQuery<T> {
    /// Creates an idle live query.
    pub fn new(synchronizer: ChunkedSynchronizer<T>) -> Self {
        let (state, _) = watch::channel(QueryState::default());
        Self {
            synchronizer,
            state: Arc::new(state),
            generation: Arc::new(AtomicU64::new(0)),
            active: None,
        }
    }

    /// Subscribes to state changes.
    pub fn watch(&self) -> watch::Receiver<QueryState<T>> {
        self.state.subscribe()
    }

    /// Returns a copy of the current state.
    pub fn state(&self) -> QueryState<T> {
        self.state.borrow().clone()
    }

    /// The query currently being listened to.
    pub fn current_query(&self) -> Option<&QuerySpec> {
        self.active.as_ref().map(|active| &active.query)
    }

    /// Changes the query.
    ///
    /// `None` closes any subscription and publishes an empty, idle state.
    /// A query equal to the current one is a no-op. Anything else closes
    /// the current subscription, publishes a loading state with no records,
    /// and opens the new one.
    pub fn set_query(&mut self, query: Option<QuerySpec>) -> EngineResult<()> {
        let Some(query) = query else {
            self.close();
            self.state.send_replace(QueryState::default());
            return Ok(());
        };

        if self.current_query() == Some(&query) {
            return Ok(());
        }
        query.validate()?;

        self.close();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.send_replace(QueryState {
            records: Vec::new(),
            loading: true,
            error: None,
        });
        debug!(collection = %query.collection, generation, "Live query changed");

        let update_state = Arc::clone(&self.state);
        let update_generation = Arc::clone(&self.generation);
        let error_state = Arc::clone(&self.state);
        let error_generation = Arc::clone(&self.generation);

        let subscription = self.synchronizer.subscribe(
            query.clone(),
            move |records| {
                if update_generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                update_state.send_replace(QueryState {
                    records,
                    loading: false,
                    error: None,
                });
            },
            move |error| {
                if error_generation.load(Ordering::SeqCst) != generation {
                    return;
                }
                error_state.send_modify(|state| {
                    state.loading = false;
                    state.error = Some(error);
                });
            },
        );

        let subscription = match subscription {
            Ok(subscription) => subscription,
            Err(error) => {
                self.state.send_replace(QueryState {
                    records: Vec::new(),
                    loading: false,
                    error: Some(error.clone()),
                });
                return Err(error);
            }
        };

        self.active = Some(ActiveQuery {
            query,
            _subscription: subscription,
        });
        Ok(())
    }

    /// Closes the current subscription, keeping the last published state.
    pub fn close(&mut self) {
        if self.active.take().is_some() {
            self.generation.fetch_add(1, Ordering::SeqCst);
        }
    }
}
