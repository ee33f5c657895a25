use futures::future::{join_all, BoxFuture};
use futures::Future;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

use trove_core::{
    CollectionResponse, Error, Event, KeyValue, ListQuery, Result, SearchMatch, SearchQuery,
    WriteCondition,
};

use crate::client::{self, Client};
use crate::cursor::{Cursor, Direction};

/// A deferred result cell, filled exactly once when its batch flushes.
///
/// Before the flush every observation fails fast with
/// [`Error::ResultsNotReady`]; afterwards each holder receives a clone of
/// the same `Result`. Failures stay isolated in their own slot and never
/// affect siblings.
pub struct Slot<T> {
    cell: Arc<OnceLock<Result<T>>>,
}

impl<T> Clone for Slot<T> {
    fn clone(&self) -> Self {
        Self {
            cell: Arc::clone(&self.cell),
        }
    }
}

impl<T> Slot<T> {
    pub(crate) fn empty() -> Self {
        Self {
            cell: Arc::new(OnceLock::new()),
        }
    }

    pub(crate) fn fill(&self, result: Result<T>) {
        // A slot is filled by exactly one registered intent; a second fill
        // would be a bug, not a race to resolve.
        let _ = self.cell.set(result);
    }

    /// True once the owning batch has flushed.
    pub fn is_ready(&self) -> bool {
        self.cell.get().is_some()
    }
}

impl<T: Clone> Slot<T> {
    /// The intent's result, or [`Error::ResultsNotReady`] while the owning
    /// context is still open.
    pub fn get(&self) -> Result<T> {
        match self.cell.get() {
            Some(result) => result.clone(),
            None => Err(Error::ResultsNotReady),
        }
    }
}

/// A deferred execution context.
///
/// Obtained only inside [`Client::run_batch`]; registered intents do not
/// execute individually but together, exactly once, after the closure
/// returns. The handle cannot outlive the closure with a usable
/// registration surface, so one context per client handle holds by
/// construction.
pub struct Batch {
    client: Client,
    pending: Vec<BoxFuture<'static, ()>>,
}

impl Batch {
    fn new(client: Client) -> Self {
        Self {
            client,
            pending: Vec::new(),
        }
    }

    fn register<T, F>(&mut self, intent: F) -> Slot<T>
    where
        T: Send + Sync + 'static,
        F: Future<Output = Result<T>> + Send + 'static,
    {
        let slot = Slot::empty();
        let cell = slot.clone();
        self.pending.push(Box::pin(async move {
            cell.fill(intent.await);
        }));
        slot
    }

    fn register_page(&mut self, request: &crate::transport::Request) -> Slot<CollectionResponse> {
        let client = self.client.clone();
        let request = request.clone();
        self.register(async move { client.fetch_collection(request).await })
    }

    /// Register a read of the current value at `(collection, key)`.
    pub fn get(&mut self, collection: &str, key: &str) -> Slot<KeyValue> {
        let client = self.client.clone();
        let collection = collection.to_string();
        let key = key.to_string();
        self.register(async move { client.get(&collection, &key).await })
    }

    /// Register a conditional write.
    pub fn put(
        &mut self,
        collection: &str,
        key: &str,
        value: Value,
        condition: WriteCondition,
    ) -> Slot<KeyValue> {
        let client = self.client.clone();
        let collection = collection.to_string();
        let key = key.to_string();
        self.register(async move { client.put(&collection, &key, value, condition).await })
    }

    /// Register a delete; `ref_` of `None` deletes unconditionally.
    pub fn delete(&mut self, collection: &str, key: &str, ref_: Option<&str>) -> Slot<()> {
        let client = self.client.clone();
        let collection = collection.to_string();
        let key = key.to_string();
        let ref_ = ref_.map(String::from);
        self.register(async move { client.delete(&collection, &key, ref_.as_deref()).await })
    }

    /// Register an event creation with a service-assigned timestamp.
    pub fn create_event(
        &mut self,
        collection: &str,
        key: &str,
        event_type: &str,
        value: Value,
    ) -> Slot<Event> {
        let client = self.client.clone();
        let collection = collection.to_string();
        let key = key.to_string();
        let event_type = event_type.to_string();
        self.register(async move {
            client
                .create_event(&collection, &key, &event_type, value, None)
                .await
        })
    }

    /// Register a key listing; the returned cursor's first page resolves
    /// with the batch and is never re-fetched afterwards.
    pub fn list(&mut self, collection: &str, query: &ListQuery) -> Cursor<KeyValue> {
        let request = client::list_request(collection, query);
        let slot = self.register_page(&request);
        Cursor::prefetched(
            self.client.clone(),
            request,
            Direction::Forward,
            client::kv_reconstruct(collection),
            slot,
        )
    }

    /// Register a search; same prefetching behavior as [`Batch::list`].
    pub fn search(
        &mut self,
        collection: &str,
        lucene: &str,
        query: &SearchQuery,
    ) -> Cursor<SearchMatch> {
        let request = client::search_request(collection, lucene, query);
        let slot = self.register_page(&request);
        Cursor::prefetched(
            self.client.clone(),
            request,
            Direction::Forward,
            client::search_reconstruct(collection),
            slot,
        )
    }
}

impl Client {
    /// Run `f` with a deferred execution context.
    ///
    /// Intents registered inside `f` dispatch together in one combined
    /// round once `f` returns; only then do their slots fill. One intent's
    /// failure neither cancels nor taints its siblings.
    pub async fn run_batch<F, R>(&self, f: F) -> R
    where
        F: FnOnce(&mut Batch) -> R,
    {
        let mut batch = Batch::new(self.clone());
        let out = f(&mut batch);
        let pending = std::mem::take(&mut batch.pending);
        tracing::debug!(requests = pending.len(), "dispatching deferred context");
        join_all(pending).await;
        out
    }
}
