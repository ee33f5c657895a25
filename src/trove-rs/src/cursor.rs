use serde_json::Value;
use std::collections::VecDeque;
use std::sync::Arc;

use trove_core::{CollectionResponse, Result};

use crate::batch::Slot;
use crate::client::Client;
use crate::transport::Request;

/// Rebuilds a domain value from a listing record and its owning response.
pub(crate) type Reconstruct<T> =
    Arc<dyn Fn(&Value, &CollectionResponse) -> Result<T> + Send + Sync>;

/// Which pagination link a cursor follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Backward,
}

/// A lazy, restartable sequence over a collection-shaped endpoint.
///
/// Nothing is fetched until the first [`next`](Cursor::next) call. When a
/// page runs dry the cursor follows the endpoint's link to the following
/// page, until a page arrives without one. Ordering is whatever the endpoint
/// defines; the cursor never re-sorts.
pub struct Cursor<T> {
    client: Client,
    origin: Request,
    direction: Direction,
    reconstruct: Reconstruct<T>,
    state: State<T>,
    aggregates: Vec<Value>,
}

enum State<T> {
    Unfetched,
    /// First page registered in a deferred execution context.
    Prefetched(Slot<CollectionResponse>),
    Page {
        items: VecDeque<T>,
        link: Option<String>,
    },
    Exhausted,
}

impl<T> Cursor<T> {
    pub(crate) fn new(
        client: Client,
        origin: Request,
        direction: Direction,
        reconstruct: Reconstruct<T>,
    ) -> Self {
        Self {
            client,
            origin,
            direction,
            reconstruct,
            state: State::Unfetched,
            aggregates: Vec::new(),
        }
    }

    pub(crate) fn prefetched(
        client: Client,
        origin: Request,
        direction: Direction,
        reconstruct: Reconstruct<T>,
        slot: Slot<CollectionResponse>,
    ) -> Self {
        let mut cursor = Self::new(client, origin, direction, reconstruct);
        cursor.state = State::Prefetched(slot);
        cursor
    }

    /// Produce the next element, fetching pages as needed.
    ///
    /// Returns `Ok(None)` once the sequence is exhausted. Forcing a cursor
    /// that was registered in a still-open deferred execution context fails
    /// fast with [`Error::ResultsNotReady`](trove_core::Error::ResultsNotReady)
    /// and leaves the cursor usable once the context has closed.
    pub async fn next(&mut self) -> Result<Option<T>> {
        loop {
            match std::mem::replace(&mut self.state, State::Exhausted) {
                State::Unfetched => {
                    let page = self.client.fetch_collection(self.origin.clone()).await?;
                    self.install(page)?;
                }
                State::Prefetched(slot) => match slot.get() {
                    Ok(page) => self.install(page)?,
                    Err(e) => {
                        // Not dispatched yet; keep the registration alive.
                        self.state = State::Prefetched(slot);
                        return Err(e);
                    }
                },
                State::Page { mut items, link } => {
                    if let Some(item) = items.pop_front() {
                        self.state = State::Page { items, link };
                        return Ok(Some(item));
                    }
                    match link {
                        Some(link) => {
                            let page = self.client.fetch_collection(Request::get(link)).await?;
                            self.install(page)?;
                        }
                        None => return Ok(None),
                    }
                }
                State::Exhausted => return Ok(None),
            }
        }
    }

    /// Drain every remaining element into a vector.
    pub async fn collect_all(&mut self) -> Result<Vec<T>> {
        let mut all = Vec::new();
        while let Some(item) = self.next().await? {
            all.push(item);
        }
        Ok(all)
    }

    /// A fresh cursor that re-issues the original query.
    ///
    /// Iteration never resumes from a stale link; restarting always starts
    /// over from page one.
    pub fn restart(&self) -> Cursor<T> {
        Cursor::new(
            self.client.clone(),
            self.origin.clone(),
            self.direction,
            self.reconstruct.clone(),
        )
    }

    /// An independent cursor walking the opposite direction from the same
    /// origin, for endpoints that provide `prev` links.
    pub fn reversed(&self) -> Cursor<T> {
        let direction = match self.direction {
            Direction::Forward => Direction::Backward,
            Direction::Backward => Direction::Forward,
        };
        Cursor::new(
            self.client.clone(),
            self.origin.clone(),
            direction,
            self.reconstruct.clone(),
        )
    }

    /// Aggregate results from the most recent page, for search queries that
    /// requested them.
    pub fn aggregates(&self) -> &[Value] {
        &self.aggregates
    }

    fn install(&mut self, page: CollectionResponse) -> Result<()> {
        let items = page
            .results()
            .iter()
            .map(|listing| (self.reconstruct)(listing, &page))
            .collect::<Result<VecDeque<T>>>()?;
        let link = match self.direction {
            Direction::Forward => page.next(),
            Direction::Backward => page.prev(),
        }
        .map(String::from);

        tracing::debug!(
            items = items.len(),
            has_link = link.is_some(),
            path = %self.origin.path,
            "page installed"
        );

        self.aggregates = page.aggregates().to_vec();
        self.state = State::Page { items, link };
        Ok(())
    }
}
