//! Trove Client Library
//!
//! HTTP client for the Trove document/graph/search service: typed access to
//! key-value items and their version history, event timelines, and Lucene
//! search, with optimistic concurrency on every write and a deferred
//! execution context for combining independent requests into one round.
//!
//! ```no_run
//! use trove_rs::{Client, ListQuery, WriteCondition};
//!
//! # async fn example() -> trove_rs::Result<()> {
//! let client = Client::new("https://api.trove.io", "my-api-key")?;
//!
//! let kv = client
//!     .put("users", "alice", serde_json::json!({ "name": "Alice" }), WriteCondition::IfAbsent)
//!     .await?;
//!
//! let mut users = client.list("users", &ListQuery::new().limit(50));
//! while let Some(user) = users.next().await? {
//!     println!("{}: {}", user.key, user.value);
//! }
//! # let _ = kv;
//! # Ok(())
//! # }
//! ```

mod batch;
mod client;
mod cursor;
mod transport;

pub use batch::{Batch, Slot};
pub use client::Client;
pub use cursor::{Cursor, Direction};
pub use transport::{HttpTransport, Method, RawResponse, Request, Transport};

// Re-export the domain types from trove-core
pub use trove_core::{
    Body, ClientConfig, CollectionResponse, Error, ErrorKind, Event, EventQuery, ItemResponse,
    KeyValue, ListQuery, Ref, RefQuery, RelationQuery, Response, Result, SearchMatch,
    SearchQuery, WriteCondition,
};
