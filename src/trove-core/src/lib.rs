//! Trove Core Library
//!
//! This crate provides the domain types shared by the Trove client,
//! including:
//! - Entity snapshots (key-value items, historical refs, events)
//! - The typed error taxonomy and its (status, code) registry
//! - Response classification for completed HTTP outcomes
//! - Query descriptors and REST path assembly

pub mod config;
pub mod entity;
pub mod error;
pub mod models;
pub mod paths;
pub mod response;

// Re-export commonly used types
pub use config::ClientConfig;
pub use entity::{Event, KeyValue, Ref, SearchMatch, WriteCondition};
pub use error::{Error, ErrorKind, Result};
pub use models::{EventQuery, ListQuery, RefQuery, RelationQuery, SearchQuery};
pub use response::{Body, CollectionResponse, ItemResponse, Response};
