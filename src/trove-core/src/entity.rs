use chrono::{DateTime, TimeZone, Utc};
use serde_json::Value;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};

use crate::error::{Error, Result};
use crate::models::ListingPath;
use crate::response::{CollectionResponse, ItemResponse};

/// Version state of an entity snapshot.
///
/// Tokens are opaque server-issued identifiers; the only operation defined
/// on them is string equality.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Ref {
    /// A specific version of the value.
    Token(String),
    /// The key must not exist; the next write is a creation.
    Absent,
    /// No version information; writes are unconditional.
    Unknown,
}

impl Ref {
    pub fn token(&self) -> Option<&str> {
        match self {
            Ref::Token(t) => Some(t),
            _ => None,
        }
    }
}

/// Conditional-write intent, rendered as HTTP precondition headers.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum WriteCondition {
    /// Write regardless of the remote state.
    #[default]
    None,
    /// Write only if the remote ref equals this token.
    IfMatch(String),
    /// Write only if the key does not exist.
    IfAbsent,
}

impl WriteCondition {
    /// The precondition header for this intent, if any.
    pub fn header(&self) -> Option<(&'static str, String)> {
        match self {
            WriteCondition::None => None,
            WriteCondition::IfMatch(token) => Some(("If-Match", format!("\"{token}\""))),
            WriteCondition::IfAbsent => Some(("If-None-Match", "\"*\"".to_string())),
        }
    }

    /// Condition implied by a snapshot's version state.
    pub fn from_ref(ref_: &Ref) -> Self {
        match ref_ {
            Ref::Token(t) => WriteCondition::IfMatch(t.clone()),
            Ref::Absent => WriteCondition::IfAbsent,
            Ref::Unknown => WriteCondition::None,
        }
    }
}

/// An immutable snapshot of the value stored at `(collection, key)`.
///
/// Writes never mutate a snapshot; every successful write produces a new
/// one, so older snapshots held by concurrently-iterating cursors stay
/// coherent.
#[derive(Debug, Clone)]
pub struct KeyValue {
    pub collection: String,
    pub key: String,
    pub ref_: Ref,
    pub value: Value,
    /// True when this snapshot marks a deletion retained in history.
    pub tombstone: bool,
    /// Server time at which this ref was written.
    pub reftime: Option<DateTime<Utc>>,
    /// Server time of the request that produced this snapshot.
    pub last_request_time: Option<DateTime<Utc>>,
    /// Relevance score; populated only by search reconstruction.
    pub score: Option<f64>,
    /// Geo distance; populated only by search reconstruction.
    pub distance: Option<f64>,
}

impl KeyValue {
    /// Rebuild an item from a listing record and its owning response.
    pub fn from_listing(
        collection: &str,
        listing: &Value,
        response: &CollectionResponse,
    ) -> Result<Self> {
        let path = listing_path(listing)?;
        let value = listing.get("value").cloned().unwrap_or(Value::Null);
        let reftime = listing
            .get("reftime")
            .and_then(Value::as_i64)
            .or(path.reftime)
            .and_then(millis_to_datetime);

        Ok(Self {
            collection: path.collection.unwrap_or_else(|| collection.to_string()),
            key: path.key,
            ref_: match path.ref_ {
                Some(token) => Ref::Token(token),
                None => Ref::Unknown,
            },
            value,
            tombstone: path.tombstone,
            reftime,
            last_request_time: response.response().request_time(),
            score: listing.get("score").and_then(Value::as_f64),
            distance: listing.get("distance").and_then(Value::as_f64),
        })
    }

    /// Rebuild an item from a bodyless write acknowledgement.
    ///
    /// The caller-supplied value is echoed back as the new snapshot; the
    /// version token comes from the acknowledgement's ETag or location.
    pub fn from_write_response(
        collection: &str,
        key: &str,
        value: Value,
        response: &ItemResponse,
    ) -> Self {
        Self {
            collection: collection.to_string(),
            key: key.to_string(),
            ref_: match response.ref_token() {
                Some(token) => Ref::Token(token.to_string()),
                None => Ref::Unknown,
            },
            value,
            tombstone: false,
            reftime: None,
            last_request_time: response.response().request_time(),
            score: None,
            distance: None,
        }
    }

    /// The snapshot that replaces this one after a successful delete.
    pub fn destroyed(&self) -> Self {
        Self {
            collection: self.collection.clone(),
            key: self.key.clone(),
            ref_: Ref::Unknown,
            value: Value::Null,
            tombstone: false,
            reftime: None,
            last_request_time: self.last_request_time,
            score: None,
            distance: None,
        }
    }
}

// Identity is (collection, key); ref and value are excluded so that two
// snapshots of the same logical item compare equal.
impl PartialEq for KeyValue {
    fn eq(&self, other: &Self) -> bool {
        self.collection == other.collection && self.key == other.key
    }
}

impl Eq for KeyValue {}

impl Hash for KeyValue {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.collection.hash(state);
        self.key.hash(state);
    }
}

impl PartialOrd for KeyValue {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

// Ordered by key, with collection as tiebreak; never by ref or value.
impl Ord for KeyValue {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key
            .cmp(&other.key)
            .then_with(|| self.collection.cmp(&other.collection))
    }
}

/// A single search hit: the item plus its relevance metadata.
#[derive(Debug, Clone)]
pub struct SearchMatch {
    pub score: Option<f64>,
    pub distance: Option<f64>,
    pub item: KeyValue,
}

impl SearchMatch {
    pub fn from_listing(
        collection: &str,
        listing: &Value,
        response: &CollectionResponse,
    ) -> Result<Self> {
        let item = KeyValue::from_listing(collection, listing, response)?;
        Ok(Self {
            score: item.score,
            distance: item.distance,
            item,
        })
    }
}

/// An immutable event snapshot on a key's timeline.
#[derive(Debug, Clone)]
pub struct Event {
    pub collection: String,
    pub key: String,
    pub event_type: String,
    /// Epoch milliseconds assigned by the service.
    pub timestamp: i64,
    /// Disambiguates events sharing a timestamp.
    pub ordinal: u64,
    pub ref_: Ref,
    pub value: Value,
    pub last_request_time: Option<DateTime<Utc>>,
}

impl Event {
    /// Rebuild an event from a listing record and its owning response.
    pub fn from_listing(
        collection: &str,
        listing: &Value,
        response: &CollectionResponse,
    ) -> Result<Self> {
        let path = listing_path(listing)?;
        let event_type = path
            .event_type
            .ok_or_else(|| Error::Decode("event listing has no type".to_string()))?;
        let timestamp = listing
            .get("timestamp")
            .and_then(Value::as_i64)
            .or(path.timestamp)
            .ok_or_else(|| Error::Decode("event listing has no timestamp".to_string()))?;
        let ordinal = listing
            .get("ordinal")
            .and_then(Value::as_u64)
            .or(path.ordinal)
            .unwrap_or(0);

        Ok(Self {
            collection: path.collection.unwrap_or_else(|| collection.to_string()),
            key: path.key,
            event_type,
            timestamp,
            ordinal,
            ref_: match path.ref_ {
                Some(token) => Ref::Token(token),
                None => Ref::Unknown,
            },
            value: listing.get("value").cloned().unwrap_or(Value::Null),
            last_request_time: response.response().request_time(),
        })
    }

    /// Rebuild an event from a creation acknowledgement.
    ///
    /// The timestamp and ordinal the service assigned are only present in
    /// the location path, e.g. `/v1/users/alice/events/login/1722..0/9`.
    pub fn from_write_response(
        collection: &str,
        key: &str,
        event_type: &str,
        value: Value,
        response: &ItemResponse,
    ) -> Result<Self> {
        let location = response
            .location()
            .ok_or_else(|| Error::Decode("event acknowledgement has no location".to_string()))?;
        let mut segments = location.trim_end_matches('/').rsplit('/');
        let ordinal = segments
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Decode(format!("event location has no ordinal: {location}")))?;
        let timestamp = segments
            .next()
            .and_then(|s| s.parse().ok())
            .ok_or_else(|| Error::Decode(format!("event location has no timestamp: {location}")))?;

        Ok(Self {
            collection: collection.to_string(),
            key: key.to_string(),
            event_type: event_type.to_string(),
            timestamp,
            ordinal,
            ref_: match response.ref_token() {
                Some(token) => Ref::Token(token.to_string()),
                None => Ref::Unknown,
            },
            value,
            last_request_time: response.response().request_time(),
        })
    }
}

// Identity is (collection, key, type, timestamp, ordinal).
impl PartialEq for Event {
    fn eq(&self, other: &Self) -> bool {
        self.collection == other.collection
            && self.key == other.key
            && self.event_type == other.event_type
            && self.timestamp == other.timestamp
            && self.ordinal == other.ordinal
    }
}

impl Eq for Event {}

impl Hash for Event {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.collection.hash(state);
        self.key.hash(state);
        self.event_type.hash(state);
        self.timestamp.hash(state);
        self.ordinal.hash(state);
    }
}

fn listing_path(listing: &Value) -> Result<ListingPath> {
    let path = listing
        .get("path")
        .ok_or_else(|| Error::Decode("listing record has no path".to_string()))?;
    serde_json::from_value(path.clone())
        .map_err(|e| Error::Decode(format!("malformed listing path: {e}")))
}

fn millis_to_datetime(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::response::Response;
    use serde_json::json;
    use std::collections::HashMap;

    fn collection_response(body: Value) -> CollectionResponse {
        let headers: HashMap<String, String> = [
            ("content-type".to_string(), "application/json".to_string()),
            ("date".to_string(), "Wed, 05 Aug 2026 10:21:14 GMT".to_string()),
        ]
        .into_iter()
        .collect();
        let raw = serde_json::to_vec(&body).unwrap();
        CollectionResponse::new(Response::from_parts(200, &headers, &raw)).unwrap()
    }

    fn item_response(headers: &[(&str, &str)]) -> ItemResponse {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ItemResponse::new(Response::from_parts(201, &headers, b""))
    }

    #[test]
    fn test_write_condition_headers() {
        assert_eq!(WriteCondition::None.header(), None);
        assert_eq!(
            WriteCondition::IfMatch("R1".to_string()).header(),
            Some(("If-Match", "\"R1\"".to_string()))
        );
        assert_eq!(
            WriteCondition::IfAbsent.header(),
            Some(("If-None-Match", "\"*\"".to_string()))
        );
    }

    #[test]
    fn test_write_condition_from_ref() {
        assert_eq!(
            WriteCondition::from_ref(&Ref::Token("R1".to_string())),
            WriteCondition::IfMatch("R1".to_string())
        );
        assert_eq!(WriteCondition::from_ref(&Ref::Absent), WriteCondition::IfAbsent);
        assert_eq!(WriteCondition::from_ref(&Ref::Unknown), WriteCondition::None);
    }

    #[test]
    fn test_key_value_from_listing() {
        let response = collection_response(json!({ "count": 1, "results": [] }));
        let listing = json!({
            "path": { "collection": "users", "key": "alice", "ref": "R1" },
            "value": { "name": "Alice" },
            "reftime": 1722903000000i64
        });
        let kv = KeyValue::from_listing("users", &listing, &response).unwrap();
        assert_eq!(kv.key, "alice");
        assert_eq!(kv.ref_, Ref::Token("R1".to_string()));
        assert_eq!(kv.value, json!({ "name": "Alice" }));
        assert!(!kv.tombstone);
        assert!(kv.reftime.is_some());
        assert!(kv.last_request_time.is_some());
    }

    #[test]
    fn test_tombstone_listing() {
        let response = collection_response(json!({ "count": 1, "results": [] }));
        let listing = json!({
            "path": { "collection": "users", "key": "alice", "ref": "R2", "tombstone": true }
        });
        let kv = KeyValue::from_listing("users", &listing, &response).unwrap();
        assert!(kv.tombstone);
        assert_eq!(kv.value, Value::Null);
    }

    #[test]
    fn test_key_value_from_write_response() {
        let item = item_response(&[
            ("ETag", "\"R9\""),
            ("Location", "/v1/users/alice/refs/R9"),
            ("Date", "Wed, 05 Aug 2026 10:21:14 GMT"),
        ]);
        let kv =
            KeyValue::from_write_response("users", "alice", json!({ "name": "Alice" }), &item);
        assert_eq!(kv.ref_, Ref::Token("R9".to_string()));
        assert_eq!(kv.value, json!({ "name": "Alice" }));
        assert!(kv.last_request_time.is_some());
    }

    #[test]
    fn test_identity_excludes_ref_and_value() {
        let item = item_response(&[("ETag", "\"R1\"")]);
        let a = KeyValue::from_write_response("users", "alice", json!({ "v": 1 }), &item);
        let item = item_response(&[("ETag", "\"R2\"")]);
        let b = KeyValue::from_write_response("users", "alice", json!({ "v": 2 }), &item);
        let c = KeyValue::from_write_response("admins", "alice", json!({ "v": 1 }), &item);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_ordering_by_key() {
        let item = item_response(&[]);
        let mut items = vec![
            KeyValue::from_write_response("c", "mango", Value::Null, &item),
            KeyValue::from_write_response("c", "apple", Value::Null, &item),
            KeyValue::from_write_response("c", "kiwi", Value::Null, &item),
        ];
        items.sort();
        let keys: Vec<&str> = items.iter().map(|kv| kv.key.as_str()).collect();
        assert_eq!(keys, ["apple", "kiwi", "mango"]);
    }

    #[test]
    fn test_destroyed_snapshot() {
        let item = item_response(&[("ETag", "\"R1\"")]);
        let kv = KeyValue::from_write_response("users", "alice", json!({ "v": 1 }), &item);
        let gone = kv.destroyed();
        assert_eq!(gone.ref_, Ref::Unknown);
        assert_eq!(gone.value, Value::Null);
        assert_eq!(gone, kv); // same identity
    }

    #[test]
    fn test_event_from_listing() {
        let response = collection_response(json!({ "count": 1, "results": [] }));
        let listing = json!({
            "path": {
                "collection": "users", "key": "alice", "ref": "E1",
                "type": "login", "timestamp": 1722903000000i64, "ordinal": 4
            },
            "value": { "ip": "10.0.0.7" },
            "timestamp": 1722903000000i64,
            "ordinal": 4
        });
        let event = Event::from_listing("users", &listing, &response).unwrap();
        assert_eq!(event.event_type, "login");
        assert_eq!(event.timestamp, 1722903000000);
        assert_eq!(event.ordinal, 4);
        assert_eq!(event.ref_, Ref::Token("E1".to_string()));
    }

    #[test]
    fn test_event_from_write_response() {
        let item = item_response(&[
            ("ETag", "\"E7\""),
            ("Location", "/v1/users/alice/events/login/1722903000000/9"),
        ]);
        let event =
            Event::from_write_response("users", "alice", "login", json!({ "ip": "::1" }), &item)
                .unwrap();
        assert_eq!(event.timestamp, 1722903000000);
        assert_eq!(event.ordinal, 9);
        assert_eq!(event.ref_, Ref::Token("E7".to_string()));
    }

    #[test]
    fn test_event_identity() {
        let item = item_response(&[("Location", "/v1/c/k/events/t/100/1")]);
        let a = Event::from_write_response("c", "k", "t", json!(1), &item).unwrap();
        let b = Event::from_write_response("c", "k", "t", json!(2), &item).unwrap();
        assert_eq!(a, b);
    }
}
