use serde_json::Value;
use std::sync::Arc;

use trove_core::response::classify;
use trove_core::{
    paths, ClientConfig, CollectionResponse, ErrorKind, Event, EventQuery, ItemResponse, KeyValue,
    ListQuery, RefQuery, RelationQuery, Response, Result, SearchMatch, SearchQuery,
    WriteCondition,
};

use crate::cursor::{Cursor, Direction, Reconstruct};
use crate::transport::{HttpTransport, Request, Transport};

/// Trove REST API client.
///
/// Cheap to clone; clones share the transport. Each handle runs its
/// operations synchronously with respect to the caller except inside
/// [`run_batch`](Client::run_batch), where registered intents dispatch
/// together after the closure returns.
#[derive(Clone)]
pub struct Client {
    inner: Arc<ClientInner>,
}

struct ClientInner {
    config: ClientConfig,
    transport: Arc<dyn Transport>,
}

impl Client {
    /// Create a client for the given service URL and API key.
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        Self::from_config(ClientConfig::new(base_url, api_key))
    }

    pub fn from_config(config: ClientConfig) -> Result<Self> {
        let transport = Arc::new(HttpTransport::new(&config)?);
        Ok(Self::with_transport(config, transport))
    }

    /// Create a client over a custom transport.
    pub fn with_transport(config: ClientConfig, transport: Arc<dyn Transport>) -> Self {
        Self {
            inner: Arc::new(ClientInner { config, transport }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    async fn execute(&self, request: &Request) -> Result<crate::transport::RawResponse> {
        self.inner.transport.execute(request).await
    }

    async fn resolve(&self, request: &Request) -> Result<Response> {
        let raw = self.execute(request).await?;
        classify(raw.status, &raw.headers, &raw.body)
    }

    pub(crate) async fn fetch_collection(&self, request: Request) -> Result<CollectionResponse> {
        CollectionResponse::new(self.resolve(&request).await?)
    }

    /// Verify connectivity and credentials.
    pub async fn ping(&self) -> Result<()> {
        self.resolve(&Request::head(paths::root())).await?;
        Ok(())
    }

    // ---- key-value ----

    /// Read the current value of a key.
    pub async fn get(&self, collection: &str, key: &str) -> Result<KeyValue> {
        let request = Request::get(paths::key(collection, key));
        let response = self.resolve(&request).await?;
        let item = ItemResponse::new(response);
        let value = body_value(&item)?;
        Ok(KeyValue::from_write_response(collection, key, value, &item))
    }

    /// Read one historical version of a key.
    pub async fn get_ref(&self, collection: &str, key: &str, ref_: &str) -> Result<KeyValue> {
        let request = Request::get(paths::ref_(collection, key, ref_));
        let response = self.resolve(&request).await?;
        let item = ItemResponse::new(response);
        let value = body_value(&item)?;
        Ok(KeyValue::from_write_response(collection, key, value, &item))
    }

    /// Write a value, optionally conditioned on the remote version state.
    ///
    /// Returns the new immutable snapshot carrying the server-issued ref.
    /// An `indexing_conflict` (409) means the write persisted even though
    /// some fields could not be indexed, so it is reported as success with
    /// the ref adopted from the error's `Location` header; whether the
    /// service kept or dropped the conflicting fields is not observable
    /// here, and the snapshot keeps the caller-supplied value. Re-`get` to
    /// see the service's view.
    pub async fn put(
        &self,
        collection: &str,
        key: &str,
        value: Value,
        condition: WriteCondition,
    ) -> Result<KeyValue> {
        let mut request = Request::put(paths::key(collection, key)).body(value.clone());
        if let Some((name, header)) = condition.header() {
            request = request.header(name, header);
        }

        let raw = self.execute(&request).await?;
        match classify(raw.status, &raw.headers, &raw.body) {
            Ok(response) => {
                let item = ItemResponse::new(response);
                Ok(KeyValue::from_write_response(collection, key, value, &item))
            }
            Err(e) if e.is_kind(ErrorKind::IndexingConflict) => {
                tracing::warn!(
                    collection,
                    key,
                    "indexing conflict on write; adopting ref from location"
                );
                let response = Response::from_parts(raw.status, &raw.headers, &raw.body);
                let item = ItemResponse::new(response);
                Ok(KeyValue::from_write_response(collection, key, value, &item))
            }
            Err(e) => Err(e),
        }
    }

    /// Write only if the key does not exist yet.
    pub async fn create(&self, collection: &str, key: &str, value: Value) -> Result<KeyValue> {
        self.put(collection, key, value, WriteCondition::IfAbsent)
            .await
    }

    /// Re-write a snapshot under its own version condition.
    pub async fn save(&self, kv: &KeyValue) -> Result<KeyValue> {
        self.put(
            &kv.collection,
            &kv.key,
            kv.value.clone(),
            WriteCondition::from_ref(&kv.ref_),
        )
        .await
    }

    /// Replace a snapshot's value, conditioned on the snapshot's ref.
    pub async fn update(&self, kv: &KeyValue, value: Value) -> Result<KeyValue> {
        let condition = match kv.ref_.token() {
            Some(token) => WriteCondition::IfMatch(token.to_string()),
            None => WriteCondition::None,
        };
        self.put(&kv.collection, &kv.key, value, condition).await
    }

    /// Non-raising variant of [`put`](Client::put); `None` signals failure.
    pub async fn try_put(
        &self,
        collection: &str,
        key: &str,
        value: Value,
        condition: WriteCondition,
    ) -> Option<KeyValue> {
        quietly("put", self.put(collection, key, value, condition).await)
    }

    /// Non-raising variant of [`create`](Client::create).
    pub async fn try_create(
        &self,
        collection: &str,
        key: &str,
        value: Value,
    ) -> Option<KeyValue> {
        quietly("create", self.create(collection, key, value).await)
    }

    /// Non-raising variant of [`save`](Client::save).
    pub async fn try_save(&self, kv: &KeyValue) -> Option<KeyValue> {
        quietly("save", self.save(kv).await)
    }

    /// Delete the current value; `ref_` of `None` deletes unconditionally.
    ///
    /// The deleted version stays in the key's history as a tombstone.
    pub async fn delete(&self, collection: &str, key: &str, ref_: Option<&str>) -> Result<()> {
        let mut request = Request::delete(paths::key(collection, key));
        if let Some(token) = ref_ {
            request = request.header("If-Match", format!("\"{token}\""));
        }
        self.resolve(&request).await?;
        Ok(())
    }

    /// Delete the current value and discard the key's entire history.
    pub async fn purge(&self, collection: &str, key: &str, ref_: Option<&str>) -> Result<()> {
        let mut request = Request::delete(paths::key(collection, key))
            .query(vec![("purge".to_string(), "true".to_string())]);
        if let Some(token) = ref_ {
            request = request.header("If-Match", format!("\"{token}\""));
        }
        self.resolve(&request).await?;
        Ok(())
    }

    /// Delete a snapshot under its own version condition; the returned
    /// snapshot has no version state.
    pub async fn destroy(&self, kv: &KeyValue) -> Result<KeyValue> {
        self.delete(&kv.collection, &kv.key, kv.ref_.token()).await?;
        Ok(kv.destroyed())
    }

    /// [`destroy`](Client::destroy), discarding history as well.
    pub async fn purge_history(&self, kv: &KeyValue) -> Result<KeyValue> {
        self.purge(&kv.collection, &kv.key, kv.ref_.token()).await?;
        Ok(kv.destroyed())
    }

    /// Delete a collection and everything in it.
    pub async fn delete_collection(&self, collection: &str) -> Result<()> {
        let request = Request::delete(paths::collection(collection))
            .query(vec![("force".to_string(), "true".to_string())]);
        self.resolve(&request).await?;
        Ok(())
    }

    /// Lazily list a collection's keys in ascending order.
    pub fn list(&self, collection: &str, query: &ListQuery) -> Cursor<KeyValue> {
        Cursor::new(
            self.clone(),
            list_request(collection, query),
            Direction::Forward,
            kv_reconstruct(collection),
        )
    }

    /// Lazily list a key's version history, newest first.
    pub fn list_refs(&self, collection: &str, key: &str, query: &RefQuery) -> Cursor<KeyValue> {
        let request = Request::get(paths::refs(collection, key)).query(query.to_query());
        Cursor::new(
            self.clone(),
            request,
            Direction::Forward,
            kv_reconstruct(collection),
        )
    }

    /// Lazily search a collection; hits arrive in descending relevance
    /// order unless the query sorts otherwise.
    pub fn search(
        &self,
        collection: &str,
        lucene: &str,
        query: &SearchQuery,
    ) -> Cursor<SearchMatch> {
        Cursor::new(
            self.clone(),
            search_request(collection, lucene, query),
            Direction::Forward,
            search_reconstruct(collection),
        )
    }

    // ---- graph ----

    /// Create a directed relation from one item to another.
    pub async fn relate(
        &self,
        collection: &str,
        key: &str,
        kind: &str,
        to_collection: &str,
        to_key: &str,
    ) -> Result<()> {
        let request = Request::put(paths::relation(collection, key, kind, to_collection, to_key));
        self.resolve(&request).await?;
        Ok(())
    }

    /// Remove a directed relation.
    pub async fn unrelate(
        &self,
        collection: &str,
        key: &str,
        kind: &str,
        to_collection: &str,
        to_key: &str,
    ) -> Result<()> {
        let request = Request::delete(paths::relation(collection, key, kind, to_collection, to_key))
            .query(vec![("purge".to_string(), "true".to_string())]);
        self.resolve(&request).await?;
        Ok(())
    }

    /// Lazily walk the items one or more relation hops away. Each yielded
    /// item carries its own collection, which need not be the origin's.
    pub fn related(
        &self,
        collection: &str,
        key: &str,
        kinds: &[&str],
        query: &RelationQuery,
    ) -> Cursor<KeyValue> {
        let request = Request::get(paths::relations(collection, key, kinds)).query(query.to_query());
        Cursor::new(
            self.clone(),
            request,
            Direction::Forward,
            kv_reconstruct(collection),
        )
    }

    // ---- events ----

    /// Read a single event.
    pub async fn get_event(
        &self,
        collection: &str,
        key: &str,
        event_type: &str,
        timestamp: i64,
        ordinal: u64,
    ) -> Result<Event> {
        let request = Request::get(paths::event(collection, key, event_type, timestamp, ordinal));
        let response = self.resolve(&request).await?;
        let item = ItemResponse::new(response);
        let body = item
            .response()
            .body()
            .as_json()
            .cloned()
            .unwrap_or(Value::Null);
        // Single-event bodies wrap the value; accept a bare value too.
        let value = body.get("value").cloned().unwrap_or(body);

        Ok(Event {
            collection: collection.to_string(),
            key: key.to_string(),
            event_type: event_type.to_string(),
            timestamp,
            ordinal,
            ref_: match item.ref_token() {
                Some(token) => trove_core::Ref::Token(token.to_string()),
                None => trove_core::Ref::Unknown,
            },
            value,
            last_request_time: item.response().request_time(),
        })
    }

    /// Append an event to a key's timeline. With `timestamp` of `None` the
    /// service assigns the time; the ordinal is always service-assigned.
    pub async fn create_event(
        &self,
        collection: &str,
        key: &str,
        event_type: &str,
        value: Value,
        timestamp: Option<i64>,
    ) -> Result<Event> {
        let path = match timestamp {
            Some(ts) => paths::events_at(collection, key, event_type, ts),
            None => paths::events(collection, key, event_type),
        };
        let request = Request::post(path).body(value.clone());
        let response = self.resolve(&request).await?;
        let item = ItemResponse::new(response);
        Event::from_write_response(collection, key, event_type, value, &item)
    }

    /// Remove an event from a key's timeline. Event history is not
    /// retained, so deletion always purges.
    pub async fn delete_event(
        &self,
        collection: &str,
        key: &str,
        event_type: &str,
        timestamp: i64,
        ordinal: u64,
        ref_: Option<&str>,
    ) -> Result<()> {
        let mut request = Request::delete(paths::event(
            collection, key, event_type, timestamp, ordinal,
        ))
        .query(vec![("purge".to_string(), "true".to_string())]);
        if let Some(token) = ref_ {
            request = request.header("If-Match", format!("\"{token}\""));
        }
        self.resolve(&request).await?;
        Ok(())
    }

    /// Lazily list a key's events of one type, newest first.
    pub fn list_events(
        &self,
        collection: &str,
        key: &str,
        event_type: &str,
        query: &EventQuery,
    ) -> Cursor<Event> {
        let request =
            Request::get(paths::events(collection, key, event_type)).query(query.to_query());
        Cursor::new(
            self.clone(),
            request,
            Direction::Forward,
            event_reconstruct(collection),
        )
    }
}

pub(crate) fn list_request(collection: &str, query: &ListQuery) -> Request {
    Request::get(paths::collection(collection)).query(query.to_query())
}

pub(crate) fn search_request(collection: &str, lucene: &str, query: &SearchQuery) -> Request {
    let mut q = vec![("query".to_string(), lucene.to_string())];
    q.extend(query.to_query());
    Request::get(paths::collection(collection)).query(q)
}

pub(crate) fn kv_reconstruct(collection: &str) -> Reconstruct<KeyValue> {
    let collection = collection.to_string();
    Arc::new(move |listing, page| KeyValue::from_listing(&collection, listing, page))
}

pub(crate) fn search_reconstruct(collection: &str) -> Reconstruct<SearchMatch> {
    let collection = collection.to_string();
    Arc::new(move |listing, page| SearchMatch::from_listing(&collection, listing, page))
}

fn event_reconstruct(collection: &str) -> Reconstruct<Event> {
    let collection = collection.to_string();
    Arc::new(move |listing, page| Event::from_listing(&collection, listing, page))
}

/// Extract the stored value from a single-item response body.
fn body_value(item: &ItemResponse) -> Result<Value> {
    match item.response().body() {
        trove_core::Body::Json(v) => Ok(v.clone()),
        trove_core::Body::Empty => Ok(Value::Null),
        trove_core::Body::Text(_) => Err(trove_core::Error::Decode(
            "item response body is not JSON".to_string(),
        )),
    }
}

fn quietly<T>(op: &'static str, result: Result<T>) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            tracing::warn!(error = %e, op, "operation failed");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock::MockTransport;
    use crate::transport::Method;
    use serde_json::json;
    use trove_core::{Error, Ref};

    fn client(mock: Arc<MockTransport>) -> Client {
        Client::with_transport(ClientConfig::new("http://localhost:8147", "k-test"), mock)
    }

    #[tokio::test]
    async fn test_get_builds_snapshot() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            200,
            &[
                ("ETag", "\"cbb48f9464612f20\""),
                ("Date", "Wed, 05 Aug 2026 10:21:14 GMT"),
                ("X-Request-Id", "req-1"),
            ],
            json!({ "name": "Alice" }),
        );

        let kv = client(mock.clone()).get("users", "alice").await.unwrap();
        assert_eq!(kv.collection, "users");
        assert_eq!(kv.key, "alice");
        assert_eq!(kv.ref_, Ref::Token("cbb48f9464612f20".to_string()));
        assert_eq!(kv.value, json!({ "name": "Alice" }));
        assert!(kv.last_request_time.is_some());

        let request = mock.request(0);
        assert_eq!(request.method, Method::Get);
        assert_eq!(request.path, "/v1/users/alice");
    }

    #[tokio::test]
    async fn test_get_missing_key() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            404,
            &[],
            json!({ "message": "The requested items could not be found.", "code": "items_not_found" }),
        );

        let err = client(mock).get("users", "nobody").await.unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::NotFound));
    }

    #[tokio::test]
    async fn test_put_unconditional_yields_new_token() {
        let mock = Arc::new(MockTransport::new());
        mock.push_empty(
            201,
            &[("ETag", "\"R1\""), ("Location", "/v1/users/alice/refs/R1")],
        );

        let kv = client(mock.clone())
            .put("users", "alice", json!({ "n": 1 }), WriteCondition::None)
            .await
            .unwrap();
        assert_eq!(kv.ref_, Ref::Token("R1".to_string()));
        assert_eq!(kv.value, json!({ "n": 1 }));

        // No precondition header on an unconditional write.
        let request = mock.request(0);
        assert!(request.headers.is_empty());
    }

    #[tokio::test]
    async fn test_put_if_match_sends_header_and_maps_412() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            412,
            &[],
            json!({ "message": "ref mismatch", "code": "item_version_mismatch" }),
        );

        let err = client(mock.clone())
            .put(
                "users",
                "alice",
                json!({}),
                WriteCondition::IfMatch("R1".to_string()),
            )
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::VersionMismatch));

        let request = mock.request(0);
        assert_eq!(
            request.headers,
            vec![("If-Match".to_string(), "\"R1\"".to_string())]
        );
    }

    #[tokio::test]
    async fn test_create_existing_key_is_already_present() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            412,
            &[],
            json!({ "message": "already there", "code": "item_already_present" }),
        );

        let err = client(mock.clone())
            .create("users", "alice", json!({}))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), Some(ErrorKind::AlreadyPresent));

        let request = mock.request(0);
        assert_eq!(
            request.headers,
            vec![("If-None-Match".to_string(), "\"*\"".to_string())]
        );
    }

    #[tokio::test]
    async fn test_indexing_conflict_is_success() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            409,
            &[("Location", "/v1/users/alice/refs/R3")],
            json!({ "message": "some fields were not indexed", "code": "indexing_conflict" }),
        );

        let kv = client(mock)
            .put("users", "alice", json!({ "n": 2 }), WriteCondition::None)
            .await
            .unwrap();
        assert_eq!(kv.ref_, Ref::Token("R3".to_string()));
        assert_eq!(kv.value, json!({ "n": 2 }));
    }

    #[tokio::test]
    async fn test_try_put_swallows_api_errors() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            500,
            &[],
            json!({ "message": "boom", "code": "internal_error" }),
        );
        mock.push_empty(201, &[("ETag", "\"R1\"")]);

        let c = client(mock);
        let missed = c
            .try_put("users", "alice", json!({}), WriteCondition::None)
            .await;
        assert!(missed.is_none());

        let saved = c
            .try_put("users", "alice", json!({}), WriteCondition::None)
            .await;
        assert_eq!(saved.unwrap().ref_, Ref::Token("R1".to_string()));
    }

    #[tokio::test]
    async fn test_save_uses_snapshot_condition() {
        let mock = Arc::new(MockTransport::new());
        mock.push_empty(201, &[("ETag", "\"R1\"")]);
        mock.push_empty(201, &[("ETag", "\"R2\"")]);

        let c = client(mock.clone());
        let kv = c
            .put("users", "alice", json!({ "n": 1 }), WriteCondition::None)
            .await
            .unwrap();
        let kv2 = c.save(&kv).await.unwrap();

        // The second write was conditioned on the first write's ref, and
        // the original snapshot is untouched.
        assert_eq!(
            mock.request(1).headers,
            vec![("If-Match".to_string(), "\"R1\"".to_string())]
        );
        assert_eq!(kv.ref_, Ref::Token("R1".to_string()));
        assert_eq!(kv2.ref_, Ref::Token("R2".to_string()));
    }

    #[tokio::test]
    async fn test_delete_and_purge() {
        let mock = Arc::new(MockTransport::new());
        mock.push_empty(204, &[]);
        mock.push_empty(204, &[]);

        let c = client(mock.clone());
        c.delete("users", "alice", Some("R1")).await.unwrap();
        c.purge("users", "alice", None).await.unwrap();

        let del = mock.request(0);
        assert_eq!(del.method, Method::Delete);
        assert_eq!(
            del.headers,
            vec![("If-Match".to_string(), "\"R1\"".to_string())]
        );
        assert!(del.query.is_empty());

        let purge = mock.request(1);
        assert!(purge.headers.is_empty());
        assert_eq!(
            purge.query,
            vec![("purge".to_string(), "true".to_string())]
        );
    }

    #[tokio::test]
    async fn test_destroy_returns_versionless_snapshot() {
        let mock = Arc::new(MockTransport::new());
        mock.push_empty(201, &[("ETag", "\"R1\"")]);
        mock.push_empty(204, &[]);

        let c = client(mock);
        let kv = c
            .put("users", "alice", json!({ "n": 1 }), WriteCondition::None)
            .await
            .unwrap();
        let gone = c.destroy(&kv).await.unwrap();
        assert_eq!(gone.ref_, Ref::Unknown);
        assert_eq!(gone.value, Value::Null);
    }

    #[tokio::test]
    async fn test_search_yields_scored_matches_in_order() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            200,
            &[],
            json!({
                "count": 2,
                "total_count": 2,
                "results": [
                    { "path": { "collection": "users", "key": "alice", "ref": "R1" },
                      "value": { "name": "Alice" }, "score": 2.5 },
                    { "path": { "collection": "users", "key": "bob", "ref": "R2" },
                      "value": { "name": "Bob" }, "score": 0.3 }
                ]
            }),
        );

        let mut hits = client(mock.clone()).search("users", "name:*", &SearchQuery::new());
        let all = hits.collect_all().await.unwrap();
        assert_eq!(all.len(), 2);
        assert_eq!(all[0].item.key, "alice");
        assert_eq!(all[0].score, Some(2.5));
        assert_eq!(all[1].item.key, "bob");

        let request = mock.request(0);
        assert!(request
            .query
            .contains(&("query".to_string(), "name:*".to_string())));
    }

    #[tokio::test]
    async fn test_list_refs_surfaces_tombstones() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            200,
            &[],
            json!({
                "count": 2,
                "results": [
                    { "path": { "collection": "users", "key": "alice", "ref": "R2", "tombstone": true },
                      "reftime": 1722903600000i64 },
                    { "path": { "collection": "users", "key": "alice", "ref": "R1" },
                      "value": { "n": 1 }, "reftime": 1722903000000i64 }
                ]
            }),
        );

        let mut history =
            client(mock).list_refs("users", "alice", &RefQuery::new().values(true));
        let refs = history.collect_all().await.unwrap();
        assert!(refs[0].tombstone);
        assert_eq!(refs[1].ref_, Ref::Token("R1".to_string()));
    }

    #[tokio::test]
    async fn test_relations_round_trip() {
        let mock = Arc::new(MockTransport::new());
        mock.push_empty(204, &[]);
        mock.push_json(
            200,
            &[],
            json!({
                "count": 1,
                "results": [
                    { "path": { "collection": "posts", "key": "p-9", "ref": "R5" },
                      "value": { "title": "hello" } }
                ]
            }),
        );

        let c = client(mock.clone());
        c.relate("users", "alice", "authored", "posts", "p-9")
            .await
            .unwrap();
        assert_eq!(
            mock.request(0).path,
            "/v1/users/alice/relation/authored/posts/p-9"
        );

        let mut related = c.related("users", "alice", &["authored"], &RelationQuery::new());
        let posts = related.collect_all().await.unwrap();
        // Related items carry their own collection, not the origin's.
        assert_eq!(posts[0].collection, "posts");
        assert_eq!(posts[0].key, "p-9");
        assert_eq!(mock.request(1).path, "/v1/users/alice/relations/authored");
    }

    #[tokio::test]
    async fn test_create_event_parses_location() {
        let mock = Arc::new(MockTransport::new());
        mock.push_empty(
            201,
            &[
                ("ETag", "\"E1\""),
                ("Location", "/v1/users/alice/events/login/1722903000000/7"),
            ],
        );

        let event = client(mock.clone())
            .create_event("users", "alice", "login", json!({ "ip": "::1" }), None)
            .await
            .unwrap();
        assert_eq!(event.timestamp, 1722903000000);
        assert_eq!(event.ordinal, 7);
        assert_eq!(event.ref_, Ref::Token("E1".to_string()));

        let request = mock.request(0);
        assert_eq!(request.method, Method::Post);
        assert_eq!(request.path, "/v1/users/alice/events/login");
    }

    #[tokio::test]
    async fn test_list_events_order_preserved() {
        let mock = Arc::new(MockTransport::new());
        mock.push_json(
            200,
            &[],
            json!({
                "count": 2,
                "results": [
                    { "path": { "collection": "users", "key": "alice", "ref": "E2",
                                "type": "login", "timestamp": 1722903600000i64, "ordinal": 1 },
                      "value": {} },
                    { "path": { "collection": "users", "key": "alice", "ref": "E1",
                                "type": "login", "timestamp": 1722903000000i64, "ordinal": 1 },
                      "value": {} }
                ]
            }),
        );

        let mut events =
            client(mock).list_events("users", "alice", "login", &EventQuery::new().limit(2));
        let all = events.collect_all().await.unwrap();
        // Newest first, exactly as the endpoint returned them.
        assert!(all[0].timestamp > all[1].timestamp);
    }

    #[tokio::test]
    async fn test_local_failure_has_no_api_kind() {
        let mock = Arc::new(MockTransport::new());
        // Nothing queued: the mock reports a decode failure.
        let err = client(mock).get("users", "alice").await.unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
        assert_eq!(err.kind(), None);
    }
}
