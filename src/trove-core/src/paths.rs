//! Path assembly for the v1 REST API.
//!
//! Collections and keys are caller-chosen strings, so each segment is
//! escaped just enough to keep it a single path segment. Query-string
//! encoding is owned by the transport.

/// The API root.
pub fn root() -> String {
    "/v1".to_string()
}

/// `/v1/{collection}`: listings, search and collection deletion.
pub fn collection(collection: &str) -> String {
    format!("/v1/{}", escape(collection))
}

/// `/v1/{collection}/{key}`: the current value of a key.
pub fn key(collection: &str, key: &str) -> String {
    format!("/v1/{}/{}", escape(collection), escape(key))
}

/// `/v1/{collection}/{key}/refs/{ref}`: one historical version.
pub fn ref_(collection: &str, key: &str, ref_: &str) -> String {
    format!("/v1/{}/{}/refs/{}", escape(collection), escape(key), escape(ref_))
}

/// `/v1/{collection}/{key}/refs/`: the version history of a key.
pub fn refs(collection: &str, key: &str) -> String {
    format!("/v1/{}/{}/refs/", escape(collection), escape(key))
}

/// `/v1/{collection}/{key}/events/{type}`: an event stream.
pub fn events(collection: &str, key: &str, event_type: &str) -> String {
    format!(
        "/v1/{}/{}/events/{}",
        escape(collection),
        escape(key),
        escape(event_type)
    )
}

/// `/v1/{collection}/{key}/events/{type}/{timestamp}`: creation at a
/// caller-supplied time.
pub fn events_at(collection: &str, key: &str, event_type: &str, timestamp: i64) -> String {
    format!("{}/{}", events(collection, key, event_type), timestamp)
}

/// `/v1/{collection}/{key}/events/{type}/{timestamp}/{ordinal}`: one event.
pub fn event(
    collection: &str,
    key: &str,
    event_type: &str,
    timestamp: i64,
    ordinal: u64,
) -> String {
    format!(
        "{}/{}/{}",
        events(collection, key, event_type),
        timestamp,
        ordinal
    )
}

/// `/v1/{collection}/{key}/relation/{kind}/{to_collection}/{to_key}`: one
/// directed graph edge.
pub fn relation(
    collection: &str,
    key: &str,
    kind: &str,
    to_collection: &str,
    to_key: &str,
) -> String {
    format!(
        "/v1/{}/{}/relation/{}/{}/{}",
        escape(collection),
        escape(key),
        escape(kind),
        escape(to_collection),
        escape(to_key)
    )
}

/// `/v1/{collection}/{key}/relations/{kind}/...`: traversal over one or
/// more relation hops.
pub fn relations(collection: &str, key: &str, kinds: &[&str]) -> String {
    let mut path = format!("/v1/{}/{}/relations", escape(collection), escape(key));
    for kind in kinds {
        path.push('/');
        path.push_str(&escape(kind));
    }
    path
}

/// Escape a caller-supplied path segment.
fn escape(segment: &str) -> String {
    let mut out = String::with_capacity(segment.len());
    for c in segment.chars() {
        match c {
            '%' | '/' | '?' | '#' | ' ' => {
                out.push('%');
                out.push_str(&format!("{:02X}", c as u32));
            }
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_paths() {
        assert_eq!(key("users", "alice"), "/v1/users/alice");
        assert_eq!(ref_("users", "alice", "R1"), "/v1/users/alice/refs/R1");
        assert_eq!(refs("users", "alice"), "/v1/users/alice/refs/");
        assert_eq!(
            event("users", "alice", "login", 1722903000000, 9),
            "/v1/users/alice/events/login/1722903000000/9"
        );
        assert_eq!(
            relation("users", "alice", "follows", "users", "bob"),
            "/v1/users/alice/relation/follows/users/bob"
        );
        assert_eq!(
            relations("users", "alice", &["follows", "likes"]),
            "/v1/users/alice/relations/follows/likes"
        );
    }

    #[test]
    fn test_segments_are_escaped() {
        assert_eq!(key("users", "a/b c"), "/v1/users/a%2Fb%20c");
        assert_eq!(collection("50%"), "/v1/50%25");
    }
}
