use serde::Deserialize;

/// Smallest page size the service accepts.
pub const MIN_PAGE_SIZE: usize = 1;
/// Largest page size the service accepts.
pub const MAX_PAGE_SIZE: usize = 100;

/// Clamp a caller-supplied page size into `[MIN_PAGE_SIZE, MAX_PAGE_SIZE]`.
///
/// Out-of-range values are coerced, never rejected: 0 becomes 1, anything
/// above 100 becomes 100.
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(MIN_PAGE_SIZE, MAX_PAGE_SIZE)
}

/// Error payload returned by the service under a JSON content type.
#[derive(Debug, Clone, Deserialize)]
pub struct ErrorBody {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

/// The `path` object embedded in every listing record.
///
/// Key-value and ref listings carry `collection`/`key`/`ref`; event listings
/// additionally carry `type`/`timestamp`/`ordinal`.
#[derive(Debug, Clone, Deserialize)]
pub struct ListingPath {
    /// Owning collection; relation traversals return items from other
    /// collections, so reconstruction prefers this over the queried one.
    #[serde(default)]
    pub collection: Option<String>,
    pub key: String,
    #[serde(rename = "ref", default)]
    pub ref_: Option<String>,
    #[serde(default)]
    pub tombstone: bool,
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,
    #[serde(default)]
    pub timestamp: Option<i64>,
    #[serde(default)]
    pub ordinal: Option<u64>,
    #[serde(default)]
    pub reftime: Option<i64>,
}

/// Options for key-value listings (ascending key order).
#[derive(Debug, Clone, Default)]
pub struct ListQuery {
    limit: Option<usize>,
    start_key: Option<String>,
    after_key: Option<String>,
    before_key: Option<String>,
    end_key: Option<String>,
}

impl ListQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size, clamped into `[1, 100]`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(clamp_limit(limit));
        self
    }

    /// Inclusive lower bound on keys.
    pub fn start_key(mut self, key: impl Into<String>) -> Self {
        self.start_key = Some(key.into());
        self
    }

    /// Exclusive lower bound on keys.
    pub fn after_key(mut self, key: impl Into<String>) -> Self {
        self.after_key = Some(key.into());
        self
    }

    /// Exclusive upper bound on keys.
    pub fn before_key(mut self, key: impl Into<String>) -> Self {
        self.before_key = Some(key.into());
        self
    }

    /// Inclusive upper bound on keys.
    pub fn end_key(mut self, key: impl Into<String>) -> Self {
        self.end_key = Some(key.into());
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(limit) = self.limit {
            q.push(("limit".to_string(), limit.to_string()));
        }
        push_opt(&mut q, "startKey", &self.start_key);
        push_opt(&mut q, "afterKey", &self.after_key);
        push_opt(&mut q, "beforeKey", &self.before_key);
        push_opt(&mut q, "endKey", &self.end_key);
        q
    }
}

/// Options for search queries (descending relevance order).
#[derive(Debug, Clone, Default)]
pub struct SearchQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    sort: Option<String>,
    aggregate: Option<String>,
}

impl SearchQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size, clamped into `[1, 100]`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(clamp_limit(limit));
        self
    }

    /// Number of results to skip before the first page.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Sort clause, e.g. `value.name:asc`. The service default is
    /// descending score.
    pub fn sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Aggregate clause, e.g. `value.price:stats`.
    pub fn aggregate(mut self, aggregate: impl Into<String>) -> Self {
        self.aggregate = Some(aggregate.into());
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(limit) = self.limit {
            q.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            q.push(("offset".to_string(), offset.to_string()));
        }
        push_opt(&mut q, "sort", &self.sort);
        push_opt(&mut q, "aggregate", &self.aggregate);
        q
    }
}

/// Options for event listings (descending time order).
#[derive(Debug, Clone, Default)]
pub struct EventQuery {
    limit: Option<usize>,
    before: Option<i64>,
    after: Option<i64>,
}

impl EventQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size, clamped into `[1, 100]`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(clamp_limit(limit));
        self
    }

    /// Only events strictly older than this timestamp (epoch millis).
    pub fn before(mut self, timestamp: i64) -> Self {
        self.before = Some(timestamp);
        self
    }

    /// Only events strictly newer than this timestamp (epoch millis).
    pub fn after(mut self, timestamp: i64) -> Self {
        self.after = Some(timestamp);
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(limit) = self.limit {
            q.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(before) = self.before {
            q.push(("beforeEvent".to_string(), before.to_string()));
        }
        if let Some(after) = self.after {
            q.push(("afterEvent".to_string(), after.to_string()));
        }
        q
    }
}

/// Options for relation traversals.
#[derive(Debug, Clone, Default)]
pub struct RelationQuery {
    limit: Option<usize>,
    offset: Option<usize>,
}

impl RelationQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size, clamped into `[1, 100]`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(clamp_limit(limit));
        self
    }

    /// Number of related items to skip before the first page.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(limit) = self.limit {
            q.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            q.push(("offset".to_string(), offset.to_string()));
        }
        q
    }
}

/// Options for ref history listings (descending reftime order).
#[derive(Debug, Clone, Default)]
pub struct RefQuery {
    limit: Option<usize>,
    offset: Option<usize>,
    values: bool,
}

impl RefQuery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Page size, clamped into `[1, 100]`.
    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(clamp_limit(limit));
        self
    }

    /// Number of refs to skip before the first page.
    pub fn offset(mut self, offset: usize) -> Self {
        self.offset = Some(offset);
        self
    }

    /// Include the stored value of each ref, not just its metadata.
    pub fn values(mut self, values: bool) -> Self {
        self.values = values;
        self
    }

    pub fn to_query(&self) -> Vec<(String, String)> {
        let mut q = Vec::new();
        if let Some(limit) = self.limit {
            q.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            q.push(("offset".to_string(), offset.to_string()));
        }
        if self.values {
            q.push(("values".to_string(), "true".to_string()));
        }
        q
    }
}

fn push_opt(q: &mut Vec<(String, String)>, name: &str, value: &Option<String>) {
    if let Some(value) = value {
        q.push((name.to_string(), value.clone()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_clamps_high() {
        assert_eq!(clamp_limit(500), 100);
        let q = ListQuery::new().limit(500).to_query();
        assert_eq!(q, vec![("limit".to_string(), "100".to_string())]);
    }

    #[test]
    fn test_limit_clamps_low() {
        assert_eq!(clamp_limit(0), 1);
        let q = SearchQuery::new().limit(0).to_query();
        assert_eq!(q, vec![("limit".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_limit_in_range_untouched() {
        assert_eq!(clamp_limit(1), 1);
        assert_eq!(clamp_limit(42), 42);
        assert_eq!(clamp_limit(100), 100);
    }

    #[test]
    fn test_list_query_key_bounds() {
        let q = ListQuery::new()
            .after_key("apple")
            .end_key("mango")
            .to_query();
        assert_eq!(
            q,
            vec![
                ("afterKey".to_string(), "apple".to_string()),
                ("endKey".to_string(), "mango".to_string()),
            ]
        );
    }

    #[test]
    fn test_ref_query_values_flag() {
        assert!(RefQuery::new().to_query().is_empty());
        let q = RefQuery::new().values(true).to_query();
        assert_eq!(q, vec![("values".to_string(), "true".to_string())]);
    }

    #[test]
    fn test_listing_path_event_fields() {
        let path: ListingPath = serde_json::from_value(serde_json::json!({
            "collection": "users",
            "key": "alice",
            "ref": "ad39c0f8f807bf40",
            "type": "login",
            "timestamp": 1722903000000i64,
            "ordinal": 9
        }))
        .unwrap();
        assert_eq!(path.event_type.as_deref(), Some("login"));
        assert_eq!(path.timestamp, Some(1722903000000));
        assert_eq!(path.ordinal, Some(9));
        assert!(!path.tombstone);
    }
}
