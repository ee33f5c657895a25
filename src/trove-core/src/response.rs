use chrono::{DateTime, Utc};
use serde_json::Value;
use std::collections::HashMap;

use crate::error::{self, Error, Result};
use crate::models::ErrorBody;

/// Header carrying the service-assigned request id.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

/// Parsed response body.
#[derive(Debug, Clone)]
pub enum Body {
    Json(Value),
    Text(String),
    Empty,
}

impl Body {
    pub fn as_json(&self) -> Option<&Value> {
        match self {
            Body::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Body::Empty)
    }
}

/// A completed HTTP response.
///
/// Constructed only after the round-trip has finished, whether the request
/// ran immediately or inside a batch; every derived field (request id,
/// timestamp) is extracted at construction, so there is no
/// populated-later window to get wrong.
#[derive(Debug, Clone)]
pub struct Response {
    status: u16,
    headers: HashMap<String, String>,
    body: Body,
    request_id: Option<String>,
    request_time: Option<DateTime<Utc>>,
}

impl Response {
    /// Build a response from raw transport output.
    ///
    /// Header names are lowercased for lookup; the body is parsed as JSON
    /// when the content type says so, kept as text otherwise.
    pub fn from_parts(status: u16, headers: &HashMap<String, String>, body: &[u8]) -> Self {
        let headers: HashMap<String, String> = headers
            .iter()
            .map(|(k, v)| (k.to_ascii_lowercase(), v.clone()))
            .collect();

        let body = parse_body(&headers, body);
        let request_id = headers.get(REQUEST_ID_HEADER).cloned();
        let request_time = headers
            .get("date")
            .and_then(|d| DateTime::parse_from_rfc2822(d).ok())
            .map(|t| t.with_timezone(&Utc));

        Self {
            status,
            headers,
            body,
            request_id,
            request_time,
        }
    }

    pub fn status(&self) -> u16 {
        self.status
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(&name.to_ascii_lowercase()).map(|v| v.as_str())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    /// Service-assigned request id, when the service echoed one.
    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    /// Server clock at the time the request was handled (`Date` header).
    pub fn request_time(&self) -> Option<DateTime<Utc>> {
        self.request_time
    }
}

/// Classify a completed HTTP outcome into a [`Response`] or a typed error.
///
/// Success is any 2xx. On failure the body is inspected for an
/// `{ message, code }` payload: a registered `(status, code)` pair wins,
/// a status with exactly one registration wins next, and everything else
/// falls back to the generic kind for the status class.
pub fn classify(status: u16, headers: &HashMap<String, String>, body: &[u8]) -> Result<Response> {
    let response = Response::from_parts(status, headers, body);
    if (200..300).contains(&status) {
        return Ok(response);
    }

    let (message, code) = match response.body() {
        Body::Json(v) => {
            let parsed: Option<ErrorBody> = serde_json::from_value(v.clone()).ok();
            match parsed {
                Some(e) => (e.message, e.code),
                None => (v.to_string(), None),
            }
        }
        Body::Text(t) => (t.clone(), None),
        Body::Empty => (String::new(), None),
    };

    let kind = code
        .as_deref()
        .and_then(|c| error::kind_for(status, c))
        .unwrap_or_else(|| error::kind_for_status(status));

    Err(Error::Api {
        kind,
        status,
        message,
        request_id: response.request_id().map(String::from),
    })
}

/// Response to a single-item request (get, put, delete, event write).
///
/// Adds the address of the ref that now represents the value and the version
/// token itself, pulled from `ETag` with the trailing segment of the
/// location path as fallback.
#[derive(Debug, Clone)]
pub struct ItemResponse {
    response: Response,
    location: Option<String>,
    ref_: Option<String>,
}

impl ItemResponse {
    pub fn new(response: Response) -> Self {
        let location = response
            .header("location")
            .or_else(|| response.header("content-location"))
            .map(String::from);

        let ref_ = response
            .header("etag")
            .map(strip_etag)
            .or_else(|| location.as_deref().and_then(ref_from_location));

        Self {
            response,
            location,
            ref_,
        }
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Path of the ref that now represents the value.
    pub fn location(&self) -> Option<&str> {
        self.location.as_deref()
    }

    /// The new version token.
    pub fn ref_token(&self) -> Option<&str> {
        self.ref_.as_deref()
    }
}

/// Response to a collection-shaped request (list, search, refs, events).
#[derive(Debug, Clone)]
pub struct CollectionResponse {
    response: Response,
    results: Vec<Value>,
    count: u64,
    total_count: Option<u64>,
    next: Option<String>,
    prev: Option<String>,
    aggregates: Vec<Value>,
}

impl CollectionResponse {
    pub fn new(response: Response) -> Result<Self> {
        let body = response
            .body()
            .as_json()
            .ok_or_else(|| Error::Decode("collection response body is not JSON".to_string()))?;

        let results = body
            .get("results")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let count = body
            .get("count")
            .and_then(Value::as_u64)
            .unwrap_or(results.len() as u64);
        let total_count = body.get("total_count").and_then(Value::as_u64);
        let next = body.get("next").and_then(Value::as_str).map(String::from);
        let prev = body.get("prev").and_then(Value::as_str).map(String::from);
        let aggregates = body
            .get("aggregates")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();

        Ok(Self {
            response,
            results,
            count,
            total_count,
            next,
            prev,
            aggregates,
        })
    }

    pub fn response(&self) -> &Response {
        &self.response
    }

    /// Listing records of this page, in server order.
    pub fn results(&self) -> &[Value] {
        &self.results
    }

    /// Number of records in this page.
    pub fn count(&self) -> u64 {
        self.count
    }

    /// Total matches across all pages, where the endpoint reports it.
    pub fn total_count(&self) -> Option<u64> {
        self.total_count
    }

    /// Cursor URI of the following page.
    pub fn next(&self) -> Option<&str> {
        self.next.as_deref()
    }

    /// Cursor URI of the preceding page.
    pub fn prev(&self) -> Option<&str> {
        self.prev.as_deref()
    }

    /// Aggregate results, for search queries that requested them.
    pub fn aggregates(&self) -> &[Value] {
        &self.aggregates
    }
}

fn parse_body(headers: &HashMap<String, String>, body: &[u8]) -> Body {
    if body.is_empty() {
        return Body::Empty;
    }
    let is_json = headers
        .get("content-type")
        .map(|ct| ct.contains("json"))
        .unwrap_or(false);
    if is_json {
        if let Ok(v) = serde_json::from_slice(body) {
            return Body::Json(v);
        }
    }
    Body::Text(String::from_utf8_lossy(body).into_owned())
}

/// Strip quoting, weak-validator prefix and encoding suffix from an ETag.
fn strip_etag(raw: &str) -> String {
    let token = raw.trim();
    let token = token.strip_prefix("W/").unwrap_or(token);
    let token = token.trim_matches('"');
    let token = token.strip_suffix("-gzip").unwrap_or(token);
    token.to_string()
}

/// Final path segment of a ref location, e.g. `/v1/users/alice/refs/R3`.
fn ref_from_location(location: &str) -> Option<String> {
    location
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty())
        .map(String::from)
}
