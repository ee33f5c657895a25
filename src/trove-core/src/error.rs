use std::fmt;
use std::sync::Arc;
use thiserror::Error;

/// Result type for client operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Closed set of failure kinds the Trove API reports.
///
/// Every kind is keyed in [`ERROR_REGISTRY`] by an `(http status, api code)`
/// pair except the two generic family kinds, which absorb anything the
/// registry does not name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Malformed request body or parameters (400).
    BadRequest,
    /// The Lucene query string could not be parsed (400).
    MalformedSearch,
    /// A ref in the request path is not a valid version token (400).
    MalformedRef,
    /// A search parameter is unsupported or out of range (400).
    InvalidSearchParam,
    /// Missing or invalid API key (401).
    Unauthorized,
    /// The key, ref or event does not exist (404).
    NotFound,
    /// The write persisted but some fields could not be indexed (409).
    ///
    /// Writes that produce this kind succeeded server-side; the new ref
    /// travels in the `Location` header of the error response.
    IndexingConflict,
    /// An `If-Match` condition failed: the remote ref differs (412).
    VersionMismatch,
    /// An `If-None-Match: "*"` condition failed: the key exists (412).
    AlreadyPresent,
    /// Any other client-caused failure (unregistered 4xx).
    RequestError,
    /// The authentication backend failed (500).
    SecurityAuthentication,
    /// The collection has no search index (500).
    SearchIndexNotFound,
    /// Unclassified server fault (500).
    InternalError,
    /// Any other server-side failure (unregistered 5xx).
    ServiceError,
}

impl ErrorKind {
    /// True for kinds the service attributes to the caller (4xx family).
    pub fn is_request_error(&self) -> bool {
        matches!(
            self,
            ErrorKind::BadRequest
                | ErrorKind::MalformedSearch
                | ErrorKind::MalformedRef
                | ErrorKind::InvalidSearchParam
                | ErrorKind::Unauthorized
                | ErrorKind::NotFound
                | ErrorKind::IndexingConflict
                | ErrorKind::VersionMismatch
                | ErrorKind::AlreadyPresent
                | ErrorKind::RequestError
        )
    }

    /// True for kinds the service attributes to itself (5xx family).
    pub fn is_service_error(&self) -> bool {
        !self.is_request_error()
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// Registered `(status, api code, kind)` triples.
///
/// Built once at compile time; the classifier consults it for every
/// non-success response. The generic `RequestError`/`ServiceError` kinds are
/// deliberately absent: they are fallbacks, not registrations.
pub const ERROR_REGISTRY: &[(u16, &str, ErrorKind)] = &[
    (400, "api_bad_request", ErrorKind::BadRequest),
    (400, "search_query_malformed", ErrorKind::MalformedSearch),
    (400, "item_ref_malformed", ErrorKind::MalformedRef),
    (400, "search_param_invalid", ErrorKind::InvalidSearchParam),
    (401, "security_unauthorized", ErrorKind::Unauthorized),
    (404, "items_not_found", ErrorKind::NotFound),
    (409, "indexing_conflict", ErrorKind::IndexingConflict),
    (412, "item_version_mismatch", ErrorKind::VersionMismatch),
    (412, "item_already_present", ErrorKind::AlreadyPresent),
    (500, "security_authentication", ErrorKind::SecurityAuthentication),
    (500, "search_index_not_found", ErrorKind::SearchIndexNotFound),
    (500, "internal_error", ErrorKind::InternalError),
];

/// Look up the kind registered for an exact `(status, code)` pair.
pub fn kind_for(status: u16, code: &str) -> Option<ErrorKind> {
    ERROR_REGISTRY
        .iter()
        .find(|(s, c, _)| *s == status && *c == code)
        .map(|(_, _, k)| *k)
}

/// Kind for a failure whose body carried no api code.
///
/// If exactly one registration matches the status it wins; otherwise the
/// status class decides the generic family. Statuses absent from the
/// registry entirely (418, 501, ...) always take the generic path.
pub fn kind_for_status(status: u16) -> ErrorKind {
    let mut matches = ERROR_REGISTRY.iter().filter(|(s, _, _)| *s == status);
    match (matches.next(), matches.next()) {
        (Some((_, _, kind)), None) => *kind,
        _ if status < 500 => ErrorKind::RequestError,
        _ => ErrorKind::ServiceError,
    }
}

/// Errors surfaced by the client.
///
/// Cloneable so a batched failure can be handed to every holder of the same
/// result slot; the transport source is shared behind an `Arc` for that
/// reason.
#[derive(Debug, Clone, Error)]
pub enum Error {
    /// The service answered with a non-success status.
    #[error("api error {kind} ({status}): {message}")]
    Api {
        /// Classified failure kind.
        kind: ErrorKind,
        /// HTTP status of the response.
        status: u16,
        /// Message from the error body, or the raw body for non-JSON errors.
        message: String,
        /// Request id echoed by the service, when present.
        request_id: Option<String>,
    },

    /// The HTTP round-trip itself failed.
    #[error("transport error: {0}")]
    Transport(Arc<reqwest::Error>),

    /// A response body did not match the expected shape.
    #[error("malformed response: {0}")]
    Decode(String),

    /// A batched result was observed before its batch was dispatched.
    #[error("results not ready: the deferred execution context is still open")]
    ResultsNotReady,
}

impl From<reqwest::Error> for Error {
    fn from(err: reqwest::Error) -> Self {
        Error::Transport(Arc::new(err))
    }
}

impl Error {
    /// The API failure kind, if this is an API error.
    pub fn kind(&self) -> Option<ErrorKind> {
        match self {
            Error::Api { kind, .. } => Some(*kind),
            _ => None,
        }
    }

    /// True iff this is an API error of the given kind.
    pub fn is_kind(&self, kind: ErrorKind) -> bool {
        self.kind() == Some(kind)
    }
}
