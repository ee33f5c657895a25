use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;

use trove_core::{ClientConfig, Result};

/// HTTP method of a request intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    Get,
    Head,
    Put,
    Post,
    Delete,
}

/// A fully described request intent, ready for dispatch.
///
/// Cursor links arrive as path-with-query URIs; those are passed verbatim
/// as `path` with an empty query slice.
#[derive(Debug, Clone)]
pub struct Request {
    pub method: Method,
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<serde_json::Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn head(path: impl Into<String>) -> Self {
        Self::new(Method::Head, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::Put, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::Post, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn query(mut self, query: Vec<(String, String)>) -> Self {
        self.query = query;
        self
    }

    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    pub fn body(mut self, body: serde_json::Value) -> Self {
        self.body = Some(body);
        self
    }
}

/// Raw outcome of one HTTP round-trip.
#[derive(Debug, Clone)]
pub struct RawResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// The transport collaborator.
///
/// Owns connection pooling, TLS and socket-level concerns; everything above
/// it works with completed `(status, headers, body)` outcomes only.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(&self, request: &Request) -> Result<RawResponse>;
}

/// reqwest-backed transport.
pub struct HttpTransport {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl HttpTransport {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .user_agent(&config.user_agent);
        if config.insecure_skip_verify {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            http: builder.build()?,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(&self, request: &Request) -> Result<RawResponse> {
        let url = format!("{}{}", self.base_url, request.path);
        let method = match request.method {
            Method::Get => reqwest::Method::GET,
            Method::Head => reqwest::Method::HEAD,
            Method::Put => reqwest::Method::PUT,
            Method::Post => reqwest::Method::POST,
            Method::Delete => reqwest::Method::DELETE,
        };

        let mut req = self
            .http
            .request(method, &url)
            .header("X-Request-Id", uuid::Uuid::new_v4().to_string());
        if !request.query.is_empty() {
            req = req.query(&request.query);
        }
        if !self.api_key.is_empty() {
            req = req.basic_auth(&self.api_key, Some(""));
        }
        for (name, value) in &request.headers {
            req = req.header(name, value);
        }
        if let Some(body) = &request.body {
            req = req.json(body);
        }

        let started = std::time::Instant::now();
        let response = req.send().await?;
        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| {
                (
                    k.as_str().to_string(),
                    v.to_str().unwrap_or_default().to_string(),
                )
            })
            .collect();
        let body = response.bytes().await?.to_vec();

        tracing::debug!(
            status,
            path = %request.path,
            elapsed_ms = started.elapsed().as_millis() as u64,
            "request complete"
        );

        Ok(RawResponse {
            status,
            headers,
            body,
        })
    }
}

#[cfg(test)]
pub(crate) mod mock {
    //! Scripted transport for exercising the client without a server.

    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    pub struct MockTransport {
        responses: Mutex<VecDeque<RawResponse>>,
        pub requests: Mutex<Vec<Request>>,
    }

    impl MockTransport {
        pub fn new() -> Self {
            Self {
                responses: Mutex::new(VecDeque::new()),
                requests: Mutex::new(Vec::new()),
            }
        }

        /// Queue a JSON response with the given extra headers.
        pub fn push_json(&self, status: u16, headers: &[(&str, &str)], body: serde_json::Value) {
            let mut all = vec![("content-type".to_string(), "application/json".to_string())];
            all.extend(
                headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string())),
            );
            self.responses.lock().unwrap().push_back(RawResponse {
                status,
                headers: all.into_iter().collect(),
                body: serde_json::to_vec(&body).unwrap(),
            });
        }

        /// Queue a bodyless response (write acks, deletes).
        pub fn push_empty(&self, status: u16, headers: &[(&str, &str)]) {
            self.responses.lock().unwrap().push_back(RawResponse {
                status,
                headers: headers
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
                body: Vec::new(),
            });
        }

        pub fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }

        pub fn request(&self, index: usize) -> Request {
            self.requests.lock().unwrap()[index].clone()
        }
    }

    #[async_trait]
    impl Transport for MockTransport {
        async fn execute(&self, request: &Request) -> Result<RawResponse> {
            self.requests.lock().unwrap().push(request.clone());
            self.responses
                .lock()
                .unwrap()
                .pop_front()
                .ok_or_else(|| trove_core::Error::Decode("mock transport exhausted".to_string()))
        }
    }
}
