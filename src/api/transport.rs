use std::collections::VecDeque;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use dashmap::DashMap;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::Mutex;
use tracing::debug;

use crate::config::{Auth, Settings};
use crate::error::ApiError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Method::Get => "GET",
            Method::Post => "POST",
            Method::Put => "PUT",
            Method::Patch => "PATCH",
            Method::Delete => "DELETE",
        };
        f.write_str(s)
    }
}

impl From<Method> for reqwest::Method {
    fn from(method: Method) -> Self {
        match method {
            Method::Get => reqwest::Method::GET,
            Method::Post => reqwest::Method::POST,
            Method::Put => reqwest::Method::PUT,
            Method::Patch => reqwest::Method::PATCH,
            Method::Delete => reqwest::Method::DELETE,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub method: Method,
    /// Path relative to the API host, e.g. `/api/v2/credentials/`.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<Value>,
}

impl Request {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::Get, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::Delete, path)
    }

    pub fn post(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Post, path).with_body(body)
    }

    pub fn put(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Put, path).with_body(body)
    }

    pub fn patch(path: impl Into<String>, body: Value) -> Self {
        Self::new(Method::Patch, path).with_body(body)
    }

    pub fn with_body(mut self, body: Value) -> Self {
        self.body = Some(body);
        self
    }

    pub fn with_query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Path plus encoded query string. Used in error messages and as the
    /// routing key of [`InMemoryTransport`].
    pub fn url(&self) -> String {
        if self.query.is_empty() {
            return self.path.clone();
        }
        let query = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(self.query.iter())
            .finish();
        let sep = if self.path.contains('?') { '&' } else { '?' };
        format!("{}{}{}", self.path, sep, query)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    pub status: u16,
    pub body: Value,
}

impl Response {
    pub fn new(status: u16, body: Value) -> Self {
        Self { status, body }
    }

    pub fn ok(body: Value) -> Self {
        Self::new(200, body)
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

// --- Interfaces ---

/// Sends one request to the backend. Non-2xx statuses are returned as
/// responses; only failures to exchange a request at all are errors.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: Request) -> Result<Response, ApiError>;
}

// --- HTTP Implementation ---

#[derive(Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: String,
    auth: Auth,
}

impl HttpTransport {
    pub fn new(settings: &Settings) -> Result<Self, ApiError> {
        let mut builder = Client::builder().user_agent(settings.user_agent.clone());
        if let Some(secs) = settings.request_timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build().map_err(|e| ApiError::Transport {
            url: settings.base_url.clone(),
            message: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            auth: settings.auth.clone(),
        })
    }

    fn absolute(&self, path: &str) -> String {
        // Pagination cursors may already carry the host.
        if path.starts_with("http://") || path.starts_with("https://") {
            path.to_string()
        } else {
            format!("{}{}", self.base_url, path)
        }
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: Request) -> Result<Response, ApiError> {
        let url = self.absolute(&request.path);
        debug!(method = %request.method, url = %url, "Sending request");

        let mut builder = self.client.request(request.method.into(), &url);
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder.json(body);
        }
        builder = match &self.auth {
            Auth::None => builder,
            Auth::Token { token } => builder.bearer_auth(token),
            Auth::Basic { username, password } => builder.basic_auth(username, Some(password)),
        };

        let response = builder.send().await.map_err(|e| ApiError::Transport {
            url: request.url(),
            message: e.to_string(),
        })?;
        let status = response.status().as_u16();
        let text = response.text().await.map_err(|e| ApiError::Transport {
            url: request.url(),
            message: e.to_string(),
        })?;

        // DELETE and disassociate calls answer with an empty body.
        let body = if text.trim().is_empty() {
            Value::Null
        } else {
            match serde_json::from_str(&text) {
                Ok(json) => json,
                Err(_) => Value::String(text),
            }
        };

        Ok(Response { status, body })
    }
}

// --- In-Memory Implementation ---

/// Canned-response backend. Responses are queued per `"<METHOD> <url>"` key;
/// the last queued response for a key is sticky once the queue drains.
pub struct InMemoryTransport {
    routes: DashMap<String, VecDeque<Response>>,
    requests: Mutex<Vec<Request>>,
}

impl InMemoryTransport {
    pub fn new() -> Self {
        Self {
            routes: DashMap::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    fn key(method: Method, url: &str) -> String {
        format!("{} {}", method, url)
    }

    pub fn respond(&self, method: Method, url: &str, status: u16, body: Value) {
        self.routes
            .entry(Self::key(method, url))
            .or_default()
            .push_back(Response::new(status, body));
    }

    pub fn respond_ok(&self, method: Method, url: &str, body: Value) {
        self.respond(method, url, 200, body);
    }

    pub async fn requests(&self) -> Vec<Request> {
        self.requests.lock().await.clone()
    }

    pub async fn requests_matching(&self, method: Method) -> Vec<Request> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|r| r.method == method)
            .cloned()
            .collect()
    }
}

impl Default for InMemoryTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for InMemoryTransport {
    async fn send(&self, request: Request) -> Result<Response, ApiError> {
        let key = Self::key(request.method, &request.url());
        self.requests.lock().await.push(request);

        let response = match self.routes.get_mut(&key) {
            Some(mut queue) => {
                if queue.len() > 1 {
                    queue.pop_front()
                } else {
                    queue.front().cloned()
                }
            }
            None => None,
        };

        Ok(response.unwrap_or_else(|| Response::new(404, json!({ "detail": "Not found." }))))
    }
}
