//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, Method};

use crate::path;

/// An incoming HTTP request, as seen by one dispatch chain.
///
/// The dispatcher rewrites [`path`](Request::path) and [`url`](Request::url)
/// as the request crosses a prefix-middleware or mounted-application
/// boundary. [`original_url`](Request::original_url) always holds the
/// target the client sent.
pub struct Request {
    pub(crate) method: Method,
    pub(crate) url: String,
    pub(crate) original_url: Option<String>,
    pub(crate) path: String,
    pub(crate) search: Option<String>,
    pub(crate) query: HashMap<String, Vec<String>>,
    pub(crate) params: HashMap<String, String>,
    pub(crate) headers: http::HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) extensions: Extensions,
}

impl Request {
    /// Builds a request for `method` and `url` (path plus optional query).
    ///
    /// Transports call this once per request; tests call it to drive
    /// [`App::handle`](crate::App::handle) without a socket.
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        let url = url.into();
        Self {
            method,
            path: url.clone(),
            url,
            original_url: None,
            search: None,
            query: HashMap::new(),
            params: HashMap::new(),
            headers: http::HeaderMap::new(),
            body: Bytes::new(),
            extensions: Extensions::new(),
        }
    }

    /// `GET url`.
    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        let url = parts
            .uri
            .path_and_query()
            .map_or_else(|| parts.uri.path().to_owned(), |pq| pq.as_str().to_owned());
        let mut req = Self::new(parts.method, url);
        req.headers = parts.headers;
        req.extensions = parts.extensions;
        req.body = body;
        req
    }

    /// Replaces the body. Chainable, for hand-built requests.
    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }

    /// Adds a header. Chainable, for hand-built requests.
    ///
    /// Invalid header names or values are skipped.
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            http::HeaderName::from_bytes(name.as_bytes()),
            http::HeaderValue::from_str(value),
        ) {
            self.headers.append(name, value);
        }
        self
    }

    pub fn method(&self) -> &Method { &self.method }
    pub fn url(&self) -> &str { &self.url }
    pub fn path(&self) -> &str { &self.path }
    pub fn headers(&self) -> &http::HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// The URL the client sent, before any prefix was stripped.
    pub fn original_url(&self) -> &str {
        self.original_url.as_deref().unwrap_or(&self.url)
    }

    /// The raw search string including the leading `?`, if any.
    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    /// Header lookup. Names are case-insensitive.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/:id`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// First value of a query parameter: `?page=2` → `req.query("page") == Some("2")`.
    pub fn query(&self, key: &str) -> Option<&str> {
        self.query.get(key)?.first().map(String::as_str)
    }

    /// Every value of a repeated query parameter, in order.
    pub fn query_all(&self, key: &str) -> &[String] {
        self.query.get(key).map(Vec::as_slice).unwrap_or_default()
    }

    /// Typed per-request storage shared by every handler in the chain.
    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Removes `prefix` from the front of both the working path and the URL.
    pub(crate) fn strip(&mut self, prefix: &str) {
        self.url = path::strip_prefix(prefix, &self.url);
        self.path = path::strip_prefix(prefix, &self.path);
    }
}
