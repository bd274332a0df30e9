//! Per-request state handed to every middleware and handler.
//!
//! A [`RequestContext`] owns everything a chain entry may read: the method,
//! the normalized path, headers, the query map, the parsed JSON body, and —
//! once a route has matched — the bound path parameters. It lives for
//! exactly one request and is never shared across requests.

use std::collections::HashMap;

use crate::pattern::normalize_path;
use http::request::Parts;
use http::{HeaderMap, Method, Uri};
use serde_json::{Map, Value};

pub struct RequestContext {
    method: Method,
    uri: Uri,
    path: String,
    headers: HeaderMap,
    params: HashMap<String, String>,
    query: HashMap<String, String>,
    body: Value,
}

impl RequestContext {
    pub(crate) fn from_parts(parts: Parts) -> Self {
        let path = normalize_path(parts.uri.path()).to_string();
        let query = match parts.uri.query() {
            Some(raw) => serde_urlencoded::from_str(raw).unwrap_or_default(),
            None => HashMap::new(),
        };

        Self {
            method: parts.method,
            path,
            query,
            headers: parts.headers,
            uri: parts.uri,
            params: HashMap::new(),
            body: Value::Object(Map::new()),
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    /// The request URI exactly as received, query string included.
    pub fn uri(&self) -> &Uri {
        &self.uri
    }

    /// The request path with trailing slashes stripped (`/` stays `/`).
    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// A single path parameter bound by the matched route pattern.
    ///
    /// Empty until routing has matched; middleware therefore never sees
    /// parameters.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn params(&self) -> &HashMap<String, String> {
        &self.params
    }

    /// A single query-string value.
    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    /// The parsed request body.
    ///
    /// `{}` unless the method is body-bearing (POST/PUT/PATCH) and the
    /// payload parsed as JSON; a malformed payload also yields `{}`.
    pub fn body(&self) -> &Value {
        &self.body
    }

    pub(crate) fn bind_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }

    pub(crate) fn set_body(&mut self, body: Value) {
        self.body = body;
    }
}
