//! HTTP transport types and the `Transport` seam.
//!
//! # Design
//! Requests and responses are plain data. `ApiClient` builds `HttpRequest`
//! values, hands them to a `Transport` for the actual I/O, and normalizes
//! the returned `HttpResponse`. Swapping the transport is how tests script
//! backend replies without a network.
//!
//! The query string is kept as separate key/value pairs rather than baked
//! into `path`, so the transport owns percent-encoding and tests can assert
//! on exactly which filter keys were sent.

use serde::Serialize;
use serde_json::Value;

use crate::error::{ApiError, TransportError};

/// HTTP method for a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Delete,
}

impl HttpMethod {
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
            HttpMethod::Put => "PUT",
            HttpMethod::Delete => "DELETE",
        }
    }
}

/// An HTTP request described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    /// Absolute URL without the query string.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

impl HttpRequest {
    pub fn new(method: HttpMethod, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            headers: Vec::new(),
            body: None,
        }
    }

    /// Append the fields of `filter` as query parameters.
    ///
    /// `filter` must serialize to a JSON object. Null fields are dropped so an
    /// absent filter never reaches the backend as `key=` or `key=null`.
    pub fn with_query<F: Serialize + ?Sized>(mut self, filter: &F) -> Result<Self, ApiError> {
        let value =
            serde_json::to_value(filter).map_err(|e| ApiError::Serialization(e.to_string()))?;
        match value {
            Value::Object(fields) => {
                for (key, value) in fields {
                    push_query_value(&mut self.query, key, value);
                }
                Ok(self)
            }
            Value::Null => Ok(self),
            other => Err(ApiError::Serialization(format!(
                "query parameters must be an object, got {other}"
            ))),
        }
    }

    /// Attach a JSON body and the matching content type.
    pub fn with_json<B: Serialize + ?Sized>(mut self, body: &B) -> Result<Self, ApiError> {
        let body = serde_json::to_string(body).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.headers
            .push(("content-type".to_string(), "application/json".to_string()));
        self.body = Some(body);
        Ok(self)
    }

    pub fn with_header(mut self, name: &str, value: impl Into<String>) -> Self {
        self.headers.push((name.to_ascii_lowercase(), value.into()));
        self
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    pub fn query_value(&self, key: &str) -> Option<&str> {
        self.query
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Convenience constructor for a JSON reply.
    pub fn json(status: u16, body: &Value) -> Self {
        Self {
            status,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup.
    pub fn header(&self, name: &str) -> Option<&str> {
        find_header(&self.headers, name)
    }

    /// The media type of the body, without parameters such as `charset`.
    pub fn content_type(&self) -> Option<String> {
        self.header("content-type")
            .and_then(|v| v.split(';').next())
            .map(|v| v.trim().to_ascii_lowercase())
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

/// Executes `HttpRequest` values against the network.
///
/// Implementations must return every completed response as data, including
/// 4xx and 5xx; only a failure to obtain a response is a `TransportError`.
pub trait Transport: Send + Sync {
    fn execute(&self, request: &HttpRequest) -> Result<HttpResponse, TransportError>;
}

fn find_header<'a>(headers: &'a [(String, String)], name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

fn push_query_value(query: &mut Vec<(String, String)>, key: String, value: Value) {
    match value {
        Value::Null => {}
        Value::String(s) => query.push((key, s)),
        Value::Bool(b) => query.push((key, b.to_string())),
        Value::Number(n) => query.push((key, n.to_string())),
        Value::Array(items) => {
            let key = format!("{key}[]");
            for item in items {
                push_query_value(query, key.clone(), item);
            }
        }
        Value::Object(_) => query.push((key, value.to_string())),
    }
}
