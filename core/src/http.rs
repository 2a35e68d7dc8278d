//! HTTP types exchanged between the resolver, the dispatcher and a transport.
//!
//! # Design
//! These types describe requests and responses as plain data. The core builds
//! `RequestPlan` values from configuration and hands an `HttpRequest` to a
//! transport; whoever performs the I/O reports back an `HttpResponse`. All
//! fields use owned types so values can move across threads and FFI
//! boundaries without lifetime concerns.
//!
//! Header maps are `BTreeMap`s: keys are unique and iteration order is
//! deterministic, which keeps plans comparable in tests and stable across the
//! C boundary.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Header name to header value. Keys are unique.
pub type Headers = BTreeMap<String, String>;

/// HTTP verb of a configured request.
///
/// Deserialization is lenient: names are matched case-insensitively and any
/// unrecognized value falls back to `Get`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE", from = "String")]
pub enum HttpMethod {
    #[default]
    Get,
    Put,
    Post,
    Patch,
    Delete,
}

impl HttpMethod {
    /// Wire-format verb.
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Put => "PUT",
            HttpMethod::Post => "POST",
            HttpMethod::Patch => "PATCH",
            HttpMethod::Delete => "DELETE",
        }
    }
}

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HttpMethod {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let method = match s.to_ascii_uppercase().as_str() {
            "PUT" => HttpMethod::Put,
            "POST" => HttpMethod::Post,
            "PATCH" => HttpMethod::Patch,
            "DELETE" => HttpMethod::Delete,
            _ => HttpMethod::Get,
        };
        Ok(method)
    }
}

impl From<String> for HttpMethod {
    fn from(s: String) -> Self {
        match s.parse() {
            Ok(method) => method,
            Err(never) => match never {},
        }
    }
}

/// A fully resolved, ready-to-send request description.
///
/// Produced by `RequestResolver` from a service record and a request record.
/// The plan carries no body; the caller supplies one at send time.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestPlan {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub timeout_seconds: f32,
}

impl RequestPlan {
    /// Attach a body, producing the request handed to a transport.
    pub fn into_request(self, body: impl Into<String>) -> HttpRequest {
        HttpRequest {
            method: self.method,
            url: self.url,
            headers: self.headers,
            body: body.into(),
            timeout_seconds: self.timeout_seconds,
        }
    }
}

/// An HTTP request as submitted to a transport.
#[derive(Debug, Clone, PartialEq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: Headers,
    pub body: String,
    /// Zero means the transport applies no per-request timeout.
    pub timeout_seconds: f32,
}

/// An HTTP response as reported by a transport after a round trip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Headers,
    pub body: String,
}

impl HttpResponse {
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Headers::new(),
            body: body.into(),
        }
    }

    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }
}

/// Response headers and content handed to handlers and subscribers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResponseData {
    pub headers: Headers,
    pub content: String,
}

impl From<HttpResponse> for ResponseData {
    fn from(response: HttpResponse) -> Self {
        Self {
            headers: response.headers,
            content: response.body,
        }
    }
}
