//! HTTP transport types for the host-does-IO pattern.
//!
//! # Design
//! The feed is read with a single GET, so a request is just a fully encoded
//! URL plus headers. `ApodClient` builds `HttpRequest` values and parses
//! `HttpResponse` values; whoever holds a `Transport` (or a native host on the
//! far side of the FFI boundary) performs the round-trip in between.
//!
//! All fields use owned types (`String`, `Vec`) so values can cross threads
//! and FFI boundaries without lifetime concerns.

/// A GET request described as plain data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    /// Absolute URL including the encoded query string.
    pub url: String,
    pub headers: Vec<(String, String)>,
}

/// An HTTP response described as plain data.
#[derive(Debug, Clone)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl HttpResponse {
    /// Shorthand for a response with no headers.
    pub fn new(status: u16, body: impl Into<String>) -> Self {
        Self {
            status,
            headers: Vec::new(),
            body: body.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}
