//! HTTP transport types and the session seam.
//!
//! # Design
//! Requests and responses are plain data. `OcsApi` builds an `HttpRequest`,
//! hands it to a [`Session`], and parses the returned `HttpResponse`. Whatever
//! sits behind the session (authentication, TLS, pooling, cancellation) is the
//! caller's business; tests plug in a canned session and never touch the
//! network.

use std::fmt;

use crate::error::Result;

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

impl fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An HTTP request described as plain data. `path` is the full URL,
/// including the query string for GET requests.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub path: String,
    pub headers: Vec<(String, String)>,
    pub body: Option<String>,
}

/// An HTTP response described as plain data, as returned by a [`Session`].
#[derive(Debug, Clone, Default)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl HttpResponse {
    /// Transport-level success: any 2xx status.
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    /// Case-insensitive header lookup. The first matching header wins.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key.eq_ignore_ascii_case(name))
            .map(|(_, value)| value.as_str())
    }
}

/// Executes one HTTP round-trip on behalf of the client.
///
/// Implementations should return non-2xx responses as `Ok` values; only a
/// failure to complete the exchange at all is an `Err`
/// ([`ApiError::Transport`](crate::ApiError::Transport)).
pub trait Session {
    fn request(&self, request: &HttpRequest) -> Result<HttpResponse>;
}

impl<S: Session + ?Sized> Session for &S {
    fn request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).request(request)
    }
}

impl<S: Session + ?Sized> Session for Box<S> {
    fn request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        (**self).request(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response(status: u16) -> HttpResponse {
        HttpResponse {
            status,
            headers: vec![("x-chat-last-given".to_string(), "42".to_string())],
            body: Vec::new(),
        }
    }

    #[test]
    fn success_is_2xx_only() {
        assert!(response(200).is_success());
        assert!(response(201).is_success());
        assert!(!response(304).is_success());
        assert!(!response(404).is_success());
        assert!(!response(199).is_success());
    }

    #[test]
    fn header_lookup_ignores_case() {
        let resp = response(200);
        assert_eq!(resp.header("X-Chat-Last-Given"), Some("42"));
        assert_eq!(resp.header("X-Chat-Last-Common-Read"), None);
    }

    #[test]
    fn method_names() {
        assert_eq!(HttpMethod::Get.to_string(), "GET");
        assert_eq!(HttpMethod::Delete.as_str(), "DELETE");
    }
}
