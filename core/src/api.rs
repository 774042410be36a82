//! The OCS query executor shared by every endpoint.
//!
//! # Design
//! A query is split in two: [`OcsApi::build_request`] turns a [`Query`] into
//! an `HttpRequest`, and [`parse_response`] turns the `HttpResponse` back into
//! the envelope's payload or a typed error.
//! [`OcsApi::query`] glues the two together through the client's session. Both
//! halves are public so a caller can drive the round-trip itself.

use serde_json::{Map, Value};

use crate::client::TalkClient;
use crate::envelope::{self, Meta};
use crate::error::Result;
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Session};
use crate::params::{ParamValue, Params};

/// Key under which captured response headers are inserted into a payload.
pub const REQUEST_HEADERS_KEY: &str = "request_headers";

/// Status the chat long-poll answers with when nothing new arrived.
const NOT_MODIFIED: u16 = 304;

/// One request against an OCS endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub method: HttpMethod,
    /// Path appended to the endpoint (or to `url` when set).
    pub sub: String,
    /// Replaces the endpoint as the URL prefix.
    pub url: Option<String>,
    pub params: Params,
    /// Response headers to copy into the payload under `request_headers`.
    pub include_headers: Vec<String>,
}

impl Query {
    pub fn new(method: HttpMethod, sub: &str) -> Self {
        Self {
            method,
            sub: sub.to_string(),
            url: None,
            params: Params::new(),
            include_headers: Vec::new(),
        }
    }

    pub fn get(sub: &str) -> Self {
        Self::new(HttpMethod::Get, sub)
    }

    pub fn post(sub: &str) -> Self {
        Self::new(HttpMethod::Post, sub)
    }

    pub fn param(mut self, name: &str, value: impl Into<ParamValue>) -> Self {
        self.params.insert(name, value);
        self
    }

    pub fn params(mut self, params: Params) -> Self {
        self.params = params;
        self
    }

    pub fn url(mut self, url: &str) -> Self {
        self.url = Some(url.to_string());
        self
    }

    pub fn include_header(mut self, name: &str) -> Self {
        self.include_headers.push(name.to_string());
        self
    }
}

/// An OCS API rooted at `{base_url}{api_path}`.
#[derive(Debug)]
pub struct OcsApi<'c, S> {
    client: &'c TalkClient<S>,
    endpoint: String,
}

impl<'c, S: Session> OcsApi<'c, S> {
    pub fn new(client: &'c TalkClient<S>, api_path: &str) -> Self {
        Self {
            endpoint: format!("{}{api_path}", client.base_url()),
            client,
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn build_request(&self, query: &Query) -> HttpRequest {
        let prefix = query.url.as_deref().unwrap_or(&self.endpoint);
        let target = format!("{prefix}{}", query.sub);
        let mut headers = vec![
            ("OCS-APIRequest".to_string(), "true".to_string()),
            ("Accept".to_string(), "application/xml".to_string()),
        ];

        match query.method {
            HttpMethod::Get => {
                let path = if query.params.is_empty() {
                    target
                } else {
                    format!("{target}?{}", query.params.encode())
                };
                HttpRequest {
                    method: query.method,
                    path,
                    headers,
                    body: None,
                }
            }
            method => {
                headers.push((
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ));
                HttpRequest {
                    method,
                    path: target,
                    headers,
                    body: Some(query.params.encode()),
                }
            }
        }
    }

    /// Build, send and parse one query.
    pub fn query(&self, query: Query) -> Result<Value> {
        let request = self.build_request(&query);
        tracing::debug!(method = %request.method, url = %request.path, "sending OCS request");
        let response = self.client.session().request(&request)?;
        tracing::debug!(status = response.status, "received OCS response");
        parse_response(response, &query.include_headers)
    }
}

/// Turn a response into the envelope payload, or the error its meta describes.
pub fn parse_response(response: HttpResponse, include_headers: &[String]) -> Result<Value> {
    if response.status == NOT_MODIFIED && response.body.iter().all(u8::is_ascii_whitespace) {
        let mut payload = Value::Object(Map::new());
        capture_headers(&mut payload, &response, include_headers);
        return Ok(payload);
    }

    let document = envelope::decode(&response.body)?;
    if response.is_success() {
        let mut payload = envelope::payload(document).inspect_err(|err| {
            tracing::warn!(status = response.status, error = %err, "success response without payload");
        })?;
        capture_headers(&mut payload, &response, include_headers);
        Ok(payload)
    } else {
        let meta = Meta::from_document(&document)?;
        let err = meta.into_error();
        tracing::warn!(status = response.status, error = %err, "OCS request failed");
        Err(err)
    }
}

/// Copy the named response headers into `payload.request_headers`. Only
/// mapping payloads can carry them; a missing header is recorded as `null`.
fn capture_headers(payload: &mut Value, response: &HttpResponse, include_headers: &[String]) {
    let Value::Object(map) = payload else {
        return;
    };
    if include_headers.is_empty() {
        return;
    }
    let slot = map
        .entry(REQUEST_HEADERS_KEY)
        .or_insert_with(|| Value::Object(Map::new()));
    let Value::Object(captured) = slot else {
        return;
    };
    for name in include_headers {
        captured.entry(name.as_str()).or_insert_with(|| {
            response
                .header(name)
                .map(|value| Value::String(value.to_string()))
                .unwrap_or(Value::Null)
        });
    }
}

/// Read a header captured by a query, e.g. `X-Chat-Last-Given`.
pub fn request_header<'v>(payload: &'v Value, name: &str) -> Option<&'v str> {
    payload.get(REQUEST_HEADERS_KEY)?.get(name)?.as_str()
}
