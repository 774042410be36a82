//! Blocking [`Session`] backed by ureq.
//!
//! Status codes are returned as data (`http_status_as_error(false)`), so the
//! OCS layer sees 4xx/5xx envelopes instead of ureq errors. Only a failure to
//! complete the exchange becomes [`ApiError::Transport`].

use std::fmt;
use std::time::Duration;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use ureq::Agent;

use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::{HttpMethod, HttpRequest, HttpResponse, Session};

#[derive(Clone)]
pub struct UreqSession {
    agent: Agent,
    authorization: Option<String>,
}

impl UreqSession {
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self {
            agent,
            authorization: None,
        }
    }

    /// Send HTTP basic credentials with every request.
    pub fn with_basic_auth(mut self, user: &str, password: &str) -> Self {
        let token = STANDARD.encode(format!("{user}:{password}"));
        self.authorization = Some(format!("Basic {token}"));
        self
    }

    pub fn from_config(config: &ClientConfig) -> Self {
        let session = Self::new(Duration::from_secs(config.timeout_secs));
        match (&config.user, &config.app_password) {
            (Some(user), Some(password)) => session.with_basic_auth(user, password),
            _ => session,
        }
    }

    pub fn is_authenticated(&self) -> bool {
        self.authorization.is_some()
    }

    fn headers<'a>(&'a self, request: &'a HttpRequest) -> impl Iterator<Item = (&'a str, &'a str)> {
        request
            .headers
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .chain(self.authorization.as_deref().map(|auth| ("Authorization", auth)))
    }
}

impl fmt::Debug for UreqSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UreqSession")
            .field("authenticated", &self.is_authenticated())
            .finish_non_exhaustive()
    }
}

impl Session for UreqSession {
    fn request(&self, request: &HttpRequest) -> Result<HttpResponse> {
        let body = request.body.as_deref().unwrap_or_default().as_bytes();
        let result = match request.method {
            HttpMethod::Get => {
                let mut builder = self.agent.get(&request.path);
                for (name, value) in self.headers(request) {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Delete => {
                let mut builder = self.agent.delete(&request.path);
                for (name, value) in self.headers(request) {
                    builder = builder.header(name, value);
                }
                builder.call()
            }
            HttpMethod::Post => {
                let mut builder = self.agent.post(&request.path);
                for (name, value) in self.headers(request) {
                    builder = builder.header(name, value);
                }
                builder.send(body)
            }
            HttpMethod::Put => {
                let mut builder = self.agent.put(&request.path);
                for (name, value) in self.headers(request) {
                    builder = builder.header(name, value);
                }
                builder.send(body)
            }
        };
        let mut response = result.map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|value| (name.as_str().to_string(), value.to_string()))
            })
            .collect();
        let body = response
            .body_mut()
            .read_to_vec()
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        tracing::debug!(method = %request.method, url = %request.path, status, "session round-trip");
        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}
