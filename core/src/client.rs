//! The host client every endpoint is built from.
//!
//! # Design
//! `TalkClient` holds the server's base URL, the capability set the server
//! advertised, and the session that performs HTTP round-trips. It carries no
//! mutable state between calls; endpoints borrow it and only ever read from it.
//! Capability discovery happens elsewhere: the caller passes the set in.

use std::collections::BTreeSet;

use crate::chat::ChatApi;
use crate::config::ClientConfig;
use crate::error::{ApiError, Result};
use crate::http::Session;
use crate::session::UreqSession;

#[derive(Debug, Clone)]
pub struct TalkClient<S> {
    base_url: String,
    capabilities: BTreeSet<String>,
    session: S,
}

impl<S: Session> TalkClient<S> {
    pub fn new<I, C>(base_url: &str, capabilities: I, session: S) -> Self
    where
        I: IntoIterator<Item = C>,
        C: Into<String>,
    {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            capabilities: capabilities.into_iter().map(Into::into).collect(),
            session,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn capabilities(&self) -> &BTreeSet<String> {
        &self.capabilities
    }

    pub fn has_capability(&self, capability: &str) -> bool {
        self.capabilities.contains(capability)
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    /// The chat endpoint. Fails with `NotCapable` when the server does not
    /// advertise `chat-v2`.
    pub fn chat(&self) -> Result<ChatApi<'_, S>> {
        ChatApi::new(self)
    }
}

impl TalkClient<UreqSession> {
    /// Build a client backed by a blocking ureq session.
    pub fn from_config(config: &ClientConfig) -> Result<Self> {
        if config.url.trim().is_empty() {
            return Err(ApiError::Config("server url is empty".to_string()));
        }
        let session = UreqSession::from_config(config);
        Ok(Self::new(&config.url, config.capabilities.iter().cloned(), session))
    }
}
