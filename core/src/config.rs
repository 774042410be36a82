//! Client configuration.
//!
//! Can be deserialized from any serde format or read from `NEXTCLOUD_*`
//! environment variables. Credentials are optional: without them the session
//! sends unauthenticated requests, which is what the mock server expects.

use serde::Deserialize;

use crate::error::{ApiError, Result};

pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Server root, e.g. `https://cloud.example.com`.
    pub url: String,
    pub user: Option<String>,
    /// An app password; the account password works too but is discouraged.
    pub app_password: Option<String>,
    /// Upper bound on a single round-trip. Must exceed the long-poll timeout.
    pub timeout_secs: u64,
    pub capabilities: Vec<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            user: None,
            app_password: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
            capabilities: vec!["chat-v2".to_string()],
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let url = lookup("NEXTCLOUD_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| ApiError::Config("NEXTCLOUD_URL is not set".to_string()))?;
        let timeout_secs = match lookup("NEXTCLOUD_TIMEOUT_SECS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                ApiError::Config(format!("NEXTCLOUD_TIMEOUT_SECS is not a number: {raw}"))
            })?,
            None => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Self {
            url,
            user: lookup("NEXTCLOUD_USER"),
            app_password: lookup("NEXTCLOUD_APP_PASSWORD"),
            timeout_secs,
            ..Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn reads_environment() {
        let config = ClientConfig::from_lookup(lookup(&[
            ("NEXTCLOUD_URL", "https://cloud.example.com"),
            ("NEXTCLOUD_USER", "alice"),
            ("NEXTCLOUD_APP_PASSWORD", "secret"),
            ("NEXTCLOUD_TIMEOUT_SECS", "90"),
        ]))
        .unwrap();
        assert_eq!(config.url, "https://cloud.example.com");
        assert_eq!(config.user.as_deref(), Some("alice"));
        assert_eq!(config.app_password.as_deref(), Some("secret"));
        assert_eq!(config.timeout_secs, 90);
        assert_eq!(config.capabilities, vec!["chat-v2".to_string()]);
    }

    #[test]
    fn url_is_required() {
        let err = ClientConfig::from_lookup(lookup(&[])).unwrap_err();
        assert!(matches!(err, ApiError::Config(_)));
    }

    #[test]
    fn bad_timeout_is_rejected() {
        let err = ClientConfig::from_lookup(lookup(&[
            ("NEXTCLOUD_URL", "https://cloud.example.com"),
            ("NEXTCLOUD_TIMEOUT_SECS", "soon"),
        ]))
        .unwrap_err();
        assert!(matches!(err, ApiError::Config(ref m) if m.contains("soon")));
    }

    #[test]
    fn deserializes_with_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"url":"https://cloud.example.com","user":"bob"}"#).unwrap();
        assert_eq!(config.timeout_secs, DEFAULT_TIMEOUT_SECS);
        assert_eq!(config.user.as_deref(), Some("bob"));
        assert!(config.app_password.is_none());
        assert_eq!(config.capabilities, vec!["chat-v2".to_string()]);
    }
}
