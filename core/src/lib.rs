//! Blocking client core for the Nextcloud Talk chat API.
//!
//! # Overview
//! Turns method calls into requests against the Talk OCS endpoints, decodes
//! the XML OCS envelope the server answers with, and maps failure envelopes to
//! typed errors. The HTTP round-trip itself goes through a [`Session`], so the
//! core stays deterministic under test; [`UreqSession`] is the stock one.
//!
//! # Design
//! - [`TalkClient`] holds the base URL, the advertised capabilities and the
//!   session. Endpoints borrow it.
//! - [`OcsApi`] is the single query executor. Every endpoint operation is a
//!   `*_query` builder plus a call to [`OcsApi::query`].
//! - Payloads stay as `serde_json::Value`: OCS XML carries no types beyond
//!   strings, so callers decide how to read them.
//! - No retries, no background work. A long-poll blocks the calling thread
//!   for up to the requested timeout.
//!
//! ```no_run
//! use talk_core::{ClientConfig, ReceiveMarkers, ReceiveOptions, SendOptions, TalkClient};
//!
//! # fn main() -> talk_core::Result<()> {
//! let client = TalkClient::from_config(&ClientConfig::from_env()?)?;
//! let chat_api = client.chat()?;
//! let room = chat_api.chat("abc123");
//! room.send("hello", &SendOptions::default())?;
//! let batch = room.receive_messages(0, 0, &ReceiveOptions::default())?;
//! let markers = ReceiveMarkers::from_payload(&batch);
//! # let _ = markers;
//! # Ok(())
//! # }
//! ```

pub mod api;
pub mod chat;
pub mod client;
pub mod config;
pub mod envelope;
pub mod error;
pub mod http;
pub mod params;
pub mod rich_object;
pub mod session;
pub mod status;

pub use api::{request_header, OcsApi, Query, REQUEST_HEADERS_KEY};
pub use chat::{Chat, ChatApi, ReceiveMarkers, ReceiveOptions, SendOptions, ShareOptions};
pub use client::TalkClient;
pub use config::ClientConfig;
pub use error::{ApiError, Result};
pub use http::{HttpMethod, HttpRequest, HttpResponse, Session};
pub use params::{ParamValue, Params};
pub use rich_object::{Details, ObjectType, RichObject};
pub use session::UreqSession;
pub use status::ErrorKind;
