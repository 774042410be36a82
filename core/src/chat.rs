//! Chat endpoint: receive, send and share into a conversation.
//!
//! # Design
//! `ChatApi` is the endpoint, checked against the client's capabilities once
//! at construction. `Chat` is a handle on one conversation token; its methods
//! only assemble parameters and hand a [`Query`] to the shared executor.
//! Receiving never loops: the caller polls, feeding back the markers in
//! [`ReceiveMarkers`].

use std::fmt;

use serde_json::Value;
use uuid::Uuid;

use crate::api::{request_header, OcsApi, Query};
use crate::client::TalkClient;
use crate::error::{ApiError, Result};
use crate::http::Session;
use crate::params::Params;
use crate::rich_object::RichObject;

/// Capability the server must advertise for this endpoint.
pub const CHAT_CAPABILITY: &str = "chat-v2";

pub const CHAT_API_PATH: &str = "/ocs/v2.php/apps/spreed/api/v1";

pub const LAST_GIVEN_HEADER: &str = "X-Chat-Last-Given";
pub const LAST_COMMON_READ_HEADER: &str = "X-Chat-Last-Common-Read";

/// Options for [`Chat::receive_messages`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReceiveOptions {
    /// Wait for messages newer than the last known one (long-poll) instead of
    /// reading history backwards.
    pub look_into_future: bool,
    pub limit: u32,
    /// Seconds the server may hold a long-poll open.
    pub timeout: u32,
    pub set_read_marker: bool,
    pub include_last_known: bool,
}

impl Default for ReceiveOptions {
    fn default() -> Self {
        Self {
            look_into_future: false,
            limit: 100,
            timeout: 30,
            set_read_marker: true,
            include_last_known: false,
        }
    }
}

/// Options for [`Chat::send`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SendOptions {
    /// Parent message id, 0 for none.
    pub reply_to: i64,
    /// Guest display name.
    pub display_name: Option<String>,
    pub reference_id: Option<String>,
    pub silent: bool,
}

impl SendOptions {
    /// Tag the message with a fresh random reference id (32 hex chars).
    pub fn with_random_reference(mut self) -> Self {
        self.reference_id = Some(Uuid::new_v4().simple().to_string());
        self
    }
}

/// Options for [`Chat::share`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ShareOptions {
    pub actor_display_name: Option<String>,
    pub reference_id: Option<String>,
}

/// Markers the server returns with every batch of messages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ReceiveMarkers {
    pub last_given: Option<i64>,
    pub last_common_read: Option<i64>,
}

impl ReceiveMarkers {
    pub fn from_payload(payload: &Value) -> Self {
        let marker = |name: &str| -> Option<i64> {
            request_header(payload, name).and_then(|v| v.trim().parse().ok())
        };
        Self {
            last_given: marker(LAST_GIVEN_HEADER),
            last_common_read: marker(LAST_COMMON_READ_HEADER),
        }
    }
}

/// The chat endpoint of a Talk server.
#[derive(Debug)]
pub struct ChatApi<'c, S> {
    api: OcsApi<'c, S>,
}

impl<'c, S: Session> ChatApi<'c, S> {
    pub fn new(client: &'c TalkClient<S>) -> Result<Self> {
        if !client.has_capability(CHAT_CAPABILITY) {
            tracing::warn!(base_url = client.base_url(), "server lacks {CHAT_CAPABILITY}");
            return Err(ApiError::NotCapable(
                "Unable to determine chat endpoint.".to_string(),
            ));
        }
        Ok(Self {
            api: OcsApi::new(client, CHAT_API_PATH),
        })
    }

    pub fn endpoint(&self) -> &str {
        self.api.endpoint()
    }

    pub fn api(&self) -> &OcsApi<'c, S> {
        &self.api
    }

    /// A handle on the conversation identified by `token`.
    pub fn chat(&self, token: &str) -> Chat<'_, 'c, S> {
        Chat {
            token: token.to_string(),
            api: &self.api,
        }
    }
}

/// One conversation.
#[derive(Debug)]
pub struct Chat<'a, 'c, S> {
    token: String,
    api: &'a OcsApi<'c, S>,
}

impl<S: Session> Chat<'_, '_, S> {
    pub fn token(&self) -> &str {
        &self.token
    }

    fn path(&self) -> String {
        format!("/chat/{}", self.token)
    }

    pub fn receive_query(
        &self,
        last_known_message: i64,
        last_common_read: i64,
        options: &ReceiveOptions,
    ) -> Query {
        let params = Params::new()
            .with("lookIntoFuture", options.look_into_future)
            .with("limit", options.limit)
            .with("lastKnownMessageId", last_known_message)
            .with("lastCommonReadId", last_common_read)
            .with("timeout", options.timeout)
            .with("setReadMarker", options.set_read_marker)
            .with("includeLastKnown", options.include_last_known);
        Query::get(&self.path())
            .params(params)
            .include_header(LAST_GIVEN_HEADER)
            .include_header(LAST_COMMON_READ_HEADER)
    }

    /// Fetch one batch of messages. The payload carries the
    /// `X-Chat-Last-Given` and `X-Chat-Last-Common-Read` headers under
    /// `request_headers`; see [`ReceiveMarkers`].
    pub fn receive_messages(
        &self,
        last_known_message: i64,
        last_common_read: i64,
        options: &ReceiveOptions,
    ) -> Result<Value> {
        self.api
            .query(self.receive_query(last_known_message, last_common_read, options))
    }

    pub fn send_query(&self, message: &str, options: &SendOptions) -> Query {
        let params = Params::new()
            .with("message", message)
            .with("replyTo", options.reply_to)
            .with("displayName", options.display_name.clone())
            .with("referenceId", options.reference_id.clone())
            .with("silent", options.silent);
        Query::post(&self.path()).params(params)
    }

    /// Post a text message.
    pub fn send(&self, message: &str, options: &SendOptions) -> Result<Value> {
        self.api.query(self.send_query(message, options))
    }

    pub fn share_query(&self, object: &RichObject, options: &ShareOptions) -> Result<Query> {
        let metadata = serde_json::to_string(&object.metadata())?;
        let params = Params::new()
            .with("objectType", object.object_type().as_str())
            .with("objectId", object.id())
            .with("metaData", metadata)
            .with("actorDisplayName", options.actor_display_name.clone())
            .with("referenceId", options.reference_id.clone());
        Ok(Query::post(&format!("{}/share", self.path())).params(params))
    }

    /// Share a rich object into the conversation.
    pub fn share(&self, object: &RichObject, options: &ShareOptions) -> Result<Value> {
        self.api.query(self.share_query(object, options)?)
    }
}

impl<S> fmt::Display for Chat<'_, '_, S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Chat({})", self.token)
    }
}

#[cfg(test)]
mod tests {
    use std::cell::{Cell, RefCell};

    use serde_json::json;

    use super::*;
    use crate::http::{HttpMethod, HttpRequest, HttpResponse};
    use crate::params::ParamValue;
    use crate::rich_object::ObjectType;

    const BASE: &str = "https://cloud.example.com";

    /// Answers every request with a one-message success envelope.
    #[derive(Debug, Default)]
    struct RecordingSession {
        calls: Cell<usize>,
        last: RefCell<Option<HttpRequest>>,
    }

    impl Session for RecordingSession {
        fn request(&self, request: &HttpRequest) -> Result<HttpResponse> {
            self.calls.set(self.calls.get() + 1);
            *self.last.borrow_mut() = Some(request.clone());
            Ok(HttpResponse {
                status: 200,
                headers: vec![
                    ("X-Chat-Last-Given".to_string(), "41".to_string()),
                    ("X-Chat-Last-Common-Read".to_string(), "40".to_string()),
                ],
                body: b"<ocs><meta><statuscode>200</statuscode></meta><data><id>41</id></data></ocs>".to_vec(),
            })
        }
    }

    fn client(capabilities: &[&str]) -> TalkClient<RecordingSession> {
        TalkClient::new(BASE, capabilities.iter().copied(), RecordingSession::default())
    }

    #[test]
    fn missing_capability_fails_before_any_request() {
        let client = client(&["chat-v1"]);
        let err = ChatApi::new(&client).unwrap_err();
        assert!(matches!(err, ApiError::NotCapable(_)));
        assert_eq!(client.session().calls.get(), 0);
    }

    #[test]
    fn endpoint_uses_v2_path() {
        let client = client(&["chat-v2"]);
        let chat = client.chat().unwrap();
        assert_eq!(chat.endpoint(), "https://cloud.example.com/ocs/v2.php/apps/spreed/api/v1");
        assert_eq!(chat.chat("abc123").to_string(), "Chat(abc123)");
    }

    #[test]
    fn receive_encodes_flags_as_numbers() {
        let client = client(&["chat-v2"]);
        let api = client.chat().unwrap();
        let chat = api.chat("abc123");

        let future = ReceiveOptions {
            look_into_future: true,
            ..ReceiveOptions::default()
        };
        let req = api.api().build_request(&chat.receive_query(10, 9, &future));
        assert_eq!(
            req.path,
            "https://cloud.example.com/ocs/v2.php/apps/spreed/api/v1/chat/abc123?lookIntoFuture=1&limit=100&lastKnownMessageId=10&lastCommonReadId=9&timeout=30&setReadMarker=1&includeLastKnown=0"
        );

        let req = api
            .api()
            .build_request(&chat.receive_query(10, 9, &ReceiveOptions::default()));
        assert!(req.path.contains("lookIntoFuture=0"));
    }

    #[test]
    fn receive_returns_markers() {
        let client = client(&["chat-v2"]);
        let api = client.chat().unwrap();
        let payload = api
            .chat("abc123")
            .receive_messages(0, 0, &ReceiveOptions::default())
            .unwrap();
        assert_eq!(payload["id"], "41");
        assert_eq!(
            ReceiveMarkers::from_payload(&payload),
            ReceiveMarkers {
                last_given: Some(41),
                last_common_read: Some(40)
            }
        );
        let sent = client.session().last.borrow().clone().unwrap();
        assert_eq!(sent.method, HttpMethod::Get);
    }

    #[test]
    fn markers_default_to_none() {
        assert_eq!(ReceiveMarkers::from_payload(&json!({})), ReceiveMarkers::default());
        let payload = json!({"request_headers": {"X-Chat-Last-Given": null, "X-Chat-Last-Common-Read": "x"}});
        assert_eq!(ReceiveMarkers::from_payload(&payload), ReceiveMarkers::default());
    }

    #[test]
    fn send_omits_unset_optional_fields() {
        let client = client(&["chat-v2"]);
        let api = client.chat().unwrap();
        let query = api.chat("abc123").send_query("hello world", &SendOptions::default());
        assert_eq!(query.params.get("displayName"), Some(&ParamValue::Null));

        api.chat("abc123").send("hello world", &SendOptions::default()).unwrap();
        let sent = client.session().last.borrow().clone().unwrap();
        assert_eq!(sent.method, HttpMethod::Post);
        assert_eq!(sent.path, "https://cloud.example.com/ocs/v2.php/apps/spreed/api/v1/chat/abc123");
        assert_eq!(sent.body.as_deref(), Some("message=hello+world&replyTo=0&silent=0"));
    }

    #[test]
    fn send_with_all_options() {
        let client = client(&["chat-v2"]);
        let api = client.chat().unwrap();
        let options = SendOptions {
            reply_to: 7,
            display_name: Some("Guest".to_string()),
            reference_id: Some("ref-1".to_string()),
            silent: true,
        };
        let req = api.api().build_request(&api.chat("abc123").send_query("hi", &options));
        assert_eq!(
            req.body.as_deref(),
            Some("message=hi&replyTo=7&displayName=Guest&referenceId=ref-1&silent=1")
        );
    }

    #[test]
    fn random_reference_is_hex() {
        let options = SendOptions::default().with_random_reference();
        let reference = options.reference_id.unwrap();
        assert_eq!(reference.len(), 32);
        assert!(reference.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn share_sends_object_metadata() {
        let client = client(&["chat-v2"]);
        let api = client.chat().unwrap();
        let home = RichObject::geo_location("Home", "1.23", "4.56").unwrap();
        let query = api
            .chat("abc123")
            .share_query(&home, &ShareOptions::default())
            .unwrap();
        assert_eq!(query.sub, "/chat/abc123/share");
        assert_eq!(
            query.params.get("objectType"),
            Some(&ParamValue::Str("geo-location".to_string()))
        );
        let Some(ParamValue::Str(raw)) = query.params.get("metaData") else {
            panic!("metaData missing");
        };
        let metadata: Value = serde_json::from_str(raw).unwrap();
        assert_eq!(
            metadata,
            json!({"id": "geo:1.23,4.56", "name": "Home", "latitude": "1.23", "longitude": "4.56"})
        );

        let file = RichObject::new(ObjectType::File, "42", "a.txt").unwrap();
        api.chat("abc123").share(&file, &ShareOptions::default()).unwrap();
        let sent = client.session().last.borrow().clone().unwrap();
        assert!(sent.path.ends_with("/chat/abc123/share"));
        assert!(sent.body.unwrap().starts_with("objectType=file&objectId=42&metaData="));
    }
}
