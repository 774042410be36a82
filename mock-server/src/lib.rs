//! In-memory stand-in for the Talk chat endpoints.
//!
//! Speaks the same wire format as the real server: form-encoded requests,
//! XML OCS envelopes back, `X-Chat-Last-Given`/`X-Chat-Last-Common-Read`
//! headers on reads and `304 Not Modified` when a read finds nothing. It does
//! not hold long-polls open; an empty read answers immediately.

use std::{collections::HashMap, sync::Arc};

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use quick_xml::escape::escape;
use serde::{Deserialize, Serialize};
use tokio::{net::TcpListener, sync::RwLock};

pub const API_PREFIX: &str = "/ocs/v2.php/apps/spreed/api/v1";
pub const DEFAULT_ROOM: &str = "general";
pub const MAX_LIMIT: usize = 200;

const LAST_GIVEN: &str = "x-chat-last-given";
const LAST_COMMON_READ: &str = "x-chat-last-common-read";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SharedObject {
    pub object_type: String,
    pub id: String,
    pub name: String,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub token: String,
    pub actor_display_name: String,
    pub message: String,
    pub parent_id: Option<i64>,
    pub reference_id: Option<String>,
    pub silent: bool,
    pub object: Option<SharedObject>,
}

#[derive(Debug, Default)]
pub struct Rooms {
    next_id: i64,
    rooms: HashMap<String, Vec<Message>>,
}

impl Rooms {
    fn post(&mut self, token: &str, mut message: Message) -> Option<Message> {
        let room = self.rooms.get_mut(token)?;
        self.next_id += 1;
        message.id = self.next_id;
        message.token = token.to_string();
        room.push(message.clone());
        Some(message)
    }

    fn last_id(&self, token: &str) -> i64 {
        self.rooms
            .get(token)
            .and_then(|room| room.last())
            .map(|m| m.id)
            .unwrap_or(0)
    }
}

pub type Db = Arc<RwLock<Rooms>>;

pub fn app() -> Router {
    app_with_rooms([DEFAULT_ROOM])
}

pub fn app_with_rooms<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Router {
    let rooms = Rooms {
        next_id: 0,
        rooms: tokens
            .into_iter()
            .map(|token| (token.to_string(), Vec::new()))
            .collect(),
    };
    let db: Db = Arc::new(RwLock::new(rooms));
    Router::new()
        .route(
            &format!("{API_PREFIX}/chat/{{token}}"),
            get(receive_messages).post(send_message),
        )
        .route(&format!("{API_PREFIX}/chat/{{token}}/share"), post(share_object))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    axum::serve(listener, app()).await
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReceiveParams {
    #[serde(default)]
    pub look_into_future: u8,
    #[serde(default = "default_limit")]
    pub limit: usize,
    #[serde(default)]
    pub last_known_message_id: i64,
    #[serde(default)]
    pub last_common_read_id: i64,
    #[serde(default)]
    pub timeout: u32,
    #[serde(default)]
    pub set_read_marker: u8,
    #[serde(default)]
    pub include_last_known: u8,
}

fn default_limit() -> usize {
    100
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendParams {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub reply_to: i64,
    pub display_name: Option<String>,
    pub reference_id: Option<String>,
    #[serde(default)]
    pub silent: u8,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareParams {
    #[serde(default)]
    pub object_type: String,
    #[serde(default)]
    pub object_id: String,
    #[serde(default)]
    pub meta_data: String,
    pub actor_display_name: Option<String>,
    pub reference_id: Option<String>,
}

/// Pick the batch a read returns: newer messages in ascending order when
/// looking into the future, otherwise older ones newest first.
pub fn select(messages: &[Message], params: &ReceiveParams) -> Vec<Message> {
    let limit = params.limit.clamp(1, MAX_LIMIT);
    let last_known = params.last_known_message_id;
    let include = params.include_last_known == 1;
    if params.look_into_future == 1 {
        messages
            .iter()
            .filter(|m| m.id > last_known || (include && m.id == last_known))
            .take(limit)
            .cloned()
            .collect()
    } else {
        messages
            .iter()
            .rev()
            .filter(|m| last_known <= 0 || m.id < last_known || (include && m.id == last_known))
            .take(limit)
            .cloned()
            .collect()
    }
}

async fn receive_messages(
    State(db): State<Db>,
    Path(token): Path<String>,
    Query(params): Query<ReceiveParams>,
) -> Response {
    let rooms = db.read().await;
    let Some(room) = rooms.rooms.get(&token) else {
        return failure(StatusCode::NOT_FOUND, "Conversation not found");
    };
    let batch = select(room, &params);
    tracing::debug!(%token, count = batch.len(), ?params, "receive");
    let Some(last_given) = batch.last().map(|m| m.id) else {
        return StatusCode::NOT_MODIFIED.into_response();
    };

    let mut data = String::new();
    for message in &batch {
        data.push_str("<element>");
        data.push_str(&message_xml(message));
        data.push_str("</element>");
    }
    let mut headers = HeaderMap::new();
    headers.insert(LAST_GIVEN, HeaderValue::from(last_given));
    headers.insert(LAST_COMMON_READ, HeaderValue::from(rooms.last_id(&token)));
    respond(StatusCode::OK, headers, &data)
}

async fn send_message(
    State(db): State<Db>,
    Path(token): Path<String>,
    Form(params): Form<SendParams>,
) -> Response {
    let mut rooms = db.write().await;
    let Some(room) = rooms.rooms.get(&token) else {
        return failure(StatusCode::NOT_FOUND, "Conversation not found");
    };
    if params.message.trim().is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Message must not be empty");
    }
    if params.reply_to != 0 && !room.iter().any(|m| m.id == params.reply_to) {
        return failure(StatusCode::BAD_REQUEST, "Parent message not found");
    }
    let message = Message {
        id: 0,
        token: String::new(),
        actor_display_name: params.display_name.unwrap_or_else(|| "Guest".to_string()),
        message: params.message,
        parent_id: (params.reply_to != 0).then_some(params.reply_to),
        reference_id: params.reference_id,
        silent: params.silent == 1,
        object: None,
    };
    post_and_respond(&mut rooms, &token, message)
}

async fn share_object(
    State(db): State<Db>,
    Path(token): Path<String>,
    Form(params): Form<ShareParams>,
) -> Response {
    let mut rooms = db.write().await;
    if !rooms.rooms.contains_key(&token) {
        return failure(StatusCode::NOT_FOUND, "Conversation not found");
    }
    if params.object_type.is_empty() || params.object_id.is_empty() {
        return failure(StatusCode::BAD_REQUEST, "Object type and id are required");
    }
    let meta: serde_json::Value = match serde_json::from_str(&params.meta_data) {
        Ok(meta) => meta,
        Err(_) => return failure(StatusCode::BAD_REQUEST, "Invalid meta data"),
    };
    let Some(name) = meta.get("name").and_then(|n| n.as_str()) else {
        return failure(StatusCode::BAD_REQUEST, "Meta data requires a name");
    };
    let message = Message {
        id: 0,
        token: String::new(),
        actor_display_name: params
            .actor_display_name
            .unwrap_or_else(|| "Guest".to_string()),
        message: "{object}".to_string(),
        parent_id: None,
        reference_id: params.reference_id,
        silent: false,
        object: Some(SharedObject {
            object_type: params.object_type,
            id: params.object_id,
            name: name.to_string(),
        }),
    };
    post_and_respond(&mut rooms, &token, message)
}

fn post_and_respond(rooms: &mut Rooms, token: &str, message: Message) -> Response {
    let Some(posted) = rooms.post(token, message) else {
        return failure(StatusCode::NOT_FOUND, "Conversation not found");
    };
    tracing::info!(%token, id = posted.id, "message posted");
    let mut headers = HeaderMap::new();
    headers.insert(LAST_COMMON_READ, HeaderValue::from(posted.id));
    respond(StatusCode::CREATED, headers, &message_xml(&posted))
}

fn failure(status: StatusCode, reason: &str) -> Response {
    tracing::debug!(status = status.as_u16(), reason, "request rejected");
    let body = envelope(status, "failure", reason, "");
    (status, xml_headers(HeaderMap::new()), body).into_response()
}

fn respond(status: StatusCode, headers: HeaderMap, data: &str) -> Response {
    let body = envelope(status, "ok", "OK", data);
    (status, xml_headers(headers), body).into_response()
}

fn xml_headers(mut headers: HeaderMap) -> HeaderMap {
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/xml; charset=utf-8"),
    );
    headers
}

/// Render a full OCS envelope. `data` is already-rendered inner XML.
pub fn envelope(status: StatusCode, status_text: &str, message: &str, data: &str) -> String {
    let mut out = String::from("<?xml version=\"1.0\"?>\n<ocs><meta>");
    text_element(&mut out, "status", status_text);
    text_element(&mut out, "statuscode", &status.as_u16().to_string());
    text_element(&mut out, "message", message);
    out.push_str("</meta>");
    if data.is_empty() {
        out.push_str("<data/>");
    } else {
        out.push_str("<data>");
        out.push_str(data);
        out.push_str("</data>");
    }
    out.push_str("</ocs>\n");
    out
}

pub fn message_xml(message: &Message) -> String {
    let mut out = String::new();
    text_element(&mut out, "id", &message.id.to_string());
    text_element(&mut out, "token", &message.token);
    text_element(&mut out, "actorDisplayName", &message.actor_display_name);
    text_element(&mut out, "message", &message.message);
    if let Some(parent) = message.parent_id {
        text_element(&mut out, "parentId", &parent.to_string());
    }
    text_element(
        &mut out,
        "referenceId",
        message.reference_id.as_deref().unwrap_or_default(),
    );
    text_element(&mut out, "silent", if message.silent { "1" } else { "0" });
    match &message.object {
        Some(object) => {
            out.push_str("<messageParameters><object>");
            text_element(&mut out, "type", &object.object_type);
            text_element(&mut out, "id", &object.id);
            text_element(&mut out, "name", &object.name);
            out.push_str("</object></messageParameters>");
        }
        None => out.push_str("<messageParameters/>"),
    }
    out
}

fn text_element(out: &mut String, name: &str, value: &str) {
    if value.is_empty() {
        out.push_str(&format!("<{name}/>"));
    } else {
        out.push_str(&format!("<{name}>{}</{name}>", escape(value)));
    }
}
