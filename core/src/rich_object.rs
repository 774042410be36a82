//! Rich objects that can be shared into a conversation.
//!
//! # Design
//! Every object has an `id`, a `name` and a fixed [`ObjectType`] tag. Most
//! types carry nothing else the server needs; `Call` adds a `call_type` and
//! `GeoLocation` a latitude/longitude pair, both kept as named fields in
//! [`Details`]. Fields are private, so the only ways in are the validating
//! constructors below and the type/detail pairing cannot drift.

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{ApiError, Result};

/// The closed set of rich object types the server renders.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ObjectType {
    AddressBook,
    AddressBookContact,
    Announcement,
    Calendar,
    CalendarEvent,
    Call,
    Circle,
    DeckBoard,
    DeckCard,
    Email,
    File,
    Form,
    GeoLocation,
    TalkAttachment,
    User,
    UserGroup,
}

impl ObjectType {
    pub const ALL: [ObjectType; 16] = [
        ObjectType::AddressBook,
        ObjectType::AddressBookContact,
        ObjectType::Announcement,
        ObjectType::Calendar,
        ObjectType::CalendarEvent,
        ObjectType::Call,
        ObjectType::Circle,
        ObjectType::DeckBoard,
        ObjectType::DeckCard,
        ObjectType::Email,
        ObjectType::File,
        ObjectType::Form,
        ObjectType::GeoLocation,
        ObjectType::TalkAttachment,
        ObjectType::User,
        ObjectType::UserGroup,
    ];

    /// The `objectType` tag sent to the server.
    pub fn as_str(self) -> &'static str {
        match self {
            ObjectType::AddressBook => "addressbook",
            ObjectType::AddressBookContact => "addressbook-contact",
            ObjectType::Announcement => "announcement",
            ObjectType::Calendar => "calendar",
            ObjectType::CalendarEvent => "calendar-event",
            ObjectType::Call => "call",
            ObjectType::Circle => "circle",
            ObjectType::DeckBoard => "deck-board",
            ObjectType::DeckCard => "deck-card",
            ObjectType::Email => "email",
            ObjectType::File => "file",
            ObjectType::Form => "forms-form",
            ObjectType::GeoLocation => "geo-location",
            ObjectType::TalkAttachment => "talk-attachment",
            ObjectType::User => "user",
            ObjectType::UserGroup => "user-group",
        }
    }

    pub fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|ty| ty.as_str() == tag)
    }

    fn type_name(self) -> &'static str {
        match self {
            ObjectType::AddressBook => "AddressBook",
            ObjectType::AddressBookContact => "AddressBookContact",
            ObjectType::Announcement => "Announcement",
            ObjectType::Calendar => "Calendar",
            ObjectType::CalendarEvent => "CalendarEvent",
            ObjectType::Call => "Call",
            ObjectType::Circle => "Circle",
            ObjectType::DeckBoard => "DeckBoard",
            ObjectType::DeckCard => "DeckCard",
            ObjectType::Email => "Email",
            ObjectType::File => "File",
            ObjectType::Form => "Form",
            ObjectType::GeoLocation => "GeoLocation",
            ObjectType::TalkAttachment => "TalkAttachment",
            ObjectType::User => "User",
            ObjectType::UserGroup => "UserGroup",
        }
    }
}

impl fmt::Display for ObjectType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fields specific to one object type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Details {
    None,
    Call { call_type: String },
    GeoLocation { latitude: String, longitude: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RichObject {
    object_type: ObjectType,
    id: String,
    name: String,
    details: Details,
    fields: BTreeMap<String, String>,
}

impl RichObject {
    /// A plain object of any type that needs nothing beyond `id` and `name`.
    ///
    /// `Call` and `GeoLocation` need their extra fields; use [`RichObject::call`]
    /// and [`RichObject::geo_location`] for those. An empty `id` or `name`
    /// counts as missing.
    pub fn new(object_type: ObjectType, id: &str, name: &str) -> Result<Self> {
        match object_type {
            ObjectType::Call => Err(ApiError::Validation(
                "'call_type' required for Call".to_string(),
            )),
            ObjectType::GeoLocation => Err(ApiError::Validation(
                "'latitude' and 'longitude' required for GeoLocation".to_string(),
            )),
            _ => Self::build(object_type, id, name, Details::None),
        }
    }

    pub fn call(id: &str, name: &str, call_type: &str) -> Result<Self> {
        if call_type.is_empty() {
            return Err(ApiError::Validation("'call_type' required for Call".to_string()));
        }
        Self::build(
            ObjectType::Call,
            id,
            name,
            Details::Call {
                call_type: call_type.to_string(),
            },
        )
    }

    /// A location; its id is always `geo:{latitude},{longitude}`.
    pub fn geo_location(name: &str, latitude: &str, longitude: &str) -> Result<Self> {
        if latitude.is_empty() || longitude.is_empty() {
            return Err(ApiError::Validation(
                "'latitude' and 'longitude' required for GeoLocation".to_string(),
            ));
        }
        Self::build(
            ObjectType::GeoLocation,
            &format!("geo:{latitude},{longitude}"),
            name,
            Details::GeoLocation {
                latitude: latitude.to_string(),
                longitude: longitude.to_string(),
            },
        )
    }

    /// Validating factory from loose string fields. Keys other than the ones
    /// the type needs are kept and readable through [`RichObject::field`].
    pub fn from_fields(object_type: ObjectType, fields: &BTreeMap<String, String>) -> Result<Self> {
        let get = |key: &str| fields.get(key).map(String::as_str).unwrap_or_default();
        let mut object = match object_type {
            ObjectType::Call => Self::call(get("id"), get("name"), get("call_type"))?,
            ObjectType::GeoLocation => {
                Self::geo_location(get("name"), get("latitude"), get("longitude"))?
            }
            other => Self::new(other, get("id"), get("name"))?,
        };
        for (key, value) in fields {
            if !matches!(
                key.as_str(),
                "id" | "name" | "call_type" | "latitude" | "longitude"
            ) {
                object.fields.insert(key.clone(), value.clone());
            }
        }
        Ok(object)
    }

    /// Attach an extra attribute such as a file `path` or `link`.
    pub fn with_field(mut self, key: &str, value: &str) -> Self {
        self.fields.insert(key.to_string(), value.to_string());
        self
    }

    fn build(object_type: ObjectType, id: &str, name: &str, details: Details) -> Result<Self> {
        if id.is_empty() || name.is_empty() {
            return Err(ApiError::Validation(format!(
                "{} requires `id` and `name`.",
                object_type.type_name()
            )));
        }
        Ok(Self {
            object_type,
            id: id.to_string(),
            name: name.to_string(),
            details,
            fields: BTreeMap::new(),
        })
    }

    pub fn object_type(&self) -> ObjectType {
        self.object_type
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn details(&self) -> &Details {
        &self.details
    }

    pub fn field(&self, key: &str) -> Option<&str> {
        self.fields.get(key).map(String::as_str)
    }

    /// The `metaData` sent when sharing the object into a chat.
    pub fn metadata(&self) -> Map<String, Value> {
        let mut metadata = Map::new();
        metadata.insert("id".to_string(), Value::String(self.id.clone()));
        metadata.insert("name".to_string(), Value::String(self.name.clone()));
        match &self.details {
            Details::None => {}
            Details::Call { call_type } => {
                metadata.insert("call-type".to_string(), Value::String(call_type.clone()));
            }
            Details::GeoLocation {
                latitude,
                longitude,
            } => {
                metadata.insert("latitude".to_string(), Value::String(latitude.clone()));
                metadata.insert("longitude".to_string(), Value::String(longitude.clone()));
            }
        }
        metadata
    }
}

impl fmt::Display for RichObject {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.details {
            Details::GeoLocation {
                latitude,
                longitude,
            } => write!(f, "GeoLocation(latitude={latitude}, longitude={longitude})"),
            _ => write!(f, "{}({})", self.object_type.type_name(), self.id),
        }
    }
}
