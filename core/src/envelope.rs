//! OCS envelope codec.
//!
//! # Design
//! The server answers with an XML document shaped like
//! `<ocs><meta>…</meta><data>…</data></ocs>`. [`decode`] turns any XML document
//! into a nested `serde_json::Value` using the usual XML-to-dict rules:
//!
//! - an element holding only text becomes a string, an empty element `null`;
//! - an element with children becomes an object, and repeated sibling names
//!   collapse into an array in document order;
//! - attributes become `@name` keys, and text sitting next to children or
//!   attributes is stored under `#text`.
//!
//! Nothing is typed beyond strings: OCS XML does not say whether `42` is a
//! number, so callers decide. [`payload`] and [`Meta`] pick the success and
//! failure branch out of a decoded document.

use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value};

use crate::error::{ApiError, Result};
use crate::status::ErrorKind;

const TEXT_KEY: &str = "#text";

/// An element that has been opened but not yet closed.
struct Node {
    name: String,
    entries: Map<String, Value>,
    text: String,
}

impl Node {
    fn open(start: &BytesStart<'_>) -> Result<Self> {
        let name = utf8(start.name().as_ref())?.to_string();
        let mut entries = Map::new();
        for attr in start.attributes() {
            let attr = attr.map_err(|e| ApiError::Parse(e.to_string()))?;
            let key = utf8(attr.key.as_ref())?;
            let value = attr
                .unescape_value()
                .map_err(|e| ApiError::Parse(e.to_string()))?;
            entries.insert(format!("@{key}"), Value::String(value.into_owned()));
        }
        Ok(Self {
            name,
            entries,
            text: String::new(),
        })
    }

    fn close(self) -> (String, Value) {
        let Node {
            name,
            mut entries,
            text,
        } = self;
        let text = text.trim().to_string();
        let value = if entries.is_empty() {
            if text.is_empty() {
                Value::Null
            } else {
                Value::String(text)
            }
        } else {
            if !text.is_empty() {
                entries.insert(TEXT_KEY.to_string(), Value::String(text));
            }
            Value::Object(entries)
        };
        (name, value)
    }
}

/// Insert a child, turning a repeated name into an array.
fn insert_child(entries: &mut Map<String, Value>, name: String, value: Value) {
    match entries.get_mut(&name) {
        Some(Value::Array(items)) => items.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, value]);
        }
        None => {
            entries.insert(name, value);
        }
    }
}

fn utf8(bytes: &[u8]) -> Result<&str> {
    std::str::from_utf8(bytes).map_err(|e| ApiError::Parse(e.to_string()))
}

/// Decode an XML document into a nested mapping keyed by the root element.
pub fn decode(raw: &[u8]) -> Result<Value> {
    let text = utf8(raw)?;
    let mut reader = Reader::from_str(text);

    let mut stack: Vec<Node> = Vec::new();
    let mut root: Option<(String, Value)> = None;

    let mut finish = |stack: &mut Vec<Node>, node: Node| -> Result<()> {
        let (name, value) = node.close();
        match stack.last_mut() {
            Some(parent) => {
                insert_child(&mut parent.entries, name, value);
                Ok(())
            }
            None if root.is_none() => {
                root = Some((name, value));
                Ok(())
            }
            None => Err(ApiError::Parse(format!(
                "unexpected second root element <{name}>"
            ))),
        }
    };

    loop {
        let event = reader
            .read_event()
            .map_err(|e| ApiError::Parse(e.to_string()))?;
        match event {
            Event::Start(start) => stack.push(Node::open(&start)?),
            Event::Empty(start) => {
                let node = Node::open(&start)?;
                finish(&mut stack, node)?;
            }
            Event::End(_) => {
                let node = stack
                    .pop()
                    .ok_or_else(|| ApiError::Parse("unmatched closing tag".to_string()))?;
                finish(&mut stack, node)?;
            }
            Event::Text(text) => {
                let text = text.unescape().map_err(|e| ApiError::Parse(e.to_string()))?;
                append_text(&mut stack, &text)?;
            }
            Event::CData(data) => {
                let data = data.into_inner();
                append_text(&mut stack, utf8(&data)?)?;
            }
            Event::Eof => break,
            // Declarations, comments, processing instructions, doctype.
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(ApiError::Parse(format!(
            "unexpected end of document inside <{}>",
            open.name
        )));
    }
    let (name, value) = root.ok_or_else(|| ApiError::Parse("document has no root element".to_string()))?;
    let mut document = Map::new();
    document.insert(name, value);
    Ok(Value::Object(document))
}

/// Text pieces are joined raw and trimmed once when the element closes.
fn append_text(stack: &mut [Node], text: &str) -> Result<()> {
    match stack.last_mut() {
        Some(node) => {
            node.text.push_str(text);
            Ok(())
        }
        None if text.trim().is_empty() => Ok(()),
        None => Err(ApiError::Parse("text outside of the root element".to_string())),
    }
}

/// Take `ocs.data` out of a decoded success document.
///
/// A present-but-empty `<data/>` yields `Value::Null`; a missing one is a
/// protocol error.
pub fn payload(document: Value) -> Result<Value> {
    let Value::Object(mut root) = document else {
        return Err(malformed("document is not a mapping"));
    };
    let Some(Value::Object(mut ocs)) = root.remove("ocs") else {
        return Err(malformed("missing <ocs> element"));
    };
    ocs.remove("data")
        .ok_or_else(|| malformed("missing <data> under <ocs>"))
}

fn malformed(reason: &str) -> ApiError {
    ApiError::Protocol(format!("malformed envelope: {reason}"))
}

/// The `ocs.meta` block of a failure response.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Meta {
    pub status: String,
    pub statuscode: String,
    pub message: String,
}

impl Meta {
    pub fn from_document(document: &Value) -> Result<Self> {
        let meta = document
            .get("ocs")
            .and_then(|ocs| ocs.get("meta"))
            .filter(|meta| meta.is_object())
            .ok_or_else(|| malformed("missing <meta> under <ocs>"))?;
        Ok(Self {
            status: text_field(meta, "status"),
            statuscode: text_field(meta, "statuscode"),
            message: text_field(meta, "message"),
        })
    }

    /// `"[{statuscode}] {status}: {message}"`
    pub fn describe(&self) -> String {
        format!("[{}] {}: {}", self.statuscode, self.status, self.message)
    }

    pub fn kind(&self) -> ErrorKind {
        ErrorKind::from_status_str(&self.statuscode)
    }

    pub fn into_error(self) -> ApiError {
        let message = self.describe();
        self.kind().into_error(message)
    }
}

fn text_field(meta: &Value, key: &str) -> String {
    match meta.get(key) {
        Some(Value::String(s)) => s.clone(),
        None | Some(Value::Null) => String::new(),
        Some(other) => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::json;

    #[test]
    fn decodes_success_envelope() {
        let xml = br#"<?xml version="1.0"?>
<ocs>
 <meta>
  <status>ok</status>
  <statuscode>200</statuscode>
  <message>OK</message>
 </meta>
 <data>
  <id>7</id>
  <message>hello &amp; welcome</message>
  <referenceId/>
 </data>
</ocs>"#;
        let doc = decode(xml).unwrap();
        assert_eq!(
            doc,
            json!({"ocs": {
                "meta": {"status": "ok", "statuscode": "200", "message": "OK"},
                "data": {"id": "7", "message": "hello & welcome", "referenceId": null}
            }})
        );
        assert_eq!(payload(doc).unwrap()["message"], "hello & welcome");
    }

    #[test]
    fn repeated_siblings_become_a_list_in_order() {
        let xml = b"<data><element><id>1</id></element><element><id>2</id></element><element><id>3</id></element></data>";
        let doc = decode(xml).unwrap();
        assert_eq!(
            doc,
            json!({"data": {"element": [{"id": "1"}, {"id": "2"}, {"id": "3"}]}})
        );
    }

    #[test]
    fn single_sibling_stays_a_mapping() {
        let doc = decode(b"<data><element><id>1</id></element></data>").unwrap();
        assert_eq!(doc, json!({"data": {"element": {"id": "1"}}}));
    }

    #[test]
    fn attributes_and_mixed_text() {
        let doc = decode(br#"<a kind="x"><b z="1">inner</b>tail</a>"#).unwrap();
        assert_eq!(
            doc,
            json!({"a": {"@kind": "x", "b": {"@z": "1", "#text": "inner"}, "#text": "tail"}})
        );
    }

    #[test]
    fn cdata_is_text() {
        let doc = decode(b"<m><![CDATA[<b>bold</b>]]></m>").unwrap();
        assert_eq!(doc, json!({"m": "<b>bold</b>"}));
    }

    #[test]
    fn text_split_by_cdata_keeps_inner_spaces() {
        let doc = decode(b"<m>a <![CDATA[b]]> c</m>").unwrap();
        assert_eq!(doc, json!({"m": "a b c"}));
    }

    #[test]
    fn text_split_by_a_comment_keeps_inner_spaces() {
        let doc = decode(b"<m> left <!-- note --> right </m>").unwrap();
        assert_eq!(doc, json!({"m": "left  right"}));
    }

    #[test]
    fn text_around_a_child_is_joined_then_trimmed() {
        let doc = decode(b"<m>x <b>1</b> y</m>").unwrap();
        assert_eq!(doc, json!({"m": {"b": "1", "#text": "x  y"}}));

        let doc = decode(b"<m>x\n  <b>1</b>\n  y</m>").unwrap();
        assert_eq!(doc, json!({"m": {"b": "1", "#text": "x\n  \n  y"}}));
    }

    #[test]
    fn whitespace_only_text_is_dropped() {
        let doc = decode(b"<m>\n   \n</m>").unwrap();
        assert_eq!(doc, json!({"m": null}));
    }

    #[test]
    fn rejects_malformed_xml() {
        for bad in [
            &b"<ocs><meta></ocs>"[..],
            &b"<ocs><data>"[..],
            &b""[..],
            &b"just text"[..],
            &b"<a/><b/>"[..],
            &[0xff, 0xfe, 0x00][..],
        ] {
            let err = decode(bad).unwrap_err();
            assert!(matches!(err, ApiError::Parse(_)), "{bad:?} gave {err:?}");
        }
    }

    #[test]
    fn missing_data_is_a_protocol_error() {
        let doc = decode(b"<ocs><meta><status>ok</status></meta></ocs>").unwrap();
        let err = payload(doc).unwrap_err();
        assert!(matches!(err, ApiError::Protocol(ref m) if m.starts_with("malformed envelope")));
    }

    #[test]
    fn empty_data_is_null_payload() {
        let doc = decode(b"<ocs><meta/><data/></ocs>").unwrap();
        assert_eq!(payload(doc).unwrap(), Value::Null);
    }

    #[test]
    fn meta_describes_failure() {
        let doc = decode(
            b"<ocs><meta><status>failure</status><statuscode>404</statuscode><message>Room not found</message></meta><data/></ocs>",
        )
        .unwrap();
        let meta = Meta::from_document(&doc).unwrap();
        assert_eq!(meta.describe(), "[404] failure: Room not found");
        let err = meta.into_error();
        assert!(matches!(err, ApiError::NotFound(ref m) if m == "[404] failure: Room not found"));
    }

    #[test]
    fn meta_with_empty_message_renders_blank() {
        let doc = decode(
            b"<ocs><meta><status>failure</status><statuscode>400</statuscode><message/></meta></ocs>",
        )
        .unwrap();
        assert_eq!(Meta::from_document(&doc).unwrap().describe(), "[400] failure: ");
    }

    #[test]
    fn missing_meta_is_a_protocol_error() {
        let doc = decode(b"<html><body>Bad gateway</body></html>").unwrap();
        assert!(matches!(Meta::from_document(&doc), Err(ApiError::Protocol(_))));
    }

    proptest! {
        #[test]
        fn text_survives_escaping(text in "[a-zA-Z0-9<>&'\" ]{1,40}") {
            prop_assume!(!text.trim().is_empty());
            let escaped = quick_xml::escape::escape(text.as_str());
            let xml = format!("<m>{escaped}</m>");
            let doc = decode(xml.as_bytes()).unwrap();
            prop_assert_eq!(doc, json!({"m": text.trim()}));
        }
    }
}
