//! Generic XML tree.
//!
//! Parses an XML document into a `serde_json::Value` so feed shapes can be
//! read by path without a schema:
//!
//! - an element with no attributes and no child elements becomes its text;
//! - otherwise it becomes an object with attributes under `@_<name>`, child
//!   elements under their qualified name and non-empty text under `#text`;
//! - repeated sibling elements become an array, a lone element does not.
//!
//! The last rule is why readers must go through [`as_list`].

use quick_xml::escape::resolve_html5_entity;
use quick_xml::events::{BytesStart, Event};
use quick_xml::Reader;
use serde_json::{Map, Value as JsonValue};

use crate::error::{Error, Result};

pub const ATTR_PREFIX: &str = "@_";
pub const TEXT_KEY: &str = "#text";

struct Frame {
    name: String,
    attrs: Map<String, JsonValue>,
    children: Map<String, JsonValue>,
    text: String,
}

impl Frame {
    fn open(start: &BytesStart<'_>) -> Self {
        let name = String::from_utf8_lossy(start.name().as_ref()).into_owned();
        let mut attrs = Map::new();
        for attr in start.attributes().flatten() {
            let key = String::from_utf8_lossy(attr.key.as_ref());
            let value = decode_entities(&String::from_utf8_lossy(&attr.value));
            attrs.insert(format!("{}{}", ATTR_PREFIX, key), JsonValue::String(value));
        }
        Frame {
            name,
            attrs,
            children: Map::new(),
            text: String::new(),
        }
    }

    fn close(self) -> (String, JsonValue) {
        let text = self.text.trim().to_string();
        if self.attrs.is_empty() && self.children.is_empty() {
            return (self.name, JsonValue::String(text));
        }
        let mut obj = self.attrs;
        obj.extend(self.children);
        if !text.is_empty() {
            obj.insert(TEXT_KEY.to_string(), JsonValue::String(text));
        }
        (self.name, JsonValue::Object(obj))
    }
}

/// Resolve one entity body (the part between `&` and `;`): character
/// references, then the XML and HTML5 named entities.
fn resolve_entity(entity: &str) -> Option<String> {
    if let Some(number) = entity.strip_prefix('#') {
        let code = match number.strip_prefix(['x', 'X']) {
            Some(hex) => u32::from_str_radix(hex, 16).ok()?,
            None => number.parse().ok()?,
        };
        return char::from_u32(code).map(String::from);
    }
    resolve_html5_entity(entity).map(str::to_string)
}

/// Decode entity references one at a time. An unresolvable reference is
/// kept literally without affecting its neighbours.
fn decode_entities(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        match tail.find(';') {
            Some(end) => {
                match resolve_entity(&tail[1..end]) {
                    Some(resolved) => out.push_str(&resolved),
                    None => out.push_str(&tail[..=end]),
                }
                rest = &tail[end + 1..];
            }
            None => {
                out.push_str(tail);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// Insert a child, turning a second same-named sibling into an array.
fn push_child(map: &mut Map<String, JsonValue>, name: String, value: JsonValue) {
    match map.get_mut(&name) {
        Some(JsonValue::Array(arr)) => arr.push(value),
        Some(existing) => {
            let first = existing.take();
            *existing = JsonValue::Array(vec![first, value]);
        }
        None => {
            map.insert(name, value);
        }
    }
}

/// Parse an XML document into a generic tree rooted at an object keyed by
/// the document element's name.
pub fn parse(xml: &str) -> Result<JsonValue> {
    let mut reader = Reader::from_str(xml);

    let mut root = Map::new();
    let mut stack: Vec<Frame> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => stack.push(Frame::open(&e)),
            Ok(Event::Empty(e)) => {
                let (name, value) = Frame::open(&e).close();
                match stack.last_mut() {
                    Some(parent) => push_child(&mut parent.children, name, value),
                    None => push_child(&mut root, name, value),
                }
            }
            Ok(Event::End(_)) => {
                // end names are checked by the reader
                if let Some(frame) = stack.pop() {
                    let (name, value) = frame.close();
                    match stack.last_mut() {
                        Some(parent) => push_child(&mut parent.children, name, value),
                        None => push_child(&mut root, name, value),
                    }
                }
            }
            Ok(Event::Text(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&decode_entities(&String::from_utf8_lossy(&e)));
                }
            }
            Ok(Event::CData(e)) => {
                if let Some(frame) = stack.last_mut() {
                    frame.text.push_str(&String::from_utf8_lossy(&e.into_inner()));
                }
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                return Err(Error::Parse(format!(
                    "at position {}: {}",
                    reader.error_position(),
                    e
                )))
            }
            _ => {}
        }
    }

    if let Some(open) = stack.last() {
        return Err(Error::Parse(format!("unclosed element <{}>", open.name)));
    }

    Ok(JsonValue::Object(root))
}

/// Normalize a "one or more repeated siblings" node into a sequence.
/// Missing or null nodes yield an empty sequence.
pub fn as_list(node: Option<&JsonValue>) -> Vec<&JsonValue> {
    match node {
        None | Some(JsonValue::Null) => Vec::new(),
        Some(JsonValue::Array(arr)) => arr.iter().collect(),
        Some(single) => vec![single],
    }
}

/// Text payload of a node: the string itself, or `#text` of a structure.
pub fn text_of(node: &JsonValue) -> Option<&str> {
    match node {
        JsonValue::String(s) => Some(s),
        JsonValue::Object(obj) => obj.get(TEXT_KEY).and_then(|t| t.as_str()),
        _ => None,
    }
}

/// Value of an attribute on a structured node.
pub fn attr<'a>(node: &'a JsonValue, name: &str) -> Option<&'a str> {
    node.as_object()?
        .get(&format!("{}{}", ATTR_PREFIX, name))
        .and_then(|v| v.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_leaf_elements_become_text() {
        let tree = parse("<rss><channel><title> Hello </title></channel></rss>").unwrap();
        assert_eq!(tree, json!({"rss": {"channel": {"title": "Hello"}}}));
    }

    #[test]
    fn test_repeated_siblings_become_array() {
        let one = parse("<c><item>a</item></c>").unwrap();
        let two = parse("<c><item>a</item><item>b</item></c>").unwrap();

        assert_eq!(one["c"]["item"], json!("a"));
        assert_eq!(two["c"]["item"], json!(["a", "b"]));
        assert_eq!(as_list(one["c"].get("item")).len(), 1);
        assert_eq!(as_list(two["c"].get("item")).len(), 2);
    }

    #[test]
    fn test_attributes_and_text() {
        let tree = parse(r#"<entry><title type="html">A &amp; B</title><link rel="alternate" href="https://x/1"/></entry>"#).unwrap();
        let entry = &tree["entry"];

        assert_eq!(text_of(&entry["title"]), Some("A & B"));
        assert_eq!(attr(&entry["title"], "type"), Some("html"));
        assert_eq!(attr(&entry["link"], "href"), Some("https://x/1"));
        assert_eq!(attr(&entry["link"], "rel"), Some("alternate"));
    }

    #[test]
    fn test_unknown_entity_does_not_block_others() {
        let tree = parse("<item><title>A &amp; B&nbsp;C &bogus; &#233;&#xE9;</title><link href=\"?a=1&amp;b=2\"/></item>").unwrap();

        assert_eq!(tree["item"]["title"], json!("A & B\u{a0}C &bogus; \u{e9}\u{e9}"));
        assert_eq!(attr(&tree["item"]["link"], "href"), Some("?a=1&b=2"));
    }

    #[test]
    fn test_mixed_content_keeps_inner_spaces() {
        let tree = parse("<t>  A <![CDATA[&]]> B  </t>").unwrap();
        assert_eq!(tree["t"], json!("A & B"));
    }

    #[test]
    fn test_cdata_is_text() {
        let tree = parse("<item><title><![CDATA[Fish & <Chips>]]></title></item>").unwrap();
        assert_eq!(tree["item"]["title"], json!("Fish & <Chips>"));
    }

    #[test]
    fn test_empty_element() {
        let tree = parse("<item><title/><link></link></item>").unwrap();
        assert_eq!(tree["item"]["title"], json!(""));
        assert_eq!(tree["item"]["link"], json!(""));
    }

    #[test]
    fn test_declaration_and_comments_ignored() {
        let xml = "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n<!-- feed --><rss version=\"2.0\"/>";
        let tree = parse(xml).unwrap();
        assert_eq!(tree, json!({"rss": {"@_version": "2.0"}}));
    }

    #[test]
    fn test_mismatched_end_is_error() {
        assert!(matches!(parse("<rss><channel></rss>"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_unclosed_is_error() {
        assert!(matches!(parse("<rss><channel>"), Err(Error::Parse(_))));
    }

    #[test]
    fn test_as_list_missing_and_null() {
        assert!(as_list(None).is_empty());
        assert!(as_list(Some(&JsonValue::Null)).is_empty());
    }
}
