//! Tolerant XML to tree conversion
//!
//! Provider XML is frequently sloppy (mismatched or missing end tags, stray
//! entities), so the reader runs with end-name checks disabled and a reader
//! error simply ends the walk: whatever was built so far is returned.
//!
//! Tree form: `{root_name: node}` where each element node is an object with
//! attributes under `"@name"`, non-blank text and CDATA under `"_text"` and
//! child elements under their tag name. Repeated children collapse into an
//! array in document order.

use quick_xml::Reader;
use quick_xml::events::{BytesStart, Event};
use serde_json::{Map, Value};
use tracing::debug;

pub const TEXT_KEY: &str = "_text";
pub const ATTRIBUTE_PREFIX: char = '@';

struct Frame {
    name: String,
    node: Map<String, Value>,
    text: String,
}

impl Frame {
    fn new(element: &BytesStart) -> Self {
        Self {
            name: element_name(element),
            node: parse_attributes(element),
            text: String::new(),
        }
    }

    fn finish(mut self) -> (String, Value) {
        let text = self.text.trim();
        if !text.is_empty() {
            self.node.insert(TEXT_KEY.to_string(), Value::String(text.to_string()));
        }
        (self.name, Value::Object(self.node))
    }
}

struct TreeBuilder {
    stack: Vec<Frame>,
    root: Option<(String, Value)>,
}

impl TreeBuilder {
    fn attach(&mut self, name: String, node: Value) {
        match self.stack.last_mut() {
            Some(parent) => insert_child(&mut parent.node, name, node),
            None => {
                // Only the first top-level element is the document root
                if self.root.is_none() {
                    self.root = Some((name, node));
                }
            }
        }
    }

    fn close(&mut self) {
        if let Some(frame) = self.stack.pop() {
            let (name, node) = frame.finish();
            self.attach(name, node);
        }
    }

    fn push_text(&mut self, text: &str) {
        if let Some(frame) = self.stack.last_mut() {
            frame.text.push_str(text);
        }
    }

    fn into_tree(mut self) -> Value {
        while !self.stack.is_empty() {
            self.close();
        }
        let mut tree = Map::new();
        if let Some((name, node)) = self.root {
            tree.insert(name, node);
        }
        Value::Object(tree)
    }
}

fn insert_child(parent: &mut Map<String, Value>, name: String, node: Value) {
    match parent.get_mut(&name) {
        Some(Value::Array(existing)) => existing.push(node),
        Some(existing) => {
            let first = existing.take();
            *existing = Value::Array(vec![first, node]);
        }
        None => {
            parent.insert(name, node);
        }
    }
}

fn element_name(element: &BytesStart) -> String {
    String::from_utf8_lossy(element.name().as_ref()).into_owned()
}

/// Parse XML attributes into `@`-prefixed tree keys
fn parse_attributes(element: &BytesStart) -> Map<String, Value> {
    let mut attrs = Map::new();

    for attr in element.attributes().with_checks(false).flatten() {
        let key = std::str::from_utf8(attr.key.as_ref());
        let raw = std::str::from_utf8(&attr.value);
        if let (Ok(key), Ok(raw)) = (key, raw) {
            let value = quick_xml::escape::unescape(raw)
                .map(|v| v.into_owned())
                .unwrap_or_else(|_| raw.to_string());
            attrs.insert(format!("{ATTRIBUTE_PREFIX}{key}"), Value::String(value));
        }
    }
    attrs
}

/// Convert an XML document into the canonical tree, never failing
///
/// An empty or entirely unreadable document yields an empty object.
pub fn parse_xml_tree(content: &str) -> Value {
    let mut reader = Reader::from_str(content);
    {
        let config = reader.config_mut();
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
    }

    let mut builder = TreeBuilder {
        stack: Vec::new(),
        root: None,
    };

    loop {
        match reader.read_event() {
            Ok(Event::Start(ref e)) => builder.stack.push(Frame::new(e)),
            Ok(Event::End(_)) => builder.close(),
            Ok(Event::Empty(ref e)) => {
                let (name, node) = Frame::new(e).finish();
                builder.attach(name, node);
            }
            Ok(Event::Text(e)) => builder.push_text(&String::from_utf8_lossy(&e)),
            Ok(Event::CData(e)) => builder.push_text(&String::from_utf8_lossy(&e)),
            Ok(Event::GeneralRef(e)) => {
                let name = String::from_utf8_lossy(&e).into_owned();
                let resolved = match e.resolve_char_ref() {
                    Ok(Some(ch)) => Some(ch.to_string()),
                    _ => quick_xml::escape::resolve_predefined_entity(&name).map(str::to_string),
                };
                builder.push_text(&resolved.unwrap_or_else(|| format!("&{name};")));
            }
            Ok(Event::Eof) => break,
            Err(e) => {
                debug!(
                    position = reader.buffer_position(),
                    "XML reader stopped early, keeping partial tree: {e}"
                );
                break;
            }
            _ => {} // declarations, comments, processing instructions, doctype
        }
    }

    builder.into_tree()
}

/// Attribute value of the document root element, if any
pub fn root_attribute<'a>(tree: &'a Value, attribute: &str) -> Option<&'a str> {
    tree.as_object()?
        .values()
        .next()?
        .get(format!("{ATTRIBUTE_PREFIX}{attribute}"))?
        .as_str()
}
