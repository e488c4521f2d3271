//! Tolerant scanning of rendered HTML.
//!
//! Postprocess stages need element boundaries with byte offsets so they can
//! splice into the document without re-serializing it. quick-xml provides
//! that, configured to accept HTML habits: unmatched or mismatched end tags
//! and bare `&` in text. Anything the reader still rejects, such as an
//! unterminated comment, ends the scan at that point.

use std::ops::Range;

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// An opening or self-closing tag.
#[derive(Debug)]
pub(crate) struct StartTag {
    /// Lowercased element name.
    pub name: String,
    /// Byte range of the whole tag in the scanned document.
    pub range: Range<usize>,
    pub attrs: Vec<(String, String)>,
    pub self_closing: bool,
}

impl StartTag {
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attrs
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Offset where a new attribute can be inserted.
    pub fn attr_insert_at(&self, html: &str) -> usize {
        let tag = &html[self.range.clone()];
        let close = if tag.ends_with("/>") { 2 } else { 1 };
        self.range.end - close
    }
}

#[derive(Debug)]
pub(crate) enum Node {
    Open(StartTag),
    Close { name: String },
    /// Text with entity references decoded.
    Text(String),
}

/// Split `html` into tags and text.
///
/// On a syntax error the nodes read so far are returned.
pub(crate) fn scan(html: &str) -> Vec<Node> {
    let mut reader = Reader::from_str(html);
    let config = reader.config_mut();
    config.trim_text(false);
    config.check_end_names = false;
    config.allow_unmatched_ends = true;
    config.allow_dangling_amp = true;

    let mut nodes = Vec::new();
    loop {
        let start = position(&reader);
        let event = match reader.read_event() {
            Ok(event) => event,
            Err(e) => {
                tracing::warn!(error = %e, offset = start, "stopping HTML scan");
                break;
            }
        };
        let range = start..position(&reader);
        match event {
            Event::Start(e) => nodes.push(Node::Open(start_tag(&e, range, false))),
            Event::Empty(e) => nodes.push(Node::Open(start_tag(&e, range, true))),
            Event::End(e) => nodes.push(Node::Close {
                name: lowercase_name(e.name().as_ref()),
            }),
            Event::Text(e) => push_text(&mut nodes, &String::from_utf8_lossy(&e)),
            Event::GeneralRef(e) => {
                push_text(&mut nodes, &decode_entity(&String::from_utf8_lossy(&e)));
            }
            Event::CData(e) => push_text(&mut nodes, &String::from_utf8_lossy(&e)),
            Event::Eof => break,
            Event::Comment(_) | Event::Decl(_) | Event::PI(_) | Event::DocType(_) => {}
        }
    }
    nodes
}

fn position(reader: &Reader<&[u8]>) -> usize {
    usize::try_from(reader.buffer_position()).unwrap_or(usize::MAX)
}

fn push_text(nodes: &mut Vec<Node>, text: &str) {
    if let Some(Node::Text(last)) = nodes.last_mut() {
        last.push_str(text);
    } else {
        nodes.push(Node::Text(text.to_owned()));
    }
}

fn start_tag(e: &BytesStart<'_>, range: Range<usize>, self_closing: bool) -> StartTag {
    let attrs = e
        .attributes()
        .flatten()
        .map(|attr| {
            let key = String::from_utf8_lossy(attr.key.as_ref()).to_ascii_lowercase();
            let value = attr.unescape_value().map_or_else(
                |_| String::from_utf8_lossy(&attr.value).into_owned(),
                std::borrow::Cow::into_owned,
            );
            (key, value)
        })
        .collect();
    StartTag {
        name: lowercase_name(e.name().as_ref()),
        range,
        attrs,
        self_closing,
    }
}

fn lowercase_name(name: &[u8]) -> String {
    String::from_utf8_lossy(name).to_ascii_lowercase()
}

/// Decode the body of an entity reference (`amp`, `#39`, `#x27`, ...).
fn decode_entity(entity: &str) -> String {
    let decoded = match entity {
        "lt" => Some('<'),
        "gt" => Some('>'),
        "amp" => Some('&'),
        "apos" => Some('\''),
        "quot" => Some('"'),
        "nbsp" => Some('\u{00a0}'),
        "mdash" => Some('\u{2014}'),
        "ndash" => Some('\u{2013}'),
        "hellip" => Some('\u{2026}'),
        "copy" => Some('\u{00a9}'),
        s if s.starts_with("#x") || s.starts_with("#X") => {
            u32::from_str_radix(&s[2..], 16).ok().and_then(char::from_u32)
        }
        s if s.starts_with('#') => s[1..].parse::<u32>().ok().and_then(char::from_u32),
        _ => None,
    };
    decoded.map_or_else(|| format!("&{entity};"), |c| c.to_string())
}
