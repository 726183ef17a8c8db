//! Rich-text content tree.
//!
//! The JSON shape matches what block editors emit for `getJSON()`:
//! `{"type": .., "attrs": .., "content": [..], "marks": [..], "text": ..}` with
//! empty parts omitted. Field order is fixed by declaration order, which keeps
//! the serialized form (and therefore the fingerprint) stable.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use smol_str::SmolStr;

use crate::ContentError;

/// Text shown in a document that has never been written to.
pub const DEFAULT_PLACEHOLDER_TEXT: &str = "New doc";

/// Node kinds that have no content and occupy a single position.
const ATOM_KINDS: &[&str] = &["hardBreak", "horizontalRule", "image"];

/// A node in the content tree.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    #[serde(rename = "type")]
    pub kind: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub content: Vec<Node>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub marks: Vec<Mark>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

/// Inline formatting attached to a text node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mark {
    #[serde(rename = "type")]
    pub kind: SmolStr,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attrs: Option<Map<String, Value>>,
}

impl Node {
    /// Empty node of the given kind.
    pub fn new(kind: impl Into<SmolStr>) -> Self {
        Self {
            kind: kind.into(),
            attrs: None,
            content: Vec::new(),
            marks: Vec::new(),
            text: None,
        }
    }

    /// Text leaf.
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: Some(text.into()),
            ..Self::new("text")
        }
    }

    /// Top-level document node.
    pub fn doc(content: Vec<Node>) -> Self {
        Self::new("doc").with_content(content)
    }

    pub fn paragraph(content: Vec<Node>) -> Self {
        Self::new("paragraph").with_content(content)
    }

    /// A document holding one paragraph with `text`.
    pub fn placeholder(text: &str) -> Self {
        Self::doc(vec![Self::paragraph(vec![Self::text(text)])])
    }

    pub fn with_content(mut self, content: Vec<Node>) -> Self {
        self.content = content;
        self
    }

    pub fn with_attr(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.attrs
            .get_or_insert_with(Map::new)
            .insert(key.into(), value.into());
        self
    }

    pub fn with_mark(mut self, kind: impl Into<SmolStr>) -> Self {
        self.marks.push(Mark {
            kind: kind.into(),
            attrs: None,
        });
        self
    }

    pub fn is_text(&self) -> bool {
        self.kind == "text"
    }

    /// Size of this node in flattened document positions.
    ///
    /// Text counts one position per UTF-16 code unit, atoms count one, and
    /// every other node adds an opening and closing position around its
    /// children.
    pub fn node_size(&self) -> usize {
        if self.is_text() {
            return self.text.as_deref().map_or(0, |t| t.encode_utf16().count());
        }
        if self.content.is_empty() && ATOM_KINDS.contains(&self.kind.as_str()) {
            return 1;
        }
        2 + self.content_size()
    }

    /// Size of the children, i.e. the valid selection range `0..=content_size`.
    pub fn content_size(&self) -> usize {
        self.content.iter().map(Node::node_size).sum()
    }

    /// Concatenated text of all descendants.
    pub fn plain_text(&self) -> String {
        let mut out = String::new();
        self.collect_text(&mut out);
        out
    }

    fn collect_text(&self, out: &mut String) {
        if let Some(text) = &self.text {
            out.push_str(text);
        }
        for child in &self.content {
            child.collect_text(out);
        }
    }

    /// Serialize to compact JSON.
    pub fn to_json_string(&self) -> String {
        // Keys are all strings and values are plain JSON, so this cannot fail.
        serde_json::to_string(self).expect("node trees always serialize")
    }
}

/// Decode stored content into a node tree.
///
/// Stored content is either a JSON string (how rows are written) or an
/// already structured JSON value (how some realtime payloads arrive).
pub fn decode_content(raw: Value) -> Result<Node, ContentError> {
    match raw {
        Value::Null => Err(ContentError::Empty),
        Value::String(s) => Ok(serde_json::from_str(&s)?),
        other => Ok(serde_json::from_value(other)?),
    }
}

/// Lenient `decode_content`: malformed content becomes `None`.
pub fn parse_content(raw: Value) -> Option<Node> {
    match decode_content(raw) {
        Ok(node) => Some(node),
        Err(e) => {
            tracing::warn!(error = %e, "failed to parse content");
            None
        }
    }
}
