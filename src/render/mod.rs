//! The render-node tree and the visitors that turn it into text.
//!
//! A [`RenderNode`] tree is built once from a [`crate::computed::ComputedDiff`]
//! and is read-only afterwards. The same tree is walked twice: once by a
//! [`BeforeVisitor`] and once by an [`AfterVisitor`], giving the HCL-like text
//! of the value before and after the change.
//!
//! # Examples
//!
//! ```
//! use plandiff_rs::change::Change;
//! use plandiff_rs::differ::compute_diff_for_type;
//! use plandiff_rs::render::{render_after, render_before};
//! use plandiff_rs::schema::Type;
//! use plandiff_rs::value::Value;
//!
//! let change = Change {
//!     before: Value::from("old"),
//!     after: Value::from("new"),
//!     ..Default::default()
//! };
//! let node = compute_diff_for_type(change, &Type::String).unwrap().render();
//! assert_eq!(render_before(&node).text, "\"old\"\n");
//! assert_eq!(render_after(&node).text, "\"new\"\n");
//! ```

mod build;
mod visitor;

pub use visitor::{
    render_after, render_before, AfterVisitor, BeforeVisitor, HclWriter, RenderWarning,
    RenderedText, Visitor,
};

use crate::computed::Action;
use serde::Serialize;

/// One node of the render tree.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderNode {
    pub action: Action,
    pub replace: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
    #[serde(flatten)]
    pub kind: NodeKind,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NodeKind {
    /// A block body: `KeyValue` attributes followed by `NestedBlock`s.
    Block {
        attributes: Vec<RenderNode>,
        blocks: Vec<RenderNode>,
    },
    /// `name "label" ... { body }`
    NestedBlock {
        name: String,
        labels: Vec<String>,
        body: Box<RenderNode>,
    },
    /// Objects and maps. Entries are `KeyValue` nodes.
    JsonObject { entries: Vec<RenderNode> },
    /// Lists, sets and tuples.
    JsonArray { elements: Vec<RenderNode> },
    /// `key = value`, with the key padded to `width`.
    KeyValue {
        key: String,
        width: usize,
        value: Box<RenderNode>,
    },
    Unknown { before: Option<Box<RenderNode>> },
    TypeChange {
        before: Box<RenderNode>,
        after: Box<RenderNode>,
    },
    /// A primitive update; each side is a leaf node.
    Primitive {
        before: Box<RenderNode>,
        after: Box<RenderNode>,
    },
    /// A string holding JSON, rendered as `jsonencode(...)`.
    JsonString {
        inner: Box<RenderNode>,
        whitespace_only: bool,
    },
    Sensitive {
        before_sensitive: bool,
        after_sensitive: bool,
    },
    SensitiveBlock {
        before_sensitive: bool,
        after_sensitive: bool,
    },
    String { value: String },
    Number { value: f64 },
    Bool { value: bool },
    Null,
}

impl RenderNode {
    pub fn new(kind: NodeKind, action: Action, replace: bool) -> Self {
        Self {
            action,
            replace,
            warnings: Vec::new(),
            kind,
        }
    }

    pub fn with_warnings(mut self, warnings: Vec<String>) -> Self {
        self.warnings = warnings;
        self
    }

    /// Dispatches to the visitor method for this node's kind.
    pub fn accept<V: Visitor + ?Sized>(&self, visitor: &mut V) {
        match &self.kind {
            NodeKind::Block { attributes, blocks } => visitor.visit_block(self, attributes, blocks),
            NodeKind::NestedBlock { name, labels, body } => {
                visitor.visit_nested_block(self, name, labels, body)
            }
            NodeKind::JsonObject { entries } => visitor.visit_json_object(self, entries),
            NodeKind::JsonArray { elements } => visitor.visit_json_array(self, elements),
            NodeKind::KeyValue { key, width, value } => {
                visitor.visit_key_value(self, key, *width, value)
            }
            NodeKind::Unknown { before } => visitor.visit_unknown(self, before.as_deref()),
            NodeKind::TypeChange { before, after } => visitor.visit_type_change(self, before, after),
            NodeKind::Primitive { before, after } => visitor.visit_primitive(self, before, after),
            NodeKind::JsonString {
                inner,
                whitespace_only,
            } => visitor.visit_json_string(self, inner, *whitespace_only),
            NodeKind::Sensitive {
                before_sensitive,
                after_sensitive,
            } => visitor.visit_sensitive(self, *before_sensitive, *after_sensitive),
            NodeKind::SensitiveBlock { .. } => visitor.visit_sensitive_block(self),
            NodeKind::String { value } => visitor.visit_string(self, value),
            NodeKind::Number { value } => visitor.visit_number(self, *value),
            NodeKind::Bool { value } => visitor.visit_bool(self, *value),
            NodeKind::Null => visitor.visit_null(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_serializes_with_type_tag() {
        let node = RenderNode::new(NodeKind::String { value: "x".to_string() }, Action::Create, false);
        let json = serde_json::to_value(&node).unwrap();
        assert_eq!(json["type"], "string");
        assert_eq!(json["action"], "create");
        assert_eq!(json["value"], "x");
        assert!(json.get("warnings").is_none());
    }
}
