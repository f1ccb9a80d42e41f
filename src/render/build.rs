//! Turns computed diffs into render nodes.

use super::visitor::quote;
use super::{NodeKind, RenderNode};
use crate::change::Change;
use crate::computed::{Action, Blocks, ComputedDiff, Renderer};
use crate::differ::json;
use crate::schema::Type;
use crate::value::Value;
use std::collections::BTreeMap;

#[derive(Clone, Copy)]
enum Side {
    Before,
    After,
}

impl ComputedDiff {
    /// Builds the render tree for this diff.
    pub fn render(&self) -> RenderNode {
        build(self, false)
    }
}

/// `forced_replace` is set by containers that push their replace marker
/// down onto their elements.
fn build(diff: &ComputedDiff, forced_replace: bool) -> RenderNode {
    let replace = diff.replace || forced_replace;
    let action = diff.action;

    let node = match &diff.renderer {
        Renderer::Primitive {
            before,
            after,
            ctype,
        } => primitive(action, replace, before, after, ctype),
        Renderer::Object { attributes, .. } => RenderNode::new(
            NodeKind::JsonObject {
                entries: key_values(attributes, attribute_key),
            },
            action,
            replace,
        ),
        Renderer::Map { elements, nested } => {
            let push_down = *nested && replace;
            RenderNode::new(
                NodeKind::JsonObject {
                    entries: key_values_forced(elements, quote, push_down),
                },
                action,
                replace && !push_down,
            )
        }
        Renderer::List { elements, .. } => RenderNode::new(
            NodeKind::JsonArray {
                elements: elements.iter().map(|e| build(e, false)).collect(),
            },
            action,
            replace,
        ),
        Renderer::Set { elements, nested } => {
            let push_down = *nested && replace;
            RenderNode::new(
                NodeKind::JsonArray {
                    elements: elements.iter().map(|e| build(e, push_down)).collect(),
                },
                action,
                replace && !push_down,
            )
        }
        Renderer::Block { attributes, blocks } => RenderNode::new(
            NodeKind::Block {
                attributes: key_values(attributes, attribute_key),
                blocks: nested_blocks(blocks),
            },
            action,
            replace,
        ),
        Renderer::Sensitive {
            before_sensitive,
            after_sensitive,
            ..
        } => RenderNode::new(
            NodeKind::Sensitive {
                before_sensitive: *before_sensitive,
                after_sensitive: *after_sensitive,
            },
            action,
            replace,
        ),
        Renderer::SensitiveBlock {
            before_sensitive,
            after_sensitive,
            ..
        } => RenderNode::new(
            NodeKind::SensitiveBlock {
                before_sensitive: *before_sensitive,
                after_sensitive: *after_sensitive,
            },
            action,
            replace,
        ),
        Renderer::Unknown { before } => RenderNode::new(
            NodeKind::Unknown {
                before: before.as_ref().map(|b| Box::new(build(b, false))),
            },
            action,
            replace,
        ),
        Renderer::TypeChange { before, after } => RenderNode::new(
            NodeKind::TypeChange {
                before: Box::new(unwrap_primitive(build(before, false), Side::Before)),
                after: Box::new(unwrap_primitive(build(after, false), Side::After)),
            },
            action,
            replace,
        ),
    };

    node.with_warnings(diff.warnings())
}

fn key_values<F>(children: &BTreeMap<String, ComputedDiff>, display: F) -> Vec<RenderNode>
where
    F: Fn(&str) -> String,
{
    key_values_forced(children, display, false)
}

fn key_values_forced<F>(
    children: &BTreeMap<String, ComputedDiff>,
    display: F,
    forced_replace: bool,
) -> Vec<RenderNode>
where
    F: Fn(&str) -> String,
{
    let keys: Vec<String> = children.keys().map(|k| display(k)).collect();
    let width = keys.iter().map(|k| k.chars().count()).max().unwrap_or(0);

    keys.into_iter()
        .zip(children.values())
        .map(|(key, child)| {
            let value = build(child, forced_replace);
            RenderNode::new(
                NodeKind::KeyValue {
                    key,
                    width,
                    value: Box::new(value),
                },
                child.action,
                false,
            )
        })
        .collect()
}

/// Attribute names are written bare when they are valid identifiers.
fn attribute_key(key: &str) -> String {
    let mut chars = key.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '-')
        }
        None => false,
    };
    if valid {
        key.to_string()
    } else {
        quote(key)
    }
}

fn nested_blocks(blocks: &Blocks) -> Vec<RenderNode> {
    let mut nodes = Vec::new();
    for key in blocks.all_keys() {
        let group = Group {
            name: &key,
            replace: blocks.is_replace(&key),
            before_sensitive: blocks.is_before_sensitive(&key),
            after_sensitive: blocks.is_after_sensitive(&key),
        };

        if let Some(diff) = blocks.single_blocks.get(&key) {
            nodes.push(group.instance(diff, Vec::new()));
        }
        if let Some(diffs) = blocks.list_blocks.get(&key) {
            nodes.extend(diffs.iter().map(|d| group.instance(d, Vec::new())));
        }
        if let Some(diffs) = blocks.set_blocks.get(&key) {
            nodes.extend(diffs.iter().map(|d| group.instance(d, Vec::new())));
        }
        if let Some(diffs) = blocks.map_blocks.get(&key) {
            nodes.extend(diffs.iter().map(|(label, d)| group.instance(d, vec![label.clone()])));
        }
    }
    nodes
}

/// Metadata shared by every instance of one block type.
struct Group<'a> {
    name: &'a str,
    replace: bool,
    before_sensitive: bool,
    after_sensitive: bool,
}

impl Group<'_> {
    /// A whole group can be sensitive even when no single instance is, in
    /// which case each instance is hidden behind a sensitive block.
    fn instance(&self, diff: &ComputedDiff, labels: Vec<String>) -> RenderNode {
        let sensitive = self.before_sensitive || self.after_sensitive;
        let body = if sensitive && !matches!(diff.renderer, Renderer::SensitiveBlock { .. }) {
            let mut action = diff.action;
            if action == Action::NoOp && self.before_sensitive != self.after_sensitive {
                action = Action::Update;
            }
            let wrapped = ComputedDiff::new(
                Renderer::sensitive_block(diff.clone(), self.before_sensitive, self.after_sensitive),
                action,
                diff.replace,
            );
            build(&wrapped, self.replace)
        } else {
            build(diff, self.replace)
        };

        let (action, replace) = (body.action, body.replace);
        RenderNode::new(
            NodeKind::NestedBlock {
                name: self.name.to_string(),
                labels,
                body: Box::new(body),
            },
            action,
            replace,
        )
    }
}

fn primitive(action: Action, replace: bool, before: &Value, after: &Value, ctype: &Type) -> RenderNode {
    if *ctype == Type::String {
        if let Some(node) = string_primitive(action, replace, before, after) {
            return node;
        }
    }
    RenderNode::new(
        NodeKind::Primitive {
            before: Box::new(leaf(before, action, replace)),
            after: Box::new(leaf(after, action, replace)),
        },
        action,
        replace,
    )
}

fn leaf(value: &Value, action: Action, replace: bool) -> RenderNode {
    let kind = match value {
        Value::String(s) => NodeKind::String { value: s.clone() },
        Value::Number(n) => NodeKind::Number { value: *n },
        Value::Bool(b) => NodeKind::Bool { value: *b },
        // Collections never reach a primitive renderer with a valid schema.
        Value::Null | Value::Array(_) | Value::Object(_) => NodeKind::Null,
    };
    RenderNode::new(kind, action, replace)
}

/// JSON-looking strings are diffed structurally.
///
/// Returns `None` when the string should render as a plain literal.
fn string_primitive(action: Action, replace: bool, before: &Value, after: &Value) -> Option<RenderNode> {
    let before_json = before.as_str().and_then(parse_json);
    let after_json = after.as_str().and_then(parse_json);

    match action {
        Action::Create | Action::NoOp => {
            let after_json = after_json?;
            let before_json = if action == Action::NoOp {
                Some(after_json.clone())
            } else {
                None
            };
            json_string(action, replace, before_json, Some(after_json))
        }
        Action::Delete => json_string(action, replace, Some(before_json?), None),
        Action::Update => match (before_json, after_json) {
            (Some(b), Some(a)) => json_string(action, replace, Some(b), Some(a)),
            (None, None) => None,
            // One side is JSON and the other is not: show it as a type change.
            _ => {
                let before_node = primitive(Action::Delete, replace, before, &Value::Null, &Type::String);
                let after_node = primitive(Action::Create, replace, &Value::Null, after, &Type::String);
                Some(RenderNode::new(
                    NodeKind::TypeChange {
                        before: Box::new(unwrap_primitive(before_node, Side::Before)),
                        after: Box::new(unwrap_primitive(after_node, Side::After)),
                    },
                    Action::Update,
                    replace,
                ))
            }
        },
    }
}

fn parse_json(s: &str) -> Option<serde_json::Value> {
    if s.starts_with('{') || s.starts_with('[') {
        serde_json::from_str(s).ok()
    } else {
        None
    }
}

fn json_string(
    action: Action,
    replace: bool,
    before: Option<serde_json::Value>,
    after: Option<serde_json::Value>,
) -> Option<RenderNode> {
    let change = Change {
        before: Value::from(before),
        after: Value::from(after),
        ..Default::default()
    };
    let inner = json::transform(change).ok()?;
    let whitespace_only = action == Action::Update && inner.action == Action::NoOp;

    Some(RenderNode::new(
        NodeKind::JsonString {
            inner: Box::new(build(&inner, false)),
            whitespace_only,
        },
        action,
        replace,
    ))
}

/// Both sides of a type change are shown whole, so a primitive collapses
/// to the leaf of its own side.
fn unwrap_primitive(node: RenderNode, side: Side) -> RenderNode {
    match node.kind {
        NodeKind::Primitive { before, after } => match side {
            Side::Before => *before,
            Side::After => *after,
        },
        _ => node,
    }
}
