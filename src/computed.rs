//! Computed diffs: the intermediate result of schema-driven diffing.
//!
//! A [`ComputedDiff`] pairs an [`Action`] with a [`Renderer`] that knows how
//! to turn the diff into a [`crate::render::RenderNode`].

use crate::schema::Type;
use crate::value::Value;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// What happens to a value between the before and after state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Action {
    Create,
    Update,
    Delete,
    NoOp,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Create => "create",
            Action::Update => "update",
            Action::Delete => "delete",
            Action::NoOp => "no-op",
        }
    }
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The outcome of diffing one position in the value tree.
#[derive(Debug, Clone, PartialEq)]
pub struct ComputedDiff {
    pub action: Action,
    /// Whether this position forces the enclosing resource to be replaced.
    pub replace: bool,
    pub renderer: Renderer,
}

impl ComputedDiff {
    pub fn new(renderer: Renderer, action: Action, replace: bool) -> Self {
        Self {
            action,
            replace,
            renderer,
        }
    }

    /// Human-readable warnings attached to this diff.
    ///
    /// Only sensitivity transitions produce warnings, and only when the
    /// wrapped value itself survives the change.
    pub fn warnings(&self) -> Vec<String> {
        match &self.renderer {
            Renderer::Sensitive {
                inner,
                before_sensitive,
                after_sensitive,
            } => sensitivity_warning("attribute value", *before_sensitive, *after_sensitive, inner.action),
            Renderer::SensitiveBlock {
                inner,
                before_sensitive,
                after_sensitive,
            } => sensitivity_warning("block", *before_sensitive, *after_sensitive, inner.action),
            _ => Vec::new(),
        }
    }
}

fn sensitivity_warning(
    subject: &str,
    before_sensitive: bool,
    after_sensitive: bool,
    action: Action,
) -> Vec<String> {
    if before_sensitive == after_sensitive || matches!(action, Action::Create | Action::Delete) {
        return Vec::new();
    }

    let mut warning = if before_sensitive {
        format!("This {subject} will no longer be marked as sensitive after applying this change")
    } else {
        format!(
            "This {subject} will be marked as sensitive and will not display in UI output after applying this change"
        )
    };
    if action == Action::NoOp {
        warning.push_str(" (the value is unchanged)");
    }
    vec![warning]
}

/// The closed set of renderers a diff can carry.
#[derive(Debug, Clone, PartialEq)]
pub enum Renderer {
    /// A primitive value. String values get JSON and multiline handling at
    /// render time.
    Primitive {
        before: Value,
        after: Value,
        ctype: Type,
    },
    /// Object attributes; `nested` marks nested-attribute objects.
    Object {
        attributes: BTreeMap<String, ComputedDiff>,
        nested: bool,
    },
    Map {
        elements: BTreeMap<String, ComputedDiff>,
        nested: bool,
    },
    List {
        elements: Vec<ComputedDiff>,
        nested: bool,
    },
    Set {
        elements: Vec<ComputedDiff>,
        nested: bool,
    },
    Block {
        attributes: BTreeMap<String, ComputedDiff>,
        blocks: Blocks,
    },
    Sensitive {
        inner: Box<ComputedDiff>,
        before_sensitive: bool,
        after_sensitive: bool,
    },
    SensitiveBlock {
        inner: Box<ComputedDiff>,
        before_sensitive: bool,
        after_sensitive: bool,
    },
    /// A value known only after apply, optionally with the value it replaces.
    Unknown { before: Option<Box<ComputedDiff>> },
    TypeChange {
        before: Box<ComputedDiff>,
        after: Box<ComputedDiff>,
    },
}

impl Renderer {
    pub fn primitive(before: Value, after: Value, ctype: Type) -> Self {
        Renderer::Primitive {
            before,
            after,
            ctype,
        }
    }

    pub fn sensitive(inner: ComputedDiff, before_sensitive: bool, after_sensitive: bool) -> Self {
        Renderer::Sensitive {
            inner: Box::new(inner),
            before_sensitive,
            after_sensitive,
        }
    }

    pub fn sensitive_block(
        inner: ComputedDiff,
        before_sensitive: bool,
        after_sensitive: bool,
    ) -> Self {
        Renderer::SensitiveBlock {
            inner: Box::new(inner),
            before_sensitive,
            after_sensitive,
        }
    }

    pub fn unknown(before: Option<ComputedDiff>) -> Self {
        Renderer::Unknown {
            before: before.map(Box::new),
        }
    }

    pub fn type_change(before: ComputedDiff, after: ComputedDiff) -> Self {
        Renderer::TypeChange {
            before: Box::new(before),
            after: Box::new(after),
        }
    }
}

/// Nested blocks of a block, grouped by nesting mode.
///
/// The metadata maps are keyed by block type name. They exist because a
/// whole group of blocks can be sensitive or force replacement even when no
/// individual instance is.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Blocks {
    pub single_blocks: BTreeMap<String, ComputedDiff>,
    pub list_blocks: BTreeMap<String, Vec<ComputedDiff>>,
    pub set_blocks: BTreeMap<String, Vec<ComputedDiff>>,
    pub map_blocks: BTreeMap<String, BTreeMap<String, ComputedDiff>>,
    pub replace_blocks: BTreeMap<String, bool>,
    pub before_sensitive_blocks: BTreeMap<String, bool>,
    pub after_sensitive_blocks: BTreeMap<String, bool>,
}

impl Blocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_single_block(
        &mut self,
        key: &str,
        diff: ComputedDiff,
        replace: bool,
        before_sensitive: bool,
        after_sensitive: bool,
    ) {
        self.single_blocks.insert(key.to_string(), diff);
        self.record_metadata(key, replace, before_sensitive, after_sensitive);
    }

    pub fn add_all_list_blocks(
        &mut self,
        key: &str,
        diffs: Vec<ComputedDiff>,
        replace: bool,
        before_sensitive: bool,
        after_sensitive: bool,
    ) {
        self.list_blocks.insert(key.to_string(), diffs);
        self.record_metadata(key, replace, before_sensitive, after_sensitive);
    }

    pub fn add_all_set_blocks(
        &mut self,
        key: &str,
        diffs: Vec<ComputedDiff>,
        replace: bool,
        before_sensitive: bool,
        after_sensitive: bool,
    ) {
        self.set_blocks.insert(key.to_string(), diffs);
        self.record_metadata(key, replace, before_sensitive, after_sensitive);
    }

    pub fn add_all_map_blocks(
        &mut self,
        key: &str,
        diffs: BTreeMap<String, ComputedDiff>,
        replace: bool,
        before_sensitive: bool,
        after_sensitive: bool,
    ) {
        self.map_blocks.insert(key.to_string(), diffs);
        self.record_metadata(key, replace, before_sensitive, after_sensitive);
    }

    fn record_metadata(
        &mut self,
        key: &str,
        replace: bool,
        before_sensitive: bool,
        after_sensitive: bool,
    ) {
        self.replace_blocks.insert(key.to_string(), replace);
        self.before_sensitive_blocks
            .insert(key.to_string(), before_sensitive);
        self.after_sensitive_blocks
            .insert(key.to_string(), after_sensitive);
    }

    /// Every block type name present in any bucket, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self
            .single_blocks
            .keys()
            .chain(self.list_blocks.keys())
            .chain(self.set_blocks.keys())
            .chain(self.map_blocks.keys())
            .cloned()
            .collect();
        keys.sort();
        keys.dedup();
        keys
    }

    pub fn is_replace(&self, key: &str) -> bool {
        self.replace_blocks.get(key).copied().unwrap_or(false)
    }

    pub fn is_before_sensitive(&self, key: &str) -> bool {
        self.before_sensitive_blocks.get(key).copied().unwrap_or(false)
    }

    pub fn is_after_sensitive(&self, key: &str) -> bool {
        self.after_sensitive_blocks.get(key).copied().unwrap_or(false)
    }
}
