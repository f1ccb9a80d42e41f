//! The before/after value bundle at one position of a plan.
//!
//! A [`Change`] is a plain value. Descending into a child (see
//! [`ChangeMap::get_child`] and [`ChangeSlice::get_child`]) builds a new
//! `Change` with its sensitivity, unknown marks and path matchers scoped to
//! that child.

use crate::computed::{Action, ComputedDiff};
use crate::error::Result;
use crate::path::Matcher;
use crate::value::Value;
use std::collections::{BTreeMap, BTreeSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Change {
    pub before: Value,
    pub after: Value,
    /// The before value is null because it was set to null, not because it
    /// is absent.
    pub before_explicit: bool,
    pub after_explicit: bool,
    /// `true`, or a structure of booleans, marking unknown parts of `after`.
    pub unknown: Value,
    pub before_sensitive: Value,
    pub after_sensitive: Value,
    pub replace_paths: Matcher,
    pub relevant_attributes: Matcher,
}

impl Default for Change {
    /// Both sides absent, nothing forces replacement, everything is relevant.
    fn default() -> Self {
        Self {
            before: Value::Null,
            after: Value::Null,
            before_explicit: false,
            after_explicit: false,
            unknown: Value::Null,
            before_sensitive: Value::Null,
            after_sensitive: Value::Null,
            replace_paths: Matcher::empty(false),
            relevant_attributes: Matcher::always(),
        }
    }
}

impl Change {
    /// Builds a change from raw plan JSON fields.
    pub fn from_json(
        before: Option<serde_json::Value>,
        after: Option<serde_json::Value>,
        unknown: Option<serde_json::Value>,
        before_sensitive: Option<serde_json::Value>,
        after_sensitive: Option<serde_json::Value>,
        replace_paths: Matcher,
        relevant_attributes: Matcher,
    ) -> Self {
        Self {
            before: Value::from(before),
            after: Value::from(after),
            before_explicit: false,
            after_explicit: false,
            unknown: Value::from(unknown),
            before_sensitive: Value::from(before_sensitive),
            after_sensitive: Value::from(after_sensitive),
            replace_paths,
            relevant_attributes,
        }
    }

    fn before_missing(&self) -> bool {
        self.before.is_null() && !self.before_explicit
    }

    fn after_missing(&self) -> bool {
        self.after.is_null() && !self.after_explicit
    }

    pub fn calculate_action(&self) -> Action {
        if self.before_missing() && !self.after_missing() {
            return Action::Create;
        }
        if self.after_missing() && !self.before_missing() {
            return Action::Delete;
        }
        if self.before == self.after
            && self.before_explicit == self.after_explicit
            && self.is_before_sensitive() == self.is_after_sensitive()
        {
            return Action::NoOp;
        }
        Action::Update
    }

    /// The starting action for a parent before its children are folded in.
    pub fn default_action_for_iteration(&self) -> Action {
        match (self.before.is_null(), self.after.is_null()) {
            (true, true) => Action::NoOp,
            (true, false) => Action::Create,
            (false, true) => Action::Delete,
            (false, false) => Action::NoOp,
        }
    }

    /// The before side compared with itself.
    pub fn as_no_op(&self) -> Change {
        Change {
            before: self.before.clone(),
            after: self.before.clone(),
            before_explicit: self.before_explicit,
            after_explicit: self.before_explicit,
            unknown: Value::Bool(false),
            before_sensitive: self.before_sensitive.clone(),
            after_sensitive: self.before_sensitive.clone(),
            replace_paths: self.replace_paths.clone(),
            relevant_attributes: self.relevant_attributes.clone(),
        }
    }

    /// Only the before side, as if the value were being removed.
    pub fn as_delete(&self) -> Change {
        Change {
            before: self.before.clone(),
            after: Value::Null,
            before_explicit: self.before_explicit,
            after_explicit: false,
            unknown: Value::Null,
            before_sensitive: self.before_sensitive.clone(),
            after_sensitive: Value::Null,
            replace_paths: self.replace_paths.clone(),
            relevant_attributes: self.relevant_attributes.clone(),
        }
    }

    /// Only the after side, as if the value were being added.
    pub fn as_create(&self) -> Change {
        Change {
            before: Value::Null,
            after: self.after.clone(),
            before_explicit: false,
            after_explicit: self.after_explicit,
            unknown: self.unknown.clone(),
            before_sensitive: Value::Null,
            after_sensitive: self.after_sensitive.clone(),
            replace_paths: self.replace_paths.clone(),
            relevant_attributes: self.relevant_attributes.clone(),
        }
    }

    /// Container-level sensitivity only; nested marks are read by children.
    pub fn is_before_sensitive(&self) -> bool {
        self.before_sensitive.as_bool().unwrap_or(false)
    }

    pub fn is_after_sensitive(&self) -> bool {
        self.after_sensitive.as_bool().unwrap_or(false)
    }

    pub fn is_unknown(&self) -> bool {
        self.unknown.as_bool().unwrap_or(false)
    }

    /// Wraps the diff in a sensitive renderer when either side is sensitive.
    ///
    /// `process_inner` diffs the content with sensitivity cleared and
    /// `create_diff` wraps the result. A content no-op becomes an update when
    /// the sensitivity itself changes, unless both sides are absent.
    pub fn check_for_sensitive<P, C>(
        &self,
        process_inner: P,
        create_diff: C,
    ) -> Result<Option<ComputedDiff>>
    where
        P: FnOnce(Change) -> Result<ComputedDiff>,
        C: FnOnce(ComputedDiff, bool, bool, Action) -> ComputedDiff,
    {
        let before_sensitive = self.is_before_sensitive();
        let after_sensitive = self.is_after_sensitive();
        if !before_sensitive && !after_sensitive {
            return Ok(None);
        }

        let value = Change {
            before_sensitive: Value::Bool(false),
            after_sensitive: Value::Bool(false),
            ..self.clone()
        };
        let inner = process_inner(value)?;

        let mut action = inner.action;
        let null_no_op = self.before_missing() && self.after_missing();
        if action == Action::NoOp && before_sensitive != after_sensitive && !null_no_op {
            action = Action::Update;
        }

        Ok(Some(create_diff(
            inner,
            before_sensitive,
            after_sensitive,
            action,
        )))
    }

    /// Handles values that are only known after apply.
    ///
    /// With no before value `process_create` renders a bare placeholder.
    /// Otherwise `process_before` receives the original change and a
    /// delete-shaped change for the before value whose unknown marks are
    /// replaced with `child_unknown`, so containers can show their children
    /// as computed instead of removed.
    pub fn check_for_unknown<P, B>(
        &self,
        child_unknown: Value,
        process_create: P,
        process_before: B,
    ) -> Result<Option<ComputedDiff>>
    where
        P: FnOnce(Change) -> Result<ComputedDiff>,
        B: FnOnce(Change, Change) -> Result<ComputedDiff>,
    {
        if !self.is_unknown() {
            return Ok(None);
        }

        // The after value is null here, but it is not being removed.
        let mut change = self.clone();
        change.after_explicit = true;

        if change.before.is_null() {
            return process_create(change).map(Some);
        }

        let before = Change {
            before: change.before.clone(),
            after: Value::Null,
            before_explicit: false,
            after_explicit: false,
            unknown: child_unknown,
            before_sensitive: change.before_sensitive.clone(),
            after_sensitive: Value::Null,
            replace_paths: change.replace_paths.clone(),
            relevant_attributes: change.relevant_attributes.clone(),
        };
        process_before(change, before).map(Some)
    }

    pub fn as_map(&self) -> ChangeMap {
        ChangeMap {
            before: self.before.as_object().cloned(),
            after: self.after.as_object().cloned(),
            unknown: self.unknown.clone(),
            before_sensitive: self.before_sensitive.clone(),
            after_sensitive: self.after_sensitive.clone(),
            replace_paths: self.replace_paths.clone(),
            relevant_attributes: self.relevant_attributes.clone(),
        }
    }

    pub fn as_slice(&self) -> ChangeSlice {
        ChangeSlice {
            before: self.before.as_array().cloned(),
            after: self.after.as_array().cloned(),
            unknown: self.unknown.clone(),
            before_sensitive: self.before_sensitive.clone(),
            after_sensitive: self.after_sensitive.clone(),
            replace_paths: self.replace_paths.clone(),
            relevant_attributes: self.relevant_attributes.clone(),
        }
    }
}

/// A change viewed as a map (objects, maps, blocks).
///
/// `None` means the side was not a map at all, which is different from an
/// empty map.
#[derive(Debug, Clone)]
pub struct ChangeMap {
    pub before: Option<BTreeMap<String, Value>>,
    pub after: Option<BTreeMap<String, Value>>,
    pub unknown: Value,
    pub before_sensitive: Value,
    pub after_sensitive: Value,
    pub replace_paths: Matcher,
    pub relevant_attributes: Matcher,
}

impl ChangeMap {
    pub fn get_child(&self, key: &str) -> Change {
        let (before, before_explicit) = lookup_key(self.before.as_ref(), key);
        let (after, after_explicit) = lookup_key(self.after.as_ref(), key);
        Change {
            before,
            after,
            before_explicit,
            after_explicit,
            unknown: self.unknown.get_key(key).0,
            before_sensitive: self.before_sensitive.get_key(key).0,
            after_sensitive: self.after_sensitive.get_key(key).0,
            replace_paths: self.replace_paths.child_with_key(key),
            relevant_attributes: self.relevant_attributes.child_with_key(key),
        }
    }

    /// Keys present in the before or after map, sorted.
    pub fn explicit_keys(&self) -> Vec<String> {
        let mut keys = BTreeSet::new();
        keys.extend(self.before.iter().flat_map(|m| m.keys().cloned()));
        keys.extend(self.after.iter().flat_map(|m| m.keys().cloned()));
        keys.into_iter().collect()
    }

    /// Explicit keys plus keys whose after value is unknown, sorted.
    pub fn all_keys(&self) -> Vec<String> {
        let mut keys: BTreeSet<String> = self.explicit_keys().into_iter().collect();
        if let Some(unknown) = self.unknown.as_object() {
            keys.extend(unknown.keys().cloned());
        }
        keys.into_iter().collect()
    }
}

fn lookup_key(map: Option<&BTreeMap<String, Value>>, key: &str) -> (Value, bool) {
    match map.and_then(|m| m.get(key)) {
        Some(value) => (value.clone(), true),
        None => (Value::Null, false),
    }
}

/// A change viewed as a sequence (lists, sets, tuples).
#[derive(Debug, Clone)]
pub struct ChangeSlice {
    pub before: Option<Vec<Value>>,
    pub after: Option<Vec<Value>>,
    pub unknown: Value,
    pub before_sensitive: Value,
    pub after_sensitive: Value,
    pub replace_paths: Matcher,
    pub relevant_attributes: Matcher,
}

impl ChangeSlice {
    pub fn before_len(&self) -> usize {
        self.before.as_ref().map_or(0, Vec::len)
    }

    pub fn after_len(&self) -> usize {
        self.after.as_ref().map_or(0, Vec::len)
    }

    /// Pairs `before[before_ix]` with `after[after_ix]`. An out-of-range
    /// index stands for "no element on this side".
    ///
    /// Path matchers follow the before index when it is in range, and the
    /// after index otherwise.
    pub fn get_child(&self, before_ix: usize, after_ix: usize) -> Result<Change> {
        let (before, before_explicit) = lookup_index(self.before.as_ref(), before_ix);
        let (after, after_explicit) = lookup_index(self.after.as_ref(), after_ix);

        let relevant_ix = if before_ix < self.before_len() {
            before_ix
        } else {
            after_ix
        };

        Ok(Change {
            before,
            after,
            before_explicit,
            after_explicit,
            unknown: self.unknown.get_index(after_ix).0,
            before_sensitive: self.before_sensitive.get_index(before_ix).0,
            after_sensitive: self.after_sensitive.get_index(after_ix).0,
            replace_paths: self.replace_paths.child_with_index(relevant_ix)?,
            relevant_attributes: self.relevant_attributes.child_with_index(relevant_ix)?,
        })
    }
}

fn lookup_index(items: Option<&Vec<Value>>, index: usize) -> (Value, bool) {
    match items.and_then(|v| v.get(index)) {
        Some(value) => (value.clone(), true),
        None => (Value::Null, false),
    }
}
