//! Schema-driven diffing.
//!
//! Every entry point first lets sensitivity wrap the value, then lets an
//! unknown value wrap the structure, and only then dispatches on the schema.
//! The order matters: a sensitive value that is also unknown renders as
//! sensitive.
//!
//! # Examples
//!
//! ```
//! use plandiff_rs::change::Change;
//! use plandiff_rs::computed::Action;
//! use plandiff_rs::differ::compute_diff_for_type;
//! use plandiff_rs::schema::Type;
//! use plandiff_rs::value::Value;
//!
//! let change = Change {
//!     after: Value::from("hello"),
//!     ..Default::default()
//! };
//! let diff = compute_diff_for_type(change, &Type::String).unwrap();
//! assert_eq!(diff.action, Action::Create);
//! ```

mod block;
pub mod json;
mod list;
mod map;
mod object;
mod set;

use crate::change::Change;
use crate::computed::{Action, ComputedDiff, Renderer};
use crate::error::Result;
use crate::schema::{Attribute, NestedType, NestingMode, Type};
use crate::value::Value;
use std::collections::BTreeMap;

pub use block::compute_diff_for_block;

/// Diffs a value against an attribute schema.
pub fn compute_diff_for_attribute(change: Change, attribute: &Attribute) -> Result<ComputedDiff> {
    if let Some(nested) = &attribute.nested_type {
        return compute_diff_for_nested_attribute(change, nested);
    }
    compute_diff_for_type(change, &attribute.cty_type()?)
}

/// Diffs a value against a nested attribute type.
pub fn compute_diff_for_nested_attribute(change: Change, nested: &NestedType) -> Result<ComputedDiff> {
    let mode = NestingMode::parse(&nested.nesting_mode)?;
    compute_diff_for_nested(change, &nested.attributes, mode)
}

fn compute_diff_for_nested(
    change: Change,
    attributes: &BTreeMap<String, Attribute>,
    mode: NestingMode,
) -> Result<ComputedDiff> {
    let replace = change.replace_paths.matches();
    if let Some(diff) = change.check_for_sensitive(
        |value| compute_diff_for_nested(value, attributes, mode),
        |inner, before, after, action| {
            ComputedDiff::new(Renderer::sensitive(inner, before, after), action, replace)
        },
    )? {
        return Ok(diff);
    }

    // Known children of an unknown object should show as computed, not removed.
    if let Some(diff) = change.check_for_unknown(
        all_unknown(attributes.keys()),
        process_unknown,
        |current, before| {
            process_unknown_with_before(current, compute_diff_for_nested(before, attributes, mode)?)
        },
    )? {
        return Ok(diff);
    }

    match mode {
        NestingMode::Single | NestingMode::Group => object::compute_nested_object(change, attributes),
        NestingMode::Map => map::compute_nested_map(change, attributes),
        NestingMode::List => list::compute_nested_list(change, attributes),
        NestingMode::Set => set::compute_nested_set(change, attributes),
    }
}

/// Diffs a value against a type expression.
pub fn compute_diff_for_type(change: Change, ctype: &Type) -> Result<ComputedDiff> {
    let replace = change.replace_paths.matches();
    if let Some(diff) = change.check_for_sensitive(
        |value| compute_diff_for_type(value, ctype),
        |inner, before, after, action| {
            ComputedDiff::new(Renderer::sensitive(inner, before, after), action, replace)
        },
    )? {
        return Ok(diff);
    }

    if let Some(diff) = change.check_for_unknown(
        Value::Bool(false),
        process_unknown,
        |current, before| process_unknown_with_before(current, compute_diff_for_type(before, ctype)?),
    )? {
        return Ok(diff);
    }

    match ctype {
        // Dynamic values carry their own shape, exactly like outputs.
        Type::Nil | Type::Dynamic => compute_diff_for_output(change),
        Type::String | Type::Number | Type::Bool => Ok(as_diff(
            &change,
            Renderer::primitive(change.before.clone(), change.after.clone(), ctype.clone()),
        )),
        Type::Object(attributes) => object::compute_object(change, attributes),
        Type::Map(element) => map::compute_map(change, element),
        Type::List(element) => list::compute_list(change, element),
        Type::Tuple(elements) => list::compute_tuple(change, elements),
        Type::Set(element) => set::compute_set(change, element),
    }
}

/// Diffs an output value, or any value without a schema.
pub fn compute_diff_for_output(change: Change) -> Result<ComputedDiff> {
    let replace = change.replace_paths.matches();
    if let Some(diff) = change.check_for_sensitive(
        |value| compute_diff_for_type(value, &Type::Dynamic),
        |inner, before, after, action| {
            ComputedDiff::new(Renderer::sensitive(inner, before, after), action, replace)
        },
    )? {
        return Ok(diff);
    }

    if let Some(diff) = change.check_for_unknown(
        Value::Bool(false),
        process_unknown,
        |current, before| {
            process_unknown_with_before(current, compute_diff_for_type(before, &Type::Dynamic)?)
        },
    )? {
        return Ok(diff);
    }

    json::transform(change)
}

fn as_diff(change: &Change, renderer: Renderer) -> ComputedDiff {
    ComputedDiff::new(renderer, change.calculate_action(), change.replace_paths.matches())
}

fn process_unknown(current: Change) -> Result<ComputedDiff> {
    Ok(as_diff(&current, Renderer::unknown(None)))
}

fn process_unknown_with_before(current: Change, before: ComputedDiff) -> Result<ComputedDiff> {
    Ok(as_diff(&current, Renderer::unknown(Some(before))))
}

/// An unknown hint marking every named child as unknown.
fn all_unknown<'a, I>(keys: I) -> Value
where
    I: Iterator<Item = &'a String>,
{
    Value::Object(keys.map(|key| (key.clone(), Value::Bool(true))).collect())
}

/// Children that nobody asked about are shown as unchanged.
fn gate_relevance(child: Change) -> Change {
    if child.relevant_attributes.matches_partial() {
        child
    } else {
        child.as_no_op()
    }
}

/// A child that is absent on both sides and unchanged is left out entirely.
fn is_absent_no_op(diff: &ComputedDiff, child: &Change) -> bool {
    diff.action == Action::NoOp && child.before.is_null() && child.after.is_null()
}
