use super::{compute_diff_for_attribute, compute_diff_for_type, gate_relevance, is_absent_no_op};
use crate::change::Change;
use crate::collections::compare_actions;
use crate::computed::{Action, ComputedDiff, Renderer};
use crate::error::Result;
use crate::schema::{Attribute, Type};
use std::collections::BTreeMap;

pub(super) fn compute_object(change: Change, attributes: &BTreeMap<String, Type>) -> Result<ComputedDiff> {
    let (diffs, action) = process_object(&change, attributes, compute_diff_for_type)?;
    Ok(ComputedDiff::new(
        Renderer::Object {
            attributes: diffs,
            nested: false,
        },
        action,
        change.replace_paths.matches(),
    ))
}

pub(super) fn compute_nested_object(
    change: Change,
    attributes: &BTreeMap<String, Attribute>,
) -> Result<ComputedDiff> {
    let (diffs, action) = process_object(&change, attributes, compute_diff_for_attribute)?;
    Ok(ComputedDiff::new(
        Renderer::Object {
            attributes: diffs,
            nested: true,
        },
        action,
        change.replace_paths.matches(),
    ))
}

/// Object attributes are always implicit: an attribute set to null reads as
/// removed.
fn process_object<T, F>(
    change: &Change,
    attributes: &BTreeMap<String, T>,
    compute: F,
) -> Result<(BTreeMap<String, ComputedDiff>, Action)>
where
    F: Fn(Change, &T) -> Result<ComputedDiff>,
{
    let map = change.as_map();
    let mut current = change.default_action_for_iteration();
    let mut diffs = BTreeMap::new();

    for (key, attribute) in attributes {
        let mut child = gate_relevance(map.get_child(key));
        child.before_explicit = false;
        child.after_explicit = false;

        let diff = compute(child.clone(), attribute)?;
        if is_absent_no_op(&diff, &child) {
            continue;
        }
        current = compare_actions(current, diff.action);
        diffs.insert(key.clone(), diff);
    }

    Ok((diffs, current))
}
