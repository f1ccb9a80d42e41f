use super::{compute_diff_for_nested, compute_diff_for_type, gate_relevance};
use crate::change::Change;
use crate::collections::transform_map;
use crate::computed::{ComputedDiff, Renderer};
use crate::error::Result;
use crate::schema::{Attribute, NestingMode, Type};
use std::collections::BTreeMap;

/// Map elements include keys that only exist as unknown.
pub(super) fn compute_map(change: Change, element: &Type) -> Result<ComputedDiff> {
    let map = change.as_map();
    let (elements, action) = transform_map(
        map.before.is_some(),
        map.after.is_some(),
        &map.all_keys(),
        |key| compute_diff_for_type(gate_relevance(map.get_child(key)), element),
    )?;
    Ok(ComputedDiff::new(
        Renderer::Map {
            elements,
            nested: false,
        },
        action,
        change.replace_paths.matches(),
    ))
}

pub(super) fn compute_nested_map(
    change: Change,
    attributes: &BTreeMap<String, Attribute>,
) -> Result<ComputedDiff> {
    let map = change.as_map();
    let (elements, action) = transform_map(
        map.before.is_some(),
        map.after.is_some(),
        &map.explicit_keys(),
        |key| compute_diff_for_nested(gate_relevance(map.get_child(key)), attributes, NestingMode::Single),
    )?;
    Ok(ComputedDiff::new(
        Renderer::Map {
            elements,
            nested: true,
        },
        action,
        change.replace_paths.matches(),
    ))
}
