use super::{compute_diff_for_nested, compute_diff_for_type};
use crate::change::Change;
use crate::collections::compare_actions;
use crate::computed::{Action, ComputedDiff, Renderer};
use crate::error::Result;
use crate::path::Matcher;
use crate::schema::{Attribute, NestingMode, Type};
use std::collections::BTreeMap;

pub(super) fn compute_set(change: Change, element: &Type) -> Result<ComputedDiff> {
    let (elements, action) = collect_set(&change, |child| compute_diff_for_type(child, element))?;
    Ok(ComputedDiff::new(
        Renderer::Set {
            elements,
            nested: false,
        },
        action,
        change.replace_paths.matches(),
    ))
}

pub(super) fn compute_nested_set(
    change: Change,
    attributes: &BTreeMap<String, Attribute>,
) -> Result<ComputedDiff> {
    let (elements, action) = collect_set(&change, |child| {
        compute_diff_for_nested(child, attributes, NestingMode::Single)
    })?;
    Ok(ComputedDiff::new(
        Renderer::Set {
            elements,
            nested: true,
        },
        action,
        change.replace_paths.matches(),
    ))
}

/// Diffs every element of a set and folds the element actions.
pub(super) fn collect_set<F>(change: &Change, mut compute: F) -> Result<(Vec<ComputedDiff>, Action)>
where
    F: FnMut(Change) -> Result<ComputedDiff>,
{
    let mut current = change.default_action_for_iteration();
    let mut elements = Vec::new();
    process_set(change, |child| {
        let element = compute(child)?;
        current = compare_actions(current, element.action);
        elements.push(element);
        Ok(())
    })?;
    Ok((elements, current))
}

/// Pairs up equal elements of an unordered collection.
///
/// Every before element is matched against the first unclaimed after element
/// that is equal, equally sensitive and known. Unmatched before elements are
/// deleted, unmatched after elements are created. Sets have no positional
/// identity, so every element is treated as relevant.
pub(super) fn process_set<F>(change: &Change, mut process: F) -> Result<()>
where
    F: FnMut(Change) -> Result<()>,
{
    let slice = change.as_slice();
    let (before_len, after_len) = (slice.before_len(), slice.after_len());

    let mut found_in_before: Vec<Option<usize>> = vec![None; before_len];
    let mut claimed = vec![false; after_len];

    // O(n^2), but sets in plans are small.
    for (ix, found) in found_in_before.iter_mut().enumerate() {
        for jx in 0..after_len {
            if claimed[jx] {
                continue;
            }
            let child = slice.get_child(ix, jx)?;
            if child.before == child.after
                && child.is_before_sensitive() == child.is_after_sensitive()
                && !child.is_unknown()
            {
                *found = Some(jx);
                claimed[jx] = true;
                break;
            }
        }
    }

    let relevant = |mut child: Change| {
        child.relevant_attributes = Matcher::always();
        child
    };

    for (ix, found) in found_in_before.iter().enumerate() {
        let after_ix = found.unwrap_or(after_len);
        process(relevant(slice.get_child(ix, after_ix)?))?;
    }

    for (jx, _) in claimed.iter().enumerate().filter(|(_, claimed)| !**claimed) {
        process(relevant(slice.get_child(before_len, jx)?))?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use serde_json::json;

    fn change(before: serde_json::Value, after: serde_json::Value) -> Change {
        Change {
            before: Value::from(before),
            after: Value::from(after),
            ..Default::default()
        }
    }

    fn actions(diff: &ComputedDiff) -> Vec<Action> {
        match &diff.renderer {
            Renderer::Set { elements, .. } => elements.iter().map(|e| e.action).collect(),
            other => panic!("expected set renderer, got {other:?}"),
        }
    }

    #[test]
    fn test_set_element_swapped() {
        let diff = compute_set(change(json!(["a", "b"]), json!(["b", "c"])), &Type::String).unwrap();
        assert_eq!(diff.action, Action::Update);
        assert_eq!(actions(&diff), vec![Action::Delete, Action::NoOp, Action::Create]);
    }

    #[test]
    fn test_set_duplicates_claim_once() {
        let diff = compute_set(change(json!([1, 1]), json!([1])), &Type::Number).unwrap();
        assert_eq!(actions(&diff), vec![Action::NoOp, Action::Delete]);
    }

    #[test]
    fn test_set_unknown_element_not_matched() {
        let mut c = change(json!(["a"]), json!([null]));
        c.unknown = Value::from(json!([true]));
        let diff = compute_set(c, &Type::String).unwrap();
        assert_eq!(actions(&diff), vec![Action::Delete, Action::Create]);
    }

    #[test]
    fn test_set_children_always_relevant() {
        let mut c = change(json!(["a"]), json!(["a"]));
        c.relevant_attributes = Matcher::empty(true);
        let mut seen = Vec::new();
        process_set(&c, |child| {
            seen.push(child.relevant_attributes.clone());
            Ok(())
        })
        .unwrap();
        assert_eq!(seen, vec![Matcher::always()]);
    }
}
