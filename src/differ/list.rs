use super::{compute_diff_for_nested, compute_diff_for_type, gate_relevance};
use crate::change::Change;
use crate::collections::{compare_actions, transform_slice};
use crate::computed::{ComputedDiff, Renderer};
use crate::error::Result;
use crate::path::Matcher;
use crate::schema::{Attribute, NestingMode, Type};
use crate::value::Value;
use std::collections::BTreeMap;

/// Lists are aligned with an LCS. Relevance is not tracked per element, so
/// every element of a list is relevant.
pub(super) fn compute_list(change: Change, element: &Type) -> Result<ComputedDiff> {
    let slice = change.as_slice();
    let (elements, action) = transform_slice(
        slice.before.as_deref(),
        slice.after.as_deref(),
        |before_ix, after_ix| {
            let mut child = slice.get_child(before_ix, after_ix)?;
            child.relevant_attributes = Matcher::always();
            compute_diff_for_type(child, element)
        },
        |_: &Value| element.is_object(),
    )?;
    Ok(ComputedDiff::new(
        Renderer::List {
            elements,
            nested: false,
        },
        action,
        change.replace_paths.matches(),
    ))
}

/// Nested-attribute lists compare index against index.
pub(super) fn compute_nested_list(
    change: Change,
    attributes: &BTreeMap<String, Attribute>,
) -> Result<ComputedDiff> {
    let slice = change.as_slice();
    let mut current = change.default_action_for_iteration();
    let mut elements = Vec::new();

    for ix in 0..slice.before_len().max(slice.after_len()) {
        let child = gate_relevance(slice.get_child(ix, ix)?);
        let element = compute_diff_for_nested(child, attributes, NestingMode::Single)?;
        current = compare_actions(current, element.action);
        elements.push(element);
    }

    Ok(ComputedDiff::new(
        Renderer::List {
            elements,
            nested: true,
        },
        current,
        change.replace_paths.matches(),
    ))
}

pub(super) fn compute_tuple(change: Change, element_types: &[Type]) -> Result<ComputedDiff> {
    let slice = change.as_slice();
    let mut current = change.default_action_for_iteration();
    let mut elements = Vec::with_capacity(element_types.len());

    for (ix, element_type) in element_types.iter().enumerate() {
        let child = gate_relevance(slice.get_child(ix, ix)?);
        let element = compute_diff_for_type(child, element_type)?;
        current = compare_actions(current, element.action);
        elements.push(element);
    }

    Ok(ComputedDiff::new(
        Renderer::List {
            elements,
            nested: false,
        },
        current,
        change.replace_paths.matches(),
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computed::Action;
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
            Renderer::List { elements, .. } => elements.iter().map(|e| e.action).collect(),
            other => panic!("expected list renderer, got {other:?}"),
        }
    }

    #[test]
    fn test_list_insert_in_middle() {
        let diff = compute_list(change(json!(["a", "c"]), json!(["a", "b", "c"])), &Type::String).unwrap();
        assert_eq!(diff.action, Action::Update);
        assert_eq!(actions(&diff), vec![Action::NoOp, Action::Create, Action::NoOp]);
    }

    #[test]
    fn test_list_of_objects_pairs_changes() {
        let element = Type::parse(&json!(["object", {"name": "string"}])).unwrap();
        let diff = compute_list(
            change(json!([{"name": "a"}]), json!([{"name": "b"}])),
            &element,
        )
        .unwrap();
        assert_eq!(actions(&diff), vec![Action::Update]);
    }

    #[test]
    fn test_list_of_strings_does_not_pair() {
        let diff = compute_list(change(json!(["a"]), json!(["b"])), &Type::String).unwrap();
        assert_eq!(actions(&diff), vec![Action::Delete, Action::Create]);
    }

    #[test]
    fn test_list_created() {
        let diff = compute_list(change(json!(null), json!(["a"])), &Type::String).unwrap();
        assert_eq!(diff.action, Action::Create);
    }

    #[test]
    fn test_tuple_is_positional() {
        let diff = compute_tuple(
            change(json!(["a", 1]), json!(["a", 2])),
            &[Type::String, Type::Number],
        )
        .unwrap();
        assert_eq!(diff.action, Action::Update);
        assert_eq!(actions(&diff), vec![Action::NoOp, Action::Update]);
    }

    #[test]
    fn test_nested_list_is_positional() {
        let attributes: BTreeMap<String, Attribute> =
            serde_json::from_value(json!({"name": {"type": "string"}})).unwrap();
        let diff = compute_nested_list(
            change(json!([{"name": "a"}, {"name": "b"}]), json!([{"name": "b"}])),
            &attributes,
        )
        .unwrap();
        assert_eq!(actions(&diff), vec![Action::Update, Action::Delete]);
    }
}
