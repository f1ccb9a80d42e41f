use super::set::collect_set;
use super::{
    all_unknown, compute_diff_for_attribute, gate_relevance, is_absent_no_op, process_unknown,
    process_unknown_with_before,
};
use crate::change::Change;
use crate::collections::{compare_actions, transform_map, transform_slice};
use crate::computed::{Action, Blocks, ComputedDiff, Renderer};
use crate::error::Result;
use crate::path::Matcher;
use crate::schema::{Block, NestingMode};
use crate::value::Value;
use std::collections::BTreeMap;

/// Diffs a value against a block schema.
///
/// Attributes and nested blocks that are absent on both sides and unchanged
/// produce no entry at all.
pub fn compute_diff_for_block(change: Change, block: &Block) -> Result<ComputedDiff> {
    let replace = change.replace_paths.matches();
    if let Some(diff) = change.check_for_sensitive(
        |value| compute_diff_for_block(value, block),
        |inner, before, after, action| {
            ComputedDiff::new(Renderer::sensitive_block(inner, before, after), action, replace)
        },
    )? {
        return Ok(diff);
    }

    if let Some(diff) = change.check_for_unknown(
        all_unknown(block.attributes.keys()),
        process_unknown,
        |current, before| process_unknown_with_before(current, compute_diff_for_block(before, block)?),
    )? {
        return Ok(diff);
    }

    let mut current = change.default_action_for_iteration();
    let map = change.as_map();

    let mut attributes = BTreeMap::new();
    for (key, attribute) in &block.attributes {
        let mut child = gate_relevance(map.get_child(key));

        // The SDK cannot tell an empty string from null inside blocks.
        if child.before.as_str() == Some("") {
            child.before = Value::Null;
        }
        if child.after.as_str() == Some("") {
            child.after = Value::Null;
        }
        child.before_explicit = false;
        child.after_explicit = false;

        let diff = compute_diff_for_attribute(child.clone(), attribute)?;
        if is_absent_no_op(&diff, &child) {
            continue;
        }
        current = compare_actions(current, diff.action);
        attributes.insert(key.clone(), diff);
    }

    let mut blocks = Blocks::new();
    for (key, block_type) in &block.block_types {
        let child = gate_relevance(map.get_child(key));

        let before_sensitive = child.is_before_sensitive();
        let after_sensitive = child.is_after_sensitive();
        let forces_replacement = child.replace_paths.matches();
        let absent = child.before.is_null() && child.after.is_null();

        let action = match NestingMode::parse(&block_type.nesting_mode)? {
            NestingMode::Set => {
                let (diffs, action) = collect_set(&child, |value| compute_diff_for_block(value, &block_type.block))?;
                if action == Action::NoOp && absent {
                    continue;
                }
                blocks.add_all_set_blocks(key, diffs, forces_replacement, before_sensitive, after_sensitive);
                action
            }
            NestingMode::List => {
                let (diffs, action) = compute_list_blocks(&child, &block_type.block)?;
                if action == Action::NoOp && absent {
                    continue;
                }
                blocks.add_all_list_blocks(key, diffs, forces_replacement, before_sensitive, after_sensitive);
                action
            }
            NestingMode::Map => {
                let (diffs, action) = compute_map_blocks(&child, &block_type.block)?;
                if action == Action::NoOp && absent {
                    continue;
                }
                blocks.add_all_map_blocks(key, diffs, forces_replacement, before_sensitive, after_sensitive);
                action
            }
            NestingMode::Single | NestingMode::Group => {
                let diff = compute_diff_for_block(child, &block_type.block)?;
                if diff.action == Action::NoOp && absent {
                    continue;
                }
                let action = diff.action;
                blocks.add_single_block(key, diff, forces_replacement, before_sensitive, after_sensitive);
                action
            }
        };
        current = compare_actions(current, action);
    }

    Ok(ComputedDiff::new(
        Renderer::Block { attributes, blocks },
        current,
        replace,
    ))
}

/// Nested blocks are objects, so unmatched neighbours are paired up.
fn compute_list_blocks(change: &Change, block: &Block) -> Result<(Vec<ComputedDiff>, Action)> {
    let slice = change.as_slice();
    transform_slice(
        slice.before.as_deref(),
        slice.after.as_deref(),
        |before_ix, after_ix| {
            let mut child = slice.get_child(before_ix, after_ix)?;
            child.relevant_attributes = Matcher::always();
            compute_diff_for_block(child, block)
        },
        |_: &Value| true,
    )
}

fn compute_map_blocks(
    change: &Change,
    block: &Block,
) -> Result<(BTreeMap<String, ComputedDiff>, Action)> {
    let map = change.as_map();
    transform_map(
        map.before.is_some(),
        map.after.is_some(),
        &map.all_keys(),
        |key| compute_diff_for_block(gate_relevance(map.get_child(key)), block),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn block(schema: serde_json::Value) -> Block {
        serde_json::from_value(schema).unwrap()
    }

    fn change(before: serde_json::Value, after: serde_json::Value) -> Change {
        Change {
            before: Value::from(before),
            after: Value::from(after),
            ..Default::default()
        }
    }

    #[test]
    fn test_empty_string_is_null() {
        let schema = block(json!({"attributes": {"name": {"type": "string"}}}));
        let diff = compute_diff_for_block(change(json!({"name": ""}), json!({"name": null})), &schema).unwrap();
        assert_eq!(diff.action, Action::NoOp);
        let Renderer::Block { attributes, .. } = &diff.renderer else {
            panic!("expected block renderer");
        };
        assert!(attributes.is_empty());
    }

    #[test]
    fn test_absent_attributes_are_skipped() {
        let schema = block(json!({"attributes": {
            "id": {"type": "string"},
            "name": {"type": "string"}
        }}));
        let diff = compute_diff_for_block(change(json!({"id": "1"}), json!({"id": "2"})), &schema).unwrap();
        let Renderer::Block { attributes, .. } = &diff.renderer else {
            panic!("expected block renderer");
        };
        assert_eq!(attributes.keys().collect::<Vec<_>>(), vec!["id"]);
        assert_eq!(diff.action, Action::Update);
    }

    #[test]
    fn test_list_blocks() {
        let schema = block(json!({"block_types": {"rule": {
            "nesting_mode": "list",
            "block": {"attributes": {"port": {"type": "number"}}}
        }}}));
        let diff = compute_diff_for_block(
            change(json!({"rule": [{"port": 80}]}), json!({"rule": [{"port": 80}, {"port": 443}]})),
            &schema,
        )
        .unwrap();
        assert_eq!(diff.action, Action::Update);
        let Renderer::Block { blocks, .. } = &diff.renderer else {
            panic!("expected block renderer");
        };
        let actions: Vec<Action> = blocks.list_blocks["rule"].iter().map(|d| d.action).collect();
        assert_eq!(actions, vec![Action::NoOp, Action::Create]);
    }

    #[test]
    fn test_sensitive_block_group_metadata() {
        let schema = block(json!({"block_types": {"secret": {
            "nesting_mode": "list",
            "block": {"attributes": {"value": {"type": "string"}}}
        }}}));
        let mut c = change(json!({"secret": [{"value": "a"}]}), json!({"secret": [{"value": "a"}]}));
        c.after_sensitive = Value::from(json!({"secret": true}));
        let diff = compute_diff_for_block(c, &schema).unwrap();
        let Renderer::Block { blocks, .. } = &diff.renderer else {
            panic!("expected block renderer");
        };
        assert!(blocks.is_after_sensitive("secret"));
        assert!(!blocks.is_before_sensitive("secret"));
    }

    #[test]
    fn test_single_block_sensitive() {
        let schema = block(json!({"block_types": {"auth": {
            "nesting_mode": "single",
            "block": {"attributes": {"token": {"type": "string"}}}
        }}}));
        let mut c = change(json!({"auth": {"token": "a"}}), json!({"auth": {"token": "b"}}));
        c.before_sensitive = Value::from(json!({"auth": true}));
        c.after_sensitive = Value::from(json!({"auth": true}));
        let diff = compute_diff_for_block(c, &schema).unwrap();
        let Renderer::Block { blocks, .. } = &diff.renderer else {
            panic!("expected block renderer");
        };
        assert!(matches!(blocks.single_blocks["auth"].renderer, Renderer::SensitiveBlock { .. }));
        assert_eq!(blocks.single_blocks["auth"].action, Action::Update);
    }

    #[test]
    fn test_unknown_nesting_mode() {
        let schema = block(json!({"block_types": {"x": {"nesting_mode": "bag", "block": {}}}}));
        assert!(compute_diff_for_block(change(json!({}), json!({})), &schema).is_err());
    }

    #[test]
    fn test_irrelevant_attribute_is_unchanged() {
        let schema = block(json!({"attributes": {
            "a": {"type": "string"},
            "b": {"type": "string"}
        }}));
        let mut c = change(json!({"a": "1", "b": "1"}), json!({"a": "2", "b": "2"}));
        c.relevant_attributes = Matcher::parse(Some(&json!([["a"]])), true).unwrap();
        let diff = compute_diff_for_block(c, &schema).unwrap();
        let Renderer::Block { attributes, .. } = &diff.renderer else {
            panic!("expected block renderer");
        };
        assert_eq!(attributes["a"].action, Action::Update);
        assert_eq!(attributes["b"].action, Action::NoOp);
    }
}
