//! Diffing of untyped JSON values.
//!
//! Used for outputs, dynamic attributes and strings that embed JSON. Without
//! a schema the shape is read from the values themselves, so a value whose
//! JSON kind changes is shown as a delete of the old value next to a create
//! of the new one.

use crate::change::{Change, ChangeMap, ChangeSlice};
use crate::collections::{transform_map, transform_slice};
use crate::computed::{Action, ComputedDiff, Renderer};
use crate::error::Result;
use crate::path::Matcher;
use crate::schema::Type;
use crate::value::{JsonType, Value};

/// Diffs an untyped change.
pub fn transform(change: Change) -> Result<ComputedDiff> {
    if let Some(diff) = change.check_for_sensitive(transform, |inner, before, after, action| {
        ComputedDiff::new(Renderer::sensitive(inner, before, after), action, false)
    })? {
        return Ok(diff);
    }

    if let Some(diff) = change.check_for_unknown(
        Value::Bool(false),
        |_| Ok(ComputedDiff::new(Renderer::unknown(None), Action::Create, false)),
        |_, before| {
            Ok(ComputedDiff::new(
                Renderer::unknown(Some(transform(before)?)),
                Action::Update,
                false,
            ))
        },
    )? {
        return Ok(diff);
    }

    let before_type = change.before.json_type();
    let after_type = change.after.json_type();

    let deleted = after_type == JsonType::Null && !change.after_explicit;
    let created = before_type == JsonType::Null && !change.before_explicit;

    if before_type == after_type || created || deleted {
        let target = if before_type == JsonType::Null {
            after_type
        } else {
            before_type
        };
        return process_update(change, target);
    }

    let before = process_update(change.as_delete(), before_type)?;
    let after = process_update(change.as_create(), after_type)?;
    Ok(ComputedDiff::new(
        Renderer::type_change(before, after),
        Action::Update,
        false,
    ))
}

fn process_update(change: Change, target: JsonType) -> Result<ComputedDiff> {
    match target {
        JsonType::Null => Ok(process_primitive(change, Type::Nil)),
        JsonType::Bool => Ok(process_primitive(change, Type::Bool)),
        JsonType::String => Ok(process_primitive(change, Type::String)),
        JsonType::Number => Ok(process_primitive(change, Type::Number)),
        JsonType::Object => process_object(change.as_map()),
        JsonType::Array => process_array(change.as_slice()),
    }
}

/// Unlike typed primitives, sensitivity plays no part in the action here.
fn process_primitive(change: Change, ctype: Type) -> ComputedDiff {
    let before_missing = change.before.is_null() && !change.before_explicit;
    let after_missing = change.after.is_null() && !change.after_explicit;

    let action = if before_missing && !after_missing {
        Action::Create
    } else if !before_missing && after_missing {
        Action::Delete
    } else if change.before == change.after {
        Action::NoOp
    } else {
        Action::Update
    };

    ComputedDiff::new(Renderer::primitive(change.before, change.after, ctype), action, false)
}

fn process_array(slice: ChangeSlice) -> Result<ComputedDiff> {
    let (elements, action) = transform_slice(
        slice.before.as_deref(),
        slice.after.as_deref(),
        |before_ix, after_ix| {
            let mut child = slice.get_child(before_ix, after_ix)?;
            child.relevant_attributes = Matcher::always();
            transform(child)
        },
        |value: &Value| value.json_type() == JsonType::Object,
    )?;
    Ok(ComputedDiff::new(
        Renderer::List {
            elements,
            nested: false,
        },
        action,
        false,
    ))
}

fn process_object(map: ChangeMap) -> Result<ComputedDiff> {
    let (attributes, action) = transform_map(
        map.before.is_some(),
        map.after.is_some(),
        &map.all_keys(),
        |key| {
            let child = map.get_child(key);
            if child.relevant_attributes.matches_partial() {
                transform(child)
            } else {
                transform(child.as_no_op())
            }
        },
    )?;
    Ok(ComputedDiff::new(
        Renderer::Object {
            attributes,
            nested: false,
        },
        action,
        false,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn change(before: serde_json::Value, after: serde_json::Value) -> Change {
        Change {
            before: Value::from(before),
            after: Value::from(after),
            ..Default::default()
        }
    }

    #[test]
    fn test_type_change() {
        let diff = transform(change(json!("1"), json!(1))).unwrap();
        assert_eq!(diff.action, Action::Update);
        let Renderer::TypeChange { before, after } = &diff.renderer else {
            panic!("expected type change");
        };
        assert_eq!(before.action, Action::Delete);
        assert_eq!(after.action, Action::Create);
    }

    #[test]
    fn test_nested_object_update() {
        let diff = transform(change(json!({"a": {"b": 1}}), json!({"a": {"b": 2}}))).unwrap();
        assert_eq!(diff.action, Action::Update);
        let Renderer::Object { attributes, .. } = &diff.renderer else {
            panic!("expected object");
        };
        assert_eq!(attributes["a"].action, Action::Update);
    }

    #[test]
    fn test_array_append() {
        let diff = transform(change(json!([1]), json!([1, 2]))).unwrap();
        let Renderer::List { elements, .. } = &diff.renderer else {
            panic!("expected list");
        };
        let actions: Vec<Action> = elements.iter().map(|e| e.action).collect();
        assert_eq!(actions, vec![Action::NoOp, Action::Create]);
    }

    #[test]
    fn test_created_value() {
        let diff = transform(change(json!(null), json!({"a": true}))).unwrap();
        assert_eq!(diff.action, Action::Create);
    }

    #[test]
    fn test_explicit_null_to_value_is_type_change() {
        let mut c = change(json!(null), json!("x"));
        c.before_explicit = true;
        let diff = transform(c).unwrap();
        assert!(matches!(diff.renderer, Renderer::TypeChange { .. }));
    }

    #[test]
    fn test_unknown_output() {
        let mut c = change(json!(null), json!(null));
        c.unknown = Value::Bool(true);
        let diff = transform(c).unwrap();
        assert_eq!(diff.action, Action::Create);
        assert_eq!(diff.renderer, Renderer::unknown(None));
    }

    #[test]
    fn test_unchanged_is_no_op() {
        let value = json!({"list": [1, {"x": "y"}], "s": "t"});
        assert_eq!(transform(change(value.clone(), value)).unwrap().action, Action::NoOp);
    }
}
