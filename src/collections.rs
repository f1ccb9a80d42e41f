//! Generic reconciliation of maps and sequences.
//!
//! These helpers fold child diffs into a parent action and align ordered
//! collections with a longest common subsequence, so that an insertion in
//! the middle of a list shows up as one created element instead of a cascade
//! of updates.
//!
//! # Examples
//!
//! ```
//! use plandiff_rs::collections::longest_common_subsequence;
//!
//! let lcs = longest_common_subsequence(&[1, 2, 3, 4], &[2, 4, 5], |a, b| a == b);
//! assert_eq!(lcs, vec![2, 4]);
//! ```

use crate::computed::{Action, ComputedDiff};
use crate::error::Result;
use std::collections::BTreeMap;

/// Folds a child action into the parent's current action.
///
/// A no-op child never changes the parent. Any other child that disagrees
/// with the current action turns the parent into an update.
pub fn compare_actions(current: Action, next: Action) -> Action {
    if next == Action::NoOp {
        return current;
    }
    if current != next {
        return Action::Update;
    }
    current
}

fn initial_action(before_present: bool, after_present: bool) -> Action {
    match (before_present, after_present) {
        (true, false) => Action::Delete,
        (false, true) => Action::Create,
        _ => Action::NoOp,
    }
}

/// Diffs every key in `keys` and folds the results into one action.
///
/// # Arguments
///
/// * `before_present` / `after_present` - Whether each side is a map at all
/// * `keys` - Keys to visit, in the order they should be processed
/// * `process` - Produces the diff for one key
pub fn transform_map<F>(
    before_present: bool,
    after_present: bool,
    keys: &[String],
    mut process: F,
) -> Result<(BTreeMap<String, ComputedDiff>, Action)>
where
    F: FnMut(&str) -> Result<ComputedDiff>,
{
    let mut current = initial_action(before_present, after_present);
    let mut elements = BTreeMap::new();
    for key in keys {
        let element = process(key)?;
        current = compare_actions(current, element.action);
        elements.insert(key.clone(), element);
    }
    Ok((elements, current))
}

/// Aligns `before` and `after` and diffs each aligned pair.
///
/// `process` receives a before index and an after index; an index equal to
/// the length of its side means "no element there". Objects that fall in the
/// same gap between common elements are paired up instead of being shown as
/// a delete and a create.
pub fn transform_slice<T, P, O>(
    before: Option<&[T]>,
    after: Option<&[T]>,
    mut process: P,
    is_obj_type: O,
) -> Result<(Vec<ComputedDiff>, Action)>
where
    T: PartialEq + Clone,
    P: FnMut(usize, usize) -> Result<ComputedDiff>,
    O: Fn(&T) -> bool,
{
    let mut current = initial_action(before.is_some(), after.is_some());
    let mut elements = Vec::new();
    process_slice(
        before.unwrap_or(&[]),
        after.unwrap_or(&[]),
        |before_ix, after_ix| {
            let element = process(before_ix, after_ix)?;
            current = compare_actions(current, element.action);
            elements.push(element);
            Ok(())
        },
        is_obj_type,
    )?;
    Ok((elements, current))
}

/// Walks two sequences in LCS order, calling `process` once per visited pair.
///
/// Each gap between common elements is handled in three steps: remaining
/// before elements are deleted (or paired with an after object), remaining
/// after elements are created, then the common element is kept.
pub fn process_slice<T, P, O>(before: &[T], after: &[T], mut process: P, is_obj_type: O) -> Result<()>
where
    T: PartialEq + Clone,
    P: FnMut(usize, usize) -> Result<()>,
    O: Fn(&T) -> bool,
{
    let lcs = longest_common_subsequence(before, after, |a, b| a == b);

    let (mut before_ix, mut after_ix, mut lcs_ix) = (0, 0, 0);
    while before_ix < before.len() || after_ix < after.len() || lcs_ix < lcs.len() {
        while before_ix < before.len() && lcs.get(lcs_ix) != Some(&before[before_ix]) {
            let pair_objects = is_obj_type(&before[before_ix])
                && after_ix < after.len()
                && is_obj_type(&after[after_ix])
                && lcs.get(lcs_ix) != Some(&after[after_ix]);
            if pair_objects {
                process(before_ix, after_ix)?;
                before_ix += 1;
                after_ix += 1;
                continue;
            }

            process(before_ix, after.len())?;
            before_ix += 1;
        }

        while after_ix < after.len() && lcs.get(lcs_ix) != Some(&after[after_ix]) {
            process(before.len(), after_ix)?;
            after_ix += 1;
        }

        if lcs_ix < lcs.len() {
            process(before_ix, after_ix)?;
            before_ix += 1;
            after_ix += 1;
            lcs_ix += 1;
        }
    }
    Ok(())
}

/// Finds one longest common subsequence of `xs` and `ys`.
///
/// Uses the classic dynamic-programming table. When several subsequences of
/// maximal length exist, which one is returned is unspecified.
pub fn longest_common_subsequence<T, F>(xs: &[T], ys: &[T], equals: F) -> Vec<T>
where
    T: Clone,
    F: Fn(&T, &T) -> bool,
{
    if xs.is_empty() || ys.is_empty() {
        return Vec::new();
    }

    let w = xs.len();
    let mut table = vec![0usize; xs.len() * ys.len()];
    let mut eqs = vec![false; xs.len() * ys.len()];

    for y in 0..ys.len() {
        for x in 0..xs.len() {
            let eq = equals(&xs[x], &ys[y]);
            eqs[w * y + x] = eq;
            table[w * y + x] = if eq {
                if x > 0 && y > 0 {
                    table[w * (y - 1) + (x - 1)] + 1
                } else {
                    1
                }
            } else {
                let l = if x > 0 { table[w * y + (x - 1)] } else { 0 };
                let u = if y > 0 { table[w * (y - 1) + x] } else { 0 };
                l.max(u)
            };
        }
    }

    let mut ret = Vec::with_capacity(table[table.len() - 1]);
    let (mut x, mut y) = (xs.len() as isize - 1, ys.len() as isize - 1);
    while x >= 0 && y >= 0 {
        let (ux, uy) = (x as usize, y as usize);
        if eqs[w * uy + ux] {
            ret.push(xs[ux].clone());
            x -= 1;
            y -= 1;
        } else {
            let l = if ux > 0 { table[w * uy + (ux - 1)] } else { 0 };
            let u = if uy > 0 { table[w * (uy - 1) + ux] } else { 0 };
            if l > u {
                x -= 1;
            } else {
                y -= 1;
            }
        }
    }
    ret.reverse();
    ret
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::computed::Renderer;
    use crate::schema::Type;
    use crate::value::Value;
    use proptest::prelude::*;

    fn leaf(action: Action) -> ComputedDiff {
        ComputedDiff::new(
            Renderer::primitive(Value::Null, Value::Null, Type::String),
            action,
            false,
        )
    }

    fn pairs<T: PartialEq + Clone>(before: &[T], after: &[T], obj: impl Fn(&T) -> bool) -> Vec<(usize, usize)> {
        let mut visited = Vec::new();
        process_slice(
            before,
            after,
            |b, a| {
                visited.push((b, a));
                Ok(())
            },
            obj,
        )
        .unwrap();
        visited
    }

    fn is_subsequence(sub: &[u8], of: &[u8]) -> bool {
        let mut it = of.iter();
        sub.iter().all(|s| it.any(|o| o == s))
    }

    fn brute_force_lcs_len(xs: &[u8], ys: &[u8]) -> usize {
        match (xs.split_first(), ys.split_first()) {
            (Some((x, xr)), Some((y, yr))) => {
                if x == y {
                    1 + brute_force_lcs_len(xr, yr)
                } else {
                    brute_force_lcs_len(xr, ys).max(brute_force_lcs_len(xs, yr))
                }
            }
            _ => 0,
        }
    }

    #[test]
    fn test_compare_actions() {
        assert_eq!(compare_actions(Action::Create, Action::NoOp), Action::Create);
        assert_eq!(compare_actions(Action::NoOp, Action::Create), Action::Update);
        assert_eq!(compare_actions(Action::Delete, Action::Delete), Action::Delete);
        assert_eq!(compare_actions(Action::Create, Action::Delete), Action::Update);
    }

    #[test]
    fn test_lcs_empty_input() {
        assert!(longest_common_subsequence::<u8, _>(&[], &[1, 2], |a, b| a == b).is_empty());
        assert!(longest_common_subsequence::<u8, _>(&[1], &[], |a, b| a == b).is_empty());
    }

    #[test]
    fn test_process_slice_insert_in_middle() {
        let visited = pairs(&[1, 2, 3], &[1, 9, 2, 3], |_| false);
        assert_eq!(visited, vec![(0, 0), (3, 1), (1, 2), (2, 3)]);
    }

    #[test]
    fn test_process_slice_delete_then_create() {
        let visited = pairs(&[1, 2], &[3], |_| false);
        assert_eq!(visited, vec![(0, 1), (1, 1), (2, 0)]);
    }

    #[test]
    fn test_process_slice_pairs_objects() {
        // 'o' stands in for an object value.
        let visited = pairs(&['o', 'a'], &['p', 'a'], |c| *c == 'o' || *c == 'p');
        assert_eq!(visited, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_process_slice_pairs_first_available() {
        let visited = pairs(&['o', 'q'], &['p'], |_| true);
        assert_eq!(visited, vec![(0, 0), (1, 1)]);
    }

    #[test]
    fn test_transform_map_folds_actions() {
        let keys = vec!["a".to_string(), "b".to_string()];
        let (elements, action) = transform_map(true, true, &keys, |key| {
            Ok(leaf(if key == "a" { Action::NoOp } else { Action::Create }))
        })
        .unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(action, Action::Update);

        let (_, action) = transform_map(false, true, &keys, |_| Ok(leaf(Action::Create))).unwrap();
        assert_eq!(action, Action::Create);
    }

    #[test]
    fn test_transform_slice_all_deleted() {
        let before = vec![Value::from("a"), Value::from("b")];
        let (elements, action) = transform_slice(
            Some(before.as_slice()),
            None,
            |_, _| Ok(leaf(Action::Delete)),
            |_| false,
        )
        .unwrap();
        assert_eq!(elements.len(), 2);
        assert_eq!(action, Action::Delete);
    }

    proptest! {
        #[test]
        fn prop_lcs_is_maximal_common_subsequence(
            xs in prop::collection::vec(0u8..4, 0..7),
            ys in prop::collection::vec(0u8..4, 0..7),
        ) {
            let lcs = longest_common_subsequence(&xs, &ys, |a, b| a == b);
            prop_assert!(is_subsequence(&lcs, &xs));
            prop_assert!(is_subsequence(&lcs, &ys));
            prop_assert_eq!(lcs.len(), brute_force_lcs_len(&xs, &ys));
        }

        #[test]
        fn prop_process_slice_reconstructs_both_sides(
            xs in prop::collection::vec(0u8..4, 0..7),
            ys in prop::collection::vec(0u8..4, 0..7),
            pair_evens in any::<bool>(),
        ) {
            let visited = pairs(&xs, &ys, |v| pair_evens && v % 2 == 0);
            let rebuilt_before: Vec<u8> = visited.iter().filter(|(b, _)| *b < xs.len()).map(|(b, _)| xs[*b]).collect();
            let rebuilt_after: Vec<u8> = visited.iter().filter(|(_, a)| *a < ys.len()).map(|(_, a)| ys[*a]).collect();
            prop_assert_eq!(rebuilt_before, xs.clone());
            prop_assert_eq!(rebuilt_after, ys.clone());

            let lcs = longest_common_subsequence(&xs, &ys, |a, b| a == b);
            if !pair_evens {
                prop_assert_eq!(visited.len(), xs.len() + ys.len() - lcs.len());
            }
        }
    }
}
