//! Attribute path matching.
//!
//! Plans reference attributes by path (for example the attributes that force
//! a resource to be replaced). A [`Matcher`] answers whether the current
//! position in a value tree is on, or below, one of those paths. Matchers are
//! immutable: stepping into a child always returns a new matcher.
//!
//! # Examples
//!
//! ```
//! use plandiff_rs::path::Matcher;
//! use serde_json::json;
//!
//! let matcher = Matcher::parse(Some(&json!([["tags", "Name"]])), false).unwrap();
//! let child = matcher.child_with_key("tags").child_with_key("Name");
//! assert!(child.matches());
//! ```

use crate::error::{DiffError, Result};
use crate::value::Value;

/// Decides whether a position in a value tree is covered by a set of paths.
#[derive(Debug, Clone, PartialEq)]
pub enum Matcher {
    /// A set of paths relative to the current position.
    ///
    /// Segments are strings (object and map keys) or numbers (list indices).
    /// With `propagate` set, a path that has been fully consumed keeps
    /// matching every descendant.
    PathSet {
        paths: Vec<Vec<Value>>,
        propagate: bool,
    },
    /// Matches everything at every depth.
    Always,
}

impl Default for Matcher {
    fn default() -> Self {
        Matcher::Always
    }
}

impl Matcher {
    /// A path set with no paths: matches nothing.
    pub fn empty(propagate: bool) -> Self {
        Matcher::PathSet {
            paths: Vec::new(),
            propagate,
        }
    }

    pub fn always() -> Self {
        Matcher::Always
    }

    /// Builds a path set from a decoded array of arrays.
    ///
    /// `None` yields an empty set. Anything other than an array of arrays
    /// is rejected.
    pub fn parse(raw: Option<&serde_json::Value>, propagate: bool) -> Result<Self> {
        let Some(raw) = raw else {
            return Ok(Matcher::empty(propagate));
        };
        if raw.is_null() {
            return Ok(Matcher::empty(propagate));
        }

        let outer = raw
            .as_array()
            .ok_or_else(|| DiffError::attribute_paths(format!("expected an array, got {raw}")))?;

        let mut paths = Vec::with_capacity(outer.len());
        for path in outer {
            let segments = path.as_array().ok_or_else(|| {
                DiffError::attribute_paths(format!("expected a path array, got {path}"))
            })?;
            paths.push(segments.iter().cloned().map(Value::from).collect());
        }

        Ok(Matcher::PathSet { paths, propagate })
    }

    /// Adds a path to a path set. Has no effect on [`Matcher::Always`].
    pub fn add_path(&mut self, path: Vec<Value>) {
        if let Matcher::PathSet { paths, .. } = self {
            paths.push(path);
        }
    }

    /// True when some path ends exactly at the current position.
    pub fn matches(&self) -> bool {
        match self {
            Matcher::Always => true,
            Matcher::PathSet { paths, .. } => paths.iter().any(Vec::is_empty),
        }
    }

    /// True when the current position or one of its descendants may match.
    pub fn matches_partial(&self) -> bool {
        match self {
            Matcher::Always => true,
            Matcher::PathSet { paths, .. } => !paths.is_empty(),
        }
    }

    /// Scopes the matcher to the child reached through `key`.
    pub fn child_with_key(&self, key: &str) -> Matcher {
        self.child_with(|segment| Ok(segment.as_str() == Some(key)))
            .unwrap_or_else(|_| Matcher::empty(self.propagates()))
    }

    /// Scopes the matcher to the child reached through `index`.
    ///
    /// String segments that parse as numbers match too, so `foo["0"]`
    /// addresses the same element as `foo[0]`.
    pub fn child_with_index(&self, index: usize) -> Result<Matcher> {
        self.child_with(|segment| match segment {
            Value::Number(n) => Ok(*n as i64 == index as i64),
            Value::String(s) => s
                .parse::<f64>()
                .map(|n| n as i64 == index as i64)
                .map_err(|_| DiffError::invalid_path_segment(format!("{s:?}"))),
            other => Err(DiffError::invalid_path_segment(other.type_name())),
        })
    }

    fn propagates(&self) -> bool {
        match self {
            Matcher::Always => true,
            Matcher::PathSet { propagate, .. } => *propagate,
        }
    }

    fn child_with<F>(&self, mut step: F) -> Result<Matcher>
    where
        F: FnMut(&Value) -> Result<bool>,
    {
        let (paths, propagate) = match self {
            Matcher::Always => return Ok(Matcher::Always),
            Matcher::PathSet { paths, propagate } => (paths, *propagate),
        };

        let mut child = Vec::new();
        for path in paths {
            let Some((first, rest)) = path.split_first() else {
                // Fully consumed here; only survives below when propagating.
                if propagate {
                    child.push(Vec::new());
                }
                continue;
            };
            if step(first)? {
                child.push(rest.to_vec());
            }
        }

        Ok(Matcher::PathSet {
            paths: child,
            propagate,
        })
    }
}
