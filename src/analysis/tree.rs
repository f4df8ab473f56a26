//! Typed confusion-matrix trees.
//!
//! Per-document trees arrive as loosely shaped JSON. Each field node is
//! classified once, here, by the keys it carries:
//!
//! - count keys directly on the node: [`FieldNode::Flat`]
//! - `overall` plus `fields`: [`FieldNode::Hierarchical`] (object-valued fields)
//! - `overall` plus `nested_fields`: [`FieldNode::ListAggregated`] (lists of objects)
//!
//! A node carrying keys of more than one shape becomes [`FieldNode::Mixed`]
//! and every part contributes. Parsing never aborts a document: a malformed
//! sub-tree is dropped and reported as a [`NodeIssue`] while its siblings
//! are still read.

use crate::analysis::resolver::join_path;
use crate::models::{Counts, COUNT_KEYS};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::trace;

/// Child field nodes keyed by field name.
pub type FieldMap = BTreeMap<String, FieldNode>;

/// Why a node (or one of its keys) could not be used.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NodeError {
    #[error("expected an object, found {found}")]
    NotAnObject { found: &'static str },

    #[error("`{key}` must be an object, found {found}")]
    KeyNotAnObject {
        key: &'static str,
        found: &'static str,
    },
}

/// A malformed sub-tree that was skipped during parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeIssue {
    /// Flattened path of the offending node, `None` at document level.
    pub path: Option<String>,
    pub error: NodeError,
}

/// One per-field node of a confusion-matrix tree.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldNode {
    /// Counts directly on the node.
    Flat(Counts),
    /// Object-valued field: optional roll-up plus recursive children.
    Hierarchical {
        overall: Option<Counts>,
        fields: FieldMap,
    },
    /// List-of-objects field: optional roll-up plus pre-summed child counts.
    ListAggregated {
        overall: Option<Counts>,
        nested_fields: BTreeMap<String, Counts>,
    },
    /// Keys of several shapes on one node; parts are applied additively.
    Mixed(Vec<FieldNode>),
}

impl FieldNode {
    /// Parse a field node located at `path`.
    ///
    /// Returns `Ok(None)` for an object carrying nothing usable. Problems in
    /// sub-trees are pushed onto `issues`; only a non-object node is an error.
    pub fn parse(
        value: &Value,
        path: &str,
        issues: &mut Vec<NodeIssue>,
    ) -> Result<Option<Self>, NodeError> {
        let map = value.as_object().ok_or(NodeError::NotAnObject {
            found: value_kind(value),
        })?;

        let flat = has_count_keys(map).then(|| read_counts(map));
        let mut overall = object_key(map, "overall", Some(path), issues).map(read_counts);
        let fields = object_key(map, "fields", Some(path), issues)
            .map(|f| parse_field_map(f, Some(path), issues));
        let nested = object_key(map, "nested_fields", Some(path), issues)
            .map(|n| parse_nested_fields(n, path, issues));

        let mut parts = Vec::new();

        if let Some(counts) = flat {
            parts.push(FieldNode::Flat(counts));
        }

        // `overall` is attached to exactly one part so it is counted once.
        if let Some(fields) = fields {
            parts.push(FieldNode::Hierarchical {
                overall: overall.take(),
                fields,
            });
        }

        if let Some(nested_fields) = nested {
            parts.push(FieldNode::ListAggregated {
                overall: overall.take(),
                nested_fields,
            });
        }

        if overall.is_some() {
            parts.push(FieldNode::Hierarchical {
                overall,
                fields: FieldMap::new(),
            });
        }

        Ok(match parts.len() {
            0 => None,
            1 => parts.pop(),
            _ => Some(FieldNode::Mixed(parts)),
        })
    }
}

/// A per-document confusion-matrix tree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfusionMatrix {
    /// Document-level totals.
    pub overall: Option<Counts>,
    /// Top-level field nodes.
    pub fields: FieldMap,
}

impl ConfusionMatrix {
    /// Parse a document tree, collecting skipped sub-trees as issues.
    pub fn parse(value: &Value) -> Result<(Self, Vec<NodeIssue>), NodeError> {
        let map = value.as_object().ok_or(NodeError::NotAnObject {
            found: value_kind(value),
        })?;

        let mut issues = Vec::new();
        let overall = object_key(map, "overall", None, &mut issues).map(read_counts);
        let fields = object_key(map, "fields", None, &mut issues)
            .map(|f| parse_field_map(f, None, &mut issues))
            .unwrap_or_default();

        Ok((Self { overall, fields }, issues))
    }
}

/// Parse every entry of a `fields` mapping, skipping unusable nodes.
fn parse_field_map(
    map: &Map<String, Value>,
    prefix: Option<&str>,
    issues: &mut Vec<NodeIssue>,
) -> FieldMap {
    let mut fields = FieldMap::new();

    for (name, value) in map {
        let path = join_path(prefix, name);

        match FieldNode::parse(value, &path, issues) {
            Ok(Some(node)) => {
                fields.insert(name.clone(), node);
            }
            Ok(None) => trace!("Skipping field without usable keys: {}", path),
            Err(error) => issues.push(NodeIssue {
                path: Some(path),
                error,
            }),
        }
    }

    fields
}

/// Parse a one-level `nested_fields` mapping of flat count records.
fn parse_nested_fields(
    map: &Map<String, Value>,
    parent: &str,
    issues: &mut Vec<NodeIssue>,
) -> BTreeMap<String, Counts> {
    let mut nested = BTreeMap::new();

    for (name, value) in map {
        match value.as_object() {
            Some(child) => {
                nested.insert(name.clone(), read_counts(child));
            }
            None => issues.push(NodeIssue {
                path: Some(join_path(Some(parent), name)),
                error: NodeError::NotAnObject {
                    found: value_kind(value),
                },
            }),
        }
    }

    nested
}

/// Look up a key that must hold an object.
///
/// Absent and `null` keys are treated alike; any other non-object value is
/// reported and ignored.
fn object_key<'a>(
    map: &'a Map<String, Value>,
    key: &'static str,
    path: Option<&str>,
    issues: &mut Vec<NodeIssue>,
) -> Option<&'a Map<String, Value>> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::Object(inner)) => Some(inner),
        Some(other) => {
            issues.push(NodeIssue {
                path: path.map(str::to_string),
                error: NodeError::KeyNotAnObject {
                    key,
                    found: value_kind(other),
                },
            });
            None
        }
    }
}

/// True if any recognized count key is present, whatever its value.
pub fn has_count_keys(map: &Map<String, Value>) -> bool {
    COUNT_KEYS.iter().any(|key| map.contains_key(*key))
}

/// Read the six recognized counts from an object.
///
/// Absent keys contribute zero; non-numeric values are ignored.
pub fn read_counts(map: &Map<String, Value>) -> Counts {
    let mut counts = Counts::default();

    for key in COUNT_KEYS {
        let Some(value) = map.get(key) else {
            continue;
        };

        match count_value(value) {
            Some(n) => {
                if let Some(slot) = counts.slot_mut(key) {
                    *slot = slot.saturating_add(n);
                }
            }
            None => trace!("Ignoring non-numeric `{}` count: {}", key, value),
        }
    }

    counts
}

/// Interpret a JSON value as a count.
///
/// Accepts non-negative integers and integral non-negative floats.
pub fn count_value(value: &Value) -> Option<u64> {
    let Value::Number(number) = value else {
        return None;
    };

    number.as_u64().or_else(|| {
        number
            .as_f64()
            .filter(|f| f.is_finite() && *f >= 0.0 && f.fract() == 0.0 && *f <= u64::MAX as f64)
            .map(|f| f as u64)
    })
}

fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
