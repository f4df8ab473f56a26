//! Field-path resolution.
//!
//! Walks a parsed field tree depth-first and flattens it into
//! `(dot.path, counts)` pairs. A parent and each of its descendants are
//! separate entries; the parent keeps its own roll-up counts.

use crate::analysis::tree::{FieldMap, FieldNode};
use crate::models::Counts;

/// Join a field name onto an optional dot-separated prefix.
pub fn join_path(prefix: Option<&str>, name: &str) -> String {
    match prefix {
        Some(prefix) if !prefix.is_empty() => format!("{}.{}", prefix, name),
        _ => name.to_string(),
    }
}

/// Flatten a field map into `(path, counts)` pairs.
///
/// The same path may appear more than once (e.g. for mixed nodes); callers
/// sum the entries.
pub fn resolve(fields: &FieldMap, prefix: Option<&str>) -> Vec<(String, Counts)> {
    let mut out = Vec::new();

    for (name, node) in fields {
        let path = join_path(prefix, name);
        resolve_node(node, &path, &mut out);
    }

    out
}

fn resolve_node(node: &FieldNode, path: &str, out: &mut Vec<(String, Counts)>) {
    match node {
        FieldNode::Flat(counts) => out.push((path.to_string(), *counts)),
        FieldNode::Hierarchical { overall, fields } => {
            if let Some(overall) = overall {
                out.push((path.to_string(), *overall));
            }
            for (name, child) in fields {
                resolve_node(child, &join_path(Some(path), name), out);
            }
        }
        FieldNode::ListAggregated {
            overall,
            nested_fields,
        } => {
            if let Some(overall) = overall {
                out.push((path.to_string(), *overall));
            }
            // One level only: nested entries are already summed across items.
            for (name, counts) in nested_fields {
                out.push((join_path(Some(path), name), *counts));
            }
        }
        FieldNode::Mixed(parts) => {
            for part in parts {
                resolve_node(part, path, out);
            }
        }
    }
}
