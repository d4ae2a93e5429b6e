//! Shared normalization helpers and the comment forest builder.

use std::collections::HashMap;

use crate::types::{CommentNode, CommentRecord};

/// Pick a body string: rich variant preferred, else plain, else empty.
///
/// Empty strings count as absent, mirroring upstream payloads that send
/// `""` instead of omitting the field.
pub(crate) fn body_text(rich: Option<String>, plain: Option<String>) -> String {
    rich.filter(|s| !s.is_empty())
        .or_else(|| plain.filter(|s| !s.is_empty()))
        .unwrap_or_default()
}

/// Display handle, or the literal `"Unknown"` when absent upstream.
pub(crate) fn author_or_unknown(handle: Option<String>) -> String {
    handle
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "Unknown".to_string())
}

/// Build a comment forest from a flat record list.
///
/// Pure function of the input. Two passes, in input order:
///
/// 1. index every record id to a fresh node slot (the index is a transient
///    structure, dropped when this function returns);
/// 2. link each record under its parent when the parent id is present in the
///    batch, else into the root list.
///
/// Two passes are required because a record may reference a parent that
/// appears later in the input. A record whose parent id is not in the batch
/// becomes a root (orphan-becomes-root). Sibling order matches input order.
#[must_use]
pub fn build_forest(records: Vec<CommentRecord>) -> Vec<CommentNode> {
    let mut index: HashMap<String, usize> = HashMap::with_capacity(records.len());
    for (pos, record) in records.iter().enumerate() {
        index.insert(record.id.clone(), pos);
    }

    let mut children_of: Vec<Vec<usize>> = vec![Vec::new(); records.len()];
    let mut roots: Vec<usize> = Vec::new();
    for (pos, record) in records.iter().enumerate() {
        match record.parent_id.as_ref().and_then(|p| index.get(p)) {
            // Self-references would orphan a record from the assembly walk;
            // treat them as roots like any other unresolvable parent.
            Some(&parent) if parent != pos => children_of[parent].push(pos),
            _ => roots.push(pos),
        }
    }

    let mut nodes: Vec<Option<CommentNode>> = records
        .into_iter()
        .map(|r| {
            Some(CommentNode {
                id: r.id,
                body: r.body,
                author: r.author,
                created_at: r.created_at,
                like_count: r.like_count,
                children: Vec::new(),
            })
        })
        .collect();

    roots
        .iter()
        .map(|&pos| assemble(pos, &children_of, &mut nodes))
        .collect()
}

fn assemble(
    pos: usize,
    children_of: &[Vec<usize>],
    nodes: &mut Vec<Option<CommentNode>>,
) -> CommentNode {
    // Each position is reachable from exactly one root walk, so the slot is
    // still occupied here.
    let mut node = nodes[pos].take().expect("record assembled exactly once");
    node.children = children_of[pos]
        .iter()
        .map(|&child| assemble(child, children_of, nodes))
        .collect();
    node
}
