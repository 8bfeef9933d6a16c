//! Flattened tree snapshots for structural assertions.

use trellis_core::{ElementGraph, ElementId, ElementKey};

/// One element of a pre-order tree snapshot.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShapeEntry {
    pub id: ElementId,
    /// Depth below the snapshot's start element.
    pub depth: usize,
    pub key: ElementKey,
    /// Unqualified payload type name; `"root"` for the root.
    pub type_name: &'static str,
    pub is_new: bool,
    pub visible: bool,
}

/// Pre-order snapshot of the subtree at `start`, start element excluded.
pub fn shape_of(graph: &ElementGraph, start: ElementId) -> Vec<ShapeEntry> {
    let mut out = Vec::new();
    let mut stack = vec![(start, 0usize)];
    while let Some((id, depth)) = stack.pop() {
        let Ok(element) = graph.element(id) else {
            continue;
        };
        if id != start {
            out.push(ShapeEntry {
                id,
                depth: depth - 1,
                key: element.key(),
                type_name: element.type_name(),
                is_new: element.is_new(),
                visible: element.visible(),
            });
        }
        let children: Vec<_> = element.children().map(|child| child.id()).collect();
        stack.extend(children.into_iter().rev().map(|child| (child, depth + 1)));
    }
    out
}

/// `(depth, type name)` pairs, the usual shape of an expected tree.
pub fn outline(shape: &[ShapeEntry]) -> Vec<(usize, &'static str)> {
    shape
        .iter()
        .map(|entry| (entry.depth, entry.type_name))
        .collect()
}
