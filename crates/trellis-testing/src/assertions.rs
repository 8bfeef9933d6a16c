//! Assertion helpers for element graph tests.

use trellis_core::GraphStats;

use crate::shape::{outline, ShapeEntry};
use crate::TestUi;

/// Assert that the tree below the root has the given `(depth, type name)`
/// outline.
pub fn assert_outline(ui: &TestUi, expected: &[(usize, &str)], msg: &str) {
    let shape = ui.shape();
    let actual = outline(&shape);
    assert_eq!(
        actual.as_slice(),
        expected,
        "{}: tree outline differs\n{}",
        msg,
        ui.dump_tree()
    );
}

/// Assert that every entry of `shape` has the expected `is_new` flag.
pub fn assert_all_new(shape: &[ShapeEntry], expected: bool, msg: &str) {
    let mismatched: Vec<_> = shape
        .iter()
        .filter(|entry| entry.is_new != expected)
        .map(|entry| entry.id)
        .collect();
    assert!(
        mismatched.is_empty(),
        "{}: expected is_new == {} for every element, mismatched {:?}",
        msg,
        expected,
        mismatched
    );
}

/// Assert that exactly `elements` elements and `variables` variables were
/// released between two snapshots.
pub fn assert_released(
    before: &GraphStats,
    after: &GraphStats,
    elements: usize,
    variables: usize,
    msg: &str,
) {
    assert_eq!(
        before.elements.saturating_sub(after.elements),
        elements,
        "{}: released element count",
        msg
    );
    assert_eq!(
        before.variables.saturating_sub(after.variables),
        variables,
        "{}: released variable count",
        msg
    );
    assert_eq!(after.pending_removals, 0, "{}: removals still queued", msg);
}

/// Assert that the graph is between frames with nothing staged.
pub fn assert_idle(ui: &TestUi, msg: &str) {
    assert!(!ui.graph().is_declaring(), "{}: frame still open", msg);
    assert!(
        !ui.handle().has_pending(),
        "{}: {} command(s) still staged",
        msg,
        ui.handle().pending_count()
    );
}
