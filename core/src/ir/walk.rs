//! Read-only traversal helpers over `IrNode` trees.

use super::node::{IrNode, IrNodeKind};
use super::temp_scope::TempVariable;

/// Pre-order walk calling `visit` on every node.
pub fn walk<'a>(node: &'a IrNode, visit: &mut impl FnMut(&'a IrNode)) {
    visit(node);
    for child in node.children() {
        walk(child, visit);
    }
}

/// All nodes matching `pred`, in pre-order.
pub fn find_all<'a>(node: &'a IrNode, pred: impl Fn(&IrNode) -> bool) -> Vec<&'a IrNode> {
    let mut out = Vec::new();
    walk(node, &mut |n| {
        if pred(n) {
            out.push(n);
        }
    });
    out
}

pub fn count(node: &IrNode, pred: impl Fn(&IrNode) -> bool) -> usize {
    find_all(node, pred).len()
}

/// Follow the last child until reaching a leaf.
pub fn deepest_last(node: &IrNode) -> &IrNode {
    let mut deepest = node;
    while let Some(last) = deepest.children().last().copied() {
        deepest = last;
    }
    deepest
}

/// The temp variable a node mentions, if it is a temp assignment, reference
/// or release.
pub fn temp_of(node: &IrNode) -> Option<&TempVariable> {
    match &node.kind {
        IrNodeKind::AssignTemp { variable, .. }
        | IrNodeKind::TempRef { variable }
        | IrNodeKind::Release { variable } => Some(variable),
        _ => None,
    }
}
