//! Linearization of the expression DAG.
//!
//! Produces a flat sequence in dependency order: every node appears after
//! everything it depends on, and shared nodes appear exactly once.

use std::collections::HashSet;

use snafu::ensure;

use crate::error::{Result, UnexpectedTensorSpecSnafu};
use crate::expr::{ExprKind, ExprRef};

/// Flatten the DAG reachable from `roots` into dependency order.
///
/// Iterative post-order with an explicit two-state stack: a node is pushed
/// once to expand its children and once more to be appended after them. The
/// seen-set keys on node identity, so a node reachable along several paths
/// is expanded and emitted only once. Children are pushed in reverse so they
/// pop (and therefore appear) left-first.
pub fn linearize(roots: &[ExprRef]) -> Result<Vec<ExprRef>> {
    let mut stack: Vec<(ExprRef, bool)> =
        roots.iter().map(|root| (root.clone(), false)).collect();
    let mut seen: HashSet<u64> = HashSet::new();
    let mut flat = Vec::new();

    while let Some((node, emit)) = stack.pop() {
        if emit {
            flat.push(node);
            continue;
        }
        if !seen.insert(node.id()) {
            continue;
        }
        // Access specs are structural pieces of a contraction; reaching one
        // here means the graph was assembled outside the builder API.
        ensure!(!matches!(node.kind(), ExprKind::TensorSpec(_)), UnexpectedTensorSpecSnafu);
        tracing::trace!(node = %node, "linearize");
        let children = node.children();
        stack.push((node, true));
        for child in children.into_iter().rev() {
            stack.push((child, false));
        }
    }

    Ok(flat)
}
