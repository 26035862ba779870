//! file: core/src/ir/verify.rs
//! description: structural checks on reformulated subtrees.
//!
//! The verifier looks at one construct layer at a time. For every temp it
//! keeps the try/finally blocks whose tried branch encloses all of its uses,
//! and for every release the try/finally blocks whose final branch encloses
//! it. An object temp is balanced when its single release sits in the final
//! branch of a block that covers every use.
//!
//! Constructs nested inside the checked one were verified when they were
//! built, so their subtrees are skipped. Checking a statement of n clauses
//! therefore touches each layer once.

use std::collections::BTreeMap;

use crate::error::{ContractViolation, ReformErrorExt};

use super::node::{IrNode, IrNodeKind};
use super::temp_scope::{ScopeId, TempVariable, ValueKind};
use super::walk;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Branch {
    Tried,
    Final,
}

#[derive(Debug)]
struct Mentions {
    variable: TempVariable,
    /// `None` until the first use.
    covering: Option<Vec<usize>>,
    releases: Vec<Vec<usize>>,
}

struct Collector {
    scope: ScopeId,
    next_try: usize,
    path: Vec<(usize, Branch)>,
    mentions: BTreeMap<usize, Mentions>,
}

/// Root of a construct built before the one being checked: a try/finally
/// whose final branch releases temps of an older scope.
fn is_inner_construct(node: &IrNode, scope: ScopeId) -> bool {
    let IrNodeKind::TryFinally { final_branch, .. } = &node.kind else {
        return false;
    };
    let IrNodeKind::Sequence { statements } = &final_branch.kind else {
        return false;
    };
    matches!(
        statements.first().map(|s| &s.kind),
        Some(IrNodeKind::Release { variable }) if variable.scope < scope
    )
}

impl Collector {
    fn record(&mut self, node: &IrNode, variable: &TempVariable) {
        let path = &self.path;
        let entry = self.mentions.entry(variable.id).or_insert_with(|| Mentions {
            variable: variable.clone(),
            covering: None,
            releases: Vec::new(),
        });
        if matches!(node.kind, IrNodeKind::Release { .. }) {
            entry.releases.push(
                path.iter()
                    .filter(|(_, branch)| *branch == Branch::Final)
                    .map(|(id, _)| *id)
                    .collect(),
            );
            return;
        }
        match &mut entry.covering {
            Some(covering) => covering.retain(|id| path.contains(&(*id, Branch::Tried))),
            None => {
                entry.covering = Some(
                    path.iter()
                        .filter(|(_, branch)| *branch == Branch::Tried)
                        .map(|(id, _)| *id)
                        .collect(),
                )
            }
        }
    }

    fn visit(&mut self, node: &IrNode) {
        if is_inner_construct(node, self.scope) {
            return;
        }
        if let Some(variable) = walk::temp_of(node) {
            self.record(node, variable);
        }

        if let IrNodeKind::TryFinally { tried, final_branch } = &node.kind {
            let id = self.next_try;
            self.next_try += 1;
            self.path.push((id, Branch::Tried));
            self.visit(tried);
            self.path.pop();
            self.path.push((id, Branch::Final));
            self.visit(final_branch);
            self.path.pop();
            return;
        }
        for child in node.children() {
            self.visit(child);
        }
    }
}

fn violation(node: &IrNode, message: String) -> Box<dyn ReformErrorExt> {
    ContractViolation::new(message, "reform.verify.verify_construct", Some(node.location.clone())).into()
}

/// Check temp discipline on the subtree produced for the construct that owns
/// `scope`. Temps from scopes opened after `scope` cannot belong to it or to
/// anything it wraps.
pub fn verify_construct(node: &IrNode, scope: ScopeId) -> Result<(), Box<dyn ReformErrorExt>> {
    let mut collector = Collector {
        scope,
        next_try: 0,
        path: Vec::new(),
        mentions: BTreeMap::new(),
    };
    collector.visit(node);

    for m in collector.mentions.values() {
        let variable = &m.variable;
        if variable.scope > scope {
            return Err(violation(
                node,
                format!("temp {} does not belong to construct scope #{}", variable, scope.0),
            ));
        }
        match variable.kind {
            ValueKind::Bool => {
                if !m.releases.is_empty() {
                    return Err(violation(node, format!("flag temp {} must not be released", variable)));
                }
            }
            ValueKind::Object => {
                if m.releases.len() != 1 {
                    return Err(violation(
                        node,
                        format!("temp {} released {} time(s), expected once", variable, m.releases.len()),
                    ));
                }
                let guarded = m.releases[0]
                    .iter()
                    .any(|id| m.covering.as_ref().is_none_or(|covering| covering.contains(id)));
                if !guarded {
                    return Err(violation(
                        node,
                        format!("release of temp {} is not guarded by a finally covering its uses", variable),
                    ));
                }
            }
        }
    }
    Ok(())
}
