//! file: core/src/ir/temp_scope.rs
//! description: per-function allocator for compiler-internal temporaries.
//!
//! Each reformulated construct asks for a fresh scope and allocates its
//! temporaries inside it. Scopes are closed once the construct's subtree is
//! built, after which further allocation is a contract violation.

use std::collections::HashSet;
use std::fmt;

use serde::Serialize;

use crate::error::{ContractViolation, ReformErrorExt};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub struct ScopeId(pub usize);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ValueKind {
    /// Holds a source-level object and must be released.
    Object,
    /// Compiler-internal flag; lives on the C stack, never released.
    Bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct TempVariable {
    pub id: usize,
    pub scope: ScopeId,
    pub scope_label: String,
    pub name: String,
    pub kind: ValueKind,
}

impl TempVariable {
    /// `with#3.source` style name, unique within one function.
    pub fn qualified_name(&self) -> String {
        format!("{}#{}.{}", self.scope_label, self.scope.0, self.name)
    }

    pub fn needs_release(&self) -> bool {
        self.kind == ValueKind::Object
    }
}

impl fmt::Display for TempVariable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified_name())
    }
}

#[derive(Debug, Clone)]
struct ScopeState {
    label: String,
    names: HashSet<String>,
    closed: bool,
}

/// Hands out scopes and temporaries for one function being compiled.
///
/// Never share one allocator between functions compiled concurrently; each
/// compilation unit owns its own.
#[derive(Debug, Clone, Default)]
pub struct TempScopeAllocator {
    scopes: Vec<ScopeState>,
    next_temp: usize,
}

impl TempScopeAllocator {
    pub fn new() -> Self {
        TempScopeAllocator::default()
    }

    pub fn new_scope(&mut self, label: &str) -> ScopeId {
        self.scopes.push(ScopeState {
            label: label.to_string(),
            names: HashSet::new(),
            closed: false,
        });
        let id = ScopeId(self.scopes.len());
        log::trace!("opened temp scope {}#{}", label, id.0);
        id
    }

    pub fn allocate(
        &mut self,
        scope: ScopeId,
        name: &str,
        kind: ValueKind,
    ) -> Result<TempVariable, Box<dyn ReformErrorExt>> {
        let state = self.state_mut(scope, "reform.temp_scope.allocate")?;
        if state.closed {
            return Err(ContractViolation::new(
                format!("allocation of '{}' from closed scope {}#{}", name, state.label, scope.0),
                "reform.temp_scope.allocate",
                None,
            )
            .into());
        }
        if !state.names.insert(name.to_string()) {
            return Err(ContractViolation::new(
                format!("temp '{}' allocated twice in scope {}#{}", name, state.label, scope.0),
                "reform.temp_scope.allocate",
                None,
            )
            .into());
        }
        let scope_label = state.label.clone();

        let id = self.next_temp;
        self.next_temp += 1;
        let variable = TempVariable {
            id,
            scope,
            scope_label,
            name: name.to_string(),
            kind,
        };
        log::trace!("allocated temp {} ({:?})", variable, kind);
        Ok(variable)
    }

    pub fn close_scope(&mut self, scope: ScopeId) -> Result<(), Box<dyn ReformErrorExt>> {
        let state = self.state_mut(scope, "reform.temp_scope.close_scope")?;
        if state.closed {
            return Err(ContractViolation::new(
                format!("scope {}#{} closed twice", state.label, scope.0),
                "reform.temp_scope.close_scope",
                None,
            )
            .into());
        }
        state.closed = true;
        log::trace!("closed temp scope {}#{}", state.label, scope.0);
        Ok(())
    }

    pub fn is_closed(&self, scope: ScopeId) -> bool {
        scope
            .0
            .checked_sub(1)
            .and_then(|idx| self.scopes.get(idx))
            .map(|s| s.closed)
            .unwrap_or(false)
    }

    pub fn scope_count(&self) -> usize {
        self.scopes.len()
    }

    pub fn temp_count(&self) -> usize {
        self.next_temp
    }

    fn state_mut(&mut self, scope: ScopeId, issuer: &str) -> Result<&mut ScopeState, Box<dyn ReformErrorExt>> {
        match scope.0.checked_sub(1).and_then(|idx| self.scopes.get_mut(idx)) {
            Some(state) => Ok(state),
            None => Err(ContractViolation::new(
                format!("unknown temp scope #{}", scope.0),
                issuer,
                None,
            )
            .into()),
        }
    }
}
