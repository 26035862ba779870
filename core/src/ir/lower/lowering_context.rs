//! file: core/src/ir/lower/lowering_context.rs
//! description: shared lowering context used during AST->IR lowering.
//!
//! `LoweringContext` carries the compilation settings and the temp scope
//! allocator for the function currently being lowered. One context per
//! compilation unit; nothing in it is shared between units.

use crate::config::ReformConfig;
use crate::ir::temp_scope::TempScopeAllocator;
use crate::policy::{self, Policy, SpecRevision};
use crate::error::ReformErrorExt;

#[derive(Debug, Clone)]
pub struct LoweringContext {
    pub config: ReformConfig,
    temps: TempScopeAllocator,
}

impl LoweringContext {
    pub fn new(config: ReformConfig) -> Self {
        if config.strict_legacy_diagnostics && config.revision >= SpecRevision::POST_FIX {
            log::warn!(
                "strict legacy diagnostics has no effect at revision {} (only below {})",
                config.revision,
                SpecRevision::POST_FIX
            );
        }
        LoweringContext {
            config,
            temps: TempScopeAllocator::new(),
        }
    }

    pub fn revision(&self) -> SpecRevision {
        self.config.revision
    }

    pub fn temps(&self) -> &TempScopeAllocator {
        &self.temps
    }

    pub fn temps_mut(&mut self) -> &mut TempScopeAllocator {
        &mut self.temps
    }

    /// Policy for a construct at `revision`, honouring this unit's
    /// diagnostics mode.
    pub fn policy_for(&self, revision: SpecRevision, is_async: bool) -> Result<Policy, Box<dyn ReformErrorExt>> {
        policy::resolve(revision, is_async, self.config.strict_legacy_diagnostics)
    }
}

impl Default for LoweringContext {
    fn default() -> Self {
        LoweringContext::new(ReformConfig::default())
    }
}
