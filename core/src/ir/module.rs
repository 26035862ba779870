use std::fmt;

use serde::Serialize;

use crate::ir::node::IrNode;
use crate::policy::SpecRevision;

/// Lowered form of one fixture script: its top-level statements in order.
#[derive(Debug, Clone, Serialize)]
pub struct IrModule {
    pub name: String,
    pub revision: SpecRevision,
    pub body: Vec<IrNode>,
    /// Temp scopes opened while lowering this module.
    pub temp_scopes: usize,
    /// Temporaries allocated across all scopes.
    pub temps: usize,
}

impl IrModule {
    pub fn new(name: &str, revision: SpecRevision) -> Self {
        IrModule {
            name: name.to_string(),
            revision,
            body: Vec::new(),
            temp_scopes: 0,
            temps: 0,
        }
    }

    pub fn push(&mut self, node: IrNode) {
        self.body.push(node);
    }

    pub fn get_body(&self) -> &[IrNode] {
        &self.body
    }

    pub fn len(&self) -> usize {
        self.body.len()
    }

    pub fn is_empty(&self) -> bool {
        self.body.is_empty()
    }
}

impl fmt::Display for IrModule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "module {} (revision {}, {} scope(s), {} temp(s))",
            self.name, self.revision, self.temp_scopes, self.temps
        )?;
        for node in self.body.iter() {
            write!(f, "{}", node)?;
        }
        Ok(())
    }
}
