pub mod ast;
pub mod config;
pub mod error;
pub mod ir;
pub mod location;
pub mod policy;
pub mod script;

pub use ast::RulesParser;
pub use config::{EnterCancellation, ReformConfig};
pub use error::{ContractViolation, Level, ReformErrorExt};
pub use ir::interp::{Scenario, Trace, simulate, simulate_all};
pub use ir::lower_ast_to_ir;
pub use ir::IrModule;
pub use location::{Location, Span};
pub use policy::{Policy, SpecRevision, resolve};
pub use script::Script;

pub fn generate_error_report<E: ReformErrorExt + ?Sized>(error: &E) -> String {
    let level = error.level();
    let location = match error.location() {
        Some(loc) => loc.to_string(),
        None => "unknown location".to_string(),
    };
    let message = error.message();

    format!("REFORM | {} | {} | {}", level, location, message)
}

/// Parse a fixture script and lower it under `config`.
pub fn reformulate_source(source: &Script, config: ReformConfig) -> Result<IrModule, Box<dyn ReformErrorExt>> {
    let ast = ast::generate_ast_from_source(source)?;
    lower_ast_to_ir(&ast, &source.name, config)
}
