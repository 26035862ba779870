//! file: core/src/ir/node.rs
//! description: the canonical tree IR handed to the optimizer.
//!
//! Statements and expressions share one closed `IrNodeKind` enum. Every node
//! carries the `Location` it should be attributed to in diagnostics and
//! tracebacks.

use std::fmt;

use serde::Serialize;

use super::temp_scope::TempVariable;
use super::value::Value;
use crate::location::Location;
use crate::policy::AttributeLookupForm;

/// Which component of the exception being handled a node refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ExceptionComponent {
    Type,
    Value,
    Traceback,
}

/// Which protocol hook a suspension point awaits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum WaitKind {
    Enter,
    Exit,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IrNode {
    pub kind: IrNodeKind,
    pub location: Location,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "node")]
pub enum IrNodeKind {
    // statements
    Sequence { statements: Vec<IrNode> },
    AssignTemp { variable: TempVariable, source: Box<IrNode> },
    AssignVariable { name: String, source: Box<IrNode> },
    AssignAttribute { object: Box<IrNode>, attribute: String, source: Box<IrNode> },
    ExpressionOnly { expression: Box<IrNode> },
    Conditional {
        condition: Box<IrNode>,
        yes_branch: Option<Box<IrNode>>,
        no_branch: Option<Box<IrNode>>,
    },
    TryFinally { tried: Box<IrNode>, final_branch: Box<IrNode> },
    /// Single catch-all style handler; `publish` makes the caught exception
    /// the current one while `handler` runs.
    TryExcept {
        tried: Box<IrNode>,
        exception_name: String,
        handler: Box<IrNode>,
        publish: bool,
    },
    Reraise,
    Release { variable: TempVariable },

    // expressions
    Constant { value: Value },
    TempRef { variable: TempVariable },
    VariableRef { name: String },
    AttributeLookup {
        expression: Box<IrNode>,
        attribute: String,
        form: AttributeLookupForm,
    },
    /// `args` evaluates to a tuple of positional arguments; `None` is a call
    /// without arguments.
    Call { called: Box<IrNode>, args: Option<Box<IrNode>> },
    MakeTuple { elements: Vec<IrNode> },
    CaughtException { component: ExceptionComponent },
    ComparisonIs { left: Box<IrNode>, right: Box<IrNode> },
    Suspend { expression: Box<IrNode>, wait: WaitKind },
}

impl IrNode {
    pub fn new(kind: IrNodeKind, location: Location) -> Self {
        IrNode { kind, location }
    }

    /// Direct children in evaluation order.
    pub fn children(&self) -> Vec<&IrNode> {
        match &self.kind {
            IrNodeKind::Sequence { statements } => statements.iter().collect(),
            IrNodeKind::AssignTemp { source, .. } | IrNodeKind::AssignVariable { source, .. } => {
                vec![source.as_ref()]
            }
            IrNodeKind::AssignAttribute { object, source, .. } => vec![source.as_ref(), object.as_ref()],
            IrNodeKind::ExpressionOnly { expression } => vec![expression.as_ref()],
            IrNodeKind::Conditional {
                condition,
                yes_branch,
                no_branch,
            } => {
                let mut out = vec![condition.as_ref()];
                out.extend(yes_branch.as_deref());
                out.extend(no_branch.as_deref());
                out
            }
            IrNodeKind::TryFinally { tried, final_branch } => vec![tried.as_ref(), final_branch.as_ref()],
            IrNodeKind::TryExcept { tried, handler, .. } => vec![tried.as_ref(), handler.as_ref()],
            IrNodeKind::AttributeLookup { expression, .. } => vec![expression.as_ref()],
            IrNodeKind::Call { called, args } => {
                let mut out = vec![called.as_ref()];
                out.extend(args.as_deref());
                out
            }
            IrNodeKind::MakeTuple { elements } => elements.iter().collect(),
            IrNodeKind::ComparisonIs { left, right } => vec![left.as_ref(), right.as_ref()],
            IrNodeKind::Suspend { expression, .. } => vec![expression.as_ref()],
            IrNodeKind::Reraise
            | IrNodeKind::Release { .. }
            | IrNodeKind::Constant { .. }
            | IrNodeKind::TempRef { .. }
            | IrNodeKind::VariableRef { .. }
            | IrNodeKind::CaughtException { .. } => Vec::new(),
        }
    }

    /// Short label used by the tree printer and in diagnostics.
    pub fn label(&self) -> String {
        match &self.kind {
            IrNodeKind::Sequence { statements } => format!("Sequence[{}]", statements.len()),
            IrNodeKind::AssignTemp { variable, .. } => format!("AssignTemp {}", variable),
            IrNodeKind::AssignVariable { name, .. } => format!("AssignVariable {}", name),
            IrNodeKind::AssignAttribute { attribute, .. } => format!("AssignAttribute .{}", attribute),
            IrNodeKind::ExpressionOnly { .. } => "ExpressionOnly".to_string(),
            IrNodeKind::Conditional { .. } => "Conditional".to_string(),
            IrNodeKind::TryFinally { .. } => "TryFinally".to_string(),
            IrNodeKind::TryExcept {
                exception_name,
                publish,
                ..
            } => format!("TryExcept {}{}", exception_name, if *publish { " publish" } else { "" }),
            IrNodeKind::Reraise => "Reraise".to_string(),
            IrNodeKind::Release { variable } => format!("Release {}", variable),
            IrNodeKind::Constant { value } => format!("Constant {}", value),
            IrNodeKind::TempRef { variable } => format!("TempRef {}", variable),
            IrNodeKind::VariableRef { name } => format!("VariableRef {}", name),
            IrNodeKind::AttributeLookup { attribute, form, .. } => match form {
                AttributeLookupForm::Plain => format!("AttributeLookup .{}", attribute),
                AttributeLookupForm::Special => format!("AttributeLookupSpecial .{}", attribute),
            },
            IrNodeKind::Call { args: None, .. } => "CallEmpty".to_string(),
            IrNodeKind::Call { .. } => "Call".to_string(),
            IrNodeKind::MakeTuple { elements } => format!("MakeTuple[{}]", elements.len()),
            IrNodeKind::CaughtException { component } => format!("CaughtException {:?}", component),
            IrNodeKind::ComparisonIs { .. } => "ComparisonIs".to_string(),
            IrNodeKind::Suspend { wait, .. } => format!("Suspend {:?}", wait),
        }
    }

    fn fmt_tree(&self, f: &mut fmt::Formatter<'_>, indent: usize) -> fmt::Result {
        writeln!(
            f,
            "{:indent$}{}  @{}:{}",
            "",
            self.label(),
            self.location.line,
            self.location.column,
            indent = indent
        )?;
        match &self.kind {
            IrNodeKind::Conditional {
                condition,
                yes_branch,
                no_branch,
            } => {
                condition.fmt_tree(f, indent + 2)?;
                if let Some(yes) = yes_branch {
                    writeln!(f, "{:indent$}yes:", "", indent = indent + 2)?;
                    yes.fmt_tree(f, indent + 4)?;
                }
                if let Some(no) = no_branch {
                    writeln!(f, "{:indent$}no:", "", indent = indent + 2)?;
                    no.fmt_tree(f, indent + 4)?;
                }
                Ok(())
            }
            IrNodeKind::TryFinally { tried, final_branch } => {
                writeln!(f, "{:indent$}tried:", "", indent = indent + 2)?;
                tried.fmt_tree(f, indent + 4)?;
                writeln!(f, "{:indent$}final:", "", indent = indent + 2)?;
                final_branch.fmt_tree(f, indent + 4)
            }
            IrNodeKind::TryExcept { tried, handler, .. } => {
                writeln!(f, "{:indent$}tried:", "", indent = indent + 2)?;
                tried.fmt_tree(f, indent + 4)?;
                writeln!(f, "{:indent$}handler:", "", indent = indent + 2)?;
                handler.fmt_tree(f, indent + 4)
            }
            _ => {
                for child in self.children() {
                    child.fmt_tree(f, indent + 2)?;
                }
                Ok(())
            }
        }
    }
}

impl fmt::Display for IrNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.fmt_tree(f, 0)
    }
}
