//! Small constructors for the IR shapes lowering builds over and over.

use crate::ir::node::{IrNode, IrNodeKind, WaitKind};
use crate::ir::temp_scope::TempVariable;
use crate::ir::value::Value;
use crate::location::Location;
use crate::policy::AttributeLookupForm;

/// Sequence of the present statements, or `None` when nothing is left.
pub fn make_statements_sequence(statements: Vec<Option<IrNode>>, location: &Location) -> Option<IrNode> {
    let statements: Vec<IrNode> = statements.into_iter().flatten().collect();
    if statements.is_empty() {
        return None;
    }
    Some(IrNode::new(IrNodeKind::Sequence { statements }, location.clone()))
}

pub fn make_try_finally(tried: IrNode, final_branch: IrNode, location: &Location) -> IrNode {
    IrNode::new(
        IrNodeKind::TryFinally {
            tried: Box::new(tried),
            final_branch: Box::new(final_branch),
        },
        location.clone(),
    )
}

pub fn make_try_except_single_handler(
    tried: IrNode,
    exception_name: &str,
    handler: IrNode,
    publish: bool,
    location: &Location,
) -> IrNode {
    IrNode::new(
        IrNodeKind::TryExcept {
            tried: Box::new(tried),
            exception_name: exception_name.to_string(),
            handler: Box::new(handler),
            publish,
        },
        location.clone(),
    )
}

pub fn make_conditional(
    condition: IrNode,
    yes_branch: Option<IrNode>,
    no_branch: Option<IrNode>,
    location: &Location,
) -> IrNode {
    IrNode::new(
        IrNodeKind::Conditional {
            condition: Box::new(condition),
            yes_branch: yes_branch.map(Box::new),
            no_branch: no_branch.map(Box::new),
        },
        location.clone(),
    )
}

pub fn make_reraise(location: &Location) -> IrNode {
    IrNode::new(IrNodeKind::Reraise, location.clone())
}

pub fn assign_temp(variable: &TempVariable, source: IrNode, location: &Location) -> IrNode {
    IrNode::new(
        IrNodeKind::AssignTemp {
            variable: variable.clone(),
            source: Box::new(source),
        },
        location.clone(),
    )
}

pub fn temp_ref(variable: &TempVariable, location: &Location) -> IrNode {
    IrNode::new(IrNodeKind::TempRef { variable: variable.clone() }, location.clone())
}

pub fn release(variable: &TempVariable, location: &Location) -> IrNode {
    IrNode::new(IrNodeKind::Release { variable: variable.clone() }, location.clone())
}

pub fn constant(value: Value, location: &Location) -> IrNode {
    IrNode::new(IrNodeKind::Constant { value }, location.clone())
}

pub fn attribute_lookup(expression: IrNode, attribute: &str, form: AttributeLookupForm, location: &Location) -> IrNode {
    IrNode::new(
        IrNodeKind::AttributeLookup {
            expression: Box::new(expression),
            attribute: attribute.to_string(),
            form,
        },
        location.clone(),
    )
}

pub fn call(called: IrNode, args: Option<IrNode>, location: &Location) -> IrNode {
    IrNode::new(
        IrNodeKind::Call {
            called: Box::new(called),
            args: args.map(Box::new),
        },
        location.clone(),
    )
}

pub fn expression_only(expression: IrNode, location: &Location) -> IrNode {
    IrNode::new(
        IrNodeKind::ExpressionOnly {
            expression: Box::new(expression),
        },
        location.clone(),
    )
}

pub fn suspend(expression: IrNode, wait: WaitKind, location: &Location) -> IrNode {
    IrNode::new(
        IrNodeKind::Suspend {
            expression: Box::new(expression),
            wait,
        },
        location.clone(),
    )
}
