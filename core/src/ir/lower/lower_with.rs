//! file: core/src/ir/lower/lower_with.rs
//! description: reformulation of `with` / `async with` into primitive IR.
//!
//! A single clause becomes:
//!
//! ```text
//! try:
//!     source = <context>
//!     exit = source.__exit__            # order per policy
//!     enter = source.__enter__()
//!     indicator = True
//!     try:
//!         try:
//!             <target> = enter
//!             <body>
//!         except BaseException:
//!             indicator = False
//!             if not exit(*sys.exc_info()):
//!                 raise
//!     finally:
//!         if indicator is True:
//!             exit(None, None, None)
//! finally:
//!     release source, enter, exit
//! ```
//!
//! Without a target and body there is nothing to protect: the inner
//! try/except is left out and the inner try/finally reduces to its final
//! branch.
//!
//! Several clauses sharing one body are built innermost first, each one
//! wrapping the subtree produced for the clauses written after it.

use crate::ast::{AstNode, AstNodeKind};
use crate::config::EnterCancellation;
use crate::error::{ContractViolation, ReformErrorExt};
use crate::ir::node::{ExceptionComponent, IrNode, IrNodeKind, WaitKind};
use crate::ir::temp_scope::{TempVariable, ValueKind};
use crate::ir::value::Value;
use crate::ir::{verify, walk};
use crate::location::Location;
use crate::policy::{EnterExitOrder, InputShape, Policy, PositionAttribution, SpecRevision};

use super::lower_expr::lower_expr;
use super::lower_stmt::{build_assignment, lower_block};
use super::lowering_context::LoweringContext;
use super::tree_helpers::*;

const CATCH_ALL: &str = "BaseException";
const CANCELLED: &str = "CancelledError";

/// One source-level clause: `<context> [as <target>]`.
#[derive(Debug, Clone, PartialEq)]
pub struct RawConstruct {
    pub context: AstNode,
    pub target: Option<AstNode>,
    pub is_async: bool,
    pub revision: SpecRevision,
    pub location: Location,
}

/// How the front-end presented the clauses of one statement.
#[derive(Debug, Clone, PartialEq)]
pub enum WithShape {
    /// Legacy single clause; multi-clause statements arrive pre-nested.
    Flattened(RawConstruct),
    /// All clauses in source order.
    Items(Vec<RawConstruct>),
}

#[derive(Debug, Clone, PartialEq)]
pub struct RawWith {
    pub shape: WithShape,
    pub location: Location,
}

impl RawWith {
    /// Pair up context expressions and targets into an explicit clause list.
    pub fn from_parts(
        context_exprs: Vec<AstNode>,
        targets: Vec<Option<AstNode>>,
        is_async: bool,
        revision: SpecRevision,
        location: Location,
    ) -> Result<RawWith, Box<dyn ReformErrorExt>> {
        if context_exprs.is_empty() || context_exprs.len() != targets.len() {
            return Err(ContractViolation::new(
                format!(
                    "with statement needs one target slot per context expression (got {} expressions, {} targets)",
                    context_exprs.len(),
                    targets.len()
                ),
                "reform.lower_with.RawWith::from_parts",
                Some(location),
            )
            .into());
        }
        let items = context_exprs
            .into_iter()
            .zip(targets)
            .map(|(context, target)| RawConstruct {
                location: location.clone(),
                context,
                target,
                is_async,
                revision,
            })
            .collect();
        Ok(RawWith {
            shape: WithShape::Items(items),
            location,
        })
    }

    pub fn flattened(construct: RawConstruct) -> RawWith {
        RawWith {
            location: construct.location.clone(),
            shape: WithShape::Flattened(construct),
        }
    }

    /// Clause list in source order. An explicit list is only legal where
    /// the policy expects one.
    pub fn normalize(self, input_shape: InputShape) -> Result<Vec<RawConstruct>, Box<dyn ReformErrorExt>> {
        match (self.shape, input_shape) {
            (WithShape::Flattened(construct), _) => Ok(vec![construct]),
            (WithShape::Items(items), InputShape::ExplicitList) => Ok(items),
            (WithShape::Items(items), InputShape::FlattenedSingle) => Err(ContractViolation::new(
                format!(
                    "explicit list of {} clause(s) at a revision whose front-end only presents single clauses",
                    items.len()
                ),
                "reform.lower_with.RawWith::normalize",
                Some(self.location),
            )
            .into()),
        }
    }
}

struct HookNames {
    enter: &'static str,
    exit: &'static str,
}

impl HookNames {
    fn for_construct(is_async: bool) -> Self {
        if is_async {
            HookNames {
                enter: "__aenter__",
                exit: "__aexit__",
            }
        } else {
            HookNames {
                enter: "__enter__",
                exit: "__exit__",
            }
        }
    }
}

/// Position for nodes that belong to leaving the block.
fn exit_location(policy: &Policy, location: &Location, body: Option<&IrNode>) -> Location {
    match (policy.position_attribution, body) {
        (PositionAttribution::DeepestBodyRef, Some(body)) => location.at_line(walk::deepest_last(body).location.line),
        _ => location.clone(),
    }
}

fn caught_exception_args(exit_loc: &Location, location: &Location) -> IrNode {
    IrNode::new(
        IrNodeKind::MakeTuple {
            elements: vec![
                IrNode::new(
                    IrNodeKind::CaughtException {
                        component: ExceptionComponent::Type,
                    },
                    exit_loc.clone(),
                ),
                IrNode::new(
                    IrNodeKind::CaughtException {
                        component: ExceptionComponent::Value,
                    },
                    exit_loc.clone(),
                ),
                IrNode::new(
                    IrNodeKind::CaughtException {
                        component: ExceptionComponent::Traceback,
                    },
                    location.clone(),
                ),
            ],
        },
        location.clone(),
    )
}

fn maybe_suspend(expression: IrNode, is_async: bool, wait: WaitKind, location: &Location) -> IrNode {
    if is_async {
        suspend(expression, wait, location)
    } else {
        expression
    }
}

/// Reformulate one clause around an already-lowered body.
pub fn build_with_node(
    ctx: &mut LoweringContext,
    construct: &RawConstruct,
    body: Option<IrNode>,
) -> Result<IrNode, Box<dyn ReformErrorExt>> {
    let policy = ctx.policy_for(construct.revision, construct.is_async)?;
    let location = construct.location.clone();
    let is_async = construct.is_async;
    let hooks = HookNames::for_construct(is_async);

    let with_source = lower_expr(&construct.context)?;

    let scope = ctx.temps_mut().new_scope("with");
    let source_var = ctx.temps_mut().allocate(scope, "source", ValueKind::Object)?;
    let exit_var = ctx.temps_mut().allocate(scope, "exit", ValueKind::Object)?;
    let enter_var = ctx.temps_mut().allocate(scope, "enter", ValueKind::Object)?;
    let indicator_var = ctx.temps_mut().allocate(scope, "indicator", ValueKind::Bool)?;

    let exit_loc = exit_location(&policy, &location, body.as_ref());

    let target_assignment = match &construct.target {
        Some(target) => Some(build_assignment(target, temp_ref(&enter_var, &location), &location)?),
        None => None,
    };
    let with_body = make_statements_sequence(vec![target_assignment, body], &location);

    let enter_value = maybe_suspend(
        call(
            attribute_lookup(temp_ref(&source_var, &location), hooks.enter, policy.attribute_lookup, &location),
            None,
            &location,
        ),
        is_async,
        WaitKind::Enter,
        &location,
    );

    let exit_value_exception = maybe_suspend(
        call(
            temp_ref(&exit_var, &exit_loc),
            Some(caught_exception_args(&exit_loc, &location)),
            &exit_loc,
        ),
        is_async,
        WaitKind::Exit,
        &location,
    );

    let exit_value_no_exception = maybe_suspend(
        call(
            temp_ref(&exit_var, &location),
            Some(constant(Value::Tuple(vec![Value::None, Value::None, Value::None]), &location)),
            &exit_loc,
        ),
        is_async,
        WaitKind::Exit,
        &location,
    );

    let exit_assignment = assign_temp(
        &exit_var,
        attribute_lookup(temp_ref(&source_var, &location), hooks.exit, policy.attribute_lookup, &location),
        &location,
    );
    let mut enter_assignment = assign_temp(&enter_var, enter_value, &location);
    if is_async && ctx.config.enter_cancellation == EnterCancellation::AttemptExit {
        enter_assignment = guard_enter_cancellation(enter_assignment, &exit_var, &location);
    }

    let mut statements = vec![assign_temp(&source_var, with_source, &location)];
    match policy.enter_exit_order {
        EnterExitOrder::ExitThenEnter => {
            statements.push(exit_assignment);
            statements.push(enter_assignment);
        }
        EnterExitOrder::EnterThenExit => {
            statements.push(enter_assignment);
            statements.push(exit_assignment);
        }
    }
    statements.push(assign_temp(&indicator_var, constant(Value::Bool(true), &location), &location));

    let normal_exit = make_conditional(
        IrNode::new(
            IrNodeKind::ComparisonIs {
                left: Box::new(temp_ref(&indicator_var, &location)),
                right: Box::new(constant(Value::Bool(true), &location)),
            },
            location.clone(),
        ),
        Some(expression_only(exit_value_no_exception, &location)),
        None,
        &location,
    );

    match with_body {
        Some(with_body) => {
            let handler = IrNode::new(
                IrNodeKind::Sequence {
                    statements: vec![
                        // keeps the final block from calling exit a second time
                        assign_temp(&indicator_var, constant(Value::Bool(false), &location), &location),
                        make_conditional(exit_value_exception, None, Some(make_reraise(&exit_loc)), &exit_loc),
                    ],
                },
                location.clone(),
            );
            statements.push(make_try_finally(
                make_try_except_single_handler(with_body, CATCH_ALL, handler, policy.publish_exception, &location),
                normal_exit,
                &location,
            ));
        }
        None => statements.push(normal_exit),
    }

    let releases = IrNode::new(
        IrNodeKind::Sequence {
            statements: [&source_var, &enter_var, &exit_var]
                .into_iter()
                .map(|v| release(v, &exit_loc))
                .collect(),
        },
        exit_loc.clone(),
    );

    let result = make_try_finally(
        IrNode::new(IrNodeKind::Sequence { statements }, location.clone()),
        releases,
        &location,
    );

    ctx.temps_mut().close_scope(scope)?;
    if ctx.config.verify_output {
        verify::verify_construct(&result, scope)?;
    }
    Ok(result)
}

/// Wrap the enter assignment so a cancellation delivered while suspended on
/// enter still reaches the exit hook before propagating.
fn guard_enter_cancellation(enter_assignment: IrNode, exit_var: &TempVariable, location: &Location) -> IrNode {
    let exit_call = suspend(
        call(
            temp_ref(exit_var, location),
            Some(caught_exception_args(location, location)),
            location,
        ),
        WaitKind::Exit,
        location,
    );
    let handler = IrNode::new(
        IrNodeKind::Sequence {
            statements: vec![expression_only(exit_call, location), make_reraise(location)],
        },
        location.clone(),
    );
    make_try_except_single_handler(enter_assignment, CANCELLED, handler, true, location)
}

/// Reformulate a whole statement: normalize the clause list, then wrap the
/// body once per clause, last-written clause innermost.
pub fn build_with_statement(
    ctx: &mut LoweringContext,
    raw: RawWith,
    body: Option<IrNode>,
) -> Result<IrNode, Box<dyn ReformErrorExt>> {
    let location = raw.location.clone();
    let input_shape = match &raw.shape {
        WithShape::Flattened(_) => InputShape::FlattenedSingle,
        WithShape::Items(items) => match items.first() {
            Some(first) => ctx.policy_for(first.revision, first.is_async)?.input_shape,
            None => {
                return Err(ContractViolation::new(
                    "with statement without clauses",
                    "reform.lower_with.build_with_statement",
                    Some(location),
                )
                .into());
            }
        },
    };
    let constructs = raw.normalize(input_shape)?;

    log::debug!(
        "reformulating with statement at {}: {} clause(s), revision {}",
        location,
        constructs.len(),
        constructs.first().map(|c| c.revision).unwrap_or(ctx.revision())
    );

    let mut body = body;
    for construct in constructs.iter().rev() {
        body = Some(build_with_node(ctx, construct, body)?);
    }
    body.ok_or_else(|| {
        ContractViolation::new(
            "with statement without clauses",
            "reform.lower_with.build_with_statement",
            Some(location),
        )
        .into()
    })
}

/// Boundary between the front-end tree and the engine.
///
/// At revisions whose front-end only knows single-clause statements, a
/// multi-clause statement is presented the way such a front-end would: as
/// nested flattened statements, outermost clause first.
pub fn lower_with_statement(node: &AstNode, ctx: &mut LoweringContext) -> Result<IrNode, Box<dyn ReformErrorExt>> {
    let (items, body, is_async) = match node.get_kind() {
        AstNodeKind::With { items, body, is_async } => (items, body, *is_async),
        other => {
            return Err(ContractViolation::new(
                format!("expected a with statement, found {}", other),
                "reform.lower_with.lower_with_statement",
                node.location.clone(),
            )
            .into());
        }
    };
    let location = node.location_or_default();
    let revision = ctx.revision();

    let mut context_exprs = Vec::with_capacity(items.len());
    let mut targets = Vec::with_capacity(items.len());
    for item in items.iter() {
        match item.get_kind() {
            AstNodeKind::WithItem { context, target } => {
                context_exprs.push(context.as_ref().clone());
                targets.push(target.as_deref().cloned());
            }
            other => {
                return Err(ContractViolation::new(
                    format!("expected a with item, found {}", other),
                    "reform.lower_with.lower_with_statement",
                    item.location.clone(),
                )
                .into());
            }
        }
    }

    let body = lower_block(body, ctx)?;
    let raw = RawWith::from_parts(context_exprs, targets, is_async, revision, location)?;

    match ctx.policy_for(revision, is_async)?.input_shape {
        InputShape::ExplicitList => build_with_statement(ctx, raw, body),
        InputShape::FlattenedSingle => {
            let constructs = match raw.shape {
                WithShape::Items(items) => items,
                WithShape::Flattened(construct) => vec![construct],
            };
            let mut body = body;
            for construct in constructs.into_iter().rev() {
                body = Some(build_with_statement(ctx, RawWith::flattened(construct), body)?);
            }
            body.ok_or_else(|| {
                ContractViolation::new(
                    "with statement without clauses",
                    "reform.lower_with.lower_with_statement",
                    node.location.clone(),
                )
                .into()
            })
        }
    }
}
