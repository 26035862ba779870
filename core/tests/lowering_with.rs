use std::collections::HashSet;

use reform_core::ast::{AstNode, AstNodeKind};
use reform_core::error::Level;
use reform_core::ir::lower::{LoweringContext, RawConstruct, RawWith, build_with_statement, tree_helpers};
use reform_core::ir::node::{IrNode, IrNodeKind, WaitKind};
use reform_core::ir::walk;
use reform_core::location::Location;
use reform_core::policy::{AttributeLookupForm, SpecRevision};
use reform_core::{IrModule, ReformConfig, Script, reformulate_source};

fn rev(text: &str) -> SpecRevision {
    text.parse().expect("known revision")
}

fn lower_at(src: &str, revision: &str) -> IrModule {
    let script = Script::from_source("t.rf", src);
    reformulate_source(&script, ReformConfig::for_revision(rev(revision))).expect("lowering failed")
}

fn labels(node: &IrNode) -> Vec<String> {
    let mut out = Vec::new();
    walk::walk(node, &mut |n| out.push(n.label()));
    out
}

/// `(outer tried statements, outer final branch)` of one reformulated clause.
fn outer(node: &IrNode) -> (&Vec<IrNode>, &IrNode) {
    match &node.kind {
        IrNodeKind::TryFinally { tried, final_branch } => match &tried.kind {
            IrNodeKind::Sequence { statements } => (statements, final_branch.as_ref()),
            other => panic!("expected sequence, got {:?}", other),
        },
        other => panic!("expected try/finally, got {:?}", other),
    }
}

fn assigned_temp(node: &IrNode) -> String {
    match &node.kind {
        IrNodeKind::AssignTemp { variable, .. } => variable.name.clone(),
        other => panic!("expected temp assignment, got {:?}", other),
    }
}

/// The tried branch of the catch-all handler, i.e. target binding plus body.
fn with_body(node: &IrNode) -> &IrNode {
    let (statements, _) = outer(node);
    match &statements[statements.len() - 1].kind {
        IrNodeKind::TryFinally { tried, .. } => match &tried.kind {
            IrNodeKind::TryExcept { tried, .. } => tried.as_ref(),
            other => panic!("expected try/except, got {:?}", other),
        },
        other => panic!("expected try/finally, got {:?}", other),
    }
}

fn call_node(name: &str) -> AstNode {
    AstNode::new(
        AstNodeKind::Call {
            callee: Box::new(AstNode::new(AstNodeKind::Identifier { name: name.to_string() }, None, None)),
            args: Vec::new(),
        },
        None,
        None,
    )
}

fn construct(context: &str, target: Option<&str>, revision: SpecRevision) -> RawConstruct {
    RawConstruct {
        context: call_node(context),
        target: target.map(|t| AstNode::new(AstNodeKind::Identifier { name: t.to_string() }, None, None)),
        is_async: false,
        revision,
        location: Location::default(),
    }
}

fn body_call(name: &str) -> IrNode {
    let loc = Location::default();
    let call = tree_helpers::call(
        IrNode::new(IrNodeKind::VariableRef { name: name.to_string() }, loc.clone()),
        None,
        &loc,
    );
    IrNode::new(
        IrNodeKind::Sequence {
            statements: vec![tree_helpers::expression_only(call, &loc)],
        },
        loc,
    )
}

#[test]
fn single_clause_follows_protocol_layout() {
    let module = lower_at("with R() as x { body() }", "3.8");
    assert_eq!(module.len(), 1);
    let node = &module.body[0];
    let (statements, final_branch) = outer(node);

    assert_eq!(statements.len(), 5);
    assert_eq!(assigned_temp(&statements[0]), "source");
    // post-reorder sync form calls enter before looking up exit
    assert_eq!(assigned_temp(&statements[1]), "enter");
    assert_eq!(assigned_temp(&statements[2]), "exit");
    assert_eq!(assigned_temp(&statements[3]), "indicator");

    match &final_branch.kind {
        IrNodeKind::Sequence { statements } => {
            let released: Vec<String> = statements
                .iter()
                .map(|s| match &s.kind {
                    IrNodeKind::Release { variable } => variable.name.clone(),
                    other => panic!("expected release, got {:?}", other),
                })
                .collect();
            assert_eq!(released, vec!["source", "enter", "exit"]);
        }
        other => panic!("expected release sequence, got {:?}", other),
    }

    match &with_body(node).kind {
        IrNodeKind::Sequence { statements } => {
            assert!(matches!(&statements[0].kind, IrNodeKind::AssignVariable { name, .. } if name == "x"));
        }
        other => panic!("expected with body sequence, got {:?}", other),
    }

    let handlers = walk::find_all(node, |n| matches!(&n.kind, IrNodeKind::TryExcept { .. }));
    assert_eq!(handlers.len(), 1);
    assert_eq!(handlers[0].label(), "TryExcept BaseException publish");
    assert_eq!(walk::count(node, |n| matches!(n.kind, IrNodeKind::Reraise)), 1);
    assert_eq!(walk::count(node, |n| matches!(n.kind, IrNodeKind::ComparisonIs { .. })), 1);
    assert_eq!(walk::count(node, |n| matches!(n.kind, IrNodeKind::Suspend { .. })), 0);
}

#[test]
fn exit_lookup_precedes_enter_before_reorder() {
    let module = lower_at("with R() as x { body() }", "3.5");
    let (statements, _) = outer(&module.body[0]);
    assert_eq!(assigned_temp(&statements[1]), "exit");
    assert_eq!(assigned_temp(&statements[2]), "enter");
}

#[test]
fn async_keeps_exit_first_and_suspends_three_times() {
    let module = lower_at("async with L() as conn { conn.use() }", "3.8");
    let node = &module.body[0];
    let (statements, _) = outer(node);
    assert_eq!(assigned_temp(&statements[1]), "exit");
    assert_eq!(assigned_temp(&statements[2]), "enter");

    let waits: Vec<WaitKind> = walk::find_all(node, |n| matches!(n.kind, IrNodeKind::Suspend { .. }))
        .iter()
        .map(|n| match n.kind {
            IrNodeKind::Suspend { wait, .. } => wait,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(waits.len(), 3);
    assert_eq!(waits.iter().filter(|w| **w == WaitKind::Enter).count(), 1);
    assert_eq!(waits.iter().filter(|w| **w == WaitKind::Exit).count(), 2);

    let hooks: Vec<String> = walk::find_all(node, |n| matches!(n.kind, IrNodeKind::AttributeLookup { .. }))
        .iter()
        .filter_map(|n| match &n.kind {
            IrNodeKind::AttributeLookup { attribute, .. } if attribute.starts_with("__") => Some(attribute.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(hooks, vec!["__aexit__", "__aenter__"]);
}

#[test]
fn oldest_revision_uses_plain_lookup_and_silent_handler() {
    let module = lower_at("with R() as x { body() }", "2.6");
    let node = &module.body[0];
    let forms: Vec<AttributeLookupForm> = walk::find_all(node, |n| matches!(n.kind, IrNodeKind::AttributeLookup { .. }))
        .iter()
        .map(|n| match n.kind {
            IrNodeKind::AttributeLookup { form, .. } => form,
            _ => unreachable!(),
        })
        .collect();
    assert_eq!(forms, vec![AttributeLookupForm::Plain, AttributeLookupForm::Plain]);
    assert!(
        walk::find_all(node, |n| matches!(n.kind, IrNodeKind::TryExcept { publish: false, .. })).len() == 1
    );
}

#[test]
fn user_attribute_access_stays_plain() {
    let module = lower_at("with R() as x { x.close() }", "3.8");
    let plain = walk::find_all(&module.body[0], |n| {
        matches!(&n.kind, IrNodeKind::AttributeLookup { form: AttributeLookupForm::Plain, attribute, .. } if attribute == "close")
    });
    assert_eq!(plain.len(), 1);
}

#[test]
fn two_clauses_nest_first_outermost() {
    let module = lower_at("with A() as a, B() as b { body() }", "3.8");
    assert_eq!(module.len(), 1);
    let node = &module.body[0];

    let sources: Vec<String> = walk::find_all(node, |n| {
        matches!(&n.kind, IrNodeKind::AssignTemp { variable, .. } if variable.name == "source")
    })
    .iter()
    .map(|n| match &n.kind {
        IrNodeKind::AssignTemp { source, .. } => match &source.kind {
            IrNodeKind::Call { called, .. } => match &called.kind {
                IrNodeKind::VariableRef { name } => name.clone(),
                other => panic!("expected name, got {:?}", other),
            },
            other => panic!("expected call, got {:?}", other),
        },
        _ => unreachable!(),
    })
    .collect();
    assert_eq!(sources, vec!["A", "B"]);

    // B's subtree is the last statement of A's with body
    let inner = match &with_body(node).kind {
        IrNodeKind::Sequence { statements } => {
            assert!(matches!(&statements[0].kind, IrNodeKind::AssignVariable { name, .. } if name == "a"));
            &statements[1]
        }
        other => panic!("expected sequence, got {:?}", other),
    };
    let (inner_statements, _) = outer(inner);
    match &inner_statements[0].kind {
        IrNodeKind::AssignTemp { variable, .. } => {
            // innermost clause is built first and gets the lower scope
            assert_eq!(variable.qualified_name(), "with#1.source");
        }
        other => panic!("expected temp assignment, got {:?}", other),
    }
    let (outer_statements, _) = outer(node);
    assert_eq!(
        match &outer_statements[0].kind {
            IrNodeKind::AssignTemp { variable, .. } => variable.qualified_name(),
            _ => unreachable!(),
        },
        "with#2.source"
    );
    assert_eq!(module.temp_scopes, 2);
    assert_eq!(module.temps, 8);
}

#[test]
fn n_clauses_give_n_nested_constructs() {
    let module = lower_at("with A(), B(), C(), D() { body() }", "3.9");
    let node = &module.body[0];
    assert_eq!(
        walk::count(node, |n| matches!(&n.kind, IrNodeKind::TryExcept { exception_name, .. } if exception_name == "BaseException")),
        4
    );
    assert_eq!(walk::count(node, |n| matches!(n.kind, IrNodeKind::Release { .. })), 12);
    assert_eq!(walk::count(node, |n| matches!(n.kind, IrNodeKind::AssignVariable { .. })), 0);
}

#[test]
fn exit_positions_follow_the_last_body_line() {
    let src = "with R() as x {\n    first()\n    second()\n}\n";

    let fixed = lower_at(src, "3.8");
    let reraise = walk::find_all(&fixed.body[0], |n| matches!(n.kind, IrNodeKind::Reraise));
    assert_eq!(reraise[0].location.line, 3);
    let releases = walk::find_all(&fixed.body[0], |n| matches!(n.kind, IrNodeKind::Release { .. }));
    assert!(releases.iter().all(|r| r.location.line == 3));
    // enter side keeps the construct position
    let (statements, _) = outer(&fixed.body[0]);
    assert_eq!(statements[1].location.line, 1);

    let legacy = lower_at(src, "3.6");
    let releases = walk::find_all(&legacy.body[0], |n| matches!(n.kind, IrNodeKind::Release { .. }));
    assert!(releases.iter().all(|r| r.location.line == 1));

    let script = Script::from_source("t.rf", src);
    let strict = reformulate_source(
        &script,
        ReformConfig::for_revision(rev("3.7")).with_strict_legacy_diagnostics(true),
    )
    .unwrap();
    let reraise = walk::find_all(&strict.body[0], |n| matches!(n.kind, IrNodeKind::Reraise));
    assert_eq!(reraise[0].location.line, 1);
}

#[test]
fn empty_body_uses_construct_position() {
    let module = lower_at("\nwith R() { pass }", "3.9");
    let node = &module.body[0];
    let releases = walk::find_all(node, |n| matches!(n.kind, IrNodeKind::Release { .. }));
    assert!(releases.iter().all(|r| r.location.line == 2));
}

#[test]
fn empty_with_body_has_no_handler() {
    let module = lower_at("with R() { pass }", "3.8");
    let node = &module.body[0];
    let (statements, _) = outer(node);
    assert_eq!(statements.len(), 5);
    assert_eq!(assigned_temp(&statements[3]), "indicator");
    assert!(matches!(statements[4].kind, IrNodeKind::Conditional { .. }));
    assert_eq!(walk::count(node, |n| matches!(n.kind, IrNodeKind::TryExcept { .. })), 0);
    assert_eq!(walk::count(node, |n| matches!(n.kind, IrNodeKind::Reraise)), 0);

    // a binding target alone still needs the handler
    let bound = lower_at("with R() as x { pass }", "3.8");
    assert_eq!(walk::count(&bound.body[0], |n| matches!(n.kind, IrNodeKind::TryExcept { .. })), 1);
}

#[test]
fn flattened_single_clause_matches_front_end_output() {
    let revision = rev("3.2");
    let from_source = lower_at("with R() as x { body() }", "3.2");

    let mut ctx = LoweringContext::new(ReformConfig::for_revision(revision));
    let built = build_with_statement(
        &mut ctx,
        RawWith::flattened(construct("R", Some("x"), revision)),
        Some(body_call("body")),
    )
    .unwrap();
    assert_eq!(labels(&built), labels(&from_source.body[0]));
}

#[test]
fn flattened_and_explicit_single_clause_agree() {
    let revision = rev("3.8");
    let mut flat_ctx = LoweringContext::new(ReformConfig::for_revision(revision));
    let flat = build_with_statement(
        &mut flat_ctx,
        RawWith::flattened(construct("R", Some("x"), revision)),
        Some(body_call("body")),
    )
    .unwrap();

    let c = construct("R", Some("x"), revision);
    let raw = RawWith::from_parts(vec![c.context], vec![c.target], false, revision, Location::default()).unwrap();
    let mut list_ctx = LoweringContext::new(ReformConfig::for_revision(revision));
    let listed = build_with_statement(&mut list_ctx, raw, Some(body_call("body"))).unwrap();

    assert_eq!(flat, listed);
}

#[test]
fn explicit_list_before_multi_item_is_rejected() {
    let revision = rev("3.2");
    let a = construct("A", None, revision);
    let b = construct("B", None, revision);
    let raw = RawWith::from_parts(
        vec![a.context, b.context],
        vec![None, None],
        false,
        revision,
        Location::default(),
    )
    .unwrap();
    let mut ctx = LoweringContext::new(ReformConfig::for_revision(revision));
    let err = build_with_statement(&mut ctx, raw, None).unwrap_err();
    assert_eq!(err.level(), Level::Critical);
}

#[test]
fn legacy_front_end_presents_multi_clause_as_nested_statements() {
    let module = lower_at("with A() as a, B() as b { body() }", "3.2");
    let node = &module.body[0];
    assert_eq!(walk::count(node, |n| matches!(n.kind, IrNodeKind::TryExcept { .. })), 2);
    assert_eq!(module.temp_scopes, 2);
}

#[test]
fn mismatched_clause_lists_are_contract_violations() {
    let revision = rev("3.8");
    let err = RawWith::from_parts(vec![call_node("A")], vec![], false, revision, Location::default()).unwrap_err();
    assert_eq!(err.level(), Level::Critical);
    let err = RawWith::from_parts(vec![], vec![], false, revision, Location::default()).unwrap_err();
    assert_eq!(err.level(), Level::Critical);
}

#[test]
fn async_before_it_existed_fails_the_unit() {
    let script = Script::from_source("t.rf", "async with L() { pass }");
    let err = reformulate_source(&script, ReformConfig::for_revision(rev("3.4"))).unwrap_err();
    assert_eq!(err.level(), Level::Critical);
}

#[test]
fn lowering_is_deterministic() {
    let src = "with A() as a, B() { x = a.read() }\nasync with L() as c { c.go() }";
    assert_eq!(lower_at(src, "3.8").body, lower_at(src, "3.8").body);
}

#[test]
fn every_temp_reference_stays_inside_its_construct() {
    let module = lower_at("with A() as a { with B() as b { body() } }\nwith C() { pass }", "3.8");
    for (index, node) in module.body.iter().enumerate() {
        let scopes: HashSet<usize> = walk::find_all(node, |n| walk::temp_of(n).is_some())
            .iter()
            .filter_map(|n| walk::temp_of(n).map(|v| v.scope.0))
            .collect();
        if index == 0 {
            assert_eq!(scopes, [1, 2].into_iter().collect::<HashSet<usize>>());
        } else {
            assert_eq!(scopes, [3].into_iter().collect::<HashSet<usize>>());
        }
    }
}
