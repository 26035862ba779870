use reform_core::error::Level;
use reform_core::ir::node::{IrNode, IrNodeKind};
use reform_core::ir::temp_scope::ScopeId;
use reform_core::ir::verify::verify_construct;
use reform_core::ir::walk;
use reform_core::{ReformConfig, Script, reformulate_source};

fn lowered(src: &str) -> IrNode {
    let script = Script::from_source("v.rf", src);
    let module = reformulate_source(&script, ReformConfig::default()).expect("lowering failed");
    module.body[0].clone()
}

fn final_releases(node: &mut IrNode) -> &mut Vec<IrNode> {
    match &mut node.kind {
        IrNodeKind::TryFinally { final_branch, .. } => match &mut final_branch.kind {
            IrNodeKind::Sequence { statements } => statements,
            other => panic!("expected release sequence, got {:?}", other),
        },
        other => panic!("expected try/finally, got {:?}", other),
    }
}

#[test]
fn produced_trees_verify() {
    let node = lowered("with A() as a, B() as b { body() }");
    assert!(verify_construct(&node, ScopeId(2)).is_ok());

    let node = lowered("async with L() as c { c.go() }");
    assert!(verify_construct(&node, ScopeId(1)).is_ok());
}

#[test]
fn missing_release_is_reported() {
    let mut node = lowered("with R() as x { body() }");
    final_releases(&mut node).pop();
    let err = verify_construct(&node, ScopeId(1)).unwrap_err();
    assert_eq!(err.level(), Level::Critical);
    assert!(err.message().contains("released 0 time(s)"));
}

#[test]
fn double_release_is_reported() {
    let mut node = lowered("with R() as x { body() }");
    let releases = final_releases(&mut node);
    let again = releases[0].clone();
    releases.push(again);
    assert!(verify_construct(&node, ScopeId(1)).is_err());
}

#[test]
fn releasing_the_indicator_is_reported() {
    let mut node = lowered("with R() as x { body() }");
    let indicator = walk::find_all(&node, |n| {
        matches!(&n.kind, IrNodeKind::AssignTemp { variable, .. } if variable.name == "indicator")
    })
    .first()
    .and_then(|n| walk::temp_of(n).cloned())
    .expect("indicator temp");
    let location = node.location.clone();
    final_releases(&mut node).push(IrNode::new(IrNodeKind::Release { variable: indicator }, location));
    let err = verify_construct(&node, ScopeId(1)).unwrap_err();
    assert!(err.message().contains("must not be released"));
}

#[test]
fn release_outside_a_finally_is_reported() {
    let node = lowered("with R() as x { body() }");
    let (tried, final_branch) = match node.kind {
        IrNodeKind::TryFinally { tried, final_branch } => (*tried, *final_branch),
        other => panic!("expected try/finally, got {:?}", other),
    };
    let unguarded = IrNode::new(
        IrNodeKind::Sequence {
            statements: vec![tried, final_branch],
        },
        node.location.clone(),
    );
    assert!(verify_construct(&unguarded, ScopeId(1)).is_err());
}

#[test]
fn temps_from_later_scopes_are_foreign() {
    let node = lowered("with R() as x { body() }");
    let err = verify_construct(&node, ScopeId(0)).unwrap_err();
    assert!(err.message().contains("does not belong"));
}

fn clause_list(count: usize) -> String {
    let items: Vec<String> = (0..count).map(|i| format!("M{}() as m{}", i, i)).collect();
    format!("with {} {{ body() }}", items.join(", "))
}

#[test]
fn long_clause_lists_verify_every_layer() {
    let script = Script::from_source("long.rf", &clause_list(300));
    let config = ReformConfig::default();
    assert!(config.verify_output);
    let module = reformulate_source(&script, config).expect("lowering failed");
    assert_eq!(module.temp_scopes, 300);
    assert!(verify_construct(&module.body[0], ScopeId(300)).is_ok());
}

#[test]
fn outer_layer_is_checked_when_inner_layers_are_skipped() {
    let mut node = lowered("with A() as a, B() as b { body() }");
    final_releases(&mut node).pop();
    let err = verify_construct(&node, ScopeId(2)).unwrap_err();
    assert!(err.message().contains("with#2.exit"));
}
