use reform_core::error::Level;
use reform_core::ir::temp_scope::{ScopeId, TempScopeAllocator, ValueKind};

#[test]
fn scopes_are_numbered_from_one() {
    let mut temps = TempScopeAllocator::new();
    assert_eq!(temps.new_scope("with"), ScopeId(1));
    assert_eq!(temps.new_scope("with"), ScopeId(2));
    assert_eq!(temps.scope_count(), 2);
}

#[test]
fn allocation_yields_distinct_variables() {
    let mut temps = TempScopeAllocator::new();
    let first = temps.new_scope("with");
    let second = temps.new_scope("with");

    let a = temps.allocate(first, "source", ValueKind::Object).unwrap();
    let b = temps.allocate(second, "source", ValueKind::Object).unwrap();
    assert_ne!(a, b);
    assert_ne!(a.id, b.id);
    assert_eq!(a.qualified_name(), "with#1.source");
    assert_eq!(b.qualified_name(), "with#2.source");
    assert_eq!(temps.temp_count(), 2);
}

#[test]
fn bool_temps_carry_no_release_obligation() {
    let mut temps = TempScopeAllocator::new();
    let scope = temps.new_scope("with");
    let flag = temps.allocate(scope, "indicator", ValueKind::Bool).unwrap();
    let object = temps.allocate(scope, "enter", ValueKind::Object).unwrap();
    assert!(!flag.needs_release());
    assert!(object.needs_release());
}

#[test]
fn duplicate_names_in_one_scope_fail() {
    let mut temps = TempScopeAllocator::new();
    let scope = temps.new_scope("with");
    temps.allocate(scope, "exit", ValueKind::Object).unwrap();
    let err = temps.allocate(scope, "exit", ValueKind::Object).unwrap_err();
    assert_eq!(err.level(), Level::Critical);
}

#[test]
fn closed_scopes_refuse_allocation() {
    let mut temps = TempScopeAllocator::new();
    let scope = temps.new_scope("with");
    assert!(!temps.is_closed(scope));
    temps.close_scope(scope).unwrap();
    assert!(temps.is_closed(scope));

    let err = temps.allocate(scope, "source", ValueKind::Object).unwrap_err();
    assert_eq!(err.level(), Level::Critical);
    assert!(err.message().contains("closed"));
    assert!(temps.close_scope(scope).is_err());
}

#[test]
fn unknown_scopes_are_rejected() {
    let mut temps = TempScopeAllocator::new();
    assert!(temps.allocate(ScopeId(3), "source", ValueKind::Object).is_err());
    assert!(temps.close_scope(ScopeId(0)).is_err());
    assert!(!temps.is_closed(ScopeId(7)));
}
