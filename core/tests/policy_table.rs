use reform_core::error::Level;
use reform_core::policy::{
    AttributeLookupForm, EnterExitOrder, InputShape, PositionAttribution, SpecRevision, policy_matrix, resolve,
};

fn rev(text: &str) -> SpecRevision {
    text.parse().expect("known revision")
}

#[test]
fn oldest_revision_uses_legacy_everything() {
    let policy = resolve(rev("2.6"), false, false).expect("policy");
    assert_eq!(policy.attribute_lookup, AttributeLookupForm::Plain);
    assert_eq!(policy.enter_exit_order, EnterExitOrder::ExitThenEnter);
    assert_eq!(policy.position_attribution, PositionAttribution::CompatibleRef);
    assert_eq!(policy.input_shape, InputShape::FlattenedSingle);
    assert!(!policy.publish_exception);
}

#[test]
fn special_lookup_and_publishing_start_at_2_7() {
    let policy = resolve(rev("2.7"), false, false).expect("policy");
    assert_eq!(policy.attribute_lookup, AttributeLookupForm::Special);
    assert!(policy.publish_exception);
}

#[test]
fn multi_item_shape_starts_at_3_3() {
    assert_eq!(resolve(rev("3.2"), false, false).unwrap().input_shape, InputShape::FlattenedSingle);
    assert_eq!(resolve(rev("3.3"), false, false).unwrap().input_shape, InputShape::ExplicitList);
}

#[test]
fn reorder_applies_to_sync_only() {
    assert_eq!(resolve(rev("3.5"), false, false).unwrap().enter_exit_order, EnterExitOrder::ExitThenEnter);
    assert_eq!(resolve(rev("3.6"), false, false).unwrap().enter_exit_order, EnterExitOrder::EnterThenExit);
    assert_eq!(resolve(rev("3.6"), true, false).unwrap().enter_exit_order, EnterExitOrder::ExitThenEnter);
    assert_eq!(resolve(rev("3.9"), true, false).unwrap().enter_exit_order, EnterExitOrder::ExitThenEnter);
}

#[test]
fn position_attribution_and_strict_override() {
    assert_eq!(
        resolve(rev("3.6"), false, false).unwrap().position_attribution,
        PositionAttribution::CompatibleRef
    );
    assert_eq!(
        resolve(rev("3.7"), false, false).unwrap().position_attribution,
        PositionAttribution::DeepestBodyRef
    );
    assert_eq!(
        resolve(rev("3.7"), false, true).unwrap().position_attribution,
        PositionAttribution::CompatibleRef
    );
    // the override stops applying once the fix is final
    assert_eq!(
        resolve(rev("3.8"), false, true).unwrap().position_attribution,
        PositionAttribution::DeepestBodyRef
    );
}

#[test]
fn async_below_3_5_is_a_contract_violation() {
    let err = resolve(rev("3.4"), true, false).unwrap_err();
    assert_eq!(err.level(), Level::Critical);
    assert!(resolve(rev("3.5"), true, false).is_ok());
}

#[test]
fn unknown_revisions_are_rejected() {
    assert!("4.0".parse::<SpecRevision>().is_err());
    assert!("2.5".parse::<SpecRevision>().is_err());
    assert!("three".parse::<SpecRevision>().is_err());
    let err = resolve(SpecRevision::new(3, 12), false, false).unwrap_err();
    assert_eq!(err.level(), Level::Critical);
}

#[test]
fn revisions_order_and_print() {
    assert!(rev("2.7") < rev("3.0"));
    assert!(rev("3.9") > rev("3.8"));
    assert_eq!(rev("3.6").to_string(), "3.6");
    assert_eq!(SpecRevision::default(), SpecRevision::POST_FIX);
}

#[test]
fn matrix_skips_async_where_it_does_not_exist() {
    let rows = policy_matrix(false);
    let sync_rows = rows.iter().filter(|(_, is_async, _)| !is_async).count();
    let async_rows = rows.iter().filter(|(_, is_async, _)| *is_async).count();
    assert_eq!(sync_rows, SpecRevision::known().len());
    // 3.5 through 3.9
    assert_eq!(async_rows, 5);
    assert!(rows.iter().all(|(r, a, _)| !*a || *r >= SpecRevision::ASYNC));
}

#[test]
fn resolution_is_deterministic() {
    for revision in SpecRevision::known() {
        assert_eq!(
            resolve(revision, false, true).unwrap(),
            resolve(revision, false, true).unwrap()
        );
    }
}
