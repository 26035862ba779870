use std::io::Write;

use reform_core::config::{EnterCancellation, ReformConfig};
use reform_core::error::Level;
use reform_core::policy::SpecRevision;
use reform_core::{ContractViolation, generate_error_report};

#[test]
fn defaults_match_the_latest_fixed_revision() {
    let config = ReformConfig::default();
    assert_eq!(config.revision, SpecRevision::POST_FIX);
    assert!(!config.strict_legacy_diagnostics);
    assert_eq!(config.enter_cancellation, EnterCancellation::Propagate);
    assert!(config.verify_output);
}

#[test]
fn partial_file_keeps_defaults() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "revision": "3.6" }}"#).unwrap();

    let config = ReformConfig::load_from_file(file.path()).expect("config");
    assert_eq!(config.revision, "3.6".parse::<SpecRevision>().unwrap());
    assert!(config.verify_output);
    assert_eq!(config.enter_cancellation, EnterCancellation::Propagate);
}

#[test]
fn full_file_round_trips_every_field() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("reform.json");
    std::fs::write(
        &path,
        r#"{
            "revision": "3.5",
            "strict_legacy_diagnostics": true,
            "enter_cancellation": "attempt_exit",
            "verify_output": false
        }"#,
    )
    .unwrap();

    let config = ReformConfig::load_from_file(&path).expect("config");
    assert_eq!(
        config,
        ReformConfig::for_revision("3.5".parse().unwrap())
            .with_strict_legacy_diagnostics(true)
            .with_enter_cancellation(EnterCancellation::AttemptExit)
            .with_verify_output(false)
    );
}

#[test]
fn unknown_revision_in_file_is_a_config_error() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(file, r#"{{ "revision": "4.2" }}"#).unwrap();
    let err = ReformConfig::load_from_file(file.path()).unwrap_err();
    assert_eq!(err.level(), Level::Error);
    assert_eq!(err.issuer(), "reform.config");
}

#[test]
fn missing_file_is_reported() {
    let dir = tempfile::tempdir().unwrap();
    let err = ReformConfig::load_from_file(dir.path().join("absent.json")).unwrap_err();
    assert!(err.message().contains("read config"));
}

#[test]
fn cancellation_modes_parse_from_flags() {
    assert_eq!("propagate".parse::<EnterCancellation>(), Ok(EnterCancellation::Propagate));
    assert_eq!("attempt-exit".parse::<EnterCancellation>(), Ok(EnterCancellation::AttemptExit));
    assert!("retry".parse::<EnterCancellation>().is_err());
}

#[test]
fn error_report_has_prefix_level_location_and_message() {
    let err = ContractViolation::new(
        "scope closed twice",
        "reform.test",
        Some(reform_core::Location::new("a.rf".to_string(), 3, 1)),
    );
    assert_eq!(
        generate_error_report(&err),
        "REFORM | CRITICAL | a.rf:3:1 | scope closed twice"
    );
}
