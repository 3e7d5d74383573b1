//! Tests for error types

use splitdb::Error;

#[test]
fn test_not_confirmed_error() {
    let error = Error::NotConfirmed;
    let error_str = format!("{error}");
    assert!(error_str.contains("not confirmed as human"));
    assert!(error_str.contains("confirm_human()"));
}

#[test]
fn test_not_found_errors() {
    assert!(format!("{}", Error::ExperimentNotFound("headline".into())).contains("headline"));
    assert!(format!("{}", Error::GoalNotFound("paid".into())).contains("Goal not found: paid"));
    assert!(format!("{}", Error::ReportNotFound(12)).contains("#12"));
    assert!(format!("{}", Error::SubjectNotFound(3)).contains("#3"));
}

#[test]
fn test_empty_variants_error() {
    let error = Error::EmptyVariants("void".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("'void' has no variants"));
    assert!(error_str.contains("at least one variant"));
}

#[test]
fn test_corrupt_visit_state_error() {
    let error = Error::CorruptVisitState("unknown variant `teleport`".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Corrupt visit state"));
    assert!(error_str.contains("teleport"));
}

#[test]
fn test_invalid_input_error() {
    let error = Error::InvalidInput("goal name must not be empty".to_string());
    assert!(format!("{error}").contains("Invalid input"));
}

#[test]
fn test_storage_error() {
    let error = Error::StorageError("index mismatch".to_string());
    let error_str = format!("{error}");
    assert!(error_str.contains("Storage error"));
    assert!(error_str.contains("index mismatch"));
}

#[test]
fn test_serialization_error_from() {
    let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
    let error: Error = json_err.into();
    assert!(matches!(error, Error::Serialization(_)));
    assert!(format!("{error}").contains("Serialization error"));
}

#[test]
fn test_error_debug() {
    let error = Error::NotConfirmed;
    assert_eq!(format!("{error:?}"), "NotConfirmed");
}

#[test]
fn test_visit_interrupted_error() {
    let error = Error::VisitInterrupted {
        source: Box::new(Error::ExperimentNotFound("vanished".to_string())),
        update: Box::default(),
    };
    let error_str = format!("{error}");
    assert!(error_str.contains("Visit interrupted"));
    assert!(error_str.contains("vanished"));
    assert!(std::error::Error::source(&error).is_some());
}
