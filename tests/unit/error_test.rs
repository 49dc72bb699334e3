//! Tests for error types

use container_dispatch::core::{DispatchError, EngineError, ErrorKind, WorkloadKind};

#[test]
fn test_capacity_exceeded_error() {
    let err = DispatchError::CapacityExceeded(WorkloadKind::Alpha);
    assert_eq!(
        format!("{}", err),
        "maximum number of active executions reached for alpha"
    );
    assert_eq!(err.kind(), ErrorKind::CapacityExceeded);
}

#[test]
fn test_permission_denied_error() {
    let err = DispatchError::PermissionDenied {
        user: "user2".into(),
        capability: "alpha".into(),
    };
    assert_eq!(
        format!("{}", err),
        "permission denied: user `user2` lacks capability `alpha`"
    );
    assert_eq!(err.kind(), ErrorKind::PermissionDenied);
}

#[test]
fn test_error_kind_mapping() {
    let cases = [
        (DispatchError::AuthenticationFailed("x".into()), ErrorKind::AuthenticationFailed),
        (DispatchError::UnknownWorkloadKind("gamma".into()), ErrorKind::UnknownWorkloadKind),
        (DispatchError::NoAvailableUnit(WorkloadKind::Beta), ErrorKind::NoAvailableUnit),
        (DispatchError::ExecutionFailed(WorkloadKind::Beta), ErrorKind::ExecutionFailed),
        (DispatchError::Cancelled, ErrorKind::Cancelled),
    ];
    for (err, kind) in cases {
        assert_eq!(err.kind(), kind);
    }
}

#[test]
fn test_execution_failed_hides_engine_detail() {
    let err = DispatchError::ExecutionFailed(WorkloadKind::Alpha);
    assert_eq!(format!("{}", err), "an error occurred while executing alpha");
}

#[test]
fn test_engine_error_display() {
    let err = EngineError::NotFound("runtimealpha1".into());
    assert_eq!(format!("{}", err), "execution unit not found: runtimealpha1");
}

#[test]
fn test_error_kind_serializes_by_name() {
    let json = serde_json::to_string(&ErrorKind::NoAvailableUnit).unwrap();
    assert_eq!(json, r#""NoAvailableUnit""#);
}
