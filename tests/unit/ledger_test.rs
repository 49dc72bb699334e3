//! Tests for usage ledger backends

use std::path::PathBuf;

use container_dispatch::core::{build_usage_record, UsageLedger, UsageOutcome, WorkloadKind};
use container_dispatch::infra::ledger::{InMemoryUsageLedger, JsonlUsageLedger};
use uuid::Uuid;

fn temp_ledger_path() -> PathBuf {
    std::env::temp_dir()
        .join(format!("dispatch-ledger-{}", Uuid::new_v4()))
        .join("usage.log")
}

#[test]
fn test_build_usage_record() {
    let id = Uuid::new_v4();
    let record = build_usage_record(
        id,
        "admin",
        WorkloadKind::Beta,
        "runtimebeta2",
        UsageOutcome::Failed,
        5_000,
        6_750,
    );

    assert_eq!(record.request_id, id);
    assert_eq!(record.user, "admin");
    assert_eq!(record.kind, WorkloadKind::Beta);
    assert_eq!(record.unit_id, "runtimebeta2");
    assert_eq!(record.outcome, UsageOutcome::Failed);
    assert_eq!(record.duration_ms, 1_750);
}

#[test]
fn test_in_memory_ledger_keeps_append_order() {
    let ledger = InMemoryUsageLedger::new();
    assert!(ledger.is_empty());

    for user in ["user1", "user2", "admin"] {
        ledger
            .record(build_usage_record(
                Uuid::new_v4(),
                user,
                WorkloadKind::Alpha,
                "runtimealpha1",
                UsageOutcome::Succeeded,
                0,
                1,
            ))
            .unwrap();
    }

    let users: Vec<String> = ledger.records().into_iter().map(|r| r.user).collect();
    assert_eq!(users, vec!["user1", "user2", "admin"]);
}

#[test]
fn test_jsonl_ledger_appends_lines() {
    let path = temp_ledger_path();
    let ledger = JsonlUsageLedger::open(&path).unwrap();

    let first = build_usage_record(
        Uuid::new_v4(),
        "user1",
        WorkloadKind::Alpha,
        "runtimealpha1",
        UsageOutcome::Succeeded,
        100,
        850,
    );
    let second = build_usage_record(
        Uuid::new_v4(),
        "user2",
        WorkloadKind::Beta,
        "runtimebeta1",
        UsageOutcome::Cancelled,
        200,
        300,
    );
    ledger.record(first.clone()).unwrap();
    ledger.record(second.clone()).unwrap();

    let raw = std::fs::read_to_string(&path).unwrap();
    assert_eq!(raw.lines().count(), 2);
    assert!(raw.lines().next().unwrap().contains(r#""outcome":"succeeded""#));

    assert_eq!(ledger.read_all().unwrap(), vec![first, second]);
}

#[test]
fn test_jsonl_ledger_reopen_appends() {
    let path = temp_ledger_path();
    let record = build_usage_record(
        Uuid::new_v4(),
        "admin",
        WorkloadKind::Alpha,
        "runtimealpha3",
        UsageOutcome::Succeeded,
        1,
        2,
    );

    JsonlUsageLedger::open(&path).unwrap().record(record.clone()).unwrap();
    let reopened = JsonlUsageLedger::open(&path).unwrap();
    reopened.record(record).unwrap();

    assert_eq!(reopened.read_all().unwrap().len(), 2);
    assert_eq!(reopened.path(), path.as_path());
}
