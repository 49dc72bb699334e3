//! Tests for builder modules

use std::sync::Arc;
use std::time::Duration;

use container_dispatch::builders::{build_dispatcher, build_dispatcher_with_reaper, build_ledger};
use container_dispatch::config::DispatcherConfig;
use container_dispatch::core::{UsageLedger, WorkloadKind};
use container_dispatch::infra::{SimulatedEngine, StaticAuthorizer};
use container_dispatch::runtime::TokioSpawner;
use tokio_util::sync::CancellationToken;

#[tokio::test]
async fn test_build_dispatcher_registers_running_units_only() {
    let cfg = DispatcherConfig::default();
    // runtimealpha2 and all beta units are never provisioned
    let engine = Arc::new(
        SimulatedEngine::new()
            .with_latency(Duration::from_millis(1))
            .with_units(["runtimealpha1", "runtimealpha3"]),
    );

    let dispatcher = build_dispatcher(
        &cfg,
        StaticAuthorizer::from_config(&cfg.auth),
        engine,
        build_ledger(&cfg).unwrap(),
    )
    .await
    .unwrap();

    assert_eq!(dispatcher.kinds(), vec![WorkloadKind::Alpha, WorkloadKind::Beta]);
    assert_eq!(
        dispatcher.pool(WorkloadKind::Alpha).unwrap().list_available(),
        vec!["runtimealpha1", "runtimealpha3"]
    );
    assert!(dispatcher.pool(WorkloadKind::Beta).unwrap().list_available().is_empty());
    assert_eq!(dispatcher.gate(WorkloadKind::Alpha).unwrap().capacity(), 3);
}

#[tokio::test]
async fn test_build_dispatcher_rejects_invalid_config() {
    let mut cfg = DispatcherConfig::default();
    cfg.idle_timeout_secs = 0;

    let result = build_dispatcher(
        &cfg,
        StaticAuthorizer::new(),
        Arc::new(SimulatedEngine::new()),
        build_ledger(&cfg).unwrap(),
    )
    .await;
    assert!(result.is_err());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_configured_reap_interval_evicts_without_traffic() {
    let cfg = DispatcherConfig {
        idle_timeout_secs: 1,
        reap_interval_secs: Some(1),
        ..DispatcherConfig::default()
    };
    let engine = Arc::new(
        SimulatedEngine::new().with_units(cfg.kinds.values().flat_map(|k| k.units.clone())),
    );
    let token = CancellationToken::new();

    let dispatcher = build_dispatcher_with_reaper(
        &cfg,
        StaticAuthorizer::from_config(&cfg.auth),
        Arc::clone(&engine),
        build_ledger(&cfg).unwrap(),
        &TokioSpawner::current(),
        token.clone(),
    )
    .await
    .unwrap();
    assert_eq!(dispatcher.pool(WorkloadKind::Alpha).unwrap().list_available().len(), 3);

    // idle past 1s by the second tick
    tokio::time::sleep(Duration::from_millis(2_600)).await;
    token.cancel();

    for kind in [WorkloadKind::Alpha, WorkloadKind::Beta] {
        assert!(dispatcher.pool(kind).unwrap().list_available().is_empty());
    }
    assert!(!engine.exists("runtimealpha1"));
    assert_eq!(engine.remove_count(), 6);
}

#[tokio::test]
async fn test_no_reap_interval_leaves_idle_units() {
    let cfg = DispatcherConfig {
        idle_timeout_secs: 1,
        reap_interval_secs: None,
        ..DispatcherConfig::default()
    };
    let engine = Arc::new(
        SimulatedEngine::new().with_units(cfg.kinds.values().flat_map(|k| k.units.clone())),
    );

    let dispatcher = build_dispatcher_with_reaper(
        &cfg,
        StaticAuthorizer::from_config(&cfg.auth),
        Arc::clone(&engine),
        build_ledger(&cfg).unwrap(),
        &TokioSpawner::current(),
        CancellationToken::new(),
    )
    .await
    .unwrap();

    tokio::time::sleep(Duration::from_millis(1_200)).await;
    assert_eq!(dispatcher.pool(WorkloadKind::Beta).unwrap().list_available().len(), 3);
    assert_eq!(engine.remove_count(), 0);
}

#[test]
fn test_build_ledger_uses_file_when_configured() {
    let dir = std::env::temp_dir().join(format!("dispatch-builder-{}", uuid::Uuid::new_v4()));
    let path = dir.join("usage.log");
    let cfg = DispatcherConfig {
        usage_log_path: Some(path.clone()),
        ..DispatcherConfig::default()
    };

    let ledger = build_ledger(&cfg).unwrap();
    ledger
        .record(container_dispatch::core::build_usage_record(
            uuid::Uuid::new_v4(),
            "user1",
            WorkloadKind::Alpha,
            "runtimealpha1",
            container_dispatch::core::UsageOutcome::Succeeded,
            10,
            20,
        ))
        .unwrap();

    assert!(path.exists());
}
