//! Tests for configuration validation

use std::collections::{BTreeMap, HashMap};
use std::time::Duration;

use container_dispatch::config::{AuthConfig, DispatcherConfig, KindConfig};
use container_dispatch::core::WorkloadKind;

fn single_kind(capacity: u32, units: &[&str]) -> DispatcherConfig {
    let mut kinds = BTreeMap::new();
    kinds.insert(
        WorkloadKind::Alpha,
        KindConfig {
            capacity,
            units: units.iter().map(|u| u.to_string()).collect(),
        },
    );
    DispatcherConfig {
        kinds,
        idle_timeout_secs: 60,
        reap_interval_secs: None,
        usage_log_path: None,
        auth: AuthConfig::default(),
    }
}

#[test]
fn test_default_config_mirrors_reference_deployment() {
    let cfg = DispatcherConfig::default();
    assert!(cfg.validate().is_ok());
    assert_eq!(cfg.idle_timeout(), Duration::from_secs(60));
    assert_eq!(cfg.kinds[&WorkloadKind::Alpha].capacity, 3);
    assert_eq!(
        cfg.kinds[&WorkloadKind::Beta].units,
        vec!["runtimebeta1", "runtimebeta2", "runtimebeta3"]
    );
    assert_eq!(cfg.auth.users["admin"], vec!["alpha", "beta"]);
}

#[test]
fn test_kind_config_invalid_capacity() {
    assert!(single_kind(0, &["u1"]).validate().is_err());
}

#[test]
fn test_kind_config_requires_units() {
    assert!(single_kind(1, &[]).validate().is_err());
    assert!(single_kind(1, &["  "]).validate().is_err());
}

#[test]
fn test_duplicate_unit_across_kinds_rejected() {
    let mut cfg = single_kind(1, &["shared"]);
    cfg.kinds.insert(
        WorkloadKind::Beta,
        KindConfig {
            capacity: 1,
            units: vec!["shared".into()],
        },
    );
    let err = cfg.validate().unwrap_err();
    assert!(err.contains("shared"));
}

#[test]
fn test_empty_kinds_rejected() {
    let mut cfg = DispatcherConfig::default();
    cfg.kinds.clear();
    assert!(cfg.validate().is_err());
}

#[test]
fn test_zero_timers_rejected() {
    let mut cfg = DispatcherConfig::default();
    cfg.idle_timeout_secs = 0;
    assert!(cfg.validate().is_err());

    let mut cfg = DispatcherConfig::default();
    cfg.reap_interval_secs = Some(0);
    assert!(cfg.validate().is_err());
}

#[test]
fn test_config_from_json() {
    let json = r#"{
        "kinds": {
            "alpha": { "capacity": 2, "units": ["a1", "a2"] },
            "beta": { "capacity": 1, "units": ["b1"] }
        },
        "idle_timeout_secs": 30,
        "reap_interval_secs": 5
    }"#;

    let cfg = DispatcherConfig::from_json_str(json).unwrap();
    assert_eq!(cfg.kinds[&WorkloadKind::Beta].capacity, 1);
    assert_eq!(cfg.reap_interval(), Some(Duration::from_secs(5)));
    assert!(cfg.usage_log_path.is_none());
    // auth falls back to the default table
    assert!(cfg.auth.users.contains_key("user1"));

    let limits = cfg.limits();
    assert_eq!(limits.capacities[&WorkloadKind::Alpha], 2);
    assert_eq!(limits.idle_timeout, Duration::from_secs(30));
}

#[test]
fn test_config_from_json_rejects_unknown_kind() {
    let json = r#"{
        "kinds": { "gamma": { "capacity": 1, "units": ["g1"] } },
        "idle_timeout_secs": 30
    }"#;
    assert!(DispatcherConfig::from_json_str(json).is_err());
}

#[test]
fn test_env_overrides() {
    let env: HashMap<&str, &str> = [
        ("DISPATCH_IDLE_TIMEOUT_SECS", "15"),
        ("DISPATCH_REAP_INTERVAL_SECS", " 3 "),
        ("DISPATCH_USAGE_LOG", "/tmp/usage.log"),
    ]
    .into_iter()
    .collect();

    let mut cfg = DispatcherConfig::default();
    cfg.apply_env_overrides(|key| env.get(key).map(|v| v.to_string()))
        .unwrap();
    assert_eq!(cfg.idle_timeout_secs, 15);
    assert_eq!(cfg.reap_interval_secs, Some(3));
    assert_eq!(
        cfg.usage_log_path.as_deref(),
        Some(std::path::Path::new("/tmp/usage.log"))
    );
}

#[test]
fn test_env_override_must_be_numeric() {
    let mut cfg = DispatcherConfig::default();
    let result = cfg.apply_env_overrides(|key| {
        (key == "DISPATCH_IDLE_TIMEOUT_SECS").then(|| "soon".to_string())
    });
    assert!(result.is_err());
    assert_eq!(cfg.idle_timeout_secs, 60);
}
