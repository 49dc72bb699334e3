//! Dispatcher configuration structures.

use std::collections::{BTreeMap, HashMap};
use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::core::{AppResult, DispatchLimits, WorkloadKind};

/// Environment variable naming a JSON configuration file.
pub const CONFIG_PATH_ENV: &str = "DISPATCH_CONFIG";
/// Environment override for [`DispatcherConfig::idle_timeout_secs`].
pub const IDLE_TIMEOUT_ENV: &str = "DISPATCH_IDLE_TIMEOUT_SECS";
/// Environment override for [`DispatcherConfig::reap_interval_secs`].
pub const REAP_INTERVAL_ENV: &str = "DISPATCH_REAP_INTERVAL_SECS";
/// Environment override for [`DispatcherConfig::usage_log_path`].
pub const USAGE_LOG_ENV: &str = "DISPATCH_USAGE_LOG";

/// Per-kind configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KindConfig {
    /// Maximum concurrent executions.
    pub capacity: u32,
    /// Unit ids provisioned for the kind, in checkout order.
    pub units: Vec<String>,
}

impl KindConfig {
    /// Reference provisioning for `kind`: its default capacity and three units
    /// named `<prefix>1..=3`.
    #[must_use]
    pub fn reference(kind: WorkloadKind) -> Self {
        let spec = kind.spec();
        Self {
            capacity: spec.default_capacity,
            units: (1..=3).map(|i| format!("{}{i}", spec.unit_prefix)).collect(),
        }
    }

    /// Validate kind configuration values.
    pub fn validate(&self) -> Result<(), String> {
        if self.capacity == 0 {
            return Err("capacity must be greater than 0".into());
        }
        if self.units.is_empty() {
            return Err("at least one unit must be listed".into());
        }
        if self.units.iter().any(|u| u.trim().is_empty()) {
            return Err("unit ids must not be blank".into());
        }
        Ok(())
    }
}

/// User → capability table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Capabilities held by each known user.
    pub users: HashMap<String, Vec<String>>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        let users = [
            ("user1", vec!["alpha"]),
            ("user2", vec!["beta"]),
            ("admin", vec!["alpha", "beta"]),
        ]
        .into_iter()
        .map(|(user, caps)| (user.to_string(), caps.into_iter().map(String::from).collect()))
        .collect();
        Self { users }
    }
}

/// Root dispatcher configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DispatcherConfig {
    /// Served kinds and their provisioning.
    pub kinds: BTreeMap<WorkloadKind, KindConfig>,
    /// Idle seconds after which an available unit is evicted.
    pub idle_timeout_secs: u64,
    /// Period of the background idle sweep; `None` sweeps only after dispatches.
    #[serde(default)]
    pub reap_interval_secs: Option<u64>,
    /// JSON-lines usage ledger location; `None` keeps usage in memory.
    #[serde(default)]
    pub usage_log_path: Option<PathBuf>,
    /// Known users.
    #[serde(default)]
    pub auth: AuthConfig,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            kinds: WorkloadKind::ALL
                .iter()
                .map(|k| (*k, KindConfig::reference(*k)))
                .collect(),
            idle_timeout_secs: 60,
            reap_interval_secs: None,
            usage_log_path: None,
            auth: AuthConfig::default(),
        }
    }
}

impl DispatcherConfig {
    /// Validate all kinds and ensure at least one kind is served.
    pub fn validate(&self) -> Result<(), String> {
        if self.kinds.is_empty() {
            return Err("at least one workload kind must be configured".into());
        }
        for (kind, cfg) in &self.kinds {
            cfg.validate()
                .map_err(|e| format!("kind `{kind}` invalid: {e}"))?;
        }
        let mut seen = std::collections::HashSet::new();
        for unit in self.kinds.values().flat_map(|k| k.units.iter()) {
            if !seen.insert(unit) {
                return Err(format!("unit `{unit}` is listed more than once"));
            }
        }
        if self.idle_timeout_secs == 0 {
            return Err("idle_timeout_secs must be greater than 0".into());
        }
        if self.reap_interval_secs == Some(0) {
            return Err("reap_interval_secs must be greater than 0".into());
        }
        Ok(())
    }

    /// Parse dispatcher configuration from a JSON string and validate.
    pub fn from_json_str(input: &str) -> Result<Self, String> {
        let cfg: Self = serde_json::from_str(input).map_err(|e| format!("parse error: {e}"))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Load configuration from the process environment.
    ///
    /// Reads a `.env` file if present, starts from the JSON file named by
    /// [`CONFIG_PATH_ENV`] (or the defaults), then applies the individual
    /// `DISPATCH_*` overrides and validates the result.
    ///
    /// # Errors
    ///
    /// Unreadable or invalid configuration file, malformed overrides, or a
    /// configuration that fails validation.
    pub fn load() -> AppResult<Self> {
        let _ = dotenvy::dotenv();
        let mut cfg: Self = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => {
                let raw = std::fs::read_to_string(&path)
                    .with_context(|| format!("reading dispatcher config `{path}`"))?;
                serde_json::from_str(&raw)
                    .with_context(|| format!("parsing dispatcher config `{path}`"))?
            }
            Err(_) => Self::default(),
        };
        cfg.apply_env_overrides(|key| std::env::var(key).ok())?;
        cfg.validate().map_err(anyhow::Error::msg)?;
        Ok(cfg)
    }

    /// Apply `DISPATCH_*` overrides read through `lookup`.
    ///
    /// # Errors
    ///
    /// An override that does not parse as a number.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> AppResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(IDLE_TIMEOUT_ENV) {
            self.idle_timeout_secs = raw
                .trim()
                .parse()
                .with_context(|| format!("{IDLE_TIMEOUT_ENV}=`{raw}` is not a number"))?;
        }
        if let Some(raw) = lookup(REAP_INTERVAL_ENV) {
            self.reap_interval_secs = Some(
                raw.trim()
                    .parse()
                    .with_context(|| format!("{REAP_INTERVAL_ENV}=`{raw}` is not a number"))?,
            );
        }
        if let Some(raw) = lookup(USAGE_LOG_ENV) {
            self.usage_log_path = Some(PathBuf::from(raw));
        }
        Ok(())
    }

    /// Idle threshold as a duration.
    #[must_use]
    pub const fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Background sweep period, if enabled.
    #[must_use]
    pub fn reap_interval(&self) -> Option<Duration> {
        self.reap_interval_secs.map(Duration::from_secs)
    }

    /// Capacity and idle settings for the dispatcher.
    #[must_use]
    pub fn limits(&self) -> DispatchLimits {
        DispatchLimits {
            capacities: self.kinds.iter().map(|(k, cfg)| (*k, cfg.capacity)).collect(),
            idle_timeout: self.idle_timeout(),
        }
    }
}
