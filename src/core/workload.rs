//! Workload kinds, their static capability table, and invocation payloads.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::DispatchError;

/// A named class of invocable work.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkloadKind {
    /// Short-latency answer generator.
    Alpha,
    /// Long-latency answer generator.
    Beta,
}

/// Static facts about one workload kind.
#[derive(Debug, Clone, Copy)]
pub struct WorkloadSpec {
    /// Kind this row describes.
    pub kind: WorkloadKind,
    /// Runtime name used in descriptors and logs.
    pub runtime_name: &'static str,
    /// Capability a user must hold to invoke the kind.
    pub capability: &'static str,
    /// Prefix of the unit names provisioned for this kind.
    pub unit_prefix: &'static str,
    /// Concurrency cap applied when configuration does not override it.
    pub default_capacity: u32,
    /// Latency of a single generation in the reference workload.
    pub simulated_latency: Duration,
}

const WORKLOADS: &[WorkloadSpec] = &[
    WorkloadSpec {
        kind: WorkloadKind::Alpha,
        runtime_name: "RuntimeAlpha",
        capability: "alpha",
        unit_prefix: "runtimealpha",
        default_capacity: 3,
        simulated_latency: Duration::from_millis(750),
    },
    WorkloadSpec {
        kind: WorkloadKind::Beta,
        runtime_name: "RuntimeBeta",
        capability: "beta",
        unit_prefix: "runtimebeta",
        default_capacity: 3,
        simulated_latency: Duration::from_millis(1750),
    },
];

impl WorkloadKind {
    /// Every kind, in table order.
    pub const ALL: [Self; 2] = [Self::Alpha, Self::Beta];

    /// Static table row for this kind.
    #[must_use]
    pub const fn spec(self) -> &'static WorkloadSpec {
        // rows are laid out in variant order
        &WORKLOADS[self as usize]
    }

    /// Capability required to invoke this kind.
    #[must_use]
    pub fn capability(self) -> &'static str {
        self.spec().capability
    }

    /// Lower-case wire name (`alpha`, `beta`).
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Alpha => "alpha",
            Self::Beta => "beta",
        }
    }

    /// Invocation descriptor handed to the engine for this kind.
    #[must_use]
    pub fn descriptor(self) -> InvocationDescriptor {
        InvocationDescriptor {
            kind: self,
            entrypoint: format!("runtimes.{}.generate", self.spec().runtime_name),
        }
    }
}

impl fmt::Display for WorkloadKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for WorkloadKind {
    type Err = DispatchError;

    /// Accepts the wire name or the runtime name, case-insensitively.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        WORKLOADS
            .iter()
            .find(|row| {
                row.kind.as_str().eq_ignore_ascii_case(s)
                    || row.runtime_name.eq_ignore_ascii_case(s)
            })
            .map(|row| row.kind)
            .ok_or_else(|| DispatchError::UnknownWorkloadKind(s.to_string()))
    }
}

/// Opaque instruction telling an engine which workload to run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InvocationDescriptor {
    /// Kind being invoked.
    pub kind: WorkloadKind,
    /// Backend-specific entrypoint.
    pub entrypoint: String,
}

/// Caller-supplied workload arguments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkloadArgs(BTreeMap<String, String>);

impl WorkloadArgs {
    /// Key every workload reads its input from.
    pub const PROMPT: &'static str = "prompt";

    /// Empty argument map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Arguments holding only a prompt.
    #[must_use]
    pub fn with_prompt(prompt: impl Into<String>) -> Self {
        Self::new().with(Self::PROMPT, prompt)
    }

    /// Add or replace one argument.
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.0.insert(key.into(), value.into());
        self
    }

    /// Look up an argument.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// The `prompt` argument, if present.
    #[must_use]
    pub fn prompt(&self) -> Option<&str> {
        self.get(Self::PROMPT)
    }
}

impl From<BTreeMap<String, String>> for WorkloadArgs {
    fn from(map: BTreeMap<String, String>) -> Self {
        Self(map)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capability_table() {
        assert_eq!(WorkloadKind::Alpha.capability(), "alpha");
        assert_eq!(WorkloadKind::Beta.capability(), "beta");
    }

    #[test]
    fn test_parse_wire_and_runtime_names() {
        assert_eq!("alpha".parse::<WorkloadKind>().unwrap(), WorkloadKind::Alpha);
        assert_eq!("RuntimeBeta".parse::<WorkloadKind>().unwrap(), WorkloadKind::Beta);
        assert_eq!("BETA".parse::<WorkloadKind>().unwrap(), WorkloadKind::Beta);
    }

    #[test]
    fn test_parse_unknown_kind() {
        let err = "UnknownRuntime".parse::<WorkloadKind>().unwrap_err();
        assert!(matches!(
            err,
            DispatchError::UnknownWorkloadKind(ref name) if name == "UnknownRuntime"
        ));
    }

    #[test]
    fn test_descriptor_names_runtime() {
        let d = WorkloadKind::Alpha.descriptor();
        assert_eq!(d.kind, WorkloadKind::Alpha);
        assert_eq!(d.entrypoint, "runtimes.RuntimeAlpha.generate");
    }

    #[test]
    fn test_args_serialize_as_plain_map() {
        let args = WorkloadArgs::with_prompt("hi").with("lang", "en");
        let json = serde_json::to_string(&args).unwrap();
        assert_eq!(json, r#"{"lang":"en","prompt":"hi"}"#);
        assert_eq!(args.prompt(), Some("hi"));
    }
}
