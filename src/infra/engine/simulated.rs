//! In-process engine that hosts named units and runs the reference workloads.
//!
//! Units are plain table entries with a running flag. Executing a workload
//! sleeps for the kind's latency and then formats an answer from the prompt.
//! Fault injection hooks let tests kill units or make executions fail.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::core::{
    EngineError, ExecutionUnitEngine, InvocationDescriptor, WorkloadArgs, WorkloadKind,
};

/// Reference workload: answer a prompt the way each runtime does.
#[must_use]
pub fn generate(kind: WorkloadKind, prompt: &str) -> String {
    let answer = match kind {
        WorkloadKind::Alpha => "buy ice cream",
        WorkloadKind::Beta => "get a hamburger",
    };
    format!("Given your question: {prompt}. I think the best answer is to {answer}.")
}

#[derive(Debug, Default)]
struct SimUnit {
    running: bool,
    fail_executions: bool,
    /// Executions currently inside this unit.
    active: u32,
}

/// Engine hosting simulated units in memory.
#[derive(Debug, Default)]
pub struct SimulatedEngine {
    units: Mutex<HashMap<String, SimUnit>>,
    /// Replaces every kind's reference latency when set.
    latency_override: Option<Duration>,
    /// Delay before answering a liveness query.
    probe_latency: Option<Duration>,
    executions: AtomicU64,
    stops: AtomicU64,
    removes: AtomicU64,
    overlaps: AtomicU64,
}

impl SimulatedEngine {
    /// Engine using each kind's reference latency.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a fixed latency for every workload.
    #[must_use]
    pub fn with_latency(mut self, latency: Duration) -> Self {
        self.latency_override = Some(latency);
        self
    }

    /// Make every `is_running` query wait `latency` before answering.
    #[must_use]
    pub fn with_probe_latency(mut self, latency: Duration) -> Self {
        self.probe_latency = Some(latency);
        self
    }

    /// Provision running units.
    #[must_use]
    pub fn with_units<I, S>(self, unit_ids: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for id in unit_ids {
            self.provision(id);
        }
        self
    }

    /// Provision (or restart) one running unit.
    pub fn provision(&self, unit_id: impl Into<String>) {
        let mut units = self.units.lock();
        let unit = units.entry(unit_id.into()).or_default();
        unit.running = true;
    }

    /// Mark a unit as no longer running, as if it died out-of-band.
    pub fn kill(&self, unit_id: &str) {
        if let Some(unit) = self.units.lock().get_mut(unit_id) {
            unit.running = false;
        }
    }

    /// Drop a unit from the engine entirely, as if removed out-of-band.
    pub fn forget(&self, unit_id: &str) {
        self.units.lock().remove(unit_id);
    }

    /// Make every execution inside `unit_id` fail, or stop doing so.
    pub fn fail_executions(&self, unit_id: &str, fail: bool) {
        if let Some(unit) = self.units.lock().get_mut(unit_id) {
            unit.fail_executions = fail;
        }
    }

    /// Whether the engine still knows the unit.
    #[must_use]
    pub fn exists(&self, unit_id: &str) -> bool {
        self.units.lock().contains_key(unit_id)
    }

    /// Number of `execute` calls that started a workload.
    #[must_use]
    pub fn execution_count(&self) -> u64 {
        self.executions.load(Ordering::Relaxed)
    }

    /// Number of successful `stop` calls.
    #[must_use]
    pub fn stop_count(&self) -> u64 {
        self.stops.load(Ordering::Relaxed)
    }

    /// Number of successful `remove` calls.
    #[must_use]
    pub fn remove_count(&self) -> u64 {
        self.removes.load(Ordering::Relaxed)
    }

    /// Times a workload started in a unit that was already busy.
    #[must_use]
    pub fn overlapping_executions(&self) -> u64 {
        self.overlaps.load(Ordering::Relaxed)
    }

    fn latency_for(&self, kind: WorkloadKind) -> Duration {
        self.latency_override
            .unwrap_or_else(|| kind.spec().simulated_latency)
    }

    /// Claim the unit for one execution.
    fn enter(&self, unit_id: &str) -> Result<ActiveExecution<'_>, EngineError> {
        let mut units = self.units.lock();
        let unit = units
            .get_mut(unit_id)
            .ok_or_else(|| EngineError::NotFound(unit_id.to_string()))?;
        if !unit.running {
            return Err(EngineError::Failed(format!("unit `{unit_id}` is not running")));
        }
        if unit.fail_executions {
            return Err(EngineError::Failed(format!("injected failure in `{unit_id}`")));
        }
        if unit.active > 0 {
            self.overlaps.fetch_add(1, Ordering::Relaxed);
        }
        unit.active += 1;
        self.executions.fetch_add(1, Ordering::Relaxed);
        Ok(ActiveExecution {
            engine: self,
            unit_id: unit_id.to_string(),
        })
    }
}

/// Marks a unit busy until dropped, including when the execution is abandoned.
struct ActiveExecution<'a> {
    engine: &'a SimulatedEngine,
    unit_id: String,
}

impl Drop for ActiveExecution<'_> {
    fn drop(&mut self) {
        if let Some(unit) = self.engine.units.lock().get_mut(&self.unit_id) {
            unit.active = unit.active.saturating_sub(1);
        }
    }
}

#[async_trait]
impl ExecutionUnitEngine for SimulatedEngine {
    async fn is_running(&self, unit_id: &str) -> Result<bool, EngineError> {
        if let Some(delay) = self.probe_latency {
            tokio::time::sleep(delay).await;
        }
        self.units
            .lock()
            .get(unit_id)
            .map(|u| u.running)
            .ok_or_else(|| EngineError::NotFound(unit_id.to_string()))
    }

    async fn execute(
        &self,
        unit_id: &str,
        descriptor: &InvocationDescriptor,
        args: &WorkloadArgs,
    ) -> Result<String, EngineError> {
        let prompt = args
            .prompt()
            .ok_or_else(|| {
                EngineError::Failed(format!(
                    "{} requires a `prompt` argument",
                    descriptor.entrypoint
                ))
            })?
            .to_string();
        let _active = self.enter(unit_id)?;
        tracing::debug!(unit = unit_id, entrypoint = %descriptor.entrypoint, "executing workload");

        tokio::time::sleep(self.latency_for(descriptor.kind)).await;
        Ok(generate(descriptor.kind, &prompt))
    }

    async fn stop(&self, unit_id: &str) -> Result<(), EngineError> {
        let mut units = self.units.lock();
        let unit = units
            .get_mut(unit_id)
            .ok_or_else(|| EngineError::NotFound(unit_id.to_string()))?;
        unit.running = false;
        self.stops.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn remove(&self, unit_id: &str) -> Result<(), EngineError> {
        self.units
            .lock()
            .remove(unit_id)
            .ok_or_else(|| EngineError::NotFound(unit_id.to_string()))?;
        self.removes.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }
}
