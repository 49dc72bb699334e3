//! Per-kind registry of pre-provisioned execution units.
//!
//! Each pool owns its units' state behind one short-held `parking_lot::Mutex`.
//! The lock is never held across an engine call: checkout moves a candidate to
//! the checked-out set first and probes liveness afterwards, and eviction
//! deregisters the unit before stopping it.

use std::collections::{BTreeSet, HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use crate::core::engine::probe_alive;
use crate::core::{DispatchError, EngineError, ExecutionUnitEngine, WorkloadKind};
use crate::util::clock::{elapsed_ms, now_ms};

/// Identifier of an execution unit.
pub type UnitId = String;

/// Lifecycle state of an execution unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum UnitState {
    /// Waiting in the pool.
    Available,
    /// Held by exactly one dispatch.
    CheckedOut,
    /// Gone for good.
    Evicted,
}

/// Snapshot of one execution unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutionUnit {
    /// Unit identifier.
    pub id: UnitId,
    /// Kind the unit is dedicated to.
    pub kind: WorkloadKind,
    /// Last time the unit came back from use (ms since epoch).
    pub last_used_at_ms: u128,
    /// Current state.
    pub state: UnitState,
}

/// Mutable pool contents, shared with outstanding leases.
#[derive(Debug, Default)]
struct PoolState {
    /// Available units in checkout order.
    available: VecDeque<ExecutionUnit>,
    checked_out: HashMap<UnitId, ExecutionUnit>,
    evicted: BTreeSet<UnitId>,
}

impl PoolState {
    fn contains_live(&self, unit_id: &str) -> bool {
        self.checked_out.contains_key(unit_id) || self.available.iter().any(|u| u.id == unit_id)
    }

    /// Move a checked-out unit back to the tail of the available queue.
    fn put_back(&mut self, unit_id: &str, now_ms: u128) -> u128 {
        let Some(mut unit) = self.checked_out.remove(unit_id) else {
            panic!("execution unit `{unit_id}` returned while not checked out");
        };
        unit.last_used_at_ms = unit.last_used_at_ms.max(now_ms);
        unit.state = UnitState::Available;
        let stamp = unit.last_used_at_ms;
        self.available.push_back(unit);
        stamp
    }

    /// Retire a checked-out unit without returning it.
    fn retire(&mut self, unit_id: &str) {
        let removed = self.checked_out.remove(unit_id);
        assert!(
            removed.is_some(),
            "execution unit `{unit_id}` retired while not checked out"
        );
        self.evicted.insert(unit_id.to_string());
    }
}

/// Units of one kind plus the engine that hosts them.
pub struct UnitPool<G: ?Sized> {
    kind: WorkloadKind,
    engine: Arc<G>,
    state: Arc<Mutex<PoolState>>,
}

impl<G> UnitPool<G>
where
    G: ExecutionUnitEngine + ?Sized,
{
    /// Create an empty pool for `kind`.
    pub fn new(kind: WorkloadKind, engine: Arc<G>) -> Self {
        Self {
            kind,
            engine,
            state: Arc::new(Mutex::new(PoolState::default())),
        }
    }

    /// Kind served by this pool.
    pub const fn kind(&self) -> WorkloadKind {
        self.kind
    }

    /// Add a provisioned unit at the tail of the pool.
    ///
    /// Returns `false` when a unit with the same id is already live. A
    /// previously evicted id is accepted as a freshly provisioned unit.
    pub fn register(&self, unit_id: impl Into<UnitId>, now_ms: u128) -> bool {
        let unit_id = unit_id.into();
        let mut state = self.state.lock();
        if state.contains_live(&unit_id) {
            tracing::warn!(
                kind = %self.kind,
                unit = %unit_id,
                "duplicate unit registration ignored"
            );
            return false;
        }
        state.evicted.remove(&unit_id);
        state.available.push_back(ExecutionUnit {
            id: unit_id,
            kind: self.kind,
            last_used_at_ms: now_ms,
            state: UnitState::Available,
        });
        true
    }

    /// Take the first live available unit.
    ///
    /// Candidates the engine no longer reports as running are dropped from
    /// the pool and the search moves on. The candidate is already leased
    /// while its liveness is probed, so dropping this future mid-probe puts
    /// it back.
    ///
    /// # Errors
    ///
    /// [`DispatchError::NoAvailableUnit`] once no live candidate remains.
    pub async fn checkout(&self) -> Result<UnitLease, DispatchError> {
        loop {
            let mut candidate = {
                let mut state = self.state.lock();
                let Some(mut unit) = state.available.pop_front() else {
                    return Err(DispatchError::NoAvailableUnit(self.kind));
                };
                unit.state = UnitState::CheckedOut;
                let id = unit.id.clone();
                state.checked_out.insert(id.clone(), unit);
                UnitLease {
                    unit_id: id,
                    kind: self.kind,
                    state: Arc::clone(&self.state),
                    settled: false,
                }
            };

            if probe_alive(self.engine.as_ref(), candidate.id()).await {
                tracing::debug!(kind = %self.kind, unit = %candidate.unit_id, "unit checked out");
                return Ok(candidate);
            }

            tracing::warn!(
                kind = %self.kind,
                unit = %candidate.unit_id,
                "unit not running; dropped from pool"
            );
            candidate.settled = true;
            self.state.lock().retire(&candidate.unit_id);
        }
    }

    /// Return a leased unit and stamp its last-used time.
    ///
    /// Returns the unit's resulting `last_used_at_ms`, which never moves
    /// backwards even if `now_ms` does.
    pub fn return_unit(&self, mut lease: UnitLease, now_ms: u128) -> u128 {
        assert_eq!(lease.kind, self.kind, "lease returned to a pool of another kind");
        lease.settled = true;
        let stamp = self.state.lock().put_back(&lease.unit_id, now_ms);
        tracing::debug!(
            kind = %self.kind,
            unit = %lease.unit_id,
            last_used_at_ms = stamp,
            "unit returned"
        );
        stamp
    }

    /// Put back a leased unit that never ran anything, leaving its
    /// last-used time untouched.
    pub fn restore(&self, mut lease: UnitLease) {
        assert_eq!(lease.kind, self.kind, "lease restored to a pool of another kind");
        lease.settled = true;
        self.state.lock().put_back(&lease.unit_id, 0);
        tracing::debug!(kind = %self.kind, unit = %lease.unit_id, "unused unit restored");
    }

    /// Retire a leased unit instead of returning it, tearing it down in the engine.
    ///
    /// # Errors
    ///
    /// Engine failures other than not-found; the unit is retired regardless.
    pub async fn discard(&self, mut lease: UnitLease) -> Result<(), EngineError> {
        assert_eq!(lease.kind, self.kind, "lease discarded into a pool of another kind");
        lease.settled = true;
        self.state.lock().retire(&lease.unit_id);
        tracing::info!(kind = %self.kind, unit = %lease.unit_id, "leased unit discarded");
        self.teardown(&lease.unit_id).await
    }

    /// Ids of available units in checkout order.
    pub fn list_available(&self) -> Vec<UnitId> {
        self.state.lock().available.iter().map(|u| u.id.clone()).collect()
    }

    /// Snapshot of a unit, including units that are checked out or evicted.
    pub fn unit(&self, unit_id: &str) -> Option<ExecutionUnit> {
        let state = self.state.lock();
        if let Some(unit) = state.available.iter().find(|u| u.id == unit_id) {
            return Some(unit.clone());
        }
        if let Some(unit) = state.checked_out.get(unit_id) {
            return Some(unit.clone());
        }
        state.evicted.contains(unit_id).then(|| ExecutionUnit {
            id: unit_id.to_string(),
            kind: self.kind,
            last_used_at_ms: 0,
            state: UnitState::Evicted,
        })
    }

    /// Number of units currently checked out.
    pub fn checked_out_count(&self) -> usize {
        self.state.lock().checked_out.len()
    }

    /// Evict one available unit: deregister it, then stop and remove it.
    ///
    /// Returns `Ok(false)` when the unit is not currently available.
    ///
    /// # Errors
    ///
    /// Engine failures other than not-found; the unit is deregistered regardless.
    pub async fn evict(&self, unit_id: &str) -> Result<bool, EngineError> {
        {
            let mut state = self.state.lock();
            let Some(pos) = state.available.iter().position(|u| u.id == unit_id) else {
                return Ok(false);
            };
            state.available.remove(pos);
            state.evicted.insert(unit_id.to_string());
        }
        self.teardown(unit_id).await.map(|()| true)
    }

    /// Deregister every available unit idle longer than `idle_timeout` at
    /// `now_ms`, then tear each one down.
    ///
    /// Selection and deregistration happen under a single lock acquisition so
    /// a unit checked out concurrently is never selected.
    pub async fn evict_idle(&self, now_ms: u128, idle_timeout: Duration) -> Vec<EvictionOutcome> {
        let threshold = idle_timeout.as_millis();
        let victims: Vec<UnitId> = {
            let mut state = self.state.lock();
            let (idle, keep): (VecDeque<_>, VecDeque<_>) = state
                .available
                .drain(..)
                .partition(|u| elapsed_ms(u.last_used_at_ms, now_ms) > threshold);
            state.available = keep;
            let ids: Vec<UnitId> = idle.into_iter().map(|u| u.id).collect();
            state.evicted.extend(ids.iter().cloned());
            ids
        };

        let mut outcomes = Vec::with_capacity(victims.len());
        for unit_id in victims {
            let result = self.teardown(&unit_id).await;
            outcomes.push(EvictionOutcome { unit_id, result });
        }
        outcomes
    }

    /// Stop then remove a deregistered unit. Not-found counts as done.
    async fn teardown(&self, unit_id: &str) -> Result<(), EngineError> {
        match self.engine.stop(unit_id).await {
            Ok(()) => {}
            Err(EngineError::NotFound(_)) => {
                tracing::warn!(kind = %self.kind, unit = unit_id, "unit already gone before stop");
                return Ok(());
            }
            Err(e) => return Err(e),
        }
        match self.engine.remove(unit_id).await {
            Ok(()) => {
                tracing::info!(kind = %self.kind, unit = unit_id, "stopped and removed unit");
                Ok(())
            }
            Err(EngineError::NotFound(_)) => {
                tracing::warn!(
                    kind = %self.kind,
                    unit = unit_id,
                    "unit already gone before remove"
                );
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

/// Result of tearing down one idle unit.
#[derive(Debug, Clone)]
pub struct EvictionOutcome {
    /// Evicted unit.
    pub unit_id: UnitId,
    /// Engine outcome of stop + remove.
    pub result: Result<(), EngineError>,
}

/// Exclusive hold on a checked-out unit.
///
/// Hand it back with [`UnitPool::return_unit`] or [`UnitPool::discard`]. A
/// lease dropped without either (for example when the owning future is
/// dropped) puts the unit back in its pool so it is never leaked.
#[derive(Debug)]
#[must_use = "a lease must be returned to its pool"]
pub struct UnitLease {
    unit_id: UnitId,
    kind: WorkloadKind,
    state: Arc<Mutex<PoolState>>,
    settled: bool,
}

impl UnitLease {
    /// Leased unit id.
    pub fn id(&self) -> &str {
        &self.unit_id
    }

    /// Kind of the leased unit.
    pub const fn kind(&self) -> WorkloadKind {
        self.kind
    }
}

impl Drop for UnitLease {
    fn drop(&mut self) {
        if self.settled || std::thread::panicking() {
            return;
        }
        tracing::warn!(
            kind = %self.kind,
            unit = %self.unit_id,
            "lease dropped without return; unit put back"
        );
        self.state.lock().put_back(&self.unit_id, now_ms());
    }
}
