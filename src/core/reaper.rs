//! Idle unit reclamation across all pools.

use std::sync::Arc;
use std::time::Duration;

use crate::core::{ExecutionUnitEngine, UnitId, UnitPool};

/// Evicts available units that have sat unused past a threshold.
pub struct IdleReaper<G: ?Sized> {
    pools: Vec<Arc<UnitPool<G>>>,
    idle_timeout: Duration,
}

/// Summary of one sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReapReport {
    /// Units deregistered and torn down cleanly.
    pub evicted: Vec<UnitId>,
    /// Units deregistered whose teardown the engine rejected.
    pub failed: Vec<UnitId>,
}

impl ReapReport {
    /// Total units removed from their pools by the sweep.
    #[must_use]
    pub fn total(&self) -> usize {
        self.evicted.len() + self.failed.len()
    }
}

impl<G> IdleReaper<G>
where
    G: ExecutionUnitEngine + ?Sized,
{
    /// Create a reaper over `pools`.
    pub const fn new(pools: Vec<Arc<UnitPool<G>>>, idle_timeout: Duration) -> Self {
        Self { pools, idle_timeout }
    }

    /// Configured idle threshold.
    pub const fn idle_timeout(&self) -> Duration {
        self.idle_timeout
    }

    /// Evict every available unit whose idle time at `now_ms` exceeds the threshold.
    ///
    /// Checked-out units are never candidates. Engine failures are logged and
    /// the sweep carries on with the remaining units.
    pub async fn sweep(&self, now_ms: u128) -> ReapReport {
        let mut report = ReapReport::default();
        for pool in &self.pools {
            for outcome in pool.evict_idle(now_ms, self.idle_timeout).await {
                match outcome.result {
                    Ok(()) => {
                        tracing::info!(
                            kind = %pool.kind(),
                            unit = %outcome.unit_id,
                            "evicted idle unit"
                        );
                        report.evicted.push(outcome.unit_id);
                    }
                    Err(e) => {
                        tracing::error!(
                            kind = %pool.kind(),
                            unit = %outcome.unit_id,
                            error = %e,
                            "failed to stop and remove idle unit"
                        );
                        report.failed.push(outcome.unit_id);
                    }
                }
            }
        }
        if report.total() > 0 {
            tracing::debug!(
                evicted = report.evicted.len(),
                failed = report.failed.len(),
                "idle sweep finished"
            );
        }
        report
    }
}
