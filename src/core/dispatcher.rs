//! Request orchestration: authorize, admit, lease a unit, execute, account, reap.
//!
//! The dispatcher is the only entry point into the core. Each workload kind
//! gets its own lane (an admission gate plus a unit pool); lanes never block
//! one another.
//!
//! Resource release is unconditional once a unit has been leased: the usage
//! record is appended, the unit goes back to its pool and the admission slot
//! is released whether the workload succeeded, failed or was cancelled. The
//! permit and lease guards also release on drop, so a dispatch future that is
//! dropped mid-flight still leaks nothing.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::core::engine::probe_alive;
use crate::core::{
    build_usage_record, AdmissionGate, Authorizer, DispatchError, ExecutionUnitEngine, IdleReaper,
    UnitLease, UnitPool, UsageLedger, UsageOutcome, UsageRecord, WorkloadArgs, WorkloadKind,
};
use crate::util::clock::now_ms;

/// Capacity and reclamation settings for a dispatcher.
#[derive(Debug, Clone)]
pub struct DispatchLimits {
    /// Concurrency cap per served kind. Kinds absent here are not served.
    pub capacities: BTreeMap<WorkloadKind, u32>,
    /// Idle time after which an available unit is evicted.
    pub idle_timeout: Duration,
}

impl Default for DispatchLimits {
    fn default() -> Self {
        Self {
            capacities: WorkloadKind::ALL
                .iter()
                .map(|k| (*k, k.spec().default_capacity))
                .collect(),
            idle_timeout: Duration::from_secs(60),
        }
    }
}

/// Gate and pool serving one kind.
struct Lane<G: ?Sized> {
    gate: Arc<AdmissionGate>,
    pool: Arc<UnitPool<G>>,
}

/// How the engine call ended.
enum Execution {
    Completed(String),
    Failed(crate::core::EngineError),
    Cancelled,
}

impl Execution {
    const fn outcome(&self) -> UsageOutcome {
        match self {
            Self::Completed(_) => UsageOutcome::Succeeded,
            Self::Failed(_) => UsageOutcome::Failed,
            Self::Cancelled => UsageOutcome::Cancelled,
        }
    }
}

/// Sole entry point for workload invocations.
pub struct Dispatcher<A, G: ?Sized> {
    authorizer: A,
    engine: Arc<G>,
    lanes: BTreeMap<WorkloadKind, Lane<G>>,
    reaper: Arc<IdleReaper<G>>,
    ledger: Arc<dyn UsageLedger>,
}

impl<A, G> Dispatcher<A, G>
where
    A: Authorizer,
    G: ExecutionUnitEngine + ?Sized,
{
    /// Create a dispatcher with one empty pool per kind in `limits`.
    ///
    /// Register units through [`pool`](Self::pool) before dispatching.
    pub fn new(
        limits: &DispatchLimits,
        authorizer: A,
        engine: Arc<G>,
        ledger: Arc<dyn UsageLedger>,
    ) -> Self {
        let lanes: BTreeMap<WorkloadKind, Lane<G>> = limits
            .capacities
            .iter()
            .map(|(kind, capacity)| {
                let lane = Lane {
                    gate: Arc::new(AdmissionGate::new(*kind, *capacity)),
                    pool: Arc::new(UnitPool::new(*kind, Arc::clone(&engine))),
                };
                (*kind, lane)
            })
            .collect();
        let reaper = Arc::new(IdleReaper::new(
            lanes.values().map(|lane| Arc::clone(&lane.pool)).collect(),
            limits.idle_timeout,
        ));
        Self {
            authorizer,
            engine,
            lanes,
            reaper,
            ledger,
        }
    }

    /// Kinds this dispatcher serves.
    pub fn kinds(&self) -> Vec<WorkloadKind> {
        self.lanes.keys().copied().collect()
    }

    /// Unit pool for `kind`.
    pub fn pool(&self, kind: WorkloadKind) -> Option<&Arc<UnitPool<G>>> {
        self.lanes.get(&kind).map(|lane| &lane.pool)
    }

    /// Admission gate for `kind`.
    pub fn gate(&self, kind: WorkloadKind) -> Option<&Arc<AdmissionGate>> {
        self.lanes.get(&kind).map(|lane| &lane.gate)
    }

    /// Reaper shared with any periodic sweeper.
    pub fn reaper(&self) -> Arc<IdleReaper<G>> {
        Arc::clone(&self.reaper)
    }

    /// Engine backing every pool.
    pub const fn engine(&self) -> &Arc<G> {
        &self.engine
    }

    /// Dispatch by kind name, rejecting names that are not a known kind.
    ///
    /// # Errors
    ///
    /// [`DispatchError::UnknownWorkloadKind`] plus everything [`dispatch`](Self::dispatch) returns.
    pub async fn dispatch_named(
        &self,
        user: &str,
        kind_name: &str,
        args: WorkloadArgs,
    ) -> Result<String, DispatchError> {
        let kind: WorkloadKind = kind_name.parse()?;
        self.dispatch(user, kind, args).await
    }

    /// Run one workload invocation for `user`.
    ///
    /// # Errors
    ///
    /// Authentication, authorization, admission and unit availability
    /// failures short-circuit; engine errors surface as
    /// [`DispatchError::ExecutionFailed`].
    pub async fn dispatch(
        &self,
        user: &str,
        kind: WorkloadKind,
        args: WorkloadArgs,
    ) -> Result<String, DispatchError> {
        self.dispatch_with_cancel(user, kind, args, &CancellationToken::new())
            .await
    }

    /// Run one workload invocation, abandoning it if `cancel` fires.
    ///
    /// Cancellation before execution starts consumes no unit. Cancellation
    /// during execution still records usage, returns (or, if the unit no
    /// longer runs, evicts) the unit and releases the admission slot.
    ///
    /// # Errors
    ///
    /// As [`dispatch`](Self::dispatch), plus [`DispatchError::Cancelled`].
    pub async fn dispatch_with_cancel(
        &self,
        user: &str,
        kind: WorkloadKind,
        args: WorkloadArgs,
        cancel: &CancellationToken,
    ) -> Result<String, DispatchError> {
        self.authorize(user, kind)?;
        let lane = self
            .lanes
            .get(&kind)
            .ok_or_else(|| DispatchError::UnknownWorkloadKind(kind.to_string()))?;

        if cancel.is_cancelled() {
            return Err(DispatchError::Cancelled);
        }

        let Some(permit) = lane.gate.try_acquire() else {
            tracing::warn!(
                user,
                %kind,
                capacity = lane.gate.capacity(),
                "rejected: capacity exceeded"
            );
            return Err(DispatchError::CapacityExceeded(kind));
        };

        // An abandoned checkout puts its candidate back through the lease guard.
        let checkout = tokio::select! {
            biased;
            () = cancel.cancelled() => None,
            result = lane.pool.checkout() => Some(result),
        };
        let lease = match checkout {
            Some(Ok(lease)) => lease,
            Some(Err(e)) => {
                drop(permit);
                tracing::warn!(user, %kind, "rejected: no available unit");
                return Err(e);
            }
            None => {
                drop(permit);
                tracing::info!(user, %kind, "cancelled during checkout");
                return Err(DispatchError::Cancelled);
            }
        };

        if cancel.is_cancelled() {
            lane.pool.restore(lease);
            drop(permit);
            tracing::info!(user, %kind, "cancelled before execution");
            return Err(DispatchError::Cancelled);
        }

        let request_id = Uuid::new_v4();
        tracing::info!(%request_id, user, %kind, unit = lease.id(), "dispatching");

        let descriptor = kind.descriptor();
        let started_at_ms = now_ms();
        let execution = tokio::select! {
            biased;
            () = cancel.cancelled() => Execution::Cancelled,
            result = self.engine.execute(lease.id(), &descriptor, &args) => match result {
                Ok(output) => Execution::Completed(output),
                Err(e) => Execution::Failed(e),
            },
        };
        let finished_at_ms = now_ms();

        self.record_usage(build_usage_record(
            request_id,
            user,
            kind,
            lease.id(),
            execution.outcome(),
            started_at_ms,
            finished_at_ms,
        ));

        self.settle_lease(&lane.pool, lease, &execution, finished_at_ms)
            .await;
        drop(permit);

        self.reaper.sweep(now_ms()).await;

        match execution {
            Execution::Completed(output) => {
                tracing::info!(%request_id, %kind, "execution completed");
                Ok(output)
            }
            Execution::Failed(e) => {
                tracing::error!(%request_id, %kind, error = %e, "execution failed");
                Err(DispatchError::ExecutionFailed(kind))
            }
            Execution::Cancelled => {
                tracing::info!(%request_id, %kind, "cancelled during execution");
                Err(DispatchError::Cancelled)
            }
        }
    }

    /// Authenticate, then check the single capability the kind requires.
    fn authorize(&self, user: &str, kind: WorkloadKind) -> Result<(), DispatchError> {
        if !self.authorizer.is_known_user(user) {
            tracing::warn!(user, "authentication failed");
            return Err(DispatchError::AuthenticationFailed(user.to_string()));
        }
        let capability = kind.capability();
        if !self.authorizer.has_capability(user, capability) {
            tracing::warn!(user, %kind, capability, "permission denied");
            return Err(DispatchError::PermissionDenied {
                user: user.to_string(),
                capability: capability.to_string(),
            });
        }
        Ok(())
    }

    /// Append to the ledger; a ledger failure never fails the request.
    fn record_usage(&self, record: UsageRecord) {
        if let Err(e) = self.ledger.record(record) {
            tracing::error!(error = %e, "failed to record usage");
        }
    }

    /// Hand the lease back after execution. A cancelled execution may have
    /// left the unit dead, so it is probed and evicted if it no longer runs.
    async fn settle_lease(
        &self,
        pool: &UnitPool<G>,
        lease: UnitLease,
        execution: &Execution,
        now_ms: u128,
    ) {
        if matches!(execution, Execution::Cancelled)
            && !probe_alive(self.engine.as_ref(), lease.id()).await
        {
            let unit_id = lease.id().to_string();
            if let Err(e) = pool.discard(lease).await {
                tracing::error!(unit = %unit_id, error = %e, "failed to tear down unhealthy unit");
            }
            return;
        }
        pool.return_unit(lease, now_ms);
    }
}
