//! Non-blocking per-kind admission control.
//!
//! A gate is a counter bounded by a fixed capacity. Admission is a single CAS
//! loop; callers that lose the race are turned away immediately instead of
//! being parked.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;

use crate::core::WorkloadKind;

/// Bounded concurrency limiter for one workload kind.
#[derive(Debug)]
pub struct AdmissionGate {
    kind: WorkloadKind,
    capacity: u32,
    /// Lock-free count of admitted, not yet released requests.
    in_flight: AtomicU32,
}

impl AdmissionGate {
    /// Create a gate admitting at most `capacity` concurrent requests.
    #[must_use]
    pub const fn new(kind: WorkloadKind, capacity: u32) -> Self {
        Self {
            kind,
            capacity,
            in_flight: AtomicU32::new(0),
        }
    }

    /// Kind this gate guards.
    #[must_use]
    pub const fn kind(&self) -> WorkloadKind {
        self.kind
    }

    /// Configured capacity.
    #[must_use]
    pub const fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Current number of admitted requests.
    #[must_use]
    pub fn in_flight(&self) -> u32 {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Try to take one slot. Returns `false` without waiting when full.
    pub fn try_admit(&self) -> bool {
        let mut current = self.in_flight.load(Ordering::Acquire);
        loop {
            if current >= self.capacity {
                return false;
            }
            match self.in_flight.compare_exchange_weak(
                current,
                current + 1,
                Ordering::AcqRel,
                Ordering::Acquire,
            ) {
                Ok(_) => return true,
                Err(actual) => current = actual,
            }
        }
    }

    /// Give back one slot taken by [`try_admit`](Self::try_admit).
    ///
    /// # Panics
    ///
    /// Panics if nothing is in flight; that is an accounting bug, not a
    /// runtime condition.
    pub fn release(&self) {
        let previous = self.in_flight.fetch_sub(1, Ordering::AcqRel);
        assert!(
            previous > 0,
            "admission gate for {} released more often than admitted",
            self.kind
        );
        tracing::debug!(kind = %self.kind, in_flight = previous - 1, "admission released");
    }

    /// Try to take one slot as a guard that releases on drop.
    #[must_use]
    pub fn try_acquire(self: &Arc<Self>) -> Option<AdmissionPermit> {
        self.try_admit().then(|| AdmissionPermit {
            gate: Arc::clone(self),
        })
    }
}

/// One admitted slot; dropping it releases the slot exactly once.
#[derive(Debug)]
#[must_use = "dropping the permit releases the admission slot immediately"]
pub struct AdmissionPermit {
    gate: Arc<AdmissionGate>,
}

impl AdmissionPermit {
    /// Kind the permit was granted for.
    pub fn kind(&self) -> WorkloadKind {
        self.gate.kind()
    }
}

impl Drop for AdmissionPermit {
    fn drop(&mut self) {
        self.gate.release();
    }
}
