//! Core dispatch abstractions: admission, unit pools, reaping, usage accounting.

pub mod admission;
pub mod dispatcher;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod reaper;
pub mod unit_pool;
pub mod workload;

pub use admission::{AdmissionGate, AdmissionPermit};
pub use dispatcher::{DispatchLimits, Dispatcher};
pub use engine::{Authorizer, ExecutionUnitEngine};
pub use error::{AppResult, DispatchError, EngineError, ErrorKind, LedgerError};
pub use ledger::{build_usage_record, UsageLedger, UsageOutcome, UsageRecord};
pub use reaper::{IdleReaper, ReapReport};
pub use unit_pool::{EvictionOutcome, ExecutionUnit, UnitId, UnitLease, UnitPool, UnitState};
pub use workload::{InvocationDescriptor, WorkloadArgs, WorkloadKind, WorkloadSpec};
