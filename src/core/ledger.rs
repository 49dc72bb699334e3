//! Usage records and the append-only ledger abstraction.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::{LedgerError, WorkloadKind};
use crate::util::clock::elapsed_ms;

/// How an execution attempt ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    /// The workload returned a result.
    Succeeded,
    /// The engine reported an error.
    Failed,
    /// The caller cancelled while the workload ran.
    Cancelled,
}

/// Audit entry for one execution attempt.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageRecord {
    /// Dispatch request identifier.
    pub request_id: Uuid,
    /// Requesting user.
    pub user: String,
    /// Workload kind invoked.
    pub kind: WorkloadKind,
    /// Unit the workload ran on.
    pub unit_id: String,
    /// Attempt outcome.
    pub outcome: UsageOutcome,
    /// Execution start (ms since epoch).
    pub started_at_ms: u128,
    /// Execution end (ms since epoch).
    pub finished_at_ms: u128,
    /// `finished_at_ms - started_at_ms`.
    pub duration_ms: u128,
}

/// Append-only sink for usage records.
///
/// Implementations serialize concurrent appends internally. `record` runs
/// inline on the dispatching task and must return promptly.
pub trait UsageLedger: Send + Sync {
    /// Append one record.
    ///
    /// # Errors
    ///
    /// Backend failures; dispatch logs them and carries on.
    fn record(&self, entry: UsageRecord) -> Result<(), LedgerError>;
}

/// Helper to build a usage record from an execution span.
pub fn build_usage_record(
    request_id: Uuid,
    user: impl Into<String>,
    kind: WorkloadKind,
    unit_id: impl Into<String>,
    outcome: UsageOutcome,
    started_at_ms: u128,
    finished_at_ms: u128,
) -> UsageRecord {
    UsageRecord {
        request_id,
        user: user.into(),
        kind,
        unit_id: unit_id.into(),
        outcome,
        started_at_ms,
        finished_at_ms,
        duration_ms: elapsed_ms(started_at_ms, finished_at_ms),
    }
}
