//! API-facing request/response models for UIs and CLIs sitting in front of
//! the dispatcher.

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::core::{
    Authorizer, DispatchError, Dispatcher, ErrorKind, ExecutionUnitEngine, WorkloadArgs,
    WorkloadKind,
};

/// Invocation request as received from a caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DispatchRequest {
    /// Requesting user.
    pub user: String,
    /// Kind name (`alpha`, `RuntimeBeta`, ...).
    pub kind: String,
    /// Workload arguments.
    #[serde(default)]
    pub args: WorkloadArgs,
}

/// Outcome of one request: `{"ok": "..."}` or `{"error": "CapacityExceeded"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DispatchResponse {
    /// Workload output.
    Ok(String),
    /// Failure classification.
    Error(ErrorKind),
}

impl From<Result<String, DispatchError>> for DispatchResponse {
    fn from(result: Result<String, DispatchError>) -> Self {
        match result {
            Ok(output) => Self::Ok(output),
            Err(e) => Self::Error(e.kind()),
        }
    }
}

impl DispatchResponse {
    /// Whether the request produced output.
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }
}

/// Per-kind view of capacity and pool contents.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct KindSnapshot {
    /// Kind described.
    pub kind: WorkloadKind,
    /// Admission capacity.
    pub capacity: u32,
    /// Requests currently admitted.
    pub in_flight: u32,
    /// Available unit ids in checkout order.
    pub available_units: Vec<String>,
}

/// Health response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Health {
    /// Healthy flag.
    pub ok: bool,
    /// Total available units across kinds.
    pub available_units: usize,
}

/// Run one request through the dispatcher.
pub async fn submit_request<A, G>(
    dispatcher: &Dispatcher<A, G>,
    req: DispatchRequest,
) -> DispatchResponse
where
    A: Authorizer,
    G: ExecutionUnitEngine + ?Sized,
{
    dispatcher
        .dispatch_named(&req.user, &req.kind, req.args)
        .await
        .into()
}

/// Dispatch one request per prompt concurrently and collect the responses
/// in prompt order.
pub async fn dispatch_parallel<A, G, I, S>(
    dispatcher: &Dispatcher<A, G>,
    user: &str,
    kind: WorkloadKind,
    prompts: I,
) -> Vec<DispatchResponse>
where
    A: Authorizer,
    G: ExecutionUnitEngine + ?Sized,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let calls = prompts
        .into_iter()
        .map(|prompt| dispatcher.dispatch(user, kind, WorkloadArgs::with_prompt(prompt)));
    join_all(calls)
        .await
        .into_iter()
        .map(DispatchResponse::from)
        .collect()
}

/// Snapshot every served kind.
pub fn list_kinds<A, G>(dispatcher: &Dispatcher<A, G>) -> Vec<KindSnapshot>
where
    A: Authorizer,
    G: ExecutionUnitEngine + ?Sized,
{
    dispatcher
        .kinds()
        .into_iter()
        .filter_map(|kind| {
            let gate = dispatcher.gate(kind)?;
            let pool = dispatcher.pool(kind)?;
            Some(KindSnapshot {
                kind,
                capacity: gate.capacity(),
                in_flight: gate.in_flight(),
                available_units: pool.list_available(),
            })
        })
        .collect()
}

/// Return a health payload; healthy while any kind has an available or busy unit.
pub fn health<A, G>(dispatcher: &Dispatcher<A, G>) -> Health
where
    A: Authorizer,
    G: ExecutionUnitEngine + ?Sized,
{
    let kinds = dispatcher.kinds();
    let available_units: usize = kinds
        .iter()
        .filter_map(|k| dispatcher.pool(*k))
        .map(|p| p.list_available().len())
        .sum();
    let busy_units: usize = kinds
        .iter()
        .filter_map(|k| dispatcher.pool(*k))
        .map(|p| p.checked_out_count())
        .sum();
    Health {
        ok: available_units + busy_units > 0,
        available_units,
    }
}
