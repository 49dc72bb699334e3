//! Collaborator seams: the execution unit engine and the authorizer.

use async_trait::async_trait;

use crate::core::{EngineError, InvocationDescriptor, WorkloadArgs};

/// Backend that owns the real execution units (containers, processes, sandboxes).
///
/// The dispatcher only ever addresses units by id. Implementations must treat
/// an unknown id as [`EngineError::NotFound`] rather than panicking.
///
/// # Example
///
/// ```rust,ignore
/// use async_trait::async_trait;
/// use container_dispatch::core::{
///     EngineError, ExecutionUnitEngine, InvocationDescriptor, WorkloadArgs,
/// };
///
/// struct Echo;
///
/// #[async_trait]
/// impl ExecutionUnitEngine for Echo {
///     async fn is_running(&self, _unit_id: &str) -> Result<bool, EngineError> { Ok(true) }
///     async fn execute(&self, _unit_id: &str, _d: &InvocationDescriptor, args: &WorkloadArgs)
///         -> Result<String, EngineError> {
///         Ok(args.prompt().unwrap_or_default().to_string())
///     }
///     async fn stop(&self, _unit_id: &str) -> Result<(), EngineError> { Ok(()) }
///     async fn remove(&self, _unit_id: &str) -> Result<(), EngineError> { Ok(()) }
/// }
/// ```
#[async_trait]
pub trait ExecutionUnitEngine: Send + Sync + 'static {
    /// Whether the unit exists and is running.
    async fn is_running(&self, unit_id: &str) -> Result<bool, EngineError>;

    /// Run the described workload inside the unit and return its output.
    async fn execute(
        &self,
        unit_id: &str,
        descriptor: &InvocationDescriptor,
        args: &WorkloadArgs,
    ) -> Result<String, EngineError>;

    /// Stop the unit.
    async fn stop(&self, unit_id: &str) -> Result<(), EngineError>;

    /// Remove the unit permanently.
    async fn remove(&self, unit_id: &str) -> Result<(), EngineError>;
}

/// Source of identity and capability facts.
pub trait Authorizer: Send + Sync + 'static {
    /// Whether the user exists.
    fn is_known_user(&self, user: &str) -> bool;

    /// Whether the user holds `capability`.
    fn has_capability(&self, user: &str, capability: &str) -> bool;
}

/// Liveness probe where "absent" covers both a stopped unit and an unknown one.
pub(crate) async fn probe_alive<G>(engine: &G, unit_id: &str) -> bool
where
    G: ExecutionUnitEngine + ?Sized,
{
    match engine.is_running(unit_id).await {
        Ok(running) => running,
        Err(EngineError::NotFound(_)) => false,
        Err(e) => {
            tracing::warn!(
                unit = unit_id,
                error = %e,
                "liveness probe failed; treating unit as absent"
            );
            false
        }
    }
}
