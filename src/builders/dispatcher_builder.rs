//! Builders to construct a provisioned dispatcher from configuration.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;

use crate::config::DispatcherConfig;
use crate::core::engine::probe_alive;
use crate::core::{
    AppResult, Authorizer, Dispatcher, ExecutionUnitEngine, LedgerError, UsageLedger,
};
use crate::infra::ledger::{InMemoryUsageLedger, JsonlUsageLedger};
use crate::runtime::{spawn_periodic_reaper, Spawn};
use crate::util::clock::now_ms;

/// Build the ledger named by the configuration: JSON lines when a path is
/// set, in-memory otherwise.
///
/// # Errors
///
/// The ledger file cannot be opened.
pub fn build_ledger(cfg: &DispatcherConfig) -> Result<Arc<dyn UsageLedger>, LedgerError> {
    Ok(match &cfg.usage_log_path {
        Some(path) => Arc::new(JsonlUsageLedger::open(path)?),
        None => Arc::new(InMemoryUsageLedger::new()),
    })
}

/// Build a dispatcher and provision its pools from configuration.
///
/// Only configured units the engine reports as running are registered; the
/// rest are skipped with a warning.
///
/// # Errors
///
/// Invalid configuration.
pub async fn build_dispatcher<A, G>(
    cfg: &DispatcherConfig,
    authorizer: A,
    engine: Arc<G>,
    ledger: Arc<dyn UsageLedger>,
) -> AppResult<Dispatcher<A, G>>
where
    A: Authorizer,
    G: ExecutionUnitEngine + ?Sized,
{
    cfg.validate()
        .map_err(|e| anyhow::anyhow!("config invalid: {e}"))?;

    let dispatcher = Dispatcher::new(&cfg.limits(), authorizer, Arc::clone(&engine), ledger);
    for (kind, kind_cfg) in &cfg.kinds {
        let Some(pool) = dispatcher.pool(*kind) else {
            continue;
        };
        for unit_id in &kind_cfg.units {
            if probe_alive(engine.as_ref(), unit_id).await {
                pool.register(unit_id.clone(), now_ms());
            } else {
                tracing::warn!(%kind, unit = %unit_id, "configured unit is not running; skipped");
            }
        }
        tracing::info!(
            %kind,
            capacity = kind_cfg.capacity,
            units = pool.list_available().len(),
            "pool provisioned"
        );
    }
    Ok(dispatcher)
}

/// [`build_dispatcher`], then start the periodic idle reaper on `spawner`
/// when `reap_interval_secs` is configured.
///
/// The reaper runs until `cancellation_token` fires.
///
/// # Errors
///
/// Invalid configuration.
pub async fn build_dispatcher_with_reaper<A, G, S>(
    cfg: &DispatcherConfig,
    authorizer: A,
    engine: Arc<G>,
    ledger: Arc<dyn UsageLedger>,
    spawner: &S,
    cancellation_token: CancellationToken,
) -> AppResult<Dispatcher<A, G>>
where
    A: Authorizer,
    G: ExecutionUnitEngine + ?Sized,
    S: Spawn,
{
    let dispatcher = build_dispatcher(cfg, authorizer, engine, ledger).await?;
    match cfg.reap_interval() {
        Some(interval) => {
            spawn_periodic_reaper(dispatcher.reaper(), interval, spawner, cancellation_token);
        }
        None => tracing::debug!("periodic idle reaper disabled; sweeping after dispatches only"),
    }
    Ok(dispatcher)
}
