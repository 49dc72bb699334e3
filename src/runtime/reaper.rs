//! Background idle sweeping so units are reclaimed without traffic.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::core::{ExecutionUnitEngine, IdleReaper};
use crate::runtime::Spawn;
use crate::util::clock::now_ms;

/// Run `reaper.sweep(now)` every `interval` until `cancellation_token` fires.
///
/// The first sweep happens one full interval after spawning.
pub fn spawn_periodic_reaper<G, S>(
    reaper: Arc<IdleReaper<G>>,
    interval: Duration,
    spawner: &S,
    cancellation_token: CancellationToken,
) where
    G: ExecutionUnitEngine + ?Sized,
    S: Spawn,
{
    spawner.spawn(async move {
        let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + interval, interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tracing::info!(interval_ms = interval.as_millis(), "periodic idle reaper started");
        loop {
            tokio::select! {
                () = cancellation_token.cancelled() => {
                    tracing::info!("periodic idle reaper shutdown requested");
                    break;
                }
                _ = ticker.tick() => {
                    let report = reaper.sweep(now_ms()).await;
                    if report.total() > 0 {
                        tracing::info!(
                            evicted = report.evicted.len(),
                            failed = report.failed.len(),
                            "periodic sweep reclaimed units"
                        );
                    }
                }
            }
        }
    });
}
