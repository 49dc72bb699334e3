//! Runtime adapters: spawning, background reaping, and the API surface.

pub mod api;
pub mod reaper;
pub mod tokio_spawner;

pub use api::{dispatch_parallel, submit_request, DispatchRequest, DispatchResponse, KindSnapshot};
pub use reaper::spawn_periodic_reaper;
pub use tokio_spawner::{Spawn, TokioSpawner};
