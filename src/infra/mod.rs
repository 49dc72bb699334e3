//! Infrastructure adapters: authorizer, engine and usage ledger backends.

pub mod auth;
pub mod engine;
pub mod ledger;

pub use auth::StaticAuthorizer;
pub use engine::SimulatedEngine;
pub use ledger::{InMemoryUsageLedger, JsonlUsageLedger};
