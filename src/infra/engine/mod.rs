//! Execution unit engine backends.

pub mod simulated;

pub use simulated::{generate, SimulatedEngine};
