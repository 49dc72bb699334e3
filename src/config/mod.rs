//! Configuration models for kinds, users, reaping and usage logging.

pub mod dispatch;

pub use dispatch::{AuthConfig, DispatcherConfig, KindConfig};
