//! # Container Dispatch
//!
//! Admission-gated dispatch of workload invocations onto a bounded pool of
//! pre-provisioned execution units.
//!
//! A caller presents `(user, workload kind, args)` to the [`core::Dispatcher`].
//! The dispatcher authenticates and authorizes the user, admits the request
//! under the kind's concurrency cap, leases a live execution unit, runs the
//! workload through the execution engine, records usage, returns the unit and
//! finally sweeps idle units out of every pool.
//!
//! ## Key Properties
//!
//! - **Fail-fast admission**: requests beyond a kind's capacity are rejected,
//!   never queued
//! - **Per-kind isolation**: each kind has its own gate and pool; kinds never
//!   block each other
//! - **Scoped release**: once a unit is leased, usage is recorded and the unit
//!   and admission slot are released whatever the execution outcome
//! - **Idle reclamation**: units idle past a threshold are stopped and removed,
//!   after every dispatch and optionally on a timer
//! - **Pluggable backends**: authorizer, engine and ledger are traits
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use container_dispatch::builders::{build_dispatcher, build_ledger};
//! use container_dispatch::config::DispatcherConfig;
//! use container_dispatch::core::{WorkloadArgs, WorkloadKind};
//! use container_dispatch::infra::{SimulatedEngine, StaticAuthorizer};
//!
//! let cfg = DispatcherConfig::load()?;
//! let engine = Arc::new(SimulatedEngine::new().with_units(
//!     cfg.kinds.values().flat_map(|k| k.units.clone()),
//! ));
//! let dispatcher = build_dispatcher(
//!     &cfg,
//!     StaticAuthorizer::from_config(&cfg.auth),
//!     engine,
//!     build_ledger(&cfg)?,
//! )
//! .await?;
//!
//! let answer = dispatcher
//!     .dispatch("user1", WorkloadKind::Alpha, WorkloadArgs::with_prompt("what should I eat?"))
//!     .await?;
//! ```
//!
//! For complete scenarios, see `tests/dispatch_scenarios_test.rs`.

#![deny(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![warn(clippy::nursery)]

/// Core dispatch abstractions: admission, pools, reaping, usage accounting.
pub mod core;
/// Configuration models for kinds, users, reaping and usage logging.
pub mod config;
/// Builders to construct a provisioned dispatcher from configuration.
pub mod builders;
/// Infrastructure adapters for authorization, execution engines and ledgers.
pub mod infra;
/// Runtime adapters (Tokio spawning, periodic reaping) and API surface.
pub mod runtime;
/// Shared utilities.
pub mod util;
