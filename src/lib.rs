//! # conductor
//!
//! **Conductor** brings long-lived async components up and down in
//! dependency order.
//!
//! Each component declares what it depends on. The conductor discovers the
//! whole graph from the components you register, sets everything up
//! concurrently (a component's `on_setup` only runs once its dependencies are
//! active), and tears it down in reverse (a component's `on_shutdown` only
//! runs once nothing depends on it any more).
//!
//! ## Architecture
//! ### Overview
//! ```text
//!   add::<Api>()          patch::<Db, FakeDb>()
//!        │                        │
//!        ▼                        ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Conductor                                                        │
//! │  - Registry (one ComponentCell per identity, patches, aliases)    │
//! │  - Scheduler (fixed-point discovery, cycle detection)             │
//! │  - active signal (BinarySignal)                                   │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        ▼                  ▼                  ▼               │
//!  ┌──────────────┐   ┌──────────────┐   ┌──────────────┐      │
//!  │ComponentCell │   │ComponentCell │   │ComponentCell │      │
//!  │     Api      │──►│      Db      │◄──│    Worker    │      │
//!  └──────┬───────┘   └──────┬───────┘   └──────┬───────┘      │
//!         │ acquire/release, active/acquired signals           │
//!         │ Publishes: SetupStarting, ComponentActive, ...     │
//!         ▼                  ▼                  ▼              ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │                        Bus (broadcast channel)                    │
//! │              (capacity: ConductorConfig::bus_capacity)            │
//! └─────────────────────────────────┬─────────────────────────────────┘
//!                                   ▼
//!                       ┌────────────────────────┐
//!                       │  subscriber_listener   │
//!                       └───────────┬────────────┘
//!                                   ▼
//!                             SubscriberSet
//!                           (per-sub queues)
//!                         ┌─────────┼─────────┐
//!                         ▼         ▼         ▼
//!                     LogWriter  worker2   workerN
//! ```
//!
//! ### Component lifecycle
//! ```text
//! Unset ──setup()──► SettingUp ──acquire all deps──► on_setup() ──► Active
//!                                                                    │  ▲
//!                                                          reload()  │  │ on_shutdown(); on_setup()
//!                                                                    ▼  │
//!                                                                 Reloading
//! Active ──shutdown()──► wait until released ──► ShuttingDown ──► on_shutdown()
//!                                                 ──► Inactive ──► release every dependency
//! ```
//!
//! ## Features
//! | Area              | Description                                                      | Key types / traits                          |
//! |-------------------|------------------------------------------------------------------|---------------------------------------------|
//! | **Components**    | Hooks and identity of managed services.                          | [`Component`], [`Provide`], [`ComponentKind`] |
//! | **Lifecycle**     | Per-component state machine, acquire/release, reload.            | [`ComponentCell`], [`ReloadCascade`]        |
//! | **Orchestration** | Discovery, ordered setup/shutdown, health checks, signals.       | [`Conductor`], [`ConductorBuilder`]         |
//! | **Signals**       | Async-observable boolean flags.                                  | [`BinarySignal`]                            |
//! | **Subscriber API**| Hook into lifecycle events (logging, metrics, custom).           | [`Subscribe`], [`SubscriberSet`]            |
//! | **Errors**        | Typed errors for orchestration and hooks.                        | [`ConductorError`], [`ComponentError`]      |
//! | **Configuration** | Timeouts, grace period, bus capacity.                            | [`ConductorConfig`]                         |
//!
//! ## Optional features
//! - `logging` (default): exports [`LogWriter`], a subscriber that renders events through `tracing`.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use conductor::{
//!     Component, ComponentError, ComponentKind, Conductor, ConductorConfig, Dependencies,
//!     Provide, Subscribe,
//! };
//!
//! struct Database;
//!
//! #[async_trait]
//! impl Component<String> for Database {
//!     async fn on_setup(&self, _deps: &Dependencies<String>) -> Result<(), ComponentError> {
//!         // open the pool
//!         Ok(())
//!     }
//! }
//!
//! impl Provide<String> for Database {
//!     const ID: &'static str = "database";
//!     fn construct(_dsn: Arc<String>) -> Self {
//!         Database
//!     }
//! }
//!
//! struct Api;
//!
//! #[async_trait]
//! impl Component<String> for Api {
//!     fn dependencies(&self) -> Vec<ComponentKind<String>> {
//!         vec![ComponentKind::of::<Database>()]
//!     }
//!
//!     async fn on_setup(&self, deps: &Dependencies<String>) -> Result<(), ComponentError> {
//!         deps.get_as::<Database>()
//!             .ok_or_else(|| ComponentError::fail("database missing"))?;
//!         Ok(())
//!     }
//! }
//!
//! impl Provide<String> for Api {
//!     const ID: &'static str = "api";
//!     fn construct(_dsn: Arc<String>) -> Self {
//!         Api
//!     }
//! }
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     #[cfg(feature = "logging")]
//!     let subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(conductor::LogWriter::new())];
//!     #[cfg(not(feature = "logging"))]
//!     let subs: Vec<Arc<dyn Subscribe>> = Vec::new();
//!
//!     let conductor = Conductor::<String>::builder(ConductorConfig::default())
//!         .with_subscribers(subs)
//!         .build("postgres://localhost/app".to_string());
//!
//!     // Only the root is registered; the database is discovered.
//!     conductor.add::<Api>();
//!     conductor.setup().await?;
//!     conductor.health_check().await?;
//!
//!     // In a service: `conductor.run().await?` waits for SIGTERM in between.
//!     conductor.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod components;
mod config;
mod core;
mod error;
mod events;
mod signal;
mod subscribers;

// ---- Public re-exports ----

pub use crate::components::{
    Component, ComponentCell, ComponentId, ComponentKind, ComponentRef, Dependencies, Lifecycle,
    Phase, Provide, ReloadCascade, ReloadReport,
};
pub use crate::config::ConductorConfig;
pub use crate::core::{Conductor, ConductorBuilder};
pub use crate::error::{ComponentError, ConductorError};
pub use crate::events::{Bus, Event, EventKind};
pub use crate::signal::{BinarySignal, WaitError};
pub use crate::subscribers::{Subscribe, SubscriberSet};

// Optional: expose the built-in `tracing` subscriber.
// Enabled by default; disable with `default-features = false`.
#[cfg(feature = "logging")]
pub use crate::subscribers::LogWriter;
