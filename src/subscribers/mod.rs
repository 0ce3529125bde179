//! # Event subscribers for the conductor runtime.
//!
//! This module provides the [`Subscribe`] trait, the [`SubscriberSet`] fan-out
//! and the built-in [`LogWriter`] for handling runtime events broadcast
//! through the [`Bus`](crate::events::Bus).
//!
//! ## Architecture
//! ```text
//! Event flow:
//!   ComponentCell ── publish(Event) ──► Bus ──► subscriber listener ──► SubscriberSet
//!                                                                          │
//!                                                           ┌──────────────┼─────────────┐
//!                                                           ▼              ▼             ▼
//!                                                       LogWriter       Metrics       Custom
//! ```
//!
//! ## Implementing custom subscribers
//! ```no_run
//! use conductor::{Event, EventKind, Subscribe};
//! use async_trait::async_trait;
//!
//! struct Alerts;
//!
//! #[async_trait]
//! impl Subscribe for Alerts {
//!     async fn on_event(&self, event: &Event) {
//!         if matches!(event.kind, EventKind::HealthCheckFailed) {
//!             // page someone
//!         }
//!     }
//!
//!     fn name(&self) -> &'static str {
//!         "alerts"
//!     }
//! }
//! ```

#[cfg(feature = "logging")]
mod log;
mod subscriber;
mod subscriber_set;

#[cfg(feature = "logging")]
pub use log::LogWriter;
pub use subscriber::Subscribe;
pub use subscriber_set::SubscriberSet;
