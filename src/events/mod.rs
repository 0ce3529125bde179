//! Runtime events: types and broadcast bus.
//!
//! This module groups the event **data model** and the **bus** used to
//! publish/subscribe to runtime events emitted by the conductor, component
//! cells and subscriber workers.
//!
//! ## Contents
//! - [`EventKind`], [`Event`] event classification and payload metadata
//! - [`Bus`] thin wrapper over `tokio::sync::broadcast`
//!
//! ## Quick reference
//! - **Publishers**: `Conductor`, `Registry`, `ComponentCell`, `SubscriberSet`
//!   workers (overflow/panic).
//! - **Consumers**: the conductor's subscriber listener (fans out to
//!   `SubscriberSet`) and anyone holding a receiver from `Conductor::subscribe`.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
