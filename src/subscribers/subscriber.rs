//! # Subscribe: observing a conductor from the outside.
//!
//! A [`Subscribe`] implementation receives every [`Event`] the conductor, its
//! registry and its component cells publish: registrations and patches,
//! acquire/release edges, setup/shutdown/reload outcomes, health-check
//! failures and the conductor-level transitions.
//!
//! ## Delivery
//! ```text
//! ComponentCell / Registry / Conductor ──► Bus ──► subscriber_listener ──► queue ──► on_event
//! ```
//! - Events arrive in publish order ([`Event::seq`] is increasing per subscriber).
//! - Delivery is asynchronous: a component may already be `Active` by the
//!   time its `ComponentActive` event is handled, and lifecycle ordering never
//!   waits for a subscriber.
//! - When the bus lags, the listener skips ahead; when this subscriber's own
//!   queue is full, the event is dropped for it alone and reported as
//!   `SubscriberOverflow`.
//! - A panic inside `on_event` is caught and reported as `SubscriberPanicked`;
//!   the subscriber keeps receiving later events.
//! - Dropping the conductor stops delivery; events still in flight may be lost.

use async_trait::async_trait;

use crate::events::Event;

/// Receives conductor events on its own worker task.
///
/// Keep `on_event` non-blocking: slow handling only grows this subscriber's queue.
#[async_trait]
pub trait Subscribe: Send + Sync + 'static {
    /// Handles one event.
    async fn on_event(&self, event: &Event);

    /// Name reported in `SubscriberOverflow` / `SubscriberPanicked` events.
    ///
    /// Defaults to the type name.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }

    /// Capacity of this subscriber's queue (clamped to >= 1).
    fn queue_capacity(&self) -> usize {
        1024
    }
}
