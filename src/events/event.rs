//! # Runtime events emitted by the conductor and its components.
//!
//! The [`EventKind`] enum classifies event types across four categories:
//! - **Registry events**: components materialized or patched
//! - **Lifecycle events**: setup, acquire/release, shutdown, reload, health
//! - **Conductor events**: aggregate active/inactive, shutdown requests, grace
//! - **Subscriber events**: overflow and panics in subscriber workers
//!
//! The [`Event`] struct carries additional metadata such as timestamps,
//! component and dependent identities, and failure reasons.
//!
//! ## Ordering guarantees
//! Each event has a globally unique sequence number (`seq`) that increases monotonically.
//! Use `seq` to restore the exact order when events are delivered out of order.
//!
//! ## Example
//! ```rust
//! use conductor::{ComponentId, Event, EventKind};
//!
//! let ev = Event::new(EventKind::ComponentAcquired)
//!     .with_component(ComponentId::new("database"))
//!     .with_dependent(ComponentId::new("api"));
//!
//! assert_eq!(ev.kind, EventKind::ComponentAcquired);
//! assert_eq!(ev.component, Some(ComponentId::new("database")));
//! assert_eq!(ev.dependent, Some(ComponentId::new("api")));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::components::ComponentId;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Registry events ===
    /// A component instance was constructed and registered.
    ///
    /// Sets:
    /// - `component`: registered identity
    /// - `reason`: implementation identity, when patched
    ComponentAdded,

    /// A patch was recorded.
    ///
    /// Sets:
    /// - `component`: patched identity
    /// - `reason`: substitute identity (and a note when the identity was already materialized)
    ComponentPatched,

    // === Setup ===
    /// Setup began: dependencies are being acquired.
    ///
    /// Sets:
    /// - `component`: component identity
    SetupStarting,

    /// A dependent acquired a component.
    ///
    /// Sets:
    /// - `component`: acquired component
    /// - `dependent`: acquiring component
    ComponentAcquired,

    /// `on_setup` completed; the component is active.
    ///
    /// Sets:
    /// - `component`: component identity
    ComponentActive,

    /// Setup failed (hook error or cancelled acquire).
    ///
    /// Sets:
    /// - `component`: component identity
    /// - `reason`: error message
    SetupFailed,

    // === Shutdown ===
    /// Shutdown began: waiting for dependents to release.
    ///
    /// Sets:
    /// - `component`: component identity
    ShutdownStarting,

    /// A dependent released a component.
    ///
    /// Sets:
    /// - `component`: released component
    /// - `dependent`: releasing component
    ComponentReleased,

    /// The component is inactive.
    ///
    /// Sets:
    /// - `component`: component identity
    ComponentInactive,

    /// `on_shutdown` failed; the component is inactive anyway.
    ///
    /// Sets:
    /// - `component`: component identity
    /// - `reason`: error message
    ShutdownFailed,

    // === Reload ===
    /// In-place reload began.
    ///
    /// Sets:
    /// - `component`: component identity
    ReloadStarting,

    /// In-place reload completed; the component is active again.
    ///
    /// Sets:
    /// - `component`: component identity
    ComponentReloaded,

    /// Reload failed (not active, or hook error).
    ///
    /// Sets:
    /// - `component`: component identity
    /// - `reason`: error message
    ReloadFailed,

    // === Health ===
    /// A component reported unhealthy, or its check timed out.
    ///
    /// Sets:
    /// - `component`: component identity
    /// - `timeout_ms`: the check timeout, when it was the cause
    HealthCheckFailed,

    // === Conductor ===
    /// Every scheduled component is active.
    ConductorActive,

    /// Every component has been shut down.
    ConductorInactive,

    /// Shutdown requested (OS signal observed).
    ShutdownRequested,

    /// Shutdown grace period exceeded; some components did not stop in time.
    ///
    /// Sets:
    /// - `timeout_ms`: configured grace
    /// - `reason`: stuck components
    GraceExceeded,

    // === Subscriber events ===
    /// Subscriber panicked during event processing.
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: panic info/message
    SubscriberPanicked,

    /// Subscriber dropped an event (queue full or worker closed).
    ///
    /// Sets:
    /// - `subscriber`: subscriber name
    /// - `reason`: reason string (e.g., "full", "closed")
    SubscriberOverflow,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - other optional fields are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Component the event is about.
    pub component: Option<ComponentId>,
    /// Counterpart of an acquire/release.
    pub dependent: Option<ComponentId>,
    /// Human-readable reason (errors, substitutes, stuck lists).
    pub reason: Option<Arc<str>>,
    /// Timeout or grace in milliseconds (compact).
    pub timeout_ms: Option<u32>,
    /// Name of the subscriber, for subscriber events.
    pub subscriber: Option<&'static str>,
}

impl Event {
    /// Creates a new event of the given kind with current timestamp and next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            component: None,
            dependent: None,
            reason: None,
            timeout_ms: None,
            subscriber: None,
        }
    }

    /// Attaches the component identity.
    #[inline]
    pub fn with_component(mut self, id: ComponentId) -> Self {
        self.component = Some(id);
        self
    }

    /// Attaches the dependent identity.
    #[inline]
    pub fn with_dependent(mut self, id: ComponentId) -> Self {
        self.dependent = Some(id);
        self
    }

    /// Attaches a human-readable reason.
    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Attaches a timeout duration (stored as milliseconds).
    #[inline]
    pub fn with_timeout(mut self, d: Duration) -> Self {
        let ms = d.as_millis().min(u128::from(u32::MAX)) as u32;
        self.timeout_ms = Some(ms);
        self
    }

    /// Creates a subscriber overflow event.
    #[inline]
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow)
            .with_reason(format!("subscriber={subscriber} reason={reason}"));
        ev.subscriber = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    #[inline]
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.subscriber = Some(subscriber);
        ev
    }

    #[inline]
    pub fn is_subscriber_overflow(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberOverflow)
    }

    #[inline]
    pub fn is_subscriber_panic(&self) -> bool {
        matches!(self.kind, EventKind::SubscriberPanicked)
    }
}
