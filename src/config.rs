//! # Conductor configuration.
//!
//! Provides [`ConductorConfig`], the settings a [`Conductor`](crate::Conductor)
//! is built with (see [`Conductor::builder`](crate::Conductor::builder)).
//!
//! ## Sentinel values
//! - `setup_timeout = 0s` → setup is unbounded
//! - `shutdown_grace = 0s` → shutdown waits for every component
//! - `health_check_timeout = 0s` → health checks are unbounded

use std::time::Duration;

/// Global configuration for a conductor.
///
/// ## Field semantics
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by Bus)
/// - `setup_timeout`: bound on a whole `setup()` call (`0s` = none)
/// - `shutdown_grace`: bound on a whole `shutdown()` call (`0s` = none)
/// - `health_check_timeout`: bound on each component's check (`0s` = none)
///
/// ## Notes
/// All fields are public. Prefer the helper accessors over checking the `0`
/// sentinels by hand.
#[derive(Clone, Debug)]
pub struct ConductorConfig {
    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Receivers lagging more than `bus_capacity` events skip the oldest ones.
    pub bus_capacity: usize,

    /// Maximum time a `setup()` call may take.
    ///
    /// When exceeded, setup is cancelled and fails with
    /// `ConductorError::SetupTimeout` naming the components still pending.
    pub setup_timeout: Duration,

    /// Maximum time a `shutdown()` call may take.
    ///
    /// When exceeded, the remaining shutdown tasks are aborted and the call
    /// fails with `ConductorError::GraceExceeded`.
    pub shutdown_grace: Duration,

    /// Maximum time a single component's health check may take.
    ///
    /// A check that does not answer in time counts as unhealthy.
    pub health_check_timeout: Duration,
}

impl ConductorConfig {
    /// Returns the setup bound as an `Option` (`None` = unbounded).
    #[inline]
    pub fn setup_limit(&self) -> Option<Duration> {
        non_zero(self.setup_timeout)
    }

    /// Returns the shutdown grace as an `Option` (`None` = unbounded).
    #[inline]
    pub fn grace_limit(&self) -> Option<Duration> {
        non_zero(self.shutdown_grace)
    }

    /// Returns the per-check health timeout as an `Option` (`None` = unbounded).
    #[inline]
    pub fn health_check_limit(&self) -> Option<Duration> {
        non_zero(self.health_check_timeout)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ConductorConfig {
    /// Default configuration:
    ///
    /// - `bus_capacity = 1024`
    /// - `setup_timeout = 0s` (unbounded)
    /// - `shutdown_grace = 0s` (unbounded)
    /// - `health_check_timeout = 5s`
    fn default() -> Self {
        Self {
            bus_capacity: 1024,
            setup_timeout: Duration::ZERO,
            shutdown_grace: Duration::ZERO,
            health_check_timeout: Duration::from_secs(5),
        }
    }
}

fn non_zero(d: Duration) -> Option<Duration> {
    if d.is_zero() { None } else { Some(d) }
}
