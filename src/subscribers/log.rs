//! # LogWriter: renders runtime events through `tracing`.
//!
//! Failures and grace overruns are logged at `warn`, everything else at
//! `info` (acquire/release at `debug`). Install any `tracing` subscriber to
//! see the output.
//!
//! ## Example output
//! ```text
//! INFO  conductor: setup starting component=api
//! DEBUG conductor: acquired component=database dependent=api
//! INFO  conductor: active component=api
//! WARN  conductor: health check failed component=cache timeout_ms=Some(5000)
//! INFO  conductor: shutdown requested
//! WARN  conductor: grace exceeded timeout_ms=Some(30000) stuck=["worker"]
//! ```

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

const TARGET: &str = "conductor";

/// Event writer subscriber.
#[derive(Default)]
pub struct LogWriter;

impl LogWriter {
    /// Construct a new [`LogWriter`].
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let component = e.component.map(|c| c.as_str()).unwrap_or("-");
        let dependent = e.dependent.map(|c| c.as_str()).unwrap_or("-");
        let reason = e.reason.as_deref().unwrap_or("-");

        match e.kind {
            EventKind::ComponentAdded => {
                info!(target: TARGET, component, implementation = reason, "added");
            }
            EventKind::ComponentPatched => {
                info!(target: TARGET, component, substitute = reason, "patched");
            }
            EventKind::SetupStarting => {
                info!(target: TARGET, component, "setup starting");
            }
            EventKind::ComponentAcquired => {
                debug!(target: TARGET, component, dependent, "acquired");
            }
            EventKind::ComponentActive => {
                info!(target: TARGET, component, "active");
            }
            EventKind::SetupFailed => {
                warn!(target: TARGET, component, error = reason, "setup failed");
            }
            EventKind::ShutdownStarting => {
                info!(target: TARGET, component, "shutdown starting");
            }
            EventKind::ComponentReleased => {
                debug!(target: TARGET, component, dependent, "released");
            }
            EventKind::ComponentInactive => {
                info!(target: TARGET, component, "inactive");
            }
            EventKind::ShutdownFailed => {
                warn!(target: TARGET, component, error = reason, "shutdown failed");
            }
            EventKind::ReloadStarting => {
                info!(target: TARGET, component, "reload starting");
            }
            EventKind::ComponentReloaded => {
                info!(target: TARGET, component, "reloaded");
            }
            EventKind::ReloadFailed => {
                warn!(target: TARGET, component, error = reason, "reload failed");
            }
            EventKind::HealthCheckFailed => {
                warn!(target: TARGET, component, timeout_ms = ?e.timeout_ms, "health check failed");
            }
            EventKind::ConductorActive => {
                info!(target: TARGET, "all components active");
            }
            EventKind::ConductorInactive => {
                info!(target: TARGET, "all components inactive");
            }
            EventKind::ShutdownRequested => {
                info!(target: TARGET, "shutdown requested");
            }
            EventKind::GraceExceeded => {
                warn!(target: TARGET, timeout_ms = ?e.timeout_ms, stuck = reason, "grace exceeded");
            }
            EventKind::SubscriberPanicked => {
                warn!(
                    target: TARGET,
                    subscriber = e.subscriber.unwrap_or("unknown"),
                    info = reason,
                    "subscriber panicked"
                );
            }
            EventKind::SubscriberOverflow => {
                warn!(
                    target: TARGET,
                    subscriber = e.subscriber.unwrap_or("unknown"),
                    reason,
                    "subscriber overflow"
                );
            }
        }
    }

    fn name(&self) -> &'static str {
        "LogWriter"
    }
}
