//! Error types used by the conductor runtime and by component hooks.
//!
//! This module defines two main error types:
//!
//! - [`ConductorError`]: errors raised by the orchestration runtime itself.
//! - [`ComponentError`]: errors raised by a component's own `on_setup` /
//!   `on_shutdown` logic.
//!
//! Hook failures are never retried or swallowed: they reach the caller of
//! `setup`/`shutdown`/`reload` wrapped in [`ConductorError::Implementation`].

use std::time::Duration;

use thiserror::Error;

use crate::components::{ComponentId, Phase};

/// # Errors produced by the conductor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ConductorError {
    /// Neither a patch nor a known constructor resolves the requested identity.
    #[error("no constructor resolvable for component {component:?}")]
    Construction {
        /// The identity that was requested.
        component: String,
    },

    /// A component reported itself unhealthy (or its check timed out).
    #[error("health check failed for component {component}")]
    HealthCheckFailure {
        /// The first unhealthy component in registration order.
        component: ComponentId,
    },

    /// A component hook returned an error.
    #[error("component {component} failed during {phase}: {source}")]
    Implementation {
        /// The failing component.
        component: ComponentId,
        /// The lifecycle phase the hook ran in.
        phase: Phase,
        /// The error returned by the hook.
        #[source]
        source: ComponentError,
    },

    /// A component hook panicked inside its lifecycle task.
    #[error("component {component} panicked during {phase}")]
    Panicked {
        /// The component whose task panicked.
        component: ComponentId,
        /// The lifecycle phase the task was running.
        phase: Phase,
    },

    /// The declared dependencies form a cycle; nothing was started.
    #[error("dependency cycle detected: {}", format_path(.path))]
    DependencyCycle {
        /// The cycle, starting and ending with the same component.
        path: Vec<ComponentId>,
    },

    /// Setup did not complete within the configured timeout.
    #[error("setup timeout {timeout:?} exceeded; pending: {pending:?}")]
    SetupTimeout {
        /// The configured timeout.
        timeout: Duration,
        /// Components that had not become active.
        pending: Vec<ComponentId>,
    },

    /// Shutdown grace period was exceeded; some components never went inactive.
    #[error("shutdown grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace period.
        grace: Duration,
        /// Components that did not reach `Inactive` in time.
        stuck: Vec<ComponentId>,
    },

    /// Reload was requested on a component that is not active.
    #[error("component {component} is not active")]
    NotActive {
        /// The component that was asked to reload.
        component: ComponentId,
    },

    /// A lifecycle wait was cancelled before its signal fired.
    #[error("component {component} cancelled while waiting during {phase}")]
    Cancelled {
        /// The component whose wait was cancelled.
        component: ComponentId,
        /// The lifecycle phase of the wait.
        phase: Phase,
    },

    /// The conductor was shut down; it cannot be set up again.
    #[error("conductor has been shut down")]
    Terminated,

    /// Installing the OS signal handlers failed.
    #[error("signal handler failed: {0}")]
    Signal(#[source] std::io::Error),
}

impl ConductorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use conductor::ConductorError;
    ///
    /// assert_eq!(ConductorError::Terminated.as_label(), "conductor_terminated");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            ConductorError::Construction { .. } => "component_construction",
            ConductorError::HealthCheckFailure { .. } => "health_check_failure",
            ConductorError::Implementation { .. } => "component_implementation",
            ConductorError::Panicked { .. } => "component_panicked",
            ConductorError::DependencyCycle { .. } => "dependency_cycle",
            ConductorError::SetupTimeout { .. } => "setup_timeout",
            ConductorError::GraceExceeded { .. } => "shutdown_grace_exceeded",
            ConductorError::NotActive { .. } => "component_not_active",
            ConductorError::Cancelled { .. } => "wait_cancelled",
            ConductorError::Terminated => "conductor_terminated",
            ConductorError::Signal(_) => "signal_handler",
        }
    }

    /// Returns the component this error is about, if it names one.
    pub fn component(&self) -> Option<ComponentId> {
        match self {
            ConductorError::HealthCheckFailure { component }
            | ConductorError::Implementation { component, .. }
            | ConductorError::Panicked { component, .. }
            | ConductorError::NotActive { component }
            | ConductorError::Cancelled { component, .. } => Some(*component),
            _ => None,
        }
    }
}

fn format_path(path: &[ComponentId]) -> String {
    path.iter()
        .map(ComponentId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}

/// # Errors produced by component hooks.
///
/// Return these from [`Component::on_setup`](crate::Component::on_setup) and
/// [`Component::on_shutdown`](crate::Component::on_shutdown).
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ComponentError {
    /// The hook failed with a message.
    #[error("{error}")]
    Failed {
        /// The underlying error message.
        error: String,
    },

    /// The hook failed with an underlying error value.
    #[error(transparent)]
    Other(#[from] Box<dyn std::error::Error + Send + Sync + 'static>),
}

impl ComponentError {
    /// Shorthand for [`ComponentError::Failed`].
    ///
    /// # Example
    /// ```
    /// use conductor::ComponentError;
    ///
    /// let err = ComponentError::fail("database unreachable");
    /// assert_eq!(err.to_string(), "database unreachable");
    /// ```
    pub fn fail(error: impl Into<String>) -> Self {
        ComponentError::Failed {
            error: error.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cycle_message_lists_path() {
        let err = ConductorError::DependencyCycle {
            path: vec![
                ComponentId::new("a"),
                ComponentId::new("b"),
                ComponentId::new("a"),
            ],
        };
        assert_eq!(err.to_string(), "dependency cycle detected: a -> b -> a");
        assert_eq!(err.as_label(), "dependency_cycle");
        assert_eq!(err.component(), None);
    }

    #[test]
    fn test_implementation_error_keeps_source() {
        let err = ConductorError::Implementation {
            component: ComponentId::new("db"),
            phase: Phase::Setup,
            source: ComponentError::fail("refused"),
        };
        assert_eq!(err.to_string(), "component db failed during setup: refused");
        assert_eq!(err.component(), Some(ComponentId::new("db")));
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("refused"));
    }

    #[test]
    fn test_boxed_errors_convert_into_component_error() {
        let io = std::io::Error::other("disk full");
        let boxed: Box<dyn std::error::Error + Send + Sync> = Box::new(io);
        let err: ComponentError = boxed.into();
        assert_eq!(err.to_string(), "disk full");
    }
}
