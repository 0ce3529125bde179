//! Lifecycle states and phases of a component.

use std::fmt;

/// Where a component is in its lifecycle.
///
/// Orthogonal to this, a component is either acquired (some dependent holds
/// it) or released; see [`ComponentCell::is_acquired`](crate::ComponentCell::is_acquired).
///
/// ```text
/// Unset ──► SettingUp ──► Active ──► ShuttingDown ──► Inactive
///               │           ▲  │
///               │           │  ▼
///               │          Reloading ──(hook failed)──► Inactive
///               └──(hook failed)──────────────────────► Inactive
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Lifecycle {
    /// Constructed, setup not started.
    Unset,
    /// Acquiring dependencies or running `on_setup`.
    SettingUp,
    /// `on_setup` completed; dependents may acquire it.
    Active,
    /// Running `on_shutdown` + `on_setup` in place.
    Reloading,
    /// Waiting for dependents to release it, or running `on_shutdown`.
    ShuttingDown,
    /// Shut down, or a hook failed.
    Inactive,
}

/// Lifecycle phase, used to label errors and events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    Setup,
    Shutdown,
    Reload,
}

impl Phase {
    /// Returns a short stable label.
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Setup => "setup",
            Phase::Shutdown => "shutdown",
            Phase::Reload => "reload",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
