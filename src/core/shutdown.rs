//! # OS termination signals.
//!
//! Provides [`wait_for_shutdown_signal`], which completes when the process is
//! asked to terminate. [`Conductor::run`](crate::Conductor::run) uses it to
//! move from the active phase to shutdown.
//!
//! ## Signals
//! **Unix platforms:**
//! - `SIGINT` (Ctrl-C in terminal)
//! - `SIGTERM` (default kill signal, used by systemd/Kubernetes)
//! - `SIGQUIT` (quit signal)
//!
//! **Other platforms:**
//! - `Ctrl-C` via [`tokio::signal::ctrl_c`]

use crate::error::ConductorError;

/// Waits for a termination signal.
///
/// Fails with [`ConductorError::Signal`] if the handlers cannot be installed.
#[cfg(unix)]
pub(crate) async fn wait_for_shutdown_signal() -> Result<(), ConductorError> {
    use tokio::signal::unix::{SignalKind, signal};

    let mut sigint = signal(SignalKind::interrupt()).map_err(ConductorError::Signal)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(ConductorError::Signal)?;
    let mut sigquit = signal(SignalKind::quit()).map_err(ConductorError::Signal)?;

    tokio::select! {
        _ = sigint.recv()  => {},
        _ = sigterm.recv() => {},
        _ = sigquit.recv() => {},
    }
    Ok(())
}

/// Waits for a termination signal.
///
/// Fails with [`ConductorError::Signal`] if the handler cannot be installed.
#[cfg(not(unix))]
pub(crate) async fn wait_for_shutdown_signal() -> Result<(), ConductorError> {
    tokio::signal::ctrl_c().await.map_err(ConductorError::Signal)
}
