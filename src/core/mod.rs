//! Runtime core: registry, scheduling and lifecycle orchestration.
//!
//! The only public API from this module is [`Conductor`] and its
//! [`ConductorBuilder`].
//!
//! Internal modules:
//! - [`registry`]: identity-keyed ownership of component cells, patches and aliases;
//! - [`scheduler`]: fixed-point graph discovery and cycle detection;
//! - [`conductor`]: concurrent setup/shutdown, health checks, signal-driven run;
//! - [`shutdown`]: cross-platform termination signal handling.

mod builder;
mod conductor;
mod registry;
mod scheduler;
mod shutdown;

pub use builder::ConductorBuilder;
pub use conductor::Conductor;
