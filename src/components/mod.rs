//! # Components: identity, hooks and lifecycle.
//!
//! This module provides the component-related types:
//! - [`Component`] - trait with the lifecycle hooks applications implement
//! - [`Provide`] / [`ComponentKind`] / [`ComponentId`] - identity and construction
//! - [`ComponentCell`] / [`ComponentRef`] - the lifecycle state machine wrapping an instance
//! - [`Dependencies`] - what a hook sees of its own dependencies
//! - [`ReloadCascade`] / [`ReloadReport`] - outcome of a cascading reload

mod cell;
mod component;
mod dependencies;
mod kind;
mod lifecycle;
mod reload;

pub use cell::{ComponentCell, ComponentRef};
pub use component::Component;
pub use dependencies::Dependencies;
pub use kind::{ComponentId, ComponentKind, Provide};
pub use lifecycle::{Lifecycle, Phase};
pub use reload::{ReloadCascade, ReloadReport};
