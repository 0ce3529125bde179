//! # Component hooks.
//!
//! [`Component`] is the extension point applications implement: the business
//! logic that runs when the conductor brings a component up or down. Lifecycle
//! bookkeeping (ordering, acquire/release, signals) lives in
//! [`ComponentCell`](crate::ComponentCell); a hook only ever sees its own
//! dependencies through [`Dependencies`].
//!
//! ## Rules
//! - `on_setup` runs only after every declared dependency is active.
//! - `on_shutdown` runs only after every dependent has released the component.
//! - Errors are propagated to the caller of `setup`/`shutdown`/`reload`, never retried.
//! - `health_check` must not suspend indefinitely.

use async_trait::async_trait;

use crate::components::{ComponentKind, Dependencies};
use crate::error::ComponentError;

/// Lifecycle hooks of a managed service.
///
/// `C` is the context type shared by every component of one conductor.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use conductor::{Component, ComponentError, ComponentKind, Dependencies, Provide};
///
/// struct Database;
/// impl Component<()> for Database {}
/// impl Provide<()> for Database {
///     const ID: &'static str = "database";
///     fn construct(_: Arc<()>) -> Self { Database }
/// }
///
/// struct Api;
///
/// #[async_trait]
/// impl Component<()> for Api {
///     fn dependencies(&self) -> Vec<ComponentKind<()>> {
///         vec![ComponentKind::of::<Database>()]
///     }
///
///     async fn on_setup(&self, deps: &Dependencies<()>) -> Result<(), ComponentError> {
///         let _db: Arc<Database> = deps
///             .get_as::<Database>()
///             .ok_or_else(|| ComponentError::fail("database missing"))?;
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Component<C>: Send + Sync + 'static
where
    C: Send + Sync + 'static,
{
    /// Declares the kinds this component depends on, in order.
    ///
    /// Read once, right after construction.
    fn dependencies(&self) -> Vec<ComponentKind<C>> {
        Vec::new()
    }

    /// Brings the service up. Every dependency is active when this runs.
    async fn on_setup(&self, _deps: &Dependencies<C>) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Brings the service down. No dependent holds it when this runs.
    async fn on_shutdown(&self, _deps: &Dependencies<C>) -> Result<(), ComponentError> {
        Ok(())
    }

    /// Reports whether the service is healthy.
    async fn health_check(&self) -> bool {
        true
    }
}
