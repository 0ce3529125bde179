//! # Component identity and type-erased constructors.
//!
//! Every component kind is identified by a stable string tag ([`ComponentId`])
//! chosen by the kind itself via [`Provide::ID`]. Registries, patches and
//! dependency lookups all key on this tag, never on runtime type names.
//!
//! A [`ComponentKind`] pairs the tag with a constructor so the conductor can
//! materialize a dependency it has only seen declared.

use std::any::Any;
use std::borrow::Borrow;
use std::fmt;
use std::sync::Arc;

use crate::components::Component;

/// Stable identity tag of a component kind.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ComponentId(&'static str);

impl ComponentId {
    /// Creates an identity from a static name.
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    /// Returns the tag as a string.
    pub fn as_str(&self) -> &'static str {
        self.0
    }
}

impl Borrow<str> for ComponentId {
    fn borrow(&self) -> &str {
        self.0
    }
}

impl From<&'static str> for ComponentId {
    fn from(name: &'static str) -> Self {
        Self(name)
    }
}

impl fmt::Display for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.0)
    }
}

impl fmt::Debug for ComponentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(self.0, f)
    }
}

impl PartialEq<str> for ComponentId {
    fn eq(&self, other: &str) -> bool {
        self.0 == other
    }
}

impl PartialEq<&str> for ComponentId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

/// A concrete, constructible component kind.
///
/// # Example
/// ```
/// use std::sync::Arc;
/// use conductor::{Component, Provide};
///
/// struct Cache;
///
/// impl Component<()> for Cache {}
///
/// impl Provide<()> for Cache {
///     const ID: &'static str = "cache";
///
///     fn construct(_context: Arc<()>) -> Self {
///         Cache
///     }
/// }
/// ```
pub trait Provide<C>: Component<C> + Sized
where
    C: Send + Sync + 'static,
{
    /// Identity tag of this kind; unique within a conductor.
    const ID: &'static str;

    /// Builds a fresh instance around the shared context.
    ///
    /// Keep this cheap: heavy initialization belongs in `on_setup`.
    fn construct(context: Arc<C>) -> Self;
}

/// A freshly constructed instance, viewed both as a component and as `Any`.
pub(crate) struct Instance<C> {
    pub(crate) component: Arc<dyn Component<C>>,
    pub(crate) value: Arc<dyn Any + Send + Sync>,
}

/// Type-erased constructor for one component kind.
pub struct ComponentKind<C> {
    id: ComponentId,
    build: fn(Arc<C>) -> Instance<C>,
}

impl<C> ComponentKind<C>
where
    C: Send + Sync + 'static,
{
    /// Returns the kind of `T`.
    pub fn of<T: Provide<C>>() -> Self {
        Self {
            id: ComponentId::new(T::ID),
            build: build_instance::<C, T>,
        }
    }

    /// Returns the identity tag of this kind.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    pub(crate) fn construct(&self, context: Arc<C>) -> Instance<C> {
        (self.build)(context)
    }
}

fn build_instance<C, T>(context: Arc<C>) -> Instance<C>
where
    C: Send + Sync + 'static,
    T: Provide<C>,
{
    let value = Arc::new(T::construct(context));
    Instance {
        component: value.clone(),
        value,
    }
}

impl<C> Clone for ComponentKind<C> {
    fn clone(&self) -> Self {
        Self {
            id: self.id,
            build: self.build,
        }
    }
}

impl<C> fmt::Debug for ComponentKind<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ComponentKind").field(&self.id).finish()
    }
}
