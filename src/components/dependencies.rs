//! Read-only view over the dependencies a component acquired during setup.

use std::sync::Arc;

use crate::components::{ComponentId, ComponentRef, Provide};

/// The dependencies of one component, in declaration order.
///
/// Lookups match the *declared* identity, so a patched dependency is still
/// found under the identity its dependent asked for, even when that identity
/// shares an instance registered under another one.
pub struct Dependencies<C> {
    entries: Vec<(ComponentId, ComponentRef<C>)>,
}

impl<C> Dependencies<C>
where
    C: Send + Sync + 'static,
{
    pub(crate) fn new(entries: Vec<(ComponentId, ComponentRef<C>)>) -> Self {
        Self { entries }
    }

    /// Returns the dependency declared under `id`, if any.
    pub fn get(&self, id: &str) -> Option<&ComponentRef<C>> {
        self.entries
            .iter()
            .find(|(declared, _)| *declared == id)
            .map(|(_, cell)| cell)
    }

    /// Returns the dependency declared as `T`, downcast to `T`.
    ///
    /// `None` if `T` is not a dependency, or if it was patched with another kind;
    /// use [`get`](Self::get) to reach a patched instance.
    pub fn get_as<T>(&self) -> Option<Arc<T>>
    where
        T: Provide<C>,
    {
        self.get(T::ID)?.downcast::<T>()
    }

    /// Returns the declared identities, in order.
    pub fn ids(&self) -> Vec<ComponentId> {
        self.entries.iter().map(|(declared, _)| *declared).collect()
    }

    /// Iterates over the dependencies.
    pub fn iter(&self) -> impl Iterator<Item = &ComponentRef<C>> {
        self.entries.iter().map(|(_, cell)| cell)
    }

    /// Number of dependencies.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// `true` for a component without dependencies.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
