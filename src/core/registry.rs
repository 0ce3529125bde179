//! # Registry: the single owner of every component instance.
//!
//! The registry maps each [`ComponentId`] to its one live [`ComponentCell`]
//! and resolves patches when an identity is materialized.
//!
//! ## Architecture
//! ```text
//! add(kind) ──► lookup(kind.id) ──hit──► existing cell
//!                    │ miss
//!                    ▼
//!            patches[kind.id]? ──► effective kind (substitute or kind)
//!                    │
//!                    ▼
//!       substitute already live? ──yes──► aliases[kind.id] = substitute ──► existing cell
//!                    │ no
//!                    ▼
//!       ComponentCell::new(id = kind.id, effective) ──► components (insertion order)
//!                    │                                  aliases[substitute] = id
//!                    └──► Bus.publish(ComponentAdded)
//! ```
//!
//! ## Rules
//! - Exactly one cell per identity. After a patch is applied, both the
//!   patched identity and the substitute identity resolve to the same cell.
//! - Patches take effect at construction time only; patching a materialized
//!   identity is recorded but never swaps the live instance.
//! - Every kind the registry has seen (added, patched or declared as a
//!   dependency) joins the catalog and becomes constructible by name.
//! - Constructors run under the registry lock: they must stay cheap and must
//!   not call back into the conductor.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::components::{ComponentCell, ComponentId, ComponentKind, ComponentRef};
use crate::error::ConductorError;
use crate::events::{Bus, Event, EventKind};

struct Tables<C> {
    /// Live cells, in registration order.
    components: Vec<ComponentRef<C>>,
    /// Identity → position in `components`.
    index: HashMap<ComponentId, usize>,
    /// Patched identity → substitute kind.
    patches: HashMap<ComponentId, ComponentKind<C>>,
    /// Identity → the indexed identity sharing its instance (substitute to
    /// patched, or patched to an already live substitute).
    aliases: HashMap<ComponentId, ComponentId>,
    /// Every kind seen so far, for construction by name.
    catalog: HashMap<ComponentId, ComponentKind<C>>,
}

impl<C> Tables<C> {
    fn lookup(&self, id: &str) -> Option<&ComponentRef<C>> {
        let pos = match self.index.get(id) {
            Some(pos) => *pos,
            None => *self.index.get(self.aliases.get(id)?)?,
        };
        self.components.get(pos)
    }
}

/// Identity-keyed store of component cells.
pub(crate) struct Registry<C> {
    context: Arc<C>,
    bus: Bus,
    tables: Mutex<Tables<C>>,
}

impl<C> Registry<C>
where
    C: Send + Sync + 'static,
{
    pub(crate) fn new(context: Arc<C>, bus: Bus) -> Self {
        Self {
            context,
            bus,
            tables: Mutex::new(Tables {
                components: Vec::new(),
                index: HashMap::new(),
                patches: HashMap::new(),
                aliases: HashMap::new(),
                catalog: HashMap::new(),
            }),
        }
    }

    /// Returns the cell for `kind`, constructing it (or its substitute) on first use.
    pub(crate) fn add(&self, kind: &ComponentKind<C>) -> ComponentRef<C> {
        self.materialize(kind.id(), kind)
    }

    /// Like [`add`](Self::add), for an identity known only by name.
    ///
    /// Resolves through the patch table first, then the catalog.
    pub(crate) fn add_named(&self, name: &str) -> Result<ComponentRef<C>, ConductorError> {
        let (id, kind) = {
            let tables = self.lock();
            if let Some(cell) = tables.lookup(name) {
                return Ok(Arc::clone(cell));
            }
            match tables
                .patches
                .get_key_value(name)
                .or_else(|| tables.catalog.get_key_value(name))
            {
                Some((id, kind)) => (*id, kind.clone()),
                None => {
                    return Err(ConductorError::Construction {
                        component: name.to_string(),
                    });
                }
            }
        };
        Ok(self.materialize(id, &kind))
    }

    /// Registers a cell under `id`, built from the patch for `id` or else from `kind`.
    fn materialize(&self, id: ComponentId, kind: &ComponentKind<C>) -> ComponentRef<C> {
        let mut tables = self.lock();
        if let Some(cell) = tables.lookup(id.as_str()) {
            return Arc::clone(cell);
        }
        if kind.id() == id {
            tables.catalog.entry(id).or_insert_with(|| kind.clone());
        }

        let effective = tables.patches.get(&id).cloned().unwrap_or_else(|| kind.clone());
        if effective.id() != id {
            if let Some(live) = tables.lookup(effective.id().as_str()).cloned() {
                tables.aliases.insert(id, live.id());
                return live;
            }
        }
        let cell = ComponentCell::new(id, &effective, Arc::clone(&self.context), self.bus.clone());

        let pos = tables.components.len();
        tables.components.push(Arc::clone(&cell));
        tables.index.insert(id, pos);
        if effective.id() != id {
            tables.aliases.insert(effective.id(), id);
        }
        drop(tables);

        let mut ev = Event::new(EventKind::ComponentAdded).with_component(id);
        if cell.is_patched() {
            ev = ev.with_reason(effective.id().as_str());
        }
        self.bus.publish(ev);
        cell
    }

    /// Returns the cell registered under `id` (or aliased to it); never constructs.
    pub(crate) fn get(&self, id: &str) -> Option<ComponentRef<C>> {
        self.lock().lookup(id).cloned()
    }

    /// Records that `id` is to be materialized as `substitute`.
    pub(crate) fn patch(&self, id: ComponentId, substitute: ComponentKind<C>) {
        let materialized = {
            let mut tables = self.lock();
            tables
                .catalog
                .entry(substitute.id())
                .or_insert_with(|| substitute.clone());
            tables.patches.insert(id, substitute.clone());
            tables.lookup(id.as_str()).is_some()
        };

        let reason = if materialized {
            format!("{} (not applied: already materialized)", substitute.id())
        } else {
            substitute.id().to_string()
        };
        self.bus.publish(
            Event::new(EventKind::ComponentPatched)
                .with_component(id)
                .with_reason(reason),
        );
    }

    /// Makes `kind` constructible by name without materializing it.
    pub(crate) fn register(&self, kind: ComponentKind<C>) {
        self.lock().catalog.entry(kind.id()).or_insert(kind);
    }

    /// All cells, in registration order.
    pub(crate) fn snapshot(&self) -> Vec<ComponentRef<C>> {
        self.lock().components.clone()
    }

    /// All identities, in registration order.
    pub(crate) fn ids(&self) -> Vec<ComponentId> {
        self.lock().components.iter().map(|c| c.id()).collect()
    }

    pub(crate) fn len(&self) -> usize {
        self.lock().components.len()
    }

    pub(crate) fn context(&self) -> &Arc<C> {
        &self.context
    }

    fn lock(&self) -> MutexGuard<'_, Tables<C>> {
        self.tables.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
