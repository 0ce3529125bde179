//! # ComponentCell: lifecycle state machine around one component instance.
//!
//! A cell wraps a user [`Component`] with everything the conductor needs to
//! order it against its neighbours: two [`BinarySignal`]s and the two
//! relationship sets.
//!
//! ## Architecture
//! ```text
//!            required (Weak, declared order)
//!   ┌──────────────────────────────────────────┐
//!   │                                          ▼
//! Dependent ── acquire(dependent) ──►  Dependency
//!   ▲                                          │
//!   └──────────────────────────────────────────┘
//!            required_by (Weak, keyed by id)
//!
//! active_signal:   true between the end of `on_setup` and the start of teardown
//! acquired_signal: true iff required_by is non-empty
//! ```
//!
//! ## Rules
//! - Setup acquires every dependency concurrently; `acquire` waits for the
//!   dependency's `active_signal`, so `on_setup` never runs before its dependencies' did.
//! - Shutdown waits for `acquired_signal == false` before `on_shutdown`, then
//!   releases what it required; that release is what lets the next layer go down.
//! - `acquired_signal` is recomputed under the relationship lock on every
//!   acquire/release, so it can never disagree with `required_by`.
//! - Relationship sets hold `Weak` links: the conductor's registry owns every cell.
//! - A failed shutdown hook still releases the dependencies so the teardown wave does not stall.
//! - Reload and shutdown hooks of one component never interleave: both run under
//!   the cell's transition lock, so a shutdown issued mid-reload tears down the
//!   reloaded instance, and concurrent reloads run one after the other.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures::future::{BoxFuture, join_all};
use tokio_util::sync::CancellationToken;

use crate::components::reload::{ReloadCascade, cascade};
use crate::components::{Component, ComponentId, ComponentKind, Dependencies, Lifecycle, Phase};
use crate::error::ConductorError;
use crate::events::{Bus, Event, EventKind};
use crate::signal::BinarySignal;

/// Shared handle to a managed component.
pub type ComponentRef<C> = Arc<ComponentCell<C>>;

struct Links<C> {
    /// What this component depends on, in declaration order.
    required: Vec<(ComponentId, Weak<ComponentCell<C>>)>,
    /// Who currently holds this component acquired.
    required_by: BTreeMap<ComponentId, Weak<ComponentCell<C>>>,
}

/// Lifecycle state machine wrapping one component instance.
pub struct ComponentCell<C> {
    id: ComponentId,
    kind: ComponentId,
    context: Arc<C>,
    component: Arc<dyn Component<C>>,
    value: Arc<dyn Any + Send + Sync>,
    dependencies: Vec<ComponentKind<C>>,
    links: Mutex<Links<C>>,
    lifecycle: Mutex<Lifecycle>,
    /// Held while reload or shutdown hooks run.
    transition: tokio::sync::Mutex<()>,
    active_signal: BinarySignal,
    acquired_signal: BinarySignal,
    bus: Bus,
}

impl<C> ComponentCell<C>
where
    C: Send + Sync + 'static,
{
    /// Constructs an instance of `kind` registered under `id`.
    ///
    /// `id` differs from `kind.id()` when the identity was patched.
    pub(crate) fn new(
        id: ComponentId,
        kind: &ComponentKind<C>,
        context: Arc<C>,
        bus: Bus,
    ) -> ComponentRef<C> {
        let instance = kind.construct(Arc::clone(&context));
        let dependencies = instance.component.dependencies();

        Arc::new(Self {
            id,
            kind: kind.id(),
            context,
            component: instance.component,
            value: instance.value,
            dependencies,
            links: Mutex::new(Links {
                required: Vec::new(),
                required_by: BTreeMap::new(),
            }),
            lifecycle: Mutex::new(Lifecycle::Unset),
            transition: tokio::sync::Mutex::new(()),
            active_signal: BinarySignal::new(false),
            acquired_signal: BinarySignal::new(false),
            bus,
        })
    }

    /// Identity this component is registered and looked up under.
    pub fn id(&self) -> ComponentId {
        self.id
    }

    /// Identity of the implementation that was actually constructed.
    pub fn kind(&self) -> ComponentId {
        self.kind
    }

    /// Whether a patch substituted the implementation.
    pub fn is_patched(&self) -> bool {
        self.id != self.kind
    }

    /// The context shared by every component of the conductor.
    pub fn context(&self) -> &Arc<C> {
        &self.context
    }

    /// The wrapped component.
    pub fn component(&self) -> &Arc<dyn Component<C>> {
        &self.component
    }

    /// Typed access to the wrapped value; `None` if it is not a `T`.
    pub fn downcast<T>(&self) -> Option<Arc<T>>
    where
        T: Any + Send + Sync,
    {
        Arc::clone(&self.value).downcast::<T>().ok()
    }

    /// Declared dependency kinds, in order.
    pub fn dependencies(&self) -> &[ComponentKind<C>] {
        &self.dependencies
    }

    /// Current lifecycle state.
    pub fn state(&self) -> Lifecycle {
        *self.lock_lifecycle()
    }

    /// Whether the component is up and usable by dependents.
    pub fn is_active(&self) -> bool {
        self.active_signal.is_set()
    }

    /// Whether at least one dependent currently holds the component.
    pub fn is_acquired(&self) -> bool {
        self.acquired_signal.is_set()
    }

    /// Resolves once the component is active.
    pub async fn active(&self) {
        self.active_signal.wait(true).await;
    }

    /// Resolves once the component is not active.
    pub async fn inactive(&self) {
        self.active_signal.wait(false).await;
    }

    /// Resolves once some dependent holds the component.
    pub async fn acquired(&self) {
        self.acquired_signal.wait(true).await;
    }

    /// Resolves once no dependent holds the component.
    pub async fn released(&self) {
        self.acquired_signal.wait(false).await;
    }

    /// The raw active signal, for bounded waits.
    pub fn active_signal(&self) -> &BinarySignal {
        &self.active_signal
    }

    /// The raw acquired signal, for bounded waits.
    pub fn acquired_signal(&self) -> &BinarySignal {
        &self.acquired_signal
    }

    /// Identities of the components this one required, in declaration order.
    pub fn required(&self) -> Vec<ComponentId> {
        self.lock_links().required.iter().map(|(id, _)| *id).collect()
    }

    /// Identities of the components currently holding this one, sorted.
    pub fn dependents(&self) -> Vec<ComponentId> {
        self.lock_links().required_by.keys().copied().collect()
    }

    /// Returns the required component declared under `id`.
    ///
    /// Absence is not an error: `None` when `id` is not a dependency of this
    /// component, even if a component with that identity exists elsewhere.
    pub fn get_dependency(&self, id: &str) -> Option<ComponentRef<C>> {
        self.lock_links()
            .required
            .iter()
            .find(|(dep, _)| *dep == id)
            .and_then(|(_, weak)| weak.upgrade())
    }

    /// Brings the component up.
    ///
    /// 1. Records every `depends_on` entry as required and acquires them all concurrently.
    ///    When `depends_on` lines up with [`dependencies`](Self::dependencies),
    ///    each entry is recorded under the identity it was declared as.
    /// 2. Runs `on_setup`.
    /// 3. Sets the active signal.
    ///
    /// `cancel` bounds the acquire waits; it does not interrupt `on_setup`.
    pub async fn setup(
        self: &Arc<Self>,
        depends_on: Vec<ComponentRef<C>>,
        cancel: &CancellationToken,
    ) -> Result<(), ConductorError> {
        self.set_lifecycle(Lifecycle::SettingUp);
        self.publish(EventKind::SetupStarting);

        {
            let aligned = depends_on.len() == self.dependencies.len();
            let mut links = self.lock_links();
            for (i, dep) in depends_on.iter().enumerate() {
                let declared = if aligned { self.dependencies[i].id() } else { dep.id };
                links.required.push((declared, Arc::downgrade(dep)));
            }
        }

        let acquires = depends_on.iter().map(|dep| dep.acquire(self, cancel));
        for res in join_all(acquires).await {
            if let Err(err) = res {
                self.set_lifecycle(Lifecycle::Inactive);
                self.publish_failure(EventKind::SetupFailed, &err);
                return Err(err);
            }
        }

        let deps = self.dependency_view();
        if let Err(source) = self.component.on_setup(&deps).await {
            self.set_lifecycle(Lifecycle::Inactive);
            let err = ConductorError::Implementation {
                component: self.id,
                phase: Phase::Setup,
                source,
            };
            self.publish_failure(EventKind::SetupFailed, &err);
            return Err(err);
        }

        self.set_lifecycle(Lifecycle::Active);
        self.active_signal.set();
        self.publish(EventKind::ComponentActive);
        Ok(())
    }

    /// Brings the component down.
    ///
    /// 1. Waits until no dependent holds it and any in-flight reload finished
    ///    (both bounded by `cancel`).
    /// 2. Runs `on_shutdown`, unless the component is not active by then.
    /// 3. Clears the active signal.
    /// 4. Releases every required component, without waiting on them.
    pub async fn shutdown(&self, cancel: &CancellationToken) -> Result<(), ConductorError> {
        self.publish(EventKind::ShutdownStarting);

        if self
            .acquired_signal
            .wait_cancellable(false, cancel)
            .await
            .is_err()
        {
            return Err(ConductorError::Cancelled {
                component: self.id,
                phase: Phase::Shutdown,
            });
        }

        let _transition = tokio::select! {
            guard = self.transition.lock() => guard,
            _ = cancel.cancelled() => {
                return Err(ConductorError::Cancelled {
                    component: self.id,
                    phase: Phase::Shutdown,
                });
            }
        };

        let previous = std::mem::replace(&mut *self.lock_lifecycle(), Lifecycle::ShuttingDown);
        let outcome = if previous == Lifecycle::Active {
            let deps = self.dependency_view();
            self.component.on_shutdown(&deps).await
        } else {
            Ok(())
        };

        self.active_signal.clear();
        self.set_lifecycle(Lifecycle::Inactive);
        self.release_required();

        match outcome {
            Ok(()) => {
                self.publish(EventKind::ComponentInactive);
                Ok(())
            }
            Err(source) => {
                let err = ConductorError::Implementation {
                    component: self.id,
                    phase: Phase::Shutdown,
                    source,
                };
                self.publish_failure(EventKind::ShutdownFailed, &err);
                Err(err)
            }
        }
    }

    /// Marks this component as used by `dependent`.
    ///
    /// Waits until this component is active (bounded by `cancel`), then records
    /// the dependent and sets the acquired signal.
    pub async fn acquire(
        &self,
        dependent: &ComponentRef<C>,
        cancel: &CancellationToken,
    ) -> Result<(), ConductorError> {
        if self
            .active_signal
            .wait_cancellable(true, cancel)
            .await
            .is_err()
        {
            return Err(ConductorError::Cancelled {
                component: dependent.id,
                phase: Phase::Setup,
            });
        }

        {
            let mut links = self.lock_links();
            links.required_by.insert(dependent.id, Arc::downgrade(dependent));
            self.acquired_signal.emit(!links.required_by.is_empty());
        }

        self.bus.publish(
            Event::new(EventKind::ComponentAcquired)
                .with_component(self.id)
                .with_dependent(dependent.id),
        );
        Ok(())
    }

    /// Drops `dependent`'s hold on this component. Never suspends.
    ///
    /// Clears the acquired signal when the last dependent lets go.
    pub fn release(&self, dependent: ComponentId) {
        let removed = {
            let mut links = self.lock_links();
            let removed = links.required_by.remove(&dependent).is_some();
            self.acquired_signal.emit(!links.required_by.is_empty());
            removed
        };

        if removed {
            self.bus.publish(
                Event::new(EventKind::ComponentReleased)
                    .with_component(self.id)
                    .with_dependent(dependent),
            );
        }
    }

    /// Reloads the component in place, then cascades to its current dependents.
    ///
    /// Runs `on_shutdown` and `on_setup` with the same dependencies (nothing is
    /// re-acquired) while the active signal is cleared. On success, one task
    /// per dependent is spawned to reload it in turn; the returned
    /// [`ReloadCascade`] collects their outcome, or may be dropped to let them
    /// run detached.
    ///
    /// A reload issued while another one runs waits for it, then reloads again.
    ///
    /// Fails with [`ConductorError::NotActive`] unless the component is active
    /// once it gets its turn.
    pub fn reload(self: &Arc<Self>) -> BoxFuture<'static, Result<ReloadCascade, ConductorError>> {
        let this = Arc::clone(self);
        Box::pin(async move {
            let transition = this.transition.lock().await;
            {
                let mut lifecycle = this.lock_lifecycle();
                if *lifecycle != Lifecycle::Active {
                    drop(lifecycle);
                    let err = ConductorError::NotActive { component: this.id };
                    this.publish_failure(EventKind::ReloadFailed, &err);
                    return Err(err);
                }
                *lifecycle = Lifecycle::Reloading;
            }
            this.publish(EventKind::ReloadStarting);
            this.active_signal.clear();

            let deps = this.dependency_view();
            let outcome = match this.component.on_shutdown(&deps).await {
                Ok(()) => this.component.on_setup(&deps).await,
                Err(err) => Err(err),
            };

            if let Err(source) = outcome {
                this.set_lifecycle(Lifecycle::Inactive);
                let err = ConductorError::Implementation {
                    component: this.id,
                    phase: Phase::Reload,
                    source,
                };
                this.publish_failure(EventKind::ReloadFailed, &err);
                return Err(err);
            }

            this.set_lifecycle(Lifecycle::Active);
            this.active_signal.set();
            this.publish(EventKind::ComponentReloaded);
            drop(transition);

            let tasks = this
                .dependent_cells()
                .into_iter()
                .map(|dep| (dep.id, tokio::spawn(cascade(dep))))
                .collect();
            Ok(ReloadCascade::new(this.id, tasks))
        })
    }

    /// Runs the component's own health check.
    pub async fn health_check(&self) -> bool {
        self.component.health_check().await
    }

    /// Snapshot of the required components that are still alive.
    fn dependency_view(&self) -> Dependencies<C> {
        let entries = self
            .lock_links()
            .required
            .iter()
            .filter_map(|(id, weak)| Some((*id, weak.upgrade()?)))
            .collect();
        Dependencies::new(entries)
    }

    fn dependent_cells(&self) -> Vec<ComponentRef<C>> {
        self.lock_links()
            .required_by
            .values()
            .filter_map(Weak::upgrade)
            .collect()
    }

    /// Releases and forgets every required component.
    fn release_required(&self) {
        let required = std::mem::take(&mut self.lock_links().required);
        for (_, weak) in required {
            if let Some(dep) = weak.upgrade() {
                dep.release(self.id);
            }
        }
    }

    fn set_lifecycle(&self, next: Lifecycle) {
        *self.lock_lifecycle() = next;
    }

    fn publish(&self, kind: EventKind) {
        self.bus.publish(Event::new(kind).with_component(self.id));
    }

    fn publish_failure(&self, kind: EventKind, err: &ConductorError) {
        self.bus.publish(
            Event::new(kind)
                .with_component(self.id)
                .with_reason(err.to_string()),
        );
    }

    fn lock_links(&self) -> MutexGuard<'_, Links<C>> {
        self.links.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn lock_lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl<C> fmt::Debug for ComponentCell<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ComponentCell")
            .field("id", &self.id)
            .field("kind", &self.kind)
            .field("active", &self.active_signal.is_set())
            .field("acquired", &self.acquired_signal.is_set())
            .finish()
    }
}
