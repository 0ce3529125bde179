//! # Conductor: owns the components and drives them in dependency order.
//!
//! The [`Conductor`] owns the event bus, the component registry and the
//! conductor-level active signal. It discovers the dependency graph, brings
//! every component up concurrently, and tears everything down again.
//!
//! ## High-level architecture
//! ```text
//! setup():
//!   scheduler::plan(registry) ──► fixed-point discovery + cycle check
//!       Launch[0]   Launch[1]  ...  Launch[N-1]
//!           │           │               │
//!           └──► set.spawn(cell.setup(depends_on, setup_token))     (one task per component)
//!                     └─► acquire() waits on each dependency's active signal
//!   first error ──► setup_token.cancel()   (blocked acquirers return Cancelled)
//!   all Ok      ──► active_signal.set() ──► Bus.publish(ConductorActive)
//!
//! shutdown():
//!   set.spawn(cell.shutdown(token)) for every registered component
//!       └─► each waits for its own dependents to release it (acquired signal)
//!   all joined        ──► active_signal.clear() ──► Bus.publish(ConductorInactive)
//!   grace exceeded    ──► Bus.publish(GraceExceeded) ──► abort remaining tasks
//!
//! run():
//!   setup() ──► shutdown::wait_for_shutdown_signal() ──► Bus.publish(ShutdownRequested) ──► shutdown()
//! ```
//!
//! ## Rules
//! - Ordering is enforced by the components themselves: the conductor only
//!   launches everything at once.
//! - `setup` and `shutdown` never run at the same time; a call waits for the
//!   one in progress.
//! - A failed setup is not rolled back; call `shutdown` to bring the started
//!   part of the graph down.
//! - Once `shutdown` was called, `setup` fails with [`ConductorError::Terminated`].

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use futures::FutureExt;
use futures::future::join_all;
use tokio::sync::{Mutex, broadcast};
use tokio::task::{JoinHandle, JoinSet};
use tokio_util::sync::CancellationToken;

use crate::components::{ComponentId, ComponentKind, ComponentRef, Phase, Provide};
use crate::config::ConductorConfig;
use crate::core::builder::ConductorBuilder;
use crate::core::registry::Registry;
use crate::core::scheduler::{self, Launch};
use crate::core::shutdown;
use crate::error::ConductorError;
use crate::events::{Bus, Event, EventKind};
use crate::signal::BinarySignal;

type Outcome = (ComponentId, Result<(), ConductorError>);

/// Owns every component of an application and drives their lifecycle.
///
/// `C` is the context shared by all components.
///
/// # Example
/// ```rust
/// use std::sync::Arc;
/// use async_trait::async_trait;
/// use conductor::{Component, ComponentError, ComponentKind, Conductor, Dependencies, Provide};
///
/// struct Database;
/// impl Component<()> for Database {}
/// impl Provide<()> for Database {
///     const ID: &'static str = "database";
///     fn construct(_: Arc<()>) -> Self { Database }
/// }
///
/// struct Api;
/// #[async_trait]
/// impl Component<()> for Api {
///     fn dependencies(&self) -> Vec<ComponentKind<()>> {
///         vec![ComponentKind::of::<Database>()]
///     }
///     async fn on_setup(&self, deps: &Dependencies<()>) -> Result<(), ComponentError> {
///         assert!(deps.get("database").unwrap().is_active());
///         Ok(())
///     }
/// }
/// impl Provide<()> for Api {
///     const ID: &'static str = "api";
///     fn construct(_: Arc<()>) -> Self { Api }
/// }
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), conductor::ConductorError> {
/// let conductor = Conductor::new(());
/// conductor.add::<Api>();
///
/// conductor.setup().await?;
/// assert!(conductor.get::<Database>().unwrap().is_active());
///
/// conductor.shutdown().await?;
/// assert!(!conductor.is_active());
/// # Ok(())
/// # }
/// ```
pub struct Conductor<C> {
    cfg: ConductorConfig,
    bus: Bus,
    registry: Registry<C>,
    /// Identities already scheduled by `setup`; held for a whole setup or shutdown.
    scheduled: Mutex<HashSet<ComponentId>>,
    active_signal: BinarySignal,
    terminated: AtomicBool,
    listener: Option<JoinHandle<()>>,
}

impl<C> Conductor<C>
where
    C: Send + Sync + 'static,
{
    /// Creates a conductor with the default configuration and no subscribers.
    pub fn new(context: C) -> Self {
        ConductorBuilder::new(ConductorConfig::default()).build(context)
    }

    /// Starts building a conductor with `cfg`.
    pub fn builder(cfg: ConductorConfig) -> ConductorBuilder {
        ConductorBuilder::new(cfg)
    }

    pub(crate) fn new_internal(
        cfg: ConductorConfig,
        bus: Bus,
        context: Arc<C>,
        listener: Option<JoinHandle<()>>,
    ) -> Self {
        Self {
            registry: Registry::new(context, bus.clone()),
            cfg,
            bus,
            scheduled: Mutex::new(HashSet::new()),
            active_signal: BinarySignal::new(false),
            terminated: AtomicBool::new(false),
            listener,
        }
    }

    // === Registry ===

    /// Returns the component `T`, constructing it (or its patch) on first use.
    pub fn add<T: Provide<C>>(&self) -> ComponentRef<C> {
        self.registry.add(&ComponentKind::of::<T>())
    }

    /// Like [`add`](Self::add), for a type-erased kind.
    pub fn add_kind(&self, kind: &ComponentKind<C>) -> ComponentRef<C> {
        self.registry.add(kind)
    }

    /// Like [`add`](Self::add), for an identity known only by name.
    ///
    /// The name resolves through the patches first, then through every kind
    /// the conductor has seen. Fails with [`ConductorError::Construction`]
    /// when neither knows it.
    pub fn add_named(&self, name: &str) -> Result<ComponentRef<C>, ConductorError> {
        self.registry.add_named(name)
    }

    /// Makes `T` constructible by name (see [`add_named`](Self::add_named))
    /// without constructing it.
    pub fn register<T: Provide<C>>(&self) {
        self.registry.register(ComponentKind::of::<T>());
    }

    /// Returns the component `T` if it exists; never constructs.
    ///
    /// After `patch::<X, Y>()` was applied, `get::<X>()` and `get::<Y>()`
    /// return the same instance.
    pub fn get<T: Provide<C>>(&self) -> Option<ComponentRef<C>> {
        self.registry.get(T::ID)
    }

    /// Like [`get`](Self::get), by name.
    pub fn get_named(&self, name: &str) -> Option<ComponentRef<C>> {
        self.registry.get(name)
    }

    /// Makes future construction of `X` build a `Y` instead.
    ///
    /// The substitute is registered under `X`'s identity, so dependents that
    /// declared `X` find it. Only identities not yet constructed are affected.
    pub fn patch<X, Y>(&self)
    where
        X: Provide<C>,
        Y: Provide<C>,
    {
        self.registry
            .patch(ComponentId::new(X::ID), ComponentKind::of::<Y>());
    }

    /// Like [`patch`](Self::patch), for a type-erased substitute.
    pub fn patch_kind(&self, id: ComponentId, substitute: ComponentKind<C>) {
        self.registry.patch(id, substitute);
    }

    // === Lifecycle ===

    /// Discovers the dependency graph and brings every new component up.
    ///
    /// Returns once every scheduled component is active, or with the first
    /// failure. Components scheduled by an earlier call are not set up again.
    pub async fn setup(&self) -> Result<(), ConductorError> {
        let mut scheduled = self.scheduled.lock().await;
        if self.is_terminated() {
            return Err(ConductorError::Terminated);
        }
        let plan = scheduler::plan(&self.registry, &mut scheduled)?;

        let token = CancellationToken::new();
        let mut pending: Vec<ComponentId> = plan.iter().map(|l| l.cell.id()).collect();
        let mut set = JoinSet::new();
        for Launch { cell, depends_on } in plan {
            let token = token.clone();
            set.spawn(async move {
                let id = cell.id();
                let res = AssertUnwindSafe(cell.setup(depends_on, &token))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(panicked(id, Phase::Setup)));
                (id, res)
            });
        }

        let res = match self.cfg.setup_limit() {
            None => drain(&mut set, &mut pending, Some(&token)).await,
            Some(timeout) => {
                let bounded =
                    tokio::time::timeout(timeout, drain(&mut set, &mut pending, Some(&token)))
                        .await;
                match bounded {
                    Ok(res) => res,
                    Err(_) => {
                        token.cancel();
                        set.shutdown().await;
                        Err(ConductorError::SetupTimeout { timeout, pending })
                    }
                }
            }
        };
        res?;

        self.active_signal.set();
        self.bus.publish(Event::new(EventKind::ConductorActive));
        Ok(())
    }

    /// Brings every registered component down, dependents first.
    ///
    /// Returns the first failure after every component has been given the
    /// chance to stop. With a shutdown grace configured, components still
    /// running when it elapses are abandoned and reported as stuck.
    pub async fn shutdown(&self) -> Result<(), ConductorError> {
        self.terminated.store(true, Ordering::SeqCst);
        let _scheduled = self.scheduled.lock().await;

        let cells = self.registry.snapshot();
        let token = CancellationToken::new();
        let mut pending: Vec<ComponentId> = cells.iter().map(|c| c.id()).collect();
        let mut set = JoinSet::new();
        for cell in cells {
            let token = token.clone();
            set.spawn(async move {
                let id = cell.id();
                let res = AssertUnwindSafe(cell.shutdown(&token))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| Err(panicked(id, Phase::Shutdown)));
                (id, res)
            });
        }

        let res = match self.cfg.grace_limit() {
            None => drain(&mut set, &mut pending, None).await,
            Some(grace) => {
                let bounded = tokio::time::timeout(grace, drain(&mut set, &mut pending, None)).await;
                match bounded {
                    Ok(res) => res,
                    Err(_) => {
                        token.cancel();
                        set.shutdown().await;
                        self.bus.publish(
                            Event::new(EventKind::GraceExceeded)
                                .with_timeout(grace)
                                .with_reason(format!("{pending:?}")),
                        );
                        Err(ConductorError::GraceExceeded {
                            grace,
                            stuck: pending,
                        })
                    }
                }
            }
        };

        self.active_signal.clear();
        if res.is_ok() {
            self.bus.publish(Event::new(EventKind::ConductorInactive));
        }
        res
    }

    /// Checks every component concurrently.
    ///
    /// Fails with [`ConductorError::HealthCheckFailure`] naming the first
    /// unhealthy component in registration order. A check that exceeds the
    /// configured health-check timeout counts as unhealthy. Every failing
    /// component is reported on the bus.
    pub async fn health_check(&self) -> Result<(), ConductorError> {
        let cells = self.registry.snapshot();
        let limit = self.cfg.health_check_limit();

        let checks = cells.iter().map(|cell| async move {
            match limit {
                None => Ok(cell.health_check().await),
                Some(t) => tokio::time::timeout(t, cell.health_check())
                    .await
                    .map_err(|_| t),
            }
        });
        let results: Vec<Result<bool, Duration>> = join_all(checks).await;

        let mut first = None;
        for (cell, res) in cells.iter().zip(results) {
            let timeout = match res {
                Ok(true) => continue,
                Ok(false) => None,
                Err(t) => Some(t),
            };
            let mut ev = Event::new(EventKind::HealthCheckFailed).with_component(cell.id());
            if let Some(t) = timeout {
                ev = ev.with_timeout(t);
            }
            self.bus.publish(ev);
            first.get_or_insert(cell.id());
        }

        match first {
            Some(component) => Err(ConductorError::HealthCheckFailure { component }),
            None => Ok(()),
        }
    }

    /// Sets everything up, waits for a termination signal, then shuts down.
    ///
    /// A failed setup is returned as is, without shutting down.
    pub async fn run(&self) -> Result<(), ConductorError> {
        self.setup().await?;
        shutdown::wait_for_shutdown_signal().await?;
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.shutdown().await
    }

    // === Status ===

    /// Resolves once a setup completed.
    pub async fn active(&self) {
        self.active_signal.wait(true).await;
    }

    /// Resolves once the conductor is not active.
    pub async fn inactive(&self) {
        self.active_signal.wait(false).await;
    }

    /// Whether the last setup completed and no shutdown followed it.
    pub fn is_active(&self) -> bool {
        self.active_signal.is_set()
    }

    /// Whether `shutdown` has been called.
    pub fn is_terminated(&self) -> bool {
        self.terminated.load(Ordering::SeqCst)
    }

    /// Registered identities, in registration order.
    pub fn components(&self) -> Vec<ComponentId> {
        self.registry.ids()
    }

    /// The context shared by every component.
    pub fn context(&self) -> &Arc<C> {
        self.registry.context()
    }

    /// The configuration this conductor was built with.
    pub fn config(&self) -> &ConductorConfig {
        &self.cfg
    }

    /// A raw receiver of every event published after this call.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}

impl<C> Drop for Conductor<C> {
    fn drop(&mut self) {
        if let Some(listener) = self.listener.take() {
            listener.abort();
        }
    }
}

/// Joins every task, removing finished components from `pending`.
///
/// Returns the first error; with `cancel_on_error`, that token is cancelled
/// as soon as it arrives.
async fn drain(
    set: &mut JoinSet<Outcome>,
    pending: &mut Vec<ComponentId>,
    cancel_on_error: Option<&CancellationToken>,
) -> Result<(), ConductorError> {
    let mut first = None;
    while let Some(joined) = set.join_next().await {
        // Tasks are only aborted after this future is dropped.
        let Ok((id, res)) = joined else { continue };
        pending.retain(|p| *p != id);

        if let Err(err) = res {
            if first.is_none() {
                if let Some(token) = cancel_on_error {
                    token.cancel();
                }
                first = Some(err);
            }
        }
    }
    first.map_or(Ok(()), Err)
}

fn panicked(component: ComponentId, phase: Phase) -> ConductorError {
    ConductorError::Panicked { component, phase }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::{Component, Dependencies};
    use crate::error::ComponentError;
    use async_trait::async_trait;

    struct Slow;
    #[async_trait]
    impl Component<()> for Slow {
        async fn on_setup(&self, _deps: &Dependencies<()>) -> Result<(), ComponentError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
    }
    impl Provide<()> for Slow {
        const ID: &'static str = "slow";
        fn construct(_: Arc<()>) -> Self {
            Slow
        }
    }

    struct Stubborn;
    #[async_trait]
    impl Component<()> for Stubborn {
        async fn on_shutdown(&self, _deps: &Dependencies<()>) -> Result<(), ComponentError> {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok(())
        }
        async fn health_check(&self) -> bool {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            true
        }
    }
    impl Provide<()> for Stubborn {
        const ID: &'static str = "stubborn";
        fn construct(_: Arc<()>) -> Self {
            Stubborn
        }
    }

    struct Panics;
    #[async_trait]
    impl Component<()> for Panics {
        async fn on_setup(&self, _deps: &Dependencies<()>) -> Result<(), ComponentError> {
            panic!("setup exploded");
        }
    }
    impl Provide<()> for Panics {
        const ID: &'static str = "panics";
        fn construct(_: Arc<()>) -> Self {
            Panics
        }
    }

    struct NeedsPanics;
    impl Component<()> for NeedsPanics {
        fn dependencies(&self) -> Vec<ComponentKind<()>> {
            vec![ComponentKind::of::<Panics>()]
        }
    }
    impl Provide<()> for NeedsPanics {
        const ID: &'static str = "needs_panics";
        fn construct(_: Arc<()>) -> Self {
            NeedsPanics
        }
    }

    fn bounded(cfg: ConductorConfig) -> Conductor<()> {
        Conductor::<()>::builder(cfg).build(())
    }

    #[tokio::test(start_paused = true)]
    async fn test_setup_timeout_names_pending() {
        let conductor = bounded(ConductorConfig {
            setup_timeout: Duration::from_secs(1),
            ..ConductorConfig::default()
        });
        conductor.add::<Slow>();

        match conductor.setup().await {
            Err(ConductorError::SetupTimeout { timeout, pending }) => {
                assert_eq!(timeout, Duration::from_secs(1));
                assert_eq!(pending, vec![ComponentId::new("slow")]);
            }
            other => panic!("expected setup timeout, got {other:?}"),
        }
        assert!(!conductor.is_active());
    }

    #[tokio::test(start_paused = true)]
    async fn test_shutdown_grace_reports_stuck() {
        let conductor = bounded(ConductorConfig {
            shutdown_grace: Duration::from_secs(2),
            ..ConductorConfig::default()
        });
        conductor.add::<Stubborn>();
        conductor.setup().await.unwrap();
        let mut rx = conductor.subscribe();

        match conductor.shutdown().await {
            Err(ConductorError::GraceExceeded { grace, stuck }) => {
                assert_eq!(grace, Duration::from_secs(2));
                assert_eq!(stuck, vec![ComponentId::new("stubborn")]);
            }
            other => panic!("expected grace exceeded, got {other:?}"),
        }
        assert!(!conductor.is_active());

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::GraceExceeded));
        assert!(!kinds.contains(&EventKind::ConductorInactive));
    }

    #[tokio::test(start_paused = true)]
    async fn test_health_check_timeout_counts_as_unhealthy() {
        let conductor = bounded(ConductorConfig {
            health_check_timeout: Duration::from_millis(100),
            ..ConductorConfig::default()
        });
        conductor.add::<Stubborn>();
        let mut rx = conductor.subscribe();

        let err = conductor.health_check().await.unwrap_err();
        assert_eq!(err.component(), Some(ComponentId::new("stubborn")));

        let ev = rx.recv().await.unwrap();
        assert_eq!(ev.kind, EventKind::HealthCheckFailed);
        assert_eq!(ev.timeout_ms, Some(100));
    }

    #[tokio::test]
    async fn test_panicking_setup_cancels_dependents() {
        let conductor = Conductor::new(());
        conductor.add::<NeedsPanics>();

        let err = conductor.setup().await.unwrap_err();
        assert!(matches!(
            err,
            ConductorError::Panicked { component, phase: Phase::Setup } if component == "panics"
        ));
        let dependent = conductor.get::<NeedsPanics>().unwrap();
        assert!(!dependent.is_active());
    }

    #[tokio::test]
    async fn test_setup_after_shutdown_is_rejected() {
        let conductor = Conductor::new(());
        conductor.setup().await.unwrap();
        assert!(conductor.is_active());

        conductor.shutdown().await.unwrap();
        assert!(conductor.is_terminated());
        assert!(matches!(
            conductor.setup().await,
            Err(ConductorError::Terminated)
        ));
    }

    #[tokio::test]
    async fn test_conductor_signals_follow_lifecycle() {
        let conductor = Conductor::new(());
        let mut rx = conductor.subscribe();

        conductor.setup().await.unwrap();
        conductor.active().await;
        conductor.shutdown().await.unwrap();
        conductor.inactive().await;

        let kinds: Vec<_> = std::iter::from_fn(|| rx.try_recv().ok())
            .map(|ev| ev.kind)
            .collect();
        assert_eq!(
            kinds,
            vec![EventKind::ConductorActive, EventKind::ConductorInactive]
        );
    }
}
