use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use conductor::{
    Component, ComponentError, ComponentId, ComponentKind, Conductor, ConductorConfig,
    ConductorError, Dependencies, Event, EventKind, Lifecycle, Phase, Provide, Subscribe,
};
use tokio_util::sync::CancellationToken;

/// Shared context: records hook calls and carries a switch components read on setup.
#[derive(Default)]
struct Env {
    journal: Mutex<Vec<String>>,
    outage: AtomicBool,
}

impl Env {
    fn record(&self, entry: String) {
        self.journal.lock().unwrap().push(entry);
    }

    fn journal(&self) -> Vec<String> {
        self.journal.lock().unwrap().clone()
    }

    fn position(&self, entry: &str) -> usize {
        self.journal()
            .iter()
            .position(|e| e == entry)
            .unwrap_or_else(|| panic!("{entry} not recorded"))
    }
}

/// Declares a component that records `<id>:<hook>:begin|end` around a yield.
macro_rules! recorded {
    ($name:ident, $id:literal $(, $dep:ident)*) => {
        struct $name {
            env: Arc<Env>,
        }

        #[async_trait]
        impl Component<Env> for $name {
            fn dependencies(&self) -> Vec<ComponentKind<Env>> {
                vec![$(ComponentKind::of::<$dep>()),*]
            }

            async fn on_setup(&self, _deps: &Dependencies<Env>) -> Result<(), ComponentError> {
                self.env.record(format!("{}:setup:begin", $id));
                tokio::task::yield_now().await;
                self.env.record(format!("{}:setup:end", $id));
                Ok(())
            }

            async fn on_shutdown(&self, _deps: &Dependencies<Env>) -> Result<(), ComponentError> {
                self.env.record(format!("{}:shutdown:begin", $id));
                tokio::task::yield_now().await;
                self.env.record(format!("{}:shutdown:end", $id));
                Ok(())
            }
        }

        impl Provide<Env> for $name {
            const ID: &'static str = $id;

            fn construct(env: Arc<Env>) -> Self {
                Self { env }
            }
        }
    };
}

recorded!(Root, "root", Left, Right);
recorded!(Left, "left", Leaf);
recorded!(Right, "right");
recorded!(Leaf, "leaf");

recorded!(Store, "store");
recorded!(FakeStore, "fake_store");
recorded!(Api, "api", Store);
recorded!(Worker, "worker", Store);
recorded!(Cron, "cron", Store);

recorded!(Apex, "apex", East, West);
recorded!(East, "east", Base);
recorded!(West, "west", Base);
recorded!(Base, "base");

recorded!(Ping, "ping", Pong);
recorded!(Pong, "pong", Ping);

/// Healthy unless the outage switch was on during its last setup.
struct Probe {
    env: Arc<Env>,
    healthy: AtomicBool,
}

#[async_trait]
impl Component<Env> for Probe {
    async fn on_setup(&self, _deps: &Dependencies<Env>) -> Result<(), ComponentError> {
        let outage = self.env.outage.load(Ordering::SeqCst);
        self.healthy.store(!outage, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> bool {
        self.healthy.load(Ordering::SeqCst)
    }
}

impl Provide<Env> for Probe {
    const ID: &'static str = "probe";

    fn construct(env: Arc<Env>) -> Self {
        Self {
            env,
            healthy: AtomicBool::new(false),
        }
    }
}

/// Fails to set up while the outage switch is on.
struct Fragile {
    env: Arc<Env>,
}

#[async_trait]
impl Component<Env> for Fragile {
    fn dependencies(&self) -> Vec<ComponentKind<Env>> {
        vec![ComponentKind::of::<Store>()]
    }

    async fn on_setup(&self, _deps: &Dependencies<Env>) -> Result<(), ComponentError> {
        if self.env.outage.load(Ordering::SeqCst) {
            return Err(ComponentError::fail("upstream unavailable"));
        }
        Ok(())
    }
}

impl Provide<Env> for Fragile {
    const ID: &'static str = "fragile";

    fn construct(env: Arc<Env>) -> Self {
        Self { env }
    }
}

fn journal_of(conductor: &Conductor<Env>) -> Vec<String> {
    conductor.context().journal()
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_setup_and_shutdown_follow_dependency_edges() {
    let conductor = Conductor::new(Env::default());
    conductor.add::<Root>();

    conductor.setup().await.unwrap();
    assert!(conductor.is_active());
    assert_eq!(
        conductor.components(),
        vec!["root", "left", "right", "leaf"]
    );

    let env = Arc::clone(conductor.context());
    // dependency end < dependent begin
    for (dep, dependent) in [("leaf", "left"), ("left", "root"), ("right", "root")] {
        assert!(
            env.position(&format!("{dep}:setup:end"))
                < env.position(&format!("{dependent}:setup:begin")),
            "{dep} must be set up before {dependent}: {:?}",
            env.journal()
        );
    }

    conductor.shutdown().await.unwrap();
    assert!(!conductor.is_active());
    for (dep, dependent) in [("leaf", "left"), ("left", "root"), ("right", "root")] {
        assert!(
            env.position(&format!("{dependent}:shutdown:end"))
                < env.position(&format!("{dep}:shutdown:begin")),
            "{dependent} must shut down before {dep}: {:?}",
            env.journal()
        );
    }
    for id in conductor.components() {
        let cell = conductor.get_named(id.as_str()).unwrap();
        assert_eq!(cell.state(), Lifecycle::Inactive);
        assert!(!cell.is_acquired());
    }
}

#[tokio::test]
async fn test_patch_substitutes_implementation() {
    let conductor = Conductor::new(Env::default());
    conductor.patch::<Store, FakeStore>();
    conductor.add::<Api>();
    conductor.setup().await.unwrap();

    let original = conductor.get::<Store>().unwrap();
    let substitute = conductor.get::<FakeStore>().unwrap();
    assert!(Arc::ptr_eq(&original, &substitute));
    assert_eq!(original.id(), "store");
    assert_eq!(original.kind(), "fake_store");
    assert!(original.downcast::<FakeStore>().is_some());
    assert!(original.downcast::<Store>().is_none());

    let api = conductor.get::<Api>().unwrap();
    let dep = api.get_dependency("store").unwrap();
    assert!(Arc::ptr_eq(&dep, &original));

    let journal = journal_of(&conductor);
    assert!(journal.contains(&"fake_store:setup:end".to_string()));
    assert!(!journal.iter().any(|e| e.starts_with("store:")));
    assert_eq!(conductor.components().len(), 2);
}

#[tokio::test]
async fn test_patch_to_already_live_substitute_shares_it() {
    let conductor = Conductor::new(Env::default());
    let fake = conductor.add::<FakeStore>();
    conductor.patch::<Store, FakeStore>();
    conductor.add::<Api>();
    conductor.setup().await.unwrap();

    let original = conductor.get::<Store>().unwrap();
    assert!(Arc::ptr_eq(&original, &fake));
    assert_eq!(conductor.components(), vec!["fake_store", "api"]);

    let api = conductor.get::<Api>().unwrap();
    let dep = api.get_dependency("store").unwrap();
    assert!(Arc::ptr_eq(&dep, &fake));
    assert_eq!(api.required(), vec!["store"]);
    assert_eq!(fake.dependents(), vec!["api"]);

    let journal = journal_of(&conductor);
    let setups = journal.iter().filter(|e| *e == "fake_store:setup:end").count();
    assert_eq!(setups, 1);
}

#[tokio::test]
async fn test_acquired_until_last_dependent_releases() {
    let conductor = Conductor::new(Env::default());
    conductor.add::<Api>();
    conductor.add::<Worker>();
    conductor.add::<Cron>();
    conductor.setup().await.unwrap();

    let store = conductor.get::<Store>().unwrap();
    assert_eq!(store.dependents(), vec!["api", "cron", "worker"]);
    assert!(store.is_acquired());

    let token = CancellationToken::new();
    for dependent in ["api", "worker"] {
        conductor
            .get_named(dependent)
            .unwrap()
            .shutdown(&token)
            .await
            .unwrap();
        assert!(store.is_acquired(), "still held after {dependent} left");
    }

    conductor.get::<Cron>().unwrap().shutdown(&token).await.unwrap();
    assert!(!store.is_acquired());
    store.released().await;
}

#[tokio::test]
async fn test_get_dependency_ignores_undeclared_components() {
    let conductor = Conductor::new(Env::default());
    conductor.add::<Api>();
    conductor.add::<Leaf>();
    conductor.setup().await.unwrap();

    let api = conductor.get::<Api>().unwrap();
    assert!(conductor.get::<Leaf>().is_some());
    assert!(api.get_dependency("leaf").is_none());
    assert!(api.get_dependency("store").is_some());
}

#[tokio::test]
async fn test_health_check_names_unhealthy_until_reloaded() {
    let conductor = Conductor::new(Env::default());
    conductor.add::<Store>();
    conductor.context().outage.store(true, Ordering::SeqCst);
    conductor.add::<Probe>();
    conductor.setup().await.unwrap();

    match conductor.health_check().await {
        Err(ConductorError::HealthCheckFailure { component }) => assert_eq!(component, "probe"),
        other => panic!("expected health check failure, got {other:?}"),
    }

    conductor.context().outage.store(false, Ordering::SeqCst);
    let cascade = conductor.get::<Probe>().unwrap().reload().await.unwrap();
    assert!(cascade.report().await.is_clean());

    conductor.health_check().await.unwrap();
}

#[tokio::test]
async fn test_cycle_fails_before_any_hook() {
    let conductor = Conductor::new(Env::default());
    conductor.add::<Ping>();

    match conductor.setup().await {
        Err(ConductorError::DependencyCycle { path }) => {
            assert_eq!(path, vec!["ping", "pong", "ping"]);
        }
        other => panic!("expected cycle, got {other:?}"),
    }
    assert!(journal_of(&conductor).is_empty());
    assert!(!conductor.is_active());
}

#[tokio::test]
async fn test_setup_failure_is_propagated_without_rollback() {
    let conductor = Conductor::new(Env::default());
    conductor.context().outage.store(true, Ordering::SeqCst);
    conductor.add::<Fragile>();

    let err = conductor.setup().await.unwrap_err();
    assert!(matches!(
        err,
        ConductorError::Implementation { component, phase: Phase::Setup, .. } if component == "fragile"
    ));
    assert_eq!(err.as_label(), "component_implementation");

    // The dependency stays up until an explicit shutdown.
    let store = conductor.get::<Store>().unwrap();
    assert!(store.is_active());
    assert!(!conductor.is_active());

    conductor.shutdown().await.unwrap();
    assert!(!store.is_active());
    assert!(journal_of(&conductor).contains(&"store:shutdown:end".to_string()));
}

#[tokio::test]
async fn test_add_named_resolves_known_kinds() {
    let conductor = Conductor::new(Env::default());

    match conductor.add_named("store") {
        Err(ConductorError::Construction { component }) => assert_eq!(component, "store"),
        other => panic!("expected construction error, got {other:?}"),
    }

    conductor.register::<Store>();
    let cell = conductor.add_named("store").unwrap();
    assert_eq!(cell.id(), "store");
    assert!(Arc::ptr_eq(&cell, &conductor.get::<Store>().unwrap()));
}

#[tokio::test]
async fn test_second_setup_only_starts_new_components() {
    let conductor = Conductor::new(Env::default());
    conductor.add::<Store>();
    conductor.setup().await.unwrap();

    conductor.add::<Api>();
    conductor.setup().await.unwrap();

    let setups: Vec<_> = journal_of(&conductor)
        .into_iter()
        .filter(|e| e.ends_with(":setup:end"))
        .collect();
    assert_eq!(setups, vec!["store:setup:end", "api:setup:end"]);

    conductor.shutdown().await.unwrap();
    assert!(matches!(
        conductor.setup().await,
        Err(ConductorError::Terminated)
    ));
}

#[tokio::test]
async fn test_reload_cascade_reports_failed_dependents() {
    let conductor = Conductor::new(Env::default());
    conductor.add::<Fragile>();
    conductor.add::<Api>();
    conductor.setup().await.unwrap();
    let mut rx = conductor.subscribe();

    conductor.context().outage.store(true, Ordering::SeqCst);
    let store = conductor.get::<Store>().unwrap();
    let report = store.reload().await.unwrap().report().await;

    assert_eq!(report.reloaded, vec![ComponentId::new("api")]);
    assert_eq!(report.failures.len(), 1);
    let (failed, err) = &report.failures[0];
    assert_eq!(*failed, "fragile");
    assert!(matches!(err, ConductorError::Implementation { phase: Phase::Reload, .. }));

    let fragile = conductor.get::<Fragile>().unwrap();
    assert!(!fragile.is_active());

    let failed_events: Vec<Event> = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|ev| ev.kind == EventKind::ReloadFailed)
        .collect();
    assert_eq!(failed_events.len(), 1);
    assert_eq!(failed_events[0].component, Some(ComponentId::new("fragile")));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_reload_through_diamond_reloads_shared_dependent_per_path() {
    let conductor = Conductor::new(Env::default());
    conductor.add::<Apex>();
    conductor.setup().await.unwrap();
    let mut rx = conductor.subscribe();

    let base = conductor.get::<Base>().unwrap();
    let report = base.reload().await.unwrap().report().await;

    assert!(report.is_clean(), "unexpected failures: {:?}", report.failures);
    let mut reloaded = report.reloaded.clone();
    reloaded.sort();
    assert_eq!(reloaded, vec!["apex", "apex", "east", "west"]);

    let journal = journal_of(&conductor);
    let apex_setups = journal.iter().filter(|e| *e == "apex:setup:end").count();
    assert_eq!(apex_setups, 3);
    for id in ["apex", "east", "west", "base"] {
        let cell = conductor.get_named(id).unwrap();
        assert_eq!(cell.state(), Lifecycle::Active, "{id}");
    }

    let failed = std::iter::from_fn(|| rx.try_recv().ok())
        .filter(|ev| ev.kind == EventKind::ReloadFailed)
        .count();
    assert_eq!(failed, 0);
}

struct Recorder {
    kinds: Mutex<Vec<EventKind>>,
}

#[async_trait]
impl Subscribe for Recorder {
    async fn on_event(&self, event: &Event) {
        self.kinds.lock().unwrap().push(event.kind);
    }

    fn name(&self) -> &'static str {
        "recorder"
    }
}

#[tokio::test]
async fn test_subscribers_observe_lifecycle() {
    let recorder = Arc::new(Recorder {
        kinds: Mutex::new(Vec::new()),
    });
    let subs: Vec<Arc<dyn Subscribe>> = vec![recorder.clone()];
    let conductor = Conductor::<Env>::builder(ConductorConfig::default())
        .with_subscribers(subs)
        .build(Env::default());

    conductor.add::<Api>();
    conductor.setup().await.unwrap();
    conductor.shutdown().await.unwrap();

    tokio::time::timeout(Duration::from_secs(5), async {
        while !recorder.kinds.lock().unwrap().contains(&EventKind::ConductorInactive) {
            tokio::task::yield_now().await;
        }
    })
    .await
    .expect("subscriber never saw ConductorInactive");

    let kinds = recorder.kinds.lock().unwrap().clone();
    for expected in [
        EventKind::ComponentAdded,
        EventKind::SetupStarting,
        EventKind::ComponentAcquired,
        EventKind::ComponentActive,
        EventKind::ConductorActive,
        EventKind::ShutdownStarting,
        EventKind::ComponentReleased,
        EventKind::ComponentInactive,
    ] {
        assert!(kinds.contains(&expected), "missing {expected:?} in {kinds:?}");
    }
}
