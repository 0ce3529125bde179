//! # Demo: service
//!
//! Brings a small service graph up, reloads its configuration layer, and
//! tears everything down again, printing lifecycle events as they happen.
//!
//! Shows how to:
//! - Implement [`Component`] and [`Provide`] for your services.
//! - Share a context between components.
//! - Attach a custom [`Subscribe`] implementation.
//! - Reload a component and collect the cascade report.
//!
//! ## Graph
//! ```text
//! Api ──► Cache ──► Settings
//!  └─────────────────►┘
//! ```
//!
//! ## Run
//! ```bash
//! cargo run --example service
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use conductor::{
    Component, ComponentError, ComponentKind, Conductor, ConductorConfig, Dependencies, Event,
    Provide, Subscribe,
};

/// Shared by every component.
struct AppContext {
    name: &'static str,
    generation: AtomicU32,
}

struct Settings;

#[async_trait]
impl Component<AppContext> for Settings {
    async fn on_setup(&self, _deps: &Dependencies<AppContext>) -> Result<(), ComponentError> {
        Ok(())
    }
}

impl Provide<AppContext> for Settings {
    const ID: &'static str = "settings";

    fn construct(_: Arc<AppContext>) -> Self {
        Settings
    }
}

struct Cache {
    ctx: Arc<AppContext>,
}

#[async_trait]
impl Component<AppContext> for Cache {
    fn dependencies(&self) -> Vec<ComponentKind<AppContext>> {
        vec![ComponentKind::of::<Settings>()]
    }

    async fn on_setup(&self, _deps: &Dependencies<AppContext>) -> Result<(), ComponentError> {
        let generation = self.ctx.generation.fetch_add(1, Ordering::SeqCst);
        println!("[cache] warming up (generation {generation})");
        tokio::time::sleep(Duration::from_millis(50)).await;
        Ok(())
    }
}

impl Provide<AppContext> for Cache {
    const ID: &'static str = "cache";

    fn construct(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

struct Api {
    ctx: Arc<AppContext>,
}

#[async_trait]
impl Component<AppContext> for Api {
    fn dependencies(&self) -> Vec<ComponentKind<AppContext>> {
        vec![
            ComponentKind::of::<Cache>(),
            ComponentKind::of::<Settings>(),
        ]
    }

    async fn on_setup(&self, deps: &Dependencies<AppContext>) -> Result<(), ComponentError> {
        println!("[api] {} listening, deps={:?}", self.ctx.name, deps.ids());
        Ok(())
    }

    async fn on_shutdown(&self, _deps: &Dependencies<AppContext>) -> Result<(), ComponentError> {
        println!("[api] draining connections");
        Ok(())
    }
}

impl Provide<AppContext> for Api {
    const ID: &'static str = "api";

    fn construct(ctx: Arc<AppContext>) -> Self {
        Self { ctx }
    }
}

/// Prints every event with its sequence number.
struct Console;

#[async_trait]
impl Subscribe for Console {
    async fn on_event(&self, ev: &Event) {
        let component = ev.component.map(|c| c.as_str()).unwrap_or("-");
        println!("[event #{}] {:?} component={component}", ev.seq, ev.kind);
    }

    fn name(&self) -> &'static str {
        "console"
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = ConductorConfig {
        setup_timeout: Duration::from_secs(5),
        shutdown_grace: Duration::from_secs(5),
        ..ConductorConfig::default()
    };
    #[allow(unused_mut)]
    let mut subs: Vec<Arc<dyn Subscribe>> = vec![Arc::new(Console)];
    // Silent unless a `tracing` subscriber is installed.
    #[cfg(feature = "logging")]
    subs.push(Arc::new(conductor::LogWriter::new()));
    let conductor = Conductor::<AppContext>::builder(cfg).with_subscribers(subs).build(AppContext {
        name: "demo",
        generation: AtomicU32::new(0),
    });

    conductor.add::<Api>();
    conductor.setup().await?;
    conductor.health_check().await?;
    println!("components: {:?}", conductor.components());

    let cache = conductor.get::<Cache>().ok_or("cache missing")?;
    let report = cache.reload().await?.report().await;
    println!("reloaded after cache: {:?}", report.reloaded);

    conductor.shutdown().await?;

    // Give the subscriber worker a moment to drain its queue.
    tokio::time::sleep(Duration::from_millis(100)).await;
    Ok(())
}
