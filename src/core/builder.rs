//! # ConductorBuilder: assembles a conductor with optional subscribers.

use std::sync::Arc;

use tokio::task::JoinHandle;

use crate::config::ConductorConfig;
use crate::core::conductor::Conductor;
use crate::events::Bus;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Builder for constructing a [`Conductor`] with optional features.
///
/// # Example
/// ```rust
/// use std::time::Duration;
/// use conductor::{Conductor, ConductorConfig};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let cfg = ConductorConfig {
///     shutdown_grace: Duration::from_secs(30),
///     ..ConductorConfig::default()
/// };
/// let conductor = Conductor::<()>::builder(cfg).build(());
/// assert!(conductor.components().is_empty());
/// # }
/// ```
pub struct ConductorBuilder {
    cfg: ConductorConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl ConductorBuilder {
    /// Creates a new builder with the given configuration.
    pub fn new(cfg: ConductorConfig) -> Self {
        Self {
            cfg,
            subscribers: Vec::new(),
        }
    }

    /// Sets event subscribers for observability.
    ///
    /// Subscribers receive every runtime event through dedicated workers with
    /// bounded queues.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Builds the conductor around `context`.
    ///
    /// With subscribers configured, this spawns their workers and must be
    /// called inside a tokio runtime.
    pub fn build<C>(self, context: C) -> Conductor<C>
    where
        C: Send + Sync + 'static,
    {
        let bus = Bus::new(self.cfg.bus_capacity_clamped());
        let listener = (!self.subscribers.is_empty()).then(|| {
            let subs = Arc::new(SubscriberSet::new(self.subscribers, bus.clone()));
            subscriber_listener(&bus, subs)
        });
        Conductor::new_internal(self.cfg, bus, Arc::new(context), listener)
    }
}

/// Subscribes to the bus and forwards events to the subscriber set (fire-and-forget).
///
/// The conductor aborts it on drop, which closes the subscriber queues.
fn subscriber_listener(bus: &Bus, set: Arc<SubscriberSet>) -> JoinHandle<()> {
    use tokio::sync::broadcast::error::RecvError;

    let mut rx = bus.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(ev) => set.emit(&ev),
                Err(RecvError::Lagged(_)) => continue,
                Err(RecvError::Closed) => break,
            }
        }
    })
}
