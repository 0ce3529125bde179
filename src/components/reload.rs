//! # Reload cascade: best-effort propagation of a reload to dependents.
//!
//! When a component reloads, each of its current dependents is reloaded in its
//! own spawned task, and so on down the graph. The originator gets a
//! [`ReloadCascade`] holding those tasks:
//! - await [`ReloadCascade::report`] to collect every outcome, or
//! - drop it: the tasks keep running detached.
//!
//! Failures are reported both in the [`ReloadReport`] and as `ReloadFailed`
//! events on the bus, so a detached cascade never fails silently.
//!
//! ## Rules
//! - A dependent reachable through several paths is reloaded once per path.
//! - A failed dependent does not stop its siblings; its own dependents are not reloaded.

use tokio::task::JoinHandle;

use crate::components::{ComponentId, ComponentRef, Phase};
use crate::error::ConductorError;

/// Outcome of a reload cascade.
#[derive(Debug, Default)]
pub struct ReloadReport {
    /// Dependents that reloaded successfully, depth-first per branch.
    pub reloaded: Vec<ComponentId>,
    /// Dependents whose reload failed, with the reason.
    pub failures: Vec<(ComponentId, ConductorError)>,
}

impl ReloadReport {
    /// `true` when no dependent failed.
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }

    fn merge(&mut self, other: ReloadReport) {
        self.reloaded.extend(other.reloaded);
        self.failures.extend(other.failures);
    }
}

/// In-flight reloads of a component's dependents.
#[derive(Debug)]
pub struct ReloadCascade {
    origin: ComponentId,
    tasks: Vec<(ComponentId, JoinHandle<ReloadReport>)>,
}

impl ReloadCascade {
    pub(crate) fn new(origin: ComponentId, tasks: Vec<(ComponentId, JoinHandle<ReloadReport>)>) -> Self {
        Self { origin, tasks }
    }

    /// The component whose reload started this cascade.
    pub fn origin(&self) -> ComponentId {
        self.origin
    }

    /// The direct dependents being reloaded.
    pub fn dependents(&self) -> Vec<ComponentId> {
        self.tasks.iter().map(|(id, _)| *id).collect()
    }

    /// Waits for the whole cascade and collects its outcome.
    pub async fn report(self) -> ReloadReport {
        let mut report = ReloadReport::default();
        for (id, task) in self.tasks {
            match task.await {
                Ok(branch) => report.merge(branch),
                Err(_) => report.failures.push((
                    id,
                    ConductorError::Panicked {
                        component: id,
                        phase: Phase::Reload,
                    },
                )),
            }
        }
        report
    }
}

/// Reloads `dependent` and everything downstream of it.
pub(crate) async fn cascade<C>(dependent: ComponentRef<C>) -> ReloadReport
where
    C: Send + Sync + 'static,
{
    match dependent.reload().await {
        Ok(next) => {
            let mut report = ReloadReport {
                reloaded: vec![dependent.id()],
                failures: Vec::new(),
            };
            report.merge(next.report().await);
            report
        }
        Err(err) => ReloadReport {
            reloaded: Vec::new(),
            failures: vec![(dependent.id(), err)],
        },
    }
}
