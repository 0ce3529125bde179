//! # Scheduler: turns the registry into a launch plan.
//!
//! The dependency graph is not known up front: resolving a declared
//! dependency may construct a component nobody registered explicitly.
//! Discovery therefore scans the registry to a fixed point.
//!
//! ```text
//! loop:
//!   for cell in registry (registration order):
//!       not yet scheduled? ──► mark scheduled
//!                              resolve cell.dependencies() via registry.add  (may grow the registry)
//!                              plan.push(Launch { cell, depends_on })
//!   scheduled == registry.len()? ──► done
//!
//! find_cycle(plan) ──► DFS over the new edges ──► Some(path) | None
//! ```
//!
//! ## Rules
//! - Every transitively discovered component is scheduled exactly once.
//! - Components scheduled by an earlier call are never planned again.
//! - A cycle can only run through newly planned components, since earlier
//!   components resolved all of their dependencies when they were planned.

use std::collections::{HashMap, HashSet};

use crate::components::{ComponentId, ComponentRef};
use crate::core::registry::Registry;
use crate::error::ConductorError;

/// One component to bring up, with its resolved dependencies.
pub(crate) struct Launch<C> {
    pub(crate) cell: ComponentRef<C>,
    pub(crate) depends_on: Vec<ComponentRef<C>>,
}

/// Schedules every registered component missing from `scheduled`.
///
/// On a dependency cycle nothing is scheduled and the cycle is returned as
/// [`ConductorError::DependencyCycle`].
pub(crate) fn plan<C>(
    registry: &Registry<C>,
    scheduled: &mut HashSet<ComponentId>,
) -> Result<Vec<Launch<C>>, ConductorError>
where
    C: Send + Sync + 'static,
{
    let plan = discover(registry, scheduled);

    if let Some(path) = find_cycle(&plan) {
        for launch in &plan {
            scheduled.remove(&launch.cell.id());
        }
        return Err(ConductorError::DependencyCycle { path });
    }
    Ok(plan)
}

fn discover<C>(registry: &Registry<C>, scheduled: &mut HashSet<ComponentId>) -> Vec<Launch<C>>
where
    C: Send + Sync + 'static,
{
    let mut plan = Vec::new();
    loop {
        for cell in registry.snapshot() {
            if !scheduled.insert(cell.id()) {
                continue;
            }
            let depends_on = cell
                .dependencies()
                .iter()
                .map(|kind| registry.add(kind))
                .collect();
            plan.push(Launch { cell, depends_on });
        }
        if scheduled.len() >= registry.len() {
            return plan;
        }
    }
}

#[derive(Clone, Copy)]
enum Mark {
    Visiting,
    Done,
}

/// Returns a dependency cycle among the planned components, if there is one.
///
/// The path starts and ends with the same component.
pub(crate) fn find_cycle<C>(plan: &[Launch<C>]) -> Option<Vec<ComponentId>>
where
    C: Send + Sync + 'static,
{
    let edges: HashMap<ComponentId, Vec<ComponentId>> = plan
        .iter()
        .map(|l| (l.cell.id(), l.depends_on.iter().map(|d| d.id()).collect()))
        .collect();

    let mut marks = HashMap::new();
    let mut stack = Vec::new();
    plan.iter()
        .find_map(|l| visit(l.cell.id(), &edges, &mut marks, &mut stack))
}

fn visit(
    id: ComponentId,
    edges: &HashMap<ComponentId, Vec<ComponentId>>,
    marks: &mut HashMap<ComponentId, Mark>,
    stack: &mut Vec<ComponentId>,
) -> Option<Vec<ComponentId>> {
    match marks.get(&id) {
        Some(Mark::Done) => return None,
        Some(Mark::Visiting) => {
            let start = stack.iter().position(|s| *s == id)?;
            let mut path = stack[start..].to_vec();
            path.push(id);
            return Some(path);
        }
        None => {}
    }
    // Scheduled by an earlier call.
    let next = edges.get(&id)?;

    marks.insert(id, Mark::Visiting);
    stack.push(id);
    for dep in next {
        if let Some(path) = visit(*dep, edges, marks, stack) {
            return Some(path);
        }
    }
    stack.pop();
    marks.insert(id, Mark::Done);
    None
}
