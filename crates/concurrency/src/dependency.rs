//! Dependency resolution between changes of one transition
//!
//! Two sources of edges feed the [`DependencyGraph`]:
//!
//! - implicit edges from [`DependencyResolver`], which only ever point at
//!   earlier changes
//! - declared edges (`StateChange::depends_on`, `add_dependency`), which
//!   may point anywhere in the transition
//!
//! Declared edges make cycles possible, so the graph is topologically
//! sorted (Kahn) before anything executes.
//!
//! ## Implicit rules
//!
//! A change depends on an earlier change when any of:
//!
//! | rule | condition |
//! |------|-----------|
//! | a | same target |
//! | b | both `component_*`, one target prefixes the other at a `.-_:/` boundary |
//! | c | both `resource_*`, one target is a `/` path prefix of the other |
//! | d | both `state`, earlier `inactive->active`, later `active->{inactive,error}` |
//! | e | cross-type table (below) |
//!
//! ```text
//! component_status    -> resource_allocation, state_update
//! resource_allocation -> state_update
//! state_update        -> component_init
//! ```

use smallvec::SmallVec;
use statecraft_core::{ChangeId, ChangeType, ComponentStatus, StateChange, StateError};
use std::cmp::Reverse;
use std::collections::BinaryHeap;

const COMPONENT_SEPARATORS: &[char] = &['.', '-', '_', ':', '/'];

/// Implicit dependency rules
#[derive(Debug, Clone, Copy, Default)]
pub struct DependencyResolver;

impl DependencyResolver {
    /// Implicit dependencies of `changes[index]` on earlier changes
    pub fn resolve(&self, changes: &[StateChange], index: usize) -> SmallVec<[ChangeId; 4]> {
        let Some(later) = changes.get(index) else {
            return SmallVec::new();
        };
        changes[..index]
            .iter()
            .enumerate()
            .filter(|(_, earlier)| self.depends(earlier, later))
            .map(|(j, _)| ChangeId(j as u32))
            .collect()
    }

    /// Whether `later` must run after `earlier`
    pub fn depends(&self, earlier: &StateChange, later: &StateChange) -> bool {
        same_target(earlier, later)
            || component_prefix(earlier, later)
            || resource_path_prefix(earlier, later)
            || status_chain(earlier, later)
            || type_table(&later.change_type).contains(&earlier.change_type.as_str())
    }
}

fn same_target(a: &StateChange, b: &StateChange) -> bool {
    a.target == b.target
}

fn component_prefix(a: &StateChange, b: &StateChange) -> bool {
    a.change_type.is_component()
        && b.change_type.is_component()
        && prefixed_at(&a.target, &b.target, |c| COMPONENT_SEPARATORS.contains(&c))
}

fn resource_path_prefix(a: &StateChange, b: &StateChange) -> bool {
    a.change_type.is_resource()
        && b.change_type.is_resource()
        && prefixed_at(&a.target, &b.target, |c| c == '/')
}

/// One of `a`, `b` is a strict prefix of the other, ending at a boundary
fn prefixed_at(a: &str, b: &str, boundary: impl Fn(char) -> bool) -> bool {
    let (short, long) = if a.len() <= b.len() { (a, b) } else { (b, a) };
    if short.is_empty() || short.len() == long.len() || !long.starts_with(short) {
        return false;
    }
    short.ends_with(&boundary) || long[short.len()..].starts_with(&boundary)
}

fn status_pair(change: &StateChange) -> Option<(ComponentStatus, ComponentStatus)> {
    let from = ComponentStatus::from_value(&change.old_value).ok()?;
    let to = ComponentStatus::from_value(&change.new_value).ok()?;
    from.can_transition_to(to).then_some((from, to))
}

fn status_chain(a: &StateChange, b: &StateChange) -> bool {
    use ComponentStatus::*;
    if a.change_type != ChangeType::State || b.change_type != ChangeType::State {
        return false;
    }
    matches!(
        (status_pair(a), status_pair(b)),
        (Some((Inactive, Active)), Some((Active, Inactive)))
            | (Some((Inactive, Active)), Some((Active, Error)))
    )
}

fn type_table(later: &ChangeType) -> &'static [&'static str] {
    match later {
        ChangeType::ComponentStatus => &["resource_allocation", "state_update"],
        ChangeType::ResourceAllocation => &["state_update"],
        ChangeType::StateUpdate => &["component_init"],
        _ => &[],
    }
}

/// Dependency edges of one transition
///
/// Node `i` is the change with `ChangeId(i)`; `dependencies(i)` lists the
/// changes it waits for.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    edges: Vec<SmallVec<[ChangeId; 4]>>,
}

impl DependencyGraph {
    /// Build the graph for `changes`
    ///
    /// Combines resolver edges, each change's own `depends_on` list and
    /// `declared` `(change, depends_on)` pairs.
    ///
    /// # Errors
    /// - `Dependency` if a declared edge names a change outside the
    ///   transition
    pub fn build(
        resolver: &DependencyResolver,
        changes: &[StateChange],
        declared: &[(ChangeId, ChangeId)],
    ) -> Result<Self, StateError> {
        let n = changes.len();
        let mut edges: Vec<SmallVec<[ChangeId; 4]>> =
            (0..n).map(|i| resolver.resolve(changes, i)).collect();

        let own = changes
            .iter()
            .enumerate()
            .flat_map(|(i, c)| c.depends_on.iter().map(move |d| (ChangeId(i as u32), *d)));
        for (change, dep) in own.chain(declared.iter().copied()) {
            if change.index() >= n || dep.index() >= n {
                return Err(StateError::Dependency {
                    change,
                    message: format!("depends on unknown {}", dep),
                });
            }
            let deps = &mut edges[change.index()];
            if !deps.contains(&dep) {
                deps.push(dep);
            }
        }

        for deps in &mut edges {
            deps.sort_unstable();
        }
        Ok(Self { edges })
    }

    /// Number of nodes
    pub fn len(&self) -> usize {
        self.edges.len()
    }

    /// Check if the graph has no nodes
    pub fn is_empty(&self) -> bool {
        self.edges.is_empty()
    }

    /// Changes `change` waits for, ascending
    pub fn dependencies(&self, change: ChangeId) -> &[ChangeId] {
        self.edges
            .get(change.index())
            .map(|d| d.as_slice())
            .unwrap_or(&[])
    }

    /// Kahn's topological sort, lowest ID first among ready nodes
    ///
    /// # Errors
    /// - `DependencyCycle` listing every change that could not be ordered
    pub fn topological_order(&self) -> Result<Vec<ChangeId>, StateError> {
        let n = self.edges.len();
        let mut indegree = vec![0usize; n];
        let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
        for (i, deps) in self.edges.iter().enumerate() {
            indegree[i] = deps.len();
            for dep in deps {
                dependents[dep.index()].push(i);
            }
        }

        let mut ready: BinaryHeap<Reverse<usize>> = indegree
            .iter()
            .enumerate()
            .filter(|(_, d)| **d == 0)
            .map(|(i, _)| Reverse(i))
            .collect();
        let mut order = Vec::with_capacity(n);
        while let Some(Reverse(i)) = ready.pop() {
            order.push(ChangeId(i as u32));
            for &next in &dependents[i] {
                indegree[next] -= 1;
                if indegree[next] == 0 {
                    ready.push(Reverse(next));
                }
            }
        }

        if order.len() == n {
            Ok(order)
        } else {
            let changes = (0..n)
                .filter(|i| indegree[*i] > 0)
                .map(|i| ChangeId(i as u32))
                .collect();
            Err(StateError::DependencyCycle { changes })
        }
    }
}
