//! Transition coordinator
//!
//! Owns in-flight transitions and drives their commits against the
//! [`StateStore`].
//!
//! ## Commit Sequence
//!
//! ```text
//! 1. initiated -> committing (guard: not already committing or finished)
//! 2. acquire commit lock, read the base state
//! 3. build the dependency graph, reject cycles (failed, store untouched)
//! 4. apply changes to a working copy of the base state
//!      atomic:     add-order on this thread, dependency gate checked inline
//!      concurrent: bounded pool of scoped workers taking ready changes
//!                  in priority order; a failure stops new starts
//! 5. validate working copy (state + transition against base)
//! 6. store.update_state_if(base_version, working)
//! 7. success: completed, record history
//!    failure: revert applied changes in reverse application order
//!             -> rolled_back, or failed if a change is not reversible
//! ```
//!
//! Because changes only ever touch the working copy, a failed commit never
//! leaves a partial update in the store. Reverting still runs through the
//! executor so that executors with external effects can undo them.
//!
//! # Thread Safety
//!
//! Commits are serialized by `commit_lock`, so two commits never compute
//! from the same base version. Registration of transitions and changes
//! only takes the `active` lock and proceeds while a commit runs.

use crate::cancel::CancellationToken;
use crate::dependency::{DependencyGraph, DependencyResolver};
use crate::executor::{ChangeExecutor, DefaultExecutor};
use crate::options::CoordinatorOptions;
use crate::pending::{ChangePriority, PendingChange, PendingStatus};
use crate::rollback::{RollbackPlan, StepStatus};
use crate::transition::{Transition, TransitionRecord, TransitionStatus, TransitionType};
use parking_lot::{Condvar, Mutex, RwLock};
use rustc_hash::FxHashMap;
use statecraft_core::{
    now, ChangeId, Result, StateChange, StateError, SystemState, TransitionId,
};
use statecraft_storage::StateStore;
use statecraft_validation::ValidationEngine;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use tracing::{debug, error, info, warn};

/// Commit counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CoordinatorMetrics {
    /// Commits that installed a new state
    pub committed: u64,
    /// Commits (and aborts) that were fully undone
    pub rolled_back: u64,
    /// Commits that failed without a clean undo
    pub failed: u64,
    /// Transitions currently in flight
    pub active: usize,
}

struct ActiveTransition {
    transition: Transition,
    plan: RollbackPlan,
    declared: Vec<(ChangeId, ChangeId)>,
}

/// Everything a commit needs, copied out of the active map
struct Prepared {
    id: TransitionId,
    changes: Vec<StateChange>,
    plan: RollbackPlan,
    declared: Vec<(ChangeId, ChangeId)>,
    retries: u32,
}

struct Gate {
    status: Vec<PendingStatus>,
    completed: Vec<ChangeId>,
    error: Option<StateError>,
}

impl Gate {
    /// First pending change, in dispatch order, whose dependencies have
    /// all completed
    fn next_ready(&self, order: &[usize], graph: &DependencyGraph) -> Option<usize> {
        order.iter().copied().find(|&i| {
            self.status[i] == PendingStatus::Pending
                && graph
                    .dependencies(ChangeId(i as u32))
                    .iter()
                    .all(|dep| self.status[dep.index()] == PendingStatus::Completed)
        })
    }

    /// After a failure nothing else starts; dependents of the failed
    /// change are never applied
    fn abandon_pending(&mut self) {
        for status in self.status.iter_mut() {
            if *status == PendingStatus::Pending {
                *status = PendingStatus::Failed;
            }
        }
    }
}

/// Shared by the workers of one concurrent commit
struct WorkQueue<'a> {
    changes: &'a [StateChange],
    graph: &'a DependencyGraph,
    /// Dispatch order: priority, then add-order
    order: Vec<usize>,
    token: &'a CancellationToken,
    gate: Mutex<Gate>,
    ready: Condvar,
    working: Mutex<&'a mut SystemState>,
}

/// Handle to a commit running on its own thread
pub struct CommitHandle {
    id: TransitionId,
    token: CancellationToken,
    handle: JoinHandle<Result<u64>>,
}

impl CommitHandle {
    /// Transition being committed
    pub fn id(&self) -> TransitionId {
        self.id
    }

    /// Cancel the commit; changes not yet executed fail and the commit
    /// rolls back
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether the commit thread has finished
    pub fn is_finished(&self) -> bool {
        self.handle.is_finished()
    }

    /// Block until the commit finishes; returns the installed version
    pub fn wait(self) -> Result<u64> {
        self.handle
            .join()
            .unwrap_or_else(|_| Err(StateError::internal("commit thread panicked")))
    }
}

/// Coordinates transitions over a shared state store
pub struct TransitionCoordinator {
    store: Arc<StateStore>,
    engine: Arc<ValidationEngine>,
    executor: Arc<dyn ChangeExecutor>,
    resolver: DependencyResolver,
    options: CoordinatorOptions,
    active: RwLock<FxHashMap<TransitionId, ActiveTransition>>,
    history: Mutex<VecDeque<TransitionRecord>>,
    /// Serializes commits between base read and state install
    commit_lock: Mutex<()>,
    committed: AtomicU64,
    rolled_back: AtomicU64,
    failed: AtomicU64,
}

impl TransitionCoordinator {
    /// Create a coordinator using the [`DefaultExecutor`]
    pub fn new(
        store: Arc<StateStore>,
        engine: Arc<ValidationEngine>,
        options: CoordinatorOptions,
    ) -> Self {
        Self::with_executor(store, engine, options, Arc::new(DefaultExecutor))
    }

    /// Create a coordinator with a custom change executor
    pub fn with_executor(
        store: Arc<StateStore>,
        engine: Arc<ValidationEngine>,
        options: CoordinatorOptions,
        executor: Arc<dyn ChangeExecutor>,
    ) -> Self {
        TransitionCoordinator {
            store,
            engine,
            executor,
            resolver: DependencyResolver,
            options,
            active: RwLock::new(FxHashMap::default()),
            history: Mutex::new(VecDeque::new()),
            commit_lock: Mutex::new(()),
            committed: AtomicU64::new(0),
            rolled_back: AtomicU64::new(0),
            failed: AtomicU64::new(0),
        }
    }

    /// Coordinator options
    pub fn options(&self) -> &CoordinatorOptions {
        &self.options
    }

    /// Begin a transition from `source` to `target` status
    ///
    /// # Errors
    /// - `Validation` for an empty source or target
    /// - `Limit` when `max_transitions` transitions are in flight
    pub fn begin_transition(&self, source: &str, target: &str) -> Result<TransitionId> {
        if source.trim().is_empty() || target.trim().is_empty() {
            return Err(StateError::validation(
                "transition source and target must not be empty",
            ));
        }

        let mut active = self.active.write();
        if active.len() >= self.options.max_transitions {
            warn!(limit = self.options.max_transitions, "too many transitions in flight");
            return Err(StateError::Limit {
                resource: "transitions",
                limit: self.options.max_transitions,
            });
        }

        let id = TransitionId::new();
        let transition_type = TransitionType::classify(source, target);
        active.insert(
            id,
            ActiveTransition {
                transition: Transition {
                    id,
                    transition_type,
                    source: source.to_string(),
                    target: target.to_string(),
                    changes: Vec::new(),
                    status: TransitionStatus::Initiated,
                    started_at: now(),
                    ended_at: None,
                    retries: 0,
                },
                plan: RollbackPlan::new(id),
                declared: Vec::new(),
            },
        );
        info!(transition = %id, %transition_type, source, target, "transition begun");
        Ok(id)
    }

    /// Append a change; returns its ID within the transition
    ///
    /// # Errors
    /// - `Validation` for a malformed change or a transition that is no
    ///   longer accepting changes
    /// - `NotFound` for an unknown transition
    pub fn add_change(&self, id: TransitionId, change: StateChange) -> Result<ChangeId> {
        change.validate()?;

        let mut active = self.active.write();
        let entry = self.initiated_mut(&mut active, id)?;
        let change_id = ChangeId(entry.transition.changes.len() as u32);
        entry.plan.push(change_id, &change);
        debug!(
            transition = %id,
            change = %change_id,
            change_type = %change.change_type,
            target = %change.target,
            "change added"
        );
        entry.transition.changes.push(change);
        Ok(change_id)
    }

    /// Declare that `change` must run after `depends_on`
    ///
    /// Both changes must already be added. The edge may point forward in
    /// add-order; cycles are rejected at commit.
    pub fn add_dependency(
        &self,
        id: TransitionId,
        change: ChangeId,
        depends_on: ChangeId,
    ) -> Result<()> {
        let mut active = self.active.write();
        let entry = self.initiated_mut(&mut active, id)?;
        let count = entry.transition.changes.len();
        if change.index() >= count || depends_on.index() >= count {
            return Err(StateError::not_found(format!(
                "{} or {} in transition {}",
                change, depends_on, id
            )));
        }
        if change == depends_on {
            return Err(StateError::validation(format!(
                "{} cannot depend on itself",
                change
            )));
        }
        if !entry.declared.contains(&(change, depends_on)) {
            entry.declared.push((change, depends_on));
        }
        Ok(())
    }

    /// Commit a transition and block until it completes or rolls back
    ///
    /// Returns the store version installed by the commit.
    ///
    /// # Errors
    /// - `NotFound` for an unknown transition
    /// - `Validation` if the transition is already committing or finished,
    ///   or a change / rule rejects the result
    /// - `Dependency` / `DependencyCycle` for unsatisfiable ordering
    /// - `Cancelled` when the deadline expires mid-commit
    /// - `Conflict` if the store moved underneath the commit; the
    ///   transition returns to `initiated` while retries remain
    /// - `Reversibility` if rollback hit a non-reversible change
    pub fn commit_transition(&self, id: TransitionId) -> Result<u64> {
        self.commit_transition_with(id, &CancellationToken::new())
    }

    /// Commit with a caller-controlled cancellation token
    pub fn commit_transition_with(
        &self,
        id: TransitionId,
        token: &CancellationToken,
    ) -> Result<u64> {
        let prepared = self.prepare(id)?;
        self.execute(prepared, token)
    }

    /// Start a commit on a background thread
    ///
    /// The transition is `committing` by the time this returns; poll
    /// [`transition_status`](Self::transition_status) or
    /// [`CommitHandle::wait`] for the outcome.
    pub fn dispatch_transition(self: &Arc<Self>, id: TransitionId) -> Result<CommitHandle> {
        let prepared = self.prepare(id)?;
        let token = CancellationToken::new();
        let thread_token = token.clone();
        let coordinator = Arc::clone(self);

        let handle = std::thread::Builder::new()
            .name(format!("commit-{}", id))
            .spawn(move || coordinator.execute(prepared, &thread_token))
            .map_err(|e| {
                self.reset_for_retry(id, false);
                StateError::internal(format!("failed to spawn commit thread: {}", e))
            })?;

        Ok(CommitHandle { id, token, handle })
    }

    /// Discard a transition that has not been committed
    pub fn abort_transition(&self, id: TransitionId) -> Result<()> {
        let mut active = self.active.write();
        self.initiated_mut(&mut active, id)?;
        info!(transition = %id, "transition aborted");
        self.finish_locked(
            &mut active,
            id,
            TransitionStatus::RolledBack,
            Some("aborted".to_string()),
            None,
            None,
            None,
        );
        Ok(())
    }

    /// Copy of an in-flight transition
    pub fn get_transition(&self, id: TransitionId) -> Result<Transition> {
        self.active
            .read()
            .get(&id)
            .map(|e| e.transition.clone())
            .ok_or_else(|| StateError::not_found(format!("active transition {}", id)))
    }

    /// Current rollback plan of an in-flight transition
    pub fn get_rollback_plan(&self, id: TransitionId) -> Result<RollbackPlan> {
        self.active
            .read()
            .get(&id)
            .map(|e| e.plan.clone())
            .ok_or_else(|| StateError::not_found(format!("active transition {}", id)))
    }

    /// Status of an in-flight or recorded transition
    pub fn transition_status(&self, id: TransitionId) -> Result<TransitionStatus> {
        let active = self.active.read();
        if let Some(entry) = active.get(&id) {
            return Ok(entry.transition.status);
        }
        self.find_record(id)
            .map(|r| r.status)
            .ok_or_else(|| StateError::not_found(format!("transition {}", id)))
    }

    /// History record of a finished transition
    pub fn get_record(&self, id: TransitionId) -> Result<TransitionRecord> {
        self.find_record(id)
            .ok_or_else(|| StateError::not_found(format!("transition record {}", id)))
    }

    /// Up to `limit` records, newest first
    pub fn get_history(&self, limit: usize) -> Vec<TransitionRecord> {
        self.history.lock().iter().rev().take(limit).cloned().collect()
    }

    /// Number of transitions in flight
    pub fn active_count(&self) -> usize {
        self.active.read().len()
    }

    /// Commit counters
    pub fn metrics(&self) -> CoordinatorMetrics {
        CoordinatorMetrics {
            committed: self.committed.load(Ordering::Relaxed),
            rolled_back: self.rolled_back.load(Ordering::Relaxed),
            failed: self.failed.load(Ordering::Relaxed),
            active: self.active_count(),
        }
    }

    fn find_record(&self, id: TransitionId) -> Option<TransitionRecord> {
        self.history.lock().iter().rev().find(|r| r.id == id).cloned()
    }

    /// Entry of a transition still accepting changes
    fn initiated_mut<'a>(
        &self,
        active: &'a mut FxHashMap<TransitionId, ActiveTransition>,
        id: TransitionId,
    ) -> Result<&'a mut ActiveTransition> {
        match active.get_mut(&id) {
            Some(entry) if entry.transition.status == TransitionStatus::Initiated => Ok(entry),
            Some(entry) => Err(StateError::validation(format!(
                "transition {} is {}",
                id, entry.transition.status
            ))),
            None => Err(self.finished_or_missing(id)),
        }
    }

    fn finished_or_missing(&self, id: TransitionId) -> StateError {
        match self.find_record(id) {
            Some(record) => StateError::validation(format!(
                "transition {} already {}",
                id, record.status
            )),
            None => StateError::not_found(format!("transition {}", id)),
        }
    }

    fn prepare(&self, id: TransitionId) -> Result<Prepared> {
        let mut active = self.active.write();
        let entry = self.initiated_mut(&mut active, id)?;
        entry.transition.status = TransitionStatus::Committing;
        Ok(Prepared {
            id,
            changes: entry.transition.changes.clone(),
            plan: entry.plan.clone(),
            declared: entry.declared.clone(),
            retries: entry.transition.retries,
        })
    }

    fn execute(&self, prepared: Prepared, token: &CancellationToken) -> Result<u64> {
        let Prepared {
            id,
            changes,
            mut plan,
            declared,
            retries,
        } = prepared;
        let token = match self.options.timeout {
            Some(timeout) => token.bounded_by(timeout),
            None => token.clone(),
        };

        let _commit_guard = self.commit_lock.lock();

        let base = match self.store.get_current_state() {
            Ok(base) => base,
            Err(e) => return Err(self.fail(id, TransitionStatus::Failed, e, None, None)),
        };
        let base_version = Some(base.version);

        let graph = match DependencyGraph::build(&self.resolver, &changes, &declared)
            .and_then(|graph| graph.topological_order().map(|_| graph))
        {
            Ok(graph) => graph,
            Err(e) => {
                warn!(transition = %id, error = %e, "rejected change set");
                return Err(self.fail(id, TransitionStatus::Failed, e, base_version, None));
            }
        };

        let mut pending = self.materialize(id, &changes, &graph);
        let mut working = (*base).clone();
        let mut completed = Vec::with_capacity(changes.len());

        let applied = if self.options.atomic_mode {
            self.run_atomic(&changes, &graph, &mut pending, &token, &mut working, &mut completed)
        } else {
            self.run_concurrent(&changes, &graph, &mut pending, &token, &mut working, &mut completed)
        };

        let result = applied
            .and_then(|_| self.engine.validate_state(&working))
            .and_then(|_| self.engine.validate_transition(&base, &working))
            .and_then(|_| self.store.update_state_if(base.version, working.clone()));

        let cause = match result {
            Ok(version) => {
                info!(
                    transition = %id,
                    changes = changes.len(),
                    version,
                    "transition committed"
                );
                self.finish(
                    id,
                    TransitionStatus::Completed,
                    None,
                    base_version,
                    Some(version),
                    None,
                );
                return Ok(version);
            }
            Err(e) => e,
        };

        warn!(
            transition = %id,
            applied = completed.len(),
            error = %cause,
            "commit failed, rolling back"
        );
        let undo = self.rollback(&mut plan, &changes, &completed, &mut working);

        match undo {
            Err(fatal) => {
                error!(
                    transition = %id,
                    error = %fatal,
                    cause = %cause,
                    "rollback incomplete, state requires reconciliation"
                );
                let message = format!("{}; rollback: {}", cause, fatal);
                self.finish(
                    id,
                    TransitionStatus::Failed,
                    Some(message),
                    base_version,
                    None,
                    Some(plan),
                );
                Err(fatal)
            }
            Ok(()) if matches!(cause, StateError::Conflict { .. })
                && retries < self.options.retry_limit =>
            {
                self.reset_for_retry(id, true);
                Err(cause)
            }
            Ok(()) => {
                self.finish(
                    id,
                    TransitionStatus::RolledBack,
                    Some(cause.to_string()),
                    base_version,
                    None,
                    Some(plan),
                );
                Err(cause)
            }
        }
    }

    fn materialize(
        &self,
        id: TransitionId,
        changes: &[StateChange],
        graph: &DependencyGraph,
    ) -> Vec<PendingChange> {
        let created = now();
        changes
            .iter()
            .enumerate()
            .map(|(i, change)| {
                let change_id = ChangeId(i as u32);
                PendingChange {
                    id: change_id,
                    transition_id: id,
                    priority: ChangePriority::of(&change.change_type),
                    dependencies: graph.dependencies(change_id).iter().copied().collect(),
                    status: PendingStatus::Pending,
                    created,
                }
            })
            .collect()
    }

    fn run_atomic(
        &self,
        changes: &[StateChange],
        graph: &DependencyGraph,
        pending: &mut [PendingChange],
        token: &CancellationToken,
        working: &mut SystemState,
        completed: &mut Vec<ChangeId>,
    ) -> Result<()> {
        for (i, change) in changes.iter().enumerate() {
            let change_id = ChangeId(i as u32);
            if let Err(e) = token.check() {
                pending[i].status = PendingStatus::Failed;
                return Err(e);
            }

            let unmet = graph
                .dependencies(change_id)
                .iter()
                .find(|dep| pending[dep.index()].status != PendingStatus::Completed)
                .copied();
            if let Some(dep) = unmet {
                pending[i].status = PendingStatus::Failed;
                return Err(StateError::Dependency {
                    change: change_id,
                    message: format!("{} has not completed", dep),
                });
            }

            pending[i].status = PendingStatus::Running;
            match self.executor.apply(change, working) {
                Ok(()) => {
                    pending[i].status = PendingStatus::Completed;
                    completed.push(change_id);
                }
                Err(e) => {
                    pending[i].status = PendingStatus::Failed;
                    debug!(change = %change_id, error = %e, "change failed");
                    return Err(e);
                }
            }
        }
        Ok(())
    }

    fn run_concurrent(
        &self,
        changes: &[StateChange],
        graph: &DependencyGraph,
        pending: &mut [PendingChange],
        token: &CancellationToken,
        working: &mut SystemState,
        completed: &mut Vec<ChangeId>,
    ) -> Result<()> {
        let mut order: Vec<usize> = (0..changes.len()).collect();
        order.sort_by_key(|&i| (pending[i].priority, i));

        let queue = WorkQueue {
            changes,
            graph,
            order,
            token,
            gate: Mutex::new(Gate {
                status: vec![PendingStatus::Pending; changes.len()],
                completed: Vec::with_capacity(changes.len()),
                error: None,
            }),
            ready: Condvar::new(),
            working: Mutex::new(working),
        };
        let workers = self.options.workers_for(changes.len());

        std::thread::scope(|scope| {
            for n in 1..workers {
                let spawned = std::thread::Builder::new()
                    .name(format!("commit-worker-{}", n))
                    .spawn_scoped(scope, || self.run_worker(&queue));
                if let Err(e) = spawned {
                    warn!(started = n, workers, error = %e, "could not start commit worker");
                    break;
                }
            }
            // The committing thread always works the queue, so the commit
            // progresses even if no helper could be started
            self.run_worker(&queue);
        });

        let gate = queue.gate.into_inner();
        for (p, status) in pending.iter_mut().zip(&gate.status) {
            p.status = *status;
        }
        completed.extend_from_slice(&gate.completed);
        match gate.error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    /// Take ready changes off the queue until it drains or a change fails
    fn run_worker(&self, queue: &WorkQueue<'_>) {
        loop {
            let index = {
                let mut g = queue.gate.lock();
                loop {
                    if g.error.is_some() {
                        g.abandon_pending();
                        queue.ready.notify_all();
                        return;
                    }
                    if let Some(i) = g.next_ready(&queue.order, queue.graph) {
                        g.status[i] = PendingStatus::Running;
                        break i;
                    }
                    if !g.status.contains(&PendingStatus::Pending) {
                        return;
                    }
                    if !g.status.contains(&PendingStatus::Running) {
                        g.error = Some(StateError::internal(
                            "no runnable change left in commit queue",
                        ));
                        continue;
                    }
                    queue.ready.wait(&mut g);
                }
            };

            let change_id = ChangeId(index as u32);
            let result = queue.token.check().and_then(|_| {
                let mut state = queue.working.lock();
                self.executor.apply(&queue.changes[index], &mut **state)
            });

            let mut g = queue.gate.lock();
            match result {
                Ok(()) => {
                    g.status[index] = PendingStatus::Completed;
                    g.completed.push(change_id);
                }
                Err(e) => {
                    debug!(change = %change_id, error = %e, "change failed");
                    g.status[index] = PendingStatus::Failed;
                    if g.error.is_none() {
                        g.error = Some(e);
                    }
                }
            }
            queue.ready.notify_all();
        }
    }

    /// Revert applied changes, newest first
    fn rollback(
        &self,
        plan: &mut RollbackPlan,
        changes: &[StateChange],
        completed: &[ChangeId],
        working: &mut SystemState,
    ) -> Result<()> {
        for step in plan.steps.iter_mut() {
            if !completed.contains(&step.change_id) {
                step.status = StepStatus::Skipped;
            }
        }

        for change_id in completed.iter().rev() {
            let change = &changes[change_id.index()];
            let step = &mut plan.steps[change_id.index()];
            if !change.reversible {
                step.status = StepStatus::Failed;
                return Err(StateError::Reversibility {
                    change: *change_id,
                    target: change.target.clone(),
                });
            }
            if let Err(e) = self.executor.revert(change, working) {
                step.status = StepStatus::Failed;
                return Err(e);
            }
            step.status = StepStatus::Completed;
            debug!(change = %change_id, target = %change.target, "change reverted");
        }
        Ok(())
    }

    fn fail(
        &self,
        id: TransitionId,
        status: TransitionStatus,
        error: StateError,
        base_version: Option<u64>,
        plan: Option<RollbackPlan>,
    ) -> StateError {
        self.finish(id, status, Some(error.to_string()), base_version, None, plan);
        error
    }

    /// Put a transition back to `initiated` after a commit that did not
    /// finish it
    fn reset_for_retry(&self, id: TransitionId, count_retry: bool) {
        if let Some(entry) = self.active.write().get_mut(&id) {
            entry.transition.status = TransitionStatus::Initiated;
            if count_retry {
                entry.transition.retries += 1;
                info!(
                    transition = %id,
                    retries = entry.transition.retries,
                    "commit lost a version race, transition may be retried"
                );
            }
        }
    }

    fn finish(
        &self,
        id: TransitionId,
        status: TransitionStatus,
        error: Option<String>,
        base_version: Option<u64>,
        committed_version: Option<u64>,
        rollback: Option<RollbackPlan>,
    ) {
        let mut active = self.active.write();
        self.finish_locked(
            &mut active,
            id,
            status,
            error,
            base_version,
            committed_version,
            rollback,
        );
    }

    /// Move a transition from the active map into the history
    #[allow(clippy::too_many_arguments)]
    fn finish_locked(
        &self,
        active: &mut FxHashMap<TransitionId, ActiveTransition>,
        id: TransitionId,
        status: TransitionStatus,
        error: Option<String>,
        base_version: Option<u64>,
        committed_version: Option<u64>,
        rollback: Option<RollbackPlan>,
    ) {
        let Some(mut entry) = active.remove(&id) else {
            return;
        };
        let ended_at = now();
        entry.transition.status = status;
        entry.transition.ended_at = Some(ended_at);

        let t = entry.transition;
        let record = TransitionRecord {
            id,
            transition_type: t.transition_type,
            source: t.source,
            target: t.target,
            status,
            change_count: t.changes.len(),
            base_version,
            committed_version,
            error,
            rollback,
            started_at: t.started_at,
            ended_at,
        };

        let mut history = self.history.lock();
        history.push_back(record);
        while history.len() > self.options.max_history {
            history.pop_front();
        }

        let counter = match status {
            TransitionStatus::Completed => &self.committed,
            TransitionStatus::RolledBack => &self.rolled_back,
            _ => &self.failed,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }
}

impl std::fmt::Debug for TransitionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransitionCoordinator")
            .field("options", &self.options)
            .field("active", &self.active_count())
            .field("history", &self.history.lock().len())
            .finish()
    }
}
