//! The backtracking search: candidate selection, conflict detection, and
//! conflict-directed backjumping.
//!
//! The search is single-threaded and depth-first. All mutable state lives in
//! one `Solver` value; backtracking truncates the selection stack to a
//! checkpoint rather than mutating fields ad hoc, and every candidate trial
//! is counted so callers can bound and diagnose search blowup.

use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use solvent_core::{Dependency, Lock, Manifest, PackageName, Version};

use crate::cache::MetadataCache;
use crate::failure::{
    ConstraintNotAllowedFailure, DisjointConstraintFailure, NoVersionFailure, SolveFailure,
    VersionNotAllowedFailure,
};
use crate::provider::{MetadataProvider, ProviderError};
use crate::queue::VersionQueue;
use crate::selection::{Atom, Decision, Depender, SelectionStack, Unselected};

/// Caller-tunable knobs for one solve.
#[derive(Debug, Clone, Default)]
pub struct SolverOptions {
    /// Try oldest versions first (conservative resolution) instead of the
    /// default newest-first order.
    pub downgrade: bool,
    /// Externally supplied cancellation signal, checked at every trial.
    pub cancel: CancelToken,
}

/// Shared flag a caller can trip to bound a long-running solve.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn is_canceled(&self) -> bool {
        self.flag.load(Ordering::Relaxed)
    }
}

/// Terminal output of a solve.
///
/// Either `projects` covers the root's whole transitive closure (one entry
/// per package, root excluded) and `failure` is `None`, or `projects` is
/// empty and `failure` explains why no assignment exists. `attempts` counts
/// every decision pushed, surviving or not.
#[derive(Debug)]
pub struct Resolution {
    pub projects: BTreeMap<PackageName, Version>,
    pub attempts: usize,
    pub failure: Option<SolveFailure>,
}

impl Resolution {
    pub fn is_success(&self) -> bool {
        self.failure.is_none()
    }
}

/// One resolution engine instance.
///
/// Owns the search state for one `solve` call at a time; not for concurrent
/// use. Provider responses are memoized per solve.
pub struct Solver<'a> {
    provider: &'a dyn MetadataProvider,
    cache: MetadataCache<'a>,
    lock: &'a dyn Lock,
    options: SolverOptions,
    sel: SelectionStack,
    unselected: Unselected,
    queues: Vec<VersionQueue>,
    attempts: usize,
}

impl<'a> Solver<'a> {
    pub fn new(provider: &'a dyn MetadataProvider, lock: &'a dyn Lock) -> Self {
        Self::with_options(provider, lock, SolverOptions::default())
    }

    pub fn with_options(
        provider: &'a dyn MetadataProvider,
        lock: &'a dyn Lock,
        options: SolverOptions,
    ) -> Self {
        Self {
            provider,
            cache: MetadataCache::new(provider),
            lock,
            options,
            sel: SelectionStack::new(),
            unselected: Unselected::new(),
            queues: Vec::new(),
            attempts: 0,
        }
    }

    /// Resolve the root manifest's transitive closure.
    ///
    /// Packages named in `force_latest` ignore their lock entry and are
    /// freely re-resolved; everyone else tries the locked version first.
    /// Unsatisfiability comes back as `Resolution::failure`; provider faults
    /// come back as `Err` and mean the inputs were broken, not that no
    /// solution exists.
    pub fn solve(
        &mut self,
        root: &Manifest,
        force_latest: &HashSet<PackageName>,
    ) -> Result<Resolution, ProviderError> {
        self.reset();
        self.select_root(root);

        loop {
            if self.options.cancel.is_canceled() {
                tracing::debug!(attempts = self.attempts, "solve canceled");
                return Ok(Resolution {
                    projects: BTreeMap::new(),
                    attempts: self.attempts,
                    failure: Some(SolveFailure::Canceled),
                });
            }

            let Some(name) = self.unselected.front().cloned() else {
                break;
            };

            let lock_version = if force_latest.contains(&name) {
                None
            } else {
                self.lock.locked_version(&name)
            };
            let newest_first = !self.options.downgrade;
            let mut queue =
                VersionQueue::new(name.clone(), lock_version, &mut self.cache, newest_first)?;

            match self.find_valid(&mut queue)? {
                Ok(version) => {
                    let manifest = self.cache.manifest(&name, &version)?;
                    self.select(Atom { name, version }, manifest.dependencies);
                    self.queues.push(queue);
                }
                Err(failure) => {
                    tracing::debug!(package = %name, "conflict: {failure}");
                    self.mark_contributors_failed(&name, &failure);
                    if !self.backtrack()? {
                        return Ok(Resolution {
                            projects: BTreeMap::new(),
                            attempts: self.attempts,
                            failure: Some(failure),
                        });
                    }
                }
            }
        }

        Ok(Resolution {
            projects: self.assemble(),
            attempts: self.attempts,
            failure: None,
        })
    }

    /// Advance `queue` to its first candidate the current selection admits.
    ///
    /// Exhaustion yields a `NoVersion` failure aggregating every rejection
    /// this queue has seen.
    fn find_valid(
        &mut self,
        queue: &mut VersionQueue,
    ) -> Result<Result<Version, SolveFailure>, ProviderError> {
        let newest_first = !self.options.downgrade;
        loop {
            let Some(version) = queue.current().cloned() else {
                return Ok(Err(SolveFailure::NoVersion(NoVersionFailure {
                    name: queue.name.clone(),
                    fails: queue.take_fails(),
                })));
            };
            let atom = Atom {
                name: queue.name.clone(),
                version: version.clone(),
            };
            match self.satisfiable(&atom)? {
                Ok(()) => return Ok(Ok(version)),
                Err(failure) => {
                    tracing::trace!(candidate = %atom, "rejected: {failure}");
                    queue.record_failure(version, failure);
                    queue.advance(&mut self.cache, newest_first)?;
                }
            }
        }
    }

    /// Would committing to `atom` leave the selection consistent?
    fn satisfiable(&mut self, atom: &Atom) -> Result<Result<(), SolveFailure>, ProviderError> {
        let active = self.sel.constraint(&atom.name);
        if !active.matches(&atom.version) {
            let failing = self
                .sel
                .dependers_on(&atom.name)
                .iter()
                .filter(|d| !d.dep.constraint.matches(&atom.version))
                .cloned()
                .collect();
            return Ok(Err(SolveFailure::VersionNotAllowed(
                VersionNotAllowedFailure {
                    atom: atom.clone(),
                    failing,
                    constraint: active,
                },
            )));
        }

        let manifest = self.cache.manifest(&atom.name, &atom.version)?;
        for dep in &manifest.dependencies {
            let active = self.sel.constraint(&dep.name);
            if !active.matches_any(&dep.constraint) {
                let (failing, passing): (Vec<Depender>, Vec<Depender>) = self
                    .sel
                    .dependers_on(&dep.name)
                    .iter()
                    .cloned()
                    .partition(|d| !d.dep.constraint.matches_any(&dep.constraint));
                return Ok(Err(SolveFailure::DisjointConstraint(
                    DisjointConstraintFailure {
                        goal: Depender {
                            atom: atom.clone(),
                            dep: dep.clone(),
                        },
                        failing,
                        passing,
                        constraint: active,
                    },
                )));
            }

            if let Some(selected) = self.sel.selected(&dep.name) {
                if !dep.constraint.matches(&selected.version) {
                    let selected = selected.version.clone();
                    return Ok(Err(SolveFailure::ConstraintNotAllowed(
                        ConstraintNotAllowedFailure {
                            goal: Depender {
                                atom: atom.clone(),
                                dep: dep.clone(),
                            },
                            selected,
                        },
                    )));
                }
            }
        }

        Ok(Ok(()))
    }

    fn select_root(&mut self, root: &Manifest) {
        let atom = Atom {
            name: root.name.clone(),
            version: root.version.clone(),
        };
        tracing::debug!(package = %atom.name, "selecting root");
        self.apply(atom, root.dependencies.clone());
    }

    fn select(&mut self, atom: Atom, dependencies: Vec<Dependency>) {
        self.attempts += 1;
        tracing::debug!(
            package = %atom.name,
            version = %atom.version,
            attempt = self.attempts,
            "selecting"
        );
        self.unselected.remove(&atom.name);
        self.apply(atom, dependencies);
    }

    fn apply(&mut self, atom: Atom, dependencies: Vec<Dependency>) {
        for dep in &dependencies {
            let first = self.sel.push_depender(Depender {
                atom: atom.clone(),
                dep: dep.clone(),
            });
            if first && self.sel.selected(&dep.name).is_none() {
                self.unselected.push_back(dep.name.clone());
            }
        }
        self.sel.push_decision(Decision { atom, dependencies });
    }

    /// Undo the most recent decision, restoring the worklist and depender
    /// bookkeeping to their pre-selection state.
    fn unselect_last(&mut self) {
        let Some(decision) = self.sel.pop_decision() else {
            return;
        };
        tracing::trace!(package = %decision.atom.name, "unselecting");
        for dep in decision.dependencies.iter().rev() {
            if self.sel.pop_depender(&dep.name) == 0 {
                self.unselected.remove(&dep.name);
            }
        }
        self.unselected.push_front(decision.atom.name);
    }

    /// Flag every queue whose decision contributed to the conflict on
    /// `name`: its active dependers, plus the decisions the failure itself
    /// implicates. Backtracking advances flagged queues and discards the
    /// rest.
    fn mark_contributors_failed(&mut self, name: &PackageName, failure: &SolveFailure) {
        let mut contributors = failure.contributing_decisions();
        contributors.extend(
            self.sel
                .dependers_on(name)
                .iter()
                .map(|d| d.atom.name.clone()),
        );
        for queue in &mut self.queues {
            if contributors.contains(&queue.name) {
                queue.failed = true;
            }
        }
    }

    /// Unwind to the deepest decision that contributed to the conflict and
    /// retry it with its next candidate. Intervening unrelated decisions are
    /// discarded; their requirements re-enter the worklist. Returns `false`
    /// when unwinding exhausts the root's alternatives.
    fn backtrack(&mut self) -> Result<bool, ProviderError> {
        let newest_first = !self.options.downgrade;
        loop {
            while matches!(self.queues.last(), Some(q) if !q.failed) {
                self.queues.pop();
                self.unselect_last();
            }
            let Some(mut queue) = self.queues.pop() else {
                return Ok(false);
            };
            self.unselect_last();
            tracing::debug!(package = %queue.name, "backjumping");
            queue.advance(&mut self.cache, newest_first)?;
            if !queue.is_exhausted() {
                if let Ok(version) = self.find_valid(&mut queue)? {
                    let manifest = self.cache.manifest(&queue.name, &version)?;
                    queue.failed = false;
                    self.select(
                        Atom {
                            name: queue.name.clone(),
                            version,
                        },
                        manifest.dependencies,
                    );
                    self.queues.push(queue);
                    return Ok(true);
                }
            }
            // This contributor has no candidates left either; keep unwinding.
        }
    }

    /// Flatten the selection stack into the final assignment, skipping the
    /// root decision.
    fn assemble(&self) -> BTreeMap<PackageName, Version> {
        self.sel
            .decisions()
            .iter()
            .skip(1)
            .map(|d| (d.atom.name.clone(), d.atom.version.clone()))
            .collect()
    }

    fn reset(&mut self) {
        self.cache = MetadataCache::new(self.provider);
        self.sel = SelectionStack::new();
        self.unselected = Unselected::new();
        self.queues.clear();
        self.attempts = 0;
    }
}
