//! The solver's mutable search state: the selection stack and the worklist
//! of packages still awaiting a decision.
//!
//! Backtracking is expressed as truncation: popping a decision restores the
//! depender bookkeeping and the worklist to exactly the state they had
//! before it was pushed, which keeps the stack shape assertable in tests.

use std::collections::{HashMap, VecDeque};

use solvent_core::{Constraint, Dependency, PackageName, Version};

/// A committed `(package, version)` choice.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Atom {
    pub name: PackageName,
    pub version: Version,
}

impl std::fmt::Display for Atom {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}@{}", self.name, self.version)
    }
}

/// One entry in the selection stack: the chosen atom plus the dependencies
/// its manifest imposed at the time of selection.
///
/// Carrying the dependencies here means unselection never refetches a
/// manifest, even if the external source changed mid-solve.
#[derive(Debug, Clone)]
pub struct Decision {
    pub atom: Atom,
    pub dependencies: Vec<Dependency>,
}

/// A dependency together with the decision that imposed it.
#[derive(Debug, Clone)]
pub struct Depender {
    pub atom: Atom,
    pub dep: Dependency,
}

/// Ordered record of the decisions made so far, with per-package depender
/// lists for constraint intersection and conflict attribution.
#[derive(Debug, Default)]
pub struct SelectionStack {
    decisions: Vec<Decision>,
    dependers: HashMap<PackageName, Vec<Depender>>,
}

impl SelectionStack {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn decisions(&self) -> &[Decision] {
        &self.decisions
    }

    pub fn depth(&self) -> usize {
        self.decisions.len()
    }

    /// The atom currently selected for a package, if any.
    pub fn selected(&self, name: &PackageName) -> Option<&Atom> {
        self.decisions
            .iter()
            .find(|d| &d.atom.name == name)
            .map(|d| &d.atom)
    }

    /// The intersection of every active depender's constraint on a package.
    ///
    /// `Any` if nothing currently constrains it.
    pub fn constraint(&self, name: &PackageName) -> Constraint {
        let mut active = Constraint::Any;
        for depender in self.dependers_on(name) {
            active = active.intersect(&depender.dep.constraint);
        }
        active
    }

    /// Every active dependency declared on a package, with its depender.
    pub fn dependers_on(&self, name: &PackageName) -> &[Depender] {
        self.dependers.get(name).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn push_decision(&mut self, decision: Decision) {
        self.decisions.push(decision);
    }

    pub fn pop_decision(&mut self) -> Option<Decision> {
        self.decisions.pop()
    }

    /// Record a dependency imposed by a decision. Returns `true` if this is
    /// the first active dependency on the target package.
    pub fn push_depender(&mut self, depender: Depender) -> bool {
        let list = self.dependers.entry(depender.dep.name.clone()).or_default();
        list.push(depender);
        list.len() == 1
    }

    /// Drop the most recent dependency on a package. Returns the number of
    /// dependers remaining.
    pub fn pop_depender(&mut self, name: &PackageName) -> usize {
        match self.dependers.get_mut(name) {
            Some(list) => {
                list.pop();
                list.len()
            }
            None => 0,
        }
    }
}

/// FIFO worklist of packages awaiting a decision, in order of first
/// appearance. Deterministic by construction; no heuristic reordering.
#[derive(Debug, Default)]
pub struct Unselected {
    names: VecDeque<PackageName>,
}

impl Unselected {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn front(&self) -> Option<&PackageName> {
        self.names.front()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Append a newly required package. No-op if already queued.
    pub fn push_back(&mut self, name: PackageName) {
        if !self.names.contains(&name) {
            self.names.push_back(name);
        }
    }

    /// Requeue an unselected package at the head, restoring its pre-selection
    /// position during backtracking.
    pub fn push_front(&mut self, name: PackageName) {
        if !self.names.contains(&name) {
            self.names.push_front(name);
        }
    }

    pub fn remove(&mut self, name: &PackageName) {
        self.names.retain(|n| n != name);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom(name: &str, version: &str) -> Atom {
        Atom {
            name: PackageName::from(name),
            version: Version::parse(version),
        }
    }

    fn depender(from: &Atom, on: &str, constraint: &str) -> Depender {
        Depender {
            atom: from.clone(),
            dep: Dependency::parse(on, constraint),
        }
    }

    #[test]
    fn constraint_is_intersection_of_dependers() {
        let mut sel = SelectionStack::new();
        let a = atom("a", "1.0.0");
        let b = atom("b", "1.0.0");

        sel.push_depender(depender(&a, "shared", ">=1.0.0"));
        sel.push_depender(depender(&b, "shared", "<2.0.0"));

        let active = sel.constraint(&PackageName::from("shared"));
        assert!(active.matches(&Version::parse("1.5.0")));
        assert!(!active.matches(&Version::parse("2.0.0")));
        assert!(!active.matches(&Version::parse("0.5.0")));
    }

    #[test]
    fn unconstrained_package_gets_any() {
        let sel = SelectionStack::new();
        assert_eq!(sel.constraint(&PackageName::from("ghost")), Constraint::Any);
    }

    #[test]
    fn push_pop_depender_restores_state() {
        let mut sel = SelectionStack::new();
        let a = atom("a", "1.0.0");
        let shared = PackageName::from("shared");

        assert!(sel.push_depender(depender(&a, "shared", ">=1.0.0")));
        assert!(!sel.push_depender(depender(&a, "shared", "<3.0.0")));
        assert_eq!(sel.dependers_on(&shared).len(), 2);

        assert_eq!(sel.pop_depender(&shared), 1);
        assert!(sel.constraint(&shared).matches(&Version::parse("5.0.0")));
        assert_eq!(sel.pop_depender(&shared), 0);
        assert_eq!(sel.constraint(&shared), Constraint::Any);
    }

    #[test]
    fn selected_finds_decision() {
        let mut sel = SelectionStack::new();
        let a = atom("a", "1.0.0");
        sel.push_decision(Decision {
            atom: a.clone(),
            dependencies: vec![],
        });

        assert_eq!(sel.selected(&PackageName::from("a")), Some(&a));
        assert_eq!(sel.selected(&PackageName::from("b")), None);
        assert_eq!(sel.depth(), 1);

        let popped = sel.pop_decision().unwrap();
        assert_eq!(popped.atom, a);
        assert_eq!(sel.depth(), 0);
    }

    #[test]
    fn worklist_is_fifo_with_front_restore() {
        let mut unsel = Unselected::new();
        unsel.push_back(PackageName::from("a"));
        unsel.push_back(PackageName::from("b"));
        unsel.push_back(PackageName::from("a"));
        assert_eq!(unsel.front(), Some(&PackageName::from("a")));

        unsel.remove(&PackageName::from("a"));
        assert_eq!(unsel.front(), Some(&PackageName::from("b")));

        unsel.push_front(PackageName::from("a"));
        assert_eq!(unsel.front(), Some(&PackageName::from("a")));

        unsel.remove(&PackageName::from("a"));
        unsel.remove(&PackageName::from("b"));
        assert!(unsel.is_empty());
    }
}
