//! The taxonomy of unsatisfiability diagnoses.
//!
//! A [`SolveFailure`] is a normal result value, never an infrastructure
//! fault: it means the constraint system itself admits no assignment, and it
//! carries enough attribution that a caller can recover the packages
//! responsible without re-running with tracing enabled.

use std::collections::BTreeSet;
use std::fmt;

use solvent_core::{Constraint, PackageName, Version};

use crate::selection::{Atom, Depender};

/// Why a solve could not produce a complete assignment.
#[derive(Debug, Clone)]
pub enum SolveFailure {
    /// No remaining candidate of a package satisfies the active constraint.
    NoVersion(NoVersionFailure),
    /// Two or more sibling dependers impose constraints with an empty
    /// intersection.
    DisjointConstraint(DisjointConstraintFailure),
    /// A candidate's version is rejected by constraints already in force.
    VersionNotAllowed(VersionNotAllowedFailure),
    /// A newly discovered constraint disallows a version that is already
    /// selected.
    ConstraintNotAllowed(ConstraintNotAllowedFailure),
    /// The caller's cancellation signal tripped before a result was reached.
    Canceled,
}

/// Every candidate of `name` was tried and rejected; `fails` pairs each
/// candidate with the diagnosis that rejected it. Empty when the provider
/// listed no versions at all.
#[derive(Debug, Clone)]
pub struct NoVersionFailure {
    pub name: PackageName,
    pub fails: Vec<FailedVersion>,
}

/// One rejected candidate version and the reason it was rejected.
#[derive(Debug, Clone)]
pub struct FailedVersion {
    pub version: Version,
    pub failure: SolveFailure,
}

/// Introducing `goal` would require versions of `goal.dep.name` that cannot
/// coexist with what the failing siblings require.
#[derive(Debug, Clone)]
pub struct DisjointConstraintFailure {
    pub goal: Depender,
    pub failing: Vec<Depender>,
    pub passing: Vec<Depender>,
    pub constraint: Constraint,
}

/// The candidate `atom` is rejected by the intersected constraint currently
/// active on its package; `failing` lists the dependers whose constraints
/// individually reject it.
#[derive(Debug, Clone)]
pub struct VersionNotAllowedFailure {
    pub atom: Atom,
    pub failing: Vec<Depender>,
    pub constraint: Constraint,
}

/// The dependency in `goal` disallows the version of its target that is
/// already selected. There is no sibling attribution here: nothing records
/// *why* the selected version was chosen.
#[derive(Debug, Clone)]
pub struct ConstraintNotAllowedFailure {
    pub goal: Depender,
    pub selected: Version,
}

impl SolveFailure {
    /// The packages whose constraints are mutually responsible for this
    /// failure.
    pub fn culprits(&self) -> BTreeSet<PackageName> {
        let mut set = BTreeSet::new();
        self.collect_culprits(&mut set);
        set
    }

    fn collect_culprits(&self, set: &mut BTreeSet<PackageName>) {
        match self {
            Self::NoVersion(f) => {
                set.insert(f.name.clone());
                for fail in &f.fails {
                    fail.failure.collect_culprits(set);
                }
            }
            Self::DisjointConstraint(f) => {
                set.extend(f.failing.iter().map(|d| d.atom.name.clone()));
            }
            Self::VersionNotAllowed(f) => {
                set.extend(f.failing.iter().map(|d| d.atom.name.clone()));
            }
            Self::ConstraintNotAllowed(_) | Self::Canceled => {}
        }
    }

    /// The already-made decisions the backjump should unwind to: packages
    /// whose selection (not merely whose constraints) this failure implicates.
    pub(crate) fn contributing_decisions(&self) -> BTreeSet<PackageName> {
        let mut set = BTreeSet::new();
        self.collect_decisions(&mut set);
        set
    }

    fn collect_decisions(&self, set: &mut BTreeSet<PackageName>) {
        match self {
            Self::NoVersion(f) => {
                for fail in &f.fails {
                    fail.failure.collect_decisions(set);
                }
            }
            Self::DisjointConstraint(f) => {
                set.extend(f.failing.iter().map(|d| d.atom.name.clone()));
            }
            Self::VersionNotAllowed(f) => {
                set.extend(f.failing.iter().map(|d| d.atom.name.clone()));
            }
            // The selected target is the decision to revisit; its dependers
            // are not recorded anywhere else.
            Self::ConstraintNotAllowed(f) => {
                set.insert(f.goal.dep.name.clone());
            }
            Self::Canceled => {}
        }
    }
}

impl fmt::Display for SolveFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVersion(fail) => {
                if fail.fails.is_empty() {
                    return write!(f, "no versions of {} exist", fail.name);
                }
                writeln!(f, "no version of {} met constraints:", fail.name)?;
                for fv in &fail.fails {
                    writeln!(f, "\t{}: {}", fv.version, Indented(&fv.failure))?;
                }
                Ok(())
            }
            Self::DisjointConstraint(fail) => {
                writeln!(
                    f,
                    "could not introduce {}, as it depends on {} with {}, which does not overlap with:",
                    fail.goal.atom, fail.goal.dep.name, fail.goal.dep.constraint
                )?;
                for sib in &fail.failing {
                    writeln!(
                        f,
                        "\t{} depends on {} with {}",
                        sib.atom, sib.dep.name, sib.dep.constraint
                    )?;
                }
                Ok(())
            }
            Self::VersionNotAllowed(fail) => {
                writeln!(
                    f,
                    "could not introduce {}, as it is not allowed by:",
                    fail.atom
                )?;
                for dep in &fail.failing {
                    writeln!(
                        f,
                        "\t{} requires {} {}",
                        dep.atom, dep.dep.name, dep.dep.constraint
                    )?;
                }
                Ok(())
            }
            Self::ConstraintNotAllowed(fail) => write!(
                f,
                "could not introduce {}: its constraint {} on {} does not allow the selected version {}",
                fail.goal.atom, fail.goal.dep.constraint, fail.goal.dep.name, fail.selected
            ),
            Self::Canceled => write!(f, "solve canceled before a result was reached"),
        }
    }
}

/// Renders a nested failure on a single line so it can sit after a version
/// in a `NoVersion` listing.
struct Indented<'a>(&'a SolveFailure);

impl fmt::Display for Indented<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let rendered = self.0.to_string();
        let mut first = true;
        for line in rendered.lines() {
            if !first {
                f.write_str(" ")?;
            }
            f.write_str(line.trim())?;
            first = false;
        }
        Ok(())
    }
}
