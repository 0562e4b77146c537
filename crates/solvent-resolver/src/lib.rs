//! Version resolution engine: conflict-directed backtracking over package
//! version assignments, lock-biased candidate ordering, and a typed taxonomy
//! of unsatisfiability diagnoses.

pub mod cache;
pub mod failure;
pub mod provider;
pub mod queue;
pub mod selection;
pub mod solver;

pub use failure::SolveFailure;
pub use provider::{MemoryProvider, MetadataProvider, ProviderError};
pub use selection::{Atom, Decision, Depender};
pub use solver::{CancelToken, Resolution, Solver, SolverOptions};
