//! Core data types for the Solvent resolution engine.
//!
//! This crate defines the fundamental types the solver operates on: package
//! names, versions of the three kinds the engine understands (semantic,
//! branch, revision), constraints with an intersection algebra, dependencies,
//! per-version manifests, and the lock abstraction consulted for version
//! stability.
//!
//! This crate is intentionally free of network I/O; the only filesystem code
//! is the lockfile load/save helpers.

pub mod constraint;
pub mod dependency;
pub mod lock;
pub mod manifest;
pub mod package;
pub mod version;

pub use constraint::Constraint;
pub use dependency::Dependency;
pub use lock::{EmptyLock, Lock, LockedPackage, Lockfile};
pub use manifest::Manifest;
pub use package::PackageName;
pub use version::Version;
