use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

use crate::package::PackageName;
use crate::version::Version;

/// A prior version assignment consulted for stability preference.
///
/// The lock biases candidate ordering only; it never overrides constraints.
pub trait Lock {
    /// The previously pinned version for a package, if one exists.
    fn locked_version(&self, name: &PackageName) -> Option<Version>;
}

/// A lock with no entries, for resolving from scratch.
#[derive(Debug, Clone, Copy, Default)]
pub struct EmptyLock;

impl Lock for EmptyLock {
    fn locked_version(&self, _name: &PackageName) -> Option<Version> {
        None
    }
}

impl Lock for HashMap<PackageName, Version> {
    fn locked_version(&self, name: &PackageName) -> Option<Version> {
        self.get(name).cloned()
    }
}

/// Error loading a lockfile from disk.
#[derive(Debug, Error, Diagnostic)]
pub enum LockfileError {
    #[error("failed to read lockfile: {0}")]
    Read(#[from] std::io::Error),

    #[error("failed to parse lockfile: {0}")]
    #[diagnostic(help("the lockfile may be hand-edited or truncated; delete it to regenerate"))]
    Parse(#[from] toml::de::Error),
}

/// Deterministic lockfile recording exact resolved package versions.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Lockfile {
    #[serde(default)]
    pub package: Vec<LockedPackage>,
}

/// A single locked package with its pinned version.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LockedPackage {
    pub name: PackageName,
    pub version: Version,
}

impl Lockfile {
    /// Load and parse a lockfile from the given path.
    pub fn from_path(path: &Path) -> Result<Self, LockfileError> {
        let content = std::fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Serialize the lockfile to a pretty-printed TOML string.
    pub fn to_string_pretty(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }
}

impl Lock for Lockfile {
    fn locked_version(&self, name: &PackageName) -> Option<Version> {
        self.package
            .iter()
            .find(|p| &p.name == name)
            .map(|p| p.version.clone())
    }
}

impl FromIterator<(PackageName, Version)> for Lockfile {
    fn from_iter<I: IntoIterator<Item = (PackageName, Version)>>(iter: I) -> Self {
        Self {
            package: iter
                .into_iter()
                .map(|(name, version)| LockedPackage { name, version })
                .collect(),
        }
    }
}
