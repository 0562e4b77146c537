use serde::{Deserialize, Serialize};
use std::fmt;

use crate::constraint::Constraint;
use crate::package::PackageName;

/// A dependency declared by a manifest: a target package and the constraint
/// the depender imposes on it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Dependency {
    pub name: PackageName,
    pub constraint: Constraint,
}

impl Dependency {
    pub fn new(name: impl Into<PackageName>, constraint: Constraint) -> Self {
        Self {
            name: name.into(),
            constraint,
        }
    }

    /// Shorthand used heavily in tests: `Dependency::parse("foo", ">=1.0.0")`.
    pub fn parse(name: &str, constraint: &str) -> Self {
        Self {
            name: PackageName::from(name),
            constraint: Constraint::parse(constraint),
        }
    }
}

impl fmt::Display for Dependency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.constraint)
    }
}
