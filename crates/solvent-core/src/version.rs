//! Version values of the three kinds the engine understands.
//!
//! Versions are only *partially* comparable: semantic versions order among
//! themselves, but a branch or a raw revision has no meaningful order against
//! anything else. Ordering is a candidate-preference concern only; the solver
//! never relies on it for correctness, so incomparable kinds are fine.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

/// A single version of a package.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Version {
    /// A released, semver-ordered version.
    Semantic(semver::Version),
    /// A floating branch head.
    Branch(String),
    /// An immutable revision identifier (e.g. a commit hash).
    Revision(String),
}

impl Version {
    /// Classify a raw version string.
    ///
    /// Anything that parses as semver is `Semantic`; a 40-char hex string is
    /// taken as a `Revision`; everything else is a `Branch`.
    pub fn parse(s: &str) -> Self {
        if let Ok(v) = semver::Version::parse(s) {
            return Self::Semantic(v);
        }
        if s.len() == 40 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
            return Self::Revision(s.to_string());
        }
        Self::Branch(s.to_string())
    }

    pub fn semantic(v: semver::Version) -> Self {
        Self::Semantic(v)
    }

    pub fn branch(name: impl Into<String>) -> Self {
        Self::Branch(name.into())
    }

    pub fn revision(id: impl Into<String>) -> Self {
        Self::Revision(id.into())
    }

    /// The semver value, if this is a semantic version.
    pub fn as_semantic(&self) -> Option<&semver::Version> {
        match self {
            Self::Semantic(v) => Some(v),
            _ => None,
        }
    }
}

impl PartialOrd for Version {
    /// Ordering exists only within the semantic kind. Branch and revision
    /// versions compare equal to themselves and are otherwise incomparable.
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Self::Semantic(a), Self::Semantic(b)) => Some(a.cmp(b)),
            _ if self == other => Some(Ordering::Equal),
            _ => None,
        }
    }
}

impl fmt::Display for Version {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Semantic(v) => write!(f, "{v}"),
            Self::Branch(name) => f.write_str(name),
            Self::Revision(id) => f.write_str(id),
        }
    }
}
