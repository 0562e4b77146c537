//! Version constraints and their intersection algebra.
//!
//! Constraints from multiple dependers on the same package combine by
//! intersection; an empty intersection is a conflict. The algebra is closed:
//! intersecting any two constraints yields another constraint, with
//! [`Constraint::None`] as the absorbing "nothing satisfies this" element.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;

use crate::version::Version;

/// A predicate over [`Version`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Constraint {
    /// Satisfied by every version.
    Any,
    /// Satisfied by no version.
    None,
    /// Satisfied by exactly one version (of any kind).
    Exact(Version),
    /// Satisfied by semantic versions inside a bounded interval.
    Range(Range),
}

/// A half-open-or-closed interval over semantic versions.
///
/// A missing bound is unbounded on that side.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Range {
    pub lower: Option<Bound>,
    pub upper: Option<Bound>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bound {
    pub version: semver::Version,
    pub inclusive: bool,
}

impl Constraint {
    /// Parse a constraint expression.
    ///
    /// Grammar: `any`/`*`, `none`, a bare version or branch/revision name
    /// (exact), `^1.2.3` (same-major range), and comma-separated comparator
    /// lists built from `>=`, `>`, `<=`, `<`.
    pub fn parse(spec: &str) -> Self {
        let s = spec.trim();
        match s {
            "any" | "*" => return Self::Any,
            "none" => return Self::None,
            _ => {}
        }

        if let Some(rest) = s.strip_prefix('=') {
            return Self::Exact(Version::parse(rest.trim()));
        }

        if let Some(rest) = s.strip_prefix('^') {
            if let Ok(v) = semver::Version::parse(rest.trim()) {
                let next_major = semver::Version::new(v.major + 1, 0, 0);
                return Self::Range(Range {
                    lower: Some(Bound {
                        version: v,
                        inclusive: true,
                    }),
                    upper: Some(Bound {
                        version: next_major,
                        inclusive: false,
                    }),
                });
            }
        }

        if s.starts_with('>') || s.starts_with('<') {
            let mut range = Range {
                lower: None,
                upper: None,
            };
            for part in s.split(',') {
                let part = part.trim();
                let (version, lower, inclusive) = if let Some(r) = part.strip_prefix(">=") {
                    (r, true, true)
                } else if let Some(r) = part.strip_prefix("<=") {
                    (r, false, true)
                } else if let Some(r) = part.strip_prefix('>') {
                    (r, true, false)
                } else if let Some(r) = part.strip_prefix('<') {
                    (r, false, false)
                } else {
                    return Self::Exact(Version::parse(part));
                };
                let Ok(v) = semver::Version::parse(version.trim()) else {
                    return Self::None;
                };
                let bound = Bound {
                    version: v,
                    inclusive,
                };
                if lower {
                    range.lower = Some(bound);
                } else {
                    range.upper = Some(bound);
                }
            }
            return Self::Range(range);
        }

        Self::Exact(Version::parse(s))
    }

    /// Does `version` satisfy this constraint?
    pub fn matches(&self, version: &Version) -> bool {
        match self {
            Self::Any => true,
            Self::None => false,
            Self::Exact(want) => want == version,
            Self::Range(range) => match version.as_semantic() {
                Some(v) => range.contains(v),
                None => false,
            },
        }
    }

    /// The constraint satisfied by exactly the versions satisfying both
    /// `self` and `other`.
    pub fn intersect(&self, other: &Constraint) -> Constraint {
        match (self, other) {
            (Self::Any, c) | (c, Self::Any) => c.clone(),
            (Self::None, _) | (_, Self::None) => Self::None,
            (Self::Exact(a), Self::Exact(b)) => {
                if a == b {
                    Self::Exact(a.clone())
                } else {
                    Self::None
                }
            }
            (Self::Exact(v), c @ Self::Range(_)) | (c @ Self::Range(_), Self::Exact(v)) => {
                if c.matches(v) {
                    Self::Exact(v.clone())
                } else {
                    Self::None
                }
            }
            (Self::Range(a), Self::Range(b)) => {
                let range = a.intersect(b);
                if range.is_empty() {
                    Self::None
                } else {
                    Self::Range(range)
                }
            }
        }
    }

    /// Can any version satisfy both `self` and `other`?
    pub fn matches_any(&self, other: &Constraint) -> bool {
        self.intersect(other) != Self::None
    }
}

impl Range {
    pub fn contains(&self, version: &semver::Version) -> bool {
        if let Some(ref lower) = self.lower {
            let cmp = version.cmp(&lower.version);
            if lower.inclusive {
                if cmp == Ordering::Less {
                    return false;
                }
            } else if cmp != Ordering::Greater {
                return false;
            }
        }
        if let Some(ref upper) = self.upper {
            let cmp = version.cmp(&upper.version);
            if upper.inclusive {
                if cmp == Ordering::Greater {
                    return false;
                }
            } else if cmp != Ordering::Less {
                return false;
            }
        }
        true
    }

    /// Tighter of each pair of bounds.
    fn intersect(&self, other: &Range) -> Range {
        Range {
            lower: tighter(self.lower.as_ref(), other.lower.as_ref(), true),
            upper: tighter(self.upper.as_ref(), other.upper.as_ref(), false),
        }
    }

    /// An interval no version can fall inside.
    fn is_empty(&self) -> bool {
        let (Some(lower), Some(upper)) = (self.lower.as_ref(), self.upper.as_ref()) else {
            return false;
        };
        match lower.version.cmp(&upper.version) {
            Ordering::Greater => true,
            Ordering::Equal => !(lower.inclusive && upper.inclusive),
            Ordering::Less => false,
        }
    }
}

fn tighter(a: Option<&Bound>, b: Option<&Bound>, lower: bool) -> Option<Bound> {
    match (a, b) {
        (None, None) => None,
        (Some(b), None) | (None, Some(b)) => Some(b.clone()),
        (Some(a), Some(b)) => {
            let pick_a = match a.version.cmp(&b.version) {
                Ordering::Equal => !a.inclusive || b.inclusive,
                ord => (ord == Ordering::Greater) == lower,
            };
            Some(if pick_a { a.clone() } else { b.clone() })
        }
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Any => f.write_str("*"),
            Self::None => f.write_str("none"),
            Self::Exact(v) => write!(f, "={v}"),
            Self::Range(range) => {
                let mut first = true;
                if let Some(ref lower) = range.lower {
                    write!(
                        f,
                        "{}{}",
                        if lower.inclusive { ">=" } else { ">" },
                        lower.version
                    )?;
                    first = false;
                }
                if let Some(ref upper) = range.upper {
                    if !first {
                        f.write_str(", ")?;
                    }
                    write!(
                        f,
                        "{}{}",
                        if upper.inclusive { "<=" } else { "<" },
                        upper.version
                    )?;
                    first = false;
                }
                if first {
                    f.write_str("*")?;
                }
                Ok(())
            }
        }
    }
}
