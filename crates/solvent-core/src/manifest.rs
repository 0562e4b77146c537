use serde::{Deserialize, Serialize};

use crate::dependency::Dependency;
use crate::package::PackageName;
use crate::version::Version;

/// The dependency declarations of one `(package, version)` pair.
///
/// Declaration order is preserved; the solver visits requirements in the
/// order they first appear.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    pub name: PackageName,
    pub version: Version,
    #[serde(default)]
    pub dependencies: Vec<Dependency>,
}

impl Manifest {
    pub fn new(
        name: impl Into<PackageName>,
        version: Version,
        dependencies: Vec<Dependency>,
    ) -> Self {
        Self {
            name: name.into(),
            version,
            dependencies,
        }
    }
}
