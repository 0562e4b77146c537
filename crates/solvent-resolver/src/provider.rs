//! The project metadata provider interface consumed by the solver.
//!
//! The provider is the solver's only window onto the outside world: which
//! versions exist for a package, and what a given package version declares.
//! Real providers hit disk or the network; [`MemoryProvider`] is the
//! deterministic in-memory variant used by fixtures and tests.

use miette::Diagnostic;
use std::collections::HashMap;
use thiserror::Error;

use solvent_core::{Manifest, PackageName, Version};

/// Infrastructure fault from a metadata provider.
///
/// These indicate that the inputs were malformed or unavailable, never that
/// no solution exists; they propagate out of a solve untouched, distinct
/// from [`crate::SolveFailure`].
#[derive(Debug, Error, Diagnostic)]
pub enum ProviderError {
    /// The package is not known to the provider at all.
    #[error("unknown package: {name}")]
    #[diagnostic(help("check the package name against the configured sources"))]
    UnknownPackage { name: PackageName },

    /// The package exists but has no manifest at the requested version.
    #[error("no manifest for {name} at {version}")]
    UnknownVersion { name: PackageName, version: Version },

    /// Fetching metadata failed for an infrastructure reason.
    #[error("metadata fetch failed for {name}: {message}")]
    Io { name: PackageName, message: String },
}

/// Source of truth for what versions and manifests exist.
pub trait MetadataProvider {
    /// All known versions of a package, in the provider's preferred order.
    fn list_versions(&self, name: &PackageName) -> Result<Vec<Version>, ProviderError>;

    /// The manifest declared by one `(package, version)` pair.
    fn manifest(&self, name: &PackageName, version: &Version) -> Result<Manifest, ProviderError>;
}

/// Deterministic in-memory provider backed by fixed manifest tables.
#[derive(Debug, Default)]
pub struct MemoryProvider {
    packages: HashMap<PackageName, Vec<Manifest>>,
}

impl MemoryProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a package name with no versions yet.
    pub fn register(&mut self, name: impl Into<PackageName>) {
        self.packages.entry(name.into()).or_default();
    }

    /// Add one version of a package, described by its manifest.
    pub fn add(&mut self, manifest: Manifest) {
        self.packages
            .entry(manifest.name.clone())
            .or_default()
            .push(manifest);
    }
}

impl FromIterator<Manifest> for MemoryProvider {
    fn from_iter<I: IntoIterator<Item = Manifest>>(iter: I) -> Self {
        let mut provider = Self::new();
        for manifest in iter {
            provider.add(manifest);
        }
        provider
    }
}

impl MetadataProvider for MemoryProvider {
    fn list_versions(&self, name: &PackageName) -> Result<Vec<Version>, ProviderError> {
        match self.packages.get(name) {
            Some(manifests) => Ok(manifests.iter().map(|m| m.version.clone()).collect()),
            None => Err(ProviderError::UnknownPackage { name: name.clone() }),
        }
    }

    fn manifest(&self, name: &PackageName, version: &Version) -> Result<Manifest, ProviderError> {
        let manifests = self
            .packages
            .get(name)
            .ok_or_else(|| ProviderError::UnknownPackage { name: name.clone() })?;
        manifests
            .iter()
            .find(|m| &m.version == version)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownVersion {
                name: name.clone(),
                version: version.clone(),
            })
    }
}
