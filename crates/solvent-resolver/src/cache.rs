//! Per-solve memoization of provider responses.
//!
//! The backtracking search revisits the same `(package, version)` pairs many
//! times; memoizing for the lifetime of one solve avoids redundant fetches
//! and guarantees the search replays deterministically even if the external
//! source mutates mid-solve. Faults are not memoized; they propagate
//! immediately.

use std::collections::HashMap;

use solvent_core::{Manifest, PackageName, Version};

use crate::provider::{MetadataProvider, ProviderError};

/// Memoizing wrapper around a [`MetadataProvider`], scoped to one solve.
pub struct MetadataCache<'p> {
    provider: &'p dyn MetadataProvider,
    versions: HashMap<PackageName, Vec<Version>>,
    manifests: HashMap<(PackageName, Version), Manifest>,
}

impl<'p> MetadataCache<'p> {
    pub fn new(provider: &'p dyn MetadataProvider) -> Self {
        Self {
            provider,
            versions: HashMap::new(),
            manifests: HashMap::new(),
        }
    }

    pub fn list_versions(&mut self, name: &PackageName) -> Result<Vec<Version>, ProviderError> {
        if let Some(versions) = self.versions.get(name) {
            return Ok(versions.clone());
        }
        let versions = self.provider.list_versions(name)?;
        self.versions.insert(name.clone(), versions.clone());
        Ok(versions)
    }

    pub fn manifest(
        &mut self,
        name: &PackageName,
        version: &Version,
    ) -> Result<Manifest, ProviderError> {
        let key = (name.clone(), version.clone());
        if let Some(manifest) = self.manifests.get(&key) {
            return Ok(manifest.clone());
        }
        let manifest = self.provider.manifest(name, version)?;
        self.manifests.insert(key, manifest.clone());
        Ok(manifest)
    }
}
