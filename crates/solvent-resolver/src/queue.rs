//! Candidate version queues.
//!
//! One queue exists per non-root decision on the stack. A queue remembers
//! its position permanently, so a backjump resumes exactly where the queue
//! left off and no candidate is ever retried. The lock-preferred version, if
//! any, is phase one; the full provider listing (minus the lock version) is
//! loaded lazily only if phase one fails.

use solvent_core::{PackageName, Version};

use crate::cache::MetadataCache;
use crate::failure::{FailedVersion, SolveFailure};
use crate::provider::ProviderError;

/// The ordered candidates for one package, with rejection history.
#[derive(Debug)]
pub struct VersionQueue {
    pub name: PackageName,
    candidates: Vec<Version>,
    idx: usize,
    lock_version: Option<Version>,
    all_loaded: bool,
    /// Set when a later conflict implicates this queue's decision; backtrack
    /// advances failed queues and discards the rest.
    pub failed: bool,
    fails: Vec<FailedVersion>,
}

impl VersionQueue {
    pub fn new(
        name: PackageName,
        lock_version: Option<Version>,
        cache: &mut MetadataCache<'_>,
        newest_first: bool,
    ) -> Result<Self, ProviderError> {
        match lock_version {
            Some(locked) => Ok(Self {
                name,
                candidates: vec![locked.clone()],
                idx: 0,
                lock_version: Some(locked),
                all_loaded: false,
                failed: false,
                fails: Vec::new(),
            }),
            None => {
                let candidates = load_candidates(cache, &name, newest_first, None)?;
                Ok(Self {
                    name,
                    candidates,
                    idx: 0,
                    lock_version: None,
                    all_loaded: true,
                    failed: false,
                    fails: Vec::new(),
                })
            }
        }
    }

    /// The candidate currently under trial.
    pub fn current(&self) -> Option<&Version> {
        self.candidates.get(self.idx)
    }

    /// Record why the current candidate was rejected.
    pub fn record_failure(&mut self, version: Version, failure: SolveFailure) {
        self.fails.push(FailedVersion { version, failure });
    }

    /// Move to the next candidate, loading the full provider listing when
    /// the lock-preference phase runs out.
    pub fn advance(
        &mut self,
        cache: &mut MetadataCache<'_>,
        newest_first: bool,
    ) -> Result<(), ProviderError> {
        self.idx += 1;
        if self.idx >= self.candidates.len() && !self.all_loaded {
            self.candidates = load_candidates(
                cache,
                &self.name,
                newest_first,
                self.lock_version.as_ref(),
            )?;
            self.idx = 0;
            self.all_loaded = true;
        }
        Ok(())
    }

    pub fn is_exhausted(&self) -> bool {
        self.all_loaded && self.idx >= self.candidates.len()
    }

    /// Consume the rejection history for failure reporting.
    pub fn take_fails(&mut self) -> Vec<FailedVersion> {
        std::mem::take(&mut self.fails)
    }
}

/// Provider listing in trial order: semantic versions sorted newest-first
/// (oldest-first in downgrade mode), floating kinds after them in provider
/// order. `skip` drops a version already tried in the lock phase.
fn load_candidates(
    cache: &mut MetadataCache<'_>,
    name: &PackageName,
    newest_first: bool,
    skip: Option<&Version>,
) -> Result<Vec<Version>, ProviderError> {
    let mut versions = cache.list_versions(name)?;
    if let Some(skip) = skip {
        versions.retain(|v| v != skip);
    }
    let (mut semantic, floating): (Vec<Version>, Vec<Version>) = versions
        .into_iter()
        .partition(|v| v.as_semantic().is_some());
    semantic.sort_by(|a, b| a.as_semantic().cmp(&b.as_semantic()));
    if newest_first {
        semantic.reverse();
    }
    semantic.extend(floating);
    Ok(semantic)
}
