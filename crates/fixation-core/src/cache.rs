//! Caller-owned memoization of detection results.

use std::collections::HashMap;
use std::sync::Arc;

use gazelens_gaze_model::fixation::Fixation;
use gazelens_gaze_model::settings::EyeSelection;

/// Identifies one detection run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DetectionKey {
    pub result_id: u64,
    pub stimulus_id: u64,
    pub eye: EyeSelection,
    /// See [`DetectionSettings::fingerprint`](gazelens_gaze_model::DetectionSettings::fingerprint).
    pub settings_fingerprint: u64,
}

/// Fixation lists keyed by [`DetectionKey`].
///
/// Entries are shared as `Arc<[Fixation]>` so readers never copy. Bumping the
/// settings version through [`FixationCache::invalidate`] drops everything.
#[derive(Debug, Default)]
pub struct FixationCache {
    entries: HashMap<DetectionKey, Arc<[Fixation]>>,
    settings_version: u64,
}

impl FixationCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &DetectionKey) -> Option<Arc<[Fixation]>> {
        self.entries.get(key).cloned()
    }

    pub fn insert(&mut self, key: DetectionKey, fixations: Vec<Fixation>) -> Arc<[Fixation]> {
        let shared: Arc<[Fixation]> = fixations.into();
        self.entries.insert(key, Arc::clone(&shared));
        shared
    }

    pub fn get_or_compute<F>(&mut self, key: DetectionKey, compute: F) -> Arc<[Fixation]>
    where
        F: FnOnce() -> Vec<Fixation>,
    {
        if let Some(hit) = self.entries.get(&key) {
            return Arc::clone(hit);
        }
        self.insert(key, compute())
    }

    /// Drop all entries if `settings_version` differs from the last one seen.
    pub fn invalidate(&mut self, settings_version: u64) {
        if settings_version != self.settings_version {
            tracing::debug!(
                from = self.settings_version,
                to = settings_version,
                dropped = self.entries.len(),
                "Invalidating fixation cache"
            );
            self.entries.clear();
            self.settings_version = settings_version;
        }
    }

    pub fn settings_version(&self) -> u64 {
        self.settings_version
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
