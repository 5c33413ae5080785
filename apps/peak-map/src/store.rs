use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::Mutex;

use crate::peak::{Peak, PeakId};

/// Store handle shared by the shell, the editors and in-flight viewport loads.
/// Hold the lock only for in-memory mutation, never across a request.
pub type SharedMarkerStore = Arc<Mutex<MarkerStore>>;

/// The peaks currently known to the map, at most one per id.
#[derive(Debug, Clone, Default)]
pub struct MarkerStore {
    peaks: BTreeMap<PeakId, Peak>,
}

impl MarkerStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> SharedMarkerStore {
        Arc::new(Mutex::new(Self::new()))
    }

    /// Adds peaks whose id is not known yet. Known entries win over incoming
    /// ones, so a reload never clobbers a peak that is being edited.
    pub fn merge(&mut self, incoming: impl IntoIterator<Item = Peak>) -> usize {
        let mut added = 0;
        for peak in incoming {
            if let Entry::Vacant(slot) = self.peaks.entry(peak.id) {
                slot.insert(peak);
                added += 1;
            }
        }
        added
    }

    /// Installs the server's record for `peak.id`, dropping any previous one.
    pub fn replace(&mut self, peak: Peak) -> Option<Peak> {
        self.peaks.insert(peak.id, peak)
    }

    pub fn remove(&mut self, id: PeakId) -> Option<Peak> {
        self.peaks.remove(&id)
    }

    pub fn get(&self, id: PeakId) -> Option<&Peak> {
        self.peaks.get(&id)
    }

    pub fn contains(&self, id: PeakId) -> bool {
        self.peaks.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.peaks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.peaks.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Peak> {
        self.peaks.values()
    }

    /// Peaks ordered by id.
    pub fn snapshot(&self) -> Vec<Peak> {
        self.peaks.values().cloned().collect()
    }
}
