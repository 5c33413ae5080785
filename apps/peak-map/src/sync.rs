use std::sync::Arc;
use tokio::task::JoinSet;

use crate::error::RepositoryError;
use crate::peak::{BoundingBox, Viewport};
use crate::repository::PeakRepository;
use crate::store::SharedMarkerStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncState {
    Uninitialized,
    Ready,
}

#[derive(Debug)]
pub enum SyncOutcome {
    Merged {
        seq: u64,
        fetched: usize,
        added: usize,
    },
    Failed {
        seq: u64,
        error: RepositoryError,
    },
    /// The load task panicked or was aborted.
    Lost { error: String },
}

impl SyncOutcome {
    pub fn added(&self) -> usize {
        match self {
            SyncOutcome::Merged { added, .. } => *added,
            _ => 0,
        }
    }
}

/// Turns settled viewport changes into bounding-box loads merged into the
/// marker store.
///
/// Every settled event issues its own request; nothing is debounced or
/// cancelled. Loads finish in any order and each one only adds peaks, so a
/// slow response for an old viewport cannot retract what a newer one added.
pub struct ViewportSync<R> {
    state: SyncState,
    repo: Arc<R>,
    store: SharedMarkerStore,
    next_seq: u64,
    in_flight: JoinSet<SyncOutcome>,
}

impl<R: PeakRepository> ViewportSync<R> {
    pub fn new(repo: Arc<R>, store: SharedMarkerStore) -> Self {
        Self {
            state: SyncState::Uninitialized,
            repo,
            store,
            next_seq: 0,
            in_flight: JoinSet::new(),
        }
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn in_flight(&self) -> usize {
        self.in_flight.len()
    }

    /// First map availability: becomes `Ready` and loads the initial viewport.
    /// Returns whether a load was issued.
    pub fn map_ready(&mut self, viewport: &Viewport) -> bool {
        if self.state == SyncState::Ready {
            return false;
        }
        self.state = SyncState::Ready;
        tracing::info!(zoom = viewport.zoom, "map ready; loading initial viewport");
        self.spawn_load(viewport.bounds);
        true
    }

    /// A pan or zoom has settled. Ignored until the map is ready.
    pub fn viewport_settled(&mut self, viewport: &Viewport) -> bool {
        if self.state != SyncState::Ready {
            tracing::debug!("viewport change before map ready; ignored");
            return false;
        }
        self.spawn_load(viewport.bounds);
        true
    }

    fn spawn_load(&mut self, bounds: BoundingBox) {
        self.next_seq += 1;
        let seq = self.next_seq;
        let repo = self.repo.clone();
        let store = self.store.clone();
        tracing::debug!(seq, ?bounds, "loading peaks in viewport");
        self.in_flight.spawn(async move {
            match repo.list_in_bounds(bounds).await {
                Ok(peaks) => {
                    let fetched = peaks.len();
                    let added = store.lock().await.merge(peaks);
                    tracing::debug!(seq, fetched, added, "merged viewport peaks");
                    SyncOutcome::Merged {
                        seq,
                        fetched,
                        added,
                    }
                }
                Err(error) => {
                    tracing::warn!(seq, error = %error, "viewport load failed");
                    SyncOutcome::Failed { seq, error }
                }
            }
        });
    }

    /// Next finished load, or `None` when nothing is in flight.
    pub async fn next_outcome(&mut self) -> Option<SyncOutcome> {
        let joined = self.in_flight.join_next().await?;
        Some(joined.unwrap_or_else(|err| {
            tracing::error!(error = %err, "viewport load task failed");
            SyncOutcome::Lost {
                error: err.to_string(),
            }
        }))
    }

    /// Waits for every in-flight load.
    pub async fn wait_idle(&mut self) -> Vec<SyncOutcome> {
        let mut outcomes = Vec::new();
        while let Some(outcome) = self.next_outcome().await {
            outcomes.push(outcome);
        }
        outcomes
    }
}
