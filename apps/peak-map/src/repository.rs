use std::future::Future;

use crate::error::RepositoryError;
use crate::peak::{BoundingBox, Peak, PeakId, PeakInput};

/// Persistence operations for peaks. A failed call is final: nothing retries,
/// and callers only touch the marker store after a call succeeds.
pub trait PeakRepository: Send + Sync + 'static {
    fn list_in_bounds(
        &self,
        bounds: BoundingBox,
    ) -> impl Future<Output = Result<Vec<Peak>, RepositoryError>> + Send;

    fn create(&self, input: PeakInput)
        -> impl Future<Output = Result<Peak, RepositoryError>> + Send;

    /// Replaces every mutable field of `peak.id`; the returned record is authoritative.
    fn update(&self, peak: Peak) -> impl Future<Output = Result<Peak, RepositoryError>> + Send;

    fn delete(&self, id: PeakId) -> impl Future<Output = Result<(), RepositoryError>> + Send;
}
