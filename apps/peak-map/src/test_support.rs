use crate::error::RepositoryError;
use crate::mock_api::{self, MockApiState};
use crate::peak::{Altitude, BoundingBox, LatLng, Peak, PeakId, PeakInput, Viewport};
use crate::repository::PeakRepository;
use reqwest::StatusCode;
use std::collections::{BTreeMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;
use tokio::task::JoinHandle;

pub fn peak(id: PeakId, name: &str) -> Peak {
    peak_at(id, name, 51.5, -0.1)
}

pub fn peak_at(id: PeakId, name: &str, lat: f64, lon: f64) -> Peak {
    Peak {
        id,
        name: name.to_string(),
        altitude: Altitude::new("100"),
        lat,
        lon,
    }
}

pub fn viewport(north: f64, south: f64, east: f64, west: f64) -> Viewport {
    Viewport {
        bounds: BoundingBox {
            north,
            south,
            east,
            west,
        },
        zoom: 13.0,
    }
}

/// A viewport around central London, where `peak()` places its peaks.
pub fn london() -> Viewport {
    viewport(51.6, 51.4, 0.1, -0.3)
}

pub fn server_error(method: &'static str, status: StatusCode) -> RepositoryError {
    RepositoryError::Server {
        method,
        url: "fake://peaks".to_string(),
        status,
        body: String::new(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RepoCall {
    List(BoundingBox),
    Create(PeakInput),
    Update(Peak),
    Delete(PeakId),
}

#[derive(Debug)]
struct FakeState {
    peaks: BTreeMap<PeakId, Peak>,
    next_id: PeakId,
    calls: Vec<RepoCall>,
    failures: VecDeque<StatusCode>,
    list_delays: Vec<(BoundingBox, Duration)>,
}

/// In-memory `PeakRepository` that records every call and can be told to
/// fail or stall the next requests.
#[derive(Debug)]
pub struct FakeRepository {
    state: Mutex<FakeState>,
}

impl FakeRepository {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(FakeState {
                peaks: BTreeMap::new(),
                next_id: 1,
                calls: Vec::new(),
                failures: VecDeque::new(),
                list_delays: Vec::new(),
            }),
        }
    }

    pub fn with_peaks(peaks: impl IntoIterator<Item = Peak>) -> Self {
        let repo = Self::new();
        for peak in peaks {
            repo.seed(peak);
        }
        repo
    }

    pub fn seed(&self, peak: Peak) {
        let mut state = self.state.lock().unwrap();
        state.next_id = state.next_id.max(peak.id + 1);
        state.peaks.insert(peak.id, peak);
    }

    pub fn set_next_id(&self, id: PeakId) {
        self.state.lock().unwrap().next_id = id;
    }

    /// The next call, whatever it is, answers with `status`.
    pub fn fail_next(&self, status: StatusCode) {
        self.state.lock().unwrap().failures.push_back(status);
    }

    /// Stalls every list call for exactly `bounds` by `delay`.
    pub fn delay_list(&self, bounds: BoundingBox, delay: Duration) {
        self.state.lock().unwrap().list_delays.push((bounds, delay));
    }

    pub fn calls(&self) -> Vec<RepoCall> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn stored(&self) -> Vec<Peak> {
        self.state.lock().unwrap().peaks.values().cloned().collect()
    }

    fn record(&self, call: RepoCall) -> Option<StatusCode> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        state.failures.pop_front()
    }
}

impl Default for FakeRepository {
    fn default() -> Self {
        Self::new()
    }
}

impl PeakRepository for FakeRepository {
    async fn list_in_bounds(&self, bounds: BoundingBox) -> Result<Vec<Peak>, RepositoryError> {
        let (found, delay) = {
            if let Some(status) = self.record(RepoCall::List(bounds)) {
                return Err(server_error("GET", status));
            }
            let state = self.state.lock().unwrap();
            let found: Vec<Peak> = state
                .peaks
                .values()
                .filter(|peak| bounds.contains(LatLng::new(peak.lat, peak.lon)))
                .cloned()
                .collect();
            let delay = state
                .list_delays
                .iter()
                .find(|(delayed, _)| *delayed == bounds)
                .map(|(_, delay)| *delay);
            (found, delay)
        };
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(found)
    }

    async fn create(&self, input: PeakInput) -> Result<Peak, RepositoryError> {
        if let Some(status) = self.record(RepoCall::Create(input.clone())) {
            return Err(server_error("POST", status));
        }
        let mut state = self.state.lock().unwrap();
        let peak = Peak {
            id: state.next_id,
            name: input.name,
            altitude: input.altitude,
            lat: input.lat,
            lon: input.lon,
        };
        state.next_id += 1;
        state.peaks.insert(peak.id, peak.clone());
        Ok(peak)
    }

    async fn update(&self, peak: Peak) -> Result<Peak, RepositoryError> {
        if let Some(status) = self.record(RepoCall::Update(peak.clone())) {
            return Err(server_error("PUT", status));
        }
        let mut state = self.state.lock().unwrap();
        match state.peaks.get_mut(&peak.id) {
            Some(stored) => {
                *stored = peak.clone();
                Ok(peak)
            }
            None => Err(server_error("PUT", StatusCode::NOT_FOUND)),
        }
    }

    async fn delete(&self, id: PeakId) -> Result<(), RepositoryError> {
        if let Some(status) = self.record(RepoCall::Delete(id)) {
            return Err(server_error("DELETE", status));
        }
        let mut state = self.state.lock().unwrap();
        match state.peaks.remove(&id) {
            Some(_) => Ok(()),
            None => Err(server_error("DELETE", StatusCode::NOT_FOUND)),
        }
    }
}

/// Mock peak API served on an ephemeral local port; stops when dropped.
pub struct MockApi {
    pub base_url: String,
    handle: JoinHandle<()>,
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

pub async fn spawn_mock_api() -> MockApi {
    let listener = mock_api::bind("127.0.0.1:0").await.expect("bind mock api");
    let addr = listener.local_addr().expect("mock api addr");
    let handle = tokio::spawn(async move {
        if let Err(err) = mock_api::serve(listener, MockApiState::default()).await {
            tracing::warn!(error = %err, "mock api stopped");
        }
    });
    MockApi {
        base_url: format!("http://{addr}/api"),
        handle,
    }
}
