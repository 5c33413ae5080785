//! In-memory stand-in for the peak REST API, for local development and tests.

use anyhow::{Context, Result};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::{Arc, Mutex};
use tokio::net::TcpListener;

use crate::peak::{Altitude, BoundingBox, LatLng, PeakId};

type ApiResult<T> = Result<T, (StatusCode, String)>;

#[derive(Clone, Default)]
pub struct MockApiState {
    inner: Arc<Mutex<MockPeaks>>,
}

#[derive(Debug, Default)]
struct MockPeaks {
    last_id: PeakId,
    peaks: BTreeMap<PeakId, StoredPeak>,
}

#[derive(Debug, Clone, Serialize)]
struct StoredPeak {
    id: PeakId,
    name: String,
    altitude: f64,
    lat: f64,
    lon: f64,
}

#[derive(Debug, Deserialize)]
struct BoundsQuery {
    n: Option<f64>,
    s: Option<f64>,
    e: Option<f64>,
    w: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct PeakBody {
    name: String,
    altitude: Altitude,
    lat: f64,
    lon: f64,
}

impl MockApiState {
    fn lock(&self) -> ApiResult<std::sync::MutexGuard<'_, MockPeaks>> {
        self.inner
            .lock()
            .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "state poisoned".to_string()))
    }
}

fn validate(body: PeakBody) -> ApiResult<(String, f64, LatLng)> {
    let name = body.name.trim().to_string();
    if name.is_empty() {
        return Err((StatusCode::BAD_REQUEST, "name must not be empty".to_string()));
    }
    let altitude = body.altitude.meters().ok_or_else(|| {
        (
            StatusCode::BAD_REQUEST,
            format!("altitude {:?} is not a number", body.altitude.as_str()),
        )
    })?;
    Ok((name, altitude, LatLng::new(body.lat, body.lon)))
}

async fn healthz() -> &'static str {
    "ok"
}

async fn list_peaks(
    State(state): State<MockApiState>,
    Query(query): Query<BoundsQuery>,
) -> ApiResult<Json<Vec<StoredPeak>>> {
    let (Some(north), Some(south), Some(east), Some(west)) = (query.n, query.s, query.e, query.w)
    else {
        return Err((
            StatusCode::BAD_REQUEST,
            "n, s, e and w are required".to_string(),
        ));
    };
    let bounds = BoundingBox {
        north,
        south,
        east,
        west,
    };
    let peaks = state.lock()?;
    let found = peaks
        .peaks
        .values()
        .filter(|peak| bounds.contains(LatLng::new(peak.lat, peak.lon)))
        .cloned()
        .collect();
    Ok(Json(found))
}

async fn get_peak(
    State(state): State<MockApiState>,
    Path(id): Path<PeakId>,
) -> ApiResult<Json<StoredPeak>> {
    let peaks = state.lock()?;
    peaks
        .peaks
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or_else(|| not_found(id))
}

async fn create_peak(
    State(state): State<MockApiState>,
    Json(body): Json<PeakBody>,
) -> ApiResult<(StatusCode, Json<StoredPeak>)> {
    let (name, altitude, position) = validate(body)?;
    let mut peaks = state.lock()?;
    peaks.last_id += 1;
    let peak = StoredPeak {
        id: peaks.last_id,
        name,
        altitude,
        lat: position.lat,
        lon: position.lon,
    };
    peaks.peaks.insert(peak.id, peak.clone());
    tracing::debug!(id = peak.id, "mock api created peak");
    Ok((StatusCode::CREATED, Json(peak)))
}

async fn update_peak(
    State(state): State<MockApiState>,
    Path(id): Path<PeakId>,
    Json(body): Json<PeakBody>,
) -> ApiResult<Json<StoredPeak>> {
    let (name, altitude, position) = validate(body)?;
    let mut peaks = state.lock()?;
    let peak = peaks.peaks.get_mut(&id).ok_or_else(|| not_found(id))?;
    peak.name = name;
    peak.altitude = altitude;
    peak.lat = position.lat;
    peak.lon = position.lon;
    Ok(Json(peak.clone()))
}

async fn delete_peak(
    State(state): State<MockApiState>,
    Path(id): Path<PeakId>,
) -> ApiResult<StatusCode> {
    let mut peaks = state.lock()?;
    peaks.peaks.remove(&id).ok_or_else(|| not_found(id))?;
    Ok(StatusCode::NO_CONTENT)
}

fn not_found(id: PeakId) -> (StatusCode, String) {
    (StatusCode::NOT_FOUND, format!("peak {id} not found"))
}

pub fn router(state: MockApiState) -> Router {
    Router::new()
        .route("/healthz", get(healthz))
        .route("/api/peaks", get(list_peaks))
        .route("/api/peaks/", get(list_peaks).post(create_peak))
        .route(
            "/api/peaks/{id}/",
            get(get_peak).put(update_peak).delete(delete_peak),
        )
        .with_state(state)
}

pub async fn bind(addr: &str) -> Result<TcpListener> {
    match TcpListener::bind(addr).await {
        Ok(listener) => Ok(listener),
        Err(err) if err.kind() == std::io::ErrorKind::AddrInUse => {
            anyhow::bail!(
                "Failed to bind mock peak API on {addr}: port already in use. Stop the other service or pass --bind with another address.",
            );
        }
        Err(err) => Err(err).with_context(|| format!("failed to bind mock peak API on {addr}")),
    }
}

pub async fn serve(listener: TcpListener, state: MockApiState) -> Result<()> {
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "mock peak API listening");
    axum::serve(listener, router(state))
        .await
        .context("mock peak API server failed")
}
