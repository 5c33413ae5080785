use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::time::Duration;

use crate::map::TileLayer;
use crate::peak::LatLng;

const DEFAULT_API_HOST: &str = "localhost";
const DEFAULT_API_PORT: u16 = 8000;
const DEFAULT_TILE_URL: &str = "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png";
const OSM_ATTRIBUTION: &str =
    "&copy; <a href=\"https://www.openstreetmap.org/copyright\">OpenStreetMap</a> contributors";

#[derive(Debug, Clone)]
pub struct Config {
    pub api_host: String,
    pub api_port: u16,
    pub request_timeout_ms: u64,
    pub map_center_lat: f64,
    pub map_center_lon: f64,
    pub map_zoom: f64,
    pub tile_url: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_host: DEFAULT_API_HOST.to_string(),
            api_port: DEFAULT_API_PORT,
            request_timeout_ms: 10_000,
            map_center_lat: 51.505,
            map_center_lon: -0.09,
            map_zoom: 13.0,
            tile_url: DEFAULT_TILE_URL.to_string(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Builds the config from `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let value = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let defaults = Self::default();

        let api_host = value("PEAK_API_HOST").unwrap_or(defaults.api_host);
        let api_port = parse_or(value("PEAK_API_PORT"), "PEAK_API_PORT", defaults.api_port)?;
        let request_timeout_ms = parse_or(
            value("PEAK_API_TIMEOUT_MS"),
            "PEAK_API_TIMEOUT_MS",
            defaults.request_timeout_ms,
        )?;
        let map_center_lat = parse_or(
            value("PEAK_MAP_CENTER_LAT"),
            "PEAK_MAP_CENTER_LAT",
            defaults.map_center_lat,
        )?;
        let map_center_lon = parse_or(
            value("PEAK_MAP_CENTER_LON"),
            "PEAK_MAP_CENTER_LON",
            defaults.map_center_lon,
        )?;
        let map_zoom = parse_or(value("PEAK_MAP_ZOOM"), "PEAK_MAP_ZOOM", defaults.map_zoom)?;
        let tile_url = value("PEAK_MAP_TILE_URL").unwrap_or(defaults.tile_url);

        Ok(Self {
            api_host,
            api_port,
            request_timeout_ms,
            map_center_lat,
            map_center_lon,
            map_zoom,
            tile_url,
        })
    }

    pub fn api_base_url(&self) -> String {
        format!("http://{}:{}/api", self.api_host, self.api_port)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn map_center(&self) -> LatLng {
        LatLng::new(self.map_center_lat, self.map_center_lon)
    }

    pub fn tile_layer(&self) -> TileLayer {
        TileLayer {
            url_template: self.tile_url.clone(),
            attribution: OSM_ATTRIBUTION.to_string(),
        }
    }
}

fn parse_or<T>(raw: Option<String>, key: &str, default: T) -> Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .parse::<T>()
            .with_context(|| format!("invalid {key}: {raw:?}")),
        None => Ok(default),
    }
}
