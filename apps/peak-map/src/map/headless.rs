use super::{MapWidget, Marker, TileLayer};
use crate::peak::{BoundingBox, LatLng, Viewport};

const TILE_SIZE_PX: f64 = 256.0;
const VIEW_WIDTH_PX: f64 = 1024.0;
const VIEW_HEIGHT_PX: f64 = 768.0;

/// Viewport of a nominal 1024x768 map centred on `center`.
///
/// Longitude span follows the web-mercator tile pyramid; latitude span is
/// the same pixel extent shrunk by `cos(lat)`, which is close enough at
/// city zoom levels.
pub fn viewport_around(center: LatLng, zoom: f64) -> Viewport {
    let degrees_per_px = 360.0 / (TILE_SIZE_PX * 2f64.powf(zoom));
    let half_lon = VIEW_WIDTH_PX * degrees_per_px / 2.0;
    let half_lat = VIEW_HEIGHT_PX * degrees_per_px * center.lat.to_radians().cos() / 2.0;
    Viewport {
        bounds: BoundingBox {
            north: center.lat + half_lat,
            south: center.lat - half_lat,
            east: center.lon + half_lon,
            west: center.lon - half_lon,
        },
        zoom,
    }
}

/// A map with no screen. Records what it was asked to draw.
#[derive(Debug, Clone)]
pub struct HeadlessMap {
    viewport: Viewport,
    tiles: Option<TileLayer>,
    markers: Vec<Marker>,
    errors: Vec<String>,
    renders: usize,
    flights: Vec<(LatLng, f64)>,
}

impl HeadlessMap {
    pub fn new(center: LatLng, zoom: f64) -> Self {
        Self {
            viewport: viewport_around(center, zoom),
            tiles: None,
            markers: Vec::new(),
            errors: Vec::new(),
            renders: 0,
            flights: Vec::new(),
        }
    }

    pub fn tiles(&self) -> Option<&TileLayer> {
        self.tiles.as_ref()
    }

    pub fn markers(&self) -> &[Marker] {
        &self.markers
    }

    pub fn errors(&self) -> &[String] {
        &self.errors
    }

    pub fn renders(&self) -> usize {
        self.renders
    }

    pub fn flights(&self) -> &[(LatLng, f64)] {
        &self.flights
    }
}

impl MapWidget for HeadlessMap {
    fn viewport(&self) -> Viewport {
        self.viewport
    }

    fn set_tile_layer(&mut self, layer: &TileLayer) {
        tracing::debug!(url = %layer.url_template, "tile layer set");
        self.tiles = Some(layer.clone());
    }

    fn fly_to(&mut self, position: LatLng, zoom: f64) {
        tracing::debug!(lat = position.lat, lon = position.lon, zoom, "fly to");
        self.viewport = viewport_around(position, zoom);
        self.flights.push((position, zoom));
    }

    fn render_markers(&mut self, markers: &[Marker]) {
        self.renders += 1;
        self.markers = markers.to_vec();
    }

    fn notify_error(&mut self, message: &str) {
        tracing::error!(%message, "map error");
        self.errors.push(message.to_string());
    }

    fn follow(&mut self, viewport: &Viewport) {
        self.viewport = *viewport;
    }
}
