//! Map shell: wires the viewport sync, the marker store and the editors to a
//! rendering widget.

mod headless;
mod shell;


use serde::{Deserialize, Serialize};

use crate::editor::Popup;
use crate::peak::{LatLng, PeakId, Viewport};

pub use headless::{viewport_around, HeadlessMap};
pub use shell::MapShell;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TileLayer {
    pub url_template: String,
    pub attribution: String,
}

/// One rendered marker. `id` is `None` for the pending marker.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: Option<PeakId>,
    pub position: LatLng,
    pub popup: Popup,
}

/// What the shell needs from a map widget.
pub trait MapWidget {
    fn viewport(&self) -> Viewport;

    fn set_tile_layer(&mut self, layer: &TileLayer);

    /// Moves the view. The shell loads the new viewport itself, so a flight
    /// needs no follow-up `MoveEnd`.
    fn fly_to(&mut self, position: LatLng, zoom: f64);

    /// Replaces every marker on the map.
    fn render_markers(&mut self, markers: &[Marker]);

    fn notify_error(&mut self, _message: &str) {}

    /// Adopts a viewport reported alongside an event. Interactive widgets
    /// raised the event themselves and already show it.
    fn follow(&mut self, _viewport: &Viewport) {}
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum MapEvent {
    Ready { viewport: Viewport },
    Click { position: LatLng },
    MoveEnd { viewport: Viewport },
    ZoomEnd { viewport: Viewport },
    LocationFound { position: LatLng },
}

/// Which marker's editor an action is aimed at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EditorKey {
    Pending,
    Peak(PeakId),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum EditorAction {
    BeginUpdate,
    SetName { value: String },
    SetAltitude { value: String },
    Cancel,
    Save,
    Delete,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShellInput {
    Map(MapEvent),
    Editor { key: EditorKey, action: EditorAction },
}
