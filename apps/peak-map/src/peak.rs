use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;

pub type PeakId = i64;

const POSITION_DECIMALS: i32 = 4;

/// A peak as known to the server. Decoding fails when `id` is missing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Peak {
    pub id: PeakId,
    pub name: String,
    pub altitude: Altitude,
    pub lat: f64,
    pub lon: f64,
}

impl Peak {
    pub fn position(&self) -> LatLng {
        LatLng {
            lat: self.lat,
            lon: self.lon,
        }
    }
}

/// Body of a create request: a peak the server has not assigned an id to yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PeakInput {
    pub name: String,
    pub altitude: Altitude,
    pub lat: f64,
    pub lon: f64,
}

/// Altitude as typed by the user. Servers answer with numbers, the form holds
/// free text, so both decode and the value always encodes as a string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Altitude(String);

impl Altitude {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn meters(&self) -> Option<f64> {
        self.0
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|value| value.is_finite())
    }
}

impl fmt::Display for Altitude {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawAltitude {
    Text(String),
    Int(i64),
    Float(f64),
}

impl<'de> Deserialize<'de> for Altitude {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match RawAltitude::deserialize(deserializer)? {
            RawAltitude::Text(text) => Altitude(text),
            RawAltitude::Int(value) => Altitude(value.to_string()),
            RawAltitude::Float(value) => Altitude(value.to_string()),
        })
    }
}

impl Serialize for Altitude {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LatLng {
    pub lat: f64,
    pub lon: f64,
}

impl LatLng {
    pub fn new(lat: f64, lon: f64) -> Self {
        Self { lat, lon }
    }

    /// Position as stored for a new marker: 4 decimal places (about 11 m).
    pub fn rounded(self) -> Self {
        let factor = 10f64.powi(POSITION_DECIMALS);
        Self {
            lat: (self.lat * factor).round() / factor,
            lon: (self.lon * factor).round() / factor,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl BoundingBox {
    pub fn contains(&self, position: LatLng) -> bool {
        position.lat <= self.north
            && position.lat >= self.south
            && position.lon <= self.east
            && position.lon >= self.west
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Viewport {
    pub bounds: BoundingBox,
    pub zoom: f64,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn altitude_decodes_from_number_or_text() {
        let peak: Peak = serde_json::from_value(json!({
            "id": 7, "name": "Ben Nevis", "altitude": 1345, "lat": 56.7969, "lon": -5.0036
        }))
        .unwrap();
        assert_eq!(peak.altitude.as_str(), "1345");

        let peak: Peak = serde_json::from_value(json!({
            "id": 8, "name": "Snowdon", "altitude": "1085", "lat": 53.0685, "lon": -4.0763
        }))
        .unwrap();
        assert_eq!(peak.altitude.meters(), Some(1085.0));
    }

    #[test]
    fn peak_without_id_is_rejected() {
        let err = serde_json::from_value::<Peak>(json!({
            "name": "Nameless", "altitude": "10", "lat": 1.0, "lon": 2.0
        }));
        assert!(err.is_err());
    }

    #[test]
    fn altitude_encodes_as_string() {
        let input = PeakInput {
            name: "Scafell Pike".to_string(),
            altitude: Altitude::new("978"),
            lat: 54.4541,
            lon: -3.2117,
        };
        let value = serde_json::to_value(&input).unwrap();
        assert_eq!(value["altitude"], json!("978"));
        assert!(value.get("id").is_none());
    }

    #[test]
    fn free_text_altitude_has_no_meters() {
        assert_eq!(Altitude::new("about 900").meters(), None);
        assert_eq!(Altitude::new(" 900.5 ").meters(), Some(900.5));
    }

    #[test]
    fn rounded_keeps_four_decimals() {
        let position = LatLng::new(51.505_049_9, -0.090_051).rounded();
        assert_eq!(position, LatLng::new(51.505, -0.0901));
    }

    #[test]
    fn bounding_box_contains_edges() {
        let bounds = BoundingBox {
            north: 52.0,
            south: 51.0,
            east: 0.5,
            west: -0.5,
        };
        assert!(bounds.contains(LatLng::new(52.0, 0.5)));
        assert!(bounds.contains(LatLng::new(51.5, 0.0)));
        assert!(!bounds.contains(LatLng::new(52.1, 0.0)));
        assert!(!bounds.contains(LatLng::new(51.5, -0.6)));
    }
}
