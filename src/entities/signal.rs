use serde::{Deserialize, Serialize};

use crate::entities::Coordinates;

fn default_green() -> u32 {
    30
}

fn default_yellow() -> u32 {
    3
}

fn default_red() -> u32 {
    20
}

/// A traffic signal along the route with its simulated cycle, in seconds.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficLightPoint {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub osm_id: i64,
    #[serde(default)]
    pub name: String,
    #[serde(default = "default_green")]
    pub green_duration: u32,
    #[serde(default = "default_yellow")]
    pub yellow_duration: u32,
    #[serde(default = "default_red")]
    pub red_duration: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub distance_m: Option<f64>,
}

impl TrafficLightPoint {
    pub fn new(coordinates: Coordinates, green: u32, yellow: u32, red: u32) -> Self {
        Self {
            lat: Some(coordinates.lat),
            lon: Some(coordinates.lon),
            osm_id: 0,
            name: "".into(),
            green_duration: green,
            yellow_duration: yellow,
            red_duration: red,
            distance_m: None,
        }
    }

    pub fn coordinates(&self) -> Option<Coordinates> {
        let coordinates = Coordinates::new(self.lat?, self.lon?);
        coordinates.is_valid().then_some(coordinates)
    }

    /// Summed in `u64`, the durations come straight from the backend.
    pub fn cycle_seconds(&self) -> u64 {
        u64::from(self.green_duration)
            + u64::from(self.yellow_duration)
            + u64::from(self.red_duration)
    }

    /// Two signals are the same physical node when they share a non-zero OSM id,
    /// otherwise when they sit on the same position.
    pub fn same_node(&self, other: &TrafficLightPoint) -> bool {
        if self.osm_id != 0 && other.osm_id != 0 {
            return self.osm_id == other.osm_id;
        }

        self.coordinates().is_some() && self.coordinates() == other.coordinates()
    }
}

/// Response of `GET /nearby-signals`.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct NearbySignals {
    #[serde(default)]
    pub signals: Vec<TrafficLightPoint>,
    #[serde(default)]
    pub count: usize,
}

#[test]
fn signal_defaults_and_identity() {
    let a: TrafficLightPoint =
        serde_json::from_str(r#"{"lat": -23.5, "lon": -46.6, "osm_id": 7}"#).unwrap();
    assert_eq!(a.cycle_seconds(), 53);
    assert!(a.distance_m.is_none());

    let mut b = a.clone();
    b.lat = Some(-23.6);
    assert!(a.same_node(&b));

    let missing: TrafficLightPoint = serde_json::from_str(r#"{"lat": -23.5}"#).unwrap();
    assert!(missing.coordinates().is_none());
}

#[test]
fn huge_durations_do_not_overflow() {
    let signal: TrafficLightPoint = serde_json::from_str(
        r#"{"lat": -23.5, "lon": -46.6, "green_duration": 4294967295, "yellow_duration": 1, "red_duration": 1}"#,
    )
    .unwrap();

    assert_eq!(signal.cycle_seconds(), u64::from(u32::MAX) + 2);
}
