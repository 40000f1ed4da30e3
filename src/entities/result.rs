use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, TrafficLightPoint};
use crate::error::{job_failed_error, poll_transport_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

impl RouteStatus {
    pub fn name(&self) -> String {
        match self {
            Self::Pending => "pending".into(),
            Self::Processing => "processing".into(),
            Self::Completed => "completed".into(),
            Self::Failed => "failed".into(),
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    fn rank(&self) -> u8 {
        match self {
            Self::Pending => 0,
            Self::Processing => 1,
            Self::Completed | Self::Failed => 2,
        }
    }

    /// Statuses only move forward and terminal statuses never change.
    pub fn can_advance_to(&self, next: RouteStatus) -> bool {
        if self.is_terminal() {
            return *self == next;
        }

        next.rank() >= self.rank()
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RainRisk {
    #[default]
    None,
    Low,
    Moderate,
    High,
    VeryHigh,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CongestionLevel {
    #[default]
    Free,
    Light,
    Moderate,
    Heavy,
    Severe,
}

impl CongestionLevel {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::Light => "light",
            Self::Moderate => "moderate",
            Self::Heavy => "heavy",
            Self::Severe => "severe",
        }
    }
}

/// GeoJSON LineString as returned by the backend, positions are `[lon, lat]`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteGeometry {
    #[serde(rename = "type", default = "line_string")]
    pub kind: String,
    #[serde(default)]
    pub coordinates: Vec<Vec<f64>>,
}

fn line_string() -> String {
    "LineString".into()
}

impl RouteGeometry {
    pub fn from_coordinates(points: &[Coordinates]) -> Self {
        Self {
            kind: line_string(),
            coordinates: points.iter().map(|c| c.to_position()).collect(),
        }
    }

    /// Valid positions only, malformed ones are dropped.
    pub fn points(&self) -> Vec<Coordinates> {
        self.coordinates
            .iter()
            .filter_map(|p| Coordinates::from_position(p))
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSummary {
    pub distance_km: f64,
    pub duration_minutes: f64,
    #[serde(default)]
    pub total_samples: u32,
    #[serde(default)]
    pub rain_samples: u32,
    #[serde(default)]
    pub overall_risk: RainRisk,
    #[serde(default)]
    pub recommendation: String,
    #[serde(default)]
    pub confidence: f64,
    #[serde(default)]
    pub sources: Vec<String>,
    #[serde(default)]
    pub fog_risk: Option<String>,
    #[serde(default)]
    pub traffic_lights_delay_minutes: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct WeatherSample {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub timestamp: Option<String>,
    #[serde(default)]
    pub precip_mm: f64,
    #[serde(default)]
    pub precip_prob: u32,
    #[serde(default)]
    pub temperature_c: Option<f64>,
    #[serde(default)]
    pub wind_speed_kmh: Option<f64>,
    #[serde(default)]
    pub humidity_percent: Option<u32>,
    #[serde(default)]
    pub visibility_m: Option<u32>,
    #[serde(default)]
    pub fog_risk: Option<String>,
    #[serde(default)]
    pub rain_risk: RainRisk,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub description: String,
}

impl WeatherSample {
    pub fn coordinates(&self) -> Option<Coordinates> {
        let coordinates = Coordinates::new(self.lat?, self.lon?);
        coordinates.is_valid().then_some(coordinates)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CongestionSegment {
    #[serde(default)]
    pub coordinates: Vec<Vec<f64>>,
    #[serde(default)]
    pub congestion_level: CongestionLevel,
    #[serde(default)]
    pub congestion_ratio: f64,
    #[serde(default)]
    pub avg_speed_kmh: f64,
    #[serde(default)]
    pub color: Option<String>,
}

impl CongestionSegment {
    pub fn new(points: &[Coordinates], level: CongestionLevel) -> Self {
        Self {
            coordinates: points.iter().map(|c| c.to_position()).collect(),
            congestion_level: level,
            congestion_ratio: 0.0,
            avg_speed_kmh: 60.0,
            color: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TollPoint {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub operator: String,
}

impl TollPoint {
    pub fn coordinates(&self) -> Option<Coordinates> {
        let coordinates = Coordinates::new(self.lat?, self.lon?);
        coordinates.is_valid().then_some(coordinates)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AccidentPoint {
    #[serde(default)]
    pub lat: Option<f64>,
    #[serde(default)]
    pub lon: Option<f64>,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub severity: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub delay_minutes: f64,
}

impl AccidentPoint {
    pub fn coordinates(&self) -> Option<Coordinates> {
        let coordinates = Coordinates::new(self.lat?, self.lon?);
        coordinates.is_valid().then_some(coordinates)
    }
}

/// Contiguous stretch of the route sharing one rain risk.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteSegment {
    pub start: Coordinates,
    pub end: Coordinates,
    #[serde(default)]
    pub has_rain: bool,
    #[serde(default)]
    pub rain_risk: RainRisk,
    #[serde(default)]
    pub point_count: u32,
}

/// Traffic reading at one point of the route, at its ETA.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficSample {
    pub lat: f64,
    pub lon: f64,
    #[serde(default)]
    pub eta: String,
    pub current_speed_kmh: f64,
    pub free_flow_speed_kmh: f64,
    #[serde(default)]
    pub congestion_ratio: f64,
    #[serde(default)]
    pub congestion_level: CongestionLevel,
    #[serde(default)]
    pub delay_minutes: f64,
    #[serde(default)]
    pub source: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrafficSummary {
    pub avg_speed_kmh: f64,
    pub avg_congestion_ratio: f64,
    #[serde(default)]
    pub overall_congestion: CongestionLevel,
    #[serde(default)]
    pub total_delay_minutes: f64,
    #[serde(default)]
    pub samples_count: u32,
}

/// `GET /routes/{route_id}`: the job status plus whatever payload is ready.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteResult {
    pub route_id: String,
    pub status: RouteStatus,
    #[serde(default)]
    pub error: Option<String>,
    #[serde(default)]
    pub route_geometry: Option<RouteGeometry>,
    #[serde(default)]
    pub summary: Option<RouteSummary>,
    #[serde(default)]
    pub samples: Option<Vec<WeatherSample>>,
    #[serde(default)]
    pub segments: Option<Vec<RouteSegment>>,
    #[serde(default)]
    pub traffic_summary: Option<TrafficSummary>,
    #[serde(default)]
    pub traffic_samples: Option<Vec<TrafficSample>>,
    #[serde(default)]
    pub congestion_segments: Option<Vec<CongestionSegment>>,
    #[serde(default)]
    pub traffic_light_points: Option<Vec<TrafficLightPoint>>,
    #[serde(default)]
    pub toll_points: Option<Vec<TollPoint>>,
    #[serde(default)]
    pub accident_points: Option<Vec<AccidentPoint>>,
    #[serde(default)]
    pub created_at: Option<String>,
}

impl RouteResult {
    pub fn pending<S: Into<String>>(route_id: S) -> Self {
        Self {
            route_id: route_id.into(),
            status: RouteStatus::Pending,
            error: None,
            route_geometry: None,
            summary: None,
            samples: None,
            segments: None,
            traffic_summary: None,
            traffic_samples: None,
            congestion_segments: None,
            traffic_light_points: None,
            toll_points: None,
            accident_points: None,
            created_at: None,
        }
    }

    pub fn failed<S: Into<String>, M: Into<String>>(route_id: S, message: M) -> Self {
        Self {
            status: RouteStatus::Failed,
            error: Some(message.into()),
            ..Self::pending(route_id)
        }
    }

    pub fn has_payload(&self) -> bool {
        self.route_geometry.is_some()
            || self.samples.is_some()
            || self.segments.is_some()
            || self.traffic_samples.is_some()
            || self.congestion_segments.is_some()
            || self.traffic_light_points.is_some()
            || self.toll_points.is_some()
            || self.accident_points.is_some()
    }

    /// Checks the completed/failed payload invariant.
    ///
    /// A completed result must carry geometry and summary; a failed one must
    /// carry a message and no payload arrays. Pending and processing results
    /// are accepted as they are.
    pub fn check_invariant(&self) -> Result<(), Error> {
        match self.status {
            RouteStatus::Completed => {
                if self.route_geometry.is_none() || self.summary.is_none() {
                    return Err(poll_transport_error(format!(
                        "route {} completed without geometry or summary",
                        self.route_id
                    )));
                }
                Ok(())
            }
            RouteStatus::Failed => {
                if self.error.is_none() || self.has_payload() {
                    return Err(poll_transport_error(format!(
                        "route {} failed with a malformed body",
                        self.route_id
                    )));
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// The terminal outcome of a result that passed [`check_invariant`](Self::check_invariant).
    pub fn into_outcome(self) -> Result<RouteResult, Error> {
        match self.status {
            RouteStatus::Failed => Err(job_failed_error(
                self.error.unwrap_or_else(|| "route analysis failed".into()),
            )),
            _ => Ok(self),
        }
    }

    pub fn signals(&self) -> &[TrafficLightPoint] {
        self.traffic_light_points.as_deref().unwrap_or(&[])
    }
}
