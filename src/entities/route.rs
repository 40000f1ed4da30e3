use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

use crate::entities::{Coordinates, RouteStatus};
use crate::error::Error;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RouteProfile {
    #[default]
    #[serde(rename = "driving-car")]
    DrivingCar,
    #[serde(rename = "driving-hgv")]
    DrivingHgv,
    #[serde(rename = "cycling-regular")]
    Cycling,
    #[serde(rename = "foot-walking")]
    Walking,
}

/// Body of `POST /routes`. Built once per analysis and never mutated.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteRequest {
    pub origin: Coordinates,
    pub destination: Coordinates,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub departure_time: Option<DateTime<FixedOffset>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub profile: Option<RouteProfile>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub avoid: Vec<String>,
}

impl RouteRequest {
    pub fn new(origin: Coordinates, destination: Coordinates) -> Self {
        Self {
            origin,
            destination,
            departure_time: None,
            profile: None,
            avoid: vec![],
        }
    }

    pub fn departing_at(mut self, departure_time: DateTime<FixedOffset>) -> Self {
        self.departure_time = Some(departure_time);
        self
    }

    pub fn with_profile(mut self, profile: RouteProfile) -> Self {
        self.profile = Some(profile);
        self
    }

    pub fn avoiding<S: Into<String>>(mut self, feature: S) -> Self {
        self.avoid.push(feature.into());
        self
    }

    pub fn validate(&self) -> Result<(), Error> {
        self.origin.validate()?;
        self.destination.validate()?;

        Ok(())
    }
}

/// Response of `POST /routes`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RouteCreated {
    pub route_id: String,
    #[serde(default)]
    pub status: Option<RouteStatus>,
    #[serde(default)]
    pub message: Option<String>,
}

#[test]
fn request_wire_shape() {
    use chrono::TimeZone;

    let brt = FixedOffset::west_opt(3 * 3600).unwrap();
    let request = RouteRequest::new(
        Coordinates::new(-23.5505, -46.6333),
        Coordinates::new(-22.9068, -43.1729),
    )
    .departing_at(brt.with_ymd_and_hms(2026, 2, 20, 8, 0, 0).unwrap())
    .with_profile(RouteProfile::DrivingCar);

    let body = serde_json::to_value(&request).unwrap();

    assert_eq!(body["origin"]["lat"], -23.5505);
    assert_eq!(body["profile"], "driving-car");
    assert_eq!(body["departure_time"], "2026-02-20T08:00:00-03:00");
    assert!(body.get("avoid").is_none());
}
