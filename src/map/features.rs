use geo_types::{Coord, LineString, Point};
use geojson::{Feature, FeatureCollection, Geometry};

use crate::entities::{
    AccidentPoint, CongestionSegment, Coordinates, RouteGeometry, TollPoint, TrafficLightPoint,
    WeatherSample,
};
use crate::error::{render_defect_error, Error};

use super::theme::Theme;

/// Features built for one source, plus how many inputs were rejected.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Built {
    pub features: Vec<Feature>,
    pub skipped: usize,
}

impl Built {
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    pub fn collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.clone(),
            foreign_members: None,
        }
    }

    fn push(&mut self, channel: &str, index: usize, feature: Result<Feature, Error>) {
        match feature {
            Ok(feature) => self.features.push(feature),
            Err(err) => {
                tracing::warn!(channel, index, error = %err, "skipping malformed feature");
                self.skipped += 1;
            }
        }
    }
}

fn line(points: &[Coordinates]) -> Geometry {
    let coords: Vec<Coord<f64>> = points.iter().map(|p| Coord::from(*p)).collect();
    Geometry::from(&LineString::from(coords))
}

fn point(at: Coordinates) -> Geometry {
    Geometry::from(&Point::from(Coord::from(at)))
}

/// Rejects lines with any unusable position, or fewer than two positions.
fn line_points(positions: &[Vec<f64>], what: &str) -> Result<Vec<Coordinates>, Error> {
    let points: Vec<Coordinates> = positions
        .iter()
        .map(|p| Coordinates::from_position(p))
        .collect::<Option<_>>()
        .ok_or_else(|| render_defect_error(format!("{} has an invalid position", what)))?;

    if points.len() < 2 {
        return Err(render_defect_error(format!(
            "{} has {} positions",
            what,
            points.len()
        )));
    }

    Ok(points)
}

fn located(at: Option<Coordinates>, what: &str) -> Result<Coordinates, Error> {
    at.ok_or_else(|| render_defect_error(format!("{} has no valid location", what)))
}

pub fn route(geometry: Option<&RouteGeometry>) -> Built {
    let mut built = Built::default();

    if let Some(geometry) = geometry {
        let feature = line_points(&geometry.coordinates, "route").map(|points| {
            let mut f = Feature::from(line(&points));
            f.set_property("positions", points.len());
            f
        });
        built.push("route", 0, feature);
    }

    built
}

/// One collection per segment, so every segment owns its own source.
pub fn congestion(segments: &[CongestionSegment], theme: Theme, generation: u64) -> Vec<Built> {
    segments
        .iter()
        .enumerate()
        .map(|(index, segment)| {
            let mut built = Built::default();
            let feature = line_points(&segment.coordinates, "congestion segment").map(|points| {
                let mut f = Feature::from(line(&points));
                f.set_property("level", segment.congestion_level.name());
                f.set_property("ratio", segment.congestion_ratio);
                f.set_property("speed_kmh", segment.avg_speed_kmh);
                f.set_property("color", theme.congestion_color(segment.congestion_level));
                f.set_property("generation", generation);
                f
            });
            built.push("congestion", index, feature);
            built
        })
        .collect()
}

pub fn tolls(tolls: &[TollPoint]) -> Built {
    let mut built = Built::default();

    for (index, toll) in tolls.iter().enumerate() {
        let feature = located(toll.coordinates(), "toll").map(|at| {
            let mut f = Feature::from(point(at));
            f.set_property("name", toll.name.clone());
            f.set_property("operator", toll.operator.clone());
            f.set_property("label", toll.name.clone());
            f
        });
        built.push("tolls", index, feature);
    }

    built
}

pub fn accidents(accidents: &[AccidentPoint]) -> Built {
    let mut built = Built::default();

    for (index, accident) in accidents.iter().enumerate() {
        let feature = located(accident.coordinates(), "accident").map(|at| {
            let mut f = Feature::from(point(at));
            f.set_property("type", accident.kind.clone());
            f.set_property("severity", accident.severity.clone());
            f.set_property("description", accident.description.clone());
            f.set_property("delay_minutes", accident.delay_minutes);
            f.set_property("label", format!("+{:.0} min", accident.delay_minutes));
            f
        });
        built.push("accidents", index, feature);
    }

    built
}

pub fn signals(signals: &[TrafficLightPoint]) -> Built {
    let mut built = Built::default();

    for (index, signal) in signals.iter().enumerate() {
        let feature = located(signal.coordinates(), "signal").and_then(|at| {
            if signal.cycle_seconds() == 0 {
                return Err(render_defect_error("signal has a zero-length cycle"));
            }

            let mut f = Feature::from(point(at));
            f.set_property("osm_id", signal.osm_id);
            f.set_property("name", signal.name.clone());
            f.set_property("green_duration", signal.green_duration);
            f.set_property("yellow_duration", signal.yellow_duration);
            f.set_property("red_duration", signal.red_duration);
            Ok(f)
        });
        built.push("signals", index, feature);
    }

    built
}

pub fn samples(samples: &[WeatherSample]) -> Built {
    let mut built = Built::default();

    for (index, sample) in samples.iter().enumerate() {
        let feature = located(sample.coordinates(), "weather sample").map(|at| {
            let mut f = Feature::from(point(at));
            f.set_property("precip_mm", sample.precip_mm);
            f.set_property("precip_prob", sample.precip_prob);
            f.set_property("rain_risk", serde_json::to_value(sample.rain_risk).unwrap_or_default());
            f.set_property("wet", sample.precip_mm > 0.0);
            f.set_property("description", sample.description.clone());
            if let Some(timestamp) = &sample.timestamp {
                f.set_property("timestamp", timestamp.clone());
            }
            if let Some(temperature) = sample.temperature_c {
                f.set_property("temperature_c", temperature);
            }
            f.set_property("label", format!("{}%", sample.precip_prob));
            f
        });
        built.push("samples", index, feature);
    }

    built
}
