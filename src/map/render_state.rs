use crate::entities::{
    AccidentPoint, CongestionSegment, RouteGeometry, RouteResult, TollPoint, TrafficLightPoint,
    WeatherSample,
};

use super::channel::ChannelKind;

/// Everything the overlays draw, in one owned value.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct RenderState {
    pub route: Option<RouteGeometry>,
    pub congestion: Vec<CongestionSegment>,
    pub samples: Vec<WeatherSample>,
    pub tolls: Vec<TollPoint>,
    pub accidents: Vec<AccidentPoint>,
    pub signals: Vec<TrafficLightPoint>,
}

impl From<&RouteResult> for RenderState {
    fn from(result: &RouteResult) -> Self {
        Self {
            route: result.route_geometry.clone(),
            congestion: result.congestion_segments.clone().unwrap_or_default(),
            samples: result.samples.clone().unwrap_or_default(),
            tolls: result.toll_points.clone().unwrap_or_default(),
            accidents: result.accident_points.clone().unwrap_or_default(),
            signals: result.traffic_light_points.clone().unwrap_or_default(),
        }
    }
}

/// New data for a single channel.
#[derive(Clone, Debug, PartialEq)]
pub enum ChannelUpdate {
    Route(Option<RouteGeometry>),
    Congestion(Vec<CongestionSegment>),
    Samples(Vec<WeatherSample>),
    Tolls(Vec<TollPoint>),
    Accidents(Vec<AccidentPoint>),
    Signals(Vec<TrafficLightPoint>),
}

impl RenderState {
    pub fn is_empty(&self) -> bool {
        self.route.is_none()
            && self.congestion.is_empty()
            && self.samples.is_empty()
            && self.tolls.is_empty()
            && self.accidents.is_empty()
            && self.signals.is_empty()
    }

    /// Stores the update and reports which channel changed.
    pub fn apply(&mut self, update: ChannelUpdate) -> ChannelKind {
        match update {
            ChannelUpdate::Route(route) => {
                self.route = route;
                ChannelKind::Route
            }
            ChannelUpdate::Congestion(segments) => {
                self.congestion = segments;
                ChannelKind::Congestion
            }
            ChannelUpdate::Samples(samples) => {
                self.samples = samples;
                ChannelKind::Samples
            }
            ChannelUpdate::Tolls(tolls) => {
                self.tolls = tolls;
                ChannelKind::Tolls
            }
            ChannelUpdate::Accidents(accidents) => {
                self.accidents = accidents;
                ChannelKind::Accidents
            }
            ChannelUpdate::Signals(signals) => {
                self.signals = signals;
                ChannelKind::Signals
            }
        }
    }
}
