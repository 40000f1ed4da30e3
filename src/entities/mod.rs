mod coordinates;
mod health;
mod result;
mod route;
mod signal;

pub use coordinates::Coordinates;
pub use health::Health;
pub use result::{
    AccidentPoint, CongestionLevel, CongestionSegment, RainRisk, RouteGeometry, RouteResult,
    RouteSegment, RouteStatus, RouteSummary, TollPoint, TrafficSample, TrafficSummary,
    WeatherSample,
};
pub use route::{RouteCreated, RouteProfile, RouteRequest};
pub use signal::{NearbySignals, TrafficLightPoint};
