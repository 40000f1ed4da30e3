//! In-process backend double driven by a script of responses.

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

use crate::{
    api::{HealthAPI, RouteAPI, SignalAPI, API},
    entities::{
        CongestionLevel, CongestionSegment, Coordinates, Health, NearbySignals, RouteCreated,
        RouteGeometry, RouteRequest, RouteResult, RouteStatus, RouteSummary, TrafficLightPoint,
    },
    error::{submission_error, Error},
};

pub(crate) struct ScriptedBackend {
    route_id: String,
    reject_submission: bool,
    script: Mutex<VecDeque<Result<RouteResult, Error>>>,
    repeat: Option<RouteResult>,
    fetches: AtomicU32,
    submissions: AtomicU32,
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
    signals: Vec<TrafficLightPoint>,
}

impl ScriptedBackend {
    pub(crate) fn new(route_id: &str) -> Self {
        Self {
            route_id: route_id.into(),
            reject_submission: false,
            script: Mutex::new(VecDeque::new()),
            repeat: None,
            fetches: AtomicU32::new(0),
            submissions: AtomicU32::new(0),
            gate: None,
            entered: Arc::new(Notify::new()),
            signals: vec![],
        }
    }

    pub(crate) fn then(self, response: Result<RouteResult, Error>) -> Self {
        self.script.lock().unwrap().push_back(response);
        self
    }

    /// Served once the script runs dry.
    pub(crate) fn repeating(mut self, result: RouteResult) -> Self {
        self.repeat = Some(result);
        self
    }

    pub(crate) fn rejecting_submissions(mut self) -> Self {
        self.reject_submission = true;
        self
    }

    /// Every fetch waits for a permit on `gate` before answering.
    pub(crate) fn gated(mut self, gate: Arc<Notify>) -> Self {
        self.gate = Some(gate);
        self
    }

    pub(crate) fn with_signals(mut self, signals: Vec<TrafficLightPoint>) -> Self {
        self.signals = signals;
        self
    }

    /// Notified each time a fetch starts.
    pub(crate) fn entered(&self) -> Arc<Notify> {
        self.entered.clone()
    }

    pub(crate) fn fetches(&self) -> u32 {
        self.fetches.load(Ordering::SeqCst)
    }

    pub(crate) fn submissions(&self) -> u32 {
        self.submissions.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl RouteAPI for ScriptedBackend {
    async fn create_route(&self, request: &RouteRequest) -> Result<RouteCreated, Error> {
        request.validate()?;
        self.submissions.fetch_add(1, Ordering::SeqCst);

        if self.reject_submission {
            return Err(submission_error("backend unreachable"));
        }

        Ok(RouteCreated {
            route_id: self.route_id.clone(),
            status: Some(RouteStatus::Pending),
            message: None,
        })
    }

    async fn find_route(&self, _route_id: &str) -> Result<RouteResult, Error> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();

        if let Some(gate) = &self.gate {
            gate.notified().await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(response) => response,
            None => Ok(self
                .repeat
                .clone()
                .unwrap_or_else(|| processing(&self.route_id))),
        }
    }
}

#[async_trait]
impl SignalAPI for ScriptedBackend {
    async fn nearby_signals(
        &self,
        _location: Coordinates,
        _radius_m: u32,
    ) -> Result<NearbySignals, Error> {
        Ok(NearbySignals {
            signals: self.signals.clone(),
            count: self.signals.len(),
        })
    }
}

#[async_trait]
impl HealthAPI for ScriptedBackend {
    async fn health(&self) -> Result<Health, Error> {
        Ok(Health {
            status: "healthy".into(),
            ..Health::default()
        })
    }
}

impl API for ScriptedBackend {}

pub(crate) fn processing(route_id: &str) -> RouteResult {
    RouteResult {
        status: RouteStatus::Processing,
        ..RouteResult::pending(route_id)
    }
}

/// A completed São Paulo → Rio result with `points` geometry positions and
/// `segments` congestion segments.
pub(crate) fn completed_route(route_id: &str, points: usize, segments: usize) -> RouteResult {
    let start = Coordinates::new(-23.55, -46.63);
    let end = Coordinates::new(-22.90, -43.17);
    let step = |i: usize, n: usize| {
        let t = if n > 1 { i as f64 / (n - 1) as f64 } else { 0.0 };
        Coordinates::new(
            start.lat + (end.lat - start.lat) * t,
            start.lon + (end.lon - start.lon) * t,
        )
    };

    let line: Vec<Coordinates> = (0..points).map(|i| step(i, points)).collect();
    let congestion = (0..segments)
        .map(|i| {
            let a = step(i, segments + 1);
            let b = step(i + 1, segments + 1);
            CongestionSegment::new(&[a, b], CongestionLevel::Moderate)
        })
        .collect();

    RouteResult {
        status: RouteStatus::Completed,
        route_geometry: Some(RouteGeometry::from_coordinates(&line)),
        summary: Some(RouteSummary {
            distance_km: 430.0,
            duration_minutes: 360.0,
            total_samples: 0,
            rain_samples: 0,
            overall_risk: Default::default(),
            recommendation: "".into(),
            confidence: 0.8,
            sources: vec![],
            fog_risk: None,
            traffic_lights_delay_minutes: 0.0,
        }),
        congestion_segments: Some(congestion),
        ..RouteResult::pending(route_id)
    }
}
