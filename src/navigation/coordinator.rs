use async_channel::Receiver;
use std::time::Duration;

use super::geometry::{bearing_deg, distance_m};
use crate::api::SignalAPI;
use crate::config::Config;
use crate::entities::{Coordinates, RouteResult, TrafficLightPoint};
use crate::error::Error;
use crate::signals::{PhaseClock, PhaseDriver, SignalPhaseState};

pub const NAVIGATION_ZOOM: f64 = 17.0;
pub const NAVIGATION_PITCH: f64 = 60.0;

/// Fixes closer than this to the previous one do not change the bearing.
const MIN_BEARING_MOVE_M: f64 = 2.0;

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GpsFix {
    pub at: Coordinates,
    /// Degrees from north, when the device reports one.
    pub heading: Option<f64>,
}

impl GpsFix {
    pub fn new(at: Coordinates) -> Self {
        Self { at, heading: None }
    }

    pub fn heading(mut self, heading: f64) -> Self {
        self.heading = Some(heading);
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CameraCommand {
    pub center: Coordinates,
    pub bearing: f64,
    pub zoom: f64,
    pub pitch: f64,
}

#[derive(Clone, Debug, PartialEq)]
pub struct ActiveSignal {
    pub signal: TrafficLightPoint,
    pub distance_m: f64,
    pub phase: SignalPhaseState,
}

#[derive(Clone, Debug, PartialEq)]
pub struct NavigationUpdate {
    pub camera: CameraCommand,
    pub signal: Option<ActiveSignal>,
}

struct Simulation {
    signal: TrafficLightPoint,
    driver: PhaseDriver,
}

/// Reacts to GPS fixes: keeps the camera on the vehicle and runs the phase
/// simulation for the nearest signal within `radius_m`.
pub struct NavigationCoordinator {
    signals: Vec<TrafficLightPoint>,
    radius_m: f64,
    tick: Duration,
    previous: Option<Coordinates>,
    bearing: f64,
    active: Option<Simulation>,
}

impl NavigationCoordinator {
    pub fn new(radius_m: f64) -> Self {
        Self {
            signals: vec![],
            radius_m,
            tick: Duration::from_secs(1),
            previous: None,
            bearing: 0.0,
            active: None,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.signal_radius_m)
    }

    /// Phase driver tick period, one simulated second per tick.
    pub fn with_tick(mut self, tick: Duration) -> Self {
        self.tick = tick;
        self
    }

    pub fn signals(&self) -> &[TrafficLightPoint] {
        &self.signals
    }

    /// Replaces the known signals with the route's and stops any simulation.
    pub fn set_route(&mut self, result: &RouteResult) {
        self.stop();
        self.signals.clear();
        self.merge_signals(result.signals().to_vec());
    }

    /// Adds signals not already known, returns how many were new.
    pub fn merge_signals(&mut self, signals: Vec<TrafficLightPoint>) -> usize {
        let before = self.signals.len();
        for signal in signals {
            if !self.signals.iter().any(|s| s.same_node(&signal)) {
                self.signals.push(signal);
            }
        }
        self.signals.len() - before
    }

    #[tracing::instrument(skip(self, api))]
    pub async fn prefetch_nearby<A: SignalAPI + ?Sized>(
        &mut self,
        api: &A,
        at: Coordinates,
        radius_m: u32,
    ) -> Result<usize, Error> {
        let nearby = api.nearby_signals(at, radius_m).await?;
        let added = self.merge_signals(nearby.signals);
        tracing::debug!(added, known = self.signals.len(), "merged nearby signals");
        Ok(added)
    }

    pub fn active_signal(&self) -> Option<&TrafficLightPoint> {
        self.active.as_ref().map(|s| &s.signal)
    }

    pub fn is_simulating(&self) -> bool {
        self.active.is_some()
    }

    /// Countdown updates for the active signal, if any.
    pub fn subscribe_phase(&self) -> Option<Receiver<SignalPhaseState>> {
        self.active.as_ref().map(|s| s.driver.subscribe())
    }

    /// Must be called inside a tokio runtime, the phase driver runs as a task.
    pub fn on_location(&mut self, fix: GpsFix) -> NavigationUpdate {
        let camera = self.camera(fix);
        self.previous = Some(fix.at);

        let nearest = self
            .signals
            .iter()
            .filter_map(|s| Some((s, distance_m(fix.at, s.coordinates()?))))
            .min_by(|a, b| a.1.total_cmp(&b.1))
            .filter(|(_, distance)| *distance <= self.radius_m)
            .map(|(s, distance)| (s.clone(), distance));

        let signal = match nearest {
            Some((signal, distance)) => self.activate(signal, distance),
            None => {
                self.stop();
                None
            }
        };

        NavigationUpdate { camera, signal }
    }

    /// Stops the phase driver; no countdown is published after this returns.
    pub fn stop(&mut self) {
        if let Some(mut simulation) = self.active.take() {
            simulation.driver.stop();
            tracing::debug!(osm_id = simulation.signal.osm_id, "signal simulation stopped");
        }
    }

    fn camera(&mut self, fix: GpsFix) -> CameraCommand {
        if let Some(heading) = fix.heading.filter(|h| h.is_finite()) {
            self.bearing = heading.rem_euclid(360.0);
        } else if let Some(previous) = self.previous {
            if distance_m(previous, fix.at) >= MIN_BEARING_MOVE_M {
                self.bearing = bearing_deg(previous, fix.at);
            }
        }

        CameraCommand {
            center: fix.at,
            bearing: self.bearing,
            zoom: NAVIGATION_ZOOM,
            pitch: NAVIGATION_PITCH,
        }
    }

    fn activate(&mut self, signal: TrafficLightPoint, distance: f64) -> Option<ActiveSignal> {
        let same = self
            .active
            .as_ref()
            .map_or(false, |s| s.signal.same_node(&signal));

        if !same {
            self.stop();

            let clock = match PhaseClock::randomized(&signal, &mut rand::thread_rng()) {
                Ok(clock) => clock,
                Err(err) => {
                    tracing::warn!(osm_id = signal.osm_id, error = %err, "cannot simulate signal");
                    return None;
                }
            };

            tracing::debug!(osm_id = signal.osm_id, distance, "signal simulation started");
            self.active = Some(Simulation {
                signal: signal.clone(),
                driver: PhaseDriver::start(clock, self.tick),
            });
        }

        let phase = self.active.as_ref()?.driver.current()?;
        Some(ActiveSignal {
            signal,
            distance_m: distance,
            phase,
        })
    }
}

impl Drop for NavigationCoordinator {
    fn drop(&mut self) {
        self.stop();
    }
}
