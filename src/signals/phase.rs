use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entities::TrafficLightPoint;
use crate::error::{render_defect_error, Error};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Green,
    Yellow,
    Red,
}

impl Phase {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Green => "green",
            Self::Yellow => "yellow",
            Self::Red => "red",
        }
    }
}

/// Derived every tick, never stored.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SignalPhaseState {
    pub phase: Phase,
    pub remaining_seconds: u32,
}

/// Phase and countdown of a fixed green → yellow → red cycle `elapsed`
/// seconds after the cycle started.
pub fn compute_phase(
    green: u32,
    yellow: u32,
    red: u32,
    elapsed: u64,
) -> Result<SignalPhaseState, Error> {
    let cycle = u64::from(green) + u64::from(yellow) + u64::from(red);
    if cycle == 0 {
        return Err(render_defect_error("signal cycle has zero length"));
    }

    let pos = elapsed % cycle;
    let (phase, remaining) = if pos < u64::from(green) {
        (Phase::Green, u64::from(green) - pos)
    } else if pos < u64::from(green) + u64::from(yellow) {
        (Phase::Yellow, u64::from(green) + u64::from(yellow) - pos)
    } else {
        (Phase::Red, cycle - pos)
    };

    Ok(SignalPhaseState {
        phase,
        // remaining <= cycle, which is a sum of three u32
        remaining_seconds: u32::try_from(remaining).unwrap_or(u32::MAX),
    })
}

/// Elapsed-time counter for one signal.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PhaseClock {
    green: u32,
    yellow: u32,
    red: u32,
    elapsed: u64,
}

impl PhaseClock {
    pub fn new(green: u32, yellow: u32, red: u32, offset: u64) -> Result<Self, Error> {
        let clock = Self {
            green,
            yellow,
            red,
            elapsed: offset,
        };
        clock.state()?;

        Ok(clock)
    }

    pub fn for_signal(signal: &TrafficLightPoint, offset: u64) -> Result<Self, Error> {
        Self::new(
            signal.green_duration,
            signal.yellow_duration,
            signal.red_duration,
            offset,
        )
    }

    /// Starts at a random point of the cycle so nearby signals do not look synchronized.
    pub fn randomized<R: Rng>(signal: &TrafficLightPoint, rng: &mut R) -> Result<Self, Error> {
        let cycle = signal.cycle_seconds();
        if cycle == 0 {
            return Err(render_defect_error("signal cycle has zero length"));
        }

        Self::for_signal(signal, rng.gen_range(0..cycle))
    }

    pub fn cycle(&self) -> u64 {
        u64::from(self.green) + u64::from(self.yellow) + u64::from(self.red)
    }

    pub fn elapsed(&self) -> u64 {
        self.elapsed
    }

    pub fn tick(&mut self) -> SignalPhaseState {
        self.elapsed += 1;
        self.current()
    }

    pub fn state(&self) -> Result<SignalPhaseState, Error> {
        compute_phase(self.green, self.yellow, self.red, self.elapsed)
    }

    fn current(&self) -> SignalPhaseState {
        // the constructor rejected zero-length cycles
        self.state().unwrap_or(SignalPhaseState {
            phase: Phase::Red,
            remaining_seconds: 0,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::Coordinates;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn state(phase: Phase, remaining_seconds: u32) -> SignalPhaseState {
        SignalPhaseState {
            phase,
            remaining_seconds,
        }
    }

    #[test]
    fn cycle_boundaries() {
        assert_eq!(compute_phase(30, 5, 25, 0).unwrap(), state(Phase::Green, 30));
        assert_eq!(compute_phase(30, 5, 25, 29).unwrap(), state(Phase::Green, 1));
        assert_eq!(compute_phase(30, 5, 25, 30).unwrap(), state(Phase::Yellow, 5));
        assert_eq!(compute_phase(30, 5, 25, 35).unwrap(), state(Phase::Red, 25));
        assert_eq!(compute_phase(30, 5, 25, 59).unwrap(), state(Phase::Red, 1));
        assert_eq!(compute_phase(30, 5, 25, 60).unwrap(), state(Phase::Green, 30));
        assert_eq!(compute_phase(30, 5, 25, 6035).unwrap(), state(Phase::Red, 25));
    }

    #[test]
    fn zero_yellow_skips_straight_to_red() {
        assert_eq!(compute_phase(10, 0, 10, 10).unwrap(), state(Phase::Red, 10));
    }

    #[test]
    fn zero_cycle_is_rejected() {
        assert!(compute_phase(0, 0, 0, 12).is_err());
        assert!(PhaseClock::new(0, 0, 0, 0).is_err());
    }

    #[test]
    fn clock_ticks_one_second() {
        let mut clock = PhaseClock::new(2, 1, 2, 0).unwrap();
        let phases: Vec<Phase> = (0..5).map(|_| clock.tick().phase).collect();

        assert_eq!(
            phases,
            vec![Phase::Green, Phase::Yellow, Phase::Red, Phase::Red, Phase::Green]
        );
        assert_eq!(clock.elapsed(), 5);
    }

    #[test]
    fn random_offset_stays_inside_cycle() {
        let signal = TrafficLightPoint::new(Coordinates::new(0.0, 0.0), 25, 4, 20);
        let mut rng = StdRng::seed_from_u64(7);

        for _ in 0..200 {
            let clock = PhaseClock::randomized(&signal, &mut rng).unwrap();
            assert!(clock.elapsed() < 49);
        }
    }

    #[test]
    fn randomized_handles_maximal_durations() {
        let mut signal = TrafficLightPoint::new(Coordinates::new(0.0, 0.0), u32::MAX, 1, 1);
        signal.red_duration = u32::MAX;
        let mut rng = StdRng::seed_from_u64(3);

        let mut clock = PhaseClock::randomized(&signal, &mut rng).unwrap();
        assert!(clock.elapsed() < clock.cycle());
        clock.tick();
    }
}
