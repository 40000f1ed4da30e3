//! Local traffic signal simulation.

mod driver;
mod phase;

pub use driver::PhaseDriver;
pub use phase::{compute_phase, Phase, PhaseClock, SignalPhaseState};
