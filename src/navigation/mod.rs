//! Turn-by-turn view: follows GPS fixes and simulates the nearest signal.

mod coordinator;
mod geometry;

pub use coordinator::{
    ActiveSignal, CameraCommand, GpsFix, NavigationCoordinator, NavigationUpdate,
    NAVIGATION_PITCH, NAVIGATION_ZOOM,
};
pub use geometry::{bearing_deg, destination, distance_m, EARTH_RADIUS_M};
