use crate::entities::Coordinates;

pub const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Local east/north offset in metres from `from` to `to` (equirectangular).
fn offset_m(from: Coordinates, to: Coordinates) -> (f64, f64) {
    let mean_lat = ((from.lat + to.lat) / 2.0).to_radians();
    let east = (to.lon - from.lon).to_radians() * mean_lat.cos() * EARTH_RADIUS_M;
    let north = (to.lat - from.lat).to_radians() * EARTH_RADIUS_M;
    (east, north)
}

/// Planar distance, good enough at signal-proximity scale.
pub fn distance_m(from: Coordinates, to: Coordinates) -> f64 {
    let (east, north) = offset_m(from, to);
    east.hypot(north)
}

/// Compass bearing in degrees, `[0, 360)`, 0 is north.
pub fn bearing_deg(from: Coordinates, to: Coordinates) -> f64 {
    let (east, north) = offset_m(from, to);
    east.atan2(north).to_degrees().rem_euclid(360.0)
}

/// The point `meters` away from `from` along `bearing` degrees.
pub fn destination(from: Coordinates, bearing: f64, meters: f64) -> Coordinates {
    let bearing = bearing.to_radians();
    let north = meters * bearing.cos();
    let east = meters * bearing.sin();

    let lat = from.lat + (north / EARTH_RADIUS_M).to_degrees();
    let lon = from.lon + (east / (EARTH_RADIUS_M * from.lat.to_radians().cos())).to_degrees();
    Coordinates::new(lat, lon)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn distance_and_bearing() {
        let paulista = Coordinates::new(-23.5614, -46.6559);

        let north = destination(paulista, 0.0, 150.0);
        assert!((distance_m(paulista, north) - 150.0).abs() < 0.01);
        assert!(bearing_deg(paulista, north).abs() < 1e-6);

        let east = destination(paulista, 90.0, 250.0);
        assert!((distance_m(paulista, east) - 250.0).abs() < 0.5);
        assert!((bearing_deg(paulista, east) - 90.0).abs() < 0.1);

        let west = destination(paulista, 270.0, 40.0);
        assert!((bearing_deg(paulista, west) - 270.0).abs() < 0.1);
    }
}
