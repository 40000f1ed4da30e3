use geo_types::{Coord, Rect};
use serde::Serialize;

use crate::entities::Coordinates;

pub const BASE_PADDING_PX: f64 = 40.0;

#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize)]
pub struct Padding {
    pub top: f64,
    pub right: f64,
    pub bottom: f64,
    pub left: f64,
}

/// Screen chrome overlapping the map. Read on every fit, never cached, since
/// panels can be resized or hidden between fits. Hidden chrome reports zero.
pub trait ChromeLayout {
    fn side_panel_width(&self) -> f64;
    fn top_bar_height(&self) -> f64;
    fn bottom_timeline_height(&self) -> f64;
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct FixedChrome {
    pub side_panel_width: f64,
    pub top_bar_height: f64,
    pub bottom_timeline_height: f64,
}

impl ChromeLayout for FixedChrome {
    fn side_panel_width(&self) -> f64 {
        self.side_panel_width
    }

    fn top_bar_height(&self) -> f64 {
        self.top_bar_height
    }

    fn bottom_timeline_height(&self) -> f64 {
        self.bottom_timeline_height
    }
}

pub fn fit_padding<C: ChromeLayout + ?Sized>(chrome: &C) -> Padding {
    Padding {
        top: BASE_PADDING_PX + chrome.top_bar_height().max(0.0),
        right: BASE_PADDING_PX,
        bottom: BASE_PADDING_PX + chrome.bottom_timeline_height().max(0.0),
        left: BASE_PADDING_PX + chrome.side_panel_width().max(0.0),
    }
}

/// Bounding box in lon/lat; `None` for an empty route.
pub fn route_bounds(points: &[Coordinates]) -> Option<Rect<f64>> {
    let first = points.first()?;
    let (mut min_lon, mut min_lat) = (first.lon, first.lat);
    let (mut max_lon, mut max_lat) = (first.lon, first.lat);

    for p in &points[1..] {
        min_lon = min_lon.min(p.lon);
        min_lat = min_lat.min(p.lat);
        max_lon = max_lon.max(p.lon);
        max_lat = max_lat.max(p.lat);
    }

    Some(Rect::new(
        Coord { x: min_lon, y: min_lat },
        Coord { x: max_lon, y: max_lat },
    ))
}
