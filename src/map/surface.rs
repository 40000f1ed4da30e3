use geo_types::Rect;
use geojson::FeatureCollection;
use serde::Serialize;
use serde_json::Value;

use super::popup::{Popup, PopupKind};
use super::viewport::Padding;
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LayerKind {
    Line,
    Circle,
    Symbol,
}

/// A draw layer bound to one source.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct LayerSpec {
    pub id: String,
    pub source: String,
    pub kind: LayerKind,
    pub paint: Value,
    pub layout: Value,
}

/// The rendering surface (a MapLibre-like map) as seen by the sync engine.
///
/// Swapping the style discards every source and layer; the surface reports
/// `is_style_loaded() == false` until the new style is ready.
pub trait MapSurface {
    fn is_style_loaded(&self) -> bool;
    fn set_style(&mut self, style_url: &str);

    fn has_source(&self, id: &str) -> bool;
    fn has_layer(&self, id: &str) -> bool;
    fn source_ids(&self) -> Vec<String>;
    /// Bottom to top.
    fn layer_ids(&self) -> Vec<String>;

    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), Error>;
    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), Error>;
    fn remove_layer(&mut self, id: &str) -> Result<(), Error>;
    fn remove_source(&mut self, id: &str) -> Result<(), Error>;
    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), Error>;

    fn fit_bounds(&mut self, bounds: Rect<f64>, padding: Padding);

    fn open_popup(&mut self, popup: &Popup);
    fn close_popup(&mut self, kind: PopupKind);
}
