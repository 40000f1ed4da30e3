use geo_types::Rect;
use geojson::FeatureCollection;
use std::collections::{BTreeMap, HashMap};

use super::popup::{Popup, PopupKind};
use super::surface::{LayerSpec, MapSurface};
use super::viewport::Padding;
use crate::error::{surface_error, Error};

/// A map surface kept entirely in memory.
///
/// It is as strict as a real renderer: adding an existing id, binding a layer
/// to a missing source, removing an unknown id or removing a source that a
/// layer still draws from are all errors.
#[derive(Debug, Default)]
pub struct InMemorySurface {
    style_url: Option<String>,
    loaded: bool,
    sources: BTreeMap<String, FeatureCollection>,
    layers: Vec<LayerSpec>,
    fits: Vec<(Rect<f64>, Padding)>,
    popups: HashMap<PopupKind, Popup>,
}

impl InMemorySurface {
    pub fn loaded(style_url: &str) -> Self {
        Self {
            style_url: Some(style_url.into()),
            loaded: true,
            ..Self::default()
        }
    }

    /// Completes a pending style swap.
    pub fn finish_style_load(&mut self) {
        self.loaded = true;
    }

    pub fn style_url(&self) -> Option<&str> {
        self.style_url.as_deref()
    }

    pub fn source(&self, id: &str) -> Option<&FeatureCollection> {
        self.sources.get(id)
    }

    pub fn layer(&self, id: &str) -> Option<&LayerSpec> {
        self.layers.iter().find(|l| l.id == id)
    }

    pub fn fits(&self) -> &[(Rect<f64>, Padding)] {
        &self.fits
    }

    pub fn popup(&self, kind: PopupKind) -> Option<&Popup> {
        self.popups.get(&kind)
    }

    fn layer_index(&self, id: &str) -> Result<usize, Error> {
        self.layers
            .iter()
            .position(|l| l.id == id)
            .ok_or_else(|| surface_error(format!("layer {} does not exist", id)))
    }
}

impl MapSurface for InMemorySurface {
    fn is_style_loaded(&self) -> bool {
        self.loaded
    }

    fn set_style(&mut self, style_url: &str) {
        self.style_url = Some(style_url.into());
        self.loaded = false;
        self.sources.clear();
        self.layers.clear();
    }

    fn has_source(&self, id: &str) -> bool {
        self.sources.contains_key(id)
    }

    fn has_layer(&self, id: &str) -> bool {
        self.layers.iter().any(|l| l.id == id)
    }

    fn source_ids(&self) -> Vec<String> {
        self.sources.keys().cloned().collect()
    }

    fn layer_ids(&self) -> Vec<String> {
        self.layers.iter().map(|l| l.id.clone()).collect()
    }

    fn add_source(&mut self, id: &str, data: FeatureCollection) -> Result<(), Error> {
        if !self.loaded {
            return Err(surface_error("style is not loaded"));
        }
        if self.sources.contains_key(id) {
            return Err(surface_error(format!("source {} already exists", id)));
        }

        self.sources.insert(id.into(), data);
        Ok(())
    }

    fn add_layer(&mut self, layer: LayerSpec) -> Result<(), Error> {
        if !self.loaded {
            return Err(surface_error("style is not loaded"));
        }
        if self.has_layer(&layer.id) {
            return Err(surface_error(format!("layer {} already exists", layer.id)));
        }
        if !self.sources.contains_key(&layer.source) {
            return Err(surface_error(format!(
                "layer {} references missing source {}",
                layer.id, layer.source
            )));
        }

        self.layers.push(layer);
        Ok(())
    }

    fn remove_layer(&mut self, id: &str) -> Result<(), Error> {
        let index = self.layer_index(id)?;
        self.layers.remove(index);
        Ok(())
    }

    fn remove_source(&mut self, id: &str) -> Result<(), Error> {
        if let Some(layer) = self.layers.iter().find(|l| l.source == id) {
            return Err(surface_error(format!(
                "source {} is still used by layer {}",
                id, layer.id
            )));
        }
        if self.sources.remove(id).is_none() {
            return Err(surface_error(format!("source {} does not exist", id)));
        }

        Ok(())
    }

    fn move_layer(&mut self, id: &str, before: Option<&str>) -> Result<(), Error> {
        let index = self.layer_index(id)?;
        if let Some(before) = before {
            self.layer_index(before)?;
        }

        let layer = self.layers.remove(index);
        let at = match before {
            Some(before) => self.layer_index(before)?,
            None => self.layers.len(),
        };
        self.layers.insert(at, layer);
        Ok(())
    }

    fn fit_bounds(&mut self, bounds: Rect<f64>, padding: Padding) {
        self.fits.push((bounds, padding));
    }

    fn open_popup(&mut self, popup: &Popup) {
        self.popups.insert(popup.kind, popup.clone());
    }

    fn close_popup(&mut self, kind: PopupKind) {
        self.popups.remove(&kind);
    }
}
