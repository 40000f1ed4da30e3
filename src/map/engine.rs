use geojson::JsonObject;

use super::channel::{self, ChannelKind, SegmentArena, CONGESTION_PREFIX};
use super::popup::{PopupCommand, PopupController};
use super::render_state::{ChannelUpdate, RenderState};
use super::surface::MapSurface;
use super::theme::Theme;
use super::viewport::{fit_padding, route_bounds, ChromeLayout};
use crate::entities::{Coordinates, RouteResult};
use crate::error::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lifecycle {
    /// A style swap is in progress; rebuilds are deferred.
    Loading,
    Ready,
}

/// Everything that can make the overlays change.
#[derive(Clone, Debug, PartialEq)]
pub enum MapEvent {
    ResultChanged(Option<RouteResult>),
    ChannelChanged(ChannelUpdate),
    StyleChanging,
    StyleReady,
    ThemeChanged(Theme),
    Hover {
        layer_id: String,
        at: Coordinates,
        properties: JsonObject,
    },
    HoverEnd,
    Click {
        layer_id: String,
        at: Coordinates,
        properties: JsonObject,
    },
    ClosePopup,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RebuildReport {
    pub channels: usize,
    pub skipped: usize,
    pub reordered: bool,
}

/// Keeps the surface's overlay sources and layers in step with one owned
/// [`RenderState`].
pub struct MapSyncEngine {
    state: RenderState,
    theme: Theme,
    arena: SegmentArena,
    lifecycle: Lifecycle,
    pending_rebuild: bool,
    popups: PopupController,
    full_rebuilds: u64,
}

impl MapSyncEngine {
    pub fn attach<S: MapSurface + ?Sized>(surface: &S, theme: Theme) -> Self {
        let lifecycle = match surface.is_style_loaded() {
            true => Lifecycle::Ready,
            false => Lifecycle::Loading,
        };

        Self {
            state: RenderState::default(),
            theme,
            arena: SegmentArena::default(),
            lifecycle,
            pending_rebuild: false,
            popups: PopupController::default(),
            full_rebuilds: 0,
        }
    }

    pub fn state(&self) -> &RenderState {
        &self.state
    }

    pub fn theme(&self) -> Theme {
        self.theme
    }

    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    pub fn arena(&self) -> SegmentArena {
        self.arena
    }

    pub fn full_rebuilds(&self) -> u64 {
        self.full_rebuilds
    }

    pub fn popups(&self) -> &PopupController {
        &self.popups
    }

    pub fn dispatch<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        event: MapEvent,
    ) -> Result<(), Error> {
        match event {
            MapEvent::ResultChanged(result) => self.on_result_changed(surface, result.as_ref()),
            MapEvent::ChannelChanged(update) => self.on_channel_changed(surface, update),
            MapEvent::StyleChanging => {
                self.on_style_changing();
                Ok(())
            }
            MapEvent::StyleReady => self.on_style_ready(surface),
            MapEvent::ThemeChanged(theme) => {
                self.on_theme_changed(surface, theme);
                Ok(())
            }
            MapEvent::Hover {
                layer_id,
                at,
                properties,
            } => {
                self.on_hover(surface, &layer_id, at, properties);
                Ok(())
            }
            MapEvent::HoverEnd => {
                self.on_hover_end(surface);
                Ok(())
            }
            MapEvent::Click {
                layer_id,
                at,
                properties,
            } => {
                self.on_click(surface, &layer_id, at, properties);
                Ok(())
            }
            MapEvent::ClosePopup => {
                self.on_close_popup(surface);
                Ok(())
            }
        }
    }

    #[tracing::instrument(skip_all)]
    pub fn on_result_changed<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        result: Option<&RouteResult>,
    ) -> Result<(), Error> {
        self.state = result.map(RenderState::from).unwrap_or_default();
        self.close_popups(surface);
        self.request_rebuild(surface)
    }

    pub fn on_channel_changed<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        update: ChannelUpdate,
    ) -> Result<(), Error> {
        let kind = self.state.apply(update);

        if !self.can_draw(surface) {
            self.defer(surface);
            return Ok(());
        }

        let mut report = RebuildReport::default();
        sync_channel(surface, &mut self.arena, &self.state, self.theme, kind, &mut report)?;
        report.reordered = reorder(surface)?;
        tracing::debug!(channel = kind.name(), ?report, "channel synced");
        Ok(())
    }

    pub fn on_style_changing(&mut self) {
        self.lifecycle = Lifecycle::Loading;
    }

    /// Runs exactly one full rebuild per style swap. A ready event while
    /// already ready is ignored unless a rebuild was deferred or the overlays
    /// were wiped by a swap the engine was not told about.
    #[tracing::instrument(skip_all)]
    pub fn on_style_ready<S: MapSurface + ?Sized>(&mut self, surface: &mut S) -> Result<(), Error> {
        let wiped = !self.state.is_empty()
            && !surface
                .layer_ids()
                .iter()
                .any(|id| channel::draw_rank(id).is_some());

        if self.lifecycle == Lifecycle::Ready && !self.pending_rebuild && !wiped {
            tracing::debug!("ignoring duplicate style ready");
            return Ok(());
        }

        self.lifecycle = Lifecycle::Ready;
        self.pending_rebuild = false;
        // the swap wiped every overlay
        self.arena.count = 0;
        self.full_rebuild(surface).map(|_| ())
    }

    pub fn on_theme_changed<S: MapSurface + ?Sized>(&mut self, surface: &mut S, theme: Theme) {
        if theme == self.theme {
            return;
        }

        tracing::info!(?theme, "switching map theme");
        self.theme = theme;
        self.lifecycle = Lifecycle::Loading;
        self.close_popups(surface);
        surface.set_style(theme.style_url());
    }

    /// Fits the camera to the route; returns false when there is no route.
    pub fn fit_route<S, C>(&self, surface: &mut S, chrome: &C) -> bool
    where
        S: MapSurface + ?Sized,
        C: ChromeLayout + ?Sized,
    {
        let points = self
            .state
            .route
            .as_ref()
            .map(|r| r.points())
            .unwrap_or_default();

        match route_bounds(&points) {
            Some(bounds) => {
                surface.fit_bounds(bounds, fit_padding(chrome));
                true
            }
            None => false,
        }
    }

    pub fn on_hover<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        layer_id: &str,
        at: Coordinates,
        properties: JsonObject,
    ) {
        let commands = self.popups.hover(at, layer_id, properties);
        apply_popups(surface, commands);
    }

    pub fn on_hover_end<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        let commands = self.popups.hover_end();
        apply_popups(surface, commands);
    }

    pub fn on_click<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
        layer_id: &str,
        at: Coordinates,
        properties: JsonObject,
    ) {
        let commands = self.popups.click(at, layer_id, properties);
        apply_popups(surface, commands);
    }

    pub fn on_close_popup<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        let commands = self.popups.close_persistent();
        apply_popups(surface, commands);
    }

    fn close_popups<S: MapSurface + ?Sized>(&mut self, surface: &mut S) {
        let commands = self.popups.close_all();
        apply_popups(surface, commands);
    }

    fn can_draw<S: MapSurface + ?Sized>(&self, surface: &S) -> bool {
        self.lifecycle == Lifecycle::Ready && surface.is_style_loaded()
    }

    fn request_rebuild<S: MapSurface + ?Sized>(&mut self, surface: &mut S) -> Result<(), Error> {
        if !self.can_draw(surface) {
            tracing::debug!("style loading, rebuild deferred");
            self.defer(surface);
            return Ok(());
        }

        self.full_rebuild(surface).map(|_| ())
    }

    /// Queues the next full rebuild. A surface that reports its style as not
    /// loaded is mid-swap even if no style-changing event arrived.
    fn defer<S: MapSurface + ?Sized>(&mut self, surface: &S) {
        if !surface.is_style_loaded() {
            self.lifecycle = Lifecycle::Loading;
        }
        self.pending_rebuild = true;
    }

    fn full_rebuild<S: MapSurface + ?Sized>(
        &mut self,
        surface: &mut S,
    ) -> Result<RebuildReport, Error> {
        let report = rebuild(surface, &mut self.arena, &self.state, self.theme)?;
        self.full_rebuilds += 1;
        tracing::info!(
            channels = report.channels,
            skipped = report.skipped,
            generation = self.arena.generation,
            "overlays rebuilt"
        );
        Ok(report)
    }
}

fn apply_popups<S: MapSurface + ?Sized>(surface: &mut S, commands: Vec<PopupCommand>) {
    for command in commands {
        match command {
            PopupCommand::Open(popup) => surface.open_popup(&popup),
            PopupCommand::Close(kind) => surface.close_popup(kind),
        }
    }
}

/// Makes every channel on `surface` reflect `state`, then restores the draw
/// order. Safe to run any number of times for the same state.
pub fn rebuild<S: MapSurface + ?Sized>(
    surface: &mut S,
    arena: &mut SegmentArena,
    state: &RenderState,
    theme: Theme,
) -> Result<RebuildReport, Error> {
    let mut report = RebuildReport::default();

    for kind in ChannelKind::ALL {
        sync_channel(surface, arena, state, theme, kind, &mut report)?;
    }

    report.reordered = reorder(surface)?;
    Ok(report)
}

fn sync_channel<S: MapSurface + ?Sized>(
    surface: &mut S,
    arena: &mut SegmentArena,
    state: &RenderState,
    theme: Theme,
    kind: ChannelKind,
    report: &mut RebuildReport,
) -> Result<(), Error> {
    let generation = match kind {
        ChannelKind::Congestion => arena.generation + 1,
        _ => arena.generation,
    };
    let built = channel::build(kind, state, theme, generation);

    teardown(surface, arena, kind)?;
    if kind == ChannelKind::Congestion {
        arena.advance(built.channels.len());
    }

    for channel in built.channels {
        surface.add_source(&channel.source, channel.data)?;
        for layer in channel.layers {
            surface.add_layer(layer)?;
        }
        report.channels += 1;
    }

    report.skipped += built.skipped;
    Ok(())
}

/// Removes whatever the channel currently has on the surface. Only ids that
/// exist are removed, layers before their sources.
fn teardown<S: MapSurface + ?Sized>(
    surface: &mut S,
    arena: &SegmentArena,
    kind: ChannelKind,
) -> Result<(), Error> {
    let (mut layers, mut sources) = match kind {
        ChannelKind::Congestion => (arena.layer_ids(), arena.source_ids()),
        other => (
            other.reserved_layers(),
            other.reserved_source().into_iter().collect(),
        ),
    };

    if kind == ChannelKind::Congestion {
        let stray_layers = surface
            .layer_ids()
            .into_iter()
            .filter(|id| id.starts_with(CONGESTION_PREFIX) && !layers.contains(id))
            .collect::<Vec<_>>();
        let stray_sources = surface
            .source_ids()
            .into_iter()
            .filter(|id| id.starts_with(CONGESTION_PREFIX) && !sources.contains(id))
            .collect::<Vec<_>>();

        if !stray_layers.is_empty() || !stray_sources.is_empty() {
            tracing::warn!(
                layers = stray_layers.len(),
                sources = stray_sources.len(),
                "sweeping stray congestion drawables"
            );
        }
        layers.extend(stray_layers);
        sources.extend(stray_sources);
    }

    for id in &layers {
        if surface.has_layer(id) {
            surface.remove_layer(id)?;
        }
    }
    for id in &sources {
        if surface.has_source(id) {
            surface.remove_source(id)?;
        }
    }

    Ok(())
}

/// Moves overlay layers to the top in draw order, but only when the current
/// order differs.
fn reorder<S: MapSurface + ?Sized>(surface: &mut S) -> Result<bool, Error> {
    let current: Vec<String> = surface
        .layer_ids()
        .into_iter()
        .filter(|id| channel::draw_rank(id).is_some())
        .collect();

    let mut desired = current.clone();
    desired.sort_by_key(|id| channel::draw_rank(id));

    if desired == current && surface.layer_ids().ends_with(&current) {
        return Ok(false);
    }

    for id in &desired {
        surface.move_layer(id, None)?;
    }

    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::scripted::completed_route;
    use crate::entities::{CongestionLevel, CongestionSegment, TollPoint, TrafficLightPoint};
    use crate::map::memory::InMemorySurface;
    use crate::map::popup::PopupKind;
    use crate::map::surface::{LayerKind, LayerSpec};
    use crate::map::viewport::{FixedChrome, BASE_PADDING_PX};
    use geojson::FeatureCollection;
    use serde_json::json;

    fn ready() -> (InMemorySurface, MapSyncEngine) {
        let surface = InMemorySurface::loaded(Theme::Light.style_url());
        let engine = MapSyncEngine::attach(&surface, Theme::Light);
        (surface, engine)
    }

    fn snapshot(surface: &InMemorySurface) -> (Vec<String>, Vec<String>) {
        (surface.source_ids(), surface.layer_ids())
    }

    fn segments(n: usize) -> Vec<CongestionSegment> {
        (0..n)
            .map(|i| {
                let a = Coordinates::new(-23.5 + i as f64 * 0.1, -46.6);
                let b = Coordinates::new(-23.45 + i as f64 * 0.1, -46.5);
                CongestionSegment::new(&[a, b], CongestionLevel::Heavy)
            })
            .collect()
    }

    fn congestion_layers(surface: &InMemorySurface) -> Vec<String> {
        surface
            .layer_ids()
            .into_iter()
            .filter(|id| id.starts_with(CONGESTION_PREFIX))
            .collect()
    }

    #[test]
    fn sao_paulo_to_rio_draws_underlay_and_segments() {
        let (mut surface, mut engine) = ready();
        let result = completed_route("sp-rio", 5, 2);

        engine
            .dispatch(&mut surface, MapEvent::ResultChanged(Some(result)))
            .unwrap();

        assert_eq!(
            surface.layer_ids(),
            vec![
                "route-casing",
                "route-line",
                "congestion-0-outline",
                "congestion-0-line",
                "congestion-1-outline",
                "congestion-1-line",
            ]
        );
        assert_eq!(
            surface.source_ids(),
            vec!["congestion-0", "congestion-1", "route"]
        );
        assert_eq!(engine.full_rebuilds(), 1);
    }

    #[test]
    fn rebuilding_the_same_state_is_idempotent() {
        let (mut surface, mut engine) = ready();
        let mut result = completed_route("x", 5, 3);
        result.toll_points = Some(vec![TollPoint {
            lat: Some(-23.3),
            lon: Some(-46.2),
            name: "Pedágio".into(),
            operator: "CCR".into(),
        }]);

        engine.on_result_changed(&mut surface, Some(&result)).unwrap();
        let once = snapshot(&surface);

        engine.on_result_changed(&mut surface, Some(&result)).unwrap();
        assert_eq!(snapshot(&surface), once);
        assert_eq!(
            surface.source("tolls").unwrap().features.len(),
            1,
            "no duplicated features"
        );
    }

    #[test]
    fn congestion_shrinks_to_exactly_m_segments() {
        let (mut surface, mut engine) = ready();

        engine
            .on_channel_changed(&mut surface, ChannelUpdate::Congestion(segments(5)))
            .unwrap();
        assert_eq!(congestion_layers(&surface).len(), 10);

        engine
            .on_channel_changed(&mut surface, ChannelUpdate::Congestion(segments(2)))
            .unwrap();
        assert_eq!(
            congestion_layers(&surface),
            vec![
                "congestion-0-outline",
                "congestion-0-line",
                "congestion-1-outline",
                "congestion-1-line",
            ]
        );
        assert_eq!(
            surface
                .source_ids()
                .iter()
                .filter(|id| id.starts_with(CONGESTION_PREFIX))
                .count(),
            2
        );
        assert_eq!(engine.arena().count, 2);
        assert_eq!(engine.arena().generation, 2);
    }

    #[test]
    fn stray_congestion_layers_are_swept() {
        let (mut surface, mut engine) = ready();
        let empty = FeatureCollection {
            bbox: None,
            features: vec![],
            foreign_members: None,
        };
        surface.add_source("congestion-9", empty).unwrap();
        surface
            .add_layer(LayerSpec {
                id: "congestion-9-line".into(),
                source: "congestion-9".into(),
                kind: LayerKind::Line,
                paint: json!({}),
                layout: json!({}),
            })
            .unwrap();

        engine
            .on_channel_changed(&mut surface, ChannelUpdate::Congestion(segments(1)))
            .unwrap();

        assert_eq!(
            congestion_layers(&surface),
            vec!["congestion-0-outline", "congestion-0-line"]
        );
        assert!(!surface.has_source("congestion-9"));
    }

    #[test]
    fn empty_channel_removes_its_drawables() {
        let (mut surface, mut engine) = ready();
        let result = completed_route("x", 4, 1);
        engine.on_result_changed(&mut surface, Some(&result)).unwrap();

        engine
            .on_channel_changed(&mut surface, ChannelUpdate::Route(None))
            .unwrap();
        engine
            .on_channel_changed(&mut surface, ChannelUpdate::Congestion(vec![]))
            .unwrap();

        assert!(surface.layer_ids().is_empty());
        assert!(surface.source_ids().is_empty());
    }

    #[test]
    fn malformed_features_are_skipped() {
        let (mut surface, mut engine) = ready();
        let mut broken = segments(3);
        broken[1].coordinates.truncate(1);

        let signals = vec![
            TrafficLightPoint::new(Coordinates::new(-23.5, -46.6), 0, 0, 0),
            TrafficLightPoint::new(Coordinates::new(-23.4, -46.6), 25, 4, 20),
        ];

        let state = RenderState {
            congestion: broken,
            signals,
            ..RenderState::default()
        };
        let report = rebuild(&mut surface, &mut engine.arena, &state, Theme::Light).unwrap();

        assert_eq!(report.skipped, 2);
        assert_eq!(congestion_layers(&surface).len(), 4);
        assert_eq!(surface.source("signals").unwrap().features.len(), 1);
    }

    #[test]
    fn draw_order_survives_single_channel_updates() {
        let (mut surface, mut engine) = ready();
        let result = completed_route("x", 5, 2);
        engine.on_result_changed(&mut surface, Some(&result)).unwrap();

        // the route comes back last but must stay under the segments
        let route = result.route_geometry.clone();
        engine
            .on_channel_changed(&mut surface, ChannelUpdate::Route(route))
            .unwrap();

        assert_eq!(surface.layer_ids()[..2], ["route-casing", "route-line"]);
    }

    #[test]
    fn style_swap_coalesces_into_one_rebuild() {
        let (mut surface, mut engine) = ready();
        let result = completed_route("x", 5, 2);
        engine.on_result_changed(&mut surface, Some(&result)).unwrap();
        let before = snapshot(&surface);

        engine.dispatch(&mut surface, MapEvent::ThemeChanged(Theme::Dark)).unwrap();
        assert_eq!(surface.style_url(), Some(Theme::Dark.style_url()));
        assert_eq!(engine.lifecycle(), Lifecycle::Loading);

        engine.on_result_changed(&mut surface, Some(&result)).unwrap();
        engine
            .on_channel_changed(&mut surface, ChannelUpdate::Congestion(segments(2)))
            .unwrap();
        engine.on_result_changed(&mut surface, Some(&result)).unwrap();
        assert!(surface.layer_ids().is_empty());
        assert_eq!(engine.full_rebuilds(), 1);

        surface.finish_style_load();
        engine.dispatch(&mut surface, MapEvent::StyleReady).unwrap();
        engine.dispatch(&mut surface, MapEvent::StyleReady).unwrap();

        assert_eq!(engine.full_rebuilds(), 2);
        assert_eq!(snapshot(&surface), before);

        let line = surface.layer("congestion-0-line").unwrap();
        assert_eq!(line.paint["line-color"], json!(["get", "color"]));
        let props = surface.source("congestion-0").unwrap().features[0]
            .properties
            .clone()
            .unwrap();
        assert_eq!(props["color"], Theme::Dark.congestion_color(CongestionLevel::Moderate));
    }

    #[test]
    fn host_style_swap_without_changing_event_is_rebuilt() {
        let (mut surface, mut engine) = ready();
        let result = completed_route("x", 5, 2);
        engine.on_result_changed(&mut surface, Some(&result)).unwrap();
        let before = snapshot(&surface);

        surface.set_style(Theme::Light.style_url());
        engine.on_result_changed(&mut surface, Some(&result)).unwrap();
        assert_eq!(engine.lifecycle(), Lifecycle::Loading);

        surface.finish_style_load();
        engine.dispatch(&mut surface, MapEvent::StyleReady).unwrap();
        assert_eq!(snapshot(&surface), before);
        assert_eq!(engine.full_rebuilds(), 2);

        engine.dispatch(&mut surface, MapEvent::StyleReady).unwrap();
        assert_eq!(engine.full_rebuilds(), 2);
    }

    #[test]
    fn silent_swap_is_restored_on_ready() {
        let (mut surface, mut engine) = ready();
        let result = completed_route("x", 5, 2);
        engine.on_result_changed(&mut surface, Some(&result)).unwrap();
        let before = snapshot(&surface);

        surface.set_style(Theme::Light.style_url());
        surface.finish_style_load();
        engine.dispatch(&mut surface, MapEvent::StyleReady).unwrap();

        assert_eq!(snapshot(&surface), before);
        assert_eq!(engine.full_rebuilds(), 2);
    }

    #[test]
    fn fit_uses_chrome_at_fit_time() {
        let (mut surface, mut engine) = ready();
        assert!(!engine.fit_route(&mut surface, &FixedChrome::default()));

        let result = completed_route("x", 5, 0);
        engine.on_result_changed(&mut surface, Some(&result)).unwrap();

        let chrome = FixedChrome {
            side_panel_width: 320.0,
            top_bar_height: 56.0,
            bottom_timeline_height: 0.0,
        };
        assert!(engine.fit_route(&mut surface, &chrome));

        let (bounds, padding) = surface.fits()[0];
        assert_eq!(bounds.min().x, -46.63);
        assert!((bounds.max().y + 22.90).abs() < 1e-9);
        assert_eq!(padding.left, BASE_PADDING_PX + 320.0);
        assert_eq!(padding.bottom, BASE_PADDING_PX);
    }

    #[test]
    fn new_result_closes_popups() {
        let (mut surface, mut engine) = ready();
        let at = Coordinates::new(-23.0, -46.0);

        engine.on_click(&mut surface, "tolls-points", at, JsonObject::new());
        assert!(surface.popup(PopupKind::Persistent).is_some());

        engine.on_hover(&mut surface, "accidents-points", at, JsonObject::new());
        assert!(surface.popup(PopupKind::Transient).is_none());

        engine.on_result_changed(&mut surface, None).unwrap();
        assert!(surface.popup(PopupKind::Persistent).is_none());
        assert!(engine.popups().persistent().is_none());
    }
}
