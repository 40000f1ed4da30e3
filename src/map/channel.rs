use geojson::FeatureCollection;
use serde_json::json;

use super::features::{self, Built};
use super::render_state::RenderState;
use super::surface::{LayerKind, LayerSpec};
use super::theme::{Palette, Theme};

pub const CONGESTION_PREFIX: &str = "congestion-";

/// A named overlay: one source (or, for congestion, one source per segment)
/// and the layers drawn from it. Each channel owns a fixed set of ids.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ChannelKind {
    Route,
    Congestion,
    Tolls,
    Accidents,
    Signals,
    Samples,
}

impl ChannelKind {
    pub const ALL: [ChannelKind; 6] = [
        Self::Route,
        Self::Congestion,
        Self::Tolls,
        Self::Accidents,
        Self::Signals,
        Self::Samples,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::Route => "route",
            Self::Congestion => "congestion",
            Self::Tolls => "tolls",
            Self::Accidents => "accidents",
            Self::Signals => "signals",
            Self::Samples => "samples",
        }
    }

    /// Layer ids this channel reserves, bottom to top. Empty for congestion,
    /// whose ids depend on the segment index.
    pub fn reserved_layers(&self) -> Vec<String> {
        match self {
            Self::Route => vec!["route-casing".into(), "route-line".into()],
            Self::Congestion => vec![],
            Self::Signals => vec!["signals-points".into()],
            other => vec![
                format!("{}-points", other.name()),
                format!("{}-labels", other.name()),
            ],
        }
    }

    pub fn reserved_source(&self) -> Option<String> {
        match self {
            Self::Congestion => None,
            other => Some(other.name().into()),
        }
    }

    fn point_rank(&self) -> usize {
        match self {
            Self::Tolls => 0,
            Self::Accidents => 1,
            Self::Signals => 2,
            _ => 3,
        }
    }
}

pub fn congestion_source(index: usize) -> String {
    format!("{}{}", CONGESTION_PREFIX, index)
}

pub fn congestion_layers(index: usize) -> [String; 2] {
    [
        format!("{}{}-outline", CONGESTION_PREFIX, index),
        format!("{}{}-line", CONGESTION_PREFIX, index),
    ]
}

/// Position of an overlay layer in the draw order: route underlay, then
/// congestion segments, then points, then labels. `None` for ids the engine
/// does not own, such as basemap layers.
pub fn draw_rank(layer_id: &str) -> Option<(u8, usize, u8)> {
    match layer_id {
        "route-casing" => return Some((0, 0, 0)),
        "route-line" => return Some((0, 0, 1)),
        _ => {}
    }

    if let Some(rest) = layer_id.strip_prefix(CONGESTION_PREFIX) {
        let (index, part) = rest.split_once('-')?;
        let index = index.parse().ok()?;
        return match part {
            "outline" => Some((1, index, 0)),
            "line" => Some((1, index, 1)),
            _ => None,
        };
    }

    let (name, part) = layer_id.rsplit_once('-')?;
    let kind = ChannelKind::ALL
        .into_iter()
        .find(|k| k.name() == name && k.reserved_source().is_some() && *k != ChannelKind::Route)?;

    match part {
        "points" => Some((2, kind.point_rank(), 0)),
        "labels" => Some((3, kind.point_rank(), 0)),
        _ => None,
    }
}

/// Congestion segments live in an index arena. Every rebuild starts a new
/// generation and the previous generation's whole index range is torn down.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SegmentArena {
    pub generation: u64,
    pub count: usize,
}

impl SegmentArena {
    /// Starts a new generation holding `count` segments.
    pub fn advance(&mut self, count: usize) {
        self.generation += 1;
        self.count = count;
    }

    pub fn source_ids(&self) -> Vec<String> {
        (0..self.count).map(congestion_source).collect()
    }

    pub fn layer_ids(&self) -> Vec<String> {
        (0..self.count).flat_map(congestion_layers).collect()
    }
}

/// One source and its layers, ready to be added to the surface.
#[derive(Clone, Debug, PartialEq)]
pub struct LayerChannel {
    pub kind: ChannelKind,
    pub source: String,
    pub data: FeatureCollection,
    pub layers: Vec<LayerSpec>,
}

/// What a channel should look like for the current state.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ChannelBuild {
    pub channels: Vec<LayerChannel>,
    pub skipped: usize,
}

/// Builds the drawables of `kind`. Channels whose features are all missing
/// or malformed produce nothing, so the surface simply loses them.
pub fn build(
    kind: ChannelKind,
    state: &RenderState,
    theme: Theme,
    generation: u64,
) -> ChannelBuild {
    let palette = theme.palette();

    let fixed = |built: Built, layers: Vec<LayerSpec>| {
        let skipped = built.skipped;
        let channels = match built.is_empty() {
            true => vec![],
            false => vec![LayerChannel {
                kind,
                source: kind.name().into(),
                data: built.collection(),
                layers,
            }],
        };
        ChannelBuild { channels, skipped }
    };

    match kind {
        ChannelKind::Route => fixed(features::route(state.route.as_ref()), route_layers(&palette)),
        ChannelKind::Congestion => {
            let mut out = ChannelBuild::default();
            // indices are dense over the valid segments
            let mut index = 0;
            for built in features::congestion(&state.congestion, theme, generation) {
                out.skipped += built.skipped;
                if built.is_empty() {
                    continue;
                }

                let source = congestion_source(index);
                let layers = segment_layers(index, &source, &palette);
                out.channels.push(LayerChannel {
                    kind,
                    source,
                    data: built.collection(),
                    layers,
                });
                index += 1;
            }
            out
        }
        ChannelKind::Tolls => fixed(
            features::tolls(&state.tolls),
            point_layers(kind, palette.toll, &palette, Some("label")),
        ),
        ChannelKind::Accidents => fixed(
            features::accidents(&state.accidents),
            point_layers(kind, palette.accident, &palette, Some("label")),
        ),
        ChannelKind::Signals => fixed(
            features::signals(&state.signals),
            point_layers(kind, palette.signal, &palette, None),
        ),
        ChannelKind::Samples => fixed(
            features::samples(&state.samples),
            sample_layers(&palette),
        ),
    }
}

fn route_layers(palette: &Palette) -> Vec<LayerSpec> {
    vec![
        LayerSpec {
            id: "route-casing".into(),
            source: "route".into(),
            kind: LayerKind::Line,
            paint: json!({"line-color": palette.casing, "line-width": 9, "line-opacity": 0.6}),
            layout: json!({"line-cap": "round", "line-join": "round"}),
        },
        LayerSpec {
            id: "route-line".into(),
            source: "route".into(),
            kind: LayerKind::Line,
            paint: json!({"line-color": palette.route, "line-width": 5}),
            layout: json!({"line-cap": "round", "line-join": "round"}),
        },
    ]
}

fn segment_layers(index: usize, source: &str, palette: &Palette) -> Vec<LayerSpec> {
    let [outline, line] = congestion_layers(index);
    vec![
        LayerSpec {
            id: outline,
            source: source.into(),
            kind: LayerKind::Line,
            paint: json!({"line-color": palette.casing, "line-width": 8, "line-opacity": 0.8}),
            layout: json!({"line-cap": "round", "line-join": "round"}),
        },
        LayerSpec {
            id: line,
            source: source.into(),
            kind: LayerKind::Line,
            paint: json!({"line-color": ["get", "color"], "line-width": 5}),
            layout: json!({"line-cap": "round", "line-join": "round"}),
        },
    ]
}

fn label_layer(kind: ChannelKind, field: &str, palette: &Palette) -> LayerSpec {
    LayerSpec {
        id: format!("{}-labels", kind.name()),
        source: kind.name().into(),
        kind: LayerKind::Symbol,
        paint: json!({
            "text-color": palette.label,
            "text-halo-color": palette.label_halo,
            "text-halo-width": 1.5,
        }),
        layout: json!({
            "text-field": ["get", field],
            "text-size": 12,
            "text-offset": [0, 1.4],
            "text-anchor": "top",
        }),
    }
}

fn point_layers(
    kind: ChannelKind,
    color: &str,
    palette: &Palette,
    label: Option<&str>,
) -> Vec<LayerSpec> {
    let mut layers = vec![LayerSpec {
        id: format!("{}-points", kind.name()),
        source: kind.name().into(),
        kind: LayerKind::Circle,
        paint: json!({
            "circle-color": color,
            "circle-radius": 7,
            "circle-stroke-color": palette.label_halo,
            "circle-stroke-width": 2,
        }),
        layout: json!({}),
    }];

    if let Some(field) = label {
        layers.push(label_layer(kind, field, palette));
    }

    layers
}

fn sample_layers(palette: &Palette) -> Vec<LayerSpec> {
    let kind = ChannelKind::Samples;
    vec![
        LayerSpec {
            id: format!("{}-points", kind.name()),
            source: kind.name().into(),
            kind: LayerKind::Circle,
            paint: json!({
                "circle-color": ["case", ["get", "wet"], palette.sample_wet, palette.sample_dry],
                "circle-radius": 6,
                "circle-stroke-color": palette.label_halo,
                "circle-stroke-width": 1,
            }),
            layout: json!({}),
        },
        label_layer(kind, "label", palette),
    ]
}
