//! Route overlays on a MapLibre-like surface.

mod channel;
mod engine;
mod features;
mod memory;
mod popup;
mod render_state;
mod surface;
mod theme;
mod viewport;

pub use channel::{
    build as build_channel, congestion_layers, congestion_source, draw_rank, ChannelBuild,
    ChannelKind, LayerChannel, SegmentArena, CONGESTION_PREFIX,
};
pub use engine::{rebuild, Lifecycle, MapEvent, MapSyncEngine, RebuildReport};
pub use features::Built;
pub use memory::InMemorySurface;
pub use popup::{Popup, PopupCommand, PopupController, PopupKind};
pub use render_state::{ChannelUpdate, RenderState};
pub use surface::{LayerKind, LayerSpec, MapSurface};
pub use theme::{Palette, Theme};
pub use viewport::{fit_padding, route_bounds, ChromeLayout, FixedChrome, Padding, BASE_PADDING_PX};
