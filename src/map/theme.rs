use serde::{Deserialize, Serialize};

use crate::entities::CongestionLevel;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Theme {
    #[default]
    Light,
    Dark,
}

/// Colors used by the overlay layers for one theme.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Palette {
    pub route: &'static str,
    pub casing: &'static str,
    pub label: &'static str,
    pub label_halo: &'static str,
    pub toll: &'static str,
    pub accident: &'static str,
    pub signal: &'static str,
    pub sample_dry: &'static str,
    pub sample_wet: &'static str,
}

impl Theme {
    pub fn style_url(&self) -> &'static str {
        match self {
            Self::Light => "https://basemaps.cartocdn.com/gl/positron-gl-style/style.json",
            Self::Dark => "https://basemaps.cartocdn.com/gl/dark-matter-gl-style/style.json",
        }
    }

    pub fn palette(&self) -> Palette {
        match self {
            Self::Light => Palette {
                route: "#2563eb",
                casing: "#1e3a8a",
                label: "#111827",
                label_halo: "#ffffff",
                toll: "#7c3aed",
                accident: "#dc2626",
                signal: "#f59e0b",
                sample_dry: "#38bdf8",
                sample_wet: "#1d4ed8",
            },
            Self::Dark => Palette {
                route: "#60a5fa",
                casing: "#0f172a",
                label: "#f3f4f6",
                label_halo: "#111827",
                toll: "#a78bfa",
                accident: "#f87171",
                signal: "#fbbf24",
                sample_dry: "#7dd3fc",
                sample_wet: "#3b82f6",
            },
        }
    }

    pub fn congestion_color(&self, level: CongestionLevel) -> &'static str {
        match (self, level) {
            (Self::Light, CongestionLevel::Free) => "#16a34a",
            (Self::Light, CongestionLevel::Light) => "#84cc16",
            (Self::Light, CongestionLevel::Moderate) => "#eab308",
            (Self::Light, CongestionLevel::Heavy) => "#f97316",
            (Self::Light, CongestionLevel::Severe) => "#dc2626",
            (Self::Dark, CongestionLevel::Free) => "#22c55e",
            (Self::Dark, CongestionLevel::Light) => "#a3e635",
            (Self::Dark, CongestionLevel::Moderate) => "#facc15",
            (Self::Dark, CongestionLevel::Heavy) => "#fb923c",
            (Self::Dark, CongestionLevel::Severe) => "#ef4444",
        }
    }
}
