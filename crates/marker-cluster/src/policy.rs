//! Overlay-specific clustering and display policy

use serde::{Deserialize, Serialize};
use std::fmt;

/// Zoom at or above which clustering stops hiding markers.
pub const ZOOM_THRESHOLD: f64 = 8.0;
pub const AIRPORT_RADIUS_PX: f64 = 50.0;
pub const CITY_RADIUS_PX: f64 = 30.0;
/// Airport clusters larger than this collapse into one aggregate marker.
pub const AIRPORT_AGGREGATE_CAP: usize = 3;
/// Every city is drawn individually from this zoom on.
pub const CITY_FULL_REVEAL_ZOOM: f64 = 12.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverlayKind {
    Airports,
    Cities,
}

impl OverlayKind {
    pub const ALL: [OverlayKind; 2] = [OverlayKind::Airports, OverlayKind::Cities];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Airports => "airports",
            Self::Cities => "cities",
        }
    }

    /// CSS prefix for aggregate markers.
    pub fn cluster_class(&self) -> &'static str {
        match self {
            Self::Airports => "airport-cluster",
            Self::Cities => "city-cluster",
        }
    }
}

impl fmt::Display for OverlayKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Processing order fed to the greedy clusterer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FeatureOrder {
    /// Dataset order as loaded.
    Insertion,
    /// Population descending; ties keep dataset order (stable sort).
    PopulationDescending,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DisplayRule {
    /// Below the zoom threshold, clusters larger than `cap` become one
    /// aggregate; smaller ones are drawn with the small icon.
    CountCap { cap: usize },
    /// Reveal the most important members progressively with zoom and
    /// aggregate the rest; from `full_reveal_zoom` on, draw everything.
    Reveal { full_reveal_zoom: f64 },
}

/// What to draw for one cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ClusterDisplay {
    Individual { small: bool },
    Aggregate,
    Partial { reveal: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OverlayPolicy {
    pub kind: OverlayKind,
    pub radius_px: f64,
    pub zoom_threshold: f64,
    pub order: FeatureOrder,
    pub rule: DisplayRule,
}

impl OverlayPolicy {
    pub fn airports() -> Self {
        Self {
            kind: OverlayKind::Airports,
            radius_px: AIRPORT_RADIUS_PX,
            zoom_threshold: ZOOM_THRESHOLD,
            order: FeatureOrder::Insertion,
            rule: DisplayRule::CountCap {
                cap: AIRPORT_AGGREGATE_CAP,
            },
        }
    }

    pub fn cities() -> Self {
        Self {
            kind: OverlayKind::Cities,
            radius_px: CITY_RADIUS_PX,
            zoom_threshold: ZOOM_THRESHOLD,
            order: FeatureOrder::PopulationDescending,
            rule: DisplayRule::Reveal {
                full_reveal_zoom: CITY_FULL_REVEAL_ZOOM,
            },
        }
    }

    pub fn for_kind(kind: OverlayKind) -> Self {
        match kind {
            OverlayKind::Airports => Self::airports(),
            OverlayKind::Cities => Self::cities(),
        }
    }

    pub fn with_radius(mut self, radius_px: f64) -> Self {
        self.radius_px = radius_px;
        self
    }

    pub fn decide(&self, cluster_size: usize, zoom: f64) -> ClusterDisplay {
        if cluster_size <= 1 {
            return ClusterDisplay::Individual { small: false };
        }

        match self.rule {
            DisplayRule::CountCap { cap } => {
                if zoom >= self.zoom_threshold {
                    ClusterDisplay::Individual { small: false }
                } else if cluster_size > cap {
                    ClusterDisplay::Aggregate
                } else {
                    ClusterDisplay::Individual { small: true }
                }
            }
            DisplayRule::Reveal { full_reveal_zoom } => {
                let reveal = reveal_count(zoom, self.zoom_threshold, cluster_size);
                if reveal >= cluster_size || zoom >= full_reveal_zoom {
                    ClusterDisplay::Individual { small: false }
                } else {
                    ClusterDisplay::Partial { reveal }
                }
            }
        }
    }
}

/// `clamp(1, floor(zoom - threshold + 1) * 2, cluster_size)`.
///
/// Non-decreasing in `zoom` and never above `cluster_size`.
pub fn reveal_count(zoom: f64, zoom_threshold: f64, cluster_size: usize) -> usize {
    if cluster_size == 0 {
        return 0;
    }
    let raw = (zoom - zoom_threshold + 1.0).floor() * 2.0;
    if raw < 1.0 {
        1
    } else {
        (raw as usize).min(cluster_size)
    }
}
