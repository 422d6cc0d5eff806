//! Render plan: what the overlay layer should draw for the current viewport

use crate::cluster::{cluster_features, Cluster};
use crate::dataset::Dataset;
use crate::policy::{ClusterDisplay, FeatureOrder, OverlayKind, OverlayPolicy};
use crate::viewport::ViewportState;
use crate::{GeoPoint, PointFeature};
use serde::Serialize;
use tracing::debug;

/// Leaflet-style div icon description.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IconSpec {
    pub class_name: String,
    pub html: String,
    pub size: (u32, u32),
    pub anchor: (i32, i32),
    pub popup_anchor: (i32, i32),
}

impl IconSpec {
    pub fn airport(small: bool) -> Self {
        let (size, anchor) = if small {
            ((20, 20), (10, 20))
        } else {
            ((30, 30), (15, 30))
        };
        Self {
            class_name: format!(
                "custom-div-icon airport-icon{}",
                if small { " small" } else { "" }
            ),
            html: r#"<div class="airport-icon-inner"><i class="fas fa-plane"></i></div>"#.to_string(),
            size,
            anchor,
            popup_anchor: (0, -anchor.1),
        }
    }

    pub fn city(capital: bool) -> Self {
        Self {
            class_name: format!(
                "custom-div-icon city-icon{}",
                if capital { " capital" } else { "" }
            ),
            html: r#"<i class="fas fa-map-marker-alt"></i><i class="fas fa-city city-inner-icon"></i>"#
                .to_string(),
            size: (30, 40),
            anchor: (15, 40),
            popup_anchor: (0, -40),
        }
    }

    pub fn aggregate(kind: OverlayKind, count: usize) -> Self {
        Self {
            class_name: format!("custom-cluster-icon {}", kind.cluster_class()),
            html: format!(r#"<div class="cluster-icon">{}</div>"#, count),
            size: (40, 40),
            anchor: (20, 40),
            popup_anchor: (0, -40),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Marker<'a> {
    Point {
        feature: &'a PointFeature,
        icon: IconSpec,
        popup: String,
    },
    Aggregate {
        center: GeoPoint,
        count: usize,
        /// Features folded into this marker (not drawn individually).
        members: Vec<&'a PointFeature>,
        icon: IconSpec,
    },
}

impl<'a> Marker<'a> {
    pub fn label(&self) -> Option<String> {
        match self {
            Marker::Aggregate { count, .. } => Some(count.to_string()),
            Marker::Point { .. } => None,
        }
    }

    /// Features this marker stands for.
    pub fn features(&self) -> Vec<&'a PointFeature> {
        match self {
            Marker::Point { feature, .. } => vec![*feature],
            Marker::Aggregate { members, .. } => members.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderPlan<'a> {
    pub overlay: OverlayKind,
    pub zoom: f64,
    pub markers: Vec<Marker<'a>>,
}

impl<'a> RenderPlan<'a> {
    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }

    pub fn individual_count(&self) -> usize {
        self.markers
            .iter()
            .filter(|m| matches!(m, Marker::Point { .. }))
            .count()
    }

    pub fn aggregates(&self) -> impl Iterator<Item = &Marker<'a>> {
        self.markers
            .iter()
            .filter(|m| matches!(m, Marker::Aggregate { .. }))
    }
}

/// Filter to the viewport, order, cluster and decide, from scratch.
pub fn plan<'a>(dataset: &'a Dataset, viewport: &ViewportState, policy: &OverlayPolicy) -> RenderPlan<'a> {
    let bounds = viewport.bounds();
    let mut visible: Vec<&'a PointFeature> = dataset
        .features
        .iter()
        .filter(|f| bounds.contains(&f.position))
        .collect();

    if policy.order == FeatureOrder::PopulationDescending {
        visible.sort_by(|a, b| b.population().cmp(&a.population()));
    }

    let clusters = cluster_features(&visible, viewport, policy.radius_px);

    let mut markers = Vec::with_capacity(visible.len());
    for cluster in &clusters {
        emit_cluster(cluster, viewport.zoom, policy, &mut markers);
    }

    debug!(
        overlay = %policy.kind,
        zoom = viewport.zoom,
        total = dataset.len(),
        visible = visible.len(),
        clusters = clusters.len(),
        markers = markers.len(),
        "render plan built"
    );

    RenderPlan {
        overlay: policy.kind,
        zoom: viewport.zoom,
        markers,
    }
}

fn emit_cluster<'a>(
    cluster: &Cluster<'a>,
    zoom: f64,
    policy: &OverlayPolicy,
    out: &mut Vec<Marker<'a>>,
) {
    match policy.decide(cluster.len(), zoom) {
        ClusterDisplay::Individual { small } => {
            for &feature in &cluster.members {
                out.push(point_marker(policy.kind, feature, small));
            }
        }
        ClusterDisplay::Aggregate => {
            out.push(aggregate_marker(policy.kind, cluster.center, cluster.members.clone()));
        }
        ClusterDisplay::Partial { reveal } => {
            let (shown, hidden) = cluster.members.split_at(reveal);
            for &feature in shown {
                out.push(point_marker(policy.kind, feature, false));
            }
            if !hidden.is_empty() {
                out.push(aggregate_marker(policy.kind, cluster.center, hidden.to_vec()));
            }
        }
    }
}

fn point_marker(kind: OverlayKind, feature: &PointFeature, small: bool) -> Marker<'_> {
    let (icon, popup) = match kind {
        OverlayKind::Airports => (IconSpec::airport(small), airport_popup(feature)),
        OverlayKind::Cities => (IconSpec::city(feature.is_capital()), city_popup(feature)),
    };
    Marker::Point {
        feature,
        icon,
        popup,
    }
}

fn aggregate_marker<'a>(kind: OverlayKind, center: GeoPoint, members: Vec<&'a PointFeature>) -> Marker<'a> {
    let count = members.len();
    Marker::Aggregate {
        center,
        count,
        members,
        icon: IconSpec::aggregate(kind, count),
    }
}

pub fn airport_popup(feature: &PointFeature) -> String {
    format!(
        "<b>{}</b><br>City: {}<br>IATA: {}<br>ICAO: {}<br>Type: {}",
        escape_html(feature.name()),
        escape_html(feature.text("city").unwrap_or("")),
        escape_html(feature.text("iata").unwrap_or("N/A")),
        escape_html(feature.text("icao").unwrap_or("N/A")),
        escape_html(feature.text("type").unwrap_or("")),
    )
}

pub fn city_popup(feature: &PointFeature) -> String {
    let mut popup = format!(
        "<b>{}</b><br>Population: {}",
        escape_html(feature.name()),
        format_thousands(feature.population())
    );
    if feature.is_capital() {
        popup.push_str("<br>Capital City");
    }
    popup
}

pub fn format_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(ch);
    }
    out
}

fn escape_html(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            _ => out.push(ch),
        }
    }
    out
}
