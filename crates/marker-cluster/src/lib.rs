//! Marker Clustering Library
//!
//! Point overlays (airports, cities) for a selected country, clustered in
//! screen space so the map stays legible at every zoom level.
//!
//! The pipeline is stateless: every call to [`render::plan`] filters the
//! dataset to the viewport, projects, clusters and decides what to draw from
//! scratch. Nothing survives between renders.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

pub mod cluster;
pub mod dataset;
pub mod policy;
pub mod render;
pub mod viewport;

pub use cluster::{cluster_features, Cluster};
pub use dataset::Dataset;
pub use policy::{reveal_count, ClusterDisplay, DisplayRule, FeatureOrder, OverlayKind, OverlayPolicy};
pub use render::{plan, IconSpec, Marker, RenderPlan};
pub use viewport::{GeoBounds, ScreenPoint, ViewportState};

#[derive(Error, Debug)]
pub enum ClusterError {
    #[error("Invalid coordinates: {0}")]
    InvalidCoordinates(String),
    #[error("Invalid viewport: {0}")]
    InvalidViewport(String),
}

pub type Result<T> = std::result::Result<T, ClusterError>;

/// WGS84 position in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Result<Self> {
        let point = Self {
            latitude,
            longitude,
        };
        if point.is_valid() {
            Ok(point)
        } else {
            Err(ClusterError::InvalidCoordinates(format!(
                "lat={}, lon={}",
                latitude, longitude
            )))
        }
    }

    pub fn is_valid(&self) -> bool {
        self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude)
    }
}

/// Scalar attribute carried by a point feature.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum AttributeValue {
    Bool(bool),
    Number(f64),
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PointFeature {
    pub id: Option<String>,
    pub position: GeoPoint,
    pub attributes: BTreeMap<String, AttributeValue>,
}

impl PointFeature {
    pub fn new(position: GeoPoint) -> Self {
        Self {
            id: None,
            position,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: AttributeValue) -> Self {
        self.attributes.insert(key.to_string(), value);
        self
    }

    pub fn text(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key) {
            Some(AttributeValue::Text(s)) if !s.is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    pub fn name(&self) -> &str {
        self.text("name").unwrap_or("Unknown")
    }

    /// Population attribute, 0 when absent or not numeric.
    pub fn population(&self) -> u64 {
        match self.attributes.get("population") {
            Some(AttributeValue::Number(n)) if n.is_finite() && *n > 0.0 => *n as u64,
            Some(AttributeValue::Text(s)) => s.trim().parse::<f64>().map(|n| n.max(0.0) as u64).unwrap_or(0),
            _ => 0,
        }
    }

    pub fn is_capital(&self) -> bool {
        matches!(self.attributes.get("capital"), Some(AttributeValue::Bool(true)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geo_point_range() {
        assert!(GeoPoint::new(51.5, -0.12).is_ok());
        assert!(GeoPoint::new(90.0, 180.0).is_ok());
        assert!(GeoPoint::new(90.5, 0.0).is_err());
        assert!(GeoPoint::new(0.0, -180.1).is_err());
        assert!(GeoPoint::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn test_feature_attributes() {
        let feature = PointFeature::new(GeoPoint::new(48.85, 2.35).unwrap())
            .with_attribute("name", AttributeValue::Text("Paris".into()))
            .with_attribute("population", AttributeValue::Number(11_000_000.0))
            .with_attribute("capital", AttributeValue::Bool(true));

        assert_eq!(feature.name(), "Paris");
        assert_eq!(feature.population(), 11_000_000);
        assert!(feature.is_capital());
        assert_eq!(feature.text("iata"), None);
    }

    #[test]
    fn test_population_defaults_to_zero() {
        let feature = PointFeature::new(GeoPoint::new(0.0, 0.0).unwrap())
            .with_attribute("population", AttributeValue::Text("n/a".into()));
        assert_eq!(feature.population(), 0);
    }
}
