//! Per-country overlay dataset, loaded from a GeoJSON FeatureCollection

use crate::{AttributeValue, GeoPoint, PointFeature};
use geojson::{feature::Id, FeatureCollection};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Point features for one overlay of one country. Replaced wholesale on
/// every country selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub country_code: String,
    pub features: Vec<PointFeature>,
}

impl Dataset {
    pub fn new(country_code: &str, features: Vec<PointFeature>) -> Self {
        Self {
            country_code: country_code.to_uppercase(),
            features,
        }
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Keeps Point features with valid WGS84 coordinates; scalar properties
    /// become attributes, everything else is dropped.
    pub fn from_feature_collection(country_code: &str, collection: &FeatureCollection) -> Self {
        let mut features = Vec::with_capacity(collection.features.len());
        let mut skipped = 0usize;

        for feature in &collection.features {
            let position = match feature.geometry.as_ref().map(|g| &g.value) {
                Some(geojson::Value::Point(coords)) => match coords.as_slice() {
                    [lon, lat, ..] => GeoPoint::new(*lat, *lon).ok(),
                    _ => None,
                },
                _ => None,
            };
            let Some(position) = position else {
                skipped += 1;
                continue;
            };

            let id = feature.id.as_ref().map(|id| match id {
                Id::String(s) => s.clone(),
                Id::Number(n) => n.to_string(),
            });

            let mut point = PointFeature::new(position);
            point.id = id;
            if let Some(properties) = &feature.properties {
                for (key, value) in properties {
                    let attribute = match value {
                        serde_json::Value::Bool(b) => AttributeValue::Bool(*b),
                        serde_json::Value::Number(n) => match n.as_f64() {
                            Some(f) => AttributeValue::Number(f),
                            None => continue,
                        },
                        serde_json::Value::String(s) => AttributeValue::Text(s.clone()),
                        _ => continue,
                    };
                    point.attributes.insert(key.clone(), attribute);
                }
            }
            features.push(point);
        }

        if skipped > 0 {
            warn!(
                country = country_code,
                skipped, "dropped features without a valid point geometry"
            );
        }

        Self::new(country_code, features)
    }
}
