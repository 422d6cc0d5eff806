//! Country border polygons

use crate::{ensure_exists, Result};
use geojson::{Feature, FeatureCollection, GeoJson};
use std::path::Path;
use tracing::info;

const CODE_KEYS: [&str; 2] = ["iso_a2", "ISO_A2"];
const NAME_KEYS: [&str; 3] = ["name", "ADMIN", "NAME"];

pub struct CountryBorders {
    collection: FeatureCollection,
}

impl CountryBorders {
    pub fn load(path: &Path) -> Result<Self> {
        ensure_exists(path)?;
        let raw = std::fs::read_to_string(path)?;
        let collection = FeatureCollection::try_from(raw.parse::<GeoJson>()?)?;
        info!(
            "Loaded {} country borders from {:?}",
            collection.features.len(),
            path
        );
        Ok(Self { collection })
    }

    pub fn from_collection(collection: FeatureCollection) -> Self {
        Self { collection }
    }

    pub fn len(&self) -> usize {
        self.collection.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.collection.features.is_empty()
    }

    /// Case-insensitive ISO alpha-2 match.
    pub fn find_by_code(&self, code: &str) -> Option<&Feature> {
        let code = code.trim();
        self.collection
            .features
            .iter()
            .find(|f| property(f, &CODE_KEYS).is_some_and(|c| c.eq_ignore_ascii_case(code)))
    }

    /// Case-insensitive country name match.
    pub fn find_by_name(&self, name: &str) -> Option<&Feature> {
        let name = name.trim().to_lowercase();
        self.collection
            .features
            .iter()
            .find(|f| property(f, &NAME_KEYS).is_some_and(|n| n.to_lowercase() == name))
    }

    pub fn into_feature(self, code: &str) -> Option<Feature> {
        let code = code.trim();
        self.collection
            .features
            .into_iter()
            .find(|f| property(f, &CODE_KEYS).is_some_and(|c| c.eq_ignore_ascii_case(code)))
    }
}

fn property<'a>(feature: &'a Feature, keys: &[&str]) -> Option<&'a str> {
    keys.iter()
        .find_map(|k| feature.property(*k).and_then(|v| v.as_str()))
}
