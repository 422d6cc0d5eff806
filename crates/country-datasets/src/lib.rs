//! Country Datasets Library
//!
//! Static files shipped with the gazetteer and consulted by name or ISO
//! code. No index is built: each lookup is a linear scan, which is fine for
//! a few hundred borders and tens of thousands of airports/cities.
//!
//! | File | Provider | Keyed by |
//! |------|----------|----------|
//! | `countryBorders.geo.json` | Natural Earth derived GeoJSON | `iso_a2` / `ISO_A2` |
//! | `airports.dat` | OpenFlights (headerless CSV) | country name |
//! | `worldcities.csv` | simplemaps (CSV with header) | `iso2` or country name |

use geojson::{Feature, FeatureCollection, Geometry, JsonObject};
use std::path::{Path, PathBuf};
use thiserror::Error;

pub mod airports;
pub mod borders;
pub mod cities;

pub use borders::CountryBorders;

pub const BORDERS_FILE: &str = "countryBorders.geo.json";
pub const AIRPORTS_FILE: &str = "airports.dat";
pub const CITIES_FILE: &str = "worldcities.csv";

#[derive(Error, Debug)]
pub enum DatasetError {
    #[error("Dataset file not found: {0}")]
    Missing(PathBuf),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),
}

pub type Result<T> = std::result::Result<T, DatasetError>;

/// Directory holding the dataset files.
#[derive(Debug, Clone)]
pub struct DataDir {
    root: PathBuf,
}

impl DataDir {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn borders(&self) -> PathBuf {
        self.root.join(BORDERS_FILE)
    }

    pub fn airports(&self) -> PathBuf {
        self.root.join(AIRPORTS_FILE)
    }

    pub fn cities(&self) -> PathBuf {
        self.root.join(CITIES_FILE)
    }
}

/// Fail with [`DatasetError::Missing`] unless `path` is an existing file.
pub fn ensure_exists(path: &Path) -> Result<()> {
    if path.is_file() {
        Ok(())
    } else {
        Err(DatasetError::Missing(path.to_path_buf()))
    }
}

pub(crate) fn point_feature(longitude: f64, latitude: f64, properties: JsonObject) -> Feature {
    Feature {
        bbox: None,
        geometry: Some(Geometry::new(geojson::Value::Point(vec![longitude, latitude]))),
        id: None,
        properties: Some(properties),
        foreign_members: None,
    }
}

pub(crate) fn collection(features: Vec<Feature>) -> FeatureCollection {
    FeatureCollection {
        bbox: None,
        features,
        foreign_members: None,
    }
}

pub(crate) fn parse_coordinate(raw: &str, limit: f64) -> Option<f64> {
    raw.trim()
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && (-limit..=limit).contains(v))
}
