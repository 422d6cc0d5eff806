//! simplemaps `worldcities.csv` scanning

use crate::{collection, ensure_exists, parse_coordinate, point_feature, Result};
use csv::{ReaderBuilder, StringRecord};
use geojson::{Feature, FeatureCollection, JsonObject};
use serde::Deserialize;
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

#[derive(Debug, Deserialize)]
struct RawCity {
    city: String,
    lat: String,
    lng: String,
    #[serde(default)]
    country: String,
    #[serde(default)]
    iso2: String,
    #[serde(default)]
    capital: String,
    #[serde(default)]
    population: String,
}

impl RawCity {
    fn matches(&self, code: &str, name: Option<&str>) -> bool {
        if !code.is_empty() && self.iso2.trim().eq_ignore_ascii_case(code) {
            return true;
        }
        name.is_some_and(|n| self.country.trim().to_lowercase() == n)
    }

    /// Fractional populations occur in the file; they are truncated.
    fn population(&self) -> u64 {
        self.population
            .trim()
            .parse::<f64>()
            .ok()
            .filter(|p| p.is_finite() && *p > 0.0)
            .map(|p| p as u64)
            .unwrap_or(0)
    }
}

/// Cities whose `iso2` equals `code` or whose country column equals `name`.
pub fn cities_for_country(path: &Path, code: &str, name: Option<&str>) -> Result<FeatureCollection> {
    ensure_exists(path)?;
    let reader = BufReader::new(File::open(path)?);
    let features = scan_cities(reader, code, name)?;
    info!("Found {} cities for {}", features.len(), code.to_uppercase());
    Ok(collection(features))
}

pub fn scan_cities<R: Read>(reader: R, code: &str, name: Option<&str>) -> Result<Vec<Feature>> {
    let code = code.trim();
    let name = name.map(|n| n.trim().to_lowercase());
    let mut rdr = ReaderBuilder::new().flexible(true).from_reader(reader);
    let headers = StringRecord::from_byte_record_lossy(rdr.byte_headers()?.clone());

    let mut features = Vec::new();
    let mut skipped = 0usize;
    let mut unreadable = 0usize;

    for row in rdr.byte_records() {
        let parsed = match row {
            Ok(bytes) => StringRecord::from_byte_record_lossy(bytes).deserialize::<RawCity>(Some(&headers)),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => Err(e),
        };
        let city = match parsed {
            Ok(city) => city,
            Err(e) => {
                unreadable += 1;
                warn!("Unreadable city row at line {:?}: {}", e.position().map(|p| p.line()), e);
                continue;
            }
        };
        if !city.matches(code, name.as_deref()) {
            continue;
        }

        let (Some(lat), Some(lon)) = (
            parse_coordinate(&city.lat, 90.0),
            parse_coordinate(&city.lng, 180.0),
        ) else {
            skipped += 1;
            continue;
        };

        let mut properties = JsonObject::new();
        properties.insert("name".into(), Value::from(city.city.trim()));
        properties.insert("population".into(), Value::from(city.population()));
        properties.insert("capital".into(), Value::from(city.capital.trim() == "primary"));
        features.push(point_feature(lon, lat, properties));
    }

    if skipped > 0 {
        warn!("Skipped {} cities for {} with invalid coordinates", skipped, code);
    }
    if unreadable > 0 {
        warn!("Skipped {} unreadable rows in the city data", unreadable);
    }

    Ok(features)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const CITIES: &str = "\"city\",\"city_ascii\",\"lat\",\"lng\",\"country\",\"iso2\",\"iso3\",\"admin_name\",\"capital\",\"population\",\"id\"
\"London\",\"London\",\"51.5072\",\"-0.1275\",\"United Kingdom\",\"GB\",\"GBR\",\"London, City of\",\"primary\",\"11262000\",\"1826645935\"
\"Birmingham\",\"Birmingham\",\"52.4800\",\"-1.9025\",\"United Kingdom\",\"GB\",\"GBR\",\"Birmingham\",\"\",\"2919600.5\",\"1826423213\"
\"Stornoway\",\"Stornoway\",\"58.2090\",\"-6.3890\",\"United Kingdom\",\"\",\"GBR\",\"Na h-Eileanan Siar\",\"\",\"\",\"1826000001\"
\"Paris\",\"Paris\",\"48.8567\",\"2.3522\",\"France\",\"FR\",\"FRA\",\"Île-de-France\",\"primary\",\"11060000\",\"1250015082\"
\"Ghost\",\"Ghost\",\"\",\"2.0\",\"France\",\"FR\",\"FRA\",\"\",\"\",\"10\",\"1250000000\"
";

    fn prop<'a>(feature: &'a Feature, key: &str) -> &'a Value {
        feature.property(key).unwrap()
    }

    #[test]
    fn test_match_by_code_only() {
        let features = scan_cities(CITIES.as_bytes(), "gb", None).unwrap();
        let names: Vec<_> = features.iter().map(|f| prop(f, "name").as_str().unwrap()).collect();
        assert_eq!(names, vec!["London", "Birmingham"]);
    }

    #[test]
    fn test_match_by_code_or_name() {
        let features = scan_cities(CITIES.as_bytes(), "GB", Some("united kingdom")).unwrap();
        assert_eq!(features.len(), 3);
        assert_eq!(prop(&features[2], "population").as_u64(), Some(0));
    }

    #[test]
    fn test_properties() {
        let features = scan_cities(CITIES.as_bytes(), "GB", None).unwrap();
        assert_eq!(prop(&features[0], "capital").as_bool(), Some(true));
        assert_eq!(prop(&features[0], "population").as_u64(), Some(11_262_000));
        assert_eq!(prop(&features[1], "capital").as_bool(), Some(false));
        assert_eq!(prop(&features[1], "population").as_u64(), Some(2_919_600));
    }

    #[test]
    fn test_invalid_coordinates_skipped() {
        let features = scan_cities(CITIES.as_bytes(), "FR", Some("France")).unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(prop(&features[0], "name").as_str(), Some("Paris"));
    }

    #[test]
    fn test_cities_for_country_file() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(CITIES.as_bytes()).unwrap();
        let fc = cities_for_country(file.path(), "FR", None).unwrap();
        assert_eq!(fc.features.len(), 1);
        assert!(matches!(
            cities_for_country(Path::new("/missing/worldcities.csv"), "FR", None),
            Err(crate::DatasetError::Missing(_))
        ));
    }

    #[test]
    fn test_truncated_row_is_skipped() {
        let mut lines = CITIES.lines();
        let header = lines.next().unwrap();
        let london = lines.next().unwrap();
        let data = format!(
            "{}\n{}\n\"Broken\",\"Broken\",\"52.0\"\n\"Leeds\",\"Leeds\",\"53.7997\",\"-1.5492\",\"United Kingdom\",\"GB\",\"GBR\",\"Leeds\",\"\",\"1901934\",\"1826516419\"\n",
            header, london
        );
        let features = scan_cities(data.as_bytes(), "GB", None).unwrap();
        let names: Vec<_> = features.iter().map(|f| prop(f, "name").as_str().unwrap()).collect();
        assert_eq!(names, vec!["London", "Leeds"]);
    }

    #[test]
    fn test_non_utf8_row_is_decoded_lossily() {
        let mut data = CITIES.as_bytes().to_vec();
        data.extend_from_slice(b"\"Orl\xe9ans\",\"Orleans\",\"47.9025\",\"1.9090\",\"France\",\"FR\",\"FRA\",\"Centre\",\"admin\",\"116238\",\"1250946488\"\n");
        let features = scan_cities(data.as_slice(), "FR", None).unwrap();
        assert_eq!(features.len(), 2);
        assert_eq!(prop(&features[1], "name").as_str(), Some("Orl\u{FFFD}ans"));
    }
}
