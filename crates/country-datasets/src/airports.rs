//! OpenFlights `airports.dat` scanning
//!
//! Headerless CSV, one airport per row:
//! `id, name, city, country, iata, icao, latitude, longitude, altitude,
//! timezone, dst, tz, type, source`. Nulls are written as `\N`.

use crate::{collection, ensure_exists, parse_coordinate, point_feature, Result};
use csv::{ReaderBuilder, StringRecord};
use geojson::{FeatureCollection, JsonObject};
use serde_json::Value;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tracing::{info, warn};

const NAME: usize = 1;
const CITY: usize = 2;
const COUNTRY: usize = 3;
const IATA: usize = 4;
const ICAO: usize = 5;
const LATITUDE: usize = 6;
const LONGITUDE: usize = 7;
const KIND: usize = 12;

/// All airports whose country column equals `country_name`, ignoring case.
pub fn airports_for_country(path: &Path, country_name: &str) -> Result<FeatureCollection> {
    ensure_exists(path)?;
    let reader = BufReader::new(File::open(path)?);
    let features = scan_airports(reader, country_name)?;
    info!("Found {} airports for {}", features.len(), country_name);
    Ok(collection(features))
}

pub fn scan_airports<R: Read>(reader: R, country_name: &str) -> Result<Vec<geojson::Feature>> {
    let wanted = country_name.trim().to_lowercase();
    let mut rdr = ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(reader);

    let mut features = Vec::new();
    let mut skipped = 0usize;
    let mut unreadable = 0usize;

    // Names in the file are mostly UTF-8 but not all of it; decode lossily.
    for row in rdr.byte_records() {
        let row = match row {
            Ok(bytes) => StringRecord::from_byte_record_lossy(bytes),
            Err(e) if e.is_io_error() => return Err(e.into()),
            Err(e) => {
                unreadable += 1;
                warn!("Unreadable airport row at line {:?}: {}", e.position().map(|p| p.line()), e);
                continue;
            }
        };
        if field(&row, COUNTRY).to_lowercase() != wanted {
            continue;
        }

        let (Some(lat), Some(lon)) = (
            parse_coordinate(field(&row, LATITUDE), 90.0),
            parse_coordinate(field(&row, LONGITUDE), 180.0),
        ) else {
            skipped += 1;
            continue;
        };

        let mut properties = JsonObject::new();
        properties.insert("name".into(), Value::from(field(&row, NAME)));
        properties.insert("city".into(), Value::from(field(&row, CITY)));
        properties.insert("iata".into(), Value::from(field(&row, IATA)));
        properties.insert("icao".into(), Value::from(field(&row, ICAO)));
        properties.insert("type".into(), Value::from(field(&row, KIND)));
        features.push(point_feature(lon, lat, properties));
    }

    if skipped > 0 {
        warn!("Skipped {} airports in {} with invalid coordinates", skipped, country_name);
    }
    if unreadable > 0 {
        warn!("Skipped {} unreadable rows in the airport data", unreadable);
    }

    Ok(features)
}

fn field(row: &StringRecord, index: usize) -> &str {
    match row.get(index).map(str::trim) {
        Some("\\N") | None => "",
        Some(value) => value,
    }
}
