//! Country list, facts, boundary and reverse geocoding

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use country_datasets::CountryBorders;
use geojson::Feature;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::upstream::{malformed, UpstreamClient, OPENCAGE};
use crate::{normalize_country_code, read_dataset, AppState};

const FACT_FIELDS: &str = "name,capital,population,currencies,languages,flags,region,area,cca2,latlng";
const NOT_AVAILABLE: &str = "N/A";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/countries", get(list_countries))
        .route("/country-info/:code", get(country_info))
        .route("/country-boundary/:code", get(country_boundary))
        .route("/geocode", get(reverse_geocode))
}

#[derive(Debug, Serialize, PartialEq)]
pub struct CountryEntry {
    pub name: String,
    pub code: String,
}

/// `{name, code}` for every country, sorted by name.
pub async fn list_countries(State(state): State<AppState>) -> ApiResult<Json<Vec<CountryEntry>>> {
    let raw = state
        .upstream
        .all_countries()
        .await
        .map_err(ApiError::upstream("Failed to fetch countries"))?;

    let mut countries: Vec<CountryEntry> = raw
        .iter()
        .filter_map(|c| {
            Some(CountryEntry {
                name: c.pointer("/name/common")?.as_str()?.to_string(),
                code: c.get("cca2")?.as_str()?.to_string(),
            })
        })
        .collect();
    countries.sort_by(|a, b| {
        a.name
            .to_lowercase()
            .cmp(&b.name.to_lowercase())
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(Json(countries))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CountryInfo {
    pub name: String,
    pub code: String,
    pub flag: String,
    pub region: String,
    pub capital: String,
    pub population: u64,
    pub currency: String,
    pub currency_code: Option<String>,
    pub languages: String,
    pub area: f64,
    pub latlng: Vec<f64>,
}

impl CountryInfo {
    /// Remap a restcountries record; `None` when it carries no name.
    fn from_upstream(code: &str, raw: &Value) -> Option<Self> {
        let name = raw.pointer("/name/common")?.as_str()?.to_string();
        let text = |pointer: &str| {
            raw.pointer(pointer)
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string()
        };

        // First listed currency; key order is preserved from the body.
        let first_currency = raw
            .get("currencies")
            .and_then(Value::as_object)
            .and_then(|m| m.iter().next());
        let languages: Vec<&str> = raw
            .get("languages")
            .and_then(Value::as_object)
            .map(|m| m.values().filter_map(Value::as_str).collect())
            .unwrap_or_default();

        Some(Self {
            name,
            code: raw
                .get("cca2")
                .and_then(Value::as_str)
                .unwrap_or(code)
                .to_string(),
            flag: text("/flags/png"),
            region: text("/region"),
            capital: raw
                .pointer("/capital/0")
                .and_then(Value::as_str)
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            population: raw.get("population").and_then(Value::as_u64).unwrap_or(0),
            currency: first_currency
                .and_then(|(_, c)| c.get("name"))
                .and_then(Value::as_str)
                .unwrap_or(NOT_AVAILABLE)
                .to_string(),
            currency_code: first_currency.map(|(code, _)| code.clone()),
            languages: if languages.is_empty() {
                NOT_AVAILABLE.to_string()
            } else {
                languages.join(", ")
            },
            area: raw.get("area").and_then(Value::as_f64).unwrap_or(0.0),
            latlng: raw
                .get("latlng")
                .and_then(Value::as_array)
                .map(|a| a.iter().filter_map(Value::as_f64).collect())
                .unwrap_or_default(),
        })
    }
}

pub async fn country_info(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<CountryInfo>> {
    let code = normalize_country_code(&code).ok_or_else(|| ApiError::invalid("Invalid country code"))?;
    let raw = state
        .upstream
        .country(&code, FACT_FIELDS)
        .await
        .map_err(ApiError::upstream("Failed to fetch country information"))?;

    raw.as_ref()
        .and_then(|r| CountryInfo::from_upstream(&code, r))
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Country not found"))
}

/// Common name of a country, as the datasets spell it.
pub(crate) async fn resolve_country_name(
    upstream: &UpstreamClient,
    code: &str,
    failure: &'static str,
) -> ApiResult<String> {
    let raw = upstream
        .country(code, "name")
        .await
        .map_err(ApiError::upstream(failure))?;
    raw.as_ref()
        .and_then(|r| r.pointer("/name/common"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .ok_or_else(|| ApiError::not_found("Country not found"))
}

/// Border polygon from the local dataset, by ISO code or country name.
pub async fn country_boundary(
    State(state): State<AppState>,
    Path(code): Path<String>,
) -> ApiResult<Json<Feature>> {
    let path = state.data.borders();
    let key = code.trim().to_string();
    let feature = read_dataset(
        "Country boundary data not available",
        "Failed to read country boundaries",
        move || {
            let borders = CountryBorders::load(&path)?;
            Ok(match normalize_country_code(&key) {
                Some(iso) => borders.into_feature(&iso),
                None => borders.find_by_name(&key).cloned(),
            })
        },
    )
    .await?;

    feature
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Country not found"))
}

#[derive(Debug, Deserialize)]
pub struct GeocodeQuery {
    pub lat: Option<String>,
    pub lon: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GeocodeResponse {
    pub country: String,
    pub country_code: String,
}

/// WGS84 position from query text; NaN and infinities are not numbers here.
fn parse_position(lat: &str, lon: &str) -> ApiResult<(f64, f64)> {
    let (Ok(lat), Ok(lon)) = (lat.trim().parse::<f64>(), lon.trim().parse::<f64>()) else {
        return Err(ApiError::invalid("Latitude and longitude must be numbers"));
    };
    if !lat.is_finite() || !lon.is_finite() {
        return Err(ApiError::invalid("Latitude and longitude must be numbers"));
    }
    if !(-90.0..=90.0).contains(&lat) || !(-180.0..=180.0).contains(&lon) {
        return Err(ApiError::invalid("Latitude and longitude are out of range"));
    }
    Ok((lat, lon))
}

pub async fn reverse_geocode(
    State(state): State<AppState>,
    Query(query): Query<GeocodeQuery>,
) -> ApiResult<Json<GeocodeResponse>> {
    let required = || ApiError::invalid("Latitude and longitude are required");
    let lat = query.lat.filter(|v| !v.trim().is_empty()).ok_or_else(required)?;
    let lon = query.lon.filter(|v| !v.trim().is_empty()).ok_or_else(required)?;
    let (lat, lon) = parse_position(&lat, &lon)?;

    const FAILURE: &str = "Failed to perform reverse geocoding";
    let body = state
        .upstream
        .reverse_geocode(lat, lon)
        .await
        .map_err(ApiError::upstream(FAILURE))?;

    let results = body
        .get("results")
        .and_then(Value::as_array)
        .ok_or_else(|| ApiError::upstream(FAILURE)(malformed(OPENCAGE, "missing results")))?;
    let Some(components) = results.first().and_then(|r| r.get("components")) else {
        return Err(ApiError::not_found("Location not found"));
    };

    let country = components.get("country").and_then(Value::as_str);
    let country_code = components.get("country_code").and_then(Value::as_str);
    match (country, country_code) {
        (Some(country), Some(code)) => {
            info!("Reverse geocoded {},{} to {}", lat, lon, country);
            Ok(Json(GeocodeResponse {
                country: country.to_string(),
                country_code: code.to_uppercase(),
            }))
        }
        _ => Err(ApiError::not_found("Location not found")),
    }
}
