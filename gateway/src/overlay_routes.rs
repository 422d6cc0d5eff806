//! Airport and city overlays from the local datasets

use axum::{
    extract::{Path, State},
    routing::get,
    Json, Router,
};
use country_datasets::{airports, cities, ensure_exists};
use geojson::FeatureCollection;
use tracing::info;

use crate::country_routes::resolve_country_name;
use crate::error::{ApiError, ApiResult};
use crate::{normalize_country_code, read_dataset, AppState};

const AIRPORTS_MISSING: &str = "Airport data not available";
const AIRPORTS_FAILED: &str = "Failed to fetch airport data";
const CITIES_MISSING: &str = "City data file not found.";
const CITIES_FAILED: &str = "Failed to fetch city data";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/airports/:country_code", get(get_airports))
        .route("/cities/:country_code", get(get_cities))
}

/// File presence first, so a misconfigured deployment fails without
/// spending an upstream call.
fn require_file(path: &std::path::Path, missing: &'static str) -> ApiResult<()> {
    ensure_exists(path).map_err(ApiError::dataset(missing))
}

pub async fn get_airports(
    State(state): State<AppState>,
    Path(country_code): Path<String>,
) -> ApiResult<Json<FeatureCollection>> {
    let path = state.data.airports();
    require_file(&path, AIRPORTS_MISSING)?;
    let code = normalize_country_code(&country_code)
        .ok_or_else(|| ApiError::invalid("Invalid country code"))?;

    let name = resolve_country_name(&state.upstream, &code, AIRPORTS_FAILED).await?;
    info!("Searching for airports in {} ({})", name, code);

    let collection = read_dataset(AIRPORTS_MISSING, AIRPORTS_FAILED, move || {
        airports::airports_for_country(&path, &name)
    })
    .await?;
    Ok(Json(collection))
}

pub async fn get_cities(
    State(state): State<AppState>,
    Path(country_code): Path<String>,
) -> ApiResult<Json<FeatureCollection>> {
    let path = state.data.cities();
    require_file(&path, CITIES_MISSING)?;
    let code = normalize_country_code(&country_code)
        .ok_or_else(|| ApiError::invalid("Invalid country code"))?;

    let name = resolve_country_name(&state.upstream, &code, CITIES_FAILED).await?;
    info!("Searching for cities in {} ({})", name, code);

    let collection = read_dataset(CITIES_MISSING, CITIES_FAILED, move || {
        cities::cities_for_country(&path, &code, Some(name.as_str()))
    })
    .await?;
    Ok(Json(collection))
}
