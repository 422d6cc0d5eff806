//! Weather forecast passthrough

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::Deserialize;
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new().route("/weather", get(get_weather))
}

#[derive(Debug, Deserialize)]
pub struct WeatherQuery {
    pub city: Option<String>,
}

/// Forecast payload for `city`, exactly as the provider returns it.
pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> ApiResult<Json<Value>> {
    let city = query
        .city
        .map(|c| c.trim().to_string())
        .filter(|c| !c.is_empty())
        .ok_or_else(|| ApiError::invalid("City parameter is required"))?;

    state
        .upstream
        .forecast(&city)
        .await
        .map(Json)
        .map_err(ApiError::upstream("Failed to fetch weather data"))
}
