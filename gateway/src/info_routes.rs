//! Encyclopedia summary and news headlines

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{ApiError, ApiResult};
use crate::AppState;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/wikipedia", get(get_wikipedia))
        .route("/news", get(get_news))
}

#[derive(Debug, Deserialize)]
pub struct CountryQuery {
    pub country: Option<String>,
}

impl CountryQuery {
    fn required(self) -> ApiResult<String> {
        self.country
            .map(|c| c.trim().to_string())
            .filter(|c| !c.is_empty())
            .ok_or_else(|| ApiError::invalid("Country parameter is required"))
    }
}

#[derive(Debug, Serialize)]
pub struct WikipediaResponse {
    pub extract: String,
}

/// Pull the first page's extract out of a MediaWiki `query` response.
fn first_extract(body: &Value) -> Result<String, ApiError> {
    let page = body
        .pointer("/query/pages")
        .and_then(Value::as_object)
        .and_then(|pages| pages.values().next())
        .ok_or_else(|| ApiError::not_found("No Wikipedia data found"))?;

    page.get("extract")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|e| !e.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ApiError::not_found("No Wikipedia extract found"))
}

pub async fn get_wikipedia(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>,
) -> ApiResult<Json<WikipediaResponse>> {
    let country = query.required()?;
    let body = state
        .upstream
        .wikipedia_extract(&country)
        .await
        .map_err(ApiError::upstream("Failed to fetch Wikipedia data"))?;

    Ok(Json(WikipediaResponse {
        extract: first_extract(&body)?,
    }))
}

/// Top headlines for an ISO country code, passed through.
pub async fn get_news(
    State(state): State<AppState>,
    Query(query): Query<CountryQuery>,
) -> ApiResult<Json<Value>> {
    let country = query.required()?.to_lowercase();
    state
        .upstream
        .top_headlines(&country)
        .await
        .map(Json)
        .map_err(ApiError::upstream("Failed to fetch news data"))
}
