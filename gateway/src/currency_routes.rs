//! Currency pair conversion and per-country exchange rate

use axum::{
    extract::{Query, State},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;

use crate::error::{ApiError, ApiResult};
use crate::{normalize_country_code, AppState};

pub const BASE_CURRENCY: &str = "USD";

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/convert", get(convert))
        .route("/currency", get(country_currency))
}

#[derive(Debug, Deserialize)]
pub struct ConvertQuery {
    pub from: Option<String>,
    pub to: Option<String>,
    pub amount: Option<String>,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn parse_amount(raw: &str) -> ApiResult<f64> {
    raw.parse::<f64>()
        .ok()
        .filter(|a| a.is_finite())
        .ok_or_else(|| ApiError::invalid("Amount must be a number"))
}

/// `amount` of `from` in `to`, provider payload passed through.
pub async fn convert(
    State(state): State<AppState>,
    Query(query): Query<ConvertQuery>,
) -> ApiResult<Json<Value>> {
    let (Some(from), Some(to), Some(amount)) = (
        non_empty(query.from),
        non_empty(query.to),
        non_empty(query.amount),
    ) else {
        return Err(ApiError::invalid("From, to and amount parameters are required"));
    };
    let amount = parse_amount(&amount)?;

    state
        .upstream
        .pair_conversion(&from.to_uppercase(), &to.to_uppercase(), amount)
        .await
        .map(Json)
        .map_err(ApiError::upstream("Failed to fetch exchange rate"))
}

#[derive(Debug, Deserialize)]
pub struct CurrencyQuery {
    pub country: Option<String>,
    pub amount: Option<String>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct CurrencyInfo {
    pub code: String,
    pub name: String,
    pub symbol: String,
}

#[derive(Debug, Serialize)]
pub struct CurrencyResponse {
    pub currency: CurrencyInfo,
    pub base: &'static str,
    pub rate: f64,
    pub amount: f64,
    pub converted: f64,
}

/// First currency listed for a country record.
fn first_currency(country: &Value) -> Option<CurrencyInfo> {
    let (code, details) = country.get("currencies")?.as_object()?.iter().next()?;
    let field = |key: &str| {
        details
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    Some(CurrencyInfo {
        code: code.clone(),
        name: field("name"),
        symbol: field("symbol"),
    })
}

/// Resolve the country's currency, then price `amount` USD in it. Two
/// sequential upstream calls; either failing aborts the request.
pub async fn country_currency(
    State(state): State<AppState>,
    Query(query): Query<CurrencyQuery>,
) -> ApiResult<Json<CurrencyResponse>> {
    let country = non_empty(query.country)
        .ok_or_else(|| ApiError::invalid("Country parameter is required"))?;
    let code = normalize_country_code(&country).ok_or_else(|| ApiError::invalid("Invalid country code"))?;
    let amount = match non_empty(query.amount) {
        Some(raw) => parse_amount(&raw)?,
        None => 1.0,
    };

    let record = state
        .upstream
        .country(&code, "currencies")
        .await
        .map_err(ApiError::upstream("Failed to fetch country data"))?
        .ok_or_else(|| ApiError::not_found("Country not found"))?;
    let currency = first_currency(&record)
        .ok_or_else(|| ApiError::not_found("No currency information found for this country"))?;

    let rates = state
        .upstream
        .usd_rates()
        .await
        .map_err(ApiError::upstream("Failed to fetch exchange rate"))?;
    let rate = rates
        .pointer(&format!("/conversion_rates/{}", currency.code))
        .and_then(Value::as_f64)
        .ok_or_else(|| ApiError::not_found(format!("No exchange rate found for {}", currency.code)))?;

    info!("{} uses {} at {} per {}", code, currency.code, rate, BASE_CURRENCY);
    Ok(Json(CurrencyResponse {
        currency,
        base: BASE_CURRENCY,
        rate,
        amount,
        converted: amount * rate,
    }))
}
