//! Gazetteer gateway
//!
//! Stateless proxy between the map front end and third-party APIs. Each
//! endpoint translates one request into one upstream call (two for the
//! country currency) or a scan of a local dataset, and reshapes the answer.

use axum::{routing::get, Json, Router};
use country_datasets::{DataDir, DatasetError};
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::error;

pub mod config;
pub mod country_routes;
pub mod currency_routes;
pub mod error;
pub mod info_routes;
pub mod overlay_routes;
pub mod upstream;
pub mod weather_routes;

pub use config::GatewayConfig;
pub use error::{ApiError, ApiResult};
pub use upstream::{UpstreamClient, UpstreamError};

/// Shared by every handler; nothing in here changes after startup.
#[derive(Clone)]
pub struct AppState {
    pub upstream: Arc<UpstreamClient>,
    pub data: Arc<DataDir>,
}

impl AppState {
    pub fn from_config(config: &GatewayConfig) -> reqwest::Result<Self> {
        Ok(Self {
            upstream: Arc::new(UpstreamClient::new(config)?),
            data: Arc::new(DataDir::new(config.data_dir.clone())),
        })
    }
}

/// `/health` plus every endpoint under `/api`.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .merge(country_routes::router())
        .merge(weather_routes::router())
        .merge(currency_routes::router())
        .merge(info_routes::router())
        .merge(overlay_routes::router());

    Router::new()
        .route("/health", get(health))
        .nest("/api", api_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({
        "status": "healthy",
        "service": "gazetteer-gateway",
        "version": env!("CARGO_PKG_VERSION")
    }))
}

/// Upper-cased ISO alpha-2 code, or `None` if `raw` is not two letters.
pub fn normalize_country_code(raw: &str) -> Option<String> {
    let code = raw.trim();
    (code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic())).then(|| code.to_ascii_uppercase())
}

/// Run a dataset read off the async workers. A missing file maps to
/// `missing`, any other read or parse failure to `failed`.
pub(crate) async fn read_dataset<T, F>(missing: &'static str, failed: &'static str, read: F) -> ApiResult<T>
where
    F: FnOnce() -> country_datasets::Result<T> + Send + 'static,
    T: Send + 'static,
{
    match tokio::task::spawn_blocking(read).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(e @ DatasetError::Missing(_))) => Err(ApiError::dataset(missing)(e)),
        Ok(Err(e)) => Err(ApiError::dataset(failed)(e)),
        Err(e) => {
            error!("Dataset task did not complete: {}", e);
            Err(ApiError::DatasetMissing {
                message: failed.to_string(),
                source: None,
            })
        }
    }
}
