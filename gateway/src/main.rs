use anyhow::Result;
use gazetteer_gateway::{build_router, AppState, GatewayConfig};
use tower_http::services::ServeDir;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let config = GatewayConfig::from_env();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "gazetteer_gateway=debug,tower_http=info,info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let state = AppState::from_config(&config)?;
    tracing::info!("   Data directory: {}", config.data_dir.display());
    for key in config.missing_keys() {
        tracing::warn!("   {} is not set; the matching endpoint will fail upstream", key);
    }

    let api_routes = build_router(state);

    // Static front end (if configured)
    let app = match &config.static_dir {
        Some(dir) if dir.exists() => {
            tracing::info!("   Serving front end from {}", dir.display());
            api_routes.fallback_service(ServeDir::new(dir))
        }
        Some(dir) => {
            tracing::warn!("   Static directory {} does not exist", dir.display());
            api_routes
        }
        None => api_routes,
    };

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!("Gazetteer gateway starting on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
