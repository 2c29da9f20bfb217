use axum::{
    routing::{get, post},
    Router,
};
use mutual::{handlers, utils, Config, get_db_pool};
use mutual::constants::LOCAL_FALLBACK_ACTIONS_PER_WINDOW;
use mutual::db::PgInterestStore;
use mutual::handlers::connections::AppState;
use mutual::services::notify::LogNotifier;
use mutual::services::{ConnectionCoordinator, HttpRateLimitOracle, LocalRateLimiter};
use std::sync::Arc;
use tower_http::cors::{CorsLayer, Any};
use axum::http::{Method, HeaderValue};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    utils::init_logging();

    let config = Config::from_env()?;
    let db_config = mutual::db::DatabaseConfig::from_env()?;
    let pool = get_db_pool(&db_config).await?;

    // Run migrations
    mutual::db::migrations::run_migrations(&pool).await?;

    let store = Arc::new(PgInterestStore::new(pool));
    let oracle = Arc::new(HttpRateLimitOracle::new(config.rate_limit_url.clone())?);
    let local_limiter = Arc::new(LocalRateLimiter::new(LOCAL_FALLBACK_ACTIONS_PER_WINDOW));
    let coordinator =
        ConnectionCoordinator::new(store, oracle, local_limiter, Arc::new(LogNotifier));

    let port = config.port;
    let app = create_router(coordinator, config);

    let listener = tokio::net::TcpListener::bind(&format!("0.0.0.0:{}", port)).await?;
    tracing::info!("Server running on port {}", port);

    axum::serve(listener, app).await?;

    Ok(())
}

fn create_router(coordinator: ConnectionCoordinator, config: Config) -> Router {
    let cors_layer = create_cors_layer(&config);
    let app_state: AppState = (coordinator, config);

    Router::new()
        .route("/health", get(health_check))
        // Connection endpoints
        .route(
            "/api/connections",
            post(handlers::connect).delete(handlers::remove_connection_request),
        )
        .route("/api/connections/incoming", get(handlers::has_interest_from))
        .route("/api/passes", post(handlers::pass))
        .layer(cors_layer)
        .with_state(app_state)
}

fn create_cors_layer(_config: &Config) -> CorsLayer {
    let mut cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(Any)
        .allow_credentials(false);

    // Check if ALLOWED_ORIGINS environment variable is set for multiple domains
    if let Ok(cors_origins) = std::env::var("ALLOWED_ORIGINS") {
        let origins: Vec<HeaderValue> = cors_origins
            .split(',')
            .filter_map(|origin| {
                let trimmed = origin.trim();
                if !trimmed.is_empty() {
                    trimmed.parse().ok()
                } else {
                    None
                }
            })
            .collect();

        if !origins.is_empty() {
            cors = cors.allow_origin(origins);
        } else {
            // Fallback to permissive if parsing fails
            cors = cors.allow_origin(Any);
        }
    } else {
        // Default to permissive for development
        cors = cors.allow_origin(Any);
    }

    cors
}

async fn health_check() -> &'static str {
    "OK"
}
