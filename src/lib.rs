pub mod api;
pub mod auth;
pub mod cli;
pub mod db;
pub mod jwt;
pub mod password;
pub mod rate_limit;
pub mod scraper;

use api::create_api_router;
use axum::{
    Router,
    http::{HeaderValue, Method, header},
};
use db::Database;
use jwt::JwtConfig;
use rate_limit::RateLimitConfig;
use scraper::ScraperConfig;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::warn;

/// Browsers may cache a preflight response for this long.
const CORS_MAX_AGE_SECS: u64 = 300;

pub struct ServerConfig {
    /// Database connection (cloneable, uses connection pool internally)
    pub db: Database,
    /// JWT secret for signing tokens
    pub jwt_secret: Vec<u8>,
    /// Browser origin allowed to call the API with credentials
    pub cors_origin: String,
    /// External recipe scraper invocation
    pub scraper: ScraperConfig,
    /// Requests per minute per IP on the credential endpoints
    pub auth_rate_limit_per_minute: u32,
}

fn cors_layer(origin: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .expose_headers([
            header::AUTHORIZATION,
            header::CONTENT_RANGE,
            header::SET_COOKIE,
        ])
        .max_age(Duration::from_secs(CORS_MAX_AGE_SECS));

    match HeaderValue::from_str(origin) {
        Ok(origin) => cors.allow_origin(origin),
        Err(e) => {
            warn!(origin = %origin, error = %e, "Invalid CORS origin, cross-origin requests disabled");
            cors
        }
    }
}

/// Create the application router with the given configuration.
pub fn create_app(config: &ServerConfig) -> Router {
    let jwt = Arc::new(JwtConfig::new(&config.jwt_secret));
    let scraper = Arc::new(config.scraper.clone());
    let rate_limit_config = Arc::new(RateLimitConfig::new(config.auth_rate_limit_per_minute));

    let api_router = create_api_router(config.db.clone(), jwt, scraper, rate_limit_config);

    Router::new()
        .nest("/v1", api_router)
        .layer(cors_layer(&config.cors_origin))
        .layer(TraceLayer::new_for_http())
}

/// Run the server on the given listener. This function blocks until the server exits.
pub async fn run_server(config: ServerConfig, listener: TcpListener) -> Result<(), std::io::Error> {
    let app = create_app(&config);
    let make_service = app.into_make_service_with_connect_info::<SocketAddr>();
    axum::serve(listener, make_service).await
}

/// Start the server on the given port in a background task. Use port 0 to let the OS choose a random port.
/// Returns the actual address the server is listening on.
/// Note: For production use, prefer `run_server` directly in main.
pub async fn start_server(
    config: ServerConfig,
    port: u16,
) -> Result<(tokio::task::JoinHandle<()>, SocketAddr), std::io::Error> {
    let addr = format!("127.0.0.1:{}", port);
    let listener = TcpListener::bind(&addr).await?;
    let local_addr = listener.local_addr()?;

    let handle = tokio::spawn(async move {
        if let Err(e) = run_server(config, listener).await {
            warn!(error = %e, "Server exited with error");
        }
    });

    Ok((handle, local_addr))
}
