//! CLI argument parsing, validation, and startup helpers.

use crate::ServerConfig;
use crate::db::Database;
use crate::rate_limit::DEFAULT_AUTH_PER_MINUTE;
use crate::scraper::{DEFAULT_TIMEOUT_SECS, ScraperConfig};
use clap::Parser;
use std::time::Duration;
use tracing::{error, info};
use url::Url;

const MIN_JWT_SECRET_LENGTH: usize = 32;

#[derive(clap::ValueEnum, Clone, Debug, Default)]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
    Compact,
}

#[derive(Parser, Debug, Clone)]
#[command(name = "recipebook", about = "Recipe book REST backend")]
pub struct Args {
    /// Port to listen on
    #[arg(short, long, env = "PORT", default_value = "8000")]
    pub port: u16,

    /// Path to SQLite database file
    #[arg(short, long, env = "DATABASE_PATH", default_value = "recipebook.db")]
    pub database: String,

    /// Path to file containing JWT secret. Prefer using JWT_SECRET env var instead
    #[arg(long)]
    pub jwt_secret_file: Option<String>,

    /// Origin allowed to call the API from a browser (with credentials)
    #[arg(long, env = "CORS_ORIGIN", default_value = "http://localhost:3000")]
    pub cors_origin: String,

    /// Program that scrapes a recipe page; receives the URL as its last argument
    #[arg(long, env = "SCRAPER_PROGRAM", default_value = "recipe-scraper")]
    pub scraper_program: String,

    /// Extra argument passed to the scraper before the URL (repeatable)
    #[arg(long = "scraper-arg", allow_hyphen_values = true)]
    pub scraper_args: Vec<String>,

    /// Seconds a single scraper run may take
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    pub scraper_timeout: u64,

    /// Requests per minute per IP on sign-up, login and password reset
    #[arg(long, default_value_t = DEFAULT_AUTH_PER_MINUTE)]
    pub auth_rate_limit: u32,

    /// Log output format
    #[arg(short, long, default_value = "pretty")]
    pub log_format: LogFormat,
}

/// Initialize logging based on the specified format.
pub fn init_logging(format: &LogFormat) {
    match format {
        LogFormat::Pretty => tracing_subscriber::fmt::init(),
        LogFormat::Json => tracing_subscriber::fmt().json().init(),
        LogFormat::Compact => tracing_subscriber::fmt().compact().init(),
    }
}

/// Load JWT secret from environment variable or file.
/// Returns None and logs an error if the secret cannot be loaded.
pub fn load_jwt_secret(jwt_secret_file: Option<&str>) -> Option<String> {
    let secret = if let Ok(secret) = std::env::var("JWT_SECRET") {
        // Clear the environment variable to prevent leaking
        // SAFETY: We're single-threaded at this point during startup,
        // and no other code is reading this environment variable.
        unsafe { std::env::remove_var("JWT_SECRET") };
        secret
    } else if let Some(path) = jwt_secret_file {
        match std::fs::read_to_string(path) {
            Ok(content) => content.trim().to_string(),
            Err(e) => {
                error!(path = %path, error = %e, "Failed to read JWT secret file");
                return None;
            }
        }
    } else {
        error!(
            "JWT secret is required. Set JWT_SECRET environment variable (recommended) or use --jwt-secret-file"
        );
        return None;
    };

    check_secret_length(secret)
}

fn check_secret_length(secret: String) -> Option<String> {
    if secret.len() < MIN_JWT_SECRET_LENGTH {
        error!(
            "JWT secret is shorter than {} characters. Use a longer secret",
            MIN_JWT_SECRET_LENGTH
        );
        return None;
    }
    Some(secret)
}

/// Parse the CORS origin and normalize it to `scheme://host[:port]`.
/// Returns None and logs an error if validation fails.
pub fn validate_cors_origin(cors_origin: &str) -> Option<String> {
    let url = match Url::parse(cors_origin) {
        Ok(url) => url,
        Err(e) => {
            error!(origin = %cors_origin, error = %e, "Invalid cors-origin URL");
            return None;
        }
    };

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        error!(origin = %cors_origin, "cors-origin must be an http(s) origin");
        return None;
    }

    Some(url.origin().ascii_serialization())
}

/// Build ServerConfig from validated arguments.
pub fn build_config(
    args: &Args,
    db: Database,
    jwt_secret: String,
    cors_origin: String,
) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: jwt_secret.into_bytes(),
        cors_origin,
        scraper: ScraperConfig {
            program: args.scraper_program.clone(),
            args: args.scraper_args.clone(),
            timeout: Duration::from_secs(args.scraper_timeout),
        },
        auth_rate_limit_per_minute: args.auth_rate_limit,
    }
}

/// Open the database, logging errors if it fails.
pub async fn open_database(path: &str) -> Option<Database> {
    match Database::open(path).await {
        Ok(db) => {
            info!(path = %path, "Database opened");
            Some(db)
        }
        Err(e) => {
            error!(path = %path, error = %e, "Failed to open database");
            None
        }
    }
}
