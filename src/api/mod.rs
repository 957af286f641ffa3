mod enums;
mod error;
mod members;
mod recipes;

use axum::Router;
use std::sync::Arc;

use crate::db::Database;
use crate::jwt::JwtConfig;
use crate::rate_limit::RateLimitConfig;
use crate::scraper::ScraperConfig;

pub use error::{ApiError, DataResponse, MessageResponse};

/// Create the versioned API router.
pub fn create_api_router(
    db: Database,
    jwt: Arc<JwtConfig>,
    scraper: Arc<ScraperConfig>,
    rate_limit_config: Arc<RateLimitConfig>,
) -> Router {
    let enums_state = enums::EnumsState { db: db.clone() };

    let members_state = members::MembersState {
        db: db.clone(),
        jwt: jwt.clone(),
        rate_limit_config,
    };

    let recipes_state = recipes::RecipesState { db, jwt, scraper };

    Router::new()
        .nest("/enum", enums::router(enums_state))
        .nest("/member", members::router(members_state))
        .nest("/recipe", recipes::router(recipes_state))
}
