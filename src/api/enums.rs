//! Public reference data, returned as bare JSON arrays.

use axum::{Json, Router, extract::State, response::IntoResponse, routing::get};

use super::error::{ApiError, ResultExt};
use crate::db::Database;

#[derive(Clone)]
pub struct EnumsState {
    pub db: Database,
}

pub fn router(state: EnumsState) -> Router {
    Router::new()
        .route("/categories", get(get_categories))
        .route("/measurement-systems", get(get_measurement_systems))
        .route("/measurement-types", get(get_measurement_types))
        .route("/measurement-units", get(get_measurement_units))
        .route("/themes", get(get_themes))
        .with_state(state)
}

async fn get_categories(State(state): State<EnumsState>) -> Result<impl IntoResponse, ApiError> {
    let categories = state
        .db
        .enums()
        .categories()
        .await
        .db_err("Error getting categories")?;
    Ok(Json(categories))
}

async fn get_measurement_systems(
    State(state): State<EnumsState>,
) -> Result<impl IntoResponse, ApiError> {
    let systems = state
        .db
        .enums()
        .measurement_systems()
        .await
        .db_err("Error getting measurement systems")?;
    Ok(Json(systems))
}

async fn get_measurement_types(
    State(state): State<EnumsState>,
) -> Result<impl IntoResponse, ApiError> {
    let types = state
        .db
        .enums()
        .measurement_types()
        .await
        .db_err("Error getting measurement types")?;
    Ok(Json(types))
}

async fn get_measurement_units(
    State(state): State<EnumsState>,
) -> Result<impl IntoResponse, ApiError> {
    let units = state
        .db
        .enums()
        .measurement_units()
        .await
        .db_err("Error getting measurement units")?;
    Ok(Json(units))
}

async fn get_themes(State(state): State<EnumsState>) -> Result<impl IntoResponse, ApiError> {
    let themes = state
        .db
        .enums()
        .themes()
        .await
        .db_err("Error getting themes")?;
    Ok(Json(themes))
}
