//! Recipe endpoints. Every route requires authentication and a member
//! may only see or change their own recipes.
//!
//! - GET `/v1/recipe` - List own recipes (filtered, paged)
//! - POST `/v1/recipe` - Create a recipe
//! - GET/PUT/DELETE `/v1/recipe/{recipeId}` - Single recipe
//! - POST `/v1/recipe/scrape` - Draft a recipe from a web page

use axum::{
    Json, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{
    ApiError, DataResponse, MessageResponse, ResultExt, into_object, missing_fields, parse_body,
    require_fields,
};
use crate::auth::{AuthenticatedMember, authenticate_member};
use crate::db::{
    Database, NewIngredient, NewRecipe, NewTimer, RecipeDetail, RecipeFilter, RecipeUpdate,
    SortOrder,
};
use crate::jwt::JwtConfig;
use crate::scraper::{self, ScrapeError, ScraperConfig};

const DEFAULT_PAGE_SIZE: u32 = 10;
const MAX_PAGE_SIZE: u32 = 100;

const INGREDIENT_FIELDS: &[&str] = &[
    "title",
    "measurementunitid",
    "measurementtypeid",
    "measurementamount",
];

#[derive(Clone)]
pub struct RecipesState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub scraper: Arc<ScraperConfig>,
}

pub fn router(state: RecipesState) -> Router {
    Router::new()
        .route("/", get(list_recipes).post(create_recipe))
        .route("/scrape", post(scrape_recipe))
        .route(
            "/{recipe_id}",
            get(get_recipe).put(update_recipe).delete(delete_recipe),
        )
        .with_state(state.clone())
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            authenticate_member,
        ))
}

#[derive(Debug, Deserialize)]
struct ListRecipesQuery {
    rating: Option<String>,
    effort: Option<String>,
    categories: Option<String>,
    #[serde(rename = "orderBy")]
    order_by: Option<String>,
    page: Option<String>,
    #[serde(rename = "pageSize")]
    page_size: Option<String>,
}

impl ListRecipesQuery {
    /// Unparseable values fall back to their defaults.
    fn into_filter(self, member_id: i64) -> RecipeFilter {
        let number = |value: Option<String>| value.and_then(|v| v.trim().parse::<i64>().ok());

        let category_ids = self
            .categories
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .filter_map(|id| id.trim().parse::<i64>().ok())
            .collect();

        let order = match self.order_by.as_deref() {
            Some("asc") => SortOrder::Asc,
            _ => SortOrder::Desc,
        };

        let page = number(self.page)
            .filter(|p| *p >= 1)
            .and_then(|p| u32::try_from(p).ok())
            .unwrap_or(1);

        let page_size = number(self.page_size)
            .filter(|s| *s >= 1)
            .map(|s| s.min(i64::from(MAX_PAGE_SIZE)) as u32)
            .unwrap_or(DEFAULT_PAGE_SIZE);

        RecipeFilter {
            member_id,
            min_rating: number(self.rating).unwrap_or(0),
            min_effort: number(self.effort).unwrap_or(0),
            category_ids,
            order,
            page,
            page_size,
        }
    }
}

#[derive(Serialize)]
struct ListMeta {
    #[serde(rename = "totalCount")]
    total_count: i64,
}

#[derive(Serialize)]
struct ListRecipesResponse {
    data: Vec<RecipeDetail>,
    meta: ListMeta,
}

async fn list_recipes(
    State(state): State<RecipesState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Query(query): Query<ListRecipesQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let filter = query.into_filter(member_id);

    let page = state
        .db
        .recipes()
        .list_by_member(&filter)
        .await
        .db_err("Error getting recipes")?;

    Ok(Json(ListRecipesResponse {
        data: page.recipes,
        meta: ListMeta {
            total_count: page.total_count,
        },
    }))
}

fn parse_recipe_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::bad_request("Invalid recipe id"))
}

/// Load a recipe and check that it belongs to the caller.
async fn owned_recipe(
    state: &RecipesState,
    member_id: i64,
    recipe_id: i64,
) -> Result<RecipeDetail, ApiError> {
    let recipe = state
        .db
        .recipes()
        .get_by_id(recipe_id)
        .await
        .db_err("Error getting recipe")?
        .ok_or_else(|| ApiError::not_found("Recipe not found"))?;

    if recipe.recipe.member_id != member_id {
        warn!(member_id, recipe_id, "Recipe access by non-owner");
        return Err(ApiError::unauthorized(
            "Unauthorised: This recipe does not belong to you",
        ));
    }

    Ok(recipe)
}

async fn get_recipe(
    State(state): State<RecipesState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Path(recipe_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let recipe = owned_recipe(&state, member_id, recipe_id).await?;
    Ok(DataResponse::new(recipe))
}

/// Collect `index: { missing, fields }` entries for a list of child objects.
fn missing_in_children(items: &[serde_json::Value], required: &[&str], timed: bool) -> Vec<String> {
    let empty = serde_json::Map::new();
    items
        .iter()
        .enumerate()
        .filter_map(|(index, item)| {
            let item = item.as_object().unwrap_or(&empty);
            let mut missing: Vec<&str> = missing_fields(item, required);
            if timed && !item.contains_key("hours") && !item.contains_key("minutes") {
                missing.push("hours or minutes");
            }
            (!missing.is_empty()).then(|| format!("{}: {{ {} }}", index, missing.join(", ")))
        })
        .collect()
}

/// Check every ingredient and timer in the body for its required fields.
fn validate_children(body: &serde_json::Map<String, serde_json::Value>) -> Result<(), ApiError> {
    if let Some(serde_json::Value::Array(items)) = body.get("recipeingredients") {
        let missing = missing_in_children(items, INGREDIENT_FIELDS, false);
        if !missing.is_empty() {
            return Err(ApiError::bad_request(format!(
                "Required fields are missing in recipeingredients: {}",
                missing.join(", ")
            )));
        }
    }

    if let Some(serde_json::Value::Array(items)) = body.get("recipetimers") {
        let missing = missing_in_children(items, &["title"], true);
        if !missing.is_empty() {
            return Err(ApiError::bad_request(format!(
                "Required fields are missing in recipetimers: {}",
                missing.join(", ")
            )));
        }
    }

    Ok(())
}

#[derive(Deserialize)]
struct IngredientBody {
    title: String,
    measurementtypeid: i64,
    measurementunitid: i64,
    measurementamount: f64,
}

impl From<IngredientBody> for NewIngredient {
    fn from(body: IngredientBody) -> Self {
        Self {
            title: body.title,
            measurement_type_id: body.measurementtypeid,
            measurement_unit_id: body.measurementunitid,
            measurement_amount: body.measurementamount,
        }
    }
}

#[derive(Deserialize)]
struct TimerBody {
    title: String,
    #[serde(default)]
    hours: Option<i64>,
    #[serde(default)]
    minutes: Option<i64>,
}

impl From<TimerBody> for NewTimer {
    fn from(body: TimerBody) -> Self {
        Self {
            title: body.title,
            hours: body.hours.unwrap_or(0),
            minutes: body.minutes.unwrap_or(0),
        }
    }
}

#[derive(Deserialize)]
struct CreateRecipeRequest {
    title: String,
    description: String,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    rating: Option<i64>,
    #[serde(default)]
    effort: Option<i64>,
    measurementsystemid: i64,
    #[serde(default)]
    recipecategories: Option<Vec<i64>>,
    recipeingredients: Vec<IngredientBody>,
    recipeinstructions: Vec<String>,
    #[serde(default)]
    recipetimers: Option<Vec<TimerBody>>,
}

#[derive(Serialize)]
struct CreatedRecipe {
    id: i64,
}

#[derive(Serialize)]
struct CreateRecipeResponse {
    message: &'static str,
    data: CreatedRecipe,
}

async fn create_recipe(
    State(state): State<RecipesState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let body = into_object(body)?;

    if body.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "data": {
                    "title": "string",
                    "description": "string",
                    "image": "string (optional)",
                    "rating": "integer (optional)",
                    "effort": "integer (optional)",
                    "measurementsystemid": "integer",
                    "recipecategories": "integer[] (optional)",
                    "recipeingredients": "[{ title: string, measurementtypeid: integer, measurementunitid: integer, measurementamount: float }]",
                    "recipeinstructions": "string[]",
                    "recipetimers": "[{ title: string, hours: integer (optional), minutes: integer (optional) }] (optional)"
                }
            })),
        )
            .into_response());
    }

    require_fields(
        &body,
        &[
            "title",
            "description",
            "measurementsystemid",
            "recipeingredients",
            "recipeinstructions",
        ],
    )?;
    validate_children(&body)?;
    let payload: CreateRecipeRequest = parse_body(body)?;

    let recipe = NewRecipe {
        member_id,
        title: payload.title,
        description: payload.description,
        image: payload.image,
        rating: payload.rating.unwrap_or(0),
        effort: payload.effort.unwrap_or(0),
        measurement_system_id: payload.measurementsystemid,
        categories: payload.recipecategories.unwrap_or_default(),
        ingredients: payload
            .recipeingredients
            .into_iter()
            .map(NewIngredient::from)
            .collect(),
        instructions: payload.recipeinstructions,
        timers: payload
            .recipetimers
            .unwrap_or_default()
            .into_iter()
            .map(NewTimer::from)
            .collect(),
    };

    let recipe_id = state
        .db
        .recipes()
        .create(&recipe)
        .await
        .map_err(|e| ApiError::from_store("Error creating recipe", e))?;

    info!(member_id, recipe_id, "Recipe created");

    Ok((
        StatusCode::CREATED,
        Json(CreateRecipeResponse {
            message: "Recipe successfully created",
            data: CreatedRecipe { id: recipe_id },
        }),
    )
        .into_response())
}

#[derive(Deserialize)]
struct UpdateRecipeRequest {
    title: Option<String>,
    description: Option<String>,
    image: Option<String>,
    rating: Option<i64>,
    effort: Option<i64>,
    measurementsystemid: Option<i64>,
    recipecategories: Option<Vec<i64>>,
    recipeingredients: Option<Vec<IngredientBody>>,
    recipeinstructions: Option<Vec<String>>,
    recipetimers: Option<Vec<TimerBody>>,
}

async fn update_recipe(
    State(state): State<RecipesState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Path(recipe_id): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    let body = into_object(body)?;

    if body.is_empty() {
        return Ok((
            StatusCode::OK,
            Json(json!({
                "data": {
                    "title": "string (optional)",
                    "description": "string (optional)",
                    "image": "string (optional)",
                    "rating": "integer (optional)",
                    "effort": "integer (optional)",
                    "measurementsystemid": "integer (optional)",
                    "recipecategories": "integer[] (optional)",
                    "recipeingredients": "[{ title: string, measurementtypeid: integer, measurementunitid: integer, measurementamount: float }] (optional)",
                    "recipeinstructions": "string[] (optional)",
                    "recipetimers": "[{ title: string, hours: integer (optional), minutes: integer (optional) }] (optional)"
                }
            })),
        )
            .into_response());
    }

    owned_recipe(&state, member_id, recipe_id).await?;
    validate_children(&body)?;
    let payload: UpdateRecipeRequest = parse_body(body)?;

    // Empty collections leave the stored rows untouched.
    let update = RecipeUpdate {
        title: payload.title,
        description: payload.description,
        image: payload.image,
        rating: payload.rating,
        effort: payload.effort,
        measurement_system_id: payload.measurementsystemid,
        categories: payload.recipecategories.filter(|c| !c.is_empty()),
        ingredients: payload
            .recipeingredients
            .filter(|i| !i.is_empty())
            .map(|i| i.into_iter().map(NewIngredient::from).collect()),
        instructions: payload.recipeinstructions.filter(|i| !i.is_empty()),
        timers: payload
            .recipetimers
            .filter(|t| !t.is_empty())
            .map(|t| t.into_iter().map(NewTimer::from).collect()),
    };

    state
        .db
        .recipes()
        .update(recipe_id, &update)
        .await
        .map_err(|e| ApiError::from_store("Error updating recipe", e))?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn delete_recipe(
    State(state): State<RecipesState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Path(recipe_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let recipe_id = parse_recipe_id(&recipe_id)?;
    owned_recipe(&state, member_id, recipe_id).await?;

    state
        .db
        .recipes()
        .delete(recipe_id)
        .await
        .db_err("Error deleting recipe")?;

    info!(member_id, recipe_id, "Recipe deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ScrapeRequest {
    #[serde(rename = "recipeUrl")]
    recipe_url: Option<String>,
}

async fn scrape_recipe(
    State(state): State<RecipesState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let payload: ScrapeRequest = parse_body(into_object(body)?)?;

    let Some(recipe_url) = payload.recipe_url.filter(|u| !u.trim().is_empty()) else {
        return Err(ApiError::bad_request("recipeUrl is required"));
    };

    match scraper::scrape(&state.scraper, &recipe_url).await {
        Ok(draft) => {
            info!(member_id, url = %recipe_url, "Recipe scraped");
            Ok(DataResponse::new(draft).into_response())
        }
        Err(e @ ScrapeError::InvalidUrl(_)) => Err(ApiError::bad_request(e.public_message())),
        Err(e) => {
            warn!(member_id, url = %recipe_url, error = %e, "Recipe scrape failed");
            Ok((
                StatusCode::INTERNAL_SERVER_ERROR,
                MessageResponse::new(e.public_message()),
            )
                .into_response())
        }
    }
}
