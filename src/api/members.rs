//! Member account endpoints.
//!
//! - POST `/v1/member` - Sign up (starts a session)
//! - POST `/v1/member/login` - Log in (starts a session)
//! - POST `/v1/member/logout` - End the session
//! - PUT `/v1/member/password/reset` - Request a password reset token
//! - PUT `/v1/member/password/reset/{token}` - Set a new password with a reset token
//! - GET/PUT/DELETE `/v1/member` - Current member (authenticated)
//! - PUT `/v1/member/password/update` - Change password (authenticated)
//! - PUT `/v1/member/settings` - Change preferences (authenticated)

use axum::{
    Json, Router,
    extract::{Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;
use tracing::{info, warn};

use super::error::{
    ApiError, DataResponse, MessageResponse, ResultExt, into_object, parse_body, require_fields,
};
use crate::auth::{AuthenticatedMember, authenticate_member, end_session, start_session};
use crate::db::{Database, MemberSettings, MemberUpdate, NewMember, SettingsUpdate};
use crate::jwt::JwtConfig;
use crate::password::{hash_password, verify_password};
use crate::rate_limit::{RateLimitConfig, rate_limit_auth};

#[derive(Clone)]
pub struct MembersState {
    pub db: Database,
    pub jwt: Arc<JwtConfig>,
    pub rate_limit_config: Arc<RateLimitConfig>,
}

pub fn router(state: MembersState) -> Router {
    let credentials = Router::new()
        .route("/", post(create_member))
        .route("/login", post(login_member))
        .route("/password/reset", put(reset_member_password))
        .with_state(state.clone())
        .route_layer(middleware::from_fn_with_state(
            state.rate_limit_config.clone(),
            rate_limit_auth,
        ));

    let public = Router::new()
        .route("/logout", post(logout_member))
        .route("/password/reset/{token}", put(confirm_reset_member_password))
        .with_state(state.clone());

    let protected = Router::new()
        .route(
            "/",
            get(get_member).put(update_member).delete(delete_member),
        )
        .route("/password/update", put(update_member_password))
        .route("/settings", put(update_member_settings))
        .with_state(state.clone())
        .route_layer(middleware::from_fn_with_state(
            state.jwt.clone(),
            authenticate_member,
        ));

    Router::new()
        .merge(credentials)
        .merge(public)
        .merge(protected)
}

fn schema_hint(schema: serde_json::Value) -> Response {
    (StatusCode::OK, Json(json!({ "data": schema }))).into_response()
}

#[derive(Deserialize)]
struct SignUpRequest {
    firstname: String,
    lastname: String,
    emailaddress: String,
    password: String,
    #[serde(default)]
    ispremium: bool,
}

async fn create_member(
    State(state): State<MembersState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let body = into_object(body)?;

    if body.is_empty() {
        return Ok(schema_hint(json!({
            "firstname": "string",
            "lastname": "string",
            "emailaddress": "string",
            "password": "string",
            "ispremium": "boolean (optional)"
        })));
    }

    require_fields(&body, &["firstname", "lastname", "emailaddress", "password"])?;
    let payload: SignUpRequest = parse_body(body)?;

    let taken = state
        .db
        .members()
        .email_taken(&payload.emailaddress)
        .await
        .db_err("Error creating member")?;

    if taken {
        return Err(ApiError::conflict("Member already exists"));
    }

    let password_hash =
        hash_password(&payload.password).internal_err("Error creating member")?;

    let member_id = state
        .db
        .members()
        .create(&NewMember {
            firstname: &payload.firstname,
            lastname: &payload.lastname,
            emailaddress: &payload.emailaddress,
            password_hash: &password_hash,
            ispremium: payload.ispremium,
        })
        .await
        .db_err("Error creating member")?;

    let session = start_session(&state.jwt, member_id).internal_err("Error creating member")?;

    info!(member_id, "Member created");

    Ok((
        StatusCode::CREATED,
        session,
        MessageResponse::new("Member successfully created"),
    )
        .into_response())
}

#[derive(Deserialize)]
struct LoginRequest {
    emailaddress: String,
    password: String,
}

async fn login_member(
    State(state): State<MembersState>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let body = into_object(body)?;
    require_fields(&body, &["emailaddress", "password"])?;
    let payload: LoginRequest = parse_body(body)?;

    let Some(member) = state
        .db
        .members()
        .get_by_email(&payload.emailaddress)
        .await
        .db_err("Error logging in member")?
    else {
        return Err(ApiError::unauthorized("Invalid credentials"));
    };

    let matches = verify_password(&payload.password, &member.password_hash)
        .internal_err("Error logging in member")?;

    if !matches {
        warn!(member_id = member.id, "Failed login attempt");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let session = start_session(&state.jwt, member.id).internal_err("Error logging in member")?;

    info!(member_id = member.id, "Member logged in");

    Ok((StatusCode::NO_CONTENT, session).into_response())
}

/// Always succeeds. Tokens are stateless, so ending the session means
/// blanking the bearer header and expiring the refresh cookie.
async fn logout_member() -> impl IntoResponse {
    (StatusCode::NO_CONTENT, end_session())
}

#[derive(Deserialize)]
struct ResetRequest {
    emailaddress: Option<String>,
}

async fn reset_member_password(
    State(state): State<MembersState>,
    Json(body): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    let payload: ResetRequest = parse_body(into_object(body)?)?;

    let Some(emailaddress) = payload.emailaddress.filter(|e| !e.is_empty()) else {
        return Err(ApiError::bad_request("Email address is required"));
    };

    let member = state
        .db
        .members()
        .get_by_email(&emailaddress)
        .await
        .db_err("Error resetting password")?
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    let reset = state
        .jwt
        .generate_password_reset_token(member.id)
        .internal_err("Error resetting password")?;

    // No mail transport: the operator forwards the link.
    info!(
        member_id = member.id,
        expires_at = reset.expires_at,
        "Password reset requested: /v1/member/password/reset/{}",
        reset.token
    );

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct ConfirmResetRequest {
    #[serde(rename = "newPassword")]
    new_password: Option<String>,
}

async fn confirm_reset_member_password(
    State(state): State<MembersState>,
    Path(token): Path<String>,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let payload: ConfirmResetRequest = parse_body(into_object(body)?)?;

    let Some(new_password) = payload.new_password.filter(|p| !p.is_empty()) else {
        return Err(ApiError::bad_request("Both token and newPassword are required"));
    };

    let claims = state
        .jwt
        .validate_password_reset_token(&token)
        .map_err(|e| {
            warn!(error = %e, "Rejected password reset token");
            ApiError::unauthorized("Invalid or expired token")
        })?;

    let member = state
        .db
        .members()
        .get_by_id(claims.member_id)
        .await
        .db_err("Error updating password")?
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    let password_hash =
        hash_password(&new_password).internal_err("Error updating password")?;

    state
        .db
        .members()
        .update_password(member.id, &password_hash)
        .await
        .db_err("Error updating password")?;

    let session = start_session(&state.jwt, member.id).internal_err("Error updating password")?;

    info!(member_id = member.id, "Password reset completed");

    Ok((StatusCode::NO_CONTENT, session).into_response())
}

#[derive(Serialize)]
struct MemberResponse {
    id: i64,
    firstname: String,
    lastname: String,
    emailaddress: String,
    ispremium: bool,
    createdat: String,
    membersettings: Option<MemberSettings>,
}

async fn get_member(
    State(state): State<MembersState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
) -> Result<impl IntoResponse, ApiError> {
    let member = state
        .db
        .members()
        .get_by_id(member_id)
        .await
        .db_err("Error getting member by ID")?
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    let membersettings = state
        .db
        .members()
        .get_settings(member_id)
        .await
        .db_err("Error getting member by ID")?;

    Ok(DataResponse::new(MemberResponse {
        id: member.id,
        firstname: member.firstname,
        lastname: member.lastname,
        emailaddress: member.emailaddress,
        ispremium: member.ispremium,
        createdat: member.created_at,
        membersettings,
    }))
}

#[derive(Deserialize)]
struct UpdateMemberRequest {
    firstname: Option<String>,
    lastname: Option<String>,
    emailaddress: Option<String>,
    ispremium: Option<bool>,
}

async fn update_member(
    State(state): State<MembersState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let body = into_object(body)?;

    if body.is_empty() {
        return Ok(schema_hint(json!({
            "firstname": "string (optional)",
            "lastname": "string (optional)",
            "emailaddress": "string (optional)",
            "ispremium": "boolean (optional)"
        })));
    }

    let payload: UpdateMemberRequest = parse_body(body)?;

    let member = state
        .db
        .members()
        .get_by_id(member_id)
        .await
        .db_err("Error updating member")?
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    if let Some(emailaddress) = &payload.emailaddress {
        if !emailaddress.eq_ignore_ascii_case(&member.emailaddress) {
            let taken = state
                .db
                .members()
                .email_taken(emailaddress)
                .await
                .db_err("Error updating member")?;
            if taken {
                return Err(ApiError::conflict("Email address is already in use"));
            }
        }
    }

    state
        .db
        .members()
        .update(
            member_id,
            &MemberUpdate {
                firstname: payload.firstname,
                lastname: payload.lastname,
                emailaddress: payload.emailaddress,
                ispremium: payload.ispremium,
            },
        )
        .await
        .db_err("Error updating member")?;

    Ok(StatusCode::NO_CONTENT.into_response())
}

async fn delete_member(
    State(state): State<MembersState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
) -> Result<StatusCode, ApiError> {
    let deleted = state
        .db
        .members()
        .delete(member_id)
        .await
        .db_err("Error deleting member")?;

    if !deleted {
        return Err(ApiError::not_found("Member not found"));
    }

    info!(member_id, "Member deleted");
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct UpdatePasswordRequest {
    #[serde(rename = "currentPassword")]
    current_password: Option<String>,
    #[serde(rename = "newPassword")]
    new_password: Option<String>,
}

async fn update_member_password(
    State(state): State<MembersState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Json(body): Json<serde_json::Value>,
) -> Result<StatusCode, ApiError> {
    let payload: UpdatePasswordRequest = parse_body(into_object(body)?)?;

    let (Some(current_password), Some(new_password)) = (
        payload.current_password.filter(|p| !p.is_empty()),
        payload.new_password.filter(|p| !p.is_empty()),
    ) else {
        return Err(ApiError::bad_request(
            "Both currentPassword and newPassword are required",
        ));
    };

    let member = state
        .db
        .members()
        .get_by_id(member_id)
        .await
        .db_err("Error updating password")?
        .ok_or_else(|| ApiError::not_found("Member not found"))?;

    let matches = verify_password(&current_password, &member.password_hash)
        .internal_err("Error updating password")?;

    if !matches {
        return Err(ApiError::unauthorized("Current password is incorrect"));
    }

    let password_hash =
        hash_password(&new_password).internal_err("Error updating password")?;

    state
        .db
        .members()
        .update_password(member_id, &password_hash)
        .await
        .db_err("Error updating password")?;

    Ok(StatusCode::NO_CONTENT)
}

#[derive(Deserialize)]
struct UpdateSettingsRequest {
    theme: Option<i64>,
    measurementsystem: Option<i64>,
    usepantry: Option<bool>,
    usenegativepantry: Option<bool>,
    displaynutritionalinformation: Option<bool>,
}

async fn update_member_settings(
    State(state): State<MembersState>,
    AuthenticatedMember(member_id): AuthenticatedMember,
    Json(body): Json<serde_json::Value>,
) -> Result<Response, ApiError> {
    let body = into_object(body)?;

    if body.is_empty() {
        return Ok(schema_hint(json!({
            "theme": "integer (optional)",
            "measurementsystem": "integer (optional)",
            "usepantry": "boolean (optional)",
            "usenegativepantry": "boolean (optional)",
            "displaynutritionalinformation": "boolean (optional)"
        })));
    }

    let payload: UpdateSettingsRequest = parse_body(body)?;

    let updated = state
        .db
        .members()
        .update_settings(
            member_id,
            &SettingsUpdate {
                theme: payload.theme,
                measurementsystem: payload.measurementsystem,
                usepantry: payload.usepantry,
                usenegativepantry: payload.usenegativepantry,
                displaynutritionalinformation: payload.displaynutritionalinformation,
            },
        )
        .await
        .map_err(|e| ApiError::from_store("Error updating member settings", e))?;

    if !updated {
        return Err(ApiError::not_found("Member settings not found"));
    }

    Ok(StatusCode::NO_CONTENT.into_response())
}
