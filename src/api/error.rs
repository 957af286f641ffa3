//! Shared error handling for API endpoints.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

/// Extension trait for concise error mapping on Results.
pub trait ResultExt<T> {
    fn db_err(self, msg: &str) -> Result<T, ApiError>;
    fn internal_err(self, msg: &str) -> Result<T, ApiError>;
}

impl<T, E: std::fmt::Display> ResultExt<T> for Result<T, E> {
    fn db_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::db_error(msg, e))
    }
    fn internal_err(self, msg: &str) -> Result<T, ApiError> {
        self.map_err(|e| ApiError::internal_error(msg, e))
    }
}

/// API error type with automatic response conversion.
#[derive(Debug)]
pub enum ApiError {
    BadRequest(String),
    NotFound(String),
    Unauthorized(String),
    Conflict(String),
    Internal(String),
}

impl ApiError {
    pub fn bad_request(msg: impl Into<String>) -> Self {
        Self::BadRequest(msg.into())
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::NotFound(msg.into())
    }

    pub fn unauthorized(msg: impl Into<String>) -> Self {
        Self::Unauthorized(msg.into())
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::Conflict(msg.into())
    }

    pub fn db_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!(error = %e, "Database error: {}", context);
        Self::Internal(context.into())
    }

    pub fn internal_error(context: &str, e: impl std::fmt::Display) -> Self {
        error!("{}: {}", context, e);
        Self::Internal(context.into())
    }

    /// Like [`ApiError::db_error`], except that a write rejected for
    /// naming an unknown reference row is the client's fault.
    pub fn from_store(context: &str, e: sqlx::Error) -> Self {
        let foreign_key = e
            .as_database_error()
            .is_some_and(|db| db.is_foreign_key_violation());
        if foreign_key {
            return Self::BadRequest("Request references an unknown id".into());
        }
        Self::db_error(context, e)
    }
}

#[derive(Serialize)]
pub struct MessageResponse {
    pub message: String,
}

impl MessageResponse {
    pub fn new(message: impl Into<String>) -> Json<Self> {
        Json(Self {
            message: message.into(),
        })
    }
}

/// Success envelope: `{"data": ...}`.
#[derive(Serialize)]
pub struct DataResponse<T> {
    pub data: T,
}

impl<T: Serialize> DataResponse<T> {
    pub fn new(data: T) -> Json<Self> {
        Json(Self { data })
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, msg),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, msg),
            ApiError::Conflict(msg) => (StatusCode::CONFLICT, msg),
            ApiError::Internal(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg),
        };
        (status, MessageResponse::new(message)).into_response()
    }
}

/// Unwrap a JSON request body that must be an object.
pub fn into_object(
    value: serde_json::Value,
) -> Result<serde_json::Map<String, serde_json::Value>, ApiError> {
    match value {
        serde_json::Value::Object(map) => Ok(map),
        _ => Err(ApiError::bad_request("Request body must be a JSON object")),
    }
}

/// Names from `required` that are not keys of `body`.
pub fn missing_fields<'a>(
    body: &serde_json::Map<String, serde_json::Value>,
    required: &[&'a str],
) -> Vec<&'a str> {
    required
        .iter()
        .copied()
        .filter(|field| !body.contains_key(*field))
        .collect()
}

/// Reject a body that is missing any of the required top-level fields.
pub fn require_fields(
    body: &serde_json::Map<String, serde_json::Value>,
    required: &[&str],
) -> Result<(), ApiError> {
    let missing = missing_fields(body, required);
    if missing.is_empty() {
        Ok(())
    } else {
        Err(ApiError::bad_request(format!(
            "Required fields are missing: {}",
            missing.join(", ")
        )))
    }
}

/// Deserialize an already presence-checked body into its typed form.
pub fn parse_body<T: serde::de::DeserializeOwned>(
    body: serde_json::Map<String, serde_json::Value>,
) -> Result<T, ApiError> {
    serde_json::from_value(serde_json::Value::Object(body))
        .map_err(|e| ApiError::bad_request(format!("Invalid request body: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn object(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        match value {
            serde_json::Value::Object(map) => map,
            _ => panic!("not an object"),
        }
    }

    #[test]
    fn test_missing_fields_keeps_order() {
        let body = object(json!({ "lastname": "Liddell" }));
        assert_eq!(
            missing_fields(&body, &["firstname", "lastname", "password"]),
            vec!["firstname", "password"]
        );
    }

    #[test]
    fn test_null_counts_as_present() {
        let body = object(json!({ "firstname": null }));
        assert!(require_fields(&body, &["firstname"]).is_ok());
    }

    #[test]
    fn test_require_fields_message() {
        let body = object(json!({ "title": "x" }));
        match require_fields(&body, &["title", "description", "measurementsystemid"]) {
            Err(ApiError::BadRequest(msg)) => assert_eq!(
                msg,
                "Required fields are missing: description, measurementsystemid"
            ),
            other => panic!("unexpected: {:?}", other),
        }
    }
}
