#![allow(dead_code)]

use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use recipebook::{ServerConfig, create_app, db::Database, scraper::ScraperConfig};
use serde_json::{Value, json};
use tower::ServiceExt;

pub const TEST_SECRET: &[u8] = b"test-jwt-secret-that-is-long-enough";

pub fn test_config(db: Database) -> ServerConfig {
    ServerConfig {
        db,
        jwt_secret: TEST_SECRET.to_vec(),
        cors_origin: "http://localhost:3000".to_string(),
        scraper: ScraperConfig::default(),
        auth_rate_limit_per_minute: 1000,
    }
}

pub async fn create_test_app() -> (Router, Database) {
    let db = Database::open(":memory:")
        .await
        .expect("Failed to open test database");
    let app = create_app(&test_config(db.clone()));
    (app, db)
}

/// Tokens of a logged-in member, as a browser would hold them.
#[derive(Debug, Clone)]
pub struct Session {
    pub access: String,
    pub refresh: String,
}

pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
}

impl TestResponse {
    /// Bearer token from the `Authorization` response header.
    pub fn access_token(&self) -> Option<String> {
        self.headers
            .get(header::AUTHORIZATION)?
            .to_str()
            .ok()?
            .strip_prefix("Bearer ")
            .map(str::to_string)
    }

    /// Raw `Authorization` response header.
    pub fn authorization(&self) -> Option<&str> {
        self.headers.get(header::AUTHORIZATION)?.to_str().ok()
    }

    /// All `Set-Cookie` values.
    pub fn set_cookies(&self) -> Vec<String> {
        self.headers
            .get_all(header::SET_COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok().map(str::to_string))
            .collect()
    }

    /// Value of the refresh cookie being set, if any (empty when cleared).
    pub fn refresh_cookie(&self) -> Option<String> {
        self.set_cookies().iter().find_map(|cookie| {
            let value = cookie.strip_prefix("refreshToken=")?;
            Some(value.split(';').next().unwrap_or("").to_string())
        })
    }

    pub fn session(&self) -> Session {
        Session {
            access: self.access_token().expect("no access token"),
            refresh: self.refresh_cookie().expect("no refresh cookie"),
        }
    }
}

pub fn request(
    method: &str,
    uri: &str,
    body: Option<Value>,
    session: Option<&Session>,
) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(session) = session {
        builder = builder
            .header(header::AUTHORIZATION, format!("Bearer {}", session.access))
            .header(header::COOKIE, format!("refreshToken={}", session.refresh));
    }
    match body {
        Some(body) => builder
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

pub async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| Value::String(String::from_utf8_lossy(&bytes).into_owned()))
    };
    TestResponse {
        status,
        headers,
        body,
    }
}

pub async fn sign_up(app: &Router, emailaddress: &str, password: &str) -> Session {
    let response = send(
        app,
        request(
            "POST",
            "/v1/member",
            Some(json!({
                "firstname": "Test",
                "lastname": "Member",
                "emailaddress": emailaddress,
                "password": password
            })),
            None,
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.session()
}

pub fn pancakes() -> Value {
    json!({
        "title": "Pancakes",
        "description": "Fluffy pancakes",
        "rating": 4,
        "effort": 2,
        "measurementsystemid": 1,
        "recipecategories": [1, 4],
        "recipeingredients": [
            { "title": "Flour", "measurementtypeid": 1, "measurementunitid": 1, "measurementamount": 250 },
            { "title": "Milk", "measurementtypeid": 2, "measurementunitid": 3, "measurementamount": 300.5 }
        ],
        "recipeinstructions": ["Mix", "Fry"],
        "recipetimers": [{ "title": "Rest", "minutes": 30 }]
    })
}

pub async fn create_recipe(app: &Router, session: &Session, body: Value) -> i64 {
    let response = send(app, request("POST", "/v1/recipe", Some(body), Some(session))).await;
    assert_eq!(response.status, StatusCode::CREATED, "{:?}", response.body);
    response.body["data"]["id"].as_i64().expect("no recipe id")
}
