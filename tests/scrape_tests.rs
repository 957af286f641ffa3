mod common;

use std::time::Duration;

use axum::{Router, http::StatusCode};
use common::{request, send, sign_up, test_config};
use recipebook::{create_app, db::Database, scraper::ScraperConfig};
use serde_json::json;

async fn app_with_scraper(script: &str) -> Router {
    let db = Database::open(":memory:").await.unwrap();
    let mut config = test_config(db);
    config.scraper = ScraperConfig {
        program: "sh".to_string(),
        args: vec!["-c".to_string(), script.to_string()],
        timeout: Duration::from_secs(5),
    };
    create_app(&config)
}

#[tokio::test]
async fn test_scrape_returns_draft() {
    let app = app_with_scraper(
        r#"printf '{"host":"example.com","title":"Stew","total_time":90,"yields":"6 servings","ingredients":["1 kg beef"],"instructions_list":["Brown","Simmer"],"nutrients":{"proteinContent":"30 g"}}'"#,
    )
    .await;
    let session = sign_up(&app, "cook@example.com", "pw").await;

    let response = send(
        &app,
        request(
            "POST",
            "/v1/recipe/scrape",
            Some(json!({ "recipeUrl": "https://example.com/stew" })),
            Some(&session),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::OK);
    let data = &response.body["data"];
    assert_eq!(data["title"], "Stew");
    assert_eq!(
        data["description"],
        "Recipe retrieved from example.com.\nYields 6 servings.\nTotal time 90 minutes.\nNutrients:\n\tprotein content: 30 g"
    );
    assert_eq!(data["image"], serde_json::Value::Null);
    assert_eq!(data["recipeingredients"], json!(["1 kg beef"]));
    assert_eq!(data["recipeinstructions"], json!(["Brown", "Simmer"]));
}

#[tokio::test]
async fn test_scraper_failure_is_500() {
    let app = app_with_scraper("exit 3").await;
    let session = sign_up(&app, "cook@example.com", "pw").await;

    let response = send(
        &app,
        request(
            "POST",
            "/v1/recipe/scrape",
            Some(json!({ "recipeUrl": "https://example.com/stew" })),
            Some(&session),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "Error executing scraper");
}

#[tokio::test]
async fn test_scraper_garbage_output_is_500() {
    let app = app_with_scraper("echo not json").await;
    let session = sign_up(&app, "cook@example.com", "pw").await;

    let response = send(
        &app,
        request(
            "POST",
            "/v1/recipe/scrape",
            Some(json!({ "recipeUrl": "https://example.com/stew" })),
            Some(&session),
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["message"], "Error parsing JSON data");
}

#[tokio::test]
async fn test_scrape_requires_authentication() {
    let app = app_with_scraper("exit 0").await;

    let response = send(
        &app,
        request(
            "POST",
            "/v1/recipe/scrape",
            Some(json!({ "recipeUrl": "https://example.com/stew" })),
            None,
        ),
    )
    .await;

    assert_eq!(response.status, StatusCode::UNAUTHORIZED);
}
