mod common;

use axum::http::StatusCode;
use common::{create_recipe, create_test_app, pancakes, request, send, sign_up};
use serde_json::json;

#[tokio::test]
async fn test_create_and_get_recipe() {
    let (app, _db) = create_test_app().await;
    let session = sign_up(&app, "cook@example.com", "pw").await;

    let id = create_recipe(&app, &session, pancakes()).await;

    let response = send(&app, request("GET", &format!("/v1/recipe/{}", id), None, Some(&session))).await;
    assert_eq!(response.status, StatusCode::OK);

    let data = &response.body["data"];
    assert_eq!(data["title"], "Pancakes");
    assert_eq!(data["measurementsystemid"], 1);
    assert_eq!(data["measurementsystem"]["name"], "Metric");
    assert_eq!(data["recipecategories"].as_array().unwrap().len(), 2);
    assert_eq!(data["recipeingredients"][1]["measurementamount"], 300.5);
    assert_eq!(data["recipeingredients"][1]["measurementunit"]["abbreviation"], "ml");
    assert_eq!(data["recipeinstructions"][0]["title"], "Mix");
    assert_eq!(data["recipetimers"][0]["hours"], 0);
    assert_eq!(data["recipetimers"][0]["minutes"], 30);
}

#[tokio::test]
async fn test_create_recipe_validation() {
    let (app, _db) = create_test_app().await;
    let session = sign_up(&app, "cook@example.com", "pw").await;

    let response = send(&app, request("POST", "/v1/recipe", Some(json!({})), Some(&session))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["recipeinstructions"], "string[]");

    let response = send(
        &app,
        request(
            "POST",
            "/v1/recipe",
            Some(json!({ "title": "Toast", "description": "Crispy" })),
            Some(&session),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["message"],
        "Required fields are missing: measurementsystemid, recipeingredients, recipeinstructions"
    );

    let mut body = pancakes();
    body["recipeingredients"][0]
        .as_object_mut()
        .unwrap()
        .remove("title");
    let response = send(&app, request("POST", "/v1/recipe", Some(body), Some(&session))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["message"],
        "Required fields are missing in recipeingredients: 0: { title }"
    );

    let mut body = pancakes();
    body["recipetimers"] = json!([{ "title": "Bake" }]);
    let response = send(&app, request("POST", "/v1/recipe", Some(body), Some(&session))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(
        response.body["message"],
        "Required fields are missing in recipetimers: 0: { hours or minutes }"
    );
}

#[tokio::test]
async fn test_create_recipe_unknown_unit() {
    let (app, _db) = create_test_app().await;
    let session = sign_up(&app, "cook@example.com", "pw").await;

    let mut body = pancakes();
    body["recipeingredients"][0]["measurementunitid"] = json!(999);
    let response = send(&app, request("POST", "/v1/recipe", Some(body), Some(&session))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);

    let response = send(&app, request("GET", "/v1/recipe", None, Some(&session))).await;
    assert_eq!(response.body["meta"]["totalCount"], 0);
}

#[tokio::test]
async fn test_recipes_are_private() {
    let (app, _db) = create_test_app().await;
    let owner = sign_up(&app, "owner@example.com", "pw").await;
    let other = sign_up(&app, "other@example.com", "pw").await;

    let id = create_recipe(&app, &owner, pancakes()).await;
    let uri = format!("/v1/recipe/{}", id);

    for (method, body) in [
        ("GET", None),
        ("PUT", Some(json!({ "title": "Stolen" }))),
        ("DELETE", None),
    ] {
        let response = send(&app, request(method, &uri, body, Some(&other))).await;
        assert_eq!(response.status, StatusCode::UNAUTHORIZED, "{}", method);
        assert_eq!(
            response.body["message"],
            "Unauthorised: This recipe does not belong to you"
        );
    }

    let response = send(&app, request("GET", "/v1/recipe", None, Some(&other))).await;
    assert_eq!(response.body["meta"]["totalCount"], 0);

    let response = send(&app, request("GET", &uri, None, Some(&owner))).await;
    assert_eq!(response.body["data"]["title"], "Pancakes");
}

#[tokio::test]
async fn test_unknown_recipe() {
    let (app, _db) = create_test_app().await;
    let session = sign_up(&app, "cook@example.com", "pw").await;

    let response = send(&app, request("GET", "/v1/recipe/12345", None, Some(&session))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
    assert_eq!(response.body["message"], "Recipe not found");

    let response = send(&app, request("GET", "/v1/recipe/abc", None, Some(&session))).await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_update_recipe() {
    let (app, _db) = create_test_app().await;
    let session = sign_up(&app, "cook@example.com", "pw").await;
    let id = create_recipe(&app, &session, pancakes()).await;
    let uri = format!("/v1/recipe/{}", id);

    let response = send(&app, request("PUT", &uri, Some(json!({})), Some(&session))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["data"]["title"], "string (optional)");

    let response = send(
        &app,
        request(
            "PUT",
            &uri,
            Some(json!({
                "title": "Crepes",
                "recipeinstructions": ["Whisk", "Rest", "Fry thin"],
                "recipeingredients": [],
                "recipetimers": [{ "title": "Rest", "hours": 1, "minutes": 15 }]
            })),
            Some(&session),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = send(&app, request("GET", &uri, None, Some(&session))).await;
    let data = &response.body["data"];
    assert_eq!(data["title"], "Crepes");
    assert_eq!(data["description"], "Fluffy pancakes");
    assert_eq!(data["recipeinstructions"].as_array().unwrap().len(), 3);
    // An empty list leaves the ingredients as they were.
    assert_eq!(data["recipeingredients"].as_array().unwrap().len(), 2);
    assert_eq!(data["recipetimers"][0]["hours"], 1);
    assert_eq!(data["recipetimers"][0]["minutes"], 15);
}

#[tokio::test]
async fn test_delete_recipe() {
    let (app, _db) = create_test_app().await;
    let session = sign_up(&app, "cook@example.com", "pw").await;
    let id = create_recipe(&app, &session, pancakes()).await;
    let uri = format!("/v1/recipe/{}", id);

    let response = send(&app, request("DELETE", &uri, None, Some(&session))).await;
    assert_eq!(response.status, StatusCode::NO_CONTENT);

    let response = send(&app, request("GET", &uri, None, Some(&session))).await;
    assert_eq!(response.status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_list_recipes_filters_and_pages() {
    let (app, _db) = create_test_app().await;
    let session = sign_up(&app, "cook@example.com", "pw").await;

    for rating in 1..=5 {
        let mut body = pancakes();
        body["title"] = json!(format!("Recipe {}", rating));
        body["rating"] = json!(rating);
        body["recipecategories"] = if rating % 2 == 0 { json!([2]) } else { json!([3]) };
        create_recipe(&app, &session, body).await;
    }

    let response = send(&app, request("GET", "/v1/recipe?rating=4", None, Some(&session))).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.body["meta"]["totalCount"], 2);

    let response = send(&app, request("GET", "/v1/recipe?categories=2", None, Some(&session))).await;
    assert_eq!(response.body["meta"]["totalCount"], 2);

    let response = send(&app, request("GET", "/v1/recipe?categories=2,3", None, Some(&session))).await;
    assert_eq!(response.body["meta"]["totalCount"], 5);

    let response = send(
        &app,
        request(
            "GET",
            "/v1/recipe?orderBy=asc&page=2&pageSize=2",
            None,
            Some(&session),
        ),
    )
    .await;
    assert_eq!(response.body["meta"]["totalCount"], 5);
    let titles: Vec<&str> = response.body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|r| r["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Recipe 3", "Recipe 4"]);

    let response = send(&app, request("GET", "/v1/recipe?pageSize=2", None, Some(&session))).await;
    assert_eq!(response.body["data"][0]["title"], "Recipe 5");
}

#[tokio::test]
async fn test_scrape_requires_url() {
    let (app, _db) = create_test_app().await;
    let session = sign_up(&app, "cook@example.com", "pw").await;

    let response = send(
        &app,
        request("POST", "/v1/recipe/scrape", Some(json!({})), Some(&session)),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "recipeUrl is required");

    let response = send(
        &app,
        request(
            "POST",
            "/v1/recipe/scrape",
            Some(json!({ "recipeUrl": "javascript:alert(1)" })),
            Some(&session),
        ),
    )
    .await;
    assert_eq!(response.status, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["message"], "Invalid recipe URL");
}
