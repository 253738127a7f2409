use axum::{
    body::Body,
    http::{Request, StatusCode},
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use inventory_cell::router::inventory_routes;
use shared_models::auth::AuthContext;
use shared_models::BloodType;
use shared_utils::test_utils::{seed_stock, JwtTestUtils, TestConfig, TestHospital};

async fn body_json(response: axum::response::Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn availability_is_public() {
    let state = TestConfig::default().to_state().await;
    let hospital = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;
    seed_stock(&state.db, hospital, BloodType::BPositive, 7, Utc::now().date_naive() + Duration::days(14)).await;
    let app = inventory_routes(state);

    let request = Request::builder()
        .uri(format!("/availability/{}", hospital))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["availability"][0]["blood_type"], "B+");
    assert_eq!(json["availability"][0]["total_units"], 7);
}

#[tokio::test]
async fn unknown_hospital_availability_is_not_found() {
    let state = TestConfig::default().to_state().await;
    let app = inventory_routes(state);

    let request = Request::builder()
        .uri("/availability/404")
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn stocking_requires_a_token() {
    let state = TestConfig::default().to_state().await;
    let app = inventory_routes(state);

    let request = Request::builder()
        .method("POST")
        .uri("/")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({ "blood_type": "O+", "quantity": 2, "expiry_date": "2030-01-01" }).to_string(),
        ))
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn admin_token_cannot_list_hospital_stock() {
    let config = TestConfig::default();
    let state = config.to_state().await;
    let app = inventory_routes(state);
    let token = JwtTestUtils::create_test_token(&AuthContext::admin(1), &config.jwt_secret, None);

    let request = Request::builder()
        .uri("/")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
    assert!(body_json(response).await["error"].is_string());
}
