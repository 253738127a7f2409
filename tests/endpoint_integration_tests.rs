// End-to-end checks against the assembled router, one in-memory store per test.

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tower::ServiceExt;

use blood_network_api::create_router;
use shared_models::auth::AuthContext;
use shared_models::BloodType;
use shared_utils::test_utils::{seed_stock, JwtTestUtils, TestConfig, TestHospital};

async fn send(app: &Router, method: &str, uri: &str, token: Option<&str>, body: Option<Value>) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or(Value::Null)
    };

    (status, json)
}

async fn register_and_login(app: &Router, name: &str, email: &str, city: &str) -> (i64, String) {
    let (status, body) = send(
        app,
        "POST",
        "/auth/hospitals/register",
        None,
        Some(json!({
            "name": name,
            "email": email,
            "password": "donate-blood-2025",
            "city": city
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    let id = body["hospital"]["id"].as_i64().unwrap();
    assert!(body["hospital"].get("password_hash").is_none());

    let (status, token) = send(
        app,
        "POST",
        "/auth/hospitals/login",
        None,
        Some(json!({ "email": email, "password": "donate-blood-2025" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{token}");
    assert_eq!(token["role"], "hospital");

    (id, token["access_token"].as_str().unwrap().to_string())
}

#[tokio::test]
async fn health_endpoints_respond() {
    let state = TestConfig::default().to_state().await;
    let app = create_router(state);

    let (status, body) = send(&app, "GET", "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");

    let response = app
        .oneshot(Request::builder().uri("/").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn register_login_and_verify() {
    let state = TestConfig::default().to_state().await;
    let app = create_router(state);

    let (id, token) = register_and_login(&app, "Apollo", "desk@apollo.example", "Ahmedabad").await;

    let (status, body) = send(&app, "GET", "/auth/verify", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["valid"], true);
    assert_eq!(body["subject_id"], id);

    let (status, body) = send(&app, "GET", "/hospitals/me", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["email"], "desk@apollo.example");

    let (status, body) = send(
        &app,
        "POST",
        "/auth/hospitals/login",
        None,
        Some(json!({ "email": "desk@apollo.example", "password": "wrong-password" })),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn duplicate_registration_is_a_conflict() {
    let state = TestConfig::default().to_state().await;
    let app = create_router(state);
    register_and_login(&app, "Apollo", "desk@apollo.example", "Ahmedabad").await;

    let (status, body) = send(
        &app,
        "POST",
        "/auth/hospitals/register",
        None,
        Some(json!({
            "name": "Apollo Again",
            "email": "desk@apollo.example",
            "password": "donate-blood-2025",
            "city": "Surat"
        })),
    )
    .await;

    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn protected_routes_require_a_valid_token() {
    let config = TestConfig::default();
    let state = config.to_state().await;
    let app = create_router(state);

    for uri in ["/inventory", "/appointments", "/transfers", "/emergency", "/dashboard", "/hospitals/network"] {
        let (status, body) = send(&app, "GET", uri, None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED, "{uri}");
        assert!(body["error"].is_string());
    }

    let expired = JwtTestUtils::create_expired_token(&AuthContext::hospital(1), &config.jwt_secret);
    let (status, _) = send(&app, "GET", "/inventory", Some(&expired), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let forged = JwtTestUtils::create_invalid_signature_token(&AuthContext::hospital(1));
    let (status, _) = send(&app, "GET", "/inventory", Some(&forged), None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn stock_then_public_availability() {
    let state = TestConfig::default().to_state().await;
    let app = create_router(state);
    let (id, token) = register_and_login(&app, "Apollo", "desk@apollo.example", "Ahmedabad").await;
    let expiry = Utc::now().date_naive() + Duration::days(30);

    for quantity in [6, 4] {
        let (status, body) = send(
            &app,
            "POST",
            "/inventory",
            Some(&token),
            Some(json!({ "blood_type": "AB-", "quantity": quantity, "expiry_date": expiry })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{body}");
    }

    let (status, body) = send(&app, "GET", "/inventory", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["inventory"][0]["quantity"], 10);
    assert_eq!(body["inventory"][0]["status"], "healthy");

    let (status, body) = send(&app, "GET", &format!("/inventory/availability/{id}"), None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["availability"][0]["blood_type"], "AB-");
    assert_eq!(body["availability"][0]["total_units"], 10);

    let (status, _) = send(
        &app,
        "POST",
        "/inventory",
        Some(&token),
        Some(json!({ "blood_type": "AB-", "quantity": -2, "expiry_date": expiry })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    // An oversized credit is refused and the bucket stays readable.
    let (status, _) = send(
        &app,
        "POST",
        "/inventory",
        Some(&token),
        Some(json!({ "blood_type": "AB-", "quantity": i64::MAX, "expiry_date": expiry })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    let (status, body) = send(&app, "GET", "/inventory", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["inventory"][0]["quantity"], 10);
}

#[tokio::test]
async fn public_booking_then_hospital_approval() {
    let state = TestConfig::default().to_state().await;
    let app = create_router(state);
    let (hospital_id, token) = register_and_login(&app, "Apollo", "desk@apollo.example", "Ahmedabad").await;

    let (status, body) = send(&app, "GET", "/hospitals/by-city/ahmedabad", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hospitals"][0]["id"], hospital_id);

    let preferred = (Utc::now() + Duration::days(2)).naive_utc();
    let (status, booking) = send(
        &app,
        "POST",
        "/appointments/book",
        None,
        Some(json!({
            "name": "Meera Shah",
            "age": 29,
            "gender": "female",
            "phone": "9876543210",
            "city": "Ahmedabad",
            "blood_type": "O-",
            "hospital_id": hospital_id,
            "preferred_time": preferred
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{booking}");
    assert_eq!(booking["status"], "Pending");
    assert_eq!(booking["new_donor"], true);
    assert_eq!(booking["rare_donor"], true);

    let appointment_id = booking["appointment_id"].as_i64().unwrap();

    let (status, body) = send(&app, "GET", "/appointments", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);
    assert_eq!(body["appointments"][0]["donor_name"], "Meera Shah");

    let (status, body) = send(&app, "POST", &format!("/appointments/{appointment_id}/approve"), Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["status"], "Approved");

    // Approved cannot be approved again.
    let (status, body) = send(&app, "POST", &format!("/appointments/{appointment_id}/approve"), Some(&token), None).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn booking_rejects_underage_donor() {
    let state = TestConfig::default().to_state().await;
    let app = create_router(state.clone());
    let hospital_id = TestHospital::new("Apollo", "Ahmedabad").insert(&state.db).await;

    let (status, body) = send(
        &app,
        "POST",
        "/appointments/book",
        None,
        Some(json!({
            "name": "Young Donor",
            "age": 16,
            "phone": "9876543210",
            "blood_type": "A+",
            "hospital_id": hospital_id,
            "preferred_time": (Utc::now() + Duration::days(1)).naive_utc()
        })),
    )
    .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn emergency_request_approved_from_network_stock() {
    let config = TestConfig::default();
    let state = config.to_state().await;
    let app = create_router(state.clone());
    let (hospital_id, token) = register_and_login(&app, "Apollo", "desk@apollo.example", "Ahmedabad").await;
    let stocked = seed_stock(
        &state.db,
        hospital_id,
        BloodType::OPositive,
        10,
        Utc::now().date_naive() + Duration::days(10),
    )
    .await;

    let (status, created) = send(
        &app,
        "POST",
        "/emergency",
        Some(&token),
        Some(json!({
            "requester_name": "Dr. Rao",
            "blood_type": "O+",
            "units_required": 6,
            "urgency": "Critical"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{created}");
    let request_id = created["id"].as_i64().unwrap();

    // Hospitals cannot approve their own emergencies.
    let (status, _) = send(&app, "POST", &format!("/emergency/{request_id}/approve"), Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let admin = JwtTestUtils::create_test_token(&AuthContext::admin(1), &config.jwt_secret, None);
    let (status, body) = send(&app, "GET", "/emergency/all", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["total"], 1);

    let (status, approval) = send(&app, "POST", &format!("/emergency/{request_id}/approve"), Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{approval}");
    assert_eq!(approval["request"]["status"], "Approved");
    assert_eq!(approval["request"]["units_fulfilled"], 6);
    assert_eq!(approval["draws"][0]["inventory_id"], stocked);
    assert_eq!(approval["shortfall"], 0);

    let (_, inventory) = send(&app, "GET", "/inventory", Some(&token), None).await;
    assert_eq!(inventory["inventory"][0]["quantity"], 4);
}

#[tokio::test]
async fn transfer_is_fulfilled_by_recipient() {
    let state = TestConfig::default().to_state().await;
    let app = create_router(state.clone());
    let (requester, requester_token) = register_and_login(&app, "Apollo", "desk@apollo.example", "Ahmedabad").await;
    let (supplier, supplier_token) = register_and_login(&app, "Kiran", "desk@kiran.example", "Surat").await;
    seed_stock(
        &state.db,
        supplier,
        BloodType::BNegative,
        5,
        Utc::now().date_naive() + Duration::days(20),
    )
    .await;

    let (status, created) = send(
        &app,
        "POST",
        "/transfers",
        Some(&requester_token),
        Some(json!({
            "blood_type": "B-",
            "units_needed": 3,
            "to_hospital_id": supplier,
            "urgency": "High"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{created}");
    assert_eq!(created["created"], 1);
    let transfer_id = created["transfers"][0]["id"].as_i64().unwrap();

    // Only the receiving hospital may act on the request.
    let (status, _) = send(&app, "POST", &format!("/transfers/{transfer_id}/approve"), Some(&requester_token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, listing) = send(&app, "GET", "/transfers", Some(&supplier_token), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["incoming"][0]["id"], transfer_id);

    let (status, _) = send(&app, "POST", &format!("/transfers/{transfer_id}/approve"), Some(&supplier_token), None).await;
    assert_eq!(status, StatusCode::OK);
    let (status, resolution) = send(&app, "POST", &format!("/transfers/{transfer_id}/fulfil"), Some(&supplier_token), None).await;
    assert_eq!(status, StatusCode::OK, "{resolution}");
    assert_eq!(resolution["transfer"]["status"], "Completed");

    let (_, supplier_stock) = send(&app, "GET", "/inventory/summary", Some(&supplier_token), None).await;
    assert_eq!(supplier_stock["summary"][0]["total_units"], 2);
    let (_, requester_stock) = send(&app, "GET", &format!("/inventory/availability/{requester}"), None, None).await;
    assert_eq!(requester_stock["availability"][0]["total_units"], 3);
}

#[tokio::test]
async fn dashboard_reflects_pending_work() {
    let state = TestConfig::default().to_state().await;
    let app = create_router(state.clone());
    let (_, token) = register_and_login(&app, "Apollo", "desk@apollo.example", "Ahmedabad").await;
    TestHospital::new("Kiran", "Surat").insert(&state.db).await;

    let (status, _) = send(
        &app,
        "POST",
        "/transfers",
        Some(&token),
        Some(json!({ "blood_type": "A+", "units_needed": 2 })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, dashboard) = send(&app, "GET", "/dashboard", Some(&token), None).await;
    assert_eq!(status, StatusCode::OK, "{dashboard}");
    assert_eq!(dashboard["hospital_name"], "Apollo");
    assert_eq!(dashboard["pending_outgoing_transfers"], 1);
    assert_eq!(dashboard["pending_incoming_transfers"], 0);

    let (status, _) = send(&app, "GET", "/dashboard/admin", Some(&token), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn admin_views_cover_activity_hospitals_and_donors() {
    let config = TestConfig::default();
    let state = config.to_state().await;
    let app = create_router(state);
    let (_, token) = register_and_login(&app, "Zydus", "desk@zydus.example", "Surat").await;
    register_and_login(&app, "Apollo", "desk@apollo.example", "Ahmedabad").await;
    let admin = JwtTestUtils::create_test_token(&AuthContext::admin(1), &config.jwt_secret, None);

    let (status, body) = send(&app, "GET", "/dashboard/admin/logs", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["logs"].as_array().unwrap().len(), 2);
    assert_eq!(body["logs"][0]["action"], "hospital_registered");
    assert_eq!(body["logs"][0]["hospital_name"], "Apollo");

    let (status, body) = send(&app, "GET", "/dashboard/admin/hospitals", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["hospitals"][0]["city"], "Ahmedabad");
    assert_eq!(body["hospitals"][1]["name"], "Zydus");

    let (status, body) = send(&app, "GET", "/dashboard/admin/donors", Some(&admin), None).await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["donors"], json!([]));

    for uri in ["/dashboard/admin/logs", "/dashboard/admin/hospitals", "/dashboard/admin/donors"] {
        let (status, _) = send(&app, "GET", uri, Some(&token), None).await;
        assert_eq!(status, StatusCode::FORBIDDEN);
    }
}
