mod common;

use axum::http::{Method, StatusCode};
use common::TestApp;
use serde_json::{json, Value};

fn payload(name: &str) -> Value {
    json!({
        "name": name,
        "owner": "City Sports Committee",
        "address": format!("{name} street 1"),
        "area": 320.5,
        "type": "Спортивные залы",
        "paying_type": ["Платные"],
        "working_hours": {
            "monday": { "open": true, "all_day": false, "since": "09:00", "to": "21:00" },
            "tuesday": { "open": true, "all_day": true },
            "wednesday": { "open": false },
            "thursday": { "open": false },
            "friday": { "open": false },
            "saturday": { "open": false },
            "sunday": { "open": false }
        }
    })
}

#[tokio::test]
async fn mutations_require_an_admin_token() {
    let app = TestApp::new().await;

    let (status, body) = app
        .request(Method::POST, "/api/v1/facility", Some(payload("Gym")), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], json!("Unauthorized"));
    assert_eq!(body["details"], json!("AUTH_MISSING"));
    assert!(body["request_id"].is_string());
    assert!(body["timestamp"].is_string());

    let (status, _) = app
        .request(
            Method::POST,
            "/api/v1/facility",
            Some(payload("Gym")),
            Some("not-a-jwt"),
        )
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let viewer = app.viewer_token();
    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/facility",
            Some(payload("Gym")),
            Some(&viewer),
        )
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], json!("Forbidden"));
    assert_eq!(body["details"], json!("AUTH_INSUFFICIENT_PERMISSIONS"));
}

#[tokio::test]
async fn facility_lifecycle_over_http() {
    let app = TestApp::new().await;

    let (status, created) = app
        .admin(Method::POST, "/api/v1/facility", Some(payload("Gym")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["type"], json!("спортивные залы"));
    assert_eq!(created["paying_type"], json!(["платные"]));
    assert_eq!(created["working_hours"]["monday"]["since"], json!("09:00"));
    let id = created["id"].as_str().unwrap().to_string();
    let uri = format!("/api/v1/facility/{id}");

    // Reads are public
    let (status, fetched) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, conflict) = app
        .admin(Method::POST, "/api/v1/facility", Some(payload("Gym")))
        .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert!(conflict["message"].as_str().unwrap().contains("Gym"));

    let (status, patched) = app
        .admin(
            Method::PATCH,
            &uri,
            Some(json!({ "note": "renovated", "hidden": false })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(patched["note"], json!("renovated"));
    assert_eq!(patched["hidden"], json!(false));

    let (status, replaced) = app
        .admin(Method::PUT, &uri, Some(payload("Gym Renamed")))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(replaced["name"], json!("Gym Renamed"));
    assert_eq!(replaced["note"], Value::Null);
    assert_eq!(replaced["hidden"], json!(true));

    let (status, body) = app.admin(Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);

    let (status, missing) = app.request(Method::GET, &uri, None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(missing["request_id"].is_string());
}

#[tokio::test]
async fn invalid_payloads_are_rejected() {
    let app = TestApp::new().await;

    let mut bad = payload("Gym");
    bad["working_hours"]["monday"]["since"] = json!("nine");
    let (status, _) = app
        .admin(Method::POST, "/api/v1/facility", Some(bad))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, created) = app
        .admin(Method::POST, "/api/v1/facility", Some(payload("Gym")))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    let uri = format!("/api/v1/facility/{}", created["id"].as_str().unwrap());

    let (status, body) = app
        .admin(Method::PATCH, &uri, Some(json!({ "name": null })))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("name cannot be null"));

    let (status, _) = app
        .request(Method::GET, "/api/v1/facility/not-a-uuid", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_endpoint_returns_count_and_page() {
    let app = TestApp::new().await;
    for name in ["Alpha Gym", "Beta Gym", "Gamma Pool"] {
        let (status, _) = app
            .admin(Method::POST, "/api/v1/facility", Some(payload(name)))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/facility/search",
            Some(json!({ "q": "gym", "limit": 1 })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], json!(2));
    assert_eq!(body["facilities"].as_array().unwrap().len(), 1);
    assert_eq!(body["facilities"][0]["name"], json!("Alpha Gym"));

    let (status, body) = app
        .request(
            Method::POST,
            "/api/v1/facility/search",
            Some(json!({ "filters": [{ "field": "nope", "eq": 1 }] })),
            None,
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["message"].as_str().unwrap().contains("nope"));
}

#[tokio::test]
async fn health_and_status_report_the_database() {
    let app = TestApp::new().await;

    let (status, body) = app.request(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["checks"]["database"], json!("healthy"));

    let (status, body) = app.request(Method::GET, "/api/v1/status", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["pending_migrations"], json!(0));
    assert_eq!(body["data"]["environment"], json!("test"));
}

#[tokio::test]
async fn responses_echo_the_request_id() {
    let app = TestApp::new().await;
    let (status, body) = app
        .request(
            Method::GET,
            &format!("/api/v1/facility/{}", uuid::Uuid::new_v4()),
            None,
            None,
        )
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert!(!body["request_id"].as_str().unwrap().is_empty());
}
