//! Integration tests for the churn prediction API

use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use churn_server::{api::create_router, build_state, config::ServerConfig};
use serde_json::{json, Value};
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use tower::ServiceExt;

fn write_artifacts(dir: &Path, bias: f64) {
    std::fs::write(
        dir.join("model.json"),
        json!({"version": "test-logistic", "bias": bias, "weights": vec![0.0f64; 10]}).to_string(),
    )
    .unwrap();
    std::fs::write(
        dir.join("encoder.json"),
        json!({
            "classes": ["No", "Yes"],
            "columns": {
                "Contract": ["Month-to-month", "One year", "Two year"],
                "Payment Method": ["Bank transfer", "Credit card", "Electronic check", "Mailed check"]
            }
        })
        .to_string(),
    )
    .unwrap();
}

async fn setup_app(with_models: bool) -> (Router, TempDir) {
    let dir = TempDir::new().unwrap();
    if with_models {
        write_artifacts(dir.path(), 2.0);
    }
    let config = ServerConfig {
        models_dir: dir.path().to_path_buf(),
        ..Default::default()
    };
    let state = build_state(&config).await.unwrap();
    (create_router(state), dir)
}

fn customer() -> Value {
    json!({
        "contract": "Month-to-month",
        "monthlyCharges": 85,
        "numReferrals": 2,
        "dependents": "No",
        "totalCharges": 20,
        "tenure": 3,
        "paymentMethod": "Electronic check",
        "onlineBackup": "No",
        "onlineSecurity": "No",
        "techSupport": "No"
    })
}

fn request(method: &str, uri: &str, user: Option<&str>, body: Option<Value>) -> Request<Body> {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(user) = user {
        builder = builder.header("x-user-id", user);
    }
    match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    }
}

async fn send(app: &Router, req: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(req).await.unwrap();
    let status = response.status();
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let value = serde_json::from_slice(&body).unwrap_or(Value::Null);
    (status, value)
}

/// Persistence runs after the response; wait for it to land
async fn wait_for_history(app: &Router, user: &str, expected: u64) -> Value {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            let (_, body) = send(app, request("GET", "/api/history", Some(user), None)).await;
            if body["data"]["total"] == json!(expected) {
                return body;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("history never reached the expected size")
}

#[tokio::test]
async fn test_predict_returns_record_and_persists() {
    let (app, _dir) = setup_app(true).await;

    let (status, body) = send(&app, request("POST", "/api/predict", Some("alice"), Some(customer()))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let data = &body["data"];
    assert_eq!(data["prediction"], "Churn");
    assert_eq!(data["riskLevel"], "Very High");
    assert_eq!(data["userId"], "alice");
    assert_eq!(data["customerData"], customer());
    let probability = data["probability"].as_f64().unwrap();
    assert!((0.0..=1.0).contains(&probability));

    let factors = data["shapValues"].as_array().unwrap();
    assert!(!factors.is_empty() && factors.len() <= 6);
    assert_eq!(factors[0]["feature"], "Tenure");

    let history = wait_for_history(&app, "alice", 1).await;
    assert_eq!(history["data"]["predictions"][0]["id"], data["id"]);

    // other users do not see it
    let (_, other) = send(&app, request("GET", "/api/history", Some("bob"), None)).await;
    assert_eq!(other["data"]["total"], 0);
}

#[tokio::test]
async fn test_predict_lists_every_missing_field() {
    let (app, _dir) = setup_app(true).await;

    let mut input = customer();
    let fields = input.as_object_mut().unwrap();
    fields.remove("tenure");
    fields.remove("contract");

    let (status, body) = send(&app, request("POST", "/api/predict", Some("alice"), Some(input))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
    let error = body["error"].as_str().unwrap();
    assert!(error.starts_with("Missing required fields"));
    assert!(error.contains("tenure"));
    assert!(error.contains("contract"));
}

#[tokio::test]
async fn test_predict_rejects_bad_bodies() {
    let (app, _dir) = setup_app(true).await;

    let (status, body) = send(&app, request("POST", "/api/predict", Some("alice"), None)).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "No data provided");

    let (status, _) = send(&app, request("POST", "/api/predict", Some("alice"), Some(json!([1, 2])))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unknown_category_still_predicts() {
    let (app, _dir) = setup_app(true).await;
    let mut input = customer();
    input["contract"] = json!("Decade-long");

    let (status, body) = send(&app, request("POST", "/api/predict", Some("alice"), Some(input))).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["data"]["probability"].is_number());
}

#[tokio::test]
async fn test_models_missing_is_service_unavailable() {
    let (app, _dir) = setup_app(false).await;

    let (status, body) = send(&app, request("POST", "/api/predict", Some("alice"), Some(customer()))).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(body["error"], "ML models not loaded");

    let (status, _) = send(&app, request("GET", "/readyz", None, None)).await;
    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);

    let (status, health) = send(&app, request("GET", "/api/health", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["models"], "not loaded");
    assert_eq!(health["database"], "connected");

    tokio::time::sleep(Duration::from_millis(50)).await;
    let (_, history) = send(&app, request("GET", "/api/history", Some("alice"), None)).await;
    assert_eq!(history["data"]["total"], 0);
}

#[tokio::test]
async fn test_missing_identity_is_unauthorized() {
    let (app, _dir) = setup_app(true).await;
    let (status, body) = send(&app, request("POST", "/api/predict", None, Some(customer()))).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_purge_requires_admin() {
    let (app, _dir) = setup_app(true).await;
    send(&app, request("POST", "/api/predict", Some("alice"), Some(customer()))).await;
    wait_for_history(&app, "alice", 1).await;

    let (status, body) = send(&app, request("DELETE", "/api/history", Some("alice"), None)).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["error"], "Admin access required");

    let admin = Request::builder()
        .method("DELETE")
        .uri("/api/history")
        .header("x-user-id", "root")
        .header("x-user-role", "admin")
        .body(Body::empty())
        .unwrap();
    let (status, body) = send(&app, admin).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deletedCount"], 1);
    assert_eq!(body["message"], "History cleared successfully");

    let (_, history) = send(&app, request("GET", "/api/history", Some("alice"), None)).await;
    assert_eq!(history["data"]["total"], 0);
}

#[tokio::test]
async fn test_history_query_validation() {
    let (app, _dir) = setup_app(true).await;
    let (status, body) = send(
        &app,
        request("GET", "/api/history?startDate=yesterday", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);

    let (status, _) = send(
        &app,
        request("GET", "/api/history?prediction=All&sortBy=probability&sortOrder=asc&limit=5", Some("alice"), None),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_dashboard_stats() {
    let (app, _dir) = setup_app(true).await;

    let (status, empty) = send(&app, request("GET", "/api/dashboard/stats", Some("alice"), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(empty["data"]["totalPredictions"], 0);
    assert_eq!(empty["data"]["predictionAccuracy"], 84.0);

    send(&app, request("POST", "/api/predict", Some("alice"), Some(customer()))).await;
    wait_for_history(&app, "alice", 1).await;

    let (_, stats) = send(&app, request("GET", "/api/dashboard/stats", Some("alice"), None)).await;
    assert_eq!(stats["data"]["totalPredictions"], 1);
    assert_eq!(stats["data"]["churnRate"], 100.0);
    assert_eq!(stats["data"]["highRiskCustomers"], 1);
}

#[tokio::test]
async fn test_notification_settings_round_trip() {
    let (app, _dir) = setup_app(true).await;

    let (_, defaults) = send(&app, request("GET", "/api/notifications/settings", Some("alice"), None)).await;
    assert_eq!(defaults["data"]["emailEnabled"], false);
    assert_eq!(defaults["data"]["threshold"], 0.7);

    let settings = json!({"emailEnabled": true, "emailAddress": "ops@example.com", "threshold": 0.8});
    let (status, _) = send(
        &app,
        request("PUT", "/api/notifications/settings", Some("alice"), Some(settings)),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (_, stored) = send(&app, request("GET", "/api/notifications/settings", Some("alice"), None)).await;
    assert_eq!(stored["data"]["emailAddress"], "ops@example.com");
    assert_eq!(stored["data"]["threshold"], 0.8);

    let (status, body) = send(
        &app,
        request("PUT", "/api/notifications/settings", Some("alice"), Some(json!({"threshold": 3}))),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["success"], false);
}

#[tokio::test]
async fn test_probes_and_metrics() {
    let (app, _dir) = setup_app(true).await;

    // scaler absent: degraded but still serving
    let (status, health) = send(&app, request("GET", "/healthz", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(health["status"], "degraded");

    let (status, readiness) = send(&app, request("GET", "/readyz", None, None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(readiness["ready"], true);

    let (_, api_health) = send(&app, request("GET", "/api/health", None, None)).await;
    assert_eq!(api_health["status"], "healthy");
    assert_eq!(api_health["models"], "loaded");

    send(&app, request("POST", "/api/predict", Some("alice"), Some(customer()))).await;
    let response = app
        .clone()
        .oneshot(request("GET", "/metrics", None, None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let text = String::from_utf8(body.to_vec()).unwrap();
    assert!(text.contains("churn_predictions_total"));
}

#[tokio::test]
async fn test_unknown_route_is_enveloped_404() {
    let (app, _dir) = setup_app(true).await;
    let (status, body) = send(&app, request("GET", "/api/nope", Some("alice"), None)).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({"success": false, "error": "Endpoint not found"}));
}
