mod common;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::{json, Value};
use std::sync::Arc;
use tower::ServiceExt;

use common::Fixture;
use pmsflow::api::{configure_routes, OFFICER_HEADER};
use pmsflow::authz::{AuthorizationEngine, PermissionTable};
use pmsflow::core::config::AppConfig;
use pmsflow::core::shared::state::AppState;
use pmsflow::storage::Store;

fn app(fx: &Fixture) -> Router {
    let store: Arc<dyn Store> = fx.store.clone();
    let state = AppState::new(
        AppConfig::default(),
        store,
        AuthorizationEngine::new(PermissionTable::standard()),
    );
    configure_routes().with_state(Arc::new(state))
}

async fn call(app: &Router, method: &str, uri: &str, officer: Option<&str>, body: Value) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(officer) = officer {
        builder = builder.header(OFFICER_HEADER, officer);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, value)
}

#[tokio::test]
async fn test_health() {
    let fx = Fixture::new();
    let (status, body) = call(&app(&fx), "GET", "/health", None, Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn test_requests_need_an_officer() {
    let fx = Fixture::new();
    let (status, body) = call(
        &app(&fx),
        "POST",
        "/api/assignments",
        None,
        json!({ "title": "Audit", "type": "ASSIGNMENT" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(body["kind"], "permission_denied");

    let (status, _) = call(
        &app(&fx),
        "POST",
        "/api/assignments",
        Some("nobody"),
        json!({ "title": "Audit", "type": "ASSIGNMENT" }),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_register_and_approve_over_http() {
    let fx = Fixture::new();
    let app = app(&fx);

    let (status, created) = call(
        &app,
        "POST",
        "/api/assignments",
        Some("a"),
        json!({ "title": "Energy audit", "type": "ASSIGNMENT", "total_value": "10000" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", created);
    assert_eq!(created["registration_status"], "PENDING_APPROVAL");
    assert_eq!(created["type"], "ASSIGNMENT");
    let id = created["id"].as_str().unwrap().to_string();

    let (status, denied) = call(
        &app,
        "POST",
        &format!("/api/assignments/{}/registration/approve", id),
        Some("head2"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert_eq!(denied["kind"], "permission_denied");

    let (status, approved) = call(
        &app,
        "POST",
        &format!("/api/assignments/{}/registration/approve", id),
        Some("head"),
        json!({ "remarks": "ok" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(approved["workflow_stage"], "TL_ASSIGNMENT");

    let (status, again) = call(
        &app,
        "POST",
        &format!("/api/assignments/{}/registration/approve", id),
        Some("head"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(again["kind"], "invalid_state");

    let (status, detail) = call(
        &app,
        "GET",
        &format!("/api/assignments/{}", id),
        Some("b"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["approval_requests"][0]["status"], "APPROVED");
}

#[tokio::test]
async fn test_section_submission_errors_map_to_statuses() {
    let fx = Fixture::new();
    let assignment = fx.in_detail_entry("10000");
    let app = app(&fx);

    let (status, body) = call(
        &app,
        "POST",
        &format!("/api/assignments/{}/sections/cost/submit", assignment.id),
        Some("tl"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["kind"], "incomplete_section");

    let (status, _) = call(
        &app,
        "POST",
        &format!("/api/assignments/{}/sections/budget/submit", assignment.id),
        Some("tl"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = call(
        &app,
        "GET",
        &format!("/api/assignments/{}", uuid::Uuid::new_v4()),
        Some("tl"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["kind"], "not_found");
}

#[tokio::test]
async fn test_invoice_flow_over_http() {
    let fx = Fixture::new();
    let active = fx.active_assignment("20000");
    let app = app(&fx);

    let (status, invoice) = call(
        &app,
        "POST",
        &format!("/api/assignments/{}/invoices", active.id),
        Some("tl"),
        json!({ "invoice_type": "ADVANCE", "invoice_amount": "10000" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", invoice);
    let invoice_id = invoice["id"].as_str().unwrap().to_string();

    let (status, approval) = call(
        &app,
        "POST",
        &format!("/api/invoices/{}/approve", invoice_id),
        Some("fin"),
        json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{}", approval);
    assert_eq!(approval["entries"].as_array().unwrap().len(), 2);

    let (status, summary) = call(
        &app,
        "GET",
        &format!("/api/assignments/{}/revenue", active.id),
        Some("head"),
        Value::Null,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(summary["assignment_id"], active.id.to_string());

    let (status, roles) = call(&app, "GET", "/api/officers/tl/roles", Some("tl"), Value::Null).await;
    assert_eq!(status, StatusCode::OK);
    assert!(roles
        .as_array()
        .unwrap()
        .iter()
        .any(|r| r["role_type"] == "TEAM_LEADER"));
}
