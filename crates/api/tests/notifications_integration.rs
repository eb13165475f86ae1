//! Integration tests for the notification routes.
//!
//! These tests require a running PostgreSQL instance.
//! Set TEST_DATABASE_URL environment variable to run these tests.

mod common;

use axum::{
    http::{Method, StatusCode},
    Router,
};
use common::{
    create_client, create_staff, create_test_app, create_test_pool, get_request_with_auth,
    json_request_with_auth, parse_response_body, request_with_auth, run_migrations,
    service_token, test_config, unique_test_email, AuthenticatedUser,
};
use domain::models::Role;
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;
use vet_clinic_api::config::Config;

fn email_enabled_config() -> Config {
    let mut config = test_config();
    config.email.enabled = true;
    config.email.provider = "console".to_string();
    config
}

async fn send_to(app: &Router, token: &str, user: &AuthenticatedUser, message: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            "/notifications/send",
            json!({
                "user_id": user.user_id,
                "channel": "email",
                "recipient": user.email,
                "subject": "Vaccination reminder",
                "message": message,
            }),
            token,
        ))
        .await
        .unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

async fn list(app: &Router, token: &str, user_id: Uuid, query: &str) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(get_request_with_auth(
            &format!("/notifications/user/{}{}", user_id, query),
            token,
        ))
        .await
        .unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

// ============================================================================
// Sending
// ============================================================================

#[tokio::test]
async fn test_send_records_sent_receipt() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(email_enabled_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;
    let client = create_client(&app).await;

    let (status, body) = send_to(&app, &staff.token, &client, "Rocky is due for a booster").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["notification"]["delivery_status"], "sent");
    assert_eq!(body["notification"]["notification_type"], "generic");
    assert_eq!(body["notification"]["user_id"], client.user_id.to_string());
    assert_eq!(body["notification"]["is_read"], false);
}

#[tokio::test]
async fn test_send_with_email_disabled_is_skipped() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Veterinarian).await;
    let client = create_client(&app).await;

    let (status, body) = send_to(&app, &staff.token, &client, "Lab results are ready").await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["notification"]["delivery_status"], "skipped");
    assert!(body["notification"]["error_message"].is_null());
}

#[tokio::test]
async fn test_send_validation_and_access() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;
    let client = create_client(&app).await;

    let (status, _) = send_to(&app, &client.token, &client, "Let me in").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            "/notifications/send",
            json!({ "channel": "email", "recipient": "not-an-email", "message": "Hi" }),
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            "/notifications/send",
            json!({ "channel": "sms", "recipient": "+15551234567", "message": "   " }),
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_appointment_alert_fans_out() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let config = email_enabled_config();
    let token = service_token(&config);
    let app = create_test_app(config, pool.clone());

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            "/notifications/appointment-alert",
            json!({
                "appointment_details": {
                    "id": Uuid::new_v4(),
                    "date": "2030-03-04",
                    "time": "10:30",
                    "client_id": Uuid::new_v4(),
                    "pet_id": Uuid::new_v4(),
                    "veterinarian_id": Uuid::new_v4(),
                    "reason": "Annual checkup",
                    "pet_name": "Luna",
                },
                "receptionist_emails": [unique_test_email(), unique_test_email()],
            }),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["sent"], 2);
    assert_eq!(body["failed"], 0);
    let notifications = body["notifications"].as_array().unwrap();
    assert_eq!(notifications.len(), 2);
    assert_eq!(notifications[0]["notification_type"], "appointment_alert");
    assert_eq!(notifications[0]["subject"], "New appointment on 2030-03-04 at 10:30");

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            "/notifications/appointment-alert",
            json!({
                "appointment_details": {
                    "id": Uuid::new_v4(),
                    "date": "2030-03-04",
                    "time": "10:30",
                    "client_id": Uuid::new_v4(),
                    "pet_id": Uuid::new_v4(),
                    "veterinarian_id": Uuid::new_v4(),
                    "reason": "Annual checkup",
                },
                "receptionist_emails": [],
            }),
            &token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_stock_alert_summary() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(email_enabled_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Admin).await;

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            "/notifications/stock-alert",
            json!({
                "alert_type": "expiring",
                "medication": {
                    "id": Uuid::new_v4(),
                    "name": "Carprofen 50mg",
                    "stock_quantity": 14,
                    "minimum_stock": 5,
                    "expiration_date": "2030-01-10",
                    "days_until_expiration": 6,
                },
                "recipients": [unique_test_email()],
            }),
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["sent"], 1);
    let notification = &body["notifications"][0];
    assert_eq!(notification["notification_type"], "stock_alert");
    assert_eq!(notification["subject"], "Expiring medication: Carprofen 50mg");
    assert_eq!(notification["payload"]["alert_type"], "expiring");
}

// ============================================================================
// Reading
// ============================================================================

#[tokio::test]
async fn test_list_own_notifications_only() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(email_enabled_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;
    let admin = create_staff(&app, &pool, Role::Admin).await;
    let client = create_client(&app).await;
    let other = create_client(&app).await;

    send_to(&app, &staff.token, &client, "First").await;
    send_to(&app, &staff.token, &client, "Second").await;

    let (status, body) = list(&app, &client.token, client.user_id, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["unread"], 2);

    let (status, _) = list(&app, &other.token, client.user_id, "").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    // Staff other than admins read only their own.
    let (status, _) = list(&app, &staff.token, client.user_id, "").await;
    assert_eq!(status, StatusCode::FORBIDDEN);

    let (status, body) = list(&app, &admin.token, client.user_id, "").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn test_mark_read_and_read_all() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(email_enabled_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;
    let client = create_client(&app).await;
    let other = create_client(&app).await;

    let (_, first) = send_to(&app, &staff.token, &client, "One").await;
    send_to(&app, &staff.token, &client, "Two").await;
    send_to(&app, &staff.token, &client, "Three").await;
    let first_id = first["notification"]["id"].as_str().unwrap().to_string();
    let uri = format!("/notifications/{}/read", first_id);

    let response = app
        .clone()
        .oneshot(request_with_auth(Method::PUT, &uri, &other.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request_with_auth(Method::PUT, &uri, &client.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["notification"]["is_read"], true);
    assert!(!body["notification"]["read_at"].is_null());

    let (_, body) = list(&app, &client.token, client.user_id, "?unread_only=true").await;
    assert_eq!(body["count"], 2);
    assert!(body["notifications"]
        .as_array()
        .unwrap()
        .iter()
        .all(|n| n["id"] != first_id.as_str()));

    let response = app
        .clone()
        .oneshot(request_with_auth(
            Method::PUT,
            &format!("/notifications/user/{}/read-all", client.user_id),
            &client.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(parse_response_body(response).await["updated"], 2);

    let (_, body) = list(&app, &client.token, client.user_id, "").await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["unread"], 0);

    let response = app
        .clone()
        .oneshot(request_with_auth(
            Method::PUT,
            &format!("/notifications/{}/read", Uuid::new_v4()),
            &client.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
