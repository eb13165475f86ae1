//! Integration tests for the inventory routes: catalogue, stock ledger, alerts.
//!
//! These tests require a running PostgreSQL instance.
//! Set TEST_DATABASE_URL environment variable to run these tests.

mod common;

use axum::{
    http::{Method, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use common::{
    create_client, create_medication, create_staff, create_test_app,
    create_test_app_with_notifier, create_test_pool, get_request_with_auth,
    json_request_with_auth, parse_response_body, request_with_auth, run_migrations, test_config,
};
use domain::models::notification::AlertType;
use domain::models::Role;
use domain::services::notifier::{MockDelivery, MockNotifier};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

async fn change_stock(
    app: &Router,
    token: &str,
    path: &str,
    medication_id: Uuid,
    quantity: i32,
) -> (StatusCode, Value) {
    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            path,
            json!({ "medication_id": medication_id, "quantity": quantity }),
            token,
        ))
        .await
        .unwrap();
    let status = response.status();
    (status, parse_response_body(response).await)
}

async fn stock_of(app: &Router, token: &str, medication_id: Uuid) -> i64 {
    let response = app
        .clone()
        .oneshot(get_request_with_auth(
            &format!("/inventory/medications/{}", medication_id),
            token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    parse_response_body(response).await["medication"]["stock_quantity"]
        .as_i64()
        .unwrap()
}

async fn movements(app: &Router, token: &str, medication_id: Uuid) -> Vec<Value> {
    let response = app
        .clone()
        .oneshot(get_request_with_auth(
            &format!("/inventory/medications/{}/movements", medication_id),
            token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    parse_response_body(response).await["movements"]
        .as_array()
        .unwrap()
        .clone()
}

fn ids(body: &Value) -> Vec<String> {
    body["medications"]
        .as_array()
        .unwrap()
        .iter()
        .map(|m| m["id"].as_str().unwrap().to_string())
        .collect()
}

// ============================================================================
// Stock ledger
// ============================================================================

#[tokio::test]
async fn test_stock_ledger_round_trip() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;

    let id = create_medication(&app, &staff.token, 50, 5).await;
    assert!(movements(&app, &staff.token, id).await.is_empty());

    let (status, body) = change_stock(&app, &staff.token, "/inventory/add-stock", id, 25).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_stock"], 75);

    let (status, body) = change_stock(&app, &staff.token, "/inventory/reduce-stock", id, 5).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_stock"], 70);
    assert_eq!(body["stock_change"]["movement"]["movement_type"], "out");
    assert_eq!(body["stock_change"]["movement"]["quantity_change"], -5);

    assert_eq!(stock_of(&app, &staff.token, id).await, 70);

    let ledger = movements(&app, &staff.token, id).await;
    assert_eq!(ledger.len(), 2);
    let mut changes: Vec<i64> = ledger
        .iter()
        .map(|m| m["quantity_change"].as_i64().unwrap())
        .collect();
    changes.sort();
    assert_eq!(changes, vec![-5, 25]);
    assert_eq!(50 + changes.iter().sum::<i64>(), 70);
}

#[tokio::test]
async fn test_reduce_more_than_available_is_rejected() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Veterinarian).await;

    let id = create_medication(&app, &staff.token, 10, 2).await;

    let (status, body) =
        change_stock(&app, &staff.token, "/inventory/reduce-stock", id, 1000).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["success"], false);
    assert_eq!(body["error"], "insufficient_stock");

    assert_eq!(stock_of(&app, &staff.token, id).await, 10);
    assert!(movements(&app, &staff.token, id).await.is_empty());
}

#[tokio::test]
async fn test_stock_change_validation() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;
    let id = create_medication(&app, &staff.token, 10, 2).await;

    let (status, _) = change_stock(&app, &staff.token, "/inventory/add-stock", id, 0).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, _) =
        change_stock(&app, &staff.token, "/inventory/add-stock", Uuid::new_v4(), 3).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_update_stock_adjustment() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Admin).await;
    let id = create_medication(&app, &staff.token, 40, 5).await;

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::PUT,
            "/inventory/update-stock",
            json!({ "medication_id": id, "quantity_change": -3, "reason": "Broken vials" }),
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["new_stock"], 37);
    assert_eq!(body["stock_change"]["movement"]["movement_type"], "adjustment");
    assert_eq!(body["stock_change"]["movement"]["reason"], "Broken vials");
    assert_eq!(
        body["stock_change"]["movement"]["performed_by"],
        staff.user_id.to_string()
    );

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::PUT,
            "/inventory/update-stock",
            json!({ "medication_id": id, "quantity_change": 0, "reason": "Recount" }),
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::PUT,
            "/inventory/update-stock",
            json!({ "medication_id": id, "quantity_change": -100, "reason": "Recount" }),
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::CONFLICT);
    assert_eq!(stock_of(&app, &staff.token, id).await, 37);
}

#[tokio::test]
async fn test_concurrent_reductions_cannot_overdraw() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Veterinarian).await;
    let id = create_medication(&app, &staff.token, 10, 0).await;

    let (first, second) = tokio::join!(
        change_stock(&app, &staff.token, "/inventory/reduce-stock", id, 7),
        change_stock(&app, &staff.token, "/inventory/reduce-stock", id, 7),
    );
    let mut statuses = vec![first.0, second.0];
    statuses.sort();
    assert_eq!(statuses, vec![StatusCode::OK, StatusCode::CONFLICT]);
    let rejected = if first.0 == StatusCode::CONFLICT { &first.1 } else { &second.1 };
    assert_eq!(rejected["error"], "insufficient_stock");

    let stock = stock_of(&app, &staff.token, id).await;
    assert_eq!(stock, 3);
    let ledger = movements(&app, &staff.token, id).await;
    assert_eq!(ledger.len(), 1);
    let total: i64 = ledger
        .iter()
        .map(|m| m["quantity_change"].as_i64().unwrap())
        .sum();
    assert_eq!(10 + total, stock);
}

#[tokio::test]
async fn test_movement_records_authenticated_caller() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;
    let id = create_medication(&app, &staff.token, 10, 0).await;

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            "/inventory/add-stock",
            json!({ "medication_id": id, "quantity": 4, "user_id": Uuid::new_v4() }),
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(
        body["stock_change"]["movement"]["performed_by"],
        staff.user_id.to_string()
    );
}

#[tokio::test]
async fn test_add_stock_past_maximum_is_rejected() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Admin).await;
    let id = create_medication(&app, &staff.token, i32::MAX - 10, 0).await;

    let (status, body) = change_stock(&app, &staff.token, "/inventory/add-stock", id, 1000).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(stock_of(&app, &staff.token, id).await, i64::from(i32::MAX - 10));
    assert!(movements(&app, &staff.token, id).await.is_empty());

    let (status, body) = change_stock(&app, &staff.token, "/inventory/add-stock", id, 10).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["new_stock"], i64::from(i32::MAX));
}

// ============================================================================
// Catalogue
// ============================================================================

#[tokio::test]
async fn test_inventory_is_staff_only() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let client = create_client(&app).await;

    let response = app
        .clone()
        .oneshot(get_request_with_auth("/inventory/medications", &client.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::POST,
            "/inventory/medications",
            json!({ "name": "Meloxicam", "stock_quantity": 5 }),
            &client.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn test_update_and_deactivate_medication() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let receptionist = create_staff(&app, &pool, Role::Receptionist).await;
    let admin = create_staff(&app, &pool, Role::Admin).await;
    let id = create_medication(&app, &receptionist.token, 12, 4).await;

    let response = app
        .clone()
        .oneshot(json_request_with_auth(
            Method::PUT,
            &format!("/inventory/medications/{}", id),
            json!({ "minimum_stock": 15, "supplier": "VetPharma" }),
            &receptionist.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["medication"]["minimum_stock"], 15);
    assert_eq!(body["medication"]["supplier"], "VetPharma");
    assert_eq!(body["medication"]["stock_quantity"], 12);

    let uri = format!("/inventory/medications/{}", id);
    let response = app
        .clone()
        .oneshot(request_with_auth(Method::DELETE, &uri, &receptionist.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);

    let response = app
        .clone()
        .oneshot(request_with_auth(Method::DELETE, &uri, &admin.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .clone()
        .oneshot(get_request_with_auth(&uri, &admin.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

// ============================================================================
// Alerts
// ============================================================================

#[tokio::test]
async fn test_low_stock_list() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;

    let at_minimum = create_medication(&app, &staff.token, 5, 5).await;
    let healthy = create_medication(&app, &staff.token, 50, 5).await;

    let response = app
        .clone()
        .oneshot(get_request_with_auth("/inventory/alerts/low-stock", &staff.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let listed = ids(&parse_response_body(response).await);
    assert!(listed.contains(&at_minimum.to_string()));
    assert!(!listed.contains(&healthy.to_string()));
}

#[tokio::test]
async fn test_expiring_includes_expired() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Veterinarian).await;

    let today = Utc::now().date_naive();
    let mut created = Vec::new();
    for offset in [-3i64, 10, 90] {
        let response = app
            .clone()
            .oneshot(json_request_with_auth(
                Method::POST,
                "/inventory/medications",
                json!({
                    "name": format!("Ketamine {}", Uuid::new_v4().simple()),
                    "stock_quantity": 20,
                    "minimum_stock": 2,
                    "expiration_date": (today + Duration::days(offset)).to_string(),
                }),
                &staff.token,
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = parse_response_body(response).await;
        created.push(body["medication"]["id"].as_str().unwrap().to_string());
    }

    let response = app
        .clone()
        .oneshot(get_request_with_auth("/inventory/alerts/expiring?days=30", &staff.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    let listed = ids(&body);
    assert!(listed.contains(&created[0]));
    assert!(listed.contains(&created[1]));
    assert!(!listed.contains(&created[2]));

    let expired = body["medications"]
        .as_array()
        .unwrap()
        .iter()
        .find(|m| m["id"] == created[0].as_str())
        .unwrap();
    assert_eq!(expired["days_until_expiration"], -3);

    let response = app
        .clone()
        .oneshot(get_request_with_auth("/inventory/alerts/expiring?days=-1", &staff.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_oversized_expiration_window_is_rejected() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;

    let response = app
        .clone()
        .oneshot(get_request_with_auth(
            "/inventory/alerts/expiring?days=100000000",
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let body = parse_response_body(response).await;
    assert_eq!(body["error"], "validation_error");

    let response = app
        .clone()
        .oneshot(request_with_auth(
            Method::POST,
            "/inventory/alerts/check-expiration?days=100000000&notify=false",
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app
        .clone()
        .oneshot(get_request_with_auth("/inventory/alerts/expiring?days=3650", &staff.token))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_check_expiration_report() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let app = create_test_app(test_config(), pool.clone());
    let staff = create_staff(&app, &pool, Role::Admin).await;
    create_medication(&app, &staff.token, 1, 3).await;

    let response = app
        .clone()
        .oneshot(request_with_auth(
            Method::POST,
            "/inventory/alerts/check-expiration?days=15&notify=false",
            &staff.token,
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let body = parse_response_body(response).await;
    assert_eq!(body["report"]["days"], 15);
    assert_eq!(body["report"]["notified"], false);
    assert!(body["report"]["low_stock_count"].as_u64().unwrap() >= 1);
}

#[tokio::test]
async fn test_reduce_to_minimum_sends_low_stock_alert() {
    let pool = create_test_pool().await;
    run_migrations(&pool).await;
    let notifier = MockNotifier::new();
    let config = test_config();
    let recipients = config.scheduling.receptionist_emails.clone();
    let app = create_test_app_with_notifier(config, pool.clone(), notifier.clone());
    let staff = create_staff(&app, &pool, Role::Receptionist).await;

    let id = create_medication(&app, &staff.token, 12, 4).await;
    let (status, body) = change_stock(&app, &staff.token, "/inventory/reduce-stock", id, 9).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["low_stock"], true);

    // The alert is spawned after the response.
    let mut delivered = None;
    for _ in 0..50 {
        delivered = notifier.deliveries().into_iter().find_map(|d| match d {
            MockDelivery::Stock(alert) if alert.medication.id == id => Some(alert),
            _ => None,
        });
        if delivered.is_some() {
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    }

    let alert = delivered.expect("stock alert was not sent");
    assert_eq!(alert.alert_type, AlertType::LowStock);
    assert_eq!(alert.medication.stock_quantity, 3);
    assert_eq!(alert.medication.minimum_stock, 4);
    assert_eq!(alert.recipients, recipients);
}
