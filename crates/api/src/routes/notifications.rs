//! Notification routes.
//!
//! Sending is open to staff and internal services. Reading is limited to the
//! addressee, or an admin.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::notification::{
    AppointmentAlertRequest, ListNotificationsQuery, SendNotificationRequest, StockAlertRequest,
    KIND_GENERIC,
};
use domain::models::{DeliveryStatus, Notification, Role};
use persistence::repositories::NotificationRepository;
use serde_json::Value;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::response::Envelope;
use crate::services::notifications::Outgoing;

fn notification_not_found() -> ApiError {
    ApiError::NotFound("Notification not found".to_string())
}

/// POST /notifications/send
///
/// A provider failure still answers 201; the receipt carries the failure.
pub async fn send(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;
    request.validate()?;

    let notification = state
        .dispatcher
        .send(Outgoing {
            user_id: request.user_id,
            channel: request.channel,
            recipient: request.recipient.trim().to_string(),
            notification_type: KIND_GENERIC,
            subject: request.subject,
            message: request.message,
            payload: Value::Null,
        })
        .await?;

    let message = match notification.delivery_status {
        DeliveryStatus::Sent => "Notification sent successfully",
        DeliveryStatus::Skipped => "Notification recorded, delivery is disabled",
        DeliveryStatus::Failed => "Notification recorded, delivery failed",
    };

    Ok(Envelope::created()
        .message(message)
        .with("notification", notification))
}

/// POST /notifications/appointment-alert
pub async fn appointment_alert(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<AppointmentAlertRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;
    request.validate()?;

    let summary = state.dispatcher.appointment_alert(&request).await?;
    info!(
        appointment_id = %request.appointment_details.id,
        sent = summary.sent,
        failed = summary.failed,
        "Appointment alert dispatched"
    );

    Ok(Envelope::ok()
        .message("Appointment alert processed")
        .with("sent", summary.sent)
        .with("failed", summary.failed)
        .with("notifications", summary.notifications))
}

/// POST /notifications/stock-alert
pub async fn stock_alert(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<StockAlertRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;
    request.validate()?;

    let summary = state.dispatcher.stock_alert(&request).await?;
    info!(
        medication_id = %request.medication.id,
        alert_type = request.alert_type.as_str(),
        sent = summary.sent,
        failed = summary.failed,
        "Stock alert dispatched"
    );

    Ok(Envelope::ok()
        .message("Stock alert processed")
        .with("sent", summary.sent)
        .with("failed", summary.failed)
        .with("notifications", summary.notifications))
}

/// GET /notifications/user/:user_id?unread_only=true
pub async fn list_for_user(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(user_id): Path<Uuid>,
    Query(query): Query<ListNotificationsQuery>,
) -> Result<Envelope, ApiError> {
    auth.require_self_or(user_id, &[Role::Admin])?;

    let repo = NotificationRepository::new(state.pool.clone());
    let notifications: Vec<Notification> = repo
        .list_for_user(user_id, query.unread_only)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();
    let unread = notifications.iter().filter(|n| !n.is_read).count();

    Ok(Envelope::ok()
        .with("user_id", user_id)
        .with("count", notifications.len())
        .with("unread", unread)
        .with("notifications", notifications))
}

/// PUT /notifications/:id/read
pub async fn mark_read(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    let repo = NotificationRepository::new(state.pool.clone());
    let existing: Notification = repo
        .find_by_id(id)
        .await?
        .ok_or_else(notification_not_found)?
        .into();

    // Receipts without an addressee belong to no one but admins.
    match existing.user_id {
        Some(owner) => auth.require_self_or(owner, &[Role::Admin])?,
        None => auth.require_admin()?,
    }

    let notification: Notification = repo
        .mark_read(id)
        .await?
        .ok_or_else(notification_not_found)?
        .into();

    Ok(Envelope::ok()
        .message("Notification marked as read")
        .with("notification", notification))
}

/// PUT /notifications/user/:user_id/read-all
pub async fn mark_all_read(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(user_id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_self_or(user_id, &[Role::Admin])?;

    let repo = NotificationRepository::new(state.pool.clone());
    let updated = repo.mark_all_read(user_id).await?;

    Ok(Envelope::ok()
        .message("All notifications marked as read")
        .with("updated", updated))
}
