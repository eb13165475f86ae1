//! Notification dispatch: deliver through a provider, then store a receipt.
//!
//! A provider failure never fails the request. It is recorded on the receipt
//! as `failed` with the provider's error message.

use domain::models::notification::{
    AlertDispatchSummary, AppointmentAlertRequest, Channel, DeliveryStatus, NewNotification,
    Notification, StockAlertRequest, KIND_APPOINTMENT_ALERT, KIND_STOCK_ALERT,
};
use persistence::repositories::NotificationRepository;
use serde_json::Value;
use sqlx::PgPool;
use tracing::{info, warn};
use uuid::Uuid;

use crate::middleware::metrics::record_notification;
use crate::services::email::{EmailError, EmailMessage, EmailService};
use crate::services::sms::{SmsError, SmsService};

/// One message to deliver and record.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub user_id: Option<Uuid>,
    pub channel: Channel,
    pub recipient: String,
    pub notification_type: &'static str,
    pub subject: Option<String>,
    pub message: String,
    pub payload: Value,
}

#[derive(Clone)]
pub struct NotificationDispatcher {
    email: EmailService,
    sms: SmsService,
    repo: NotificationRepository,
}

impl NotificationDispatcher {
    pub fn new(email: EmailService, sms: SmsService, pool: PgPool) -> Self {
        Self {
            email,
            sms,
            repo: NotificationRepository::new(pool),
        }
    }

    async fn deliver(&self, outgoing: &Outgoing) -> (DeliveryStatus, Option<String>) {
        let result = match outgoing.channel {
            Channel::Email => {
                let message = EmailMessage {
                    to: outgoing.recipient.clone(),
                    to_name: None,
                    subject: outgoing
                        .subject
                        .clone()
                        .unwrap_or_else(|| "Vet Clinic notification".to_string()),
                    body_text: outgoing.message.clone(),
                };
                match self.email.send(message).await {
                    Ok(()) => Ok(()),
                    Err(EmailError::Disabled) => return (DeliveryStatus::Skipped, None),
                    Err(e) => Err(e.to_string()),
                }
            }
            Channel::Sms => match self.sms.send(&outgoing.recipient, &outgoing.message).await {
                Ok(()) => Ok(()),
                Err(SmsError::Disabled) => return (DeliveryStatus::Skipped, None),
                Err(e) => Err(e.to_string()),
            },
        };

        match result {
            Ok(()) => (DeliveryStatus::Sent, None),
            Err(e) => {
                warn!(
                    channel = outgoing.channel.as_str(),
                    recipient = %outgoing.recipient,
                    error = %e,
                    "Notification delivery failed"
                );
                (DeliveryStatus::Failed, Some(e))
            }
        }
    }

    /// Delivers one message and stores its receipt.
    pub async fn send(&self, outgoing: Outgoing) -> Result<Notification, sqlx::Error> {
        let (status, error_message) = self.deliver(&outgoing).await;
        record_notification(outgoing.channel.as_str(), status.as_str());

        let stored = self
            .repo
            .create(&NewNotification {
                user_id: outgoing.user_id,
                channel: outgoing.channel,
                recipient: outgoing.recipient,
                notification_type: outgoing.notification_type.to_string(),
                subject: outgoing.subject,
                message: outgoing.message,
                payload: outgoing.payload,
                delivery_status: status,
                error_message,
            })
            .await?;

        info!(
            notification_id = %stored.id,
            notification_type = %stored.notification_type,
            delivery_status = status.as_str(),
            "Notification recorded"
        );
        Ok(stored.into())
    }

    async fn fan_out(
        &self,
        recipients: &[String],
        notification_type: &'static str,
        subject: String,
        message: String,
        payload: Value,
    ) -> Result<AlertDispatchSummary, sqlx::Error> {
        let mut summary = AlertDispatchSummary {
            sent: 0,
            failed: 0,
            notifications: Vec::with_capacity(recipients.len()),
        };

        for recipient in recipients {
            let notification = self
                .send(Outgoing {
                    user_id: None,
                    channel: Channel::Email,
                    recipient: recipient.clone(),
                    notification_type,
                    subject: Some(subject.clone()),
                    message: message.clone(),
                    payload: payload.clone(),
                })
                .await?;

            match notification.delivery_status {
                DeliveryStatus::Sent => summary.sent += 1,
                DeliveryStatus::Failed => summary.failed += 1,
                DeliveryStatus::Skipped => {}
            }
            summary.notifications.push(notification);
        }

        Ok(summary)
    }

    /// Emails every receptionist about a new booking.
    pub async fn appointment_alert(
        &self,
        alert: &AppointmentAlertRequest,
    ) -> Result<AlertDispatchSummary, sqlx::Error> {
        let details = &alert.appointment_details;
        let payload = serde_json::to_value(details).unwrap_or(Value::Null);
        self.fan_out(
            &alert.receptionist_emails,
            KIND_APPOINTMENT_ALERT,
            details.subject(),
            details.body(),
            payload,
        )
        .await
    }

    /// Emails every recipient about a low-stock or expiring medication.
    pub async fn stock_alert(
        &self,
        alert: &StockAlertRequest,
    ) -> Result<AlertDispatchSummary, sqlx::Error> {
        let payload = serde_json::json!({
            "alert_type": alert.alert_type.as_str(),
            "medication": alert.medication,
        });
        self.fan_out(
            &alert.recipients,
            KIND_STOCK_ALERT,
            alert.subject(),
            alert.body(),
            payload,
        )
        .await
    }
}
