//! Notification receipt entity.

use chrono::{DateTime, Utc};
use domain::models::notification::{Channel, DeliveryStatus, Notification};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for notification_channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "notification_channel", rename_all = "lowercase")]
pub enum ChannelDb {
    Email,
    Sms,
}

impl From<ChannelDb> for Channel {
    fn from(db: ChannelDb) -> Self {
        match db {
            ChannelDb::Email => Channel::Email,
            ChannelDb::Sms => Channel::Sms,
        }
    }
}

impl From<Channel> for ChannelDb {
    fn from(channel: Channel) -> Self {
        match channel {
            Channel::Email => ChannelDb::Email,
            Channel::Sms => ChannelDb::Sms,
        }
    }
}

/// Database enum for delivery_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "delivery_status", rename_all = "lowercase")]
pub enum DeliveryStatusDb {
    Sent,
    Failed,
    Skipped,
}

impl From<DeliveryStatusDb> for DeliveryStatus {
    fn from(db: DeliveryStatusDb) -> Self {
        match db {
            DeliveryStatusDb::Sent => DeliveryStatus::Sent,
            DeliveryStatusDb::Failed => DeliveryStatus::Failed,
            DeliveryStatusDb::Skipped => DeliveryStatus::Skipped,
        }
    }
}

impl From<DeliveryStatus> for DeliveryStatusDb {
    fn from(status: DeliveryStatus) -> Self {
        match status {
            DeliveryStatus::Sent => DeliveryStatusDb::Sent,
            DeliveryStatus::Failed => DeliveryStatusDb::Failed,
            DeliveryStatus::Skipped => DeliveryStatusDb::Skipped,
        }
    }
}

/// Database row mapping for the notifications table.
#[derive(Debug, Clone, FromRow)]
pub struct NotificationEntity {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub channel: ChannelDb,
    pub recipient: String,
    pub notification_type: String,
    pub subject: Option<String>,
    pub message: String,
    pub payload: serde_json::Value,
    pub delivery_status: DeliveryStatusDb,
    pub error_message: Option<String>,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
    pub read_at: Option<DateTime<Utc>>,
}

impl From<NotificationEntity> for Notification {
    fn from(entity: NotificationEntity) -> Self {
        Self {
            id: entity.id,
            user_id: entity.user_id,
            channel: entity.channel.into(),
            recipient: entity.recipient,
            notification_type: entity.notification_type,
            subject: entity.subject,
            message: entity.message,
            payload: entity.payload,
            delivery_status: entity.delivery_status.into(),
            error_message: entity.error_message,
            is_read: entity.is_read,
            created_at: entity.created_at,
            read_at: entity.read_at,
        }
    }
}
