//! Notification receipt repository.

use domain::models::notification::NewNotification;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::{ChannelDb, DeliveryStatusDb, NotificationEntity};
use crate::metrics::QueryTimer;

const NOTIFICATION_COLUMNS: &str = "id, user_id, channel, recipient, notification_type, subject, message, payload, delivery_status, error_message, is_read, created_at, read_at";

/// Repository for notification receipts.
#[derive(Clone)]
pub struct NotificationRepository {
    pool: PgPool,
}

impl NotificationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn create(
        &self,
        notification: &NewNotification,
    ) -> Result<NotificationEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_notification");
        let result = sqlx::query_as::<_, NotificationEntity>(&format!(
            r#"
            INSERT INTO notifications
                (user_id, channel, recipient, notification_type, subject, message, payload,
                 delivery_status, error_message)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(notification.user_id)
        .bind(ChannelDb::from(notification.channel))
        .bind(&notification.recipient)
        .bind(&notification.notification_type)
        .bind(notification.subject.as_deref())
        .bind(&notification.message)
        .bind(&notification.payload)
        .bind(DeliveryStatusDb::from(notification.delivery_status))
        .bind(notification.error_message.as_deref())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<NotificationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_notification_by_id");
        let result = sqlx::query_as::<_, NotificationEntity>(&format!(
            "SELECT {NOTIFICATION_COLUMNS} FROM notifications WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// A user's notifications, newest first.
    pub async fn list_for_user(
        &self,
        user_id: Uuid,
        unread_only: bool,
    ) -> Result<Vec<NotificationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_notifications_for_user");
        let result = sqlx::query_as::<_, NotificationEntity>(&format!(
            r#"
            SELECT {NOTIFICATION_COLUMNS}
            FROM notifications
            WHERE user_id = $1 AND (NOT $2 OR NOT is_read)
            ORDER BY created_at DESC
            "#
        ))
        .bind(user_id)
        .bind(unread_only)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Marks one notification read. Idempotent; `read_at` keeps the first read time.
    pub async fn mark_read(&self, id: Uuid) -> Result<Option<NotificationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("mark_notification_read");
        let result = sqlx::query_as::<_, NotificationEntity>(&format!(
            r#"
            UPDATE notifications
            SET is_read = true, read_at = COALESCE(read_at, NOW())
            WHERE id = $1
            RETURNING {NOTIFICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Marks every unread notification of a user read. Returns how many changed.
    pub async fn mark_all_read(&self, user_id: Uuid) -> Result<u64, sqlx::Error> {
        let timer = QueryTimer::new("mark_all_notifications_read");
        let result = sqlx::query(
            "UPDATE notifications SET is_read = true, read_at = NOW() WHERE user_id = $1 AND NOT is_read",
        )
        .bind(user_id)
        .execute(&self.pool)
        .await;
        timer.record();
        Ok(result?.rows_affected())
    }
}
