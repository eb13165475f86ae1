//! Daily expiration check.

use crate::services::InventoryAlerts;

use super::scheduler::{Job, JobFrequency};

/// Reports medications expiring within `days` (and low stock) once a day,
/// alerting the notification service when `notify` is set.
pub struct ExpirationAlertJob {
    alerts: InventoryAlerts,
    days: i64,
    hour_utc: u32,
    notify: bool,
}

impl ExpirationAlertJob {
    pub fn new(alerts: InventoryAlerts, days: i64, hour_utc: u32, notify: bool) -> Self {
        Self {
            alerts,
            days,
            hour_utc,
            notify,
        }
    }
}

#[async_trait::async_trait]
impl Job for ExpirationAlertJob {
    fn name(&self) -> &'static str {
        "expiration_alerts"
    }

    fn frequency(&self) -> JobFrequency {
        JobFrequency::DailyAt {
            hour: self.hour_utc,
            minute: 0,
        }
    }

    async fn execute(&self) -> Result<(), String> {
        self.alerts
            .check_expiration(self.days, self.notify)
            .await
            .map(|_| ())
            .map_err(|e| format!("Expiration check failed: {}", e))
    }
}
