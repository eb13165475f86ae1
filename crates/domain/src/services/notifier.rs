//! Outbound alert abstraction.
//!
//! Scheduling and inventory raise alerts through a [`Notifier`]. Delivery is
//! best-effort: callers log the result and never fail their own operation
//! because of it.

use std::sync::{Arc, Mutex};

use crate::models::notification::{AppointmentAlertRequest, StockAlertRequest};

/// Result of an alert attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotificationResult {
    /// The notification service accepted the alert.
    Sent,
    /// Delivery failed. The message is for logs only.
    Failed(String),
    /// Nothing was sent, e.g. alerts disabled or no recipients.
    Skipped,
}

impl NotificationResult {
    pub fn is_sent(&self) -> bool {
        matches!(self, NotificationResult::Sent)
    }
}

#[async_trait::async_trait]
pub trait Notifier: Send + Sync {
    /// Tell the front desk about a new booking.
    async fn appointment_alert(&self, alert: AppointmentAlertRequest) -> NotificationResult;

    /// Report a low-stock or expiring medication.
    async fn stock_alert(&self, alert: StockAlertRequest) -> NotificationResult;
}

/// A recorded mock delivery.
#[derive(Debug, Clone, PartialEq)]
pub enum MockDelivery {
    Appointment(AppointmentAlertRequest),
    Stock(StockAlertRequest),
}

/// In-memory notifier for development and tests.
///
/// Logs and records every alert instead of sending it.
#[derive(Debug, Clone, Default)]
pub struct MockNotifier {
    pub simulate_failure: bool,
    deliveries: Arc<Mutex<Vec<MockDelivery>>>,
}

impl MockNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            simulate_failure: true,
            ..Self::default()
        }
    }

    /// Alerts seen so far, in order.
    pub fn deliveries(&self) -> Vec<MockDelivery> {
        self.deliveries
            .lock()
            .map(|d| d.clone())
            .unwrap_or_default()
    }

    fn record(&self, delivery: MockDelivery) -> NotificationResult {
        if self.simulate_failure {
            tracing::warn!("Mock notifier simulating failure");
            return NotificationResult::Failed("Simulated failure".to_string());
        }
        if let Ok(mut deliveries) = self.deliveries.lock() {
            deliveries.push(delivery);
        }
        NotificationResult::Sent
    }
}

#[async_trait::async_trait]
impl Notifier for MockNotifier {
    async fn appointment_alert(&self, alert: AppointmentAlertRequest) -> NotificationResult {
        tracing::info!(
            appointment_id = %alert.appointment_details.id,
            recipients = alert.receptionist_emails.len(),
            "Mock: would send appointment alert"
        );
        self.record(MockDelivery::Appointment(alert))
    }

    async fn stock_alert(&self, alert: StockAlertRequest) -> NotificationResult {
        tracing::info!(
            medication_id = %alert.medication.id,
            alert_type = alert.alert_type.as_str(),
            "Mock: would send stock alert"
        );
        self.record(MockDelivery::Stock(alert))
    }
}
