//! Fire-and-forget alerts to the notification service.
//!
//! The triggering request never waits on these. Failures are logged at
//! `warn!` and dropped.

use chrono::NaiveDate;
use domain::models::medication::Medication;
use domain::models::notification::{
    AlertType, AppointmentAlertRequest, AppointmentDetails, StockAlertMedication,
    StockAlertRequest,
};
use domain::models::Appointment;
use domain::services::notifier::{NotificationResult, Notifier};
use shared::validation::format_time;
use std::sync::Arc;
use tokio::task::JoinHandle;

pub fn appointment_alert(appointment: &Appointment, receptionist_emails: Vec<String>) -> AppointmentAlertRequest {
    AppointmentAlertRequest {
        appointment_details: AppointmentDetails {
            id: appointment.id,
            date: appointment.appointment_date,
            time: format_time(appointment.appointment_time),
            client_id: appointment.client_id,
            pet_id: appointment.pet_id,
            veterinarian_id: appointment.veterinarian_id,
            reason: appointment.reason.clone(),
            pet_name: appointment.pet_name.clone(),
            owner_name: appointment.owner_name.clone(),
        },
        receptionist_emails,
    }
}

pub fn stock_alert(
    alert_type: AlertType,
    medication: &Medication,
    today: NaiveDate,
    recipients: Vec<String>,
) -> StockAlertRequest {
    StockAlertRequest {
        alert_type,
        medication: StockAlertMedication {
            id: medication.id,
            name: medication.name.clone(),
            stock_quantity: medication.stock_quantity,
            minimum_stock: medication.minimum_stock,
            expiration_date: medication.expiration_date,
            days_until_expiration: medication.days_until_expiration(today),
        },
        recipients,
    }
}

fn log_result(kind: &'static str, subject_id: uuid::Uuid, result: NotificationResult) {
    match result {
        NotificationResult::Sent => {
            tracing::debug!(kind, subject_id = %subject_id, "Alert delivered")
        }
        NotificationResult::Skipped => {
            tracing::debug!(kind, subject_id = %subject_id, "Alert skipped, no recipients")
        }
        NotificationResult::Failed(error) => {
            tracing::warn!(kind, subject_id = %subject_id, error = %error, "Alert delivery failed")
        }
    }
}

pub fn spawn_appointment_alert(
    notifier: Arc<dyn Notifier>,
    alert: AppointmentAlertRequest,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let id = alert.appointment_details.id;
        let result = notifier.appointment_alert(alert).await;
        log_result("appointment_alert", id, result);
    })
}

pub fn spawn_stock_alert(notifier: Arc<dyn Notifier>, alert: StockAlertRequest) -> JoinHandle<()> {
    tokio::spawn(async move {
        let id = alert.medication.id;
        let result = notifier.stock_alert(alert).await;
        log_result("stock_alert", id, result);
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{NaiveTime, Utc};
    use domain::models::AppointmentStatus;
    use domain::services::notifier::{MockDelivery, MockNotifier};
    use uuid::Uuid;

    fn medication(expiration: Option<NaiveDate>) -> Medication {
        Medication {
            id: Uuid::new_v4(),
            name: "Amoxicillin 250mg".into(),
            description: None,
            active_ingredient: None,
            concentration: None,
            presentation: None,
            laboratory: None,
            category: Some("antibiotic".into()),
            unit_price: Some(2.5),
            unit: Some("tablet".into()),
            stock_quantity: 3,
            minimum_stock: 10,
            expiration_date: expiration,
            batch_number: None,
            supplier: None,
            requires_prescription: true,
            is_active: true,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_stock_alert_reports_days_left() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let med = medication(NaiveDate::from_ymd_opt(2025, 3, 4));
        let alert = stock_alert(AlertType::Expiring, &med, today, vec!["a@clinic.test".into()]);
        assert_eq!(alert.medication.days_until_expiration, Some(3));
        assert_eq!(alert.recipients.len(), 1);
    }

    #[test]
    fn test_stock_alert_expired_item_negative_days() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 10).unwrap();
        let med = medication(NaiveDate::from_ymd_opt(2025, 3, 4));
        let alert = stock_alert(AlertType::Expiring, &med, today, vec![]);
        assert_eq!(alert.medication.days_until_expiration, Some(-6));
    }

    #[test]
    fn test_appointment_alert_formats_time() {
        let appointment = Appointment {
            id: Uuid::new_v4(),
            pet_id: Uuid::new_v4(),
            veterinarian_id: Uuid::new_v4(),
            client_id: Uuid::new_v4(),
            appointment_date: NaiveDate::from_ymd_opt(2025, 1, 6).unwrap(),
            appointment_time: NaiveTime::from_hms_opt(9, 30, 0).unwrap(),
            appointment_type: "consultation".into(),
            reason: "Vaccination".into(),
            notes: None,
            status: AppointmentStatus::Scheduled,
            pet_name: Some("Luna".into()),
            pet_species: None,
            owner_name: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let alert = appointment_alert(&appointment, vec!["desk@clinic.test".into()]);
        assert_eq!(alert.appointment_details.time, "09:30");
        assert_eq!(alert.appointment_details.pet_name.as_deref(), Some("Luna"));
    }

    #[tokio::test]
    async fn test_spawned_alert_reaches_notifier() {
        let mock = MockNotifier::new();
        let notifier: Arc<dyn Notifier> = Arc::new(mock.clone());
        let alert = stock_alert(
            AlertType::LowStock,
            &medication(None),
            Utc::now().date_naive(),
            vec!["inventory@clinic.test".into()],
        );

        spawn_stock_alert(notifier, alert).await.unwrap();

        let deliveries = mock.deliveries();
        assert_eq!(deliveries.len(), 1);
        assert!(matches!(deliveries[0], MockDelivery::Stock(_)));
    }
}
