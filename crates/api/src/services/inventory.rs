//! Low-stock and expiration checks shared by the inventory routes and the
//! daily expiration job.

use chrono::{NaiveDate, Utc};
use domain::models::medication::{
    expiration_cutoff, ExpirationCheckReport, ExpiringMedication, Medication,
};
use domain::models::notification::AlertType;
use domain::services::notifier::Notifier;
use persistence::repositories::MedicationRepository;
use sqlx::PgPool;
use std::sync::Arc;

use crate::services::alerts::{spawn_stock_alert, stock_alert};

#[derive(Clone)]
pub struct InventoryAlerts {
    repo: MedicationRepository,
    notifier: Arc<dyn Notifier>,
    recipients: Vec<String>,
}

impl InventoryAlerts {
    pub fn new(pool: PgPool, notifier: Arc<dyn Notifier>, recipients: Vec<String>) -> Self {
        Self {
            repo: MedicationRepository::new(pool),
            notifier,
            recipients,
        }
    }

    /// Active medications at or below their minimum stock.
    pub async fn low_stock(&self) -> Result<Vec<Medication>, sqlx::Error> {
        Ok(self.repo.low_stock().await?.into_iter().map(Into::into).collect())
    }

    /// Active medications expiring on or before `today + days`, including
    /// ones already expired. A window outside `0..=MAX_EXPIRATION_DAYS`
    /// matches nothing; callers validate it first.
    pub async fn expiring(
        &self,
        today: NaiveDate,
        days: i64,
    ) -> Result<Vec<ExpiringMedication>, sqlx::Error> {
        let Some(until) = expiration_cutoff(today, days) else {
            return Ok(Vec::new());
        };
        let items = self.repo.expiring_before(until).await?;

        Ok(items
            .into_iter()
            .map(Medication::from)
            .filter_map(|medication| {
                let days_until_expiration = medication.days_until_expiration(today)?;
                Some(ExpiringMedication {
                    medication,
                    days_until_expiration,
                })
            })
            .collect())
    }

    /// Runs both checks. With `notify`, sends one expiring alert per item.
    pub async fn check_expiration(
        &self,
        days: i64,
        notify: bool,
    ) -> Result<ExpirationCheckReport, sqlx::Error> {
        let today = Utc::now().date_naive();
        let expiring = self.expiring(today, days).await?;
        let low_stock = self.low_stock().await?;

        let notified = notify && !expiring.is_empty() && !self.recipients.is_empty();
        if notified {
            for item in &expiring {
                spawn_stock_alert(
                    self.notifier.clone(),
                    stock_alert(AlertType::Expiring, &item.medication, today, self.recipients.clone()),
                );
            }
        }

        tracing::info!(
            days,
            expiring_count = expiring.len(),
            low_stock_count = low_stock.len(),
            notified,
            "Expiration check finished"
        );

        Ok(ExpirationCheckReport {
            days,
            expiring_count: expiring.len(),
            low_stock_count: low_stock.len(),
            notified,
        })
    }

    /// Alerts when a stock change left `medication` at or below its minimum.
    pub fn alert_if_low(&self, medication: &Medication) {
        if !medication.is_low_stock() || self.recipients.is_empty() {
            return;
        }
        tracing::info!(
            medication_id = %medication.id,
            stock = medication.stock_quantity,
            minimum = medication.minimum_stock,
            "Stock at or below minimum"
        );
        spawn_stock_alert(
            self.notifier.clone(),
            stock_alert(
                AlertType::LowStock,
                medication,
                Utc::now().date_naive(),
                self.recipients.clone(),
            ),
        );
    }
}
