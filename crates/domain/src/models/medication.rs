//! Medication catalogue and stock ledger models for the inventory service.

use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{parse_date, ParseError};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

/// Default look-ahead window for expiration alerts, in days.
pub const DEFAULT_EXPIRATION_DAYS: i64 = 30;

/// Longest accepted look-ahead window for expiration alerts, in days.
pub const MAX_EXPIRATION_DAYS: i64 = 3650;

/// Last expiration date covered by a window of `days` from `today`.
///
/// `None` when `days` is negative or longer than [`MAX_EXPIRATION_DAYS`].
pub fn expiration_cutoff(today: NaiveDate, days: i64) -> Option<NaiveDate> {
    if !(0..=MAX_EXPIRATION_DAYS).contains(&days) {
        return None;
    }
    Duration::try_days(days).and_then(|window| today.checked_add_signed(window))
}

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MovementType {
    In,
    Out,
    Adjustment,
}

impl MovementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            MovementType::In => "in",
            MovementType::Out => "out",
            MovementType::Adjustment => "adjustment",
        }
    }
}

impl FromStr for MovementType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "in" => Ok(MovementType::In),
            "out" => Ok(MovementType::Out),
            "adjustment" => Ok(MovementType::Adjustment),
            _ => Err(format!("Invalid movement type: {}", s)),
        }
    }
}

impl fmt::Display for MovementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A catalogue item with its current stock.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Medication {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub active_ingredient: Option<String>,
    pub concentration: Option<String>,
    pub presentation: Option<String>,
    pub laboratory: Option<String>,
    pub category: Option<String>,
    pub unit_price: Option<f64>,
    pub unit: Option<String>,
    pub stock_quantity: i32,
    pub minimum_stock: i32,
    pub expiration_date: Option<NaiveDate>,
    pub batch_number: Option<String>,
    pub supplier: Option<String>,
    pub requires_prescription: bool,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Medication {
    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity <= self.minimum_stock
    }

    /// Whole days from `today` to the expiration date. Negative once expired.
    pub fn days_until_expiration(&self, today: NaiveDate) -> Option<i64> {
        self.expiration_date.map(|d| (d - today).num_days())
    }
}

/// An append-only ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockMovement {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub movement_type: MovementType,
    /// Signed change applied to the stock count.
    pub quantity_change: i32,
    /// Stock count right after this movement.
    pub resulting_quantity: i32,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub reason: Option<String>,
    pub reference_id: Option<Uuid>,
    pub performed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// A movement about to be recorded.
#[derive(Debug, Clone, PartialEq)]
pub struct NewStockMovement {
    pub medication_id: Uuid,
    pub movement_type: MovementType,
    pub quantity_change: i32,
    pub unit_cost: Option<f64>,
    pub reason: Option<String>,
    pub reference_id: Option<Uuid>,
    pub performed_by: Option<Uuid>,
}

impl NewStockMovement {
    pub fn total_cost(&self) -> Option<f64> {
        self.unit_cost
            .map(|c| c * f64::from(self.quantity_change.unsigned_abs()))
    }
}

/// Request body for POST /inventory/medications.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateMedicationRequest {
    #[validate(
        length(min = 1, max = 255, message = "name must be 1-255 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub name: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub active_ingredient: Option<String>,
    #[validate(length(max = 100))]
    pub concentration: Option<String>,
    #[validate(length(max = 100))]
    pub presentation: Option<String>,
    #[validate(length(max = 255))]
    pub laboratory: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 0.0, message = "unit_price cannot be negative"))]
    pub unit_price: Option<f64>,
    #[validate(length(max = 50))]
    pub unit: Option<String>,
    #[validate(range(min = 0, message = "stock_quantity cannot be negative"))]
    pub stock_quantity: Option<i32>,
    #[validate(range(min = 0, message = "minimum_stock cannot be negative"))]
    pub minimum_stock: Option<i32>,
    /// `YYYY-MM-DD`
    pub expiration_date: Option<String>,
    #[validate(length(max = 100))]
    pub batch_number: Option<String>,
    #[validate(length(max = 255))]
    pub supplier: Option<String>,
    #[serde(default)]
    pub requires_prescription: bool,
}

impl CreateMedicationRequest {
    pub fn parsed_expiration(&self) -> Result<Option<NaiveDate>, ParseError> {
        parse_optional_date("expiration_date", self.expiration_date.as_deref())
    }
}

/// Request body for PUT /inventory/medications/:id.
///
/// Stock is not editable here; it only changes through the ledger.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateMedicationRequest {
    #[validate(length(min = 1, max = 255, message = "name must be 1-255 characters"))]
    pub name: Option<String>,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(length(max = 255))]
    pub active_ingredient: Option<String>,
    #[validate(length(max = 100))]
    pub concentration: Option<String>,
    #[validate(length(max = 100))]
    pub presentation: Option<String>,
    #[validate(length(max = 255))]
    pub laboratory: Option<String>,
    #[validate(length(max = 100))]
    pub category: Option<String>,
    #[validate(range(min = 0.0, message = "unit_price cannot be negative"))]
    pub unit_price: Option<f64>,
    #[validate(length(max = 50))]
    pub unit: Option<String>,
    #[validate(range(min = 0, message = "minimum_stock cannot be negative"))]
    pub minimum_stock: Option<i32>,
    pub expiration_date: Option<String>,
    #[validate(length(max = 100))]
    pub batch_number: Option<String>,
    #[validate(length(max = 255))]
    pub supplier: Option<String>,
    pub requires_prescription: Option<bool>,
}

impl UpdateMedicationRequest {
    pub fn parsed_expiration(&self) -> Result<Option<NaiveDate>, ParseError> {
        parse_optional_date("expiration_date", self.expiration_date.as_deref())
    }
}

fn parse_optional_date(field: &'static str, value: Option<&str>) -> Result<Option<NaiveDate>, ParseError> {
    value.map(|v| parse_date(field, v)).transpose()
}

/// Query parameters for GET /inventory/medications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListMedicationsQuery {
    pub category: Option<String>,
    /// Matches name or active ingredient, case-insensitive.
    pub search: Option<String>,
}

/// Request body for POST /inventory/add-stock and /inventory/reduce-stock.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StockChangeRequest {
    pub medication_id: Uuid,
    #[validate(range(min = 1, message = "quantity must be positive"))]
    pub quantity: i32,
    #[validate(length(max = 500))]
    pub reason: Option<String>,
    pub user_id: Option<Uuid>,
    pub reference_id: Option<Uuid>,
    #[validate(range(min = 0.0, message = "unit_cost cannot be negative"))]
    pub unit_cost: Option<f64>,
}

/// Request body for PUT /inventory/update-stock.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct UpdateStockRequest {
    pub medication_id: Uuid,
    pub quantity_change: i32,
    #[validate(
        length(min = 1, max = 500, message = "reason is required"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub reason: String,
    pub user_id: Option<Uuid>,
}

/// Query parameters for GET /inventory/alerts/expiring.
#[derive(Debug, Clone, Deserialize)]
pub struct ExpiringQuery {
    #[serde(default = "default_expiring_days")]
    pub days: i64,
}

fn default_expiring_days() -> i64 {
    DEFAULT_EXPIRATION_DAYS
}

/// A medication that is expired or expires within the requested window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExpiringMedication {
    #[serde(flatten)]
    pub medication: Medication,
    pub days_until_expiration: i64,
}

/// Result of a stock change: the new quantity and the ledger entry.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StockChangeResponse {
    pub medication_id: Uuid,
    pub new_stock: i32,
    pub low_stock: bool,
    pub movement: StockMovement,
}

/// Outcome of the expiration check.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExpirationCheckReport {
    pub days: i64,
    pub expiring_count: usize,
    pub low_stock_count: usize,
    pub notified: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(stock: i32, minimum: i32, expiration: Option<NaiveDate>) -> Medication {
        Medication {
            id: Uuid::new_v4(),
            name: "Amoxicillin 250mg".to_string(),
            description: None,
            active_ingredient: Some("amoxicillin".to_string()),
            concentration: None,
            presentation: None,
            laboratory: None,
            category: Some("antibiotic".to_string()),
            unit_price: Some(3.5),
            unit: Some("tablet".to_string()),
            stock_quantity: stock,
            minimum_stock: minimum,
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
    fn test_expiration_cutoff_bounds() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        assert_eq!(expiration_cutoff(today, 0), Some(today));
        assert_eq!(
            expiration_cutoff(today, 30),
            NaiveDate::from_ymd_opt(2025, 3, 31)
        );
        assert!(expiration_cutoff(today, MAX_EXPIRATION_DAYS).is_some());
        assert_eq!(expiration_cutoff(today, -1), None);
        assert_eq!(expiration_cutoff(today, MAX_EXPIRATION_DAYS + 1), None);
        assert_eq!(expiration_cutoff(today, 100_000_000), None);
        assert_eq!(expiration_cutoff(NaiveDate::MAX, 1), None);
    }

    #[test]
    fn test_low_stock_threshold_is_inclusive() {
        assert!(sample(10, 10, None).is_low_stock());
        assert!(sample(3, 10, None).is_low_stock());
        assert!(!sample(11, 10, None).is_low_stock());
    }

    #[test]
    fn test_days_until_expiration() {
        let today = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap();
        let soon = sample(5, 1, NaiveDate::from_ymd_opt(2025, 3, 8));
        let expired = sample(5, 1, NaiveDate::from_ymd_opt(2025, 2, 27));
        assert_eq!(soon.days_until_expiration(today), Some(7));
        assert_eq!(expired.days_until_expiration(today), Some(-2));
        assert_eq!(sample(5, 1, None).days_until_expiration(today), None);
    }

    #[test]
    fn test_stock_change_requires_positive_quantity() {
        let request = StockChangeRequest {
            medication_id: Uuid::new_v4(),
            quantity: 0,
            reason: None,
            user_id: None,
            reference_id: None,
            unit_cost: None,
        };
        assert!(request.validate().is_err());
    }

    #[test]
    fn test_expiring_query_default() {
        let query: ExpiringQuery = serde_json::from_str("{}").unwrap();
        assert_eq!(query.days, DEFAULT_EXPIRATION_DAYS);
    }

    #[test]
    fn test_total_cost_uses_absolute_quantity() {
        let movement = NewStockMovement {
            medication_id: Uuid::new_v4(),
            movement_type: MovementType::Adjustment,
            quantity_change: -4,
            unit_cost: Some(2.5),
            reason: None,
            reference_id: None,
            performed_by: None,
        };
        assert_eq!(movement.total_cost(), Some(10.0));
    }
}
