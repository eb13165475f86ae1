//! Medication and stock movement entities.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::medication::{Medication, MovementType, StockMovement};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for movement_type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "movement_type", rename_all = "lowercase")]
pub enum MovementTypeDb {
    In,
    Out,
    Adjustment,
}

impl From<MovementTypeDb> for MovementType {
    fn from(db: MovementTypeDb) -> Self {
        match db {
            MovementTypeDb::In => MovementType::In,
            MovementTypeDb::Out => MovementType::Out,
            MovementTypeDb::Adjustment => MovementType::Adjustment,
        }
    }
}

impl From<MovementType> for MovementTypeDb {
    fn from(t: MovementType) -> Self {
        match t {
            MovementType::In => MovementTypeDb::In,
            MovementType::Out => MovementTypeDb::Out,
            MovementType::Adjustment => MovementTypeDb::Adjustment,
        }
    }
}

/// Database row mapping for the medications table.
#[derive(Debug, Clone, FromRow)]
pub struct MedicationEntity {
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

impl From<MedicationEntity> for Medication {
    fn from(entity: MedicationEntity) -> Self {
        Self {
            id: entity.id,
            name: entity.name,
            description: entity.description,
            active_ingredient: entity.active_ingredient,
            concentration: entity.concentration,
            presentation: entity.presentation,
            laboratory: entity.laboratory,
            category: entity.category,
            unit_price: entity.unit_price,
            unit: entity.unit,
            stock_quantity: entity.stock_quantity,
            minimum_stock: entity.minimum_stock,
            expiration_date: entity.expiration_date,
            batch_number: entity.batch_number,
            supplier: entity.supplier,
            requires_prescription: entity.requires_prescription,
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the stock_movements table.
#[derive(Debug, Clone, FromRow)]
pub struct StockMovementEntity {
    pub id: Uuid,
    pub medication_id: Uuid,
    pub movement_type: MovementTypeDb,
    pub quantity_change: i32,
    pub resulting_quantity: i32,
    pub unit_cost: Option<f64>,
    pub total_cost: Option<f64>,
    pub reason: Option<String>,
    pub reference_id: Option<Uuid>,
    pub performed_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl From<StockMovementEntity> for StockMovement {
    fn from(entity: StockMovementEntity) -> Self {
        Self {
            id: entity.id,
            medication_id: entity.medication_id,
            movement_type: entity.movement_type.into(),
            quantity_change: entity.quantity_change,
            resulting_quantity: entity.resulting_quantity,
            unit_cost: entity.unit_cost,
            total_cost: entity.total_cost,
            reason: entity.reason,
            reference_id: entity.reference_id,
            performed_by: entity.performed_by,
            created_at: entity.created_at,
        }
    }
}
