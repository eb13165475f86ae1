//! Medication repository: catalogue and stock ledger for the inventory service.
//!
//! Stock only changes through [`MedicationRepository::apply_movement`], which
//! locks the row, checks the change against the ledger rules and writes the
//! ledger row in one transaction.

use chrono::NaiveDate;
use domain::models::medication::{
    CreateMedicationRequest, MovementType, NewStockMovement, UpdateMedicationRequest,
};
use domain::services::stock::{apply_delta, StockRuleError};
use sqlx::PgPool;
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{MedicationEntity, MovementTypeDb, StockMovementEntity};
use crate::metrics::QueryTimer;

const MEDICATION_COLUMNS: &str = "id, name, description, active_ingredient, concentration, presentation, laboratory, category, unit_price, unit, stock_quantity, minimum_stock, expiration_date, batch_number, supplier, requires_prescription, is_active, created_at, updated_at";

const MOVEMENT_COLUMNS: &str = "id, medication_id, movement_type, quantity_change, resulting_quantity, unit_cost, total_cost, reason, reference_id, performed_by, created_at";

#[derive(Debug, Error)]
pub enum StockError {
    #[error("Medication not found")]
    NotFound,
    #[error(transparent)]
    Rejected(#[from] StockRuleError),
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

/// The medication after a stock change and the ledger row that recorded it.
#[derive(Debug, Clone)]
pub struct StockUpdate {
    pub medication: MedicationEntity,
    pub movement: StockMovementEntity,
}

/// Repository for the medication catalogue and stock ledger.
#[derive(Clone)]
pub struct MedicationRepository {
    pool: PgPool,
}

impl MedicationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a catalogue item.
    ///
    /// The initial stock is the ledger's baseline: stock always equals it plus
    /// the sum of the recorded movements.
    pub async fn create(
        &self,
        request: &CreateMedicationRequest,
        expiration_date: Option<NaiveDate>,
    ) -> Result<MedicationEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_medication");
        let result = sqlx::query_as::<_, MedicationEntity>(&format!(
            r#"
            INSERT INTO medications
                (name, description, active_ingredient, concentration, presentation, laboratory,
                 category, unit_price, unit, stock_quantity, minimum_stock, expiration_date,
                 batch_number, supplier, requires_prescription)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            RETURNING {MEDICATION_COLUMNS}
            "#
        ))
        .bind(request.name.trim())
        .bind(request.description.as_deref())
        .bind(request.active_ingredient.as_deref())
        .bind(request.concentration.as_deref())
        .bind(request.presentation.as_deref())
        .bind(request.laboratory.as_deref())
        .bind(request.category.as_deref())
        .bind(request.unit_price)
        .bind(request.unit.as_deref())
        .bind(request.stock_quantity.unwrap_or(0))
        .bind(request.minimum_stock.unwrap_or(0))
        .bind(expiration_date)
        .bind(request.batch_number.as_deref())
        .bind(request.supplier.as_deref())
        .bind(request.requires_prescription)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Finds an active medication.
    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MedicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_medication_by_id");
        let result = sqlx::query_as::<_, MedicationEntity>(&format!(
            "SELECT {MEDICATION_COLUMNS} FROM medications WHERE id = $1 AND is_active"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Active medications filtered by category and a name/ingredient fragment.
    pub async fn list(
        &self,
        category: Option<&str>,
        search: Option<&str>,
    ) -> Result<Vec<MedicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_medications");
        let pattern = search.map(|s| format!("%{}%", s.trim()));
        let result = sqlx::query_as::<_, MedicationEntity>(&format!(
            r#"
            SELECT {MEDICATION_COLUMNS}
            FROM medications
            WHERE is_active
              AND ($1::text IS NULL OR LOWER(category) = LOWER($1))
              AND ($2::text IS NULL OR name ILIKE $2 OR active_ingredient ILIKE $2)
            ORDER BY name
            "#
        ))
        .bind(category)
        .bind(pattern)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Catalogue update. Never touches `stock_quantity`.
    pub async fn update(
        &self,
        id: Uuid,
        request: &UpdateMedicationRequest,
        expiration_date: Option<NaiveDate>,
    ) -> Result<Option<MedicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_medication");
        let result = sqlx::query_as::<_, MedicationEntity>(&format!(
            r#"
            UPDATE medications
            SET name = COALESCE($2, name),
                description = COALESCE($3, description),
                active_ingredient = COALESCE($4, active_ingredient),
                concentration = COALESCE($5, concentration),
                presentation = COALESCE($6, presentation),
                laboratory = COALESCE($7, laboratory),
                category = COALESCE($8, category),
                unit_price = COALESCE($9, unit_price),
                unit = COALESCE($10, unit),
                minimum_stock = COALESCE($11, minimum_stock),
                expiration_date = COALESCE($12, expiration_date),
                batch_number = COALESCE($13, batch_number),
                supplier = COALESCE($14, supplier),
                requires_prescription = COALESCE($15, requires_prescription)
            WHERE id = $1 AND is_active
            RETURNING {MEDICATION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.name.as_deref().map(str::trim))
        .bind(request.description.as_deref())
        .bind(request.active_ingredient.as_deref())
        .bind(request.concentration.as_deref())
        .bind(request.presentation.as_deref())
        .bind(request.laboratory.as_deref())
        .bind(request.category.as_deref())
        .bind(request.unit_price)
        .bind(request.unit.as_deref())
        .bind(request.minimum_stock)
        .bind(expiration_date)
        .bind(request.batch_number.as_deref())
        .bind(request.supplier.as_deref())
        .bind(request.requires_prescription)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Soft delete.
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_medication");
        let result =
            sqlx::query("UPDATE medications SET is_active = false WHERE id = $1 AND is_active")
                .bind(id)
                .execute(&self.pool)
                .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    /// Applies a signed stock change and appends its ledger row atomically.
    ///
    /// The row is locked `FOR UPDATE` before the change is checked, so
    /// concurrent reductions serialize and can never overdraw. On failure
    /// nothing is written.
    pub async fn apply_movement(
        &self,
        movement: &NewStockMovement,
    ) -> Result<StockUpdate, StockError> {
        let timer = QueryTimer::new("apply_stock_movement");
        let mut tx = self.pool.begin().await?;

        let current = sqlx::query_scalar::<_, i32>(
            "SELECT stock_quantity FROM medications WHERE id = $1 AND is_active FOR UPDATE",
        )
        .bind(movement.medication_id)
        .fetch_optional(&mut *tx)
        .await?;
        let Some(current) = current else {
            timer.record();
            return Err(StockError::NotFound);
        };

        // The row stays locked until commit, so this decision holds for the write.
        if let Err(rule) = apply_delta(current, movement.quantity_change) {
            timer.record();
            return Err(rule.into());
        }

        let medication = sqlx::query_as::<_, MedicationEntity>(&format!(
            r#"
            UPDATE medications
            SET stock_quantity = stock_quantity + $2
            WHERE id = $1 AND is_active AND stock_quantity + $2 >= 0
            RETURNING {MEDICATION_COLUMNS}
            "#
        ))
        .bind(movement.medication_id)
        .bind(movement.quantity_change)
        .fetch_one(&mut *tx)
        .await?;

        let ledger_row = sqlx::query_as::<_, StockMovementEntity>(&format!(
            r#"
            INSERT INTO stock_movements
                (medication_id, movement_type, quantity_change, resulting_quantity, unit_cost,
                 total_cost, reason, reference_id, performed_by)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {MOVEMENT_COLUMNS}
            "#
        ))
        .bind(movement.medication_id)
        .bind(MovementTypeDb::from(movement.movement_type))
        .bind(movement.quantity_change)
        .bind(medication.stock_quantity)
        .bind(movement.unit_cost)
        .bind(movement.total_cost())
        .bind(movement.reason.as_deref())
        .bind(movement.reference_id)
        .bind(movement.performed_by)
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        timer.record();

        tracing::debug!(
            medication_id = %movement.medication_id,
            movement_type = movement.movement_type.as_str(),
            quantity_change = movement.quantity_change,
            new_stock = medication.stock_quantity,
            "Stock movement recorded"
        );

        Ok(StockUpdate {
            medication,
            movement: ledger_row,
        })
    }

    /// Ledger rows for a medication, newest first.
    pub async fn movements(
        &self,
        medication_id: Uuid,
        movement_type: Option<MovementType>,
    ) -> Result<Vec<StockMovementEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_stock_movements");
        let result = sqlx::query_as::<_, StockMovementEntity>(&format!(
            r#"
            SELECT {MOVEMENT_COLUMNS}
            FROM stock_movements
            WHERE medication_id = $1 AND ($2::movement_type IS NULL OR movement_type = $2)
            ORDER BY created_at DESC, id
            "#
        ))
        .bind(medication_id)
        .bind(movement_type.map(MovementTypeDb::from))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Active medications at or below their minimum stock.
    pub async fn low_stock(&self) -> Result<Vec<MedicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_low_stock_medications");
        let result = sqlx::query_as::<_, MedicationEntity>(&format!(
            r#"
            SELECT {MEDICATION_COLUMNS}
            FROM medications
            WHERE is_active AND stock_quantity <= minimum_stock
            ORDER BY stock_quantity - minimum_stock, name
            "#
        ))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Active medications expiring on or before `until`, expired ones included.
    pub async fn expiring_before(
        &self,
        until: NaiveDate,
    ) -> Result<Vec<MedicationEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_expiring_medications");
        let result = sqlx::query_as::<_, MedicationEntity>(&format!(
            r#"
            SELECT {MEDICATION_COLUMNS}
            FROM medications
            WHERE is_active AND expiration_date IS NOT NULL AND expiration_date <= $1
            ORDER BY expiration_date, name
            "#
        ))
        .bind(until)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}
