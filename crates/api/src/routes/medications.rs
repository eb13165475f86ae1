//! Inventory routes: medication catalogue, stock ledger and alerts.
//!
//! Every route here is staff-only; the group is wrapped in `require_staff`.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::{NaiveDate, Utc};
use domain::models::medication::{
    expiration_cutoff, CreateMedicationRequest, ExpiringQuery, ListMedicationsQuery,
    NewStockMovement, StockChangeRequest, StockChangeResponse, UpdateMedicationRequest,
    UpdateStockRequest, MAX_EXPIRATION_DAYS,
};
use domain::models::{Medication, MovementType, StockMovement};
use domain::services::stock::{self, StockRuleError};
use persistence::repositories::{MedicationRepository, StockError};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::{record_insufficient_stock, record_stock_movement};
use crate::response::Envelope;

fn medication_not_found() -> ApiError {
    ApiError::NotFound("Medication not found".to_string())
}

/// POST /inventory/medications
///
/// The initial stock is the ledger baseline and records no movement.
pub async fn create_medication(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateMedicationRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;
    let expiration = request.parsed_expiration()?;

    let repo = MedicationRepository::new(state.pool.clone());
    let medication: Medication = repo
        .create(&request, expiration)
        .await?
        .into();

    info!(
        medication_id = %medication.id,
        name = %medication.name,
        stock = medication.stock_quantity,
        created_by = %auth.user_id,
        "Medication created"
    );

    Ok(Envelope::created()
        .message("Medication created successfully")
        .with("medication", medication))
}

/// GET /inventory/medications?category=&search=
pub async fn list_medications(
    State(state): State<AppState>,
    _auth: UserAuth,
    Query(query): Query<ListMedicationsQuery>,
) -> Result<Envelope, ApiError> {
    let repo = MedicationRepository::new(state.pool.clone());
    let medications: Vec<Medication> = repo
        .list(query.category.as_deref(), query.search.as_deref())
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Envelope::ok()
        .with("count", medications.len())
        .with("medications", medications))
}

/// GET /inventory/medications/:id
pub async fn get_medication(
    State(state): State<AppState>,
    _auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    let repo = MedicationRepository::new(state.pool.clone());
    let medication: Medication = repo
        .find_by_id(id)
        .await?
        .ok_or_else(medication_not_found)?
        .into();

    Ok(Envelope::ok().with("medication", medication))
}

/// PUT /inventory/medications/:id
///
/// Stock is not editable here; use the stock endpoints.
pub async fn update_medication(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateMedicationRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;
    let expiration = request.parsed_expiration()?;

    let repo = MedicationRepository::new(state.pool.clone());
    let medication: Medication = repo
        .update(id, &request, expiration)
        .await?
        .ok_or_else(medication_not_found)?
        .into();

    info!(medication_id = %id, updated_by = %auth.user_id, "Medication updated");

    Ok(Envelope::ok()
        .message("Medication updated successfully")
        .with("medication", medication))
}

/// DELETE /inventory/medications/:id (admin, soft delete)
pub async fn deactivate_medication(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_admin()?;

    let repo = MedicationRepository::new(state.pool.clone());
    if !repo.deactivate(id).await? {
        return Err(medication_not_found());
    }

    info!(medication_id = %id, deactivated_by = %auth.user_id, "Medication deactivated");

    Ok(Envelope::ok().message("Medication deactivated successfully"))
}

#[derive(Debug, Default, Deserialize)]
pub struct MovementsQuery {
    pub movement_type: Option<MovementType>,
}

/// GET /inventory/medications/:id/movements?movement_type=
pub async fn list_movements(
    State(state): State<AppState>,
    _auth: UserAuth,
    Path(id): Path<Uuid>,
    Query(query): Query<MovementsQuery>,
) -> Result<Envelope, ApiError> {
    let repo = MedicationRepository::new(state.pool.clone());
    repo.find_by_id(id).await?.ok_or_else(medication_not_found)?;

    let movements: Vec<StockMovement> = repo
        .movements(id, query.movement_type)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Envelope::ok()
        .with("medication_id", id)
        .with("count", movements.len())
        .with("movements", movements))
}

/// Applies a ledger entry and answers with the new stock level.
async fn apply(
    state: &AppState,
    movement: Result<NewStockMovement, StockRuleError>,
    message: &str,
) -> Result<Envelope, ApiError> {
    let movement = movement?;
    let repo = MedicationRepository::new(state.pool.clone());

    let update = repo.apply_movement(&movement).await.map_err(|e| {
        if let StockError::Rejected(StockRuleError::Insufficient { available, requested }) = &e {
            record_insufficient_stock();
            info!(
                medication_id = %movement.medication_id,
                available,
                requested,
                "Stock change rejected"
            );
        }
        ApiError::from(e)
    })?;

    let medication: Medication = update.medication.into();
    let movement: StockMovement = update.movement.into();
    record_stock_movement(movement.movement_type.as_str());
    info!(
        medication_id = %medication.id,
        movement_type = movement.movement_type.as_str(),
        quantity_change = movement.quantity_change,
        new_stock = medication.stock_quantity,
        "Stock updated"
    );

    if movement.quantity_change < 0 {
        state.alerts.alert_if_low(&medication);
    }

    let response = StockChangeResponse {
        medication_id: medication.id,
        new_stock: medication.stock_quantity,
        low_stock: medication.is_low_stock(),
        movement,
    };
    Ok(Envelope::ok()
        .message(message)
        .with("new_stock", response.new_stock)
        .with("low_stock", response.low_stock)
        .with("stock_change", response))
}

/// POST /inventory/add-stock
pub async fn add_stock(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<StockChangeRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;
    apply(
        &state,
        stock::stock_in(&request, actor(&auth)),
        "Stock added successfully",
    )
    .await
}

/// POST /inventory/reduce-stock
///
/// Rejected with 409 when the stock would go negative; nothing is written.
pub async fn reduce_stock(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<StockChangeRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;
    apply(
        &state,
        stock::stock_out(&request, actor(&auth)),
        "Stock reduced successfully",
    )
    .await
}

/// PUT /inventory/update-stock
pub async fn update_stock(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<UpdateStockRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;
    apply(
        &state,
        stock::adjustment(&request, actor(&auth)),
        "Stock adjusted successfully",
    )
    .await
}

/// Service tokens have no account behind them.
fn actor(auth: &UserAuth) -> Option<Uuid> {
    (!auth.is_service).then_some(auth.user_id)
}

/// GET /inventory/alerts/low-stock
pub async fn low_stock_alerts(
    State(state): State<AppState>,
    _auth: UserAuth,
) -> Result<Envelope, ApiError> {
    let medications = state.alerts.low_stock().await?;

    Ok(Envelope::ok()
        .with("count", medications.len())
        .with("medications", medications))
}

fn check_days(today: NaiveDate, days: i64) -> Result<(), ApiError> {
    expiration_cutoff(today, days).map(|_| ()).ok_or_else(|| {
        ApiError::Validation(format!(
            "days must be between 0 and {}",
            MAX_EXPIRATION_DAYS
        ))
    })
}

/// GET /inventory/alerts/expiring?days=N
///
/// Includes medications that have already expired.
pub async fn expiring_alerts(
    State(state): State<AppState>,
    _auth: UserAuth,
    Query(query): Query<ExpiringQuery>,
) -> Result<Envelope, ApiError> {
    let today = Utc::now().date_naive();
    check_days(today, query.days)?;
    let medications = state.alerts.expiring(today, query.days).await?;

    Ok(Envelope::ok()
        .with("days", query.days)
        .with("count", medications.len())
        .with("medications", medications))
}

#[derive(Debug, Default, Deserialize)]
pub struct CheckExpirationQuery {
    pub days: Option<i64>,
    pub notify: Option<bool>,
}

/// POST /inventory/alerts/check-expiration
///
/// Runs the daily expiration check on demand.
pub async fn check_expiration(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<CheckExpirationQuery>,
) -> Result<Envelope, ApiError> {
    let settings = &state.config.inventory;
    let days = query.days.unwrap_or(settings.expiration_alert_days);
    check_days(Utc::now().date_naive(), days)?;
    let notify = query.notify.unwrap_or(settings.auto_alerts_enabled);

    let report = state.alerts.check_expiration(days, notify).await?;
    info!(triggered_by = %auth.user_id, days, notify, "Manual expiration check");

    Ok(Envelope::ok()
        .message("Expiration check completed")
        .with("report", report))
}
