//! Prescription routes.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::medical_record::{CreatePrescriptionRequest, UpdatePrescriptionRequest};
use domain::models::{Prescription, Role};
use persistence::repositories::MedicalRecordRepository;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::rbac::CLINICIANS;
use crate::response::Envelope;
use crate::routes::medical_records::load_record;

fn prescription_not_found() -> ApiError {
    ApiError::NotFound("Prescription not found".to_string())
}

/// POST /medical/prescriptions
///
/// When enabled, the prescribed quantity is taken out of inventory. A failed
/// stock call leaves the prescription in place and is logged for
/// reconciliation.
pub async fn add_prescription(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreatePrescriptionRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&[Role::Admin, Role::Veterinarian])?;
    request.validate()?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    let record = load_record(&repo, request.medical_record_id).await?;
    if !record.status.is_editable() {
        return Err(ApiError::Conflict(
            "Reviewed medical records cannot be modified".to_string(),
        ));
    }

    let prescription: Prescription = repo.add_prescription(&request).await?.into();
    info!(
        prescription_id = %prescription.id,
        record_id = %record.id,
        medication_id = ?prescription.medication_id,
        "Prescription added"
    );

    let mut envelope = Envelope::created().message("Prescription added successfully");

    if state.config.medical.decrement_stock_on_prescription {
        if let Some((medication_id, quantity)) = request.stock_demand() {
            let reason = format!("Prescription for record {}", record.id);
            match state
                .inventory
                .reduce_stock(medication_id, quantity, &reason, prescription.id)
                .await
            {
                Ok(new_stock) => {
                    envelope = envelope.with("stock_updated", true).with("new_stock", new_stock);
                }
                Err(e) => {
                    warn!(
                        divergence = true,
                        prescription_id = %prescription.id,
                        medication_id = %medication_id,
                        quantity,
                        error = %e,
                        "Stock not reduced for prescription"
                    );
                    envelope = envelope.with("stock_updated", false);
                }
            }
        }
    }

    Ok(envelope.with("prescription", prescription))
}

/// GET /medical/prescriptions/by-record/:record_id
pub async fn list_by_record(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(record_id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    load_record(&repo, record_id).await?;
    let prescriptions: Vec<Prescription> = repo
        .prescriptions_for_record(record_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Envelope::ok()
        .with("count", prescriptions.len())
        .with("prescriptions", prescriptions))
}

/// PUT /medical/prescriptions/:id
///
/// Inventory is not touched; a changed quantity is reconciled by hand.
pub async fn update_prescription(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdatePrescriptionRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&[Role::Admin, Role::Veterinarian])?;
    request.validate()?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    let current: Prescription = repo
        .find_prescription(id)
        .await?
        .ok_or_else(prescription_not_found)?
        .into();
    let record = load_record(&repo, current.medical_record_id).await?;
    if !record.status.is_editable() {
        return Err(ApiError::Conflict(
            "Reviewed medical records cannot be modified".to_string(),
        ));
    }

    let prescription: Prescription = repo
        .update_prescription(id, &request)
        .await?
        // Reviewed or deleted in the meantime.
        .ok_or_else(|| {
            ApiError::Conflict("Reviewed medical records cannot be modified".to_string())
        })?
        .into();

    info!(
        prescription_id = %id,
        record_id = %record.id,
        updated_by = %auth.user_id,
        "Prescription updated"
    );

    Ok(Envelope::ok()
        .message("Prescription updated successfully")
        .with("prescription", prescription))
}

/// DELETE /medical/prescriptions/:id
///
/// Stock already taken out is not returned.
pub async fn delete_prescription(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&CLINICIANS)?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    let prescription: Prescription = repo
        .find_prescription(id)
        .await?
        .ok_or_else(prescription_not_found)?
        .into();
    let record = load_record(&repo, prescription.medical_record_id).await?;
    if !record.status.is_editable() {
        return Err(ApiError::Conflict(
            "Reviewed medical records cannot be modified".to_string(),
        ));
    }

    if !repo.delete_prescription(id).await? {
        return Err(prescription_not_found());
    }

    info!(prescription_id = %id, deleted_by = %auth.user_id, "Prescription deleted");

    Ok(Envelope::ok().message("Prescription deleted successfully"))
}
