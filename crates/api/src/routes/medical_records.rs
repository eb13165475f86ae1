//! Medical record routes and the per-pet clinical summary.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::medical_record::{
    CreateRecordRequest, ListRecordsQuery, MedicalRecordDetail, MedicalSummary,
    UpdateRecordRequest,
};
use domain::models::pet::PetResponse;
use domain::models::{MedicalRecord, RecordStatus, Role};
use persistence::repositories::{MedicalRecordRepository, PetRepository, RecordFilter};
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::rbac::CLINICIANS;
use crate::response::Envelope;
use crate::routes::pets::load_visible;

const SUMMARY_RECENT_RECORDS: i64 = 5;
const SUMMARY_RECENT_PRESCRIPTIONS: i64 = 10;
const MAX_PAGE_SIZE: i64 = 500;

fn record_not_found() -> ApiError {
    ApiError::NotFound("Medical record not found".to_string())
}

pub(crate) async fn load_record(
    repo: &MedicalRecordRepository,
    id: Uuid,
) -> Result<MedicalRecord, ApiError> {
    Ok(repo.find_by_id(id).await?.ok_or_else(record_not_found)?.into())
}

fn record_filter(query: &ListRecordsQuery) -> Result<RecordFilter<'_>, ApiError> {
    if let Some(limit) = query.limit {
        if !(1..=MAX_PAGE_SIZE).contains(&limit) {
            return Err(ApiError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
    }
    let offset = query.offset.unwrap_or(0);
    if offset < 0 {
        return Err(ApiError::Validation("offset cannot be negative".to_string()));
    }
    Ok(RecordFilter {
        pet_id: query.pet_id,
        veterinarian_id: query.veterinarian_id,
        status: query.status,
        is_emergency: query.is_emergency,
        search: query.search_term(),
        limit: query.limit,
        offset,
    })
}

fn records<E: Into<MedicalRecord>>(rows: Vec<E>) -> Vec<MedicalRecord> {
    rows.into_iter().map(Into::into).collect()
}

/// POST /medical/records
///
/// The record starts as a draft owned by the given vet, or the caller.
pub async fn create_record(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateRecordRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&CLINICIANS)?;
    request.validate()?;

    let pets = PetRepository::new(state.pool.clone());
    load_visible(&pets, &auth, request.pet_id).await?;

    let veterinarian_id = request.veterinarian_id.unwrap_or(auth.user_id);
    let repo = MedicalRecordRepository::new(state.pool.clone());
    let record: MedicalRecord = repo.create(veterinarian_id, &request).await?.into();

    info!(
        record_id = %record.id,
        pet_id = %record.pet_id,
        veterinarian_id = %veterinarian_id,
        appointment_id = ?record.appointment_id,
        is_emergency = record.is_emergency,
        "Medical record created"
    );

    Ok(Envelope::created()
        .message("Medical record created successfully")
        .with("medical_record", record))
}

/// GET /medical/records/:id, with prescriptions and exam results.
pub async fn get_record(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    let repo = MedicalRecordRepository::new(state.pool.clone());
    let record = load_record(&repo, id).await?;
    if !auth.is_staff() {
        let pets = PetRepository::new(state.pool.clone());
        load_visible(&pets, &auth, record.pet_id).await?;
    }

    let detail = MedicalRecordDetail {
        prescriptions: records_into(repo.prescriptions_for_record(id).await?),
        exam_results: records_into(repo.exam_results_for_record(id).await?),
        record,
    };

    Ok(Envelope::ok().with("medical_record", detail))
}

fn records_into<E: Into<T>, T>(rows: Vec<E>) -> Vec<T> {
    rows.into_iter().map(Into::into).collect()
}

/// PUT /medical/records/:id
///
/// Reviewed records are frozen.
pub async fn update_record(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateRecordRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&CLINICIANS)?;
    request.validate()?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    let current = load_record(&repo, id).await?;
    if !current.status.is_editable() {
        return Err(ApiError::Conflict(
            "Reviewed medical records cannot be modified".to_string(),
        ));
    }

    let record: MedicalRecord = repo
        .update(id, &request)
        .await?
        // Reviewed in the meantime.
        .ok_or_else(|| {
            ApiError::Conflict("Reviewed medical records cannot be modified".to_string())
        })?
        .into();

    info!(record_id = %id, updated_by = %auth.user_id, "Medical record updated");

    Ok(Envelope::ok()
        .message("Medical record updated successfully")
        .with("medical_record", record))
}

async fn transition(
    repo: &MedicalRecordRepository,
    id: Uuid,
    target: RecordStatus,
) -> Result<MedicalRecord, ApiError> {
    let current = load_record(repo, id).await?;
    current.status.transition_to(target)?;

    Ok(repo
        .transition(id, target, RecordStatus::allowed_sources(target))
        .await?
        .ok_or_else(|| {
            ApiError::Conflict(format!(
                "Medical record can no longer be marked {}",
                target.as_str()
            ))
        })?
        .into())
}

/// PUT /medical/records/:id/complete
///
/// Also completes the linked appointment, best-effort.
pub async fn complete_record(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&CLINICIANS)?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    let record = transition(&repo, id, RecordStatus::Completed).await?;

    info!(record_id = %id, completed_by = %auth.user_id, "Medical record completed");

    if let Some(appointment_id) = record.appointment_id {
        let scheduling = state.scheduling.clone();
        tokio::spawn(async move {
            if let Err(e) = scheduling.complete_appointment(appointment_id).await {
                warn!(
                    record_id = %id,
                    appointment_id = %appointment_id,
                    error = %e,
                    "Could not complete linked appointment"
                );
            }
        });
    }

    Ok(Envelope::ok()
        .message("Medical record completed")
        .with("medical_record", record))
}

/// PUT /medical/records/:id/review
pub async fn review_record(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&[Role::Admin, Role::Veterinarian])?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    let record = transition(&repo, id, RecordStatus::Reviewed).await?;

    info!(record_id = %id, reviewed_by = %auth.user_id, "Medical record reviewed");

    Ok(Envelope::ok()
        .message("Medical record reviewed")
        .with("medical_record", record))
}

/// GET /medical/records?pet_id&veterinarian_id&status&is_emergency&search&limit&offset (staff)
pub async fn list_records(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;
    let filter = record_filter(&query)?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    let list = records(repo.list(filter).await?);

    Ok(Envelope::ok()
        .with("count", list.len())
        .with("medical_records", list))
}

/// GET /medical/records/statistics (staff)
pub async fn record_statistics(
    State(state): State<AppState>,
    auth: UserAuth,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    Ok(Envelope::ok().with("statistics", repo.statistics().await?))
}

/// GET /medical/records/pet/:pet_id?status&is_emergency&search
pub async fn list_by_pet(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(pet_id): Path<Uuid>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Envelope, ApiError> {
    let pets = PetRepository::new(state.pool.clone());
    load_visible(&pets, &auth, pet_id).await?;

    let filter = RecordFilter {
        pet_id: Some(pet_id),
        veterinarian_id: None,
        ..record_filter(&query)?
    };
    let repo = MedicalRecordRepository::new(state.pool.clone());
    let list = records(repo.list(filter).await?);

    Ok(Envelope::ok()
        .with("pet_id", pet_id)
        .with("count", list.len())
        .with("medical_records", list))
}

/// GET /medical/records/by-veterinarian/:vet_id?status&is_emergency&search (staff)
pub async fn list_by_veterinarian(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(veterinarian_id): Path<Uuid>,
    Query(query): Query<ListRecordsQuery>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;

    let filter = RecordFilter {
        pet_id: None,
        veterinarian_id: Some(veterinarian_id),
        ..record_filter(&query)?
    };
    let repo = MedicalRecordRepository::new(state.pool.clone());
    let list = records(repo.list(filter).await?);

    Ok(Envelope::ok()
        .with("veterinarian_id", veterinarian_id)
        .with("count", list.len())
        .with("medical_records", list))
}

/// DELETE /medical/records/:id
///
/// Prescriptions and exam results go with it.
pub async fn delete_record(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&[Role::Admin, Role::Veterinarian])?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    if !repo.delete(id).await? {
        return Err(record_not_found());
    }

    info!(record_id = %id, deleted_by = %auth.user_id, "Medical record deleted");

    Ok(Envelope::ok().message("Medical record deleted successfully"))
}

/// GET /medical/summary/pet/:pet_id
pub async fn pet_summary(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(pet_id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    let pets = PetRepository::new(state.pool.clone());
    let pet = load_visible(&pets, &auth, pet_id).await?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    let stats = repo.stats_for_pet(pet_id).await?;
    let summary = MedicalSummary {
        pet: PetResponse::from(pet),
        total_records: stats.total_records,
        emergency_visits: stats.emergency_visits,
        last_visit: stats.last_visit,
        recent_records: records(repo.recent_for_pet(pet_id, SUMMARY_RECENT_RECORDS).await?),
        recent_prescriptions: records_into(
            repo.recent_prescriptions_for_pet(pet_id, SUMMARY_RECENT_PRESCRIPTIONS)
                .await?,
        ),
    };

    Ok(Envelope::ok().with("summary", summary))
}
