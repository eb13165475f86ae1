//! Exam result routes.

use axum::{
    extract::{Path, State},
    Json,
};
use domain::models::medical_record::{CreateExamResultRequest, UpdateExamResultRequest};
use domain::models::ExamResult;
use persistence::repositories::{ExamResultChanges, MedicalRecordRepository, NewExamResult};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::rbac::CLINICIANS;
use crate::response::Envelope;
use crate::routes::medical_records::load_record;

fn exam_not_found() -> ApiError {
    ApiError::NotFound("Exam result not found".to_string())
}

/// POST /medical/exam-results
pub async fn add_exam_result(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateExamResultRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&CLINICIANS)?;
    request.validate()?;
    let date_performed = request.parsed_date()?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    load_record(&repo, request.medical_record_id).await?;

    let exam: ExamResult = repo
        .add_exam_result(NewExamResult {
            medical_record_id: request.medical_record_id,
            exam_name: request.exam_name.trim(),
            result_file_url: request.result_file_url.as_deref(),
            observations: request.observations.as_deref(),
            date_performed,
            performed_by: request.performed_by.as_deref(),
        })
        .await?
        .into();

    info!(
        exam_result_id = %exam.id,
        record_id = %exam.medical_record_id,
        exam_name = %exam.exam_name,
        "Exam result added"
    );

    Ok(Envelope::created()
        .message("Exam result added successfully")
        .with("exam_result", exam))
}

/// GET /medical/exam-results/by-record/:record_id
pub async fn list_by_record(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(record_id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    load_record(&repo, record_id).await?;
    let exams: Vec<ExamResult> = repo
        .exam_results_for_record(record_id)
        .await?
        .into_iter()
        .map(Into::into)
        .collect();

    Ok(Envelope::ok()
        .with("count", exams.len())
        .with("exam_results", exams))
}

/// PUT /medical/exam-results/:id
///
/// Only while the parent record has not been reviewed.
pub async fn update_exam_result(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateExamResultRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&CLINICIANS)?;
    request.validate()?;
    let date_performed = request.parsed_date()?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    let current: ExamResult = repo
        .find_exam_result(id)
        .await?
        .ok_or_else(exam_not_found)?
        .into();
    let record = load_record(&repo, current.medical_record_id).await?;
    if !record.status.is_editable() {
        return Err(ApiError::Conflict(
            "Reviewed medical records cannot be modified".to_string(),
        ));
    }

    let exam: ExamResult = repo
        .update_exam_result(
            id,
            ExamResultChanges {
                exam_name: request.exam_name.as_deref(),
                result_file_url: request.result_file_url.as_deref(),
                observations: request.observations.as_deref(),
                date_performed,
                performed_by: request.performed_by.as_deref(),
            },
        )
        .await?
        .ok_or_else(|| {
            ApiError::Conflict("Reviewed medical records cannot be modified".to_string())
        })?
        .into();

    info!(exam_result_id = %id, updated_by = %auth.user_id, "Exam result updated");

    Ok(Envelope::ok()
        .message("Exam result updated successfully")
        .with("exam_result", exam))
}

/// DELETE /medical/exam-results/:id
pub async fn delete_exam_result(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&CLINICIANS)?;

    let repo = MedicalRecordRepository::new(state.pool.clone());
    if repo.find_exam_result(id).await?.is_none() || !repo.delete_exam_result(id).await? {
        return Err(exam_not_found());
    }

    info!(exam_result_id = %id, deleted_by = %auth.user_id, "Exam result deleted");

    Ok(Envelope::ok().message("Exam result deleted successfully"))
}
