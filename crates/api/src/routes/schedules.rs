//! Weekly availability management for veterinarians.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use domain::models::availability::{
    CreateScheduleRequest, ListSchedulesQuery, ScheduleResponse, UpdateScheduleRequest,
};
use domain::models::{Role, WeeklyAvailability};
use persistence::repositories::AvailabilityRepository;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::response::Envelope;

fn schedule_not_found() -> ApiError {
    ApiError::NotFound("Schedule not found".to_string())
}

/// Unique-violation means the vet already has an active schedule that day.
fn duplicate_day(err: sqlx::Error) -> ApiError {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => ApiError::Conflict(
            "Veterinarian already has a schedule for this day".to_string(),
        ),
        _ => err.into(),
    }
}

async fn load(repo: &AvailabilityRepository, id: Uuid) -> Result<WeeklyAvailability, ApiError> {
    Ok(repo.find_by_id(id).await?.ok_or_else(schedule_not_found)?.into())
}

/// POST /appointments/schedules
///
/// Admins manage any vet. A veterinarian only manages their own schedule.
pub async fn create_schedule(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateScheduleRequest>,
) -> Result<Envelope, ApiError> {
    auth.require_self_or(request.veterinarian_id, &[Role::Admin])?;
    request.validate()?;
    let times = request.parse()?;

    let repo = AvailabilityRepository::new(state.pool.clone());
    let schedule: WeeklyAvailability = repo
        .create(request.veterinarian_id, request.day_of_week, &times)
        .await
        .map_err(duplicate_day)?
        .into();

    info!(
        schedule_id = %schedule.id,
        veterinarian_id = %schedule.veterinarian_id,
        day_of_week = schedule.day_of_week,
        "Schedule created"
    );

    Ok(Envelope::created()
        .message("Schedule created successfully")
        .with("schedule", ScheduleResponse::from(schedule)))
}

/// GET /appointments/schedules?veterinarian_id=&include_inactive=
pub async fn list_schedules(
    State(state): State<AppState>,
    _auth: UserAuth,
    Query(query): Query<ListSchedulesQuery>,
) -> Result<Envelope, ApiError> {
    let repo = AvailabilityRepository::new(state.pool.clone());
    let schedules: Vec<ScheduleResponse> = repo
        .list(query.veterinarian_id, query.include_inactive)
        .await?
        .into_iter()
        .map(|e| ScheduleResponse::from(WeeklyAvailability::from(e)))
        .collect();

    Ok(Envelope::ok()
        .with("count", schedules.len())
        .with("schedules", schedules))
}

/// GET /appointments/schedules/veterinarian/:vet_id
pub async fn list_for_veterinarian(
    State(state): State<AppState>,
    _auth: UserAuth,
    Path(veterinarian_id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    let repo = AvailabilityRepository::new(state.pool.clone());
    let schedules: Vec<ScheduleResponse> = repo
        .list(Some(veterinarian_id), false)
        .await?
        .into_iter()
        .map(|e| ScheduleResponse::from(WeeklyAvailability::from(e)))
        .collect();

    Ok(Envelope::ok()
        .with("veterinarian_id", veterinarian_id)
        .with("schedules", schedules))
}

/// PUT /appointments/schedules/:id
pub async fn update_schedule(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateScheduleRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;

    let repo = AvailabilityRepository::new(state.pool.clone());
    let current = load(&repo, id).await?;
    auth.require_self_or(current.veterinarian_id, &[Role::Admin])?;

    let times = request.merge(&current)?;
    let updated: WeeklyAvailability = repo
        .update(id, &times, request.is_available)
        .await
        .map_err(duplicate_day)?
        .ok_or_else(schedule_not_found)?
        .into();

    info!(schedule_id = %id, updated_by = %auth.user_id, "Schedule updated");

    Ok(Envelope::ok()
        .message("Schedule updated successfully")
        .with("schedule", ScheduleResponse::from(updated)))
}

/// DELETE /appointments/schedules/:id
///
/// Marks the schedule unavailable; past appointments keep their reference.
pub async fn delete_schedule(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    let repo = AvailabilityRepository::new(state.pool.clone());
    let current = load(&repo, id).await?;
    auth.require_self_or(current.veterinarian_id, &[Role::Admin])?;

    if !repo.deactivate(id).await? {
        return Err(schedule_not_found());
    }

    info!(schedule_id = %id, deleted_by = %auth.user_id, "Schedule deactivated");

    Ok(Envelope::ok().message("Schedule deleted successfully"))
}
