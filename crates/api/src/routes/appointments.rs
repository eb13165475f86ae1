//! Appointment booking, availability lookup and status transitions.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::Utc;
use domain::models::appointment::{
    AppointmentResponse, AvailableSlotsQuery, ByClientQuery, ByVeterinarianQuery,
    CreateAppointmentRequest, UpdateAppointmentRequest,
};
use domain::models::{Appointment, AppointmentStatus, WeeklyAvailability};
use domain::services::scheduling::{free_slots, weekday_index, ClosingTimePolicy};
use persistence::repositories::{AppointmentRepository, AvailabilityRepository, BookingError};
use serde::Deserialize;
use shared::validation::{format_time, parse_date};
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::app::AppState;
use crate::error::ApiError;
use crate::extractors::UserAuth;
use crate::middleware::metrics::{record_appointment_booked, record_booking_conflict};
use crate::middleware::rbac::FRONT_DESK;
use crate::response::Envelope;
use crate::services::alerts;

fn appointment_not_found() -> ApiError {
    ApiError::NotFound("Appointment not found".to_string())
}

fn closing_policy(state: &AppState) -> ClosingTimePolicy {
    ClosingTimePolicy::from_allow_flag(state.config.scheduling.allow_booking_at_closing_time)
}

fn booking_error(err: BookingError) -> ApiError {
    if matches!(err, BookingError::Unavailable) {
        record_booking_conflict();
    }
    err.into()
}

fn responses<E: Into<Appointment>>(rows: Vec<E>) -> Vec<AppointmentResponse> {
    rows.into_iter()
        .map(|row| AppointmentResponse::from(row.into()))
        .collect()
}

async fn load(repo: &AppointmentRepository, id: Uuid) -> Result<Appointment, ApiError> {
    Ok(repo
        .find_by_id(id)
        .await?
        .ok_or_else(appointment_not_found)?
        .into())
}

/// Staff see every appointment; a client only their own.
fn ensure_can_view(auth: &UserAuth, appointment: &Appointment) -> Result<(), ApiError> {
    if auth.is_staff() || auth.user_id == appointment.client_id {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You can only access your own appointments".to_string(),
        ))
    }
}

/// Book an appointment.
///
/// POST /appointments/create
pub async fn create_appointment(
    State(state): State<AppState>,
    auth: UserAuth,
    Json(request): Json<CreateAppointmentRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;
    if !auth.is_staff() && request.client_id != auth.user_id {
        return Err(ApiError::Forbidden(
            "Clients can only book appointments for themselves".to_string(),
        ));
    }

    let new = request.parse()?;
    let repo = AppointmentRepository::new(state.pool.clone());
    let appointment: Appointment = repo
        .book(&new, closing_policy(&state))
        .await
        .map_err(booking_error)?
        .into();

    record_appointment_booked();
    info!(
        appointment_id = %appointment.id,
        veterinarian_id = %appointment.veterinarian_id,
        date = %appointment.appointment_date,
        time = %format_time(appointment.appointment_time),
        booked_by = %auth.user_id,
        "Appointment booked"
    );

    alerts::spawn_appointment_alert(
        state.notifier.clone(),
        alerts::appointment_alert(
            &appointment,
            state.config.scheduling.receptionist_emails.clone(),
        ),
    );

    Ok(Envelope::created()
        .message("Appointment created successfully")
        .with("appointment", AppointmentResponse::from(appointment)))
}

/// Free 30-minute slots for a vet on a date.
///
/// GET /appointments/available-slots?veterinarian_id=&date=YYYY-MM-DD
pub async fn available_slots(
    State(state): State<AppState>,
    _auth: UserAuth,
    Query(query): Query<AvailableSlotsQuery>,
) -> Result<Envelope, ApiError> {
    let date = parse_date("date", &query.date)?;

    let schedules = AvailabilityRepository::new(state.pool.clone());
    let schedule: Option<WeeklyAvailability> = schedules
        .find_active_for_day(query.veterinarian_id, weekday_index(date))
        .await?
        .map(Into::into);
    let window = schedule.map(|s| s.window()).transpose()?;

    let booked = AppointmentRepository::new(state.pool.clone())
        .booked_times(query.veterinarian_id, date)
        .await?;

    let slots: Vec<String> = free_slots(window.as_ref(), &booked)
        .into_iter()
        .map(format_time)
        .collect();

    Ok(Envelope::ok()
        .with("veterinarian_id", query.veterinarian_id)
        .with("date", date)
        .with("available_slots", slots))
}

/// Applies a status change guarded by the state machine.
async fn transition(
    state: &AppState,
    id: Uuid,
    target: AppointmentStatus,
) -> Result<Appointment, ApiError> {
    let repo = AppointmentRepository::new(state.pool.clone());
    let current = load(&repo, id).await?;
    current.status.transition_to(target)?;

    let updated = repo
        .transition(id, target, AppointmentStatus::allowed_sources(target))
        .await?
        // Lost a race with another transition.
        .ok_or_else(|| {
            ApiError::Conflict(format!(
                "Appointment can no longer be marked {}",
                target.as_str()
            ))
        })?;
    Ok(updated.into())
}

fn transition_envelope(appointment: Appointment, message: &str) -> Envelope {
    Envelope::ok()
        .message(message)
        .with("appointment", AppointmentResponse::from(appointment))
}

/// PUT /appointments/:id/confirm
pub async fn confirm_appointment(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_role(&FRONT_DESK)?;
    let appointment = transition(&state, id, AppointmentStatus::Confirmed).await?;
    info!(appointment_id = %id, by = %auth.user_id, "Appointment confirmed");
    Ok(transition_envelope(appointment, "Appointment confirmed"))
}

/// PUT /appointments/:id/cancel
///
/// Staff or the client who owns the appointment.
pub async fn cancel_appointment(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    if !auth.is_staff() {
        let repo = AppointmentRepository::new(state.pool.clone());
        ensure_can_view(&auth, &load(&repo, id).await?)?;
    }
    let appointment = transition(&state, id, AppointmentStatus::Cancelled).await?;
    info!(appointment_id = %id, by = %auth.user_id, "Appointment cancelled");
    Ok(transition_envelope(appointment, "Appointment cancelled"))
}

/// PUT /appointments/:id/complete
///
/// Also called by the medical service when a record is completed.
pub async fn complete_appointment(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;
    let appointment = transition(&state, id, AppointmentStatus::Completed).await?;
    info!(appointment_id = %id, by = %auth.user_id, service = auth.is_service, "Appointment completed");
    Ok(transition_envelope(appointment, "Appointment completed"))
}

/// GET /appointments/by-veterinarian/:vet_id?start_date=&end_date=
pub async fn by_veterinarian(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(veterinarian_id): Path<Uuid>,
    Query(query): Query<ByVeterinarianQuery>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;
    let start = query
        .start_date
        .as_deref()
        .map(|d| parse_date("start_date", d))
        .transpose()?;
    let end = query
        .end_date
        .as_deref()
        .map(|d| parse_date("end_date", d))
        .transpose()?;

    let repo = AppointmentRepository::new(state.pool.clone());
    let appointments = responses(repo.list_by_veterinarian(veterinarian_id, start, end).await?);

    Ok(Envelope::ok()
        .with("count", appointments.len())
        .with("appointments", appointments))
}

/// GET /appointments/by-client/:client_id?status=
pub async fn by_client(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(client_id): Path<Uuid>,
    Query(query): Query<ByClientQuery>,
) -> Result<Envelope, ApiError> {
    if !auth.is_staff() && auth.user_id != client_id {
        return Err(ApiError::Forbidden(
            "You can only access your own appointments".to_string(),
        ));
    }

    let repo = AppointmentRepository::new(state.pool.clone());
    let appointments = responses(repo.list_by_client(client_id, query.status).await?);

    Ok(Envelope::ok()
        .with("count", appointments.len())
        .with("appointments", appointments))
}

#[derive(Debug, Default, Deserialize)]
pub struct TodayQuery {
    pub veterinarian_id: Option<Uuid>,
}

/// GET /appointments/today?veterinarian_id=
pub async fn today(
    State(state): State<AppState>,
    auth: UserAuth,
    Query(query): Query<TodayQuery>,
) -> Result<Envelope, ApiError> {
    auth.require_staff()?;
    let date = Utc::now().date_naive();

    let repo = AppointmentRepository::new(state.pool.clone());
    let appointments = responses(repo.list_for_date(date, query.veterinarian_id).await?);

    Ok(Envelope::ok()
        .with("date", date)
        .with("count", appointments.len())
        .with("appointments", appointments))
}

/// GET /appointments/:id
pub async fn get_appointment(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
) -> Result<Envelope, ApiError> {
    let repo = AppointmentRepository::new(state.pool.clone());
    let appointment = load(&repo, id).await?;
    ensure_can_view(&auth, &appointment)?;

    Ok(Envelope::ok().with("appointment", AppointmentResponse::from(appointment)))
}

/// Update descriptive fields and optionally move the appointment.
///
/// PUT /appointments/:id
pub async fn update_appointment(
    State(state): State<AppState>,
    auth: UserAuth,
    Path(id): Path<Uuid>,
    Json(request): Json<UpdateAppointmentRequest>,
) -> Result<Envelope, ApiError> {
    request.validate()?;

    let repo = AppointmentRepository::new(state.pool.clone());
    let current = load(&repo, id).await?;
    ensure_can_view(&auth, &current)?;
    if current.status.is_terminal() {
        return Err(ApiError::Conflict(format!(
            "Cannot modify an appointment that is {}",
            current.status.as_str()
        )));
    }

    let target = request.reschedule(&current)?;
    let updated: Appointment = repo
        .update(id, current.veterinarian_id, target, &request, closing_policy(&state))
        .await
        .map_err(booking_error)?
        .ok_or_else(|| ApiError::Conflict("Appointment is no longer active".to_string()))?
        .into();
    if let Some(target) = target {
        info!(
            appointment_id = %id,
            date = %target.date,
            time = %format_time(target.time),
            "Appointment rescheduled"
        );
    }

    Ok(Envelope::ok()
        .message("Appointment updated successfully")
        .with("appointment", AppointmentResponse::from(updated)))
}
