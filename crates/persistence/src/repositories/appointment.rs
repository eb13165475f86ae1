//! Appointment repository for the scheduling service.
//!
//! Booking and rescheduling run the availability decision inside one
//! transaction that holds a shared lock on the vet's schedule row. The partial
//! unique index `idx_appointments_active_slot` catches any race the lock does
//! not, and both paths report it as [`BookingError::Unavailable`].

use chrono::{NaiveDate, NaiveTime};
use domain::models::appointment::{
    AppointmentStatus, NewAppointment, Reschedule, UpdateAppointmentRequest,
};
use domain::models::availability::WeeklyAvailability;
use domain::services::scheduling::{is_available, weekday_index, ClosingTimePolicy};
use sqlx::{PgPool, Postgres, Transaction};
use thiserror::Error;
use uuid::Uuid;

use crate::entities::{AppointmentEntity, AppointmentStatusDb, AvailabilityEntity};
use crate::metrics::QueryTimer;

const APPOINTMENT_COLUMNS: &str = "id, pet_id, veterinarian_id, client_id, appointment_date, appointment_time, appointment_type, reason, notes, status, pet_name, pet_species, owner_name, created_at, updated_at";

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, Error)]
pub enum BookingError {
    #[error("Time slot not available")]
    Unavailable,
    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.code().as_deref() == Some(UNIQUE_VIOLATION))
}

fn active_statuses() -> Vec<AppointmentStatusDb> {
    AppointmentStatus::ACTIVE
        .iter()
        .copied()
        .map(AppointmentStatusDb::from)
        .collect()
}

/// Repository for appointments.
#[derive(Clone)]
pub struct AppointmentRepository {
    pool: PgPool,
}

impl AppointmentRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Checks the slot and inserts a `scheduled` appointment atomically.
    pub async fn book(
        &self,
        new: &NewAppointment,
        policy: ClosingTimePolicy,
    ) -> Result<AppointmentEntity, BookingError> {
        let timer = QueryTimer::new("book_appointment");
        let mut tx = self.pool.begin().await?;

        ensure_slot_free(
            &mut tx,
            new.veterinarian_id,
            new.appointment_date,
            new.appointment_time,
            None,
            policy,
        )
        .await?;

        let inserted = sqlx::query_as::<_, AppointmentEntity>(&format!(
            r#"
            INSERT INTO appointments
                (pet_id, veterinarian_id, client_id, appointment_date, appointment_time,
                 appointment_type, reason, notes, status, pet_name, pet_species, owner_name)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, 'scheduled', $9, $10, $11)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(new.pet_id)
        .bind(new.veterinarian_id)
        .bind(new.client_id)
        .bind(new.appointment_date)
        .bind(new.appointment_time)
        .bind(&new.appointment_type)
        .bind(&new.reason)
        .bind(new.notes.as_deref())
        .bind(new.pet_name.as_deref())
        .bind(new.pet_species.as_deref())
        .bind(new.owner_name.as_deref())
        .fetch_one(&mut *tx)
        .await;

        let appointment = match inserted {
            Ok(a) => a,
            Err(e) if is_unique_violation(&e) => return Err(BookingError::Unavailable),
            Err(e) => return Err(e.into()),
        };

        tx.commit().await.map_err(|e| {
            if is_unique_violation(&e) {
                BookingError::Unavailable
            } else {
                BookingError::Database(e)
            }
        })?;
        timer.record();
        Ok(appointment)
    }

    /// Updates an active appointment, moving it to `target` when given.
    ///
    /// The availability check ignores the appointment's own current slot. The
    /// slot move and the descriptive fields commit together or not at all.
    /// Returns `None` when the appointment is no longer active.
    pub async fn update(
        &self,
        id: Uuid,
        veterinarian_id: Uuid,
        target: Option<Reschedule>,
        update: &UpdateAppointmentRequest,
        policy: ClosingTimePolicy,
    ) -> Result<Option<AppointmentEntity>, BookingError> {
        let timer = QueryTimer::new("update_appointment");
        let mut tx = self.pool.begin().await?;

        if let Some(target) = target {
            ensure_slot_free(
                &mut tx,
                veterinarian_id,
                target.date,
                target.time,
                Some(id),
                policy,
            )
            .await?;
        }

        let updated = sqlx::query_as::<_, AppointmentEntity>(&format!(
            r#"
            UPDATE appointments
            SET appointment_date = COALESCE($2, appointment_date),
                appointment_time = COALESCE($3, appointment_time),
                appointment_type = COALESCE($4, appointment_type),
                reason = COALESCE($5, reason),
                notes = COALESCE($6, notes),
                pet_name = COALESCE($7, pet_name),
                pet_species = COALESCE($8, pet_species),
                owner_name = COALESCE($9, owner_name)
            WHERE id = $1 AND status = ANY($10)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(target.map(|t| t.date))
        .bind(target.map(|t| t.time))
        .bind(update.appointment_type.as_deref())
        .bind(update.reason.as_deref().map(str::trim))
        .bind(update.notes.as_deref())
        .bind(update.pet_name.as_deref())
        .bind(update.pet_species.as_deref())
        .bind(update.owner_name.as_deref())
        .bind(active_statuses())
        .fetch_optional(&mut *tx)
        .await;

        let appointment = match updated {
            Ok(a) => a,
            Err(e) if is_unique_violation(&e) => return Err(BookingError::Unavailable),
            Err(e) => return Err(e.into()),
        };

        tx.commit().await?;
        timer.record();
        Ok(appointment)
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AppointmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_appointment_by_id");
        let result = sqlx::query_as::<_, AppointmentEntity>(&format!(
            "SELECT {APPOINTMENT_COLUMNS} FROM appointments WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Times held by active appointments for a vet on a date, ascending.
    pub async fn booked_times(
        &self,
        veterinarian_id: Uuid,
        date: NaiveDate,
    ) -> Result<Vec<NaiveTime>, sqlx::Error> {
        let timer = QueryTimer::new("find_booked_times");
        let result = sqlx::query_scalar::<_, NaiveTime>(
            r#"
            SELECT appointment_time
            FROM appointments
            WHERE veterinarian_id = $1 AND appointment_date = $2 AND status = ANY($3)
            ORDER BY appointment_time
            "#,
        )
        .bind(veterinarian_id)
        .bind(date)
        .bind(active_statuses())
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Applies a status change only if the current status is one of `from`.
    ///
    /// Returns `None` when the appointment does not exist or is not in an
    /// allowed source status; callers tell the two apart with `find_by_id`.
    pub async fn transition(
        &self,
        id: Uuid,
        to: AppointmentStatus,
        from: &[AppointmentStatus],
    ) -> Result<Option<AppointmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("transition_appointment");
        let sources: Vec<AppointmentStatusDb> =
            from.iter().copied().map(AppointmentStatusDb::from).collect();
        let result = sqlx::query_as::<_, AppointmentEntity>(&format!(
            r#"
            UPDATE appointments
            SET status = $2
            WHERE id = $1 AND status = ANY($3)
            RETURNING {APPOINTMENT_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(AppointmentStatusDb::from(to))
        .bind(sources)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_by_veterinarian(
        &self,
        veterinarian_id: Uuid,
        start_date: Option<NaiveDate>,
        end_date: Option<NaiveDate>,
    ) -> Result<Vec<AppointmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_appointments_by_veterinarian");
        let result = sqlx::query_as::<_, AppointmentEntity>(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments
            WHERE veterinarian_id = $1
              AND ($2::date IS NULL OR appointment_date >= $2)
              AND ($3::date IS NULL OR appointment_date <= $3)
            ORDER BY appointment_date, appointment_time
            "#
        ))
        .bind(veterinarian_id)
        .bind(start_date)
        .bind(end_date)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list_by_client(
        &self,
        client_id: Uuid,
        status: Option<AppointmentStatus>,
    ) -> Result<Vec<AppointmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_appointments_by_client");
        let result = sqlx::query_as::<_, AppointmentEntity>(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments
            WHERE client_id = $1
              AND ($2::appointment_status IS NULL OR status = $2)
            ORDER BY appointment_date DESC, appointment_time DESC
            "#
        ))
        .bind(client_id)
        .bind(status.map(AppointmentStatusDb::from))
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// All appointments on `date`, optionally for one vet.
    pub async fn list_for_date(
        &self,
        date: NaiveDate,
        veterinarian_id: Option<Uuid>,
    ) -> Result<Vec<AppointmentEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_appointments_for_date");
        let result = sqlx::query_as::<_, AppointmentEntity>(&format!(
            r#"
            SELECT {APPOINTMENT_COLUMNS}
            FROM appointments
            WHERE appointment_date = $1
              AND ($2::uuid IS NULL OR veterinarian_id = $2)
            ORDER BY appointment_time, veterinarian_id
            "#
        ))
        .bind(date)
        .bind(veterinarian_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }
}

/// Locks the vet's schedule for the weekday and decides whether `time` is
/// bookable. `exclude` skips one appointment when rescheduling it.
async fn ensure_slot_free(
    tx: &mut Transaction<'_, Postgres>,
    veterinarian_id: Uuid,
    date: NaiveDate,
    time: NaiveTime,
    exclude: Option<Uuid>,
    policy: ClosingTimePolicy,
) -> Result<(), BookingError> {
    let schedule = sqlx::query_as::<_, AvailabilityEntity>(
        r#"
        SELECT id, veterinarian_id, day_of_week, start_time, end_time, break_start, break_end,
               is_available, created_at, updated_at
        FROM weekly_availability
        WHERE veterinarian_id = $1 AND day_of_week = $2 AND is_available
        FOR SHARE
        "#,
    )
    .bind(veterinarian_id)
    .bind(weekday_index(date))
    .fetch_optional(&mut **tx)
    .await?;

    let booked = sqlx::query_scalar::<_, NaiveTime>(
        r#"
        SELECT appointment_time
        FROM appointments
        WHERE veterinarian_id = $1 AND appointment_date = $2 AND status = ANY($3)
          AND ($4::uuid IS NULL OR id <> $4)
        "#,
    )
    .bind(veterinarian_id)
    .bind(date)
    .bind(active_statuses())
    .bind(exclude)
    .fetch_all(&mut **tx)
    .await?;

    let window = match schedule {
        Some(entity) => match WeeklyAvailability::from(entity).window() {
            Ok(w) => Some(w),
            Err(e) => {
                tracing::warn!(
                    veterinarian_id = %veterinarian_id,
                    error = %e,
                    "Stored schedule has an invalid window"
                );
                None
            }
        },
        None => None,
    };

    if is_available(window.as_ref(), time, &booked, policy) {
        Ok(())
    } else {
        Err(BookingError::Unavailable)
    }
}
