//! Weekly availability repository for the scheduling service.

use domain::models::availability::ScheduleTimes;
use sqlx::PgPool;
use uuid::Uuid;

use crate::entities::AvailabilityEntity;
use crate::metrics::QueryTimer;

const AVAILABILITY_COLUMNS: &str = "id, veterinarian_id, day_of_week, start_time, end_time, break_start, break_end, is_available, created_at, updated_at";

/// Repository for veterinarian working hours.
#[derive(Clone)]
pub struct AvailabilityRepository {
    pool: PgPool,
}

impl AvailabilityRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates an active schedule. A second active row for the same weekday
    /// violates `idx_availability_vet_day_active`.
    pub async fn create(
        &self,
        veterinarian_id: Uuid,
        day_of_week: i16,
        times: &ScheduleTimes,
    ) -> Result<AvailabilityEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_availability");
        let result = sqlx::query_as::<_, AvailabilityEntity>(&format!(
            r#"
            INSERT INTO weekly_availability
                (veterinarian_id, day_of_week, start_time, end_time, break_start, break_end)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {AVAILABILITY_COLUMNS}
            "#
        ))
        .bind(veterinarian_id)
        .bind(day_of_week)
        .bind(times.start_time)
        .bind(times.end_time)
        .bind(times.break_start)
        .bind(times.break_end)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<AvailabilityEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_availability_by_id");
        let result = sqlx::query_as::<_, AvailabilityEntity>(&format!(
            "SELECT {AVAILABILITY_COLUMNS} FROM weekly_availability WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// The active schedule for a vet on one weekday, if any.
    pub async fn find_active_for_day(
        &self,
        veterinarian_id: Uuid,
        day_of_week: i16,
    ) -> Result<Option<AvailabilityEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_active_availability_for_day");
        let result = sqlx::query_as::<_, AvailabilityEntity>(&format!(
            r#"
            SELECT {AVAILABILITY_COLUMNS}
            FROM weekly_availability
            WHERE veterinarian_id = $1 AND day_of_week = $2 AND is_available
            "#
        ))
        .bind(veterinarian_id)
        .bind(day_of_week)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn list(
        &self,
        veterinarian_id: Option<Uuid>,
        include_inactive: bool,
    ) -> Result<Vec<AvailabilityEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_availability");
        let result = sqlx::query_as::<_, AvailabilityEntity>(&format!(
            r#"
            SELECT {AVAILABILITY_COLUMNS}
            FROM weekly_availability
            WHERE ($1::uuid IS NULL OR veterinarian_id = $1)
              AND ($2 OR is_available)
            ORDER BY veterinarian_id, day_of_week, start_time
            "#
        ))
        .bind(veterinarian_id)
        .bind(include_inactive)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn update(
        &self,
        id: Uuid,
        times: &ScheduleTimes,
        is_available: Option<bool>,
    ) -> Result<Option<AvailabilityEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_availability");
        let result = sqlx::query_as::<_, AvailabilityEntity>(&format!(
            r#"
            UPDATE weekly_availability
            SET start_time = $2,
                end_time = $3,
                break_start = $4,
                break_end = $5,
                is_available = COALESCE($6, is_available)
            WHERE id = $1
            RETURNING {AVAILABILITY_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(times.start_time)
        .bind(times.end_time)
        .bind(times.break_start)
        .bind(times.break_end)
        .bind(is_available)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Marks the schedule unavailable. Returns false when the row does not exist.
    pub async fn deactivate(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("deactivate_availability");
        let result = sqlx::query("UPDATE weekly_availability SET is_available = false WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
