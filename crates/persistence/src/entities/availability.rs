//! Weekly availability entity (database row mapping).

use chrono::{DateTime, NaiveTime, Utc};
use domain::models::availability::WeeklyAvailability;
use sqlx::FromRow;
use uuid::Uuid;

/// Database row mapping for the weekly_availability table.
#[derive(Debug, Clone, FromRow)]
pub struct AvailabilityEntity {
    pub id: Uuid,
    pub veterinarian_id: Uuid,
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AvailabilityEntity> for WeeklyAvailability {
    fn from(entity: AvailabilityEntity) -> Self {
        Self {
            id: entity.id,
            veterinarian_id: entity.veterinarian_id,
            day_of_week: entity.day_of_week,
            start_time: entity.start_time,
            end_time: entity.end_time,
            break_start: entity.break_start,
            break_end: entity.break_end,
            is_available: entity.is_available,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
