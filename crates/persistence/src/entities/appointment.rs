//! Appointment entity (database row mapping).

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use domain::models::appointment::{Appointment, AppointmentStatus};
use sqlx::postgres::{PgHasArrayType, PgTypeInfo};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for appointment_status that maps to PostgreSQL enum type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "appointment_status", rename_all = "lowercase")]
pub enum AppointmentStatusDb {
    Scheduled,
    Confirmed,
    Completed,
    Cancelled,
}

impl PgHasArrayType for AppointmentStatusDb {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_appointment_status")
    }
}

impl From<AppointmentStatusDb> for AppointmentStatus {
    fn from(db: AppointmentStatusDb) -> Self {
        match db {
            AppointmentStatusDb::Scheduled => AppointmentStatus::Scheduled,
            AppointmentStatusDb::Confirmed => AppointmentStatus::Confirmed,
            AppointmentStatusDb::Completed => AppointmentStatus::Completed,
            AppointmentStatusDb::Cancelled => AppointmentStatus::Cancelled,
        }
    }
}

impl From<AppointmentStatus> for AppointmentStatusDb {
    fn from(status: AppointmentStatus) -> Self {
        match status {
            AppointmentStatus::Scheduled => AppointmentStatusDb::Scheduled,
            AppointmentStatus::Confirmed => AppointmentStatusDb::Confirmed,
            AppointmentStatus::Completed => AppointmentStatusDb::Completed,
            AppointmentStatus::Cancelled => AppointmentStatusDb::Cancelled,
        }
    }
}

/// Database row mapping for the appointments table.
#[derive(Debug, Clone, FromRow)]
pub struct AppointmentEntity {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub client_id: Uuid,
    pub appointment_date: NaiveDate,
    pub appointment_time: NaiveTime,
    pub appointment_type: String,
    pub reason: String,
    pub notes: Option<String>,
    pub status: AppointmentStatusDb,
    pub pet_name: Option<String>,
    pub pet_species: Option<String>,
    pub owner_name: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<AppointmentEntity> for Appointment {
    fn from(entity: AppointmentEntity) -> Self {
        Self {
            id: entity.id,
            pet_id: entity.pet_id,
            veterinarian_id: entity.veterinarian_id,
            client_id: entity.client_id,
            appointment_date: entity.appointment_date,
            appointment_time: entity.appointment_time,
            appointment_type: entity.appointment_type,
            reason: entity.reason,
            notes: entity.notes,
            status: entity.status.into(),
            pet_name: entity.pet_name,
            pet_species: entity.pet_species,
            owner_name: entity.owner_name,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}
