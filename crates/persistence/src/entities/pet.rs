//! Pet entity (database row mapping).

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::pet::{Pet, VaccinationStatus};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for vaccination_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "vaccination_status", rename_all = "lowercase")]
pub enum VaccinationStatusDb {
    Complete,
    Partial,
    Pending,
    Unknown,
}

impl From<VaccinationStatusDb> for VaccinationStatus {
    fn from(db: VaccinationStatusDb) -> Self {
        match db {
            VaccinationStatusDb::Complete => VaccinationStatus::Complete,
            VaccinationStatusDb::Partial => VaccinationStatus::Partial,
            VaccinationStatusDb::Pending => VaccinationStatus::Pending,
            VaccinationStatusDb::Unknown => VaccinationStatus::Unknown,
        }
    }
}

impl From<VaccinationStatus> for VaccinationStatusDb {
    fn from(status: VaccinationStatus) -> Self {
        match status {
            VaccinationStatus::Complete => VaccinationStatusDb::Complete,
            VaccinationStatus::Partial => VaccinationStatusDb::Partial,
            VaccinationStatus::Pending => VaccinationStatusDb::Pending,
            VaccinationStatus::Unknown => VaccinationStatusDb::Unknown,
        }
    }
}

/// Database row mapping for the pets table.
#[derive(Debug, Clone, FromRow)]
pub struct PetEntity {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub species: String,
    pub breed: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub weight: Option<f64>,
    pub gender: Option<String>,
    pub color: Option<String>,
    pub microchip_number: Option<String>,
    pub allergies: Option<String>,
    pub medical_notes: Option<String>,
    pub vaccination_status: VaccinationStatusDb,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<PetEntity> for Pet {
    fn from(entity: PetEntity) -> Self {
        Self {
            id: entity.id,
            owner_id: entity.owner_id,
            name: entity.name,
            species: entity.species,
            breed: entity.breed,
            birth_date: entity.birth_date,
            weight: entity.weight,
            gender: entity.gender,
            color: entity.color,
            microchip_number: entity.microchip_number,
            allergies: entity.allergies,
            medical_notes: entity.medical_notes,
            vaccination_status: entity.vaccination_status.into(),
            is_active: entity.is_active,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// A (label, count) row from a GROUP BY query.
#[derive(Debug, Clone, FromRow)]
pub struct CountRow {
    pub key: String,
    pub count: i64,
}

impl From<CountRow> for domain::models::pet::CountBucket {
    fn from(row: CountRow) -> Self {
        Self {
            key: row.key,
            count: row.count,
        }
    }
}
