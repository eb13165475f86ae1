//! Medical record, prescription and exam result entities.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::medical_record::{
    ClinicalNotes, ExamResult, MedicalRecord, Prescription, RecordStatus, VitalSigns,
};
use sqlx::postgres::{PgHasArrayType, PgTypeInfo};
use sqlx::FromRow;
use uuid::Uuid;

/// Database enum for record_status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::Type)]
#[sqlx(type_name = "record_status", rename_all = "lowercase")]
pub enum RecordStatusDb {
    Draft,
    Completed,
    Reviewed,
}

impl PgHasArrayType for RecordStatusDb {
    fn array_type_info() -> PgTypeInfo {
        PgTypeInfo::with_name("_record_status")
    }
}

impl From<RecordStatusDb> for RecordStatus {
    fn from(db: RecordStatusDb) -> Self {
        match db {
            RecordStatusDb::Draft => RecordStatus::Draft,
            RecordStatusDb::Completed => RecordStatus::Completed,
            RecordStatusDb::Reviewed => RecordStatus::Reviewed,
        }
    }
}

impl From<RecordStatus> for RecordStatusDb {
    fn from(status: RecordStatus) -> Self {
        match status {
            RecordStatus::Draft => RecordStatusDb::Draft,
            RecordStatus::Completed => RecordStatusDb::Completed,
            RecordStatus::Reviewed => RecordStatusDb::Reviewed,
        }
    }
}

/// Database row mapping for the medical_records table.
#[derive(Debug, Clone, FromRow)]
pub struct MedicalRecordEntity {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub appointment_id: Option<Uuid>,
    pub symptoms_description: Option<String>,
    pub physical_examination: Option<String>,
    pub diagnosis: Option<String>,
    pub treatment: Option<String>,
    pub medications_prescribed: Option<String>,
    pub exams_requested: Option<String>,
    pub observations: Option<String>,
    pub next_appointment_recommendation: Option<String>,
    pub weight_at_visit: Option<f64>,
    pub temperature: Option<f64>,
    pub pulse: Option<i32>,
    pub respiratory_rate: Option<i32>,
    pub status: RecordStatusDb,
    pub is_emergency: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<MedicalRecordEntity> for MedicalRecord {
    fn from(entity: MedicalRecordEntity) -> Self {
        Self {
            id: entity.id,
            pet_id: entity.pet_id,
            veterinarian_id: entity.veterinarian_id,
            appointment_id: entity.appointment_id,
            notes: ClinicalNotes {
                symptoms_description: entity.symptoms_description,
                physical_examination: entity.physical_examination,
                diagnosis: entity.diagnosis,
                treatment: entity.treatment,
                medications_prescribed: entity.medications_prescribed,
                exams_requested: entity.exams_requested,
                observations: entity.observations,
                next_appointment_recommendation: entity.next_appointment_recommendation,
            },
            vitals: VitalSigns {
                weight_at_visit: entity.weight_at_visit,
                temperature: entity.temperature,
                pulse: entity.pulse,
                respiratory_rate: entity.respiratory_rate,
            },
            status: entity.status.into(),
            is_emergency: entity.is_emergency,
            created_at: entity.created_at,
            updated_at: entity.updated_at,
        }
    }
}

/// Database row mapping for the prescriptions table.
#[derive(Debug, Clone, FromRow)]
pub struct PrescriptionEntity {
    pub id: Uuid,
    pub medical_record_id: Uuid,
    pub medication_id: Option<Uuid>,
    pub medication_name: String,
    pub dosage: Option<String>,
    pub frequency: Option<String>,
    pub duration: Option<String>,
    pub quantity_prescribed: Option<i32>,
    pub instructions: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<PrescriptionEntity> for Prescription {
    fn from(entity: PrescriptionEntity) -> Self {
        Self {
            id: entity.id,
            medical_record_id: entity.medical_record_id,
            medication_id: entity.medication_id,
            medication_name: entity.medication_name,
            dosage: entity.dosage,
            frequency: entity.frequency,
            duration: entity.duration,
            quantity_prescribed: entity.quantity_prescribed,
            instructions: entity.instructions,
            created_at: entity.created_at,
        }
    }
}

/// Database row mapping for the exam_results table.
#[derive(Debug, Clone, FromRow)]
pub struct ExamResultEntity {
    pub id: Uuid,
    pub medical_record_id: Uuid,
    pub exam_name: String,
    pub result_file_url: Option<String>,
    pub observations: Option<String>,
    pub date_performed: Option<NaiveDate>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<ExamResultEntity> for ExamResult {
    fn from(entity: ExamResultEntity) -> Self {
        Self {
            id: entity.id,
            medical_record_id: entity.medical_record_id,
            exam_name: entity.exam_name,
            result_file_url: entity.result_file_url,
            observations: entity.observations,
            date_performed: entity.date_performed,
            performed_by: entity.performed_by,
            created_at: entity.created_at,
        }
    }
}
