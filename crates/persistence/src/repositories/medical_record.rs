//! Medical record repository: visit records and their prescriptions and exam results.

use chrono::{DateTime, NaiveDate, Utc};
use domain::models::medical_record::{
    CreatePrescriptionRequest, CreateRecordRequest, RecordStatistics, RecordStatus,
    RecordStatusCounts, UpdatePrescriptionRequest, UpdateRecordRequest,
};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::entities::{ExamResultEntity, MedicalRecordEntity, PrescriptionEntity, RecordStatusDb};
use crate::metrics::QueryTimer;

const RECORD_COLUMNS: &str = "id, pet_id, veterinarian_id, appointment_id, symptoms_description, physical_examination, diagnosis, treatment, medications_prescribed, exams_requested, observations, next_appointment_recommendation, weight_at_visit, temperature, pulse, respiratory_rate, status, is_emergency, created_at, updated_at";

const PRESCRIPTION_COLUMNS: &str = "id, medical_record_id, medication_id, medication_name, dosage, frequency, duration, quantity_prescribed, instructions, created_at";

const EXAM_COLUMNS: &str = "id, medical_record_id, exam_name, result_file_url, observations, date_performed, performed_by, created_at";

/// Aggregates for a pet's history.
#[derive(Debug, Clone, FromRow)]
pub struct RecordStats {
    pub total_records: i64,
    pub emergency_visits: i64,
    pub last_visit: Option<DateTime<Utc>>,
}

/// Filters for record listings. `None` fields do not filter.
#[derive(Debug, Clone, Default)]
pub struct RecordFilter<'a> {
    pub pet_id: Option<Uuid>,
    pub veterinarian_id: Option<Uuid>,
    pub status: Option<RecordStatus>,
    pub is_emergency: Option<bool>,
    pub search: Option<&'a str>,
    pub limit: Option<i64>,
    pub offset: i64,
}

/// Clinic-wide record counts, relative to the database clock.
#[derive(Debug, Clone, FromRow)]
pub struct RecordCounts {
    pub total_records: i64,
    pub records_today: i64,
    pub records_this_week: i64,
    pub records_this_month: i64,
    pub emergency_records: i64,
    pub draft: i64,
    pub completed: i64,
    pub reviewed: i64,
}

impl From<RecordCounts> for RecordStatistics {
    fn from(counts: RecordCounts) -> Self {
        Self {
            total_records: counts.total_records,
            records_today: counts.records_today,
            records_this_week: counts.records_this_week,
            records_this_month: counts.records_this_month,
            emergency_records: counts.emergency_records,
            by_status: RecordStatusCounts {
                draft: counts.draft,
                completed: counts.completed,
                reviewed: counts.reviewed,
            },
        }
    }
}

/// Fields for a new exam result.
#[derive(Debug, Clone)]
pub struct NewExamResult<'a> {
    pub medical_record_id: Uuid,
    pub exam_name: &'a str,
    pub result_file_url: Option<&'a str>,
    pub observations: Option<&'a str>,
    pub date_performed: Option<NaiveDate>,
    pub performed_by: Option<&'a str>,
}

/// Replacement values for an exam result; `None` keeps the current value.
#[derive(Debug, Clone, Default)]
pub struct ExamResultChanges<'a> {
    pub exam_name: Option<&'a str>,
    pub result_file_url: Option<&'a str>,
    pub observations: Option<&'a str>,
    pub date_performed: Option<NaiveDate>,
    pub performed_by: Option<&'a str>,
}

/// Repository for medical records and their children.
#[derive(Clone)]
pub struct MedicalRecordRepository {
    pool: PgPool,
}

impl MedicalRecordRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Creates a record in `draft` status. The pet must exist (foreign key).
    pub async fn create(
        &self,
        veterinarian_id: Uuid,
        request: &CreateRecordRequest,
    ) -> Result<MedicalRecordEntity, sqlx::Error> {
        let timer = QueryTimer::new("create_medical_record");
        let notes = &request.notes;
        let vitals = &request.vitals;
        let result = sqlx::query_as::<_, MedicalRecordEntity>(&format!(
            r#"
            INSERT INTO medical_records
                (pet_id, veterinarian_id, appointment_id, symptoms_description, physical_examination,
                 diagnosis, treatment, medications_prescribed, exams_requested, observations,
                 next_appointment_recommendation, weight_at_visit, temperature, pulse,
                 respiratory_rate, is_emergency)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(request.pet_id)
        .bind(veterinarian_id)
        .bind(request.appointment_id)
        .bind(notes.symptoms_description.as_deref())
        .bind(notes.physical_examination.as_deref())
        .bind(notes.diagnosis.as_deref())
        .bind(notes.treatment.as_deref())
        .bind(notes.medications_prescribed.as_deref())
        .bind(notes.exams_requested.as_deref())
        .bind(notes.observations.as_deref())
        .bind(notes.next_appointment_recommendation.as_deref())
        .bind(vitals.weight_at_visit)
        .bind(vitals.temperature)
        .bind(vitals.pulse)
        .bind(vitals.respiratory_rate)
        .bind(request.is_emergency)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_by_id(&self, id: Uuid) -> Result<Option<MedicalRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_medical_record_by_id");
        let result = sqlx::query_as::<_, MedicalRecordEntity>(&format!(
            "SELECT {RECORD_COLUMNS} FROM medical_records WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Updates a record that has not been reviewed yet. Returns `None` when the
    /// record is missing or frozen.
    pub async fn update(
        &self,
        id: Uuid,
        request: &UpdateRecordRequest,
    ) -> Result<Option<MedicalRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_medical_record");
        let notes = &request.notes;
        let vitals = &request.vitals;
        let result = sqlx::query_as::<_, MedicalRecordEntity>(&format!(
            r#"
            UPDATE medical_records
            SET symptoms_description = COALESCE($2, symptoms_description),
                physical_examination = COALESCE($3, physical_examination),
                diagnosis = COALESCE($4, diagnosis),
                treatment = COALESCE($5, treatment),
                medications_prescribed = COALESCE($6, medications_prescribed),
                exams_requested = COALESCE($7, exams_requested),
                observations = COALESCE($8, observations),
                next_appointment_recommendation = COALESCE($9, next_appointment_recommendation),
                weight_at_visit = COALESCE($10, weight_at_visit),
                temperature = COALESCE($11, temperature),
                pulse = COALESCE($12, pulse),
                respiratory_rate = COALESCE($13, respiratory_rate),
                is_emergency = COALESCE($14, is_emergency)
            WHERE id = $1 AND status <> 'reviewed'
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(notes.symptoms_description.as_deref())
        .bind(notes.physical_examination.as_deref())
        .bind(notes.diagnosis.as_deref())
        .bind(notes.treatment.as_deref())
        .bind(notes.medications_prescribed.as_deref())
        .bind(notes.exams_requested.as_deref())
        .bind(notes.observations.as_deref())
        .bind(notes.next_appointment_recommendation.as_deref())
        .bind(vitals.weight_at_visit)
        .bind(vitals.temperature)
        .bind(vitals.pulse)
        .bind(vitals.respiratory_rate)
        .bind(request.is_emergency)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Guarded status change, same contract as appointment transitions.
    pub async fn transition(
        &self,
        id: Uuid,
        to: RecordStatus,
        from: &[RecordStatus],
    ) -> Result<Option<MedicalRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("transition_medical_record");
        let sources: Vec<RecordStatusDb> = from.iter().copied().map(RecordStatusDb::from).collect();
        let result = sqlx::query_as::<_, MedicalRecordEntity>(&format!(
            r#"
            UPDATE medical_records
            SET status = $2
            WHERE id = $1 AND status = ANY($3)
            RETURNING {RECORD_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(RecordStatusDb::from(to))
        .bind(sources)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Lists records matching `filter`, newest first.
    pub async fn list(&self, filter: RecordFilter<'_>) -> Result<Vec<MedicalRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_medical_records");
        let pattern = filter.search.map(|s| format!("%{}%", s.trim()));
        let result = sqlx::query_as::<_, MedicalRecordEntity>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM medical_records
            WHERE ($1::uuid IS NULL OR pet_id = $1)
              AND ($2::uuid IS NULL OR veterinarian_id = $2)
              AND ($3::record_status IS NULL OR status = $3)
              AND ($4::boolean IS NULL OR is_emergency = $4)
              AND ($5::text IS NULL
                   OR symptoms_description ILIKE $5
                   OR diagnosis ILIKE $5
                   OR treatment ILIKE $5
                   OR observations ILIKE $5)
            ORDER BY created_at DESC
            LIMIT $6 OFFSET $7
            "#
        ))
        .bind(filter.pet_id)
        .bind(filter.veterinarian_id)
        .bind(filter.status.map(RecordStatusDb::from))
        .bind(filter.is_emergency)
        .bind(pattern)
        .bind(filter.limit)
        .bind(filter.offset)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Clinic-wide counts for GET /medical/records/statistics.
    pub async fn statistics(&self) -> Result<RecordStatistics, sqlx::Error> {
        let timer = QueryTimer::new("medical_record_statistics");
        let result = sqlx::query_as::<_, RecordCounts>(
            r#"
            SELECT COUNT(*) AS total_records,
                   COUNT(*) FILTER (WHERE created_at >= date_trunc('day', NOW())) AS records_today,
                   COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '7 days') AS records_this_week,
                   COUNT(*) FILTER (WHERE created_at >= NOW() - INTERVAL '30 days') AS records_this_month,
                   COUNT(*) FILTER (WHERE is_emergency) AS emergency_records,
                   COUNT(*) FILTER (WHERE status = 'draft') AS draft,
                   COUNT(*) FILTER (WHERE status = 'completed') AS completed,
                   COUNT(*) FILTER (WHERE status = 'reviewed') AS reviewed
            FROM medical_records
            "#,
        )
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result.map(Into::into)
    }

    /// Hard delete; prescriptions and exam results cascade.
    pub async fn delete(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_medical_record");
        let result = sqlx::query("DELETE FROM medical_records WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn stats_for_pet(&self, pet_id: Uuid) -> Result<RecordStats, sqlx::Error> {
        let timer = QueryTimer::new("record_stats_for_pet");
        let result = sqlx::query_as::<_, RecordStats>(
            r#"
            SELECT COUNT(*) AS total_records,
                   COUNT(*) FILTER (WHERE is_emergency) AS emergency_visits,
                   MAX(created_at) AS last_visit
            FROM medical_records
            WHERE pet_id = $1
            "#,
        )
        .bind(pet_id)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn recent_for_pet(
        &self,
        pet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<MedicalRecordEntity>, sqlx::Error> {
        let timer = QueryTimer::new("recent_records_for_pet");
        let result = sqlx::query_as::<_, MedicalRecordEntity>(&format!(
            r#"
            SELECT {RECORD_COLUMNS}
            FROM medical_records
            WHERE pet_id = $1
            ORDER BY created_at DESC
            LIMIT $2
            "#
        ))
        .bind(pet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn add_prescription(
        &self,
        request: &CreatePrescriptionRequest,
    ) -> Result<PrescriptionEntity, sqlx::Error> {
        let timer = QueryTimer::new("add_prescription");
        let result = sqlx::query_as::<_, PrescriptionEntity>(&format!(
            r#"
            INSERT INTO prescriptions
                (medical_record_id, medication_id, medication_name, dosage, frequency,
                 duration, quantity_prescribed, instructions)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {PRESCRIPTION_COLUMNS}
            "#
        ))
        .bind(request.medical_record_id)
        .bind(request.medication_id)
        .bind(request.medication_name.trim())
        .bind(request.dosage.as_deref())
        .bind(request.frequency.as_deref())
        .bind(request.duration.as_deref())
        .bind(request.quantity_prescribed)
        .bind(request.instructions.as_deref())
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_prescription(
        &self,
        id: Uuid,
    ) -> Result<Option<PrescriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_prescription");
        let result = sqlx::query_as::<_, PrescriptionEntity>(&format!(
            "SELECT {PRESCRIPTION_COLUMNS} FROM prescriptions WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn prescriptions_for_record(
        &self,
        record_id: Uuid,
    ) -> Result<Vec<PrescriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_prescriptions_for_record");
        let result = sqlx::query_as::<_, PrescriptionEntity>(&format!(
            r#"
            SELECT {PRESCRIPTION_COLUMNS}
            FROM prescriptions
            WHERE medical_record_id = $1
            ORDER BY created_at
            "#
        ))
        .bind(record_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Most recent prescriptions across all of a pet's records.
    pub async fn recent_prescriptions_for_pet(
        &self,
        pet_id: Uuid,
        limit: i64,
    ) -> Result<Vec<PrescriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("recent_prescriptions_for_pet");
        let result = sqlx::query_as::<_, PrescriptionEntity>(
            r#"
            SELECT p.id, p.medical_record_id, p.medication_id, p.medication_name, p.dosage,
                   p.frequency, p.duration, p.quantity_prescribed, p.instructions, p.created_at
            FROM prescriptions p
            JOIN medical_records r ON r.id = p.medical_record_id
            WHERE r.pet_id = $1
            ORDER BY p.created_at DESC
            LIMIT $2
            "#,
        )
        .bind(pet_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Updates a prescription whose record has not been reviewed. Returns
    /// `None` when the prescription is missing or its record is frozen.
    pub async fn update_prescription(
        &self,
        id: Uuid,
        request: &UpdatePrescriptionRequest,
    ) -> Result<Option<PrescriptionEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_prescription");
        let result = sqlx::query_as::<_, PrescriptionEntity>(&format!(
            r#"
            UPDATE prescriptions
            SET medication_name = COALESCE($2, medication_name),
                dosage = COALESCE($3, dosage),
                frequency = COALESCE($4, frequency),
                duration = COALESCE($5, duration),
                quantity_prescribed = COALESCE($6, quantity_prescribed),
                instructions = COALESCE($7, instructions)
            WHERE id = $1
              AND medical_record_id IN (SELECT id FROM medical_records WHERE status <> 'reviewed')
            RETURNING {PRESCRIPTION_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(request.medication_name.as_deref().map(str::trim))
        .bind(request.dosage.as_deref())
        .bind(request.frequency.as_deref())
        .bind(request.duration.as_deref())
        .bind(request.quantity_prescribed)
        .bind(request.instructions.as_deref())
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete_prescription(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_prescription");
        let result = sqlx::query("DELETE FROM prescriptions WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }

    pub async fn add_exam_result(
        &self,
        exam: NewExamResult<'_>,
    ) -> Result<ExamResultEntity, sqlx::Error> {
        let timer = QueryTimer::new("add_exam_result");
        let result = sqlx::query_as::<_, ExamResultEntity>(&format!(
            r#"
            INSERT INTO exam_results
                (medical_record_id, exam_name, result_file_url, observations, date_performed, performed_by)
            VALUES ($1, $2, $3, $4, $5, $6)
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(exam.medical_record_id)
        .bind(exam.exam_name.trim())
        .bind(exam.result_file_url)
        .bind(exam.observations)
        .bind(exam.date_performed)
        .bind(exam.performed_by)
        .fetch_one(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn find_exam_result(&self, id: Uuid) -> Result<Option<ExamResultEntity>, sqlx::Error> {
        let timer = QueryTimer::new("find_exam_result");
        let result = sqlx::query_as::<_, ExamResultEntity>(&format!(
            "SELECT {EXAM_COLUMNS} FROM exam_results WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn exam_results_for_record(
        &self,
        record_id: Uuid,
    ) -> Result<Vec<ExamResultEntity>, sqlx::Error> {
        let timer = QueryTimer::new("list_exam_results_for_record");
        let result = sqlx::query_as::<_, ExamResultEntity>(&format!(
            r#"
            SELECT {EXAM_COLUMNS}
            FROM exam_results
            WHERE medical_record_id = $1
            ORDER BY created_at
            "#
        ))
        .bind(record_id)
        .fetch_all(&self.pool)
        .await;
        timer.record();
        result
    }

    /// Same contract as [`Self::update_prescription`].
    pub async fn update_exam_result(
        &self,
        id: Uuid,
        changes: ExamResultChanges<'_>,
    ) -> Result<Option<ExamResultEntity>, sqlx::Error> {
        let timer = QueryTimer::new("update_exam_result");
        let result = sqlx::query_as::<_, ExamResultEntity>(&format!(
            r#"
            UPDATE exam_results
            SET exam_name = COALESCE($2, exam_name),
                result_file_url = COALESCE($3, result_file_url),
                observations = COALESCE($4, observations),
                date_performed = COALESCE($5, date_performed),
                performed_by = COALESCE($6, performed_by)
            WHERE id = $1
              AND medical_record_id IN (SELECT id FROM medical_records WHERE status <> 'reviewed')
            RETURNING {EXAM_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(changes.exam_name.map(str::trim))
        .bind(changes.result_file_url)
        .bind(changes.observations)
        .bind(changes.date_performed)
        .bind(changes.performed_by)
        .fetch_optional(&self.pool)
        .await;
        timer.record();
        result
    }

    pub async fn delete_exam_result(&self, id: Uuid) -> Result<bool, sqlx::Error> {
        let timer = QueryTimer::new("delete_exam_result");
        let result = sqlx::query("DELETE FROM exam_results WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await;
        timer.record();
        Ok(result?.rows_affected() > 0)
    }
}
