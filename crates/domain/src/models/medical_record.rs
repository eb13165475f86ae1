//! Medical records, prescriptions and exam results.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{parse_date, ParseError};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::errors::TransitionError;
use crate::models::pet::PetResponse;

/// Lifecycle of a visit record: `draft -> completed -> reviewed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordStatus {
    Draft,
    Completed,
    Reviewed,
}

impl RecordStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordStatus::Draft => "draft",
            RecordStatus::Completed => "completed",
            RecordStatus::Reviewed => "reviewed",
        }
    }

    /// Reviewed records are frozen.
    pub fn is_editable(&self) -> bool {
        !matches!(self, RecordStatus::Reviewed)
    }

    pub fn allowed_sources(target: RecordStatus) -> &'static [RecordStatus] {
        match target {
            RecordStatus::Draft => &[],
            RecordStatus::Completed => &[RecordStatus::Draft],
            RecordStatus::Reviewed => &[RecordStatus::Completed],
        }
    }

    pub fn transition_to(self, target: RecordStatus) -> Result<Self, TransitionError> {
        if Self::allowed_sources(target).contains(&self) {
            Ok(target)
        } else {
            Err(TransitionError {
                entity: "medical record",
                from: self.as_str(),
                to: target.as_str(),
            })
        }
    }
}

impl FromStr for RecordStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(RecordStatus::Draft),
            "completed" => Ok(RecordStatus::Completed),
            "reviewed" => Ok(RecordStatus::Reviewed),
            _ => Err(format!("Invalid record status: {}", s)),
        }
    }
}

impl fmt::Display for RecordStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Clinical free-text fields shared by records and their create/update bodies.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct ClinicalNotes {
    #[validate(length(max = 8000))]
    pub symptoms_description: Option<String>,
    #[validate(length(max = 8000))]
    pub physical_examination: Option<String>,
    #[validate(length(max = 8000))]
    pub diagnosis: Option<String>,
    #[validate(length(max = 8000))]
    pub treatment: Option<String>,
    #[validate(length(max = 8000))]
    pub medications_prescribed: Option<String>,
    #[validate(length(max = 8000))]
    pub exams_requested: Option<String>,
    #[validate(length(max = 8000))]
    pub observations: Option<String>,
    #[validate(length(max = 8000))]
    pub next_appointment_recommendation: Option<String>,
}

/// Vital signs taken during a visit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct VitalSigns {
    #[validate(range(min = 0.0, max = 1000.0, message = "weight_at_visit must be 0-1000 kg"))]
    pub weight_at_visit: Option<f64>,
    #[validate(range(min = 25.0, max = 45.0, message = "temperature must be 25-45 C"))]
    pub temperature: Option<f64>,
    #[validate(range(min = 1, max = 400, message = "pulse must be 1-400 bpm"))]
    pub pulse: Option<i32>,
    #[validate(range(min = 1, max = 200, message = "respiratory_rate must be 1-200 per minute"))]
    pub respiratory_rate: Option<i32>,
}

/// A visit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecord {
    pub id: Uuid,
    pub pet_id: Uuid,
    pub veterinarian_id: Uuid,
    pub appointment_id: Option<Uuid>,
    #[serde(flatten)]
    pub notes: ClinicalNotes,
    #[serde(flatten)]
    pub vitals: VitalSigns,
    pub status: RecordStatus,
    pub is_emergency: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A medication prescribed during a visit.
///
/// `medication_id` is a weak reference into the inventory catalogue.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Prescription {
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

/// A lab or imaging result attached to a visit. Only a reference to the artifact is kept.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResult {
    pub id: Uuid,
    pub medical_record_id: Uuid,
    pub exam_name: String,
    pub result_file_url: Option<String>,
    pub observations: Option<String>,
    pub date_performed: Option<NaiveDate>,
    pub performed_by: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Request body for POST /medical/records.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRecordRequest {
    pub pet_id: Uuid,
    /// Defaults to the caller when omitted.
    pub veterinarian_id: Option<Uuid>,
    pub appointment_id: Option<Uuid>,
    #[serde(flatten)]
    #[validate(nested)]
    pub notes: ClinicalNotes,
    #[serde(flatten)]
    #[validate(nested)]
    pub vitals: VitalSigns,
    #[serde(default)]
    pub is_emergency: bool,
}

/// Request body for PUT /medical/records/:id. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateRecordRequest {
    #[serde(flatten)]
    #[validate(nested)]
    pub notes: ClinicalNotes,
    #[serde(flatten)]
    #[validate(nested)]
    pub vitals: VitalSigns,
    pub is_emergency: Option<bool>,
}

/// Query parameters for record listings.
///
/// `search` matches symptoms, diagnosis, treatment and observations.
/// `pet_id` and `veterinarian_id` only apply to GET /medical/records; the
/// per-pet and per-vet listings take them from the path.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListRecordsQuery {
    pub status: Option<RecordStatus>,
    pub is_emergency: Option<bool>,
    pub search: Option<String>,
    pub pet_id: Option<Uuid>,
    pub veterinarian_id: Option<Uuid>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl ListRecordsQuery {
    /// Search text, or `None` when blank.
    pub fn search_term(&self) -> Option<&str> {
        self.search.as_deref().map(str::trim).filter(|s| !s.is_empty())
    }
}

/// Counts returned by GET /medical/records/statistics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStatistics {
    pub total_records: i64,
    pub records_today: i64,
    pub records_this_week: i64,
    pub records_this_month: i64,
    pub emergency_records: i64,
    pub by_status: RecordStatusCounts,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RecordStatusCounts {
    pub draft: i64,
    pub completed: i64,
    pub reviewed: i64,
}

/// Request body for POST /medical/prescriptions.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreatePrescriptionRequest {
    pub medical_record_id: Uuid,
    pub medication_id: Option<Uuid>,
    #[validate(
        length(min = 1, max = 255, message = "medication_name must be 1-255 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub medication_name: String,
    #[validate(length(max = 100))]
    pub dosage: Option<String>,
    #[validate(length(max = 100))]
    pub frequency: Option<String>,
    #[validate(length(max = 100))]
    pub duration: Option<String>,
    #[validate(range(min = 1, max = 100000, message = "quantity_prescribed must be positive"))]
    pub quantity_prescribed: Option<i32>,
    #[validate(length(max = 4000))]
    pub instructions: Option<String>,
}

impl CreatePrescriptionRequest {
    /// Quantity to take out of stock, when the prescription is tied to a catalogue item.
    pub fn stock_demand(&self) -> Option<(Uuid, i32)> {
        match (self.medication_id, self.quantity_prescribed) {
            (Some(id), Some(qty)) if qty > 0 => Some((id, qty)),
            _ => None,
        }
    }
}

/// Request body for PUT /medical/prescriptions/:id. Omitted fields keep their value.
///
/// The catalogue link and stock taken on add are not touched.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdatePrescriptionRequest {
    #[validate(
        length(min = 1, max = 255, message = "medication_name must be 1-255 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub medication_name: Option<String>,
    #[validate(length(max = 100))]
    pub dosage: Option<String>,
    #[validate(length(max = 100))]
    pub frequency: Option<String>,
    #[validate(length(max = 100))]
    pub duration: Option<String>,
    #[validate(range(min = 1, max = 100000, message = "quantity_prescribed must be positive"))]
    pub quantity_prescribed: Option<i32>,
    #[validate(length(max = 4000))]
    pub instructions: Option<String>,
}

/// Request body for POST /medical/exam-results.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateExamResultRequest {
    pub medical_record_id: Uuid,
    #[validate(
        length(min = 1, max = 255, message = "exam_name must be 1-255 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub exam_name: String,
    #[validate(url(message = "result_file_url must be a valid URL"))]
    pub result_file_url: Option<String>,
    #[validate(length(max = 4000))]
    pub observations: Option<String>,
    /// `YYYY-MM-DD`
    pub date_performed: Option<String>,
    #[validate(length(max = 255))]
    pub performed_by: Option<String>,
}

impl CreateExamResultRequest {
    pub fn parsed_date(&self) -> Result<Option<NaiveDate>, ParseError> {
        self.date_performed
            .as_deref()
            .map(|d| parse_date("date_performed", d))
            .transpose()
    }
}

/// Request body for PUT /medical/exam-results/:id. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateExamResultRequest {
    #[validate(
        length(min = 1, max = 255, message = "exam_name must be 1-255 characters"),
        custom(function = "shared::validation::validate_not_blank")
    )]
    pub exam_name: Option<String>,
    #[validate(url(message = "result_file_url must be a valid URL"))]
    pub result_file_url: Option<String>,
    #[validate(length(max = 4000))]
    pub observations: Option<String>,
    /// `YYYY-MM-DD`
    pub date_performed: Option<String>,
    #[validate(length(max = 255))]
    pub performed_by: Option<String>,
}

impl UpdateExamResultRequest {
    pub fn parsed_date(&self) -> Result<Option<NaiveDate>, ParseError> {
        self.date_performed
            .as_deref()
            .map(|d| parse_date("date_performed", d))
            .transpose()
    }
}

/// A record with its children, as returned by GET /medical/records/:id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalRecordDetail {
    #[serde(flatten)]
    pub record: MedicalRecord,
    pub prescriptions: Vec<Prescription>,
    pub exam_results: Vec<ExamResult>,
}

/// Overview returned by GET /medical/summary/pet/:pet_id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MedicalSummary {
    pub pet: PetResponse,
    pub total_records: i64,
    pub emergency_visits: i64,
    pub last_visit: Option<DateTime<Utc>>,
    pub recent_records: Vec<MedicalRecord>,
    pub recent_prescriptions: Vec<Prescription>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use RecordStatus::*;

    #[test]
    fn test_record_transitions() {
        assert_eq!(Draft.transition_to(Completed), Ok(Completed));
        assert_eq!(Completed.transition_to(Reviewed), Ok(Reviewed));
        assert!(Draft.transition_to(Reviewed).is_err());
        assert!(Reviewed.transition_to(Completed).is_err());
        assert!(Completed.transition_to(Completed).is_err());
    }

    #[test]
    fn test_reviewed_is_frozen() {
        assert!(Draft.is_editable());
        assert!(Completed.is_editable());
        assert!(!Reviewed.is_editable());
    }

    #[test]
    fn test_create_record_request_flattened_fields() {
        let json = serde_json::json!({
            "pet_id": Uuid::nil(),
            "diagnosis": "Otitis",
            "temperature": 38.6,
            "pulse": 90
        });
        let request: CreateRecordRequest = serde_json::from_value(json).unwrap();
        assert_eq!(request.notes.diagnosis.as_deref(), Some("Otitis"));
        assert_eq!(request.vitals.temperature, Some(38.6));
        assert!(!request.is_emergency);
        assert!(request.validate().is_ok());
    }

    #[test]
    fn test_vitals_out_of_range() {
        let vitals = VitalSigns {
            temperature: Some(60.0),
            ..Default::default()
        };
        assert!(vitals.validate().is_err());
    }

    #[test]
    fn test_stock_demand() {
        let mut request = CreatePrescriptionRequest {
            medical_record_id: Uuid::new_v4(),
            medication_id: Some(Uuid::new_v4()),
            medication_name: "Amoxicillin".to_string(),
            dosage: None,
            frequency: None,
            duration: None,
            quantity_prescribed: Some(2),
            instructions: None,
        };
        assert!(request.stock_demand().is_some());
        request.quantity_prescribed = None;
        assert!(request.stock_demand().is_none());
    }

    #[test]
    fn test_list_query_search_term() {
        let query: ListRecordsQuery =
            serde_json::from_value(serde_json::json!({ "search": "  otitis ", "is_emergency": true }))
                .unwrap();
        assert_eq!(query.search_term(), Some("otitis"));
        assert_eq!(query.is_emergency, Some(true));

        let blank = ListRecordsQuery {
            search: Some("   ".to_string()),
            ..Default::default()
        };
        assert_eq!(blank.search_term(), None);
    }

    #[test]
    fn test_update_prescription_validation() {
        let blank = UpdatePrescriptionRequest {
            medication_name: Some("  ".to_string()),
            ..Default::default()
        };
        assert!(blank.validate().is_err());

        let zero = UpdatePrescriptionRequest {
            quantity_prescribed: Some(0),
            ..Default::default()
        };
        assert!(zero.validate().is_err());

        assert!(UpdatePrescriptionRequest::default().validate().is_ok());
    }

    #[test]
    fn test_update_exam_result_bad_date() {
        let request = UpdateExamResultRequest {
            date_performed: Some("01/02/2025".to_string()),
            ..Default::default()
        };
        assert!(request.parsed_date().is_err());
    }

    #[test]
    fn test_exam_date_parse() {
        let request = CreateExamResultRequest {
            medical_record_id: Uuid::new_v4(),
            exam_name: "Blood panel".to_string(),
            result_file_url: None,
            observations: None,
            date_performed: Some("2025-02-01".to_string()),
            performed_by: None,
        };
        assert_eq!(
            request.parsed_date().unwrap(),
            NaiveDate::from_ymd_opt(2025, 2, 1)
        );
    }
}
