//! Weekly availability (working hours) of veterinarians.

use chrono::{DateTime, NaiveTime, Utc};
use serde::{Deserialize, Serialize};
use shared::validation::{format_time, parse_time};
use uuid::Uuid;
use validator::Validate;

use crate::services::scheduling::{validate_day_of_week, ScheduleError, WorkingWindow};

const DAY_NAMES: [&str; 7] = [
    "Monday",
    "Tuesday",
    "Wednesday",
    "Thursday",
    "Friday",
    "Saturday",
    "Sunday",
];

/// Name of a stored weekday index, or `"Unknown"` when out of range.
pub fn day_name(day_of_week: i16) -> &'static str {
    usize::try_from(day_of_week)
        .ok()
        .and_then(|d| DAY_NAMES.get(d).copied())
        .unwrap_or("Unknown")
}

/// Working hours of one veterinarian on one weekday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyAvailability {
    pub id: Uuid,
    pub veterinarian_id: Uuid,
    /// 0 = Monday .. 6 = Sunday
    pub day_of_week: i16,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl WeeklyAvailability {
    pub fn window(&self) -> Result<WorkingWindow, ScheduleError> {
        WorkingWindow::new(
            self.start_time,
            self.end_time,
            self.break_start,
            self.break_end,
        )
    }
}

/// Parsed and validated schedule times, ready to be stored.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScheduleTimes {
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub break_start: Option<NaiveTime>,
    pub break_end: Option<NaiveTime>,
}

fn parse_optional_time(
    field: &'static str,
    value: Option<&str>,
) -> Result<Option<NaiveTime>, ScheduleError> {
    value
        .filter(|v| !v.trim().is_empty())
        .map(|v| parse_time(field, v))
        .transpose()
        .map_err(ScheduleError::from)
}

/// Request body for POST /appointments/schedules.
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateScheduleRequest {
    pub veterinarian_id: Uuid,

    #[validate(range(min = 0, max = 6, message = "day_of_week must be between 0 and 6"))]
    pub day_of_week: i16,

    pub start_time: String,

    pub end_time: String,

    pub break_start: Option<String>,

    pub break_end: Option<String>,
}

impl CreateScheduleRequest {
    pub fn parse(&self) -> Result<ScheduleTimes, ScheduleError> {
        validate_day_of_week(self.day_of_week)?;
        let start_time = parse_time("start_time", &self.start_time)?;
        let end_time = parse_time("end_time", &self.end_time)?;
        let break_start = parse_optional_time("break_start", self.break_start.as_deref())?;
        let break_end = parse_optional_time("break_end", self.break_end.as_deref())?;

        WorkingWindow::new(start_time, end_time, break_start, break_end)?;

        Ok(ScheduleTimes {
            start_time,
            end_time,
            break_start,
            break_end,
        })
    }
}

/// Request body for PUT /appointments/schedules/:id. Omitted fields keep their value.
#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct UpdateScheduleRequest {
    pub start_time: Option<String>,
    pub end_time: Option<String>,
    pub break_start: Option<String>,
    pub break_end: Option<String>,
    /// Removes the break window when true.
    #[serde(default)]
    pub clear_break: bool,
    pub is_available: Option<bool>,
}

impl UpdateScheduleRequest {
    /// Merges the update into `current` and validates the resulting window.
    pub fn merge(&self, current: &WeeklyAvailability) -> Result<ScheduleTimes, ScheduleError> {
        let start_time = match self.start_time.as_deref() {
            Some(v) => parse_time("start_time", v)?,
            None => current.start_time,
        };
        let end_time = match self.end_time.as_deref() {
            Some(v) => parse_time("end_time", v)?,
            None => current.end_time,
        };

        let (break_start, break_end) = if self.clear_break {
            (None, None)
        } else {
            let bs = parse_optional_time("break_start", self.break_start.as_deref())?
                .or(current.break_start);
            let be = parse_optional_time("break_end", self.break_end.as_deref())?
                .or(current.break_end);
            (bs, be)
        };

        WorkingWindow::new(start_time, end_time, break_start, break_end)?;

        Ok(ScheduleTimes {
            start_time,
            end_time,
            break_start,
            break_end,
        })
    }
}

/// Query parameters for GET /appointments/schedules.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ListSchedulesQuery {
    pub veterinarian_id: Option<Uuid>,
    #[serde(default)]
    pub include_inactive: bool,
}

/// Wire representation of a schedule row.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub id: Uuid,
    pub veterinarian_id: Uuid,
    pub day_of_week: i16,
    pub day_name: String,
    pub start_time: String,
    pub end_time: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_start: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub break_end: Option<String>,
    pub is_available: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<WeeklyAvailability> for ScheduleResponse {
    fn from(a: WeeklyAvailability) -> Self {
        Self {
            id: a.id,
            veterinarian_id: a.veterinarian_id,
            day_of_week: a.day_of_week,
            day_name: day_name(a.day_of_week).to_string(),
            start_time: format_time(a.start_time),
            end_time: format_time(a.end_time),
            break_start: a.break_start.map(format_time),
            break_end: a.break_end.map(format_time),
            is_available: a.is_available,
            created_at: a.created_at,
            updated_at: a.updated_at,
        }
    }
}
