//! Availability decisions and slot generation.
//!
//! Everything here is pure: callers load the veterinarian's working window
//! for the weekday and the times already booked, and these functions decide.

use chrono::{Datelike, Duration, NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use shared::validation::ParseError;
use thiserror::Error;

/// Width of a bookable slot in minutes.
pub const SLOT_MINUTES: i64 = 30;

/// Whether a booking may start exactly at closing time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ClosingTimePolicy {
    /// `start <= t < end`
    #[default]
    Exclusive,
    /// `start <= t <= end`
    Inclusive,
}

impl ClosingTimePolicy {
    pub fn from_allow_flag(allow_booking_at_closing_time: bool) -> Self {
        if allow_booking_at_closing_time {
            ClosingTimePolicy::Inclusive
        } else {
            ClosingTimePolicy::Exclusive
        }
    }
}

/// Errors raised while building or validating a working window.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScheduleError {
    #[error("day_of_week must be between 0 (Monday) and 6 (Sunday), got {0}")]
    InvalidDay(i16),

    #[error("start_time must be before end_time")]
    EmptyWindow,

    #[error("break_start and break_end must be given together")]
    IncompleteBreak,

    #[error("break must start before it ends and lie inside the working window")]
    BreakOutsideWindow,

    #[error(transparent)]
    Parse(#[from] ParseError),
}

/// A veterinarian's working hours for one weekday.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkingWindow {
    start: NaiveTime,
    end: NaiveTime,
    break_window: Option<(NaiveTime, NaiveTime)>,
}

impl WorkingWindow {
    pub fn new(
        start: NaiveTime,
        end: NaiveTime,
        break_start: Option<NaiveTime>,
        break_end: Option<NaiveTime>,
    ) -> Result<Self, ScheduleError> {
        if start >= end {
            return Err(ScheduleError::EmptyWindow);
        }

        let break_window = match (break_start, break_end) {
            (None, None) => None,
            (Some(bs), Some(be)) => {
                if bs >= be || bs < start || be > end {
                    return Err(ScheduleError::BreakOutsideWindow);
                }
                Some((bs, be))
            }
            _ => return Err(ScheduleError::IncompleteBreak),
        };

        Ok(Self {
            start,
            end,
            break_window,
        })
    }

    pub fn start(&self) -> NaiveTime {
        self.start
    }

    pub fn end(&self) -> NaiveTime {
        self.end
    }

    fn in_break(&self, time: NaiveTime) -> bool {
        matches!(self.break_window, Some((bs, be)) if time >= bs && time < be)
    }

    /// Whether a booking may start at `time` within this window.
    pub fn admits(&self, time: NaiveTime, policy: ClosingTimePolicy) -> bool {
        let below_end = match policy {
            ClosingTimePolicy::Exclusive => time < self.end,
            ClosingTimePolicy::Inclusive => time <= self.end,
        };
        time >= self.start && below_end && !self.in_break(time)
    }

    /// Candidate start times: from `start` in 30-minute steps, strictly before `end`,
    /// skipping the break.
    pub fn candidate_slots(&self) -> Vec<NaiveTime> {
        let step = Duration::minutes(SLOT_MINUTES);
        let mut slots = Vec::new();
        let mut current = self.start;

        while current < self.end {
            if !self.in_break(current) {
                slots.push(current);
            }
            let (next, wrapped) = current.overflowing_add_signed(step);
            if wrapped != 0 {
                break;
            }
            current = next;
        }

        slots
    }
}

/// Converts a date to the stored weekday index (0 = Monday .. 6 = Sunday).
pub fn weekday_index(date: NaiveDate) -> i16 {
    date.weekday().num_days_from_monday() as i16
}

/// Validates a stored weekday index.
pub fn validate_day_of_week(day: i16) -> Result<i16, ScheduleError> {
    if (0..=6).contains(&day) {
        Ok(day)
    } else {
        Err(ScheduleError::InvalidDay(day))
    }
}

/// Decides whether `time` can be booked.
///
/// `window` is `None` when the veterinarian has no available schedule for the
/// weekday. `booked` holds the start times of active appointments on that date.
pub fn is_available(
    window: Option<&WorkingWindow>,
    time: NaiveTime,
    booked: &[NaiveTime],
    policy: ClosingTimePolicy,
) -> bool {
    match window {
        Some(window) => window.admits(time, policy) && !booked.contains(&time),
        None => false,
    }
}

/// Lists the free slots of a day in ascending order.
pub fn free_slots(window: Option<&WorkingWindow>, booked: &[NaiveTime]) -> Vec<NaiveTime> {
    let Some(window) = window else {
        return Vec::new();
    };

    window
        .candidate_slots()
        .into_iter()
        .filter(|slot| is_available(Some(window), *slot, booked, ClosingTimePolicy::Exclusive))
        .collect()
}
