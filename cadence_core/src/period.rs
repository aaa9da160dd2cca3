//! Period calculation for recurrence rules.
//!
//! Periods are inclusive local-time windows: the start is 00:00:00.000 of the
//! first day and the end is 23:59:59.999 of the last day.
//! - Daily: the reference day
//! - Weekly / specific days: seven days from the most recent week start
//! - Monthly: the calendar month
//! - Yearly: the calendar year

use crate::{Period, Recurrence, RecurrenceType, Schedule, Weekday};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime, NaiveTime};

/// Inclusive start and end of a period
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PeriodBounds {
    pub start: NaiveDateTime,
    pub end: NaiveDateTime,
}

impl PeriodBounds {
    fn spanning(first: NaiveDate, last: NaiveDate) -> Self {
        Self {
            start: start_of_day(first),
            end: end_of_day(last),
        }
    }
}

/// Compute the period of the given type that contains `reference`
pub fn compute_period(
    kind: RecurrenceType,
    reference: NaiveDate,
    week_start: Weekday,
) -> PeriodBounds {
    match kind {
        RecurrenceType::Daily => PeriodBounds::spanning(reference, reference),
        RecurrenceType::Weekly | RecurrenceType::SpecificDays => {
            let first = week_start_on_or_before(reference, week_start);
            PeriodBounds::spanning(first, first + Duration::days(6))
        }
        RecurrenceType::Monthly => {
            let first = reference - Duration::days(i64::from(reference.day0()));
            let last = first
                + Duration::days(i64::from(days_in_month(reference.year(), reference.month())) - 1);
            PeriodBounds::spanning(first, last)
        }
        RecurrenceType::Yearly => {
            let first = reference - Duration::days(i64::from(reference.ordinal0()));
            let length = if is_leap_year(reference.year()) { 366 } else { 365 };
            PeriodBounds::spanning(first, first + Duration::days(length - 1))
        }
    }
}

/// Completions a period needs under this rule
pub fn target_for(recurrence: &Recurrence) -> u32 {
    match &recurrence.schedule {
        Schedule::Daily { times_per_day } => *times_per_day,
        Schedule::Weekly { times_per_week } => *times_per_week,
        Schedule::Monthly {
            times_per_month, ..
        } => *times_per_month,
        Schedule::Yearly { times_per_year, .. } => *times_per_year,
        Schedule::SpecificDays { days_of_week } => {
            let mut days = days_of_week.clone();
            days.sort();
            days.dedup();
            days.len() as u32
        }
    }
}

impl Period {
    /// A zeroed period of `recurrence` containing `now`
    pub fn fresh(recurrence: &Recurrence, now: NaiveDateTime) -> Self {
        let bounds = compute_period(recurrence.kind(), now.date(), recurrence.week_start);
        Self {
            period_start: bounds.start,
            period_end: bounds.end,
            completions: 0,
            target: target_for(recurrence),
            completion_dates: Vec::new(),
            completion_times: Vec::new(),
            subtasks_completed: Vec::new(),
        }
    }
}

pub fn start_of_day(date: NaiveDate) -> NaiveDateTime {
    date.and_time(NaiveTime::MIN)
}

pub fn end_of_day(date: NaiveDate) -> NaiveDateTime {
    start_of_day(date + Duration::days(1)) - Duration::milliseconds(1)
}

/// Most recent `week_start` on or before `date`
fn week_start_on_or_before(date: NaiveDate, week_start: Weekday) -> NaiveDate {
    let today = Weekday::of(date).days_from_sunday();
    let start = week_start.days_from_sunday();
    let back = (today + 7 - start) % 7;
    date - Duration::days(i64::from(back))
}

fn is_leap_year(year: i32) -> bool {
    (year % 4 == 0 && year % 100 != 0) || year % 400 == 0
}

pub fn days_in_month(year: i32, month: u32) -> u32 {
    match month {
        1 | 3 | 5 | 7 | 8 | 10 | 12 => 31,
        4 | 6 | 9 | 11 => 30,
        _ => {
            if is_leap_year(year) {
                29
            } else {
                28
            }
        }
    }
}
