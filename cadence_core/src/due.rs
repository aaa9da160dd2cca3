//! Due-date evaluation.
//!
//! Rules, in precedence order:
//! 1. Inactive habits are never due
//! 2. A day inside the current period on which the habit was completed is due,
//!    so completions stay visible and can be undone even off-schedule
//! 3. Otherwise the recurrence type decides
//!
//! Weekly and frequency-based monthly habits are due on every day of the
//! period until the quota is met. The answer is the same for each day.
//!
//! These functions read the habit as it is. Callers that need the current
//! period to be up to date go through `Engine::is_due`.

use crate::{Habit, Schedule, Weekday};
use chrono::{Datelike, NaiveDate};

/// Decide whether `habit` is due on `date`
pub fn is_due(habit: &Habit, date: NaiveDate) -> bool {
    if !habit.active {
        return false;
    }

    let period = &habit.progress.current_period;
    if period.contains_date(date) && period.completed_on(date) {
        return true;
    }

    let quota_open = period.completions < period.target;

    match &habit.recurrence.schedule {
        Schedule::Daily { .. } => true,
        Schedule::Weekly { .. } => quota_open,
        // Anchor days decide alone; the quota applies only without them
        Schedule::Monthly { days_of_month, .. } => match present(days_of_month) {
            Some(days) => days.contains(&date.day()),
            None => quota_open,
        },
        Schedule::Yearly {
            months_of_year,
            days_of_month,
            ..
        } => match (present(months_of_year), present(days_of_month)) {
            (Some(months), Some(days)) => {
                months.contains(&date.month()) && days.contains(&date.day())
            }
            _ => false,
        },
        Schedule::SpecificDays { days_of_week } => days_of_week.contains(&Weekday::of(date)),
    }
}

/// An optional set counts as absent when it is missing or empty
fn present(set: &Option<Vec<u32>>) -> Option<&[u32]> {
    set.as_deref().filter(|s| !s.is_empty())
}
