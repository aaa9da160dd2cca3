//! Creating and editing habits.
//!
//! Malformed input is rejected here, at the boundary, so the evaluator and
//! ledger only ever see well-formed records.

use crate::period::{compute_period, target_for};
use crate::{
    Error, Habit, Measure, Period, Progress, Recurrence, RecurrenceType, Result, Schedule,
    Subtask, TimeOfDay,
};
use chrono::{NaiveDateTime, NaiveTime};
use uuid::Uuid;

impl Subtask {
    /// A subtask with a fresh id
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            name: name.into(),
            description: None,
        }
    }
}

/// Fields a caller supplies to create a habit
#[derive(Clone, Debug)]
pub struct NewHabit {
    pub name: String,
    pub description: String,
    pub category: Option<String>,
    pub color: Option<String>,
    pub recurrence: Recurrence,
    pub subtasks: Vec<Subtask>,
    pub duration: Option<Measure>,
    pub amount: Option<Measure>,
    pub time_of_day: TimeOfDay,
}

impl NewHabit {
    pub fn new(name: impl Into<String>, recurrence: Recurrence) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            category: None,
            color: None,
            recurrence,
            subtasks: Vec::new(),
            duration: None,
            amount: None,
            time_of_day: TimeOfDay::Anytime,
        }
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn time_of_day(mut self, time_of_day: TimeOfDay) -> Self {
        self.time_of_day = time_of_day;
        self
    }

    pub fn color(mut self, color: impl Into<String>) -> Self {
        self.color = Some(color.into());
        self
    }

    pub fn amount(mut self, amount: Measure) -> Self {
        self.amount = Some(amount);
        self
    }

    pub fn duration(mut self, duration: Measure) -> Self {
        self.duration = Some(duration);
        self
    }

    pub fn subtask(mut self, name: impl Into<String>) -> Self {
        self.subtasks.push(Subtask::new(name));
        self
    }
}

/// Changes to an existing habit; `None` leaves a field as it is
///
/// For `category` and `color` an empty string clears the value. For `amount`
/// and `duration` the inner `None` clears the measure.
#[derive(Clone, Debug, Default)]
pub struct HabitEdit {
    pub name: Option<String>,
    pub description: Option<String>,
    pub category: Option<String>,
    pub color: Option<String>,
    pub recurrence: Option<Recurrence>,
    pub time_of_day: Option<TimeOfDay>,
    pub amount: Option<Option<Measure>>,
    pub duration: Option<Option<Measure>>,
    pub subtasks: Option<Vec<Subtask>>,
}

impl HabitEdit {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.description.is_none()
            && self.category.is_none()
            && self.color.is_none()
            && self.recurrence.is_none()
            && self.time_of_day.is_none()
            && self.amount.is_none()
            && self.duration.is_none()
            && self.subtasks.is_none()
    }
}

impl Habit {
    /// Create an active habit with a fresh period containing `now`
    pub fn new(new: NewHabit, now: NaiveDateTime) -> Result<Self> {
        let name = validate_name(&new.name)?;
        validate_recurrence(&new.recurrence)?;
        validate_measures(new.amount.as_ref(), new.duration.as_ref())?;
        validate_subtasks(&new.subtasks)?;

        let habit = Habit {
            id: Uuid::new_v4().to_string(),
            name,
            description: new.description,
            category: new.category,
            color: new.color,
            active: true,
            creation_date: now,
            progress: Progress {
                current_period: Period::fresh(&new.recurrence, now),
                history: Vec::new(),
                streak: 0,
            },
            recurrence: new.recurrence,
            subtasks: new.subtasks,
            duration: new.duration,
            amount: new.amount,
            time_of_day: new.time_of_day,
        };

        tracing::info!("Created {} habit '{}' ({})", habit.kind(), habit.name, habit.id);
        Ok(habit)
    }

    /// Replace the recurrence rule
    ///
    /// Changing the type moves the current period to the new type's window
    /// and zeroes its count. Changing the week start of a weekly or
    /// specific-days habit keeps the period start and moves its end to the
    /// last day of the new week containing `now`, so the next period begins
    /// on the new week start with no overlap or gap. The target is always
    /// recomputed from the new rule.
    pub fn set_recurrence(&mut self, recurrence: Recurrence, now: NaiveDateTime) -> Result<()> {
        validate_recurrence(&recurrence)?;

        let kind = recurrence.kind();
        let period = &mut self.progress.current_period;
        if kind != self.recurrence.kind() {
            let fresh = Period::fresh(&recurrence, now);
            period.period_start = fresh.period_start;
            period.period_end = fresh.period_end;
            period.completions = 0;
        } else if recurrence.week_start != self.recurrence.week_start
            && matches!(kind, RecurrenceType::Weekly | RecurrenceType::SpecificDays)
        {
            let end = compute_period(kind, now.date(), recurrence.week_start).end;
            period.period_end = end;
            period.completion_dates.retain(|ts| *ts <= end);
            period.completion_times.retain(|ts| *ts <= end);
            period.completions = period
                .completions
                .min(period.completion_dates.len() as u32);
        }
        period.target = target_for(&recurrence);

        tracing::info!(
            "Changed recurrence of {} from {} to {} (target {})",
            self.id,
            self.recurrence.kind(),
            recurrence.kind(),
            period.target
        );
        self.recurrence = recurrence;
        Ok(())
    }
}

impl Habit {
    /// Apply an edit, validating every changed field before touching any
    pub fn apply_edit(&mut self, edit: HabitEdit, now: NaiveDateTime) -> Result<()> {
        let name = edit.name.as_deref().map(validate_name).transpose()?;
        validate_measures(
            edit.amount.as_ref().and_then(Option::as_ref),
            edit.duration.as_ref().and_then(Option::as_ref),
        )?;
        if let Some(subtasks) = &edit.subtasks {
            validate_subtasks(subtasks)?;
        }
        if let Some(recurrence) = edit.recurrence {
            self.set_recurrence(recurrence, now)?;
        }

        if let Some(name) = name {
            self.name = name;
        }
        if let Some(description) = edit.description {
            self.description = description;
        }
        if let Some(category) = edit.category {
            self.category = non_blank(category);
        }
        if let Some(color) = edit.color {
            self.color = non_blank(color);
        }
        if let Some(time_of_day) = edit.time_of_day {
            self.time_of_day = time_of_day;
        }
        if let Some(amount) = edit.amount {
            self.amount = amount;
        }
        if let Some(duration) = edit.duration {
            self.duration = duration;
        }
        if let Some(subtasks) = edit.subtasks {
            self.subtasks = subtasks;
        }

        tracing::info!("Edited habit '{}' ({})", self.name, self.id);
        Ok(())
    }
}

fn non_blank(value: String) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

fn validate_name(name: &str) -> Result<String> {
    let name = name.trim();
    if name.is_empty() {
        return Err(Error::InvalidHabit("name must not be empty".into()));
    }
    Ok(name.to_string())
}

/// Reject a measure with a zero target or no unit
pub fn validate_measure(label: &str, measure: &Measure) -> Result<()> {
    if measure.target == 0 {
        return Err(Error::InvalidHabit(format!(
            "{} target must be greater than zero",
            label
        )));
    }
    if measure.unit.trim().is_empty() {
        return Err(Error::InvalidHabit(format!("{} needs a unit", label)));
    }
    Ok(())
}

fn validate_measures(amount: Option<&Measure>, duration: Option<&Measure>) -> Result<()> {
    if let Some(amount) = amount {
        validate_measure("amount", amount)?;
    }
    if let Some(duration) = duration {
        validate_measure("duration", duration)?;
    }
    Ok(())
}

fn validate_subtasks(subtasks: &[Subtask]) -> Result<()> {
    if subtasks.iter().any(|s| s.name.trim().is_empty()) {
        return Err(Error::InvalidHabit("subtask name must not be empty".into()));
    }
    Ok(())
}

/// Reject recurrence rules missing or misusing the fields their type needs
pub fn validate_recurrence(recurrence: &Recurrence) -> Result<()> {
    let invalid = |msg: String| Err(Error::InvalidRecurrence(msg));

    match &recurrence.schedule {
        Schedule::Daily { times_per_day: n }
        | Schedule::Weekly { times_per_week: n }
        | Schedule::Monthly {
            times_per_month: n, ..
        }
        | Schedule::Yearly {
            times_per_year: n, ..
        } if *n == 0 => {
            return invalid(format!("{} habit needs at least one completion per period", recurrence.kind()));
        }
        Schedule::SpecificDays { days_of_week } if days_of_week.is_empty() => {
            return invalid("specific_days habit needs at least one day of the week".into());
        }
        _ => {}
    }

    let (months, days) = match &recurrence.schedule {
        Schedule::Monthly { days_of_month, .. } => (None, days_of_month.as_deref()),
        Schedule::Yearly {
            months_of_year,
            days_of_month,
            ..
        } => (months_of_year.as_deref(), days_of_month.as_deref()),
        _ => (None, None),
    };

    if let Some(day) = days.unwrap_or_default().iter().find(|d| !(1..=31).contains(*d)) {
        return invalid(format!("day of month {} is outside 1..=31", day));
    }
    if let Some(month) = months.unwrap_or_default().iter().find(|m| !(1..=12).contains(*m)) {
        return invalid(format!("month {} is outside 1..=12", month));
    }

    for time in &recurrence.specific_times {
        if NaiveTime::parse_from_str(time, "%H:%M").is_err() {
            return invalid(format!("specific time '{}' is not HH:MM", time));
        }
    }

    Ok(())
}
