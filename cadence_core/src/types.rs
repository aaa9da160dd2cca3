//! Core domain types for Cadence.
//!
//! This module defines the fundamental types used throughout the system:
//! - Weekdays, time-of-day buckets and recurrence rules
//! - Periods, archived history and streak progress
//! - The canonical habit record and the legacy flat record it replaces

use crate::timefmt::{timestamp, timestamp_list};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

// ============================================================================
// Calendar Types
// ============================================================================

/// Day of the week, persisted as its lowercase English name
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum Weekday {
    #[default]
    Monday,
    Tuesday,
    Wednesday,
    Thursday,
    Friday,
    Saturday,
    Sunday,
}

impl Weekday {
    pub const ALL: [Weekday; 7] = [
        Weekday::Monday,
        Weekday::Tuesday,
        Weekday::Wednesday,
        Weekday::Thursday,
        Weekday::Friday,
        Weekday::Saturday,
        Weekday::Sunday,
    ];

    /// Weekday of a calendar date
    pub fn of(date: NaiveDate) -> Self {
        date.weekday().into()
    }

    pub fn name(self) -> &'static str {
        match self {
            Weekday::Monday => "monday",
            Weekday::Tuesday => "tuesday",
            Weekday::Wednesday => "wednesday",
            Weekday::Thursday => "thursday",
            Weekday::Friday => "friday",
            Weekday::Saturday => "saturday",
            Weekday::Sunday => "sunday",
        }
    }

    /// Three-letter capitalised label ("Mon")
    pub fn short_label(self) -> &'static str {
        match self {
            Weekday::Monday => "Mon",
            Weekday::Tuesday => "Tue",
            Weekday::Wednesday => "Wed",
            Weekday::Thursday => "Thu",
            Weekday::Friday => "Fri",
            Weekday::Saturday => "Sat",
            Weekday::Sunday => "Sun",
        }
    }

    /// Position in a Sunday-first week (Sunday = 0)
    pub fn days_from_sunday(self) -> u32 {
        chrono::Weekday::from(self).num_days_from_sunday()
    }
}

impl From<chrono::Weekday> for Weekday {
    fn from(day: chrono::Weekday) -> Self {
        match day {
            chrono::Weekday::Mon => Weekday::Monday,
            chrono::Weekday::Tue => Weekday::Tuesday,
            chrono::Weekday::Wed => Weekday::Wednesday,
            chrono::Weekday::Thu => Weekday::Thursday,
            chrono::Weekday::Fri => Weekday::Friday,
            chrono::Weekday::Sat => Weekday::Saturday,
            chrono::Weekday::Sun => Weekday::Sunday,
        }
    }
}

impl From<Weekday> for chrono::Weekday {
    fn from(day: Weekday) -> Self {
        match day {
            Weekday::Monday => chrono::Weekday::Mon,
            Weekday::Tuesday => chrono::Weekday::Tue,
            Weekday::Wednesday => chrono::Weekday::Wed,
            Weekday::Thursday => chrono::Weekday::Thu,
            Weekday::Friday => chrono::Weekday::Fri,
            Weekday::Saturday => chrono::Weekday::Sat,
            Weekday::Sunday => chrono::Weekday::Sun,
        }
    }
}

impl FromStr for Weekday {
    type Err = String;

    /// Accepts full names or three-letter abbreviations, any case
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Weekday::ALL
            .into_iter()
            .find(|d| d.name() == lower || d.name()[..3] == lower)
            .ok_or_else(|| format!("unknown weekday '{}'", s))
    }
}

impl fmt::Display for Weekday {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Part of the day a habit is meant for
///
/// Declaration order is the display ordinal used when sorting today's list.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
#[serde(rename_all = "lowercase")]
pub enum TimeOfDay {
    #[default]
    Anytime,
    Morning,
    Afternoon,
    Evening,
    Night,
}

impl TimeOfDay {
    pub fn name(self) -> &'static str {
        match self {
            TimeOfDay::Anytime => "anytime",
            TimeOfDay::Morning => "morning",
            TimeOfDay::Afternoon => "afternoon",
            TimeOfDay::Evening => "evening",
            TimeOfDay::Night => "night",
        }
    }
}

impl FromStr for TimeOfDay {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "anytime" => Ok(TimeOfDay::Anytime),
            "morning" => Ok(TimeOfDay::Morning),
            "afternoon" => Ok(TimeOfDay::Afternoon),
            "evening" => Ok(TimeOfDay::Evening),
            "night" => Ok(TimeOfDay::Night),
            other => Err(format!("unknown time of day '{}'", other)),
        }
    }
}

impl fmt::Display for TimeOfDay {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

// ============================================================================
// Recurrence Types
// ============================================================================

/// The kind of recurrence, without its parameters
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum RecurrenceType {
    Daily,
    Weekly,
    Monthly,
    Yearly,
    SpecificDays,
}

impl RecurrenceType {
    pub const ALL: [RecurrenceType; 5] = [
        RecurrenceType::Daily,
        RecurrenceType::Weekly,
        RecurrenceType::Monthly,
        RecurrenceType::Yearly,
        RecurrenceType::SpecificDays,
    ];

    pub fn name(self) -> &'static str {
        match self {
            RecurrenceType::Daily => "daily",
            RecurrenceType::Weekly => "weekly",
            RecurrenceType::Monthly => "monthly",
            RecurrenceType::Yearly => "yearly",
            RecurrenceType::SpecificDays => "specific_days",
        }
    }
}

impl FromStr for RecurrenceType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "daily" => Ok(RecurrenceType::Daily),
            "weekly" => Ok(RecurrenceType::Weekly),
            "monthly" => Ok(RecurrenceType::Monthly),
            "yearly" => Ok(RecurrenceType::Yearly),
            "specific_days" => Ok(RecurrenceType::SpecificDays),
            other => Err(format!("unknown recurrence type '{}'", other)),
        }
    }
}

impl fmt::Display for RecurrenceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

fn one() -> u32 {
    1
}

/// Type-specific part of a recurrence rule, tagged by `type`
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case", rename_all_fields = "camelCase")]
pub enum Schedule {
    Daily {
        #[serde(default = "one")]
        times_per_day: u32,
    },
    Weekly {
        #[serde(default = "one")]
        times_per_week: u32,
    },
    Monthly {
        #[serde(default = "one")]
        times_per_month: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        days_of_month: Option<Vec<u32>>,
    },
    Yearly {
        #[serde(default = "one")]
        times_per_year: u32,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        months_of_year: Option<Vec<u32>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        days_of_month: Option<Vec<u32>>,
    },
    SpecificDays {
        #[serde(default)]
        days_of_week: Vec<Weekday>,
    },
}

impl Schedule {
    pub fn kind(&self) -> RecurrenceType {
        match self {
            Schedule::Daily { .. } => RecurrenceType::Daily,
            Schedule::Weekly { .. } => RecurrenceType::Weekly,
            Schedule::Monthly { .. } => RecurrenceType::Monthly,
            Schedule::Yearly { .. } => RecurrenceType::Yearly,
            Schedule::SpecificDays { .. } => RecurrenceType::SpecificDays,
        }
    }
}

/// A declarative schedule: the tagged schedule plus fields shared by all types
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Recurrence {
    #[serde(flatten)]
    pub schedule: Schedule,

    /// First day of the week for weekly and specific-days periods
    #[serde(default)]
    pub week_start: Weekday,

    /// Ordered reminder times, "HH:MM"
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub specific_times: Vec<String>,

    /// Advisory only; never consulted by the evaluator
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub preferred_days_of_week: Vec<Weekday>,
}

impl Recurrence {
    /// Recurrence with default week start and no times
    pub fn new(schedule: Schedule) -> Self {
        Self {
            schedule,
            week_start: Weekday::Monday,
            specific_times: Vec::new(),
            preferred_days_of_week: Vec::new(),
        }
    }

    pub fn daily(times_per_day: u32) -> Self {
        Self::new(Schedule::Daily { times_per_day })
    }

    pub fn weekly(times_per_week: u32) -> Self {
        Self::new(Schedule::Weekly { times_per_week })
    }

    pub fn monthly(times_per_month: u32, days_of_month: Option<Vec<u32>>) -> Self {
        Self::new(Schedule::Monthly {
            times_per_month,
            days_of_month,
        })
    }

    pub fn yearly(
        times_per_year: u32,
        months_of_year: Option<Vec<u32>>,
        days_of_month: Option<Vec<u32>>,
    ) -> Self {
        Self::new(Schedule::Yearly {
            times_per_year,
            months_of_year,
            days_of_month,
        })
    }

    pub fn specific_days(days_of_week: Vec<Weekday>) -> Self {
        Self::new(Schedule::SpecificDays { days_of_week })
    }

    pub fn with_week_start(mut self, week_start: Weekday) -> Self {
        self.week_start = week_start;
        self
    }

    pub fn kind(&self) -> RecurrenceType {
        self.schedule.kind()
    }
}

// ============================================================================
// Progress Types
// ============================================================================

/// One recurrence period and what was done in it
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    #[serde(with = "timestamp")]
    pub period_start: NaiveDateTime,
    #[serde(with = "timestamp")]
    pub period_end: NaiveDateTime,
    #[serde(default)]
    pub completions: u32,
    #[serde(default)]
    pub target: u32,
    #[serde(default, with = "timestamp_list")]
    pub completion_dates: Vec<NaiveDateTime>,
    #[serde(default, with = "timestamp_list")]
    pub completion_times: Vec<NaiveDateTime>,
    #[serde(default)]
    pub subtasks_completed: Vec<String>,
}

impl Period {
    /// Whether `date` lies inside this period at day granularity
    pub fn contains_date(&self, date: NaiveDate) -> bool {
        self.period_start.date() <= date && date <= self.period_end.date()
    }

    /// Whether a completion was recorded on `date`
    pub fn completed_on(&self, date: NaiveDate) -> bool {
        self.completion_dates.iter().any(|ts| ts.date() == date)
    }
}

/// A past period frozen into history
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ArchivedPeriod {
    #[serde(flatten)]
    pub period: Period,
    pub completed: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
}

/// Current period, history and streak for a habit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Progress {
    pub current_period: Period,
    #[serde(default)]
    pub history: Vec<ArchivedPeriod>,
    #[serde(default)]
    pub streak: u32,
}

// ============================================================================
// Habit Types
// ============================================================================

/// A named step within a habit
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Subtask {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// A measurable goal attached to a habit ("64 oz", "30 minutes")
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct Measure {
    pub target: u32,
    pub unit: String,
}

fn default_active() -> bool {
    true
}

/// The canonical habit record
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Habit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub category: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default = "default_active")]
    pub active: bool,
    #[serde(with = "timestamp")]
    pub creation_date: NaiveDateTime,
    pub recurrence: Recurrence,
    pub progress: Progress,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub subtasks: Vec<Subtask>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<Measure>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<Measure>,
    #[serde(default)]
    pub time_of_day: TimeOfDay,
}

impl Habit {
    pub fn kind(&self) -> RecurrenceType {
        self.recurrence.kind()
    }

    pub fn current_period(&self) -> &Period {
        &self.progress.current_period
    }

    /// Whether a completion was recorded on `date` in the current period or
    /// any archived period
    pub fn was_completed_on(&self, date: NaiveDate) -> bool {
        self.progress.current_period.completed_on(date)
            || self
                .progress
                .history
                .iter()
                .any(|archived| archived.period.completed_on(date))
    }
}

// ============================================================================
// Legacy Types
// ============================================================================

/// Frequency of the flat legacy record
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LegacyFrequency {
    Daily,
    Weekly,
    Monthly,
    SpecificDays,
}

/// The older flat habit record: no period object, no numeric target
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LegacyHabit {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub frequency: LegacyFrequency,
    #[serde(default)]
    pub specific_days: Vec<Weekday>,
    #[serde(default)]
    pub time_of_day: TimeOfDay,
    #[serde(with = "timestamp")]
    pub created_at: NaiveDateTime,
    #[serde(default)]
    pub streak: u32,
    #[serde(default, with = "timestamp_list")]
    pub completed_dates: Vec<NaiveDateTime>,
}

/// A persisted record in either schema
///
/// Rich records are tried first; anything with a `recurrence` and `progress`
/// object is treated as canonical.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum HabitRecord {
    Rich(Habit),
    Legacy(LegacyHabit),
}
