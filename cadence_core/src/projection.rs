//! Read-only views derived from the habit collection.
//!
//! Nothing here is cached or mutated; every view is recomputed from the
//! habits passed in. Callers bring periods up to date (`Engine::roll_over_all`)
//! before projecting.

use crate::config::DayPartsConfig;
use crate::due::is_due;
use crate::period::days_in_month;
use crate::{Habit, Recurrence, RecurrenceType, Schedule, TimeOfDay, Weekday};
use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike};
use std::collections::BTreeMap;

// ============================================================================
// Per-habit figures
// ============================================================================

/// Share of the current period's target completed, in `[0, 1]`
///
/// A zero target yields 0.
pub fn progress_fraction(habit: &Habit) -> f64 {
    let period = &habit.progress.current_period;
    if period.target == 0 {
        return 0.0;
    }
    (f64::from(period.completions) / f64::from(period.target)).min(1.0)
}

/// Progress as a rounded percentage, 0..=100
pub fn progress_percent(habit: &Habit) -> u32 {
    (progress_fraction(habit) * 100.0).round() as u32
}

/// "Complete!" once the target is met, otherwise "done/target · n to go"
pub fn progress_text(habit: &Habit) -> String {
    let period = &habit.progress.current_period;
    if period.completions >= period.target {
        return "Complete!".to_string();
    }
    format!(
        "{}/{} · {} to go",
        period.completions,
        period.target,
        period.target - period.completions
    )
}

/// Short human description of a recurrence rule
pub fn describe_recurrence(recurrence: &Recurrence) -> String {
    let times = |n: u32, unit: &str, label: &str| {
        if n > 1 {
            format!("{}x {}", n, unit)
        } else {
            label.to_string()
        }
    };

    match &recurrence.schedule {
        Schedule::Daily { times_per_day } => times(*times_per_day, "daily", "Daily"),
        Schedule::Weekly { times_per_week } => times(*times_per_week, "weekly", "Weekly"),
        Schedule::Monthly {
            times_per_month, ..
        } => times(*times_per_month, "monthly", "Monthly"),
        Schedule::Yearly { times_per_year, .. } => times(*times_per_year, "yearly", "Yearly"),
        Schedule::SpecificDays { days_of_week } => match days_of_week.as_slice() {
            [] => "Specific days".to_string(),
            [only] => capitalize(only.name()),
            days if days.len() <= 3 => days
                .iter()
                .map(|d| d.short_label())
                .collect::<Vec<_>>()
                .join(", "),
            days => format!("{} days/week", days.len()),
        },
    }
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

// ============================================================================
// Day-level views
// ============================================================================

/// Habits to show on `date`: due that day, or actually completed that day
pub fn habits_on_date(habits: &[Habit], date: NaiveDate) -> Vec<&Habit> {
    habits
        .iter()
        .filter(|habit| is_due(habit, date) || habit.was_completed_on(date))
        .collect()
}

impl TimeOfDay {
    /// The part of the day an hour (0..24) falls into
    pub fn for_hour(hour: u32, parts: &DayPartsConfig) -> Self {
        if hour >= parts.morning && hour < parts.afternoon {
            TimeOfDay::Morning
        } else if hour >= parts.afternoon && hour < parts.evening {
            TimeOfDay::Afternoon
        } else if hour >= parts.evening && hour < parts.night {
            TimeOfDay::Evening
        } else {
            TimeOfDay::Night
        }
    }
}

/// Sort habits for display: those for the current part of the day first,
/// then by the fixed anytime..night ordinal. Stable.
pub fn sort_by_time_of_day(habits: &mut [&Habit], current: TimeOfDay) {
    habits.sort_by_key(|habit| (habit.time_of_day != current, habit.time_of_day));
}

/// Group habits by recurrence type in daily..specific_days order, dropping
/// empty groups
pub fn group_by_recurrence<'a>(
    habits: impl IntoIterator<Item = &'a Habit>,
) -> Vec<(RecurrenceType, Vec<&'a Habit>)> {
    let mut groups: BTreeMap<RecurrenceType, Vec<&'a Habit>> = BTreeMap::new();
    for habit in habits {
        groups.entry(habit.kind()).or_default().push(habit);
    }
    groups.into_iter().collect()
}

/// A habit on the today list
#[derive(Clone, Debug)]
pub struct TodayEntry<'a> {
    pub habit: &'a Habit,
    pub completed_today: bool,
    pub fraction: f64,
}

/// Today's habits, grouped by recurrence type and sorted by time of day
#[derive(Clone, Debug)]
pub struct TodayView<'a> {
    pub date: NaiveDate,
    pub current: TimeOfDay,
    pub groups: Vec<(RecurrenceType, Vec<TodayEntry<'a>>)>,
}

impl TodayView<'_> {
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn len(&self) -> usize {
        self.groups.iter().map(|(_, entries)| entries.len()).sum()
    }
}

pub fn today_view<'a>(
    habits: &'a [Habit],
    now: NaiveDateTime,
    parts: &DayPartsConfig,
) -> TodayView<'a> {
    let date = now.date();
    let current = TimeOfDay::for_hour(now.hour(), parts);

    let groups = group_by_recurrence(habits_on_date(habits, date))
        .into_iter()
        .map(|(kind, mut members)| {
            sort_by_time_of_day(&mut members, current);
            let entries = members
                .into_iter()
                .map(|habit| TodayEntry {
                    habit,
                    completed_today: habit.was_completed_on(date),
                    fraction: progress_fraction(habit),
                })
                .collect();
            (kind, entries)
        })
        .collect();

    TodayView {
        date,
        current,
        groups,
    }
}

// ============================================================================
// Tab-level views
// ============================================================================

/// Badge counts for the habit tabs
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TabCounts {
    pub all: usize,
    pub by_type: BTreeMap<RecurrenceType, usize>,
    pub inactive: usize,
}

impl TabCounts {
    pub fn of(&self, kind: RecurrenceType) -> usize {
        self.by_type.get(&kind).copied().unwrap_or(0)
    }
}

/// Count active habits per type, plus inactive and total
pub fn tab_counts(habits: &[Habit]) -> TabCounts {
    let mut counts = TabCounts {
        all: habits.len(),
        ..TabCounts::default()
    };
    for habit in habits {
        if habit.active {
            *counts.by_type.entry(habit.kind()).or_default() += 1;
        } else {
            counts.inactive += 1;
        }
    }
    counts
}

/// Active habits of one type, sorted by name
pub fn habits_by_type(habits: &[Habit], kind: RecurrenceType) -> Vec<&Habit> {
    let mut selected: Vec<&Habit> = habits
        .iter()
        .filter(|habit| habit.active && habit.kind() == kind)
        .collect();
    selected.sort_by(|a, b| a.name.cmp(&b.name));
    selected
}

// ============================================================================
// Calendar views
// ============================================================================

/// Habit ids completed on each date, across current and archived periods
pub fn completions_by_date(habits: &[Habit]) -> BTreeMap<NaiveDate, Vec<String>> {
    let mut map: BTreeMap<NaiveDate, Vec<String>> = BTreeMap::new();
    for habit in habits {
        let periods = std::iter::once(&habit.progress.current_period)
            .chain(habit.progress.history.iter().map(|archived| &archived.period));
        for period in periods {
            for ts in &period.completion_dates {
                let ids = map.entry(ts.date()).or_default();
                if !ids.contains(&habit.id) {
                    ids.push(habit.id.clone());
                }
            }
        }
    }
    map
}

/// A habit shown in a calendar cell
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarEntry {
    pub habit_id: String,
    pub name: String,
    pub completed: bool,
}

/// One day of a month calendar
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub entries: Vec<CalendarEntry>,
}

impl CalendarDay {
    pub fn completed(&self) -> usize {
        self.entries.iter().filter(|e| e.completed).count()
    }

    pub fn total(&self) -> usize {
        self.entries.len()
    }
}

/// A month laid out on a Sunday-first grid
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MonthCalendar {
    pub year: i32,
    pub month: u32,
    /// Empty cells before the 1st
    pub leading_blanks: u32,
    pub days: Vec<CalendarDay>,
}

/// Build the calendar for `year`/`month`; `None` if the month is invalid
pub fn month_calendar(habits: &[Habit], year: i32, month: u32) -> Option<MonthCalendar> {
    let first = NaiveDate::from_ymd_opt(year, month, 1)?;

    let days = (0..days_in_month(year, month))
        .map(|offset| {
            let date = first + Duration::days(i64::from(offset));
            let entries = habits_on_date(habits, date)
                .into_iter()
                .map(|habit| CalendarEntry {
                    habit_id: habit.id.clone(),
                    name: habit.name.clone(),
                    completed: habit.was_completed_on(date),
                })
                .collect();
            CalendarDay { date, entries }
        })
        .collect();

    Some(MonthCalendar {
        year,
        month,
        leading_blanks: Weekday::of(first).days_from_sunday(),
        days,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{NewHabit, Weekday};

    fn at(y: i32, m: u32, d: u32, h: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, m, d)
            .unwrap()
            .and_hms_opt(h, 0, 0)
            .unwrap()
    }

    fn make(name: &str, recurrence: Recurrence, time_of_day: TimeOfDay, now: NaiveDateTime) -> Habit {
        Habit::new(NewHabit::new(name, recurrence).time_of_day(time_of_day), now).unwrap()
    }

    #[test]
    fn test_progress_fraction_bounds() {
        let now = at(2025, 5, 16, 9);
        let mut habit = make("Jog", Recurrence::weekly(4), TimeOfDay::Anytime, now);
        assert_eq!(progress_fraction(&habit), 0.0);

        habit.progress.current_period.completions = 1;
        assert_eq!(progress_fraction(&habit), 0.25);
        assert_eq!(progress_percent(&habit), 25);
        assert_eq!(progress_text(&habit), "1/4 · 3 to go");

        habit.progress.current_period.completions = 9;
        assert_eq!(progress_fraction(&habit), 1.0);
        assert_eq!(progress_text(&habit), "Complete!");

        habit.progress.current_period.target = 0;
        habit.progress.current_period.completions = 0;
        assert_eq!(progress_fraction(&habit), 0.0);
    }

    #[test]
    fn test_describe_recurrence() {
        assert_eq!(describe_recurrence(&Recurrence::daily(1)), "Daily");
        assert_eq!(describe_recurrence(&Recurrence::weekly(3)), "3x weekly");
        assert_eq!(describe_recurrence(&Recurrence::monthly(1, Some(vec![1]))), "Monthly");
        assert_eq!(
            describe_recurrence(&Recurrence::specific_days(vec![Weekday::Tuesday])),
            "Tuesday"
        );
        assert_eq!(
            describe_recurrence(&Recurrence::specific_days(vec![
                Weekday::Monday,
                Weekday::Wednesday,
                Weekday::Friday
            ])),
            "Mon, Wed, Fri"
        );
        assert_eq!(
            describe_recurrence(&Recurrence::specific_days(Weekday::ALL[..5].to_vec())),
            "5 days/week"
        );
    }

    #[test]
    fn test_time_of_day_for_hour() {
        let parts = DayPartsConfig::default();
        assert_eq!(TimeOfDay::for_hour(4, &parts), TimeOfDay::Night);
        assert_eq!(TimeOfDay::for_hour(5, &parts), TimeOfDay::Morning);
        assert_eq!(TimeOfDay::for_hour(12, &parts), TimeOfDay::Afternoon);
        assert_eq!(TimeOfDay::for_hour(17, &parts), TimeOfDay::Evening);
        assert_eq!(TimeOfDay::for_hour(21, &parts), TimeOfDay::Night);
    }

    #[test]
    fn test_sort_puts_current_bucket_first() {
        let now = at(2025, 5, 16, 18);
        let habits = vec![
            make("night", Recurrence::daily(1), TimeOfDay::Night, now),
            make("morning", Recurrence::daily(1), TimeOfDay::Morning, now),
            make("evening", Recurrence::daily(1), TimeOfDay::Evening, now),
            make("anytime", Recurrence::daily(1), TimeOfDay::Anytime, now),
        ];
        let mut refs: Vec<&Habit> = habits.iter().collect();

        sort_by_time_of_day(&mut refs, TimeOfDay::Evening);

        let names: Vec<&str> = refs.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["evening", "anytime", "morning", "night"]);
    }

    #[test]
    fn test_habits_on_date_includes_completed_off_schedule() {
        let now = at(2025, 5, 16, 9); // Friday
        let mut gym = make(
            "Gym",
            Recurrence::specific_days(vec![Weekday::Monday]),
            TimeOfDay::Anytime,
            now,
        );
        assert!(habits_on_date(std::slice::from_ref(&gym), now.date()).is_empty());

        gym.progress.current_period.completion_dates.push(now);
        assert_eq!(habits_on_date(std::slice::from_ref(&gym), now.date()).len(), 1);
    }

    #[test]
    fn test_today_view_groups_and_flags() {
        let now = at(2025, 5, 16, 8); // Friday morning
        let mut water = make("Water", Recurrence::daily(1), TimeOfDay::Anytime, now);
        water.progress.current_period.completion_dates.push(now);
        water.progress.current_period.completions = 1;
        let habits = vec![
            water,
            make("Stretch", Recurrence::daily(1), TimeOfDay::Morning, now),
            make("Jog", Recurrence::weekly(3), TimeOfDay::Evening, now),
            make("Gym", Recurrence::specific_days(vec![Weekday::Monday]), TimeOfDay::Anytime, now),
        ];

        let view = today_view(&habits, now, &DayPartsConfig::default());

        assert_eq!(view.current, TimeOfDay::Morning);
        assert_eq!(view.len(), 3);
        assert_eq!(view.groups[0].0, RecurrenceType::Daily);
        assert_eq!(view.groups[0].1[0].habit.name, "Stretch");
        assert!(view.groups[0].1[1].completed_today);
        assert_eq!(view.groups[0].1[1].fraction, 1.0);
        assert_eq!(view.groups[1].0, RecurrenceType::Weekly);
    }

    #[test]
    fn test_tab_counts_and_listing() {
        let now = at(2025, 5, 16, 9);
        let mut paused = make("Paused", Recurrence::daily(1), TimeOfDay::Anytime, now);
        paused.active = false;
        let habits = vec![
            make("b-daily", Recurrence::daily(1), TimeOfDay::Anytime, now),
            make("a-daily", Recurrence::daily(1), TimeOfDay::Anytime, now),
            make("weekly", Recurrence::weekly(1), TimeOfDay::Anytime, now),
            paused,
        ];

        let counts = tab_counts(&habits);
        assert_eq!(counts.all, 4);
        assert_eq!(counts.of(RecurrenceType::Daily), 2);
        assert_eq!(counts.of(RecurrenceType::Yearly), 0);
        assert_eq!(counts.inactive, 1);

        let daily = habits_by_type(&habits, RecurrenceType::Daily);
        let names: Vec<&str> = daily.iter().map(|h| h.name.as_str()).collect();
        assert_eq!(names, vec!["a-daily", "b-daily"]);
    }

    #[test]
    fn test_completions_by_date_spans_history() {
        let created = at(2025, 5, 15, 9);
        let mut habit = make("Read", Recurrence::daily(1), TimeOfDay::Anytime, created);
        habit.progress.current_period.completion_dates.push(created);
        crate::ledger::roll_over(&mut habit, created + Duration::days(1));
        habit
            .progress
            .current_period
            .completion_dates
            .push(created + Duration::days(1));

        let map = completions_by_date(std::slice::from_ref(&habit));

        assert_eq!(map.len(), 2);
        assert_eq!(map[&created.date()], vec![habit.id.clone()]);
    }

    #[test]
    fn test_month_calendar_layout() {
        let now = at(2025, 5, 16, 9);
        let mut gym = make(
            "Gym",
            Recurrence::specific_days(vec![Weekday::Monday]),
            TimeOfDay::Anytime,
            now,
        );
        gym.progress
            .current_period
            .completion_dates
            .push(at(2025, 5, 12, 18));
        let habits = vec![gym];

        let calendar = month_calendar(&habits, 2025, 5).unwrap();

        // May 1st 2025 is a Thursday
        assert_eq!(calendar.leading_blanks, 4);
        assert_eq!(calendar.days.len(), 31);
        let mondays: Vec<&CalendarDay> = calendar.days.iter().filter(|d| d.total() > 0).collect();
        assert_eq!(mondays.len(), 4);
        let twelfth = &calendar.days[11];
        assert_eq!(twelfth.completed(), 1);

        assert!(month_calendar(&habits, 2025, 13).is_none());
    }
}
