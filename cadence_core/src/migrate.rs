//! Normalising legacy flat records into the canonical habit model.
//!
//! Legacy records carry a `frequency` and a flat list of completion dates.
//! Migration maps the frequency onto a once-per-period recurrence, puts the
//! completions that fall inside the current period into the current period,
//! and groups older ones into archived periods so history survives.

use crate::period::{compute_period, PeriodBounds};
use crate::{
    ArchivedPeriod, Habit, HabitRecord, LegacyFrequency, LegacyHabit, Period, Progress,
    Recurrence, Weekday,
};
use chrono::NaiveDateTime;
use std::collections::BTreeMap;

/// Recurrence equivalent to a legacy frequency
pub fn legacy_recurrence(legacy: &LegacyHabit, week_start: Weekday) -> Recurrence {
    let recurrence = match legacy.frequency {
        LegacyFrequency::Daily => Recurrence::daily(1),
        LegacyFrequency::Weekly => Recurrence::weekly(1),
        LegacyFrequency::Monthly => Recurrence::monthly(1, None),
        LegacyFrequency::SpecificDays => Recurrence::specific_days(legacy.specific_days.clone()),
    };
    recurrence.with_week_start(week_start)
}

/// Convert one legacy record, evaluating periods relative to `now`
pub fn migrate_legacy(legacy: LegacyHabit, now: NaiveDateTime, week_start: Weekday) -> Habit {
    let recurrence = legacy_recurrence(&legacy, week_start);
    if recurrence.kind() == crate::RecurrenceType::SpecificDays && legacy.specific_days.is_empty() {
        tracing::warn!(
            "Legacy habit {} has no specific days; it will never be due",
            legacy.id
        );
    }

    let mut current = Period::fresh(&recurrence, now);
    let target = current.target;

    let mut dates = legacy.completed_dates.clone();
    dates.sort();
    dates.dedup_by_key(|ts| ts.date());

    let mut earlier: BTreeMap<NaiveDateTime, (PeriodBounds, Vec<NaiveDateTime>)> = BTreeMap::new();
    for ts in dates {
        if ts < current.period_start {
            let bounds = compute_period(recurrence.kind(), ts.date(), recurrence.week_start);
            earlier
                .entry(bounds.start)
                .or_insert_with(|| (bounds, Vec::new()))
                .1
                .push(ts);
        } else {
            current.completion_dates.push(ts);
            current.completion_times.push(ts);
        }
    }
    current.completions = (current.completion_dates.len() as u32).min(target);

    let history: Vec<ArchivedPeriod> = earlier
        .into_values()
        .map(|(bounds, stamps)| {
            let completions = (stamps.len() as u32).min(target);
            ArchivedPeriod {
                period: Period {
                    period_start: bounds.start,
                    period_end: bounds.end,
                    completions,
                    target,
                    completion_dates: stamps.clone(),
                    completion_times: stamps,
                    subtasks_completed: Vec::new(),
                },
                completed: completions >= target,
                notes: None,
            }
        })
        .collect();

    tracing::info!(
        "Migrated legacy habit {} ({} archived periods)",
        legacy.id,
        history.len()
    );

    Habit {
        id: legacy.id,
        name: legacy.name,
        description: legacy.description,
        category: None,
        color: None,
        active: true,
        creation_date: legacy.created_at,
        recurrence,
        progress: Progress {
            current_period: current,
            history,
            streak: legacy.streak,
        },
        subtasks: Vec::new(),
        duration: None,
        amount: None,
        time_of_day: legacy.time_of_day,
    }
}

/// Normalise a loaded collection to canonical habits
///
/// Returns the habits and how many of them were migrated from legacy records.
pub fn normalize(
    records: Vec<HabitRecord>,
    now: NaiveDateTime,
    week_start: Weekday,
) -> (Vec<Habit>, usize) {
    let mut migrated = 0;
    let habits = records
        .into_iter()
        .map(|record| match record {
            HabitRecord::Rich(habit) => habit,
            HabitRecord::Legacy(legacy) => {
                migrated += 1;
                migrate_legacy(legacy, now, week_start)
            }
        })
        .collect();
    (habits, migrated)
}
