//! Completion ledger: toggling completions, streaks and period rollover.
//!
//! The functions here take "now" as an argument. `Engine` supplies it from
//! its clock and always rolls the period over before toggling.

use crate::config::LedgerConfig;
use crate::{ArchivedPeriod, Habit, Period};
use chrono::{NaiveDate, NaiveDateTime};

/// What a toggle did
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ToggleOutcome {
    /// A completion was recorded for the date
    Added,
    /// The completion for the date was removed
    Removed,
}

/// Archive the current period and start a fresh one if `now` is past its end
///
/// Returns true when a rollover happened. However many periods were skipped,
/// exactly one archived entry is appended, and the fresh period contains
/// `now`, so a second call is a no-op.
pub fn roll_over(habit: &mut Habit, now: NaiveDateTime) -> bool {
    if now <= habit.progress.current_period.period_end {
        return false;
    }

    let fresh = Period::fresh(&habit.recurrence, now);
    let finished = std::mem::replace(&mut habit.progress.current_period, fresh);
    let completed = finished.completions >= finished.target;

    tracing::info!(
        "Rolled over habit {}: archived {}..{} ({}/{}, completed: {})",
        habit.id,
        finished.period_start.date(),
        finished.period_end.date(),
        finished.completions,
        finished.target,
        completed
    );

    habit.progress.history.push(ArchivedPeriod {
        period: finished,
        completed,
        notes: None,
    });
    true
}

/// Toggle the completion of `habit` on `date`
///
/// Removing drops every completion recorded on that day. Adding records the
/// date at the current time of day and counts it only while the period is
/// below target. The streak moves only for today's date.
pub fn toggle_completion(
    habit: &mut Habit,
    date: NaiveDate,
    now: NaiveDateTime,
    config: &LedgerConfig,
) -> ToggleOutcome {
    let is_today = date == now.date();
    let was_completed = habit.was_completed_on(date);
    let progress = &mut habit.progress;
    let period = &mut progress.current_period;

    if was_completed {
        period.completion_dates.retain(|ts| ts.date() != date);
        period.completion_times.retain(|ts| ts.date() != date);
        period.completions = period.completions.saturating_sub(1);

        if is_today && progress.streak > 0 {
            progress.streak -= 1;
        }

        tracing::debug!(
            "Removed completion of {} on {} ({}/{}, streak {})",
            habit.id,
            date,
            period.completions,
            period.target,
            progress.streak
        );
        ToggleOutcome::Removed
    } else {
        let stamp = date.and_time(now.time());
        period.completion_dates.push(stamp);
        period.completion_times.push(stamp);

        let counted = period.completions < period.target;
        if counted {
            period.completions += 1;
        }

        if is_today && (counted || !config.streak_follows_target_cap) {
            progress.streak += 1;
        }

        tracing::debug!(
            "Added completion of {} on {} ({}/{}, streak {})",
            habit.id,
            date,
            period.completions,
            period.target,
            progress.streak
        );
        ToggleOutcome::Added
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Progress, Recurrence, TimeOfDay};
    use chrono::Duration;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn at(d: NaiveDate, h: u32) -> NaiveDateTime {
        d.and_hms_opt(h, 0, 0).unwrap()
    }

    fn habit(recurrence: Recurrence, now: NaiveDateTime) -> Habit {
        Habit {
            id: "h1".into(),
            name: "Test".into(),
            description: String::new(),
            category: None,
            color: None,
            active: true,
            creation_date: now,
            progress: Progress {
                current_period: Period::fresh(&recurrence, now),
                history: vec![],
                streak: 0,
            },
            recurrence,
            subtasks: vec![],
            duration: None,
            amount: None,
            time_of_day: TimeOfDay::Anytime,
        }
    }

    #[test]
    fn test_add_today_counts_and_extends_streak() {
        crate::logging::init_test();
        let now = at(date(2025, 5, 16), 9);
        let mut h = habit(Recurrence::daily(1), now);

        let outcome = toggle_completion(&mut h, now.date(), now, &LedgerConfig::default());

        assert_eq!(outcome, ToggleOutcome::Added);
        assert_eq!(h.progress.current_period.completions, 1);
        assert_eq!(h.progress.streak, 1);
        assert_eq!(h.progress.current_period.completion_dates, vec![now]);
        assert_eq!(h.progress.current_period.completion_times, vec![now]);
    }

    #[test]
    fn test_double_toggle_restores_counts() {
        let now = at(date(2025, 5, 14), 18);
        let mut h = habit(Recurrence::weekly(3), now);
        h.progress.streak = 4;
        let config = LedgerConfig::default();

        for d in [date(2025, 5, 12), now.date()] {
            let before = (h.progress.current_period.completions, h.progress.streak);
            assert_eq!(toggle_completion(&mut h, d, now, &config), ToggleOutcome::Added);
            assert_eq!(toggle_completion(&mut h, d, now, &config), ToggleOutcome::Removed);
            assert_eq!(
                (h.progress.current_period.completions, h.progress.streak),
                before
            );
            assert!(h.progress.current_period.completion_dates.is_empty());
        }
    }

    #[test]
    fn test_past_date_does_not_touch_streak() {
        let now = at(date(2025, 5, 14), 18);
        let mut h = habit(Recurrence::weekly(3), now);

        toggle_completion(&mut h, date(2025, 5, 12), now, &LedgerConfig::default());

        assert_eq!(h.progress.current_period.completions, 1);
        assert_eq!(h.progress.streak, 0);
        assert_eq!(
            h.progress.current_period.completion_dates,
            vec![date(2025, 5, 12).and_hms_opt(18, 0, 0).unwrap()]
        );
    }

    #[test]
    fn test_capped_completion_still_extends_streak() {
        let now = at(date(2025, 5, 16), 9);
        let mut h = habit(Recurrence::weekly(1), now);
        toggle_completion(&mut h, date(2025, 5, 12), now, &LedgerConfig::default());
        assert_eq!(h.progress.current_period.completions, 1);
        let streak_before = h.progress.streak;

        toggle_completion(&mut h, now.date(), now, &LedgerConfig::default());

        assert_eq!(h.progress.current_period.completions, 1);
        assert_eq!(h.progress.streak, streak_before + 1);
        assert_eq!(h.progress.current_period.completion_dates.len(), 2);
    }

    #[test]
    fn test_capped_completion_with_streak_following_cap() {
        let now = at(date(2025, 5, 16), 9);
        let mut h = habit(Recurrence::weekly(1), now);
        let config = LedgerConfig {
            streak_follows_target_cap: true,
        };
        toggle_completion(&mut h, date(2025, 5, 12), now, &config);

        toggle_completion(&mut h, now.date(), now, &config);

        assert_eq!(h.progress.current_period.completions, 1);
        assert_eq!(h.progress.streak, 0);
    }

    #[test]
    fn test_remove_floors_completions_and_streak() {
        let now = at(date(2025, 5, 16), 9);
        let mut h = habit(Recurrence::daily(1), now);
        h.progress.current_period.completion_dates = vec![now];
        h.progress.current_period.completion_times = vec![now];

        let outcome = toggle_completion(&mut h, now.date(), now, &LedgerConfig::default());

        assert_eq!(outcome, ToggleOutcome::Removed);
        assert_eq!(h.progress.current_period.completions, 0);
        assert_eq!(h.progress.streak, 0);
    }

    #[test]
    fn test_remove_drops_every_entry_on_that_day() {
        let now = at(date(2025, 5, 16), 20);
        let mut h = habit(Recurrence::daily(2), now);
        let morning = at(now.date(), 8);
        let period = &mut h.progress.current_period;
        period.completion_dates = vec![morning, now];
        period.completion_times = vec![morning, now];
        period.completions = 2;

        toggle_completion(&mut h, now.date(), now, &LedgerConfig::default());

        let period = &h.progress.current_period;
        assert!(period.completion_dates.is_empty());
        assert!(period.completion_times.is_empty());
        assert_eq!(period.completions, 1);
    }

    #[test]
    fn test_completion_in_history_counts_as_completed() {
        let created = at(date(2025, 5, 5), 9);
        let mut h = habit(Recurrence::weekly(2), created);
        toggle_completion(&mut h, created.date(), created, &LedgerConfig::default());

        let now = at(date(2025, 5, 14), 9);
        assert!(roll_over(&mut h, now));
        toggle_completion(&mut h, date(2025, 5, 13), now, &LedgerConfig::default());
        assert_eq!(h.progress.current_period.completions, 1);

        let outcome = toggle_completion(&mut h, created.date(), now, &LedgerConfig::default());

        assert_eq!(outcome, ToggleOutcome::Removed);
        assert_eq!(h.progress.current_period.completions, 0);
        assert_eq!(h.progress.history[0].period.completion_dates.len(), 1);
    }

    #[test]
    fn test_rollover_archives_once() {
        let created = at(date(2025, 5, 14), 9);
        let mut h = habit(Recurrence::weekly(2), created);
        let config = LedgerConfig::default();
        toggle_completion(&mut h, date(2025, 5, 14), created, &config);
        toggle_completion(&mut h, date(2025, 5, 15), created, &config);

        let next_week = created + Duration::days(7);
        assert!(roll_over(&mut h, next_week));
        assert!(!roll_over(&mut h, next_week));
        assert!(!roll_over(&mut h, next_week + Duration::days(2)));

        assert_eq!(h.progress.history.len(), 1);
        let archived = &h.progress.history[0];
        assert!(archived.completed);
        assert_eq!(archived.period.completions, 2);
        assert_eq!(archived.period.period_end.date(), date(2025, 5, 18));

        let current = &h.progress.current_period;
        assert_eq!(current.completions, 0);
        assert_eq!(current.target, 2);
        assert!(current.completion_dates.is_empty());
        assert_eq!(current.period_start.date(), date(2025, 5, 19));
    }

    #[test]
    fn test_rollover_after_skipped_periods_appends_one_entry() {
        let created = at(date(2025, 1, 10), 9);
        let mut h = habit(Recurrence::daily(1), created);

        assert!(roll_over(&mut h, created + Duration::days(30)));

        assert_eq!(h.progress.history.len(), 1);
        assert!(!h.progress.history[0].completed);
        assert_eq!(
            h.progress.current_period.period_start.date(),
            date(2025, 2, 9)
        );
    }

    #[test]
    fn test_rollover_recomputes_target_from_rule() {
        let created = at(date(2025, 5, 14), 9);
        let mut h = habit(Recurrence::weekly(2), created);
        h.recurrence = Recurrence::weekly(5);

        roll_over(&mut h, created + Duration::days(7));

        assert_eq!(h.progress.history[0].period.target, 2);
        assert_eq!(h.progress.current_period.target, 5);
    }
}
