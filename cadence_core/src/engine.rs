//! Habit engine: the clock-aware entry point over the evaluator and ledger.
//!
//! Every operation that depends on the current period rolls it over first,
//! so archival happens in one place and exactly once per period change:
//! - `is_due`: rollover, then the due-date rules
//! - `toggle_completion`: rollover, then the ledger toggle
//! - `change_recurrence` and `edit`: rollover, then the change

use crate::config::LedgerConfig;
use crate::ledger::{self, ToggleOutcome};
use crate::habit::HabitEdit;
use crate::{Clock, Habit, NewHabit, Recurrence, Result};
use chrono::{NaiveDate, NaiveDateTime};

/// Clock plus ledger settings
#[derive(Clone, Debug)]
pub struct Engine<C> {
    clock: C,
    config: LedgerConfig,
}

impl<C: Clock> Engine<C> {
    pub fn new(clock: C, config: LedgerConfig) -> Self {
        Self { clock, config }
    }

    pub fn now(&self) -> NaiveDateTime {
        self.clock.now()
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    pub fn config(&self) -> &LedgerConfig {
        &self.config
    }

    /// Create a habit whose first period contains now
    pub fn create(&self, new: NewHabit) -> Result<Habit> {
        Habit::new(new, self.now())
    }

    /// Archive the current period if now is past its end
    pub fn roll_over(&self, habit: &mut Habit) -> bool {
        ledger::roll_over(habit, self.now())
    }

    /// Roll every habit over; returns how many were archived
    pub fn roll_over_all(&self, habits: &mut [Habit]) -> usize {
        let now = self.now();
        habits
            .iter_mut()
            .map(|habit| ledger::roll_over(habit, now))
            .filter(|rolled| *rolled)
            .count()
    }

    /// Whether `habit` is due on `date`, after bringing its period up to date
    pub fn is_due(&self, habit: &mut Habit, date: NaiveDate) -> bool {
        self.roll_over(habit);
        crate::due::is_due(habit, date)
    }

    /// Toggle the completion on `date`, after bringing the period up to date
    pub fn toggle_completion(&self, habit: &mut Habit, date: NaiveDate) -> ToggleOutcome {
        let now = self.now();
        ledger::roll_over(habit, now);
        ledger::toggle_completion(habit, date, now, &self.config)
    }

    /// Replace the recurrence rule of `habit`
    pub fn change_recurrence(&self, habit: &mut Habit, recurrence: Recurrence) -> Result<()> {
        let now = self.now();
        ledger::roll_over(habit, now);
        habit.set_recurrence(recurrence, now)
    }

    /// Apply `edit` to `habit` after closing any elapsed period
    pub fn edit(&self, habit: &mut Habit, edit: HabitEdit) -> Result<()> {
        let now = self.now();
        ledger::roll_over(habit, now);
        habit.apply_edit(edit, now)
    }
}
