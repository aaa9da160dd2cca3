#![forbid(unsafe_code)]

//! Core domain model and business logic for Cadence, a habit tracker.
//!
//! This crate provides:
//! - Domain types (recurrence rules, periods, habits)
//! - Period calculation and due-date evaluation
//! - The completion ledger (toggles, streaks, rollover)
//! - Read-only view projections
//! - Persistence (JSON store, legacy migration, CSV export)

pub mod types;
pub mod error;
pub mod timefmt;
pub mod clock;
pub mod config;
pub mod logging;
pub mod period;
pub mod due;
pub mod ledger;
pub mod habit;
pub mod migrate;
pub mod engine;
pub mod projection;
pub mod store;
pub mod export;

// Re-export commonly used types
pub use error::{Error, Result};
pub use types::*;
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::Config;
pub use due::is_due;
pub use engine::Engine;
pub use export::export_history;
pub use habit::{validate_measure, HabitEdit, NewHabit};
pub use ledger::ToggleOutcome;
pub use projection::{
    completions_by_date, describe_recurrence, habits_by_type, habits_on_date, month_calendar,
    progress_fraction, progress_text, tab_counts, today_view, MonthCalendar, TodayView,
};
pub use store::{HabitRepository, HabitStore, JsonFileStore, MemoryStore};
