//! Error types for the cadence_core library.

use std::io;
use std::path::PathBuf;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for cadence_core operations
///
/// The period calculator, due-date evaluator and completion ledger never
/// produce errors. Everything here is raised at a boundary: creating or
/// editing a habit, loading or saving the collection, reading config.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Recurrence rule is missing fields its type requires, or has values
    /// out of range
    #[error("Invalid recurrence: {0}")]
    InvalidRecurrence(String),

    /// Habit fields other than the recurrence are unusable (e.g. empty name)
    #[error("Invalid habit: {0}")]
    InvalidHabit(String),

    /// The persisted habit collection exists but could not be parsed
    #[error("Corrupt habit store at {path:?}: {source}")]
    CorruptPersistedState {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    /// No habit matches the given id or id prefix
    #[error("No habit found for id '{0}'")]
    HabitNotFound(String),

    /// More than one habit matches the given id prefix
    #[error("Id prefix '{0}' matches more than one habit")]
    AmbiguousId(String),
}
