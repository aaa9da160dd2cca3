//! CSV export of archived periods.

use crate::timefmt::format_timestamp;
use crate::{ArchivedPeriod, Habit, Result};
use std::fs::File;
use std::io::Write;
use std::path::Path;

/// A row in the CSV output
#[derive(Debug, serde::Serialize)]
struct CsvRow<'a> {
    habit_id: &'a str,
    habit_name: &'a str,
    period_start: String,
    period_end: String,
    completions: u32,
    target: u32,
    completed: bool,
    notes: Option<&'a str>,
}

impl<'a> CsvRow<'a> {
    fn new(habit: &'a Habit, archived: &'a ArchivedPeriod) -> Self {
        CsvRow {
            habit_id: &habit.id,
            habit_name: &habit.name,
            period_start: format_timestamp(&archived.period.period_start),
            period_end: format_timestamp(&archived.period.period_end),
            completions: archived.period.completions,
            target: archived.period.target,
            completed: archived.completed,
            notes: archived.notes.as_deref(),
        }
    }
}

/// Write every archived period of every habit to `writer`
///
/// Rows are ordered by habit, then by period. Returns the number of rows.
pub fn write_history<W: Write>(habits: &[Habit], writer: W) -> Result<usize> {
    let mut writer = csv::WriterBuilder::new()
        .has_headers(true)
        .from_writer(writer);

    let mut rows = 0;
    for habit in habits {
        for archived in &habit.progress.history {
            writer.serialize(CsvRow::new(habit, archived))?;
            rows += 1;
        }
    }

    // Headers are only emitted with the first row
    if rows == 0 {
        writer.write_record([
            "habit_id",
            "habit_name",
            "period_start",
            "period_end",
            "completions",
            "target",
            "completed",
            "notes",
        ])?;
    }

    writer.flush()?;
    Ok(rows)
}

/// Export archived history to a CSV file, replacing it if present
pub fn export_history(habits: &[Habit], path: &Path) -> Result<usize> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    let file = File::create(path)?;
    let rows = write_history(habits, &file)?;
    file.sync_all()?;

    tracing::info!("Exported {} archived periods to {:?}", rows, path);
    Ok(rows)
}
