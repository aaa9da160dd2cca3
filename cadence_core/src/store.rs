//! Habit collection persistence with file locking.
//!
//! The whole collection is read, one record is changed, and the whole
//! collection is written back. `HabitRepository` owns that cycle.

use crate::config::LedgerConfig;
use crate::engine::Engine;
use crate::habit::HabitEdit;
use crate::ledger::ToggleOutcome;
use crate::migrate::normalize;
use crate::{Clock, Error, Habit, HabitRecord, NewHabit, Recurrence, Result, Weekday};
use chrono::NaiveDate;
use fs2::FileExt;
use std::cell::RefCell;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Where a habit collection is kept
pub trait HabitStore {
    /// Read every persisted record; an absent store is an empty collection
    fn load(&self) -> Result<Vec<HabitRecord>>;

    /// Replace the persisted collection
    fn save(&self, habits: &[Habit]) -> Result<()>;
}

// ============================================================================
// JSON file
// ============================================================================

/// A JSON array of habits in a single file
#[derive(Clone, Debug)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl HabitStore for JsonFileStore {
    /// Load with a shared lock held while reading
    fn load(&self) -> Result<Vec<HabitRecord>> {
        if !self.path.exists() {
            tracing::info!("No habit file at {:?}, starting empty", self.path);
            return Ok(Vec::new());
        }

        let file = File::open(&self.path)?;
        file.lock_shared()?;

        let mut contents = String::new();
        let read = std::io::BufReader::new(&file).read_to_string(&mut contents);
        file.unlock()?;
        read?;

        if contents.trim().is_empty() {
            tracing::warn!("Habit file {:?} is empty, starting empty", self.path);
            return Ok(Vec::new());
        }

        let records: Vec<HabitRecord> =
            serde_json::from_str(&contents).map_err(|source| Error::CorruptPersistedState {
                path: self.path.clone(),
                source,
            })?;

        tracing::debug!("Read {} habit records from {:?}", records.len(), self.path);
        Ok(records)
    }

    /// Save atomically
    ///
    /// Writes to a locked temp file in the same directory, syncs it, then
    /// renames it over the target.
    fn save(&self, habits: &[Habit]) -> Result<()> {
        let parent = self.path.parent().ok_or_else(|| {
            std::io::Error::new(std::io::ErrorKind::Other, "habit file path missing parent")
        })?;
        std::fs::create_dir_all(parent)?;

        let temp = NamedTempFile::new_in(parent)?;
        temp.as_file().lock_exclusive()?;

        {
            let mut writer = std::io::BufWriter::new(temp.as_file());
            serde_json::to_writer_pretty(&mut writer, habits)?;
            writer.flush()?;
        }

        temp.as_file().sync_all()?;
        temp.as_file().unlock()?;
        temp.persist(&self.path).map_err(|e| Error::Io(e.error))?;

        tracing::debug!("Saved {} habits to {:?}", habits.len(), self.path);
        Ok(())
    }
}

// ============================================================================
// In memory
// ============================================================================

/// Keeps the collection in memory; what `save` stores, `load` returns
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RefCell<Vec<HabitRecord>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed with records as if they had been persisted earlier
    pub fn with_records(records: Vec<HabitRecord>) -> Self {
        Self {
            records: RefCell::new(records),
        }
    }

    pub fn saved(&self) -> Vec<HabitRecord> {
        self.records.borrow().clone()
    }
}

impl HabitStore for MemoryStore {
    fn load(&self) -> Result<Vec<HabitRecord>> {
        Ok(self.records.borrow().clone())
    }

    fn save(&self, habits: &[Habit]) -> Result<()> {
        *self.records.borrow_mut() = habits.iter().cloned().map(HabitRecord::Rich).collect();
        Ok(())
    }
}

// ============================================================================
// Repository
// ============================================================================

/// The loaded habit collection together with its store and engine
///
/// Loading migrates legacy records and rolls every habit over. Each mutating
/// operation saves the full collection before returning.
pub struct HabitRepository<S, C> {
    store: S,
    engine: Engine<C>,
    week_start: Weekday,
    habits: Vec<Habit>,
}

impl<S: HabitStore, C: Clock> HabitRepository<S, C> {
    /// Load the collection from `store`
    ///
    /// `week_start` applies to legacy records, which carry none of their own.
    /// If migration or rollover changed anything the collection is written
    /// back straight away.
    pub fn open(store: S, clock: C, ledger: LedgerConfig, week_start: Weekday) -> Result<Self> {
        let mut repo = Self {
            store,
            engine: Engine::new(clock, ledger),
            week_start,
            habits: Vec::new(),
        };
        repo.load()?;
        Ok(repo)
    }

    /// Re-read the store, discarding in-memory state
    pub fn load(&mut self) -> Result<()> {
        let records = self.store.load()?;
        let (mut habits, migrated) = normalize(records, self.engine.now(), self.week_start);
        let rolled = self.engine.roll_over_all(&mut habits);
        self.habits = habits;

        tracing::info!(
            "Loaded {} habits ({} migrated, {} rolled over)",
            self.habits.len(),
            migrated,
            rolled
        );
        if migrated > 0 || rolled > 0 {
            self.save()?;
        }
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        self.store.save(&self.habits)?;
        tracing::info!("Saved {} habits", self.habits.len());
        Ok(())
    }

    pub fn habits(&self) -> &[Habit] {
        &self.habits
    }

    pub fn engine(&self) -> &Engine<C> {
        &self.engine
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn get(&self, id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == id)
    }

    /// Resolve a full id or unique id prefix to the full id
    pub fn resolve_id(&self, prefix: &str) -> Result<String> {
        if let Some(habit) = self.get(prefix) {
            return Ok(habit.id.clone());
        }

        let mut matches = self.habits.iter().filter(|habit| habit.id.starts_with(prefix));
        match (matches.next(), matches.next()) {
            (Some(habit), None) if !prefix.is_empty() => Ok(habit.id.clone()),
            (Some(_), Some(_)) => Err(Error::AmbiguousId(prefix.to_string())),
            _ => Err(Error::HabitNotFound(prefix.to_string())),
        }
    }

    /// Create a habit, append it and save
    pub fn add(&mut self, new: NewHabit) -> Result<&Habit> {
        let habit = self.engine.create(new)?;
        self.habits.push(habit);
        self.save()?;
        Ok(&self.habits[self.habits.len() - 1])
    }

    /// Remove the habit with id (or unique prefix) `id` and save
    pub fn remove(&mut self, id: &str) -> Result<Habit> {
        let id = self.resolve_id(id)?;
        let index = self
            .habits
            .iter()
            .position(|habit| habit.id == id)
            .ok_or_else(|| Error::HabitNotFound(id.clone()))?;
        let removed = self.habits.remove(index);
        self.save()?;
        tracing::info!("Deleted habit '{}' ({})", removed.name, removed.id);
        Ok(removed)
    }

    /// Apply `f` to one habit and save the collection
    ///
    /// Nothing is saved when `f` fails.
    pub fn mutate<F, T>(&mut self, id: &str, f: F) -> Result<T>
    where
        F: FnOnce(&Engine<C>, &mut Habit) -> Result<T>,
    {
        let id = self.resolve_id(id)?;
        let habit = self
            .habits
            .iter_mut()
            .find(|habit| habit.id == id)
            .ok_or_else(|| Error::HabitNotFound(id.clone()))?;
        let value = f(&self.engine, habit)?;
        self.save()?;
        Ok(value)
    }

    /// Toggle a completion on `date` (today when `None`)
    pub fn toggle(&mut self, id: &str, date: Option<NaiveDate>) -> Result<ToggleOutcome> {
        self.mutate(id, |engine, habit| {
            let date = date.unwrap_or_else(|| engine.today());
            Ok(engine.toggle_completion(habit, date))
        })
    }

    /// Pause or resume a habit
    pub fn set_active(&mut self, id: &str, active: bool) -> Result<()> {
        self.mutate(id, |_, habit| {
            habit.active = active;
            tracing::info!("Set habit {} active={}", habit.id, active);
            Ok(())
        })
    }

    pub fn change_recurrence(&mut self, id: &str, recurrence: Recurrence) -> Result<()> {
        self.mutate(id, |engine, habit| engine.change_recurrence(habit, recurrence))
    }

    /// Apply `edit` to one habit and save; an invalid edit changes nothing
    pub fn edit(&mut self, id: &str, edit: HabitEdit) -> Result<&Habit> {
        let id = self.resolve_id(id)?;
        self.mutate(&id, |engine, habit| engine.edit(habit, edit))?;
        self.get(&id).ok_or_else(|| Error::HabitNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FixedClock, LegacyFrequency, LegacyHabit, Measure, TimeOfDay};
    use chrono::{Duration, NaiveDateTime};

    fn now() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2025, 5, 16)
            .unwrap()
            .and_hms_opt(9, 0, 0)
            .unwrap()
    }

    fn open<S: HabitStore>(store: S, at: NaiveDateTime) -> HabitRepository<S, FixedClock> {
        HabitRepository::open(store, FixedClock(at), LedgerConfig::default(), Weekday::Monday)
            .unwrap()
    }

    #[test]
    fn test_save_and_load_roundtrip() {
        crate::logging::init_test();
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("habits.json");

        let mut repo = open(JsonFileStore::new(&path), now());
        let id = repo
            .add(NewHabit::new("Read", Recurrence::weekly(3)).category("mind"))
            .unwrap()
            .id
            .clone();
        repo.toggle(&id, None).unwrap();

        let reloaded = open(JsonFileStore::new(&path), now());
        assert_eq!(reloaded.habits(), repo.habits());
        assert_eq!(reloaded.habits()[0].progress.current_period.completions, 1);
    }

    #[test]
    fn test_saved_file_uses_camel_case_schema() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("habits.json");

        let mut repo = open(JsonFileStore::new(&path), now());
        repo.add(NewHabit::new("Budget", Recurrence::monthly(1, Some(vec![1]))))
            .unwrap();

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let habit = &raw[0];
        assert_eq!(habit["recurrence"]["type"], "monthly");
        assert_eq!(habit["recurrence"]["daysOfMonth"][0], 1);
        assert!(habit["progress"]["currentPeriod"]["periodStart"].is_string());
        assert!(habit["creationDate"].is_string());
    }

    #[test]
    fn test_load_nonexistent_returns_empty() {
        let temp_dir = tempfile::tempdir().unwrap();
        let store = JsonFileStore::new(temp_dir.path().join("missing.json"));

        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_corrupted_file_returns_error() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("habits.json");
        std::fs::write(&path, "{ invalid json }").unwrap();

        let result = JsonFileStore::new(&path).load();
        assert!(matches!(
            result,
            Err(Error::CorruptPersistedState { path: p, .. }) if p == path
        ));
    }

    #[test]
    fn test_atomic_save_leaves_no_temp_files() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("habits.json");

        JsonFileStore::new(&path).save(&[]).unwrap();

        assert!(path.exists());
        let extras: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| e.file_name() != "habits.json")
            .collect();
        assert!(extras.is_empty(), "found extras: {:?}", extras);
    }

    #[test]
    fn test_open_migrates_legacy_and_writes_back() {
        let legacy = LegacyHabit {
            id: "old-1".into(),
            name: "Stretch".into(),
            description: String::new(),
            frequency: LegacyFrequency::Daily,
            specific_days: vec![],
            time_of_day: TimeOfDay::Morning,
            created_at: now() - Duration::days(10),
            streak: 2,
            completed_dates: vec![now() - Duration::days(1)],
        };
        let store = MemoryStore::with_records(vec![HabitRecord::Legacy(legacy)]);

        let repo = open(store, now());

        assert_eq!(repo.habits()[0].progress.history.len(), 1);
        assert!(matches!(repo.store().saved()[0], HabitRecord::Rich(_)));
    }

    #[test]
    fn test_open_rolls_over_stale_periods() {
        let store = MemoryStore::new();
        let mut repo = open(store, now());
        repo.add(NewHabit::new("Water", Recurrence::daily(1))).unwrap();
        let store = MemoryStore::with_records(repo.store().saved());

        let later = open(store, now() + Duration::days(3));

        assert_eq!(later.habits()[0].progress.history.len(), 1);
        assert_eq!(
            later.habits()[0].progress.current_period.period_start.date(),
            (now() + Duration::days(3)).date()
        );
    }

    #[test]
    fn test_resolve_id_by_prefix() {
        let mut repo = open(MemoryStore::new(), now());
        let id = repo
            .add(NewHabit::new("Read", Recurrence::daily(1)))
            .unwrap()
            .id
            .clone();

        assert_eq!(repo.resolve_id(&id[..8]).unwrap(), id);
        assert!(matches!(repo.resolve_id("zzz"), Err(Error::HabitNotFound(_))));
        assert!(matches!(repo.resolve_id(""), Err(Error::HabitNotFound(_))));
    }

    #[test]
    fn test_resolve_id_ambiguous_prefix() {
        let mut repo = open(MemoryStore::new(), now());
        for name in ["a", "b"] {
            repo.add(NewHabit::new(name, Recurrence::daily(1))).unwrap();
        }
        let ids: Vec<String> = repo.habits().iter().map(|h| h.id.clone()).collect();
        repo.mutate(&ids[0], |_, habit| {
            habit.id = "abc-1".into();
            Ok(())
        })
        .unwrap();
        repo.mutate(&ids[1], |_, habit| {
            habit.id = "abc-2".into();
            Ok(())
        })
        .unwrap();

        assert!(matches!(repo.resolve_id("abc"), Err(Error::AmbiguousId(_))));
        assert_eq!(repo.resolve_id("abc-2").unwrap(), "abc-2");
    }

    #[test]
    fn test_pause_resume_and_remove() {
        let mut repo = open(MemoryStore::new(), now());
        let id = repo
            .add(NewHabit::new("Read", Recurrence::daily(1)))
            .unwrap()
            .id
            .clone();

        repo.set_active(&id, false).unwrap();
        assert!(!repo.get(&id).unwrap().active);
        repo.set_active(&id, true).unwrap();
        assert!(repo.get(&id).unwrap().active);

        let removed = repo.remove(&id).unwrap();
        assert_eq!(removed.name, "Read");
        assert!(repo.habits().is_empty());
        assert!(repo.store().saved().is_empty());
    }

    #[test]
    fn test_failed_mutation_is_not_saved() {
        let mut repo = open(MemoryStore::new(), now());
        let id = repo
            .add(NewHabit::new("Gym", Recurrence::weekly(2)))
            .unwrap()
            .id
            .clone();

        let result = repo.change_recurrence(&id, Recurrence::specific_days(vec![]));

        assert!(matches!(result, Err(Error::InvalidRecurrence(_))));
        let saved = repo.store().saved();
        match &saved[0] {
            HabitRecord::Rich(habit) => assert_eq!(habit.progress.current_period.target, 2),
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_edit_saves_changes() {
        let mut repo = open(MemoryStore::new(), now());
        let id = repo
            .add(NewHabit::new("Water", Recurrence::daily(1)))
            .unwrap()
            .id
            .clone();

        let edit = HabitEdit {
            name: Some("Drink water".into()),
            amount: Some(Some(Measure {
                target: 8,
                unit: "glasses".into(),
            })),
            ..HabitEdit::default()
        };
        let edited = repo.edit(&id[..6], edit).unwrap();
        assert_eq!(edited.name, "Drink water");

        match &repo.store().saved()[0] {
            HabitRecord::Rich(habit) => {
                assert_eq!(habit.name, "Drink water");
                assert_eq!(habit.amount.as_ref().map(|m| m.target), Some(8));
            }
            other => panic!("unexpected record {:?}", other),
        }
    }

    #[test]
    fn test_invalid_edit_is_not_saved() {
        let mut repo = open(MemoryStore::new(), now());
        let id = repo
            .add(NewHabit::new("Water", Recurrence::daily(1)))
            .unwrap()
            .id
            .clone();

        let edit = HabitEdit {
            name: Some("Drink water".into()),
            amount: Some(Some(Measure {
                target: 0,
                unit: String::new(),
            })),
            ..HabitEdit::default()
        };
        assert!(matches!(repo.edit(&id, edit), Err(Error::InvalidHabit(_))));

        assert_eq!(repo.get(&id).unwrap().name, "Water");
        match &repo.store().saved()[0] {
            HabitRecord::Rich(habit) => assert_eq!(habit.name, "Water"),
            other => panic!("unexpected record {:?}", other),
        }
    }
}
