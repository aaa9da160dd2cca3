use cadence_core::projection::{progress_percent, CalendarDay, TabCounts};
use cadence_core::timefmt::parse_timestamp;
use cadence_core::*;
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "cadence")]
#[command(about = "Habit tracker with recurrence rules and streaks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,

    /// Override data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    /// Read configuration from this file instead of the default path
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Pretend the current local time is this (e.g. 2025-05-16T09:00)
    #[arg(long, global = true, value_parser = parse_now)]
    now: Option<NaiveDateTime>,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a habit and print its id
    Add {
        name: String,

        /// Recurrence type (daily, weekly, monthly, yearly, specific-days)
        #[arg(long)]
        every: RecurrenceType,

        #[command(flatten)]
        schedule: ScheduleArgs,

        /// Part of the day (anytime, morning, afternoon, evening, night)
        #[arg(long, default_value = "anytime")]
        time_of_day: TimeOfDay,

        #[command(flatten)]
        details: DetailArgs,
    },

    /// Change a habit's name, details or recurrence
    Edit {
        /// Habit id or unique id prefix
        id: String,

        #[arg(long)]
        name: Option<String>,

        /// New recurrence type; other schedule flags refine the current rule
        #[arg(long)]
        every: Option<RecurrenceType>,

        #[command(flatten)]
        schedule: ScheduleArgs,

        #[arg(long)]
        time_of_day: Option<TimeOfDay>,

        #[command(flatten)]
        details: DetailArgs,

        /// Remove the amount target
        #[arg(long, conflicts_with = "amount")]
        clear_amount: bool,

        /// Remove the duration target
        #[arg(long, conflicts_with = "duration")]
        clear_duration: bool,
    },

    /// List habits with their recurrence and progress (default)
    List {
        /// Only active habits of this type
        #[arg(long = "type", conflicts_with = "inactive")]
        kind: Option<RecurrenceType>,

        /// Only paused habits
        #[arg(long)]
        inactive: bool,
    },

    /// Show today's habits grouped by recurrence type
    Today,

    /// Show the habits on a date and whether each was completed
    Day {
        #[arg(value_parser = parse_date)]
        date: NaiveDate,
    },

    /// Toggle a completion
    Toggle {
        /// Habit id or unique id prefix
        id: String,

        /// Date to toggle (default today)
        #[arg(long, value_parser = parse_date)]
        date: Option<NaiveDate>,
    },

    /// Stop a habit from being due
    Pause { id: String },

    /// Make a paused habit due again
    Resume { id: String },

    /// Delete a habit and its history
    Delete { id: String },

    /// Show a month calendar of due and completed habits
    Calendar {
        /// Month as YYYY-MM (default this month)
        #[arg(long, value_parser = parse_month)]
        month: Option<(i32, u32)>,
    },

    /// Write archived periods to a CSV file
    Export { path: PathBuf },
}

/// Recurrence flags shared by `add` and `edit`
#[derive(Args)]
struct ScheduleArgs {
    /// Completions per period (default 1)
    #[arg(long)]
    times: Option<u32>,

    /// Days of the week, for specific-days habits (mon,wed,fri)
    #[arg(long, value_delimiter = ',')]
    days: Vec<Weekday>,

    /// Days of the month, for monthly and yearly habits
    #[arg(long, value_delimiter = ',')]
    days_of_month: Vec<u32>,

    /// Months of the year (1-12), for yearly habits
    #[arg(long, value_delimiter = ',')]
    months: Vec<u32>,

    /// First day of the week for weekly periods
    #[arg(long)]
    week_start: Option<Weekday>,

    /// Reminder times as HH:MM
    #[arg(long = "at", value_delimiter = ',')]
    specific_times: Vec<String>,
}

impl ScheduleArgs {
    fn is_empty(&self) -> bool {
        self.times.is_none()
            && self.days.is_empty()
            && self.days_of_month.is_empty()
            && self.months.is_empty()
            && self.week_start.is_none()
            && self.specific_times.is_empty()
    }
}

#[derive(Args)]
struct DetailArgs {
    #[arg(long)]
    description: Option<String>,

    /// Category label (empty clears it on edit)
    #[arg(long)]
    category: Option<String>,

    /// Display color, e.g. #3b82f6 (empty clears it on edit)
    #[arg(long)]
    color: Option<String>,

    /// Amount per completion as N:unit (8:glasses)
    #[arg(long, value_parser = parse_amount)]
    amount: Option<Measure>,

    /// Duration per completion as N or N:unit (default unit minutes)
    #[arg(long, value_parser = parse_duration)]
    duration: Option<Measure>,

    /// Subtask name; repeat for several (replaces the list on edit)
    #[arg(long = "subtask")]
    subtasks: Vec<String>,
}

fn parse_now(raw: &str) -> std::result::Result<NaiveDateTime, String> {
    parse_timestamp(raw).ok_or_else(|| format!("invalid timestamp '{}'", raw))
}

fn parse_date(raw: &str) -> std::result::Result<NaiveDate, String> {
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|e| format!("invalid date '{}' (expected YYYY-MM-DD): {}", raw, e))
}

fn parse_month(raw: &str) -> std::result::Result<(i32, u32), String> {
    NaiveDate::parse_from_str(&format!("{}-01", raw), "%Y-%m-%d")
        .map(|d| (d.year(), d.month()))
        .map_err(|_| format!("invalid month '{}' (expected YYYY-MM)", raw))
}

fn parse_amount(raw: &str) -> std::result::Result<Measure, String> {
    let (target, unit) = raw
        .split_once(':')
        .ok_or_else(|| format!("invalid amount '{}' (expected N:unit)", raw))?;
    parse_measure(target, unit)
}

fn parse_duration(raw: &str) -> std::result::Result<Measure, String> {
    let (target, unit) = raw.split_once(':').unwrap_or((raw, "minutes"));
    parse_measure(target, unit)
}

fn parse_measure(target: &str, unit: &str) -> std::result::Result<Measure, String> {
    let target = target
        .trim()
        .parse()
        .map_err(|e| format!("invalid target '{}': {}", target, e))?;
    Ok(Measure {
        target,
        unit: unit.trim().to_string(),
    })
}

type Repo = HabitRepository<JsonFileStore, FixedClock>;

fn main() -> Result<()> {
    // Initialize logging
    cadence_core::logging::init();

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load()?,
    };
    if let Some(dir) = cli.data_dir {
        config.data.data_dir = dir;
    }

    // One instant for the whole invocation
    let now = cli.now.unwrap_or_else(|| SystemClock.now());
    tracing::debug!("Using habit file {:?} at {}", config.habits_path(), now);
    let mut repo = HabitRepository::open(
        JsonFileStore::new(config.habits_path()),
        FixedClock(now),
        config.ledger.clone(),
        config.schedule.default_week_start,
    )?;

    match cli.command {
        Some(Commands::Add {
            name,
            every,
            schedule,
            time_of_day,
            details,
        }) => {
            let recurrence =
                build_recurrence(every, schedule, None, config.schedule.default_week_start)?;
            let mut new = NewHabit::new(name, recurrence).time_of_day(time_of_day);
            new.description = details.description.unwrap_or_default();
            new.category = details.category;
            new.color = details.color;
            new.amount = details.amount;
            new.duration = details.duration;
            new.subtasks = details.subtasks.into_iter().map(Subtask::new).collect();
            cmd_add(&mut repo, new)
        }
        Some(Commands::Edit {
            id,
            name,
            every,
            schedule,
            time_of_day,
            details,
            clear_amount,
            clear_duration,
        }) => {
            let id = repo.resolve_id(&id)?;
            let current = repo
                .get(&id)
                .map(|habit| habit.recurrence.clone())
                .ok_or_else(|| Error::HabitNotFound(id.clone()))?;
            let recurrence = if every.is_some() || !schedule.is_empty() {
                let every = every.unwrap_or_else(|| current.kind());
                Some(build_recurrence(
                    every,
                    schedule,
                    Some(&current),
                    config.schedule.default_week_start,
                )?)
            } else {
                None
            };

            let edit = HabitEdit {
                name,
                description: details.description,
                category: details.category,
                color: details.color,
                recurrence,
                time_of_day,
                amount: if clear_amount { Some(None) } else { details.amount.map(Some) },
                duration: if clear_duration { Some(None) } else { details.duration.map(Some) },
                subtasks: (!details.subtasks.is_empty())
                    .then(|| details.subtasks.into_iter().map(Subtask::new).collect()),
            };
            cmd_edit(&mut repo, &id, edit)
        }
        Some(Commands::List { kind, inactive }) => {
            cmd_list(&repo, kind, inactive);
            Ok(())
        }
        Some(Commands::Today) => {
            cmd_today(&repo, now, &config);
            Ok(())
        }
        Some(Commands::Day { date }) => {
            cmd_day(&repo, date);
            Ok(())
        }
        Some(Commands::Toggle { id, date }) => cmd_toggle(&mut repo, &id, date),
        Some(Commands::Pause { id }) => cmd_set_active(&mut repo, &id, false),
        Some(Commands::Resume { id }) => cmd_set_active(&mut repo, &id, true),
        Some(Commands::Delete { id }) => {
            let removed = repo.remove(&id)?;
            println!("✓ Deleted '{}'", removed.name);
            Ok(())
        }
        Some(Commands::Calendar { month }) => {
            let (year, month) = month.unwrap_or((now.year(), now.month()));
            cmd_calendar(&repo, year, month, now.date());
            Ok(())
        }
        Some(Commands::Export { path }) => {
            let rows = export_history(repo.habits(), &path)?;
            println!("✓ Exported {} archived periods", rows);
            println!("  CSV: {}", path.display());
            Ok(())
        }
        None => {
            // Default to "list" command
            cmd_list(&repo, None, false);
            Ok(())
        }
    }
}

/// Build a recurrence from command-line flags
///
/// With `base`, fields the flags leave out are taken from it: the schedule
/// when the type is unchanged, and always the week start and times of day.
/// Flags that do not apply to the type are rejected.
fn build_recurrence(
    every: RecurrenceType,
    args: ScheduleArgs,
    base: Option<&Recurrence>,
    default_week_start: Weekday,
) -> Result<Recurrence> {
    let reject = |flag: &str| {
        Error::InvalidRecurrence(format!(
            "--{} does not apply to {} habits",
            flag,
            every.name()
        ))
    };
    if !args.days.is_empty() && every != RecurrenceType::SpecificDays {
        return Err(reject("days"));
    }
    if args.times.is_some() && every == RecurrenceType::SpecificDays {
        return Err(reject("times"));
    }
    if !args.days_of_month.is_empty()
        && !matches!(every, RecurrenceType::Monthly | RecurrenceType::Yearly)
    {
        return Err(reject("days-of-month"));
    }
    if !args.months.is_empty() && every != RecurrenceType::Yearly {
        return Err(reject("months"));
    }

    let mut schedule = match base.filter(|b| b.kind() == every) {
        Some(base) => base.schedule.clone(),
        None => empty_schedule(every),
    };
    match &mut schedule {
        Schedule::Daily { times_per_day: n }
        | Schedule::Weekly { times_per_week: n }
        | Schedule::Monthly {
            times_per_month: n, ..
        }
        | Schedule::Yearly {
            times_per_year: n, ..
        } => {
            if let Some(times) = args.times {
                *n = times;
            }
        }
        Schedule::SpecificDays { .. } => {}
    }
    let replace = |slot: &mut Option<Vec<u32>>, set: Vec<u32>| {
        if !set.is_empty() {
            *slot = Some(set);
        }
    };
    match &mut schedule {
        Schedule::Monthly { days_of_month, .. } => replace(days_of_month, args.days_of_month),
        Schedule::Yearly {
            months_of_year,
            days_of_month,
            ..
        } => {
            replace(months_of_year, args.months);
            replace(days_of_month, args.days_of_month);
        }
        Schedule::SpecificDays { days_of_week } => {
            if !args.days.is_empty() {
                *days_of_week = args.days;
            }
        }
        _ => {}
    }

    let mut recurrence = match base {
        Some(base) => Recurrence {
            schedule,
            ..base.clone()
        },
        None => Recurrence::new(schedule).with_week_start(default_week_start),
    };
    if let Some(week_start) = args.week_start {
        recurrence.week_start = week_start;
    }
    if !args.specific_times.is_empty() {
        recurrence.specific_times = args.specific_times;
    }
    Ok(recurrence)
}

fn empty_schedule(every: RecurrenceType) -> Schedule {
    match every {
        RecurrenceType::Daily => Schedule::Daily { times_per_day: 1 },
        RecurrenceType::Weekly => Schedule::Weekly { times_per_week: 1 },
        RecurrenceType::Monthly => Schedule::Monthly {
            times_per_month: 1,
            days_of_month: None,
        },
        RecurrenceType::Yearly => Schedule::Yearly {
            times_per_year: 1,
            months_of_year: None,
            days_of_month: None,
        },
        RecurrenceType::SpecificDays => Schedule::SpecificDays {
            days_of_week: Vec::new(),
        },
    }
}

fn cmd_add(repo: &mut Repo, new: NewHabit) -> Result<()> {
    let habit = repo.add(new)?;
    if habit.kind() == RecurrenceType::Yearly && !has_anchor_dates(habit) {
        eprintln!("Note: yearly habits need --months and --days-of-month to ever be due");
    }
    println!("{}", habit.id);
    Ok(())
}

fn cmd_edit(repo: &mut Repo, id: &str, edit: HabitEdit) -> Result<()> {
    if edit.is_empty() {
        println!("Nothing to change.");
        return Ok(());
    }
    let habit = repo.edit(id, edit)?;
    println!("✓ Updated '{}'", habit.name);
    println!(
        "  {}  {}",
        describe_recurrence(&habit.recurrence),
        progress_text(habit)
    );
    Ok(())
}

fn has_anchor_dates(habit: &Habit) -> bool {
    matches!(
        &habit.recurrence.schedule,
        Schedule::Yearly {
            months_of_year: Some(m),
            days_of_month: Some(d),
            ..
        } if !m.is_empty() && !d.is_empty()
    )
}

fn cmd_list(repo: &Repo, kind: Option<RecurrenceType>, inactive: bool) {
    let counts = tab_counts(repo.habits());
    println!("{}", format_tabs(&counts));
    println!();

    let habits: Vec<&Habit> = if inactive {
        repo.habits().iter().filter(|h| !h.active).collect()
    } else if let Some(kind) = kind {
        habits_by_type(repo.habits(), kind)
    } else {
        repo.habits().iter().filter(|h| h.active).collect()
    };

    if habits.is_empty() {
        println!("No habits.");
        return;
    }

    for habit in habits {
        println!(
            "{}  {:<24} {:<16} {:>3}%  {}  (streak {})",
            short_id(&habit.id),
            habit.name,
            describe_recurrence(&habit.recurrence),
            progress_percent(habit),
            progress_text(habit),
            habit.progress.streak
        );
    }
}

fn format_tabs(counts: &TabCounts) -> String {
    let mut tabs = vec![format!("All ({})", counts.all)];
    tabs.extend(
        RecurrenceType::ALL
            .iter()
            .map(|kind| format!("{} ({})", title(kind.name()), counts.of(*kind))),
    );
    tabs.push(format!("Inactive ({})", counts.inactive));
    tabs.join(" · ")
}

fn cmd_today(repo: &Repo, now: NaiveDateTime, config: &Config) {
    let view = today_view(repo.habits(), now, &config.day_parts);
    println!("{} ({})", view.date.format("%A, %B %-d"), view.current);

    if view.is_empty() {
        println!("\nNothing due today.");
        return;
    }

    for (kind, entries) in &view.groups {
        println!("\n{}", title(kind.name()));
        for entry in entries {
            println!(
                "  {} {}  {:<24} {:<10} {}",
                check(entry.completed_today),
                short_id(&entry.habit.id),
                entry.habit.name,
                entry.habit.time_of_day,
                progress_text(entry.habit)
            );
        }
    }
}

fn cmd_day(repo: &Repo, date: NaiveDate) {
    println!("{}", date.format("%A, %B %-d, %Y"));
    let habits = habits_on_date(repo.habits(), date);
    if habits.is_empty() {
        println!("No habits scheduled for this day.");
        return;
    }
    for habit in habits {
        println!(
            "  {} {}  {}",
            check(habit.was_completed_on(date)),
            short_id(&habit.id),
            habit.name
        );
    }
}

fn cmd_toggle(repo: &mut Repo, id: &str, date: Option<NaiveDate>) -> Result<()> {
    let outcome = repo.toggle(id, date)?;
    let date = date.unwrap_or_else(|| repo.engine().today());
    let id = repo.resolve_id(id)?;
    let habit = repo
        .get(&id)
        .ok_or_else(|| Error::HabitNotFound(id.clone()))?;

    match outcome {
        ToggleOutcome::Added => println!("✓ Marked '{}' done on {}", habit.name, date),
        ToggleOutcome::Removed => println!("✓ Unmarked '{}' on {}", habit.name, date),
    }
    println!("  {}  (streak {})", progress_text(habit), habit.progress.streak);
    Ok(())
}

fn cmd_set_active(repo: &mut Repo, id: &str, active: bool) -> Result<()> {
    repo.set_active(id, active)?;
    let id = repo.resolve_id(id)?;
    let name = repo.get(&id).map(|h| h.name.as_str()).unwrap_or_default();
    if active {
        println!("✓ Resumed '{}'", name);
    } else {
        println!("✓ Paused '{}'", name);
    }
    Ok(())
}

fn cmd_calendar(repo: &Repo, year: i32, month: u32, today: NaiveDate) {
    let Some(calendar) = month_calendar(repo.habits(), year, month) else {
        println!("Invalid month {}-{:02}", year, month);
        return;
    };

    let first = calendar.days.first().map(|d| d.date);
    if let Some(first) = first {
        println!("{}", first.format("%B %Y"));
    }
    println!(" Su  Mo  Tu  We  Th  Fr  Sa");

    let mut line = "    ".repeat(calendar.leading_blanks as usize);
    let mut column = calendar.leading_blanks;
    for day in &calendar.days {
        line.push_str(&format!(
            "{}{:>2}{}",
            if day.date == today { '[' } else { ' ' },
            day.date.day(),
            day_marker(day)
        ));
        column += 1;
        if column % 7 == 0 {
            println!("{}", line.trim_end());
            line.clear();
        }
    }
    if !line.is_empty() {
        println!("{}", line.trim_end());
    }

    println!();
    println!("* all done   + some done   . due   [ today");

    let busy: Vec<&CalendarDay> = calendar.days.iter().filter(|d| d.total() > 0).collect();
    let done: usize = busy.iter().map(|d| d.completed()).sum();
    let due: usize = busy.iter().map(|d| d.total()).sum();
    println!("{} of {} scheduled completions done", done, due);
}

fn day_marker(day: &CalendarDay) -> char {
    match (day.completed(), day.total()) {
        (_, 0) => ' ',
        (done, total) if done == total => '*',
        (0, _) => '.',
        _ => '+',
    }
}

fn check(done: bool) -> &'static str {
    if done {
        "[x]"
    } else {
        "[ ]"
    }
}

fn short_id(id: &str) -> &str {
    id.get(..8).unwrap_or(id)
}

fn title(name: &str) -> String {
    name.split('_')
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
