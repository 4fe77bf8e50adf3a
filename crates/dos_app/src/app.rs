use std::fmt::Write as _;
use std::path::PathBuf;

use anyhow::{anyhow, bail, Context, Result};
use dos_core::store::{FileStorage, SnapshotStorage};
use dos_core::template::find_template;
use dos_core::{DayKey, Tracker};
use tracing::info;

const DEFAULT_STATE_FILE: &str = "discipline_os_state.json";

#[derive(Clone, Debug)]
pub struct AppConfig {
    pub(crate) state_path: PathBuf,
    pub(crate) export_dir: PathBuf,
    pub(crate) seed: Option<u64>,
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Ok(path) = std::env::var("DOS_STATE_PATH") {
            if !path.trim().is_empty() {
                config.state_path = PathBuf::from(path.trim());
            }
        }
        if let Ok(dir) = std::env::var("DOS_EXPORT_DIR") {
            if !dir.trim().is_empty() {
                config.export_dir = PathBuf::from(dir.trim());
            }
        }
        if let Ok(seed) = std::env::var("DOS_SEED") {
            if let Ok(value) = seed.trim().parse::<u64>() {
                config.seed = Some(value);
            }
        }
        Ok(config)
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            state_path: PathBuf::from(DEFAULT_STATE_FILE),
            export_dir: PathBuf::from("."),
            seed: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Command {
    Status(Option<DayKey>),
    Toggle(String, Option<DayKey>),
    Note(String, Option<DayKey>),
    Submit(Option<DayKey>),
    Unlock(Option<DayKey>),
    ResetDay(Option<DayKey>),
    Workout(Option<DayKey>),
    Done(String, Option<DayKey>),
    Week(Option<DayKey>),
    Month,
    Habits,
    AddHabit(String),
    Template(Option<String>),
    Undo,
    Export,
    Import(PathBuf),
    ResetAll,
}

fn day_arg(raw: Option<&String>) -> Result<Option<DayKey>> {
    raw.map(|value| {
        DayKey::parse(value).with_context(|| format!("invalid day `{value}`, expected YYYY-MM-DD"))
    })
    .transpose()
}

fn required<'a>(args: &'a [String], idx: usize, what: &str) -> Result<&'a String> {
    args.get(idx)
        .ok_or_else(|| anyhow!("missing {what}"))
}

impl Command {
    /// Parses `NAME [ARGS..]`; no arguments means `status`.
    pub fn parse(args: &[String]) -> Result<Self> {
        let Some(name) = args.first() else {
            return Ok(Command::Status(None));
        };
        let command = match name.as_str() {
            "status" => Command::Status(day_arg(args.get(1))?),
            "toggle" => Command::Toggle(
                required(args, 1, "habit id")?.clone(),
                day_arg(args.get(2))?,
            ),
            "note" => Command::Note(required(args, 1, "note text")?.clone(), day_arg(args.get(2))?),
            "submit" => Command::Submit(day_arg(args.get(1))?),
            "unlock" => Command::Unlock(day_arg(args.get(1))?),
            "reset-day" => Command::ResetDay(day_arg(args.get(1))?),
            "workout" => Command::Workout(day_arg(args.get(1))?),
            "done" => Command::Done(
                required(args, 1, "workout item id")?.clone(),
                day_arg(args.get(2))?,
            ),
            "week" => Command::Week(day_arg(args.get(1))?),
            "month" => Command::Month,
            "habits" => Command::Habits,
            "add-habit" => Command::AddHabit(args[1..].join(" ")),
            "template" => Command::Template(args.get(1).cloned()),
            "undo" => Command::Undo,
            "export" => Command::Export,
            "import" => Command::Import(PathBuf::from(required(args, 1, "import file")?)),
            "reset-all" => Command::ResetAll,
            other => bail!("unknown command `{other}`"),
        };
        Ok(command)
    }
}

/// Runs one command against the tracker and returns the text to print.
pub fn execute<S: SnapshotStorage>(
    tracker: &mut Tracker<S>,
    config: &AppConfig,
    command: Command,
    today: DayKey,
) -> Result<String> {
    let mut out = String::new();
    match command {
        Command::Status(day) => render_status(tracker, day.unwrap_or(today), &mut out)?,
        Command::Toggle(habit_id, day) => {
            let done = tracker.toggle_habit(day.unwrap_or(today), &habit_id)?;
            writeln!(out, "{habit_id}: {}", if done { "done" } else { "not done" })?;
        }
        Command::Note(text, day) => {
            tracker.set_note(day.unwrap_or(today), &text)?;
            writeln!(out, "note saved")?;
        }
        Command::Submit(day) => {
            let day = day.unwrap_or(today);
            tracker.submit_day(day)?;
            writeln!(out, "{day} submitted and locked")?;
        }
        Command::Unlock(day) => {
            let day = day.unwrap_or(today);
            tracker.unlock_day(day)?;
            writeln!(out, "{day} unlocked")?;
        }
        Command::ResetDay(day) => {
            let day = day.unwrap_or(today);
            tracker.reset_day(day)?;
            writeln!(out, "{day} reset")?;
        }
        Command::Workout(day) => {
            let day = day.unwrap_or(today);
            let plan = tracker.generate_workout(day)?;
            write!(out, "{plan}")?;
            for item in &tracker.state().read_entry(day).workouts {
                writeln!(out, "  [{}] {} ({})", item.id, item.name, item.prescription)?;
            }
        }
        Command::Done(item_id, day) => {
            let done = tracker.toggle_workout_item(day.unwrap_or(today), &item_id)?;
            writeln!(out, "{item_id}: {}", if done { "done" } else { "not done" })?;
        }
        Command::Week(day) => {
            let recap = tracker.week_recap(day.unwrap_or(today));
            writeln!(
                out,
                "avg {:.1}/{} | submitted {}/7 | on target {}/7",
                recap.average, recap.max_score, recap.submitted_days, recap.days_meeting_threshold
            )?;
            writeln!(
                out,
                "best {} ({}) | worst {} ({})",
                recap.best_day.day, recap.best_day.score, recap.worst_day.day, recap.worst_day.score
            )?;
            for tally in &recap.per_habit {
                writeln!(out, "  {:>2}/7  {}", tally.count, tally.name)?;
            }
        }
        Command::Month => {
            let heatmap = tracker.heatmap(today);
            writeln!(out, "{}-{:02}", heatmap.year, heatmap.month)?;
            let mut line = "   ".repeat(heatmap.leading_blanks as usize);
            for (idx, cell) in heatmap.cells.iter().enumerate() {
                line.push_str(&format!(" {} ", cell.level));
                if (idx as u32 + heatmap.leading_blanks + 1) % 7 == 0 {
                    writeln!(out, "{}", line.trim_end())?;
                    line.clear();
                }
            }
            if !line.is_empty() {
                writeln!(out, "{}", line.trim_end())?;
            }
        }
        Command::Habits => {
            for habit in &tracker.state().habits {
                let marker = if habit.enabled { ' ' } else { '-' };
                let streak = tracker.habit_streak(&habit.id, today);
                writeln!(out, "{marker} {:<12} {} (streak {streak})", habit.id, habit.name)?;
            }
        }
        Command::AddHabit(name) => {
            let id = tracker.add_habit(&name)?;
            writeln!(out, "added {id}")?;
        }
        Command::Template(name) => {
            let template = match name {
                Some(name) => {
                    let template = find_template(&name)
                        .ok_or_else(|| anyhow!("unknown template `{name}`"))?;
                    tracker.apply_template(template);
                    template
                }
                None => tracker.apply_random_template(),
            };
            writeln!(
                out,
                "applied {} (threshold {}, {} habits)",
                template.name,
                template.threshold,
                template.habits.len()
            )?;
        }
        Command::Undo => {
            tracker.undo()?;
            writeln!(out, "undone")?;
        }
        Command::Export => {
            let path = tracker
                .export_to_dir(&config.export_dir)
                .context("failed to export backup")?;
            writeln!(out, "exported {}", path.display())?;
        }
        Command::Import(path) => {
            tracker
                .import_file(&path)
                .with_context(|| format!("failed to import {}", path.display()))?;
            writeln!(out, "imported {}", path.display())?;
        }
        Command::ResetAll => {
            tracker.reset_all().context("failed to reset stored data")?;
            writeln!(out, "all data reset")?;
        }
    }
    Ok(out)
}

fn render_status<S: SnapshotStorage>(
    tracker: &Tracker<S>,
    day: DayKey,
    out: &mut String,
) -> Result<()> {
    let state = tracker.state();
    let entry = state.read_entry(day);
    let status = tracker.status(day);
    let streaks = tracker.streaks(day);
    writeln!(
        out,
        "{day} ({}) {}",
        day.short_weekday(),
        if entry.submitted { "[locked]" } else { "" }
    )?;
    writeln!(
        out,
        "score {}/{} | {} | streak {} (best {})",
        tracker.score(day),
        state.active_habits().len(),
        status.label,
        streaks.current,
        streaks.best
    )?;
    for habit in state.active_habits() {
        let mark = if entry.is_done(&habit.id) { 'x' } else { ' ' };
        writeln!(out, "  [{mark}] {:<12} {}", habit.id, habit.name)?;
    }
    if !entry.note.is_empty() {
        if state.privacy_mode {
            writeln!(out, "note: (hidden)")?;
        } else {
            writeln!(out, "note: {}", entry.note)?;
        }
    }
    Ok(())
}

pub fn run(config: AppConfig, args: &[String]) -> Result<()> {
    let command = Command::parse(args)?;
    info!(path = %config.state_path.display(), ?command, "running command");
    let builder = Tracker::builder(FileStorage::new(&config.state_path));
    let mut tracker = match config.seed {
        Some(seed) => builder.with_seed(seed).build(),
        None => builder.build(),
    };
    let output = execute(&mut tracker, &config, command, DayKey::today())?;
    print!("{output}");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use dos_core::store::MemoryStorage;

    fn args(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|arg| arg.to_string()).collect()
    }

    fn day(raw: &str) -> DayKey {
        DayKey::parse(raw).expect("valid day")
    }

    #[test]
    fn parses_commands_with_optional_day() {
        assert_eq!(Command::parse(&[]).unwrap(), Command::Status(None));
        assert_eq!(
            Command::parse(&args(&["toggle", "h-deep", "2025-10-20"])).unwrap(),
            Command::Toggle("h-deep".into(), Some(day("2025-10-20")))
        );
        assert_eq!(
            Command::parse(&args(&["add-habit", "Read", "15m"])).unwrap(),
            Command::AddHabit("Read 15m".into())
        );
        assert!(Command::parse(&args(&["toggle"])).is_err());
        assert!(Command::parse(&args(&["submit", "2025-13-01"])).is_err());
        assert!(Command::parse(&args(&["fly"])).is_err());
    }

    #[test]
    fn locked_day_rejects_toggle() {
        let mut tracker = Tracker::builder(MemoryStorage::new()).with_seed(3).build();
        let config = AppConfig::default();
        let today = day("2025-10-20");
        execute(&mut tracker, &config, Command::Submit(None), today).expect("submit");
        let err = execute(
            &mut tracker,
            &config,
            Command::Toggle("h-deep".into(), None),
            today,
        )
        .unwrap_err();
        assert!(err.to_string().contains("unlock it first"));
    }

    #[test]
    fn status_lists_active_habits() {
        let mut tracker = Tracker::builder(MemoryStorage::new()).build();
        let config = AppConfig::default();
        let today = day("2025-10-20");
        execute(&mut tracker, &config, Command::Toggle("h-deep".into(), None), today).unwrap();
        let out = execute(&mut tracker, &config, Command::Status(None), today).unwrap();
        assert!(out.contains("score 1/6"));
        assert!(out.contains("[x] h-deep"));
    }

    #[test]
    fn export_writes_backup_into_configured_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config = AppConfig {
            export_dir: dir.path().to_path_buf(),
            ..AppConfig::default()
        };
        let mut tracker = Tracker::builder(MemoryStorage::new()).build();
        execute(&mut tracker, &config, Command::Export, day("2025-10-20")).expect("export");
        assert!(dir.path().join("discipline_os_v7_backup.json").exists());
    }
}
