use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::calendar::DayKey;

/// Schema version written by this crate. Older snapshots are migrated forward.
pub const SCHEMA_VERSION: u32 = 8;

pub const DEFAULT_HABIT_NAME: &str = "Habit";
pub const MIN_THRESHOLD: u32 = 1;
pub const MAX_THRESHOLD: u32 = 50;

/// Root aggregate persisted as a single snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct State {
    pub schema_version: u32,
    pub theme: Theme,
    pub privacy_mode: bool,
    pub month_offset: i32,
    pub status_labels: StatusLabels,
    pub scoring_config: ScoringConfig,
    pub profile: Profile,
    pub habits: Vec<Habit>,
    pub entries: BTreeMap<DayKey, DayEntry>,
    pub undo_snapshot: Option<Box<State>>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Theme {
    #[default]
    Dark,
    Light,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StatusLabels {
    pub good: String,
    pub mid: String,
    pub bad: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct ScoringConfig {
    pub threshold: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Goal {
    #[default]
    FatLoss,
    Endurance,
    Muscle,
    /// Any goal this version does not know about.
    #[serde(other)]
    General,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub goal: Goal,
    pub current_weight: f64,
    pub goal_weight: f64,
    pub duration_minutes: u32,
    pub auto_workout_habit: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Habit {
    pub id: String,
    pub name: String,
    pub enabled: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "camelCase")]
pub struct DayEntry {
    pub submitted: bool,
    pub note: String,
    pub habits: BTreeMap<String, bool>,
    pub workouts: Vec<WorkoutItem>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub workout_meta: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WorkoutItem {
    pub id: String,
    pub name: String,
    pub prescription: String,
    pub done: bool,
}

impl Default for State {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            theme: Theme::default(),
            privacy_mode: false,
            month_offset: 0,
            status_labels: StatusLabels::default(),
            scoring_config: ScoringConfig::default(),
            profile: Profile::default(),
            habits: default_habits(),
            entries: BTreeMap::new(),
            undo_snapshot: None,
        }
    }
}

impl Default for StatusLabels {
    fn default() -> Self {
        Self {
            good: "🔥 LOCKED IN".to_string(),
            mid: "😐 SLIPPING".to_string(),
            bad: "🚨 BROKE DISCIPLINE".to_string(),
        }
    }
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self { threshold: 6 }
    }
}

impl ScoringConfig {
    pub fn clamped(threshold: i64) -> Self {
        let threshold = threshold.clamp(i64::from(MIN_THRESHOLD), i64::from(MAX_THRESHOLD));
        Self {
            threshold: threshold as u32,
        }
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self {
            goal: Goal::FatLoss,
            current_weight: 180.0,
            goal_weight: 165.0,
            duration_minutes: 25,
            auto_workout_habit: true,
        }
    }
}

impl Goal {
    pub fn as_str(self) -> &'static str {
        match self {
            Goal::FatLoss => "fat_loss",
            Goal::Endurance => "endurance",
            Goal::Muscle => "muscle",
            Goal::General => "general",
        }
    }

    pub fn label(self) -> String {
        self.as_str().replace('_', " ")
    }
}

impl fmt::Display for Goal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Habit {
    pub fn new(name: &str) -> Self {
        Self {
            id: fresh_id(),
            name: normalize_habit_name(name),
            enabled: true,
        }
    }

    fn preset(id: &str, name: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            enabled: true,
        }
    }

    /// Name match used by the auto-workout rule.
    pub fn is_workout(&self) -> bool {
        self.name.trim().eq_ignore_ascii_case("workout")
    }
}

impl WorkoutItem {
    pub fn new(name: impl Into<String>, prescription: impl Into<String>) -> Self {
        Self {
            id: fresh_id(),
            name: name.into(),
            prescription: prescription.into(),
            done: false,
        }
    }
}

impl DayEntry {
    /// Stored flag for a habit; anything absent reads as not done.
    pub fn is_done(&self, habit_id: &str) -> bool {
        self.habits.get(habit_id).copied().unwrap_or(false)
    }

    pub fn all_workouts_done(&self) -> bool {
        self.workouts.iter().all(|item| item.done)
    }
}

pub fn default_habits() -> Vec<Habit> {
    vec![
        Habit::preset("h-workout", "Workout"),
        Habit::preset("h-grind", "Grind / Money"),
        Habit::preset("h-deep", "Deep Work"),
        Habit::preset("h-sleep", "Sleep ≥ 7h"),
        Habit::preset("h-noporn", "No Porn"),
        Habit::preset("h-nomast", "No Masturbation"),
    ]
}

/// Trimmed name, or the placeholder when nothing is left.
pub fn normalize_habit_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        DEFAULT_HABIT_NAME.to_string()
    } else {
        trimmed.to_string()
    }
}

pub fn fresh_id() -> String {
    uuid::Uuid::new_v4().simple().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_state_has_current_schema_and_six_habits() {
        let state = State::default();
        assert_eq!(state.schema_version, SCHEMA_VERSION);
        assert_eq!(state.habits.len(), 6);
        assert_eq!(state.scoring_config.threshold, 6);
        assert!(state.entries.is_empty());
        assert!(state.undo_snapshot.is_none());
    }

    #[test]
    fn serializes_with_camel_case_keys() {
        let value = serde_json::to_value(State::default()).unwrap();
        for key in [
            "schemaVersion",
            "privacyMode",
            "monthOffset",
            "statusLabels",
            "scoringConfig",
            "undoSnapshot",
        ] {
            assert!(value.get(key).is_some(), "missing {key}");
        }
        assert_eq!(value["profile"]["goal"], "fat_loss");
        assert_eq!(value["profile"]["durationMinutes"], 25);
    }

    #[test]
    fn unknown_goal_reads_as_general() {
        let goal: Goal = serde_json::from_str("\"yoga\"").unwrap();
        assert_eq!(goal, Goal::General);
        assert_eq!(Goal::FatLoss.label(), "fat loss");
    }

    #[test]
    fn habit_names_are_trimmed_with_placeholder() {
        assert_eq!(normalize_habit_name("  Read  "), "Read");
        assert_eq!(normalize_habit_name("   "), DEFAULT_HABIT_NAME);
        assert!(Habit::new(" WORKOUT ").is_workout());
        assert!(!Habit::new("Workouts").is_workout());
    }

    #[test]
    fn missing_flags_read_as_not_done() {
        let mut entry = DayEntry::default();
        entry.habits.insert("a".into(), true);
        assert!(entry.is_done("a"));
        assert!(!entry.is_done("b"));
        assert!(entry.all_workouts_done());
    }
}
