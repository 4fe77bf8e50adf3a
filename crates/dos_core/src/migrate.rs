//! Forward-only migration of persisted snapshots into the current schema.
//!
//! Input is classified once by its top-level version tag. After that every
//! field goes through its own migration function, starting from a lenient
//! partial where a value of the wrong type simply reads as absent. The result
//! is always a fully valid [`State`].

use std::collections::{BTreeMap, HashSet};

use serde::de::{Deserialize, DeserializeOwned, Deserializer};
use serde_json::{Map, Value};
use tracing::{debug, warn};

use crate::calendar::DayKey;
use crate::model::{
    default_habits, fresh_id, normalize_habit_name, DayEntry, Goal, Habit, Profile,
    ScoringConfig, State, StatusLabels, Theme, WorkoutItem, SCHEMA_VERSION,
};

/// A field that keeps its value only when it has the expected type.
#[derive(Debug)]
struct Lenient<T>(Option<T>);

impl<T> Default for Lenient<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Lenient<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = Value::deserialize(deserializer)?;
        Ok(Self(serde_json::from_value(value).ok()))
    }
}

impl<T> Lenient<T> {
    fn get(self) -> Option<T> {
        self.0
    }
}

/// Like [`Lenient`], but only a JSON object is accepted. Keeps serde from
/// reading a struct positionally out of an array.
#[derive(Debug)]
struct Section<T>(Option<T>);

impl<T> Default for Section<T> {
    fn default() -> Self {
        Self(None)
    }
}

impl<'de, T: DeserializeOwned> Deserialize<'de> for Section<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        match Value::deserialize(deserializer)? {
            value @ Value::Object(_) => Ok(Self(serde_json::from_value(value).ok())),
            _ => Ok(Self(None)),
        }
    }
}

impl<T> Section<T> {
    fn get(self) -> Option<T> {
        self.0
    }
}

/// Snapshot layouts this crate can read, keyed by their version tag.
#[derive(Debug)]
pub enum Snapshot {
    /// Written under the `version` tag (schema 7 and earlier), or untagged.
    Legacy(LegacySnapshot),
    /// Written under the `schemaVersion` tag, including future versions.
    Current(CurrentSnapshot),
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct LegacySnapshot {
    version: Lenient<u64>,
    theme: Lenient<Theme>,
    privacy_mode: Lenient<bool>,
    month_offset: Lenient<i64>,
    status_labels: Section<PartialStatusLabels>,
    scoring: Section<PartialScoring>,
    profile: Section<LegacyProfile>,
    habits: Lenient<Vec<Section<PartialHabit>>>,
    entries: Lenient<BTreeMap<String, Section<PartialDayEntry>>>,
    undo: Lenient<Map<String, Value>>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct CurrentSnapshot {
    schema_version: Lenient<u64>,
    theme: Lenient<Theme>,
    privacy_mode: Lenient<bool>,
    month_offset: Lenient<i64>,
    status_labels: Section<PartialStatusLabels>,
    scoring_config: Section<PartialScoring>,
    profile: Section<PartialProfile>,
    habits: Lenient<Vec<Section<PartialHabit>>>,
    entries: Lenient<BTreeMap<String, Section<PartialDayEntry>>>,
    undo_snapshot: Lenient<Map<String, Value>>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct PartialStatusLabels {
    good: Lenient<String>,
    mid: Lenient<String>,
    bad: Lenient<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct PartialScoring {
    threshold: Lenient<f64>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct LegacyProfile {
    goal: Lenient<Goal>,
    current_weight: Lenient<f64>,
    goal_weight: Lenient<f64>,
    duration: Lenient<f64>,
    auto_workout_habit: Lenient<bool>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PartialProfile {
    goal: Lenient<Goal>,
    current_weight: Lenient<f64>,
    goal_weight: Lenient<f64>,
    duration_minutes: Lenient<f64>,
    auto_workout_habit: Lenient<bool>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct PartialHabit {
    id: Lenient<Value>,
    name: Lenient<String>,
    enabled: Lenient<bool>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, rename_all = "camelCase")]
struct PartialDayEntry {
    submitted: Lenient<bool>,
    note: Lenient<String>,
    habits: Lenient<Map<String, Value>>,
    workouts: Lenient<Vec<Section<PartialWorkoutItem>>>,
    workout_title: Lenient<String>,
    workout_meta: Lenient<String>,
}

#[derive(Debug, Default, serde::Deserialize)]
#[serde(default)]
struct PartialWorkoutItem {
    id: Lenient<Value>,
    name: Lenient<String>,
    prescription: Lenient<String>,
    done: Lenient<bool>,
}

impl From<LegacyProfile> for PartialProfile {
    fn from(legacy: LegacyProfile) -> Self {
        Self {
            goal: legacy.goal,
            current_weight: legacy.current_weight,
            goal_weight: legacy.goal_weight,
            duration_minutes: legacy.duration,
            auto_workout_habit: legacy.auto_workout_habit,
        }
    }
}

impl From<LegacySnapshot> for CurrentSnapshot {
    fn from(legacy: LegacySnapshot) -> Self {
        Self {
            schema_version: legacy.version,
            theme: legacy.theme,
            privacy_mode: legacy.privacy_mode,
            month_offset: legacy.month_offset,
            status_labels: legacy.status_labels,
            scoring_config: legacy.scoring,
            profile: Section(legacy.profile.get().map(PartialProfile::from)),
            habits: legacy.habits,
            entries: legacy.entries,
            undo_snapshot: legacy.undo,
        }
    }
}

impl Snapshot {
    /// Anything that is not a JSON object is read as an empty legacy snapshot.
    pub fn classify(raw: Value) -> Self {
        match raw {
            Value::Object(map) if map.contains_key("schemaVersion") => {
                Snapshot::Current(serde_json::from_value(Value::Object(map)).unwrap_or_default())
            }
            Value::Object(map) => {
                Snapshot::Legacy(serde_json::from_value(Value::Object(map)).unwrap_or_default())
            }
            _ => Snapshot::Legacy(LegacySnapshot::default()),
        }
    }

    fn into_current(self) -> CurrentSnapshot {
        match self {
            Snapshot::Legacy(legacy) => legacy.into(),
            Snapshot::Current(current) => current,
        }
    }
}

/// Total migration: any JSON value becomes a valid current-schema [`State`].
pub fn migrate(raw: Value) -> State {
    migrate_snapshot(Snapshot::classify(raw), true)
}

fn migrate_snapshot(snapshot: Snapshot, keep_undo: bool) -> State {
    let snapshot = snapshot.into_current();
    let from_version = snapshot.schema_version.0;
    debug!(?from_version, to = SCHEMA_VERSION, "migrating snapshot");

    let undo_snapshot = if keep_undo {
        snapshot
            .undo_snapshot
            .get()
            .map(|map| Box::new(migrate_snapshot(Snapshot::classify(Value::Object(map)), false)))
    } else {
        None
    };

    State {
        schema_version: SCHEMA_VERSION,
        theme: snapshot.theme.get().unwrap_or_default(),
        privacy_mode: snapshot.privacy_mode.get().unwrap_or(false),
        month_offset: migrate_month_offset(snapshot.month_offset.get()),
        status_labels: migrate_status_labels(snapshot.status_labels.get()),
        scoring_config: migrate_scoring(snapshot.scoring_config.get()),
        profile: migrate_profile(snapshot.profile.get()),
        habits: migrate_habits(snapshot.habits.get()),
        entries: migrate_entries(snapshot.entries.get()),
        undo_snapshot,
    }
}

fn migrate_month_offset(raw: Option<i64>) -> i32 {
    raw.map(|offset| offset.clamp(i64::from(i32::MIN), i64::from(i32::MAX)) as i32)
        .unwrap_or(0)
}

fn migrate_status_labels(raw: Option<PartialStatusLabels>) -> StatusLabels {
    let defaults = StatusLabels::default();
    let Some(partial) = raw else {
        return defaults;
    };
    StatusLabels {
        good: partial.good.get().unwrap_or(defaults.good),
        mid: partial.mid.get().unwrap_or(defaults.mid),
        bad: partial.bad.get().unwrap_or(defaults.bad),
    }
}

fn migrate_scoring(raw: Option<PartialScoring>) -> ScoringConfig {
    raw.and_then(|partial| partial.threshold.get())
        .filter(|threshold| threshold.is_finite())
        .map(|threshold| ScoringConfig::clamped(threshold.round() as i64))
        .unwrap_or_default()
}

fn migrate_profile(raw: Option<PartialProfile>) -> Profile {
    let defaults = Profile::default();
    let Some(partial) = raw else {
        return defaults;
    };
    let weight = |value: Lenient<f64>, fallback: f64| {
        value.get().filter(|w| w.is_finite()).unwrap_or(fallback)
    };
    Profile {
        goal: partial.goal.get().unwrap_or(defaults.goal),
        current_weight: weight(partial.current_weight, defaults.current_weight),
        goal_weight: weight(partial.goal_weight, defaults.goal_weight),
        duration_minutes: partial
            .duration_minutes
            .get()
            .filter(|minutes| minutes.is_finite() && *minutes >= 1.0)
            .map(|minutes| minutes.round() as u32)
            .unwrap_or(defaults.duration_minutes),
        auto_workout_habit: partial
            .auto_workout_habit
            .get()
            .unwrap_or(defaults.auto_workout_habit),
    }
}

fn migrate_habits(raw: Option<Vec<Section<PartialHabit>>>) -> Vec<Habit> {
    let Some(items) = raw.filter(|items| !items.is_empty()) else {
        return default_habits();
    };
    let mut seen = HashSet::new();
    items
        .into_iter()
        .map(|item| {
            let partial = item.get().unwrap_or_default();
            let id = unique_id(id_from_value(partial.id.get()), &mut seen);
            Habit {
                id,
                name: normalize_habit_name(&partial.name.get().unwrap_or_default()),
                enabled: partial.enabled.get().unwrap_or(true),
            }
        })
        .collect()
}

fn migrate_entries(
    raw: Option<BTreeMap<String, Section<PartialDayEntry>>>,
) -> BTreeMap<DayKey, DayEntry> {
    let mut entries = BTreeMap::new();
    for (raw_key, entry) in raw.unwrap_or_default() {
        match DayKey::parse(&raw_key) {
            Ok(key) => {
                entries.insert(key, migrate_entry(entry.get().unwrap_or_default()));
            }
            Err(err) => warn!(%err, "dropping entry with malformed day key"),
        }
    }
    entries
}

/// Shape repair only. Flags for habits the entry has never seen are filled in
/// later, on first access.
fn migrate_entry(partial: PartialDayEntry) -> DayEntry {
    let habits = partial
        .habits
        .get()
        .unwrap_or_default()
        .into_iter()
        .filter_map(|(id, flag)| flag.as_bool().map(|flag| (id, flag)))
        .collect();
    let mut seen = HashSet::new();
    let workouts = partial
        .workouts
        .get()
        .unwrap_or_default()
        .into_iter()
        .filter_map(Section::get)
        .map(|item| WorkoutItem {
            id: unique_id(id_from_value(item.id.get()), &mut seen),
            name: item.name.get().unwrap_or_default(),
            prescription: item.prescription.get().unwrap_or_default(),
            done: item.done.get().unwrap_or(false),
        })
        .collect();
    DayEntry {
        submitted: partial.submitted.get().unwrap_or(false),
        note: partial.note.get().unwrap_or_default(),
        habits,
        workouts,
        workout_title: partial.workout_title.get().filter(|title| !title.is_empty()),
        workout_meta: partial.workout_meta.get().filter(|meta| !meta.is_empty()),
    }
}

fn id_from_value(raw: Option<Value>) -> Option<String> {
    match raw? {
        Value::String(id) if !id.is_empty() => Some(id),
        Value::Number(id) => Some(id.to_string()),
        _ => None,
    }
}

fn unique_id(candidate: Option<String>, seen: &mut HashSet<String>) -> String {
    if let Some(id) = candidate {
        if seen.insert(id.clone()) {
            return id;
        }
        warn!(%id, "duplicate id replaced during migration");
    }
    let id = fresh_id();
    seen.insert(id.clone());
    id
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn remigrate(state: &State) -> State {
        migrate(serde_json::to_value(state).expect("state serializes"))
    }

    fn day(raw: &str) -> DayKey {
        DayKey::parse(raw).unwrap()
    }

    #[test]
    fn empty_object_yields_defaults() {
        let state = migrate(json!({}));
        assert_eq!(state, State::default());
    }

    #[test]
    fn non_objects_yield_defaults() {
        for raw in [json!(null), json!(42), json!("state"), json!([1, 2, 3])] {
            assert_eq!(migrate(raw), State::default());
        }
    }

    #[test]
    fn legacy_layout_is_carried_forward() {
        let raw = json!({
            "version": 7,
            "theme": "light",
            "privacyMode": true,
            "monthOffset": -2,
            "statusLabels": { "good": "great", "extra": "dropped" },
            "scoring": { "threshold": 4 },
            "profile": { "goal": "muscle", "currentWeight": 150, "duration": 15 },
            "habits": [
                { "id": "h-workout", "name": " Workout ", "enabled": false },
                { "name": "Read" }
            ],
            "entries": {
                "2025-10-20": { "submitted": true, "note": "ok", "habits": { "h-workout": true } }
            },
            "undo": null
        });
        let state = migrate(raw);
        assert_eq!(state.schema_version, SCHEMA_VERSION);
        assert_eq!(state.theme, Theme::Light);
        assert!(state.privacy_mode);
        assert_eq!(state.month_offset, -2);
        assert_eq!(state.status_labels.good, "great");
        assert_eq!(state.status_labels.mid, StatusLabels::default().mid);
        assert_eq!(state.scoring_config.threshold, 4);
        assert_eq!(state.profile.goal, Goal::Muscle);
        assert_eq!(state.profile.current_weight, 150.0);
        assert_eq!(state.profile.goal_weight, Profile::default().goal_weight);
        assert_eq!(state.profile.duration_minutes, 15);
        assert_eq!(state.habits[0].name, "Workout");
        assert!(!state.habits[0].enabled);
        assert!(!state.habits[1].id.is_empty());
        assert!(state.habits[1].enabled);
        let entry = &state.entries[&day("2025-10-20")];
        assert!(entry.submitted);
        assert!(entry.is_done("h-workout"));
        assert!(state.undo_snapshot.is_none());
    }

    #[test]
    fn malformed_nested_fields_fall_back_to_defaults() {
        let raw = json!({
            "schemaVersion": 99,
            "theme": 3,
            "statusLabels": "nope",
            "scoringConfig": { "threshold": "six" },
            "profile": [1, 2],
            "habits": [],
            "entries": "nope",
            "undoSnapshot": 17
        });
        let state = migrate(raw);
        assert_eq!(state, State::default());
    }

    #[test]
    fn threshold_and_duration_are_clamped() {
        let state = migrate(json!({
            "schemaVersion": 8,
            "scoringConfig": { "threshold": 0 },
            "profile": { "durationMinutes": -5 }
        }));
        assert_eq!(state.scoring_config.threshold, 1);
        assert_eq!(state.profile.duration_minutes, 25);
        let state = migrate(json!({ "schemaVersion": 8, "scoringConfig": { "threshold": 500 } }));
        assert_eq!(state.scoring_config.threshold, 50);
    }

    #[test]
    fn habit_elements_are_normalized() {
        let state = migrate(json!({
            "habits": [
                "not a habit",
                { "id": "a", "name": "   ", "enabled": "yes" },
                { "id": "a", "name": "Dup" },
                { "id": 7, "name": "Numeric" }
            ]
        }));
        assert_eq!(state.habits.len(), 4);
        assert_eq!(state.habits[0].name, "Habit");
        assert_eq!(state.habits[1].id, "a");
        assert_eq!(state.habits[1].name, "Habit");
        assert!(state.habits[1].enabled);
        assert_ne!(state.habits[2].id, "a");
        assert_eq!(state.habits[3].id, "7");
    }

    #[test]
    fn entries_are_shape_repaired() {
        let state = migrate(json!({
            "entries": {
                "2025-1-1": { "note": "bad key" },
                "2025-01-02": {
                    "submitted": "yes",
                    "note": 5,
                    "habits": { "a": true, "b": "true", "c": 1 },
                    "workouts": [{ "name": "Push-ups", "done": true }, 4],
                    "workoutTitle": ""
                },
                "2025-01-03": 12
            }
        }));
        assert_eq!(state.entries.len(), 2);
        let entry = &state.entries[&day("2025-01-02")];
        assert!(!entry.submitted);
        assert_eq!(entry.note, "");
        assert_eq!(entry.habits.len(), 1);
        assert!(entry.is_done("a"));
        assert_eq!(entry.workouts.len(), 1);
        assert!(!entry.workouts[0].id.is_empty());
        assert!(entry.workouts[0].done);
        assert!(entry.workout_title.is_none());
        assert_eq!(state.entries[&day("2025-01-03")], DayEntry::default());
    }

    #[test]
    fn undo_snapshot_is_migrated_one_level_deep() {
        let state = migrate(json!({
            "schemaVersion": 8,
            "undoSnapshot": {
                "schemaVersion": 8,
                "scoringConfig": { "threshold": 3 },
                "undoSnapshot": { "schemaVersion": 8 }
            }
        }));
        let undo = state.undo_snapshot.expect("undo kept");
        assert_eq!(undo.scoring_config.threshold, 3);
        assert!(undo.undo_snapshot.is_none());
    }

    #[test]
    fn migration_is_idempotent() {
        let inputs = [
            json!({}),
            json!({ "habits": [{ "name": "No id" }, { "id": "x" }, { "id": "x" }] }),
            json!({
                "version": 7,
                "profile": { "goal": "yoga", "duration": 12.4, "currentWeight": 201.5 },
                "entries": { "2025-02-01": { "workouts": [{ "name": "Plank" }], "habits": { "h": false } } },
                "undo": { "version": 7, "habits": [{ "name": "Older" }] }
            }),
        ];
        for raw in inputs {
            let once = migrate(raw);
            assert_eq!(remigrate(&once), once);
        }
    }
}
