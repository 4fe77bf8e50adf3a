use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::calendar::DayKey;
use crate::error::{MutationError, StoreError};
use crate::model::{Profile, State, Theme};
use crate::plan::{build_plan, Chooser, Plan, RngChooser};
use crate::scoring::{self, MonthHeatmap, Status, Streaks, WeekRecap};
use crate::store::{self, SnapshotStorage, Store};
use crate::template::{Template, TEMPLATES};

/// Owns the live [`State`] and its [`Store`]. Every accepted mutation is
/// saved before the call returns.
pub struct Tracker<S> {
    store: Store<S>,
    state: State,
    chooser: Box<dyn Chooser>,
}

pub struct TrackerBuilder<S> {
    storage: S,
    chooser: Option<Box<dyn Chooser>>,
}

impl<S: SnapshotStorage> TrackerBuilder<S> {
    pub fn new(storage: S) -> Self {
        Self {
            storage,
            chooser: None,
        }
    }

    pub fn with_chooser(mut self, chooser: Box<dyn Chooser>) -> Self {
        self.chooser = Some(chooser);
        self
    }

    pub fn with_seed(self, seed: u64) -> Self {
        self.with_chooser(Box::new(RngChooser::seeded(seed)))
    }

    pub fn build(self) -> Tracker<S> {
        let store = Store::new(self.storage);
        let state = store.load();
        info!(
            habits = state.habits.len(),
            entries = state.entries.len(),
            "tracker ready"
        );
        Tracker {
            store,
            state,
            chooser: self
                .chooser
                .unwrap_or_else(|| Box::new(RngChooser::thread())),
        }
    }
}

impl<S: SnapshotStorage> Tracker<S> {
    pub fn builder(storage: S) -> TrackerBuilder<S> {
        TrackerBuilder::new(storage)
    }

    pub fn state(&self) -> &State {
        &self.state
    }

    pub fn store(&self) -> &Store<S> {
        &self.store
    }

    /// Best effort: a failed save is logged and the in-memory state stays.
    fn persist(&self) {
        if let Err(err) = self.store.save(&self.state) {
            warn!(%err, "unable to persist snapshot");
        }
    }

    /// Runs a state mutator and saves when it was accepted.
    pub fn mutate<T>(
        &mut self,
        mutation: impl FnOnce(&mut State) -> Result<T, MutationError>,
    ) -> Result<T, MutationError> {
        let outcome = mutation(&mut self.state);
        match &outcome {
            Ok(_) => self.persist(),
            Err(err) => info!(%err, "mutation rejected"),
        }
        outcome
    }

    pub fn toggle_habit(&mut self, day: DayKey, habit_id: &str) -> Result<bool, MutationError> {
        self.mutate(|state| state.toggle_habit(day, habit_id))
    }

    pub fn set_note(&mut self, day: DayKey, note: &str) -> Result<(), MutationError> {
        self.mutate(|state| state.set_note(day, note))
    }

    pub fn submit_day(&mut self, day: DayKey) -> Result<(), MutationError> {
        self.mutate(|state| state.submit_day(day))
    }

    pub fn unlock_day(&mut self, day: DayKey) -> Result<(), MutationError> {
        self.mutate(|state| state.unlock_day(day))
    }

    pub fn reset_day(&mut self, day: DayKey) -> Result<(), MutationError> {
        self.mutate(|state| state.reset_day(day))
    }

    pub fn copy_previous_day(&mut self, day: DayKey) -> Result<(), MutationError> {
        self.mutate(|state| state.copy_previous_day(day))
    }

    pub fn add_workout_item(
        &mut self,
        day: DayKey,
        name: &str,
        prescription: &str,
    ) -> Result<String, MutationError> {
        self.mutate(|state| state.add_workout_item(day, name, prescription))
    }

    pub fn remove_workout_item(&mut self, day: DayKey, item_id: &str) -> Result<(), MutationError> {
        self.mutate(|state| state.remove_workout_item(day, item_id))
    }

    pub fn toggle_workout_item(&mut self, day: DayKey, item_id: &str) -> Result<bool, MutationError> {
        self.mutate(|state| state.toggle_workout_item(day, item_id))
    }

    pub fn clear_workout(&mut self, day: DayKey) -> Result<(), MutationError> {
        self.mutate(|state| state.clear_workout(day))
    }

    /// Builds a plan from the profile and applies it to `day`.
    pub fn generate_workout(&mut self, day: DayKey) -> Result<Plan, MutationError> {
        if self.state.is_submitted(day) {
            return Err(MutationError::Locked(day));
        }
        let plan = build_plan(&self.state.profile, self.chooser.as_mut());
        self.mutate(|state| state.apply_plan(day, &plan))?;
        Ok(plan)
    }

    pub fn add_habit(&mut self, name: &str) -> Result<String, MutationError> {
        self.mutate(|state| state.add_habit(name))
    }

    pub fn remove_habit(&mut self, habit_id: &str) -> Result<(), MutationError> {
        self.mutate(|state| state.remove_habit(habit_id))
    }

    pub fn rename_habit(&mut self, habit_id: &str, name: &str) -> Result<(), MutationError> {
        self.mutate(|state| state.rename_habit(habit_id, name))
    }

    pub fn toggle_habit_enabled(&mut self, habit_id: &str) -> Result<bool, MutationError> {
        self.mutate(|state| state.toggle_habit_enabled(habit_id))
    }

    pub fn move_habit_up(&mut self, habit_id: &str) -> Result<(), MutationError> {
        self.mutate(|state| state.move_habit_up(habit_id))
    }

    pub fn move_habit_down(&mut self, habit_id: &str) -> Result<(), MutationError> {
        self.mutate(|state| state.move_habit_down(habit_id))
    }

    pub fn apply_template(&mut self, template: &Template) {
        self.state.apply_template(template);
        self.persist();
    }

    /// Picks one of the preset templates at random and applies it.
    pub fn apply_random_template(&mut self) -> &'static Template {
        let idx = self
            .chooser
            .choose_index(TEMPLATES.len())
            .min(TEMPLATES.len() - 1);
        let template = &TEMPLATES[idx];
        self.apply_template(template);
        template
    }

    pub fn update_profile(&mut self, profile: Profile) {
        self.state.update_profile(profile);
        self.persist();
    }

    pub fn update_settings(&mut self, threshold: i64, labels: Option<&str>) {
        self.state.update_settings(threshold, labels);
        self.persist();
    }

    pub fn toggle_theme(&mut self) -> Theme {
        let theme = self.state.toggle_theme();
        self.persist();
        theme
    }

    pub fn toggle_privacy(&mut self) -> bool {
        let enabled = self.state.toggle_privacy();
        self.persist();
        enabled
    }

    pub fn shift_month(&mut self, delta: i32) -> i32 {
        let offset = self.state.shift_month(delta);
        self.persist();
        offset
    }

    pub fn undo(&mut self) -> Result<(), MutationError> {
        self.mutate(State::undo)
    }

    /// Replaces the live state. A parse failure leaves it untouched.
    pub fn import_json(&mut self, raw: &str) -> Result<(), StoreError> {
        self.state = store::import_json(raw)?;
        self.persist();
        info!(habits = self.state.habits.len(), "snapshot imported");
        Ok(())
    }

    pub fn import_file(&mut self, path: impl AsRef<Path>) -> Result<(), StoreError> {
        self.state = store::import_file(path)?;
        self.persist();
        info!(habits = self.state.habits.len(), "snapshot imported");
        Ok(())
    }

    pub fn export_json(&self) -> Result<String, StoreError> {
        store::export_json(&self.state)
    }

    pub fn export_to_dir(&self, dir: impl AsRef<Path>) -> Result<PathBuf, StoreError> {
        store::export_to_dir(&self.state, dir)
    }

    /// Wipes stored data. There is no undo for this.
    pub fn reset_all(&mut self) -> Result<(), StoreError> {
        self.state = self.store.reset()?;
        Ok(())
    }

    pub fn score(&self, day: DayKey) -> u32 {
        scoring::score(&self.state, day)
    }

    pub fn status(&self, day: DayKey) -> Status {
        scoring::status_for(self.score(day), &self.state)
    }

    pub fn habit_streak(&self, habit_id: &str, from: DayKey) -> u32 {
        scoring::habit_streak(&self.state, habit_id, from)
    }

    pub fn streaks(&self, selected: DayKey) -> Streaks {
        scoring::overall_streaks(&self.state, selected)
    }

    /// Recap of the Monday-first week containing `day`.
    pub fn week_recap(&self, day: DayKey) -> WeekRecap {
        scoring::week_recap(&self.state, &day.week())
    }

    pub fn heatmap(&self, today: DayKey) -> MonthHeatmap {
        scoring::visible_heatmap(&self.state, today)
    }
}
