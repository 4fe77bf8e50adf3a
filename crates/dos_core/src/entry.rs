//! Day-entry access and the mutators that edit a single day.

use std::borrow::Cow;

use tracing::debug;

use crate::calendar::DayKey;
use crate::error::MutationError;
use crate::model::{DayEntry, Habit, State, WorkoutItem};
use crate::plan::Plan;

fn fill_missing_flags(entry: &mut DayEntry, habits: &[Habit]) {
    for habit in habits {
        entry.habits.entry(habit.id.clone()).or_insert(false);
    }
}

impl State {
    /// Enabled habits, in list order.
    pub fn active_habits(&self) -> Vec<&Habit> {
        self.habits.iter().filter(|habit| habit.enabled).collect()
    }

    pub fn habit(&self, habit_id: &str) -> Option<&Habit> {
        self.habits.iter().find(|habit| habit.id == habit_id)
    }

    /// Stored entry as-is, without repair. `None` when the day was never touched.
    pub fn stored_entry(&self, day: DayKey) -> Option<&DayEntry> {
        self.entries.get(&day)
    }

    /// Write path: creates the entry if needed and gives it a flag for every
    /// known habit.
    pub fn ensure_entry(&mut self, day: DayKey) -> &mut DayEntry {
        let entry = self.entries.entry(day).or_default();
        fill_missing_flags(entry, &self.habits);
        entry
    }

    /// Read path: the same repaired view as [`State::ensure_entry`], but
    /// nothing is inserted.
    pub fn read_entry(&self, day: DayKey) -> Cow<'_, DayEntry> {
        match self.entries.get(&day) {
            Some(entry)
                if self
                    .habits
                    .iter()
                    .all(|habit| entry.habits.contains_key(&habit.id)) =>
            {
                Cow::Borrowed(entry)
            }
            Some(entry) => {
                let mut repaired = entry.clone();
                fill_missing_flags(&mut repaired, &self.habits);
                Cow::Owned(repaired)
            }
            None => {
                let mut blank = DayEntry::default();
                fill_missing_flags(&mut blank, &self.habits);
                Cow::Owned(blank)
            }
        }
    }

    pub fn is_submitted(&self, day: DayKey) -> bool {
        self.entries.get(&day).is_some_and(|entry| entry.submitted)
    }

    fn ensure_unlocked(&self, day: DayKey) -> Result<(), MutationError> {
        if self.is_submitted(day) {
            return Err(MutationError::Locked(day));
        }
        Ok(())
    }

    fn has_workout_item(&self, day: DayKey, item_id: &str) -> bool {
        self.entries
            .get(&day)
            .is_some_and(|entry| entry.workouts.iter().any(|item| item.id == item_id))
    }

    /// Flips one habit for the day and returns its new value.
    pub fn toggle_habit(&mut self, day: DayKey, habit_id: &str) -> Result<bool, MutationError> {
        self.ensure_unlocked(day)?;
        if self.habit(habit_id).is_none() {
            return Err(MutationError::UnknownHabit(habit_id.to_string()));
        }
        self.checkpoint();
        let entry = self.ensure_entry(day);
        let flag = entry.habits.entry(habit_id.to_string()).or_insert(false);
        *flag = !*flag;
        let value = *flag;
        debug!(day = %day, habit = %habit_id, value, "habit toggled");
        Ok(value)
    }

    pub fn set_note(&mut self, day: DayKey, note: &str) -> Result<(), MutationError> {
        self.ensure_unlocked(day)?;
        self.checkpoint();
        self.ensure_entry(day).note = note.to_string();
        Ok(())
    }

    /// Locks the day against further edits.
    pub fn submit_day(&mut self, day: DayKey) -> Result<(), MutationError> {
        if self.is_submitted(day) {
            return Err(MutationError::AlreadySubmitted(day));
        }
        self.checkpoint();
        self.ensure_entry(day).submitted = true;
        debug!(day = %day, "day submitted");
        Ok(())
    }

    /// The one edit a submitted day accepts.
    pub fn unlock_day(&mut self, day: DayKey) -> Result<(), MutationError> {
        if !self.is_submitted(day) {
            return Err(MutationError::NotSubmitted(day));
        }
        self.checkpoint();
        self.ensure_entry(day).submitted = false;
        debug!(day = %day, "day unlocked");
        Ok(())
    }

    /// Clears flags, note and workout for the day.
    pub fn reset_day(&mut self, day: DayKey) -> Result<(), MutationError> {
        self.ensure_unlocked(day)?;
        self.checkpoint();
        let entry = self.ensure_entry(day);
        entry.habits.values_mut().for_each(|flag| *flag = false);
        entry.note.clear();
        entry.workouts.clear();
        entry.workout_title = None;
        entry.workout_meta = None;
        debug!(day = %day, "day reset");
        Ok(())
    }

    /// Overwrites the day's habit flags with the previous day's.
    pub fn copy_previous_day(&mut self, day: DayKey) -> Result<(), MutationError> {
        self.ensure_unlocked(day)?;
        let previous = self.read_entry(day.prev()).into_owned();
        self.checkpoint();
        let entry = self.ensure_entry(day);
        for (habit_id, flag) in entry.habits.iter_mut() {
            *flag = previous.is_done(habit_id);
        }
        Ok(())
    }

    /// Appends a manual workout item and returns its id.
    pub fn add_workout_item(
        &mut self,
        day: DayKey,
        name: &str,
        prescription: &str,
    ) -> Result<String, MutationError> {
        self.ensure_unlocked(day)?;
        let name = name.trim();
        if name.is_empty() {
            return Err(MutationError::EmptyName);
        }
        self.checkpoint();
        let item = WorkoutItem::new(name, prescription.trim());
        let id = item.id.clone();
        self.ensure_entry(day).workouts.push(item);
        self.apply_auto_workout_habit(day);
        Ok(id)
    }

    pub fn remove_workout_item(&mut self, day: DayKey, item_id: &str) -> Result<(), MutationError> {
        self.ensure_unlocked(day)?;
        if !self.has_workout_item(day, item_id) {
            return Err(MutationError::UnknownWorkoutItem(item_id.to_string()));
        }
        self.checkpoint();
        self.ensure_entry(day)
            .workouts
            .retain(|item| item.id != item_id);
        self.apply_auto_workout_habit(day);
        Ok(())
    }

    /// Flips an item's done flag and returns its new value.
    pub fn toggle_workout_item(
        &mut self,
        day: DayKey,
        item_id: &str,
    ) -> Result<bool, MutationError> {
        self.ensure_unlocked(day)?;
        if !self.has_workout_item(day, item_id) {
            return Err(MutationError::UnknownWorkoutItem(item_id.to_string()));
        }
        self.checkpoint();
        let mut done = false;
        if let Some(item) = self
            .ensure_entry(day)
            .workouts
            .iter_mut()
            .find(|item| item.id == item_id)
        {
            item.done = !item.done;
            done = item.done;
        }
        self.apply_auto_workout_habit(day);
        Ok(done)
    }

    pub fn clear_workout(&mut self, day: DayKey) -> Result<(), MutationError> {
        self.ensure_unlocked(day)?;
        self.checkpoint();
        let entry = self.ensure_entry(day);
        entry.workouts.clear();
        entry.workout_title = None;
        entry.workout_meta = None;
        self.apply_auto_workout_habit(day);
        Ok(())
    }

    /// Replaces the day's workout list, title and meta with a generated plan.
    pub fn apply_plan(&mut self, day: DayKey, plan: &Plan) -> Result<(), MutationError> {
        self.ensure_unlocked(day)?;
        self.checkpoint();
        let entry = self.ensure_entry(day);
        entry.workouts = plan.workout_items();
        entry.workout_title = Some(plan.title.clone());
        entry.workout_meta = Some(plan.meta.clone());
        debug!(day = %day, items = entry.workouts.len(), "workout plan applied");
        self.apply_auto_workout_habit(day);
        Ok(())
    }

    /// Mirrors workout completion onto the habit named "Workout". An empty
    /// workout list leaves the flag alone.
    fn apply_auto_workout_habit(&mut self, day: DayKey) {
        if !self.profile.auto_workout_habit {
            return;
        }
        // TODO: match on a stored habit id once habits can be tagged; a renamed
        // or duplicated "Workout" habit is ambiguous here.
        let Some(habit_id) = self
            .habits
            .iter()
            .find(|habit| habit.is_workout())
            .map(|habit| habit.id.clone())
        else {
            return;
        };
        let entry = self.ensure_entry(day);
        if entry.workouts.is_empty() {
            return;
        }
        let done = entry.all_workouts_done();
        entry.habits.insert(habit_id, done);
    }
}
