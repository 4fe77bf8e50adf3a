//! Mutators for the habit list, settings and profile. None of these target a
//! single day, so the submitted lock does not apply.

use tracing::debug;

use crate::error::MutationError;
use crate::model::{normalize_habit_name, Habit, Profile, ScoringConfig, State, StatusLabels, Theme};
use crate::template::Template;

const MIN_WEIGHT: f64 = 50.0;
const MAX_WEIGHT: f64 = 600.0;

impl State {
    fn habit_position(&self, habit_id: &str) -> Result<usize, MutationError> {
        self.habits
            .iter()
            .position(|habit| habit.id == habit_id)
            .ok_or_else(|| MutationError::UnknownHabit(habit_id.to_string()))
    }

    /// Appends an enabled habit and returns its id.
    pub fn add_habit(&mut self, name: &str) -> Result<String, MutationError> {
        if name.trim().is_empty() {
            return Err(MutationError::EmptyName);
        }
        self.checkpoint();
        let habit = Habit::new(name);
        let id = habit.id.clone();
        debug!(habit = %id, name = %habit.name, "habit added");
        self.habits.push(habit);
        Ok(id)
    }

    /// Drops the habit from the list. Day entries keep their stored flags.
    /// The list never becomes empty.
    pub fn remove_habit(&mut self, habit_id: &str) -> Result<(), MutationError> {
        let idx = self.habit_position(habit_id)?;
        if self.habits.len() == 1 {
            return Err(MutationError::LastHabit);
        }
        self.checkpoint();
        self.habits.remove(idx);
        debug!(habit = %habit_id, "habit removed");
        Ok(())
    }

    pub fn rename_habit(&mut self, habit_id: &str, name: &str) -> Result<(), MutationError> {
        let idx = self.habit_position(habit_id)?;
        self.checkpoint();
        self.habits[idx].name = normalize_habit_name(name);
        Ok(())
    }

    pub fn toggle_habit_enabled(&mut self, habit_id: &str) -> Result<bool, MutationError> {
        let idx = self.habit_position(habit_id)?;
        self.checkpoint();
        let habit = &mut self.habits[idx];
        habit.enabled = !habit.enabled;
        Ok(habit.enabled)
    }

    pub fn move_habit_up(&mut self, habit_id: &str) -> Result<(), MutationError> {
        let idx = self.habit_position(habit_id)?;
        if idx == 0 {
            return Err(MutationError::AtBoundary);
        }
        self.checkpoint();
        self.habits.swap(idx - 1, idx);
        Ok(())
    }

    pub fn move_habit_down(&mut self, habit_id: &str) -> Result<(), MutationError> {
        let idx = self.habit_position(habit_id)?;
        if idx + 1 >= self.habits.len() {
            return Err(MutationError::AtBoundary);
        }
        self.checkpoint();
        self.habits.swap(idx, idx + 1);
        Ok(())
    }

    /// Replaces the habit list with the template's, under fresh ids.
    pub fn apply_template(&mut self, template: &Template) {
        self.checkpoint();
        self.scoring_config = ScoringConfig::clamped(i64::from(template.threshold));
        self.habits = template.habits.iter().map(|name| Habit::new(name)).collect();
        debug!(template = template.name, "template applied");
    }

    pub fn update_profile(&mut self, profile: Profile) {
        self.checkpoint();
        let defaults = Profile::default();
        let weight = |value: f64, fallback: f64| {
            if value.is_finite() {
                value.clamp(MIN_WEIGHT, MAX_WEIGHT)
            } else {
                fallback
            }
        };
        self.profile = Profile {
            goal: profile.goal,
            current_weight: weight(profile.current_weight, defaults.current_weight),
            goal_weight: weight(profile.goal_weight, defaults.goal_weight),
            duration_minutes: profile.duration_minutes.max(1),
            auto_workout_habit: profile.auto_workout_habit,
        };
    }

    /// Threshold is clamped into range. Labels are replaced only when `labels`
    /// parses as `good | mid | bad`.
    pub fn update_settings(&mut self, threshold: i64, labels: Option<&str>) {
        self.checkpoint();
        self.scoring_config = ScoringConfig::clamped(threshold);
        if let Some(parsed) = labels.and_then(parse_status_labels) {
            self.status_labels = parsed;
        }
    }

    pub fn toggle_theme(&mut self) -> Theme {
        self.theme = match self.theme {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        };
        self.theme
    }

    pub fn toggle_privacy(&mut self) -> bool {
        self.privacy_mode = !self.privacy_mode;
        self.privacy_mode
    }

    pub fn shift_month(&mut self, delta: i32) -> i32 {
        self.month_offset = self.month_offset.saturating_add(delta);
        self.month_offset
    }
}

/// `"good | mid | bad"`; extra parts are ignored.
pub fn parse_status_labels(raw: &str) -> Option<StatusLabels> {
    let mut parts = raw.split('|').map(str::trim).filter(|part| !part.is_empty());
    let good = parts.next()?.to_string();
    let mid = parts.next()?.to_string();
    let bad = parts.next()?.to_string();
    Some(StatusLabels { good, mid, bad })
}
