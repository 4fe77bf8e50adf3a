//! Single-level undo: copy the whole state before a mutation, replace it on
//! restore.

use tracing::info;

use crate::error::MutationError;
use crate::migrate::migrate;
use crate::model::State;

impl State {
    /// Stores a deep copy of the current state as the undo snapshot. The copy
    /// never carries a snapshot of its own.
    pub fn checkpoint(&mut self) {
        self.undo_snapshot = None;
        let snapshot = self.clone();
        self.undo_snapshot = Some(Box::new(snapshot));
    }

    pub fn can_undo(&self) -> bool {
        self.undo_snapshot.is_some()
    }

    /// Restores the snapshot through the migration path. There is no redo.
    pub fn undo(&mut self) -> Result<(), MutationError> {
        let snapshot = self.undo_snapshot.take().ok_or(MutationError::NothingToUndo)?;
        // State has only string map keys, so serializing it cannot fail.
        let mut restored = migrate(serde_json::to_value(&*snapshot).unwrap_or_default());
        restored.undo_snapshot = None;
        *self = restored;
        info!("undo applied");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::DayKey;

    fn day(raw: &str) -> DayKey {
        DayKey::parse(raw).unwrap()
    }

    #[test]
    fn undo_without_snapshot_is_a_no_op() {
        let mut state = State::default();
        assert_eq!(state.undo(), Err(MutationError::NothingToUndo));
        assert_eq!(state, State::default());
    }

    #[test]
    fn undo_restores_the_previous_state() {
        let mut state = State::default();
        let today = day("2025-10-20");
        state.toggle_habit(today, "h-deep").unwrap();
        let after_first = state.clone();
        state.set_note(today, "second").unwrap();

        state.undo().expect("undo");
        let mut expected = after_first;
        expected.undo_snapshot = None;
        assert_eq!(state, expected);
        assert!(!state.can_undo());
    }

    #[test]
    fn undo_repairs_a_snapshot_through_migration() {
        let mut state = State::default();
        state.checkpoint();
        if let Some(snapshot) = state.undo_snapshot.as_mut() {
            snapshot.scoring_config.threshold = 99;
            snapshot.profile.duration_minutes = 0;
        }
        state.undo().expect("undo");
        assert_eq!(state.scoring_config.threshold, 50);
        assert_eq!(state.profile.duration_minutes, 25);
    }

    #[test]
    fn snapshots_never_nest() {
        let mut state = State::default();
        let today = day("2025-10-20");
        for _ in 0..5 {
            state.toggle_habit(today, "h-deep").unwrap();
        }
        let snapshot = state.undo_snapshot.as_ref().expect("snapshot");
        assert!(snapshot.undo_snapshot.is_none());
    }

    #[test]
    fn only_the_last_mutation_can_be_undone() {
        let mut state = State::default();
        let today = day("2025-10-20");
        state.toggle_habit(today, "h-deep").unwrap();
        state.toggle_habit(today, "h-sleep").unwrap();
        state.undo().unwrap();
        let entry = &state.entries[&today];
        assert!(entry.is_done("h-deep"));
        assert!(!entry.is_done("h-sleep"));
        assert_eq!(state.undo(), Err(MutationError::NothingToUndo));
    }
}
