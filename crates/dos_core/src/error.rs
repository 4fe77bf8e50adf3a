use thiserror::Error;

use crate::calendar::DayKey;

/// Why a mutator refused to run. A refused call leaves the state untouched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MutationError {
    #[error("day {0} is submitted; unlock it first")]
    Locked(DayKey),
    #[error("day {0} is already submitted")]
    AlreadySubmitted(DayKey),
    #[error("day {0} is not submitted")]
    NotSubmitted(DayKey),
    #[error("unknown habit `{0}`")]
    UnknownHabit(String),
    #[error("unknown workout item `{0}`")]
    UnknownWorkoutItem(String),
    #[error("name must not be empty")]
    EmptyName,
    #[error("habit is already at the edge of the list")]
    AtBoundary,
    #[error("the last habit cannot be removed")]
    LastHabit,
    #[error("nothing to undo")]
    NothingToUndo,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("snapshot storage failed: {0}")]
    Storage(#[from] anyhow::Error),
    #[error("snapshot is not valid JSON: {0}")]
    Parse(#[from] serde_json::Error),
}
