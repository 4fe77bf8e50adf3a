pub mod calendar;
pub mod entry;
pub mod error;
pub mod habits;
pub mod migrate;
pub mod model;
pub mod plan;
pub mod scoring;
pub mod service;
pub mod store;
pub mod template;
pub mod undo;

pub use crate::calendar::DayKey;
pub use crate::error::{MutationError, StoreError};
pub use crate::model::State;
pub use crate::service::{Tracker, TrackerBuilder};
