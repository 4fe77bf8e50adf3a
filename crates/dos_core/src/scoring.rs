use std::fmt;

use chrono::Datelike;
use serde::{Deserialize, Serialize};

use crate::calendar::{month_days, shift_month, DayKey};
use crate::model::State;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "lowercase")]
pub enum StatusClass {
    Bad,
    Mid,
    Good,
}

impl StatusClass {
    pub fn as_str(self) -> &'static str {
        match self {
            StatusClass::Good => "good",
            StatusClass::Mid => "mid",
            StatusClass::Bad => "bad",
        }
    }
}

impl fmt::Display for StatusClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Status {
    pub class: StatusClass,
    pub label: String,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Streaks {
    pub current: u32,
    pub best: u32,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DayScore {
    pub day: DayKey,
    pub score: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HabitTally {
    pub habit_id: String,
    pub name: String,
    pub count: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeekRecap {
    pub average: f64,
    /// Active habit count, the best possible daily score.
    pub max_score: u32,
    pub submitted_days: u32,
    pub best_day: DayScore,
    pub worst_day: DayScore,
    pub days_meeting_threshold: u32,
    /// Active habits by completion count, highest first.
    pub per_habit: Vec<HabitTally>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct HeatCell {
    pub day: DayKey,
    pub score: u32,
    pub level: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MonthHeatmap {
    pub year: i32,
    pub month: u32,
    /// Blank cells before the 1st in a Monday-first grid.
    pub leading_blanks: u32,
    pub cells: Vec<HeatCell>,
}

/// Number of active habits done on `day`.
pub fn score(state: &State, day: DayKey) -> u32 {
    let entry = state.read_entry(day);
    state
        .habits
        .iter()
        .filter(|habit| habit.enabled && entry.is_done(&habit.id))
        .count() as u32
}

pub fn status_for(score: u32, state: &State) -> Status {
    let threshold = state.scoring_config.threshold;
    let labels = &state.status_labels;
    let (class, label) = if score >= threshold {
        (StatusClass::Good, &labels.good)
    } else if score >= threshold.saturating_sub(2).max(1) {
        (StatusClass::Mid, &labels.mid)
    } else {
        (StatusClass::Bad, &labels.bad)
    };
    Status {
        class,
        label: label.clone(),
    }
}

fn qualifies(state: &State, day: DayKey) -> bool {
    state.stored_entry(day).is_some() && score(state, day) >= state.scoring_config.threshold
}

/// Consecutive days ending at `from` where the habit's stored flag is `true`.
/// Ignores whether the habit is still enabled or even still listed.
pub fn habit_streak(state: &State, habit_id: &str, from: DayKey) -> u32 {
    let mut streak = 0;
    let mut cursor = from;
    while state
        .stored_entry(cursor)
        .is_some_and(|entry| entry.habits.get(habit_id) == Some(&true))
    {
        streak += 1;
        cursor = cursor.prev();
    }
    streak
}

/// `current` runs back from `selected`; `best` is the longest run between the
/// earliest and latest stored day, where missing days break a run.
pub fn overall_streaks(state: &State, selected: DayKey) -> Streaks {
    let (Some(&first), Some(&last)) = (state.entries.keys().next(), state.entries.keys().next_back())
    else {
        return Streaks::default();
    };

    let mut current = 0;
    let mut cursor = selected;
    while qualifies(state, cursor) {
        current += 1;
        cursor = cursor.prev();
    }

    let mut best = 0;
    let mut run = 0;
    for day in first.days_through(last) {
        if qualifies(state, day) {
            run += 1;
            best = best.max(run);
        } else {
            run = 0;
        }
    }

    Streaks { current, best }
}

pub fn week_recap(state: &State, week: &[DayKey; 7]) -> WeekRecap {
    let active = state.active_habits();
    let threshold = state.scoring_config.threshold;
    let mut tallies: Vec<HabitTally> = active
        .iter()
        .map(|habit| HabitTally {
            habit_id: habit.id.clone(),
            name: habit.name.clone(),
            count: 0,
        })
        .collect();

    let mut total = 0;
    let mut submitted_days = 0;
    let mut days_meeting_threshold = 0;
    let mut best: Option<DayScore> = None;
    let mut worst: Option<DayScore> = None;

    for &day in week {
        let entry = state.read_entry(day);
        let day_score = score(state, day);
        total += day_score;
        if entry.submitted {
            submitted_days += 1;
        }
        if day_score >= threshold {
            days_meeting_threshold += 1;
        }
        if best.map_or(true, |b| day_score > b.score) {
            best = Some(DayScore { day, score: day_score });
        }
        if worst.map_or(true, |w| day_score < w.score) {
            worst = Some(DayScore { day, score: day_score });
        }
        for tally in tallies.iter_mut() {
            if entry.is_done(&tally.habit_id) {
                tally.count += 1;
            }
        }
    }

    // Stable sort keeps list order among equal counts.
    tallies.sort_by(|a, b| b.count.cmp(&a.count));
    let first_day = DayScore {
        day: week[0],
        score: 0,
    };

    WeekRecap {
        average: f64::from(total) / week.len() as f64,
        max_score: active.len() as u32,
        submitted_days,
        best_day: best.unwrap_or(first_day),
        worst_day: worst.unwrap_or(first_day),
        days_meeting_threshold,
        per_habit: tallies,
    }
}

/// Heat level 0..=4 for a score out of `max`.
pub fn heat_level(score: u32, max: u32) -> u8 {
    let ratio = f64::from(score) / f64::from(max.max(1));
    if ratio == 0.0 {
        0
    } else if ratio < 0.34 {
        1
    } else if ratio < 0.67 {
        2
    } else if ratio < 0.9 {
        3
    } else {
        4
    }
}

pub fn month_heatmap(state: &State, year: i32, month: u32) -> MonthHeatmap {
    let days = month_days(year, month);
    let leading_blanks = days
        .first()
        .map(|day| day.date().weekday().num_days_from_monday())
        .unwrap_or(0);
    let max = state.active_habits().len() as u32;
    let cells = days
        .into_iter()
        .map(|day| {
            let score = score(state, day);
            HeatCell {
                day,
                score,
                level: heat_level(score, max),
            }
        })
        .collect();
    MonthHeatmap {
        year,
        month,
        leading_blanks,
        cells,
    }
}

/// Heatmap for the month the state's navigation offset points at.
pub fn visible_heatmap(state: &State, today: DayKey) -> MonthHeatmap {
    let (year, month) = shift_month(today, state.month_offset);
    month_heatmap(state, year, month)
}
