use std::fmt;

use rand::rngs::{StdRng, ThreadRng};
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

use crate::model::{Goal, Profile, WorkoutItem};

const WARMUPS: &[&str] = &[
    "Jumping jacks",
    "High knees",
    "Butt kicks",
    "Arm circles",
    "Inchworms",
    "Hip openers",
    "Shadow boxing",
];

const PUSHES: &[&str] = &[
    "Push-ups",
    "Incline push-ups (hands on couch)",
    "Knee push-ups",
    "Pike push-ups",
];

const LEGS: &[&str] = &[
    "Bodyweight squats",
    "Reverse lunges",
    "Split squats",
    "Wall sit",
    "Glute bridges",
];

const CORE: &[&str] = &[
    "Plank",
    "Dead bug",
    "Bicycle crunches",
    "Leg raises",
    "Mountain climbers",
];

const CARDIO: &[&str] = &[
    "Burpees (low-impact ok)",
    "Skaters",
    "Fast step-ups (stairs)",
    "Shadow boxing combos",
    "Squat-to-reach (fast)",
];

const COOLDOWN: &str = "Hamstrings + hips + chest opener • 3–5 min";

/// Source of uniform random choices. Swapped for a fixed source in tests.
pub trait Chooser {
    /// An index in `0..len`; `len` is never zero.
    fn choose_index(&mut self, len: usize) -> usize;
}

pub struct RngChooser<R>(R);

impl RngChooser<ThreadRng> {
    pub fn thread() -> Self {
        Self(rand::thread_rng())
    }
}

impl RngChooser<StdRng> {
    pub fn seeded(seed: u64) -> Self {
        Self(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> Chooser for RngChooser<R> {
    fn choose_index(&mut self, len: usize) -> usize {
        self.0.gen_range(0..len.max(1))
    }
}

pub fn pick<'a>(chooser: &mut dyn Chooser, pool: &[&'a str]) -> &'a str {
    let idx = chooser.choose_index(pool.len()).min(pool.len().saturating_sub(1));
    pool.get(idx).copied().unwrap_or_default()
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Intensity {
    High,
    MediumHigh,
    Medium,
}

impl Intensity {
    pub fn for_goal(goal: Goal) -> Self {
        match goal {
            Goal::FatLoss => Intensity::High,
            Goal::Endurance => Intensity::MediumHigh,
            Goal::Muscle | Goal::General => Intensity::Medium,
        }
    }

    pub fn work_seconds(self) -> u32 {
        match self {
            Intensity::High => 40,
            Intensity::MediumHigh => 35,
            Intensity::Medium => 30,
        }
    }

    pub fn rest_seconds(self) -> u32 {
        match self {
            Intensity::High => 20,
            Intensity::MediumHigh | Intensity::Medium => 25,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Finisher {
    TempoSquats,
    Emom,
    SteadyCardio,
    PlankWallSit,
}

impl Finisher {
    /// First matching rule wins.
    pub fn select(goal: Goal, weight_delta: f64) -> Self {
        if goal == Goal::Muscle && weight_delta < 0.0 {
            Finisher::TempoSquats
        } else if goal == Goal::FatLoss && weight_delta > 10.0 {
            Finisher::Emom
        } else if goal == Goal::Endurance {
            Finisher::SteadyCardio
        } else {
            Finisher::PlankWallSit
        }
    }

    pub fn prescription(self) -> &'static str {
        match self {
            Finisher::TempoSquats => "Tempo squats (slow down) — 2 min",
            Finisher::Emom => "EMOM 6: 6 burpees (or 10 squat-to-reach)",
            Finisher::SteadyCardio => "8 min steady shadow boxing",
            Finisher::PlankWallSit => "2 min plank + 2 min wall sit",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum PlanSlot {
    Warmup,
    Push,
    Legs,
    Core,
    Cardio,
    Rest,
    Finisher,
    Cooldown,
}

impl PlanSlot {
    pub const ORDER: [PlanSlot; 8] = [
        PlanSlot::Warmup,
        PlanSlot::Push,
        PlanSlot::Legs,
        PlanSlot::Core,
        PlanSlot::Cardio,
        PlanSlot::Rest,
        PlanSlot::Finisher,
        PlanSlot::Cooldown,
    ];

    /// Exercise pool for slots filled by a random pick.
    pub fn pool(self) -> Option<&'static [&'static str]> {
        match self {
            PlanSlot::Warmup => Some(WARMUPS),
            PlanSlot::Push => Some(PUSHES),
            PlanSlot::Legs => Some(LEGS),
            PlanSlot::Core => Some(CORE),
            PlanSlot::Cardio => Some(CARDIO),
            PlanSlot::Rest | PlanSlot::Finisher | PlanSlot::Cooldown => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PlanItem {
    pub slot: PlanSlot,
    pub name: String,
    pub prescription: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Plan {
    pub title: String,
    pub meta: String,
    pub intensity: Intensity,
    pub rounds: u32,
    pub work_seconds: u32,
    pub rest_seconds: u32,
    pub weight_delta: f64,
    pub finisher: Finisher,
    pub items: Vec<PlanItem>,
}

impl Plan {
    /// Fresh, not-done workout items in slot order.
    pub fn workout_items(&self) -> Vec<WorkoutItem> {
        self.items
            .iter()
            .map(|item| WorkoutItem::new(item.name.clone(), item.prescription.clone()))
            .collect()
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.title)?;
        writeln!(f, "{}", self.meta)?;
        for item in &self.items {
            writeln!(f, "- {}: {}", item.name, item.prescription)?;
        }
        Ok(())
    }
}

pub fn rounds_for(duration_minutes: u32) -> u32 {
    match duration_minutes {
        0..=15 => 3,
        16..=25 => 4,
        _ => 5,
    }
}

/// No-equipment workout derived from the profile; exercise picks come from
/// `chooser`.
pub fn build_plan(profile: &Profile, chooser: &mut dyn Chooser) -> Plan {
    let duration = profile.duration_minutes;
    let weight_delta = profile.current_weight - profile.goal_weight;
    let intensity = Intensity::for_goal(profile.goal);
    let rounds = rounds_for(duration);
    let work_seconds = intensity.work_seconds();
    let rest_seconds = intensity.rest_seconds();
    let finisher = Finisher::select(profile.goal, weight_delta);

    let exercise = format!("{rounds} rounds • {work_seconds}s work");
    let mut items = Vec::with_capacity(PlanSlot::ORDER.len());
    for slot in PlanSlot::ORDER {
        let (name, prescription) = match slot {
            PlanSlot::Warmup => {
                let first = pick(chooser, WARMUPS);
                let second = pick(chooser, WARMUPS);
                (
                    "Warmup".to_string(),
                    format!("Pick 2: {first} + {second} • 4–5 min"),
                )
            }
            PlanSlot::Push | PlanSlot::Legs | PlanSlot::Core | PlanSlot::Cardio => {
                let pool = slot.pool().unwrap_or_default();
                (pick(chooser, pool).to_string(), exercise.clone())
            }
            PlanSlot::Rest => ("Rest".to_string(), format!("{rest_seconds}s between moves")),
            PlanSlot::Finisher => ("Finisher".to_string(), finisher.prescription().to_string()),
            PlanSlot::Cooldown => ("Cooldown".to_string(), COOLDOWN.to_string()),
        };
        items.push(PlanItem {
            slot,
            name,
            prescription,
        });
    }

    Plan {
        title: format!("No-Equipment Plan • {duration} min"),
        meta: format!(
            "Goal: {} • {}→{} lbs • Rounds {rounds} • {work_seconds}s on / {rest_seconds}s off",
            profile.goal.label(),
            profile.current_weight,
            profile.goal_weight,
        ),
        intensity,
        rounds,
        work_seconds,
        rest_seconds,
        weight_delta,
        finisher,
        items,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Always picks the same position, clamped to the pool.
    struct FixedChooser(usize);

    impl Chooser for FixedChooser {
        fn choose_index(&mut self, len: usize) -> usize {
            self.0.min(len - 1)
        }
    }

    fn profile(goal: Goal, current: f64, target: f64, minutes: u32) -> Profile {
        Profile {
            goal,
            current_weight: current,
            goal_weight: target,
            duration_minutes: minutes,
            auto_workout_habit: true,
        }
    }

    #[test]
    fn fat_loss_cut_gets_emom_and_high_intensity() {
        let plan = build_plan(&profile(Goal::FatLoss, 200.0, 180.0, 30), &mut FixedChooser(0));
        assert_eq!(plan.rounds, 5);
        assert_eq!(plan.work_seconds, 40);
        assert_eq!(plan.rest_seconds, 20);
        assert_eq!(plan.intensity, Intensity::High);
        assert_eq!(plan.finisher, Finisher::Emom);
        assert_eq!(plan.title, "No-Equipment Plan • 30 min");
        assert_eq!(
            plan.meta,
            "Goal: fat loss • 200→180 lbs • Rounds 5 • 40s on / 20s off"
        );
    }

    #[test]
    fn rounds_follow_duration_bands() {
        assert_eq!(rounds_for(10), 3);
        assert_eq!(rounds_for(15), 3);
        assert_eq!(rounds_for(16), 4);
        assert_eq!(rounds_for(25), 4);
        assert_eq!(rounds_for(26), 5);
    }

    #[test]
    fn finisher_rules_apply_in_order() {
        assert_eq!(Finisher::select(Goal::Muscle, -5.0), Finisher::TempoSquats);
        assert_eq!(Finisher::select(Goal::Muscle, 5.0), Finisher::PlankWallSit);
        assert_eq!(Finisher::select(Goal::FatLoss, 10.0), Finisher::PlankWallSit);
        assert_eq!(Finisher::select(Goal::FatLoss, 10.5), Finisher::Emom);
        assert_eq!(Finisher::select(Goal::Endurance, 50.0), Finisher::SteadyCardio);
        assert_eq!(Finisher::select(Goal::General, 0.0), Finisher::PlankWallSit);
    }

    #[test]
    fn endurance_and_muscle_timing() {
        let endurance = build_plan(&profile(Goal::Endurance, 170.0, 170.0, 20), &mut FixedChooser(1));
        assert_eq!((endurance.work_seconds, endurance.rest_seconds), (35, 25));
        assert_eq!(endurance.rounds, 4);
        let muscle = build_plan(&profile(Goal::Muscle, 150.0, 160.0, 12), &mut FixedChooser(1));
        assert_eq!((muscle.work_seconds, muscle.rest_seconds), (30, 25));
        assert_eq!(muscle.finisher, Finisher::TempoSquats);
        assert_eq!(muscle.rounds, 3);
    }

    #[test]
    fn items_follow_fixed_slot_order() {
        let plan = build_plan(&Profile::default(), &mut FixedChooser(2));
        let slots: Vec<_> = plan.items.iter().map(|item| item.slot).collect();
        assert_eq!(slots, PlanSlot::ORDER.to_vec());
        assert_eq!(plan.items[0].name, "Warmup");
        assert_eq!(plan.items[0].prescription, "Pick 2: Butt kicks + Butt kicks • 4–5 min");
        assert_eq!(plan.items[1].name, "Knee push-ups");
        assert_eq!(plan.items[1].prescription, "4 rounds • 40s work");
        assert_eq!(plan.items[5].prescription, "20s between moves");
        assert_eq!(plan.items[7].name, "Cooldown");
    }

    #[test]
    fn random_picks_stay_in_category() {
        let mut chooser = RngChooser::seeded(7);
        for _ in 0..50 {
            let plan = build_plan(&Profile::default(), &mut chooser);
            for item in &plan.items {
                if let (PlanSlot::Push | PlanSlot::Legs | PlanSlot::Core | PlanSlot::Cardio, Some(pool)) =
                    (item.slot, item.slot.pool())
                {
                    assert!(pool.contains(&item.name.as_str()), "{} not in pool", item.name);
                }
                assert!(!item.name.is_empty());
                assert!(!item.prescription.is_empty());
            }
        }
    }

    #[test]
    fn seeded_choosers_are_reproducible() {
        let a = build_plan(&Profile::default(), &mut RngChooser::seeded(42));
        let b = build_plan(&Profile::default(), &mut RngChooser::seeded(42));
        assert_eq!(a, b);
    }

    #[test]
    fn materialized_items_start_not_done() {
        let plan = build_plan(&Profile::default(), &mut FixedChooser(0));
        let items = plan.workout_items();
        assert_eq!(items.len(), 8);
        assert!(items.iter().all(|item| !item.done && !item.id.is_empty()));
    }
}
