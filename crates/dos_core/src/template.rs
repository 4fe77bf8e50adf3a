/// Preset habit list with a matching threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Template {
    pub name: &'static str,
    pub threshold: u32,
    pub habits: &'static [&'static str],
}

pub const TEMPLATES: [Template; 3] = [
    Template {
        name: "Beginner",
        threshold: 4,
        habits: &[
            "Workout",
            "Deep Work",
            "Sleep ≥ 7h",
            "No Porn",
            "Walk 20m",
            "Read 15m",
        ],
    },
    Template {
        name: "Standard",
        threshold: 6,
        habits: &[
            "Workout",
            "Grind / Money",
            "Deep Work",
            "Sleep ≥ 7h",
            "No Porn",
            "No Masturbation",
            "Meditation",
        ],
    },
    Template {
        name: "Hard Mode",
        threshold: 7,
        habits: &[
            "Workout",
            "Grind / Money",
            "Deep Work",
            "Sleep ≥ 8h",
            "No Porn",
            "No Masturbation",
            "Cold Shower",
            "No Junk Food",
        ],
    },
];

pub fn find_template(name: &str) -> Option<&'static Template> {
    TEMPLATES
        .iter()
        .find(|template| template.name.eq_ignore_ascii_case(name.trim()))
}
