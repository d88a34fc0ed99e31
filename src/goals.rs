//! Static wellness-goal catalogue served by the JSON API.

use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct WellnessGoal {
    pub id: u32,
    pub title: &'static str,
    pub category: &'static str,
    pub daily_target: u32,
    pub unit: &'static str,
}

pub const WELLNESS_GOALS: &[WellnessGoal] = &[
    WellnessGoal {
        id: 1,
        title: "Drink water",
        category: "hydration",
        daily_target: 8,
        unit: "glasses",
    },
    WellnessGoal {
        id: 2,
        title: "Walk",
        category: "activity",
        daily_target: 10_000,
        unit: "steps",
    },
    WellnessGoal {
        id: 3,
        title: "Sleep",
        category: "rest",
        daily_target: 8,
        unit: "hours",
    },
    WellnessGoal {
        id: 4,
        title: "Meditate",
        category: "mindfulness",
        daily_target: 10,
        unit: "minutes",
    },
];

#[must_use]
pub fn find_goal(id: u32) -> Option<&'static WellnessGoal> {
    WELLNESS_GOALS.iter().find(|goal| goal.id == id)
}
