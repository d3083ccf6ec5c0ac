use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The exercises a workout log can count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Workout {
    Burpee,
    HandstandPressUp,
    PressUp,
    SitUp,
    Squat,
    SquatThrust,
    StarJump,
    StepUp,
}

impl Workout {
    pub const COUNT: usize = 8;

    pub const ALL: [Workout; Workout::COUNT] = [
        Workout::Burpee,
        Workout::HandstandPressUp,
        Workout::PressUp,
        Workout::SitUp,
        Workout::Squat,
        Workout::SquatThrust,
        Workout::StarJump,
        Workout::StepUp,
    ];

    /// Position of this workout in [`Workout::ALL`].
    pub fn index(self) -> usize {
        self as usize
    }

    /// Stable key used for storage columns and document fields.
    pub fn key(self) -> &'static str {
        match self {
            Workout::Burpee => "burpee",
            Workout::HandstandPressUp => "handstand_press_up",
            Workout::PressUp => "press_up",
            Workout::SitUp => "sit_up",
            Workout::Squat => "squat",
            Workout::SquatThrust => "squat_thrust",
            Workout::StarJump => "star_jump",
            Workout::StepUp => "step_up",
        }
    }

    pub fn display_name(self) -> &'static str {
        match self {
            Workout::Burpee => "Burpee",
            Workout::HandstandPressUp => "Handstand press-up",
            Workout::PressUp => "Press-up",
            Workout::SitUp => "Sit-up",
            Workout::Squat => "Squat",
            Workout::SquatThrust => "Squat thrust",
            Workout::StarJump => "Star jump",
            Workout::StepUp => "Step-up",
        }
    }
}

impl fmt::Display for Workout {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.key())
    }
}

impl FromStr for Workout {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase().replace(['-', ' '], "_");
        Workout::ALL
            .into_iter()
            .find(|w| w.key() == normalized)
            .ok_or_else(|| {
                let valid: Vec<&str> = Workout::ALL.iter().map(|w| w.key()).collect();
                format!(
                    "Invalid workout '{}'. Valid options: {}",
                    s,
                    valid.join(", ")
                )
            })
    }
}
