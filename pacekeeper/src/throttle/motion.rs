//! Motion activity classification.
//!
//! Only [`MotionActivity::Stationary`] pauses distance accumulation.
//! `Unknown` is the state before the first classification and while the
//! classifier has low confidence, which includes the start of a movement,
//! so it leaves the distance gate running.

use serde::{Deserialize, Serialize};

/// Coarse activity reported by a motion co-processor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionActivity {
    Stationary,
    Walking,
    Running,
    Cycling,
    Automotive,
    #[default]
    Unknown,
}

impl MotionActivity {
    /// Whether distance accumulation should pause.
    pub fn suppresses_distance(&self) -> bool {
        matches!(self, MotionActivity::Stationary)
    }
}

impl std::fmt::Display for MotionActivity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            MotionActivity::Stationary => "stationary",
            MotionActivity::Walking => "walking",
            MotionActivity::Running => "running",
            MotionActivity::Cycling => "cycling",
            MotionActivity::Automotive => "automotive",
            MotionActivity::Unknown => "unknown",
        };
        f.write_str(name)
    }
}
