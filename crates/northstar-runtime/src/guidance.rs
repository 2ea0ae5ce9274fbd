//! Narrow contracts for the two external guidance collaborators.
//!
//! - [`VisionSource`] supplies an optional corridor-centering cue each tick.
//!   The motion loop may steer on it instead of the computed bearing.
//! - [`PathPlanner`] supplies the next waypoint on demand.  Each waypoint is
//!   driven as an independent `move_to`.
//!
//! [`WaypointQueue`] is the simplest planner: a fixed list visited in order.

use std::collections::VecDeque;

use northstar_types::Pose;
use serde::{Deserialize, Serialize};

/// Base coordinates (cm) of the reference course, visited in this order and
/// ending back at the origin.
pub const DEFAULT_TOUR: [(f32, f32); 7] = [
    (340.0, 0.0),
    (229.0, 183.0),
    (326.0, 183.0),
    (392.0, 300.0),
    (318.0, 386.0),
    (49.0, 386.0),
    (0.0, 0.0),
];

// ────────────────────────────────────────────────────────────────────────────
// Vision
// ────────────────────────────────────────────────────────────────────────────

/// One corridor-centering hint from the vision front-end.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CorridorCue {
    /// Offset of the corridor centre, `-1.0` (far right) to `1.0` (far left).
    pub lateral_error: f32,
    /// Vision would rather turn than drive this tick.
    pub prefer_turn: bool,
    /// `0.0` (guess) to `1.0` (certain).
    pub confidence: f32,
}

impl CorridorCue {
    /// Build a cue, clamping both ranges.
    pub fn new(lateral_error: f32, prefer_turn: bool, confidence: f32) -> Self {
        Self {
            lateral_error: lateral_error.clamp(-1.0, 1.0),
            prefer_turn,
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

pub trait VisionSource {
    /// The cue for this tick, or `None` when nothing was detected.
    fn cue(&mut self) -> Option<CorridorCue>;
}

// ────────────────────────────────────────────────────────────────────────────
// Planning
// ────────────────────────────────────────────────────────────────────────────

pub trait PathPlanner {
    /// Next `(x, y)` waypoint given the current pose, or `None` when done.
    fn next_waypoint(&mut self, pose: &Pose) -> Option<(f32, f32)>;
}

/// Fixed waypoint list.
#[derive(Debug, Clone, Default)]
pub struct WaypointQueue {
    waypoints: VecDeque<(f32, f32)>,
}

impl WaypointQueue {
    pub fn new(waypoints: impl IntoIterator<Item = (f32, f32)>) -> Self {
        Self {
            waypoints: waypoints.into_iter().collect(),
        }
    }

    /// The reference course.
    pub fn default_tour() -> Self {
        Self::new(DEFAULT_TOUR)
    }

    pub fn remaining(&self) -> usize {
        self.waypoints.len()
    }
}

impl PathPlanner for WaypointQueue {
    fn next_waypoint(&mut self, _pose: &Pose) -> Option<(f32, f32)> {
        self.waypoints.pop_front()
    }
}
