//! Closed-loop motion control: one decision per tick.
//!
//! ```text
//! COMPUTE_ERROR ──► TURNING ──┐
//!       ▲       └─► DRIVING ──┤
//!       └─────────────────────┘
//!       └─► ARRIVED (terminal)
//! ```
//!
//! Each [`MotionController::step`] computes the distance and bearing error
//! from the fused pose.  A bearing error outside the heading tolerance turns
//! the robot in place towards the sign of the error; otherwise it drives
//! forward at a speed level chosen from the distance PID output.  Reaching the
//! distance tolerance ends the maneuver, flushes both PIDs, and from then on
//! the controller issues nothing.
//!
//! Speed levels follow the hardware convention: a *lower* level is *faster*.

use northstar_hal::pid::{PidController, PidGains};
use northstar_types::{Command, FASTEST_LEVEL, Pose, SLOWEST_LEVEL, wrap_to_pi};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::guidance::CorridorCue;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MotionConfig {
    /// Arrival radius (cm).
    pub distance_tolerance: f32,
    /// Largest bearing error that still allows driving (rad).
    pub heading_tolerance: f32,
    pub fastest_forward_level: u8,
    pub slowest_forward_level: u8,
    pub fastest_turn_level: u8,
    pub slowest_turn_level: u8,
    /// Forward level = `forward_slowdown / distance_output`.
    pub forward_slowdown: f32,
    /// Turn level = `turn_slowdown / |heading_output|`.
    pub turn_slowdown: f32,
    /// Bearing error (rad) substituted for a full-scale corridor offset.
    pub corridor_gain: f32,
    /// Vision cues below this confidence are ignored.
    pub min_vision_confidence: f32,
}

impl Default for MotionConfig {
    fn default() -> Self {
        Self {
            distance_tolerance: 10.0,
            heading_tolerance: 0.1,
            fastest_forward_level: FASTEST_LEVEL,
            slowest_forward_level: SLOWEST_LEVEL,
            fastest_turn_level: FASTEST_LEVEL,
            slowest_turn_level: SLOWEST_LEVEL,
            forward_slowdown: 100.0,
            turn_slowdown: 1.0,
            corridor_gain: 0.5,
            min_vision_confidence: 0.6,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// State
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotionState {
    ComputeError,
    Turning,
    Driving,
    Arrived,
}

/// What the controller is trying to reach.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Goal {
    /// Drive to `(x, y)` in the global frame.
    Position { x: f32, y: f32 },
    /// Turn in place to an absolute heading.
    Heading(f32),
}

/// Arrival window for one maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tolerance {
    /// Arrival radius (cm).
    pub distance: f32,
    /// Bearing error still accepted (rad).
    pub heading: f32,
}

impl Tolerance {
    /// `true` when both bounds are finite and positive.
    pub fn is_valid(&self) -> bool {
        [self.distance, self.heading]
            .iter()
            .all(|t| t.is_finite() && *t > 0.0)
    }
}

impl From<&MotionConfig> for Tolerance {
    fn from(config: &MotionConfig) -> Self {
        Self {
            distance: config.distance_tolerance,
            heading: config.heading_tolerance,
        }
    }
}

/// Distance and bearing error of `pose` relative to `(x, y)`.
///
/// The bearing error is in `[-π, π)`; positive means the target is to the
/// left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrackingError {
    pub distance: f32,
    pub heading: f32,
}

impl TrackingError {
    pub fn between(pose: &Pose, x: f32, y: f32) -> Self {
        Self {
            distance: (x - pose.x).hypot(y - pose.y),
            heading: wrap_to_pi(pose.bearing_to(x, y) - pose.theta()),
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// MotionController
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct MotionController {
    config: MotionConfig,
    distance_pid: PidController,
    heading_pid: PidController,
    goal: Option<Goal>,
    tolerance: Tolerance,
    state: MotionState,
}

impl MotionController {
    pub fn new(config: MotionConfig, distance: PidGains, heading: PidGains) -> Self {
        Self {
            config,
            distance_pid: PidController::new(distance),
            heading_pid: PidController::new(heading),
            goal: None,
            tolerance: Tolerance::from(&config),
            state: MotionState::Arrived,
        }
    }

    pub fn config(&self) -> &MotionConfig {
        &self.config
    }

    pub fn state(&self) -> MotionState {
        self.state
    }

    pub fn goal(&self) -> Option<Goal> {
        self.goal
    }

    /// Arrival window of the current (or last) maneuver.
    pub fn tolerance(&self) -> Tolerance {
        self.tolerance
    }

    /// Start a new control epoch towards `goal` with the configured
    /// tolerances.
    pub fn begin(&mut self, goal: Goal) {
        self.begin_within(goal, Tolerance::from(&self.config));
    }

    /// Start a new control epoch towards `goal`, arriving inside `tolerance`.
    pub fn begin_within(&mut self, goal: Goal, tolerance: Tolerance) {
        self.distance_pid.flush();
        self.heading_pid.flush();
        self.goal = Some(goal);
        self.tolerance = tolerance;
        self.state = MotionState::ComputeError;
        debug!(?goal, ?tolerance, "maneuver started");
    }

    /// Decide this tick's command from the committed `pose`.
    ///
    /// Returns `None` once the goal is reached; after that every call returns
    /// `None` until [`MotionController::begin`] is called again.
    pub fn step(&mut self, pose: &Pose, cue: Option<&CorridorCue>) -> Option<Command> {
        let goal = match (self.state, self.goal) {
            (MotionState::Arrived, _) | (_, None) => return None,
            (_, Some(goal)) => goal,
        };
        self.state = MotionState::ComputeError;

        match goal {
            Goal::Position { x, y } => {
                let error = TrackingError::between(pose, x, y);
                if error.distance <= self.tolerance.distance {
                    self.arrive(pose, error.distance);
                    return None;
                }

                let (heading_error, force_turn) = match cue {
                    Some(cue) if cue.confidence >= self.config.min_vision_confidence => (
                        cue.lateral_error * self.config.corridor_gain,
                        cue.prefer_turn && cue.lateral_error != 0.0,
                    ),
                    _ => (error.heading, false),
                };

                if force_turn || heading_error.abs() > self.tolerance.heading {
                    Some(self.turn(heading_error))
                } else {
                    Some(self.drive(error.distance))
                }
            }
            Goal::Heading(target) => {
                let heading_error = wrap_to_pi(target - pose.theta());
                if heading_error.abs() <= self.tolerance.heading {
                    self.arrive(pose, 0.0);
                    return None;
                }
                Some(self.turn(heading_error))
            }
        }
    }

    fn turn(&mut self, heading_error: f32) -> Command {
        self.state = MotionState::Turning;
        let output = self.heading_pid.update(heading_error);
        let level = speed_level(
            output.abs(),
            self.config.turn_slowdown,
            self.config.fastest_turn_level,
            self.config.slowest_turn_level,
        );
        debug!(heading_error, output, level, "turning");
        if heading_error > 0.0 {
            Command::TurnLeft(level)
        } else {
            Command::TurnRight(level)
        }
    }

    fn drive(&mut self, distance: f32) -> Command {
        self.state = MotionState::Driving;
        let output = self.distance_pid.update(distance);
        let level = speed_level(
            output,
            self.config.forward_slowdown,
            self.config.fastest_forward_level,
            self.config.slowest_forward_level,
        );
        debug!(distance, output, level, "driving");
        Command::Forward(level)
    }

    fn arrive(&mut self, pose: &Pose, distance: f32) {
        self.state = MotionState::Arrived;
        self.distance_pid.flush();
        self.heading_pid.flush();
        info!(
            x = pose.x,
            y = pose.y,
            theta = pose.theta(),
            distance,
            "arrived"
        );
    }
}

/// Map a controller output to a hardware speed level.
///
/// A larger output gives a faster (lower) level.  Zero, negative and
/// non-finite outputs map to `slowest`.
pub fn speed_level(output: f32, slowdown: f32, fastest: u8, slowest: u8) -> u8 {
    if !(output.is_finite() && output > 0.0) {
        return slowest;
    }
    let level = (slowdown / output).round();
    level.clamp(fastest as f32, slowest as f32) as u8
}
