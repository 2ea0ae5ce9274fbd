//! `northstar-types` – values shared by every layer of the navigation stack.
//!
//! - [`Pose`] / [`PoseDelta`] and the angle helpers in [`pose`].
//! - [`Command`]: the primitive motion commands the hardware link accepts.
//! - [`WheelId`], [`WheelTicks`] and [`BeaconReading`]: raw sensor shapes.
//! - [`NavError`]: the single error type used across crates.

pub mod pose;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use pose::{Pose, PoseDelta, normalize_angle, wrap_to_pi};

/// Fastest hardware speed level.
pub const FASTEST_LEVEL: u8 = 1;
/// Slowest hardware speed level.
pub const SLOWEST_LEVEL: u8 = 10;

/// A primitive motion command.
///
/// The payload is a hardware speed level in
/// `FASTEST_LEVEL..=SLOWEST_LEVEL`; note that a *lower* level is *faster*.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", content = "level")]
pub enum Command {
    Forward(u8),
    TurnLeft(u8),
    TurnRight(u8),
}

impl Command {
    /// The speed level carried by the command.
    pub fn level(&self) -> u8 {
        match *self {
            Command::Forward(l) | Command::TurnLeft(l) | Command::TurnRight(l) => l,
        }
    }
}

/// The three omni-wheels of the drive base.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum WheelId {
    Left,
    Right,
    Rear,
}

/// Per-wheel tick deltas since the previous poll (after filtering).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct WheelTicks {
    pub left: f32,
    pub right: f32,
    pub rear: f32,
}

impl WheelTicks {
    pub fn new(left: f32, right: f32, rear: f32) -> Self {
        Self { left, right, rear }
    }
}

/// One raw reading from the overhead beacon system, in room-local units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeaconReading {
    pub x: i32,
    pub y: i32,
    /// Raw beacon heading in radians; never filtered.
    pub theta: f32,
    /// Reported signal strength.  Low values mean the fix is unusable.
    pub strength: i32,
    /// Identifier of the room whose beacon produced the reading.
    pub room: i32,
}

/// Global error type spanning link failures, calibration problems and
/// aborted maneuvers.
#[derive(Error, Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NavError {
    #[error("Hardware link unresponsive after {retries} retries")]
    LinkFailure { retries: u32 },

    #[error("Room {0} is not in the calibration table")]
    UnknownRoom(i32),

    #[error("Invalid filter for channel '{channel}': {reason}")]
    InvalidFilter { channel: String, reason: String },

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Hardware Fault on {component}: {details}")]
    HardwareFault { component: String, details: String },

    #[error("Maneuver aborted by caller")]
    Aborted,

    #[error("Maneuver did not converge within {ticks} ticks")]
    TickBudgetExceeded { ticks: u32 },

    #[error("Pose stale for {consecutive} consecutive ticks")]
    StalePose { consecutive: u32 },
}

impl NavError {
    /// `true` for errors that only make the current pose stale; the caller may
    /// keep going on the last committed pose.
    pub fn is_transient(&self) -> bool {
        matches!(self, NavError::LinkFailure { .. })
    }
}
