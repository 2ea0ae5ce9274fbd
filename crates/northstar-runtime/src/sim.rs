//! In-process simulated robot for testing without physical hardware.
//!
//! [`SimRobot`] implements [`HardwareLink`] for a noiseless robot that
//! executes every command exactly:
//!
//! - `Forward(level)` drives `base_step_cm × (11 − level) / 10` along the
//!   current heading,
//! - `TurnLeft` / `TurnRight` rotate in place by
//!   `base_turn_rad × (11 − level) / 10`.
//!
//! Wheel ticks are reported with the inverse of the dead-reckoning model, and
//! beacon readings with the inverse room transform of the nearest calibrated
//! room, so a correct sensing pipeline reproduces the true pose.  Failures,
//! weak beacon reads and obstacles can be scripted, and every poll and command
//! is recorded for assertions.
//!
//! # Example
//!
//! ```rust
//! use northstar_hal::link::HardwareLink;
//! use northstar_runtime::{RobotConfig, sim::SimRobot};
//! use northstar_types::{Command, Pose};
//!
//! let mut sim = SimRobot::from_config(&RobotConfig::default(), Pose::default())
//!     .expect("default calibration is valid");
//!
//! sim.issue(Command::Forward(1)).expect("sim commands always succeed");
//! assert!((sim.truth().x - 8.0).abs() < 1e-5);
//! ```

use northstar_hal::link::HardwareLink;
use northstar_perception::odometry::WheelGeometry;
use northstar_perception::room::{RoomCalibration, RoomTable};
use northstar_types::{BeaconReading, Command, NavError, Pose, SLOWEST_LEVEL, WheelId, WheelTicks};
use serde::{Deserialize, Serialize};
use tracing::trace;

use crate::config::RobotConfig;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// Distance covered by one `Forward(1)` (cm).
    pub base_step_cm: f32,
    /// Angle covered by one `TurnLeft(1)` (rad).
    pub base_turn_rad: f32,
    /// Strength reported with every healthy beacon reading.
    pub beacon_strength: i32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            base_step_cm: 8.0,
            base_turn_rad: 0.2,
            beacon_strength: 15000,
        }
    }
}

impl SimConfig {
    fn scale(level: u8) -> f32 {
        let level = level.min(SLOWEST_LEVEL);
        f32::from(SLOWEST_LEVEL + 1 - level) / f32::from(SLOWEST_LEVEL)
    }

    pub fn forward_step(&self, level: u8) -> f32 {
        self.base_step_cm * Self::scale(level)
    }

    pub fn turn_step(&self, level: u8) -> f32 {
        self.base_turn_rad * Self::scale(level)
    }
}

pub struct SimRobot {
    config: SimConfig,
    geometry: WheelGeometry,
    rooms: RoomTable,
    truth: Pose,
    /// Exact ticks not yet reported.
    pending: WheelTicks,
    reported: [i32; 3],
    beacon: BeaconReading,
    fail_next: u32,
    fail_always: bool,
    weak_beacon: bool,
    obstacle: bool,
    polls: u32,
    commands: Vec<Command>,
}

impl SimRobot {
    pub fn new(config: SimConfig, geometry: WheelGeometry, rooms: RoomTable, start: Pose) -> Self {
        Self {
            config,
            geometry,
            rooms,
            truth: start,
            pending: WheelTicks::default(),
            reported: [0; 3],
            beacon: BeaconReading {
                x: 0,
                y: 0,
                theta: 0.0,
                strength: 0,
                room: 0,
            },
            fail_next: 0,
            fail_always: false,
            weak_beacon: false,
            obstacle: false,
            polls: 0,
            commands: Vec::new(),
        }
    }

    /// Simulator matching the geometry and calibration of `config`.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Config`] for an unusable room table.
    pub fn from_config(config: &RobotConfig, start: Pose) -> Result<Self, NavError> {
        Ok(Self::new(
            SimConfig::default(),
            config.geometry,
            RoomTable::new(config.rooms.clone())?,
            start,
        ))
    }

    /// Fail the next `n` polls.
    pub fn fail_next(&mut self, n: u32) {
        self.fail_next = n;
    }

    /// Fail every poll until switched off.
    pub fn fail_always(&mut self, on: bool) {
        self.fail_always = on;
    }

    pub fn set_weak_beacon(&mut self, on: bool) {
        self.weak_beacon = on;
    }

    pub fn set_obstacle(&mut self, on: bool) {
        self.obstacle = on;
    }

    /// The true pose.
    pub fn truth(&self) -> Pose {
        self.truth
    }

    /// Every poll attempt, successful or not.
    pub fn polls(&self) -> u32 {
        self.polls
    }

    /// Every command received, in order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    fn nearest_room(&self) -> Option<&RoomCalibration> {
        let d = |r: &RoomCalibration| (r.shift_x - self.truth.x).hypot(r.shift_y - self.truth.y);
        self.rooms.iter().min_by(|a, b| d(a).total_cmp(&d(b)))
    }

    fn add_ticks(&mut self, ticks: WheelTicks) {
        self.pending.left += ticks.left;
        self.pending.right += ticks.right;
        self.pending.rear += ticks.rear;
    }

    /// Report whole ticks and carry the remainder so the total stays exact.
    fn take_ticks(&mut self) -> [i32; 3] {
        let p = &mut self.pending;
        let whole = [p.left.round(), p.right.round(), p.rear.round()];
        p.left -= whole[0];
        p.right -= whole[1];
        p.rear -= whole[2];
        whole.map(|t| t as i32)
    }
}

impl HardwareLink for SimRobot {
    fn poll(&mut self) -> Result<(), NavError> {
        self.polls += 1;
        if self.fail_always || self.fail_next > 0 {
            self.fail_next = self.fail_next.saturating_sub(1);
            return Err(NavError::HardwareFault {
                component: "sim".to_string(),
                details: "no response".to_string(),
            });
        }

        self.reported = self.take_ticks();

        let room = self.nearest_room().copied();
        if let Some(room) = room {
            let (x, y) = room.to_local(self.truth.x, self.truth.y);
            self.beacon = BeaconReading {
                x: x.round() as i32,
                y: y.round() as i32,
                theta: room.heading_to_local(self.truth.theta()),
                strength: if self.weak_beacon {
                    0
                } else {
                    self.config.beacon_strength
                },
                room: room.id,
            };
        }
        trace!(reported = ?self.reported, beacon = ?self.beacon, "sim poll");
        Ok(())
    }

    fn wheel_ticks(&self, wheel: WheelId) -> i32 {
        match wheel {
            WheelId::Left => self.reported[0],
            WheelId::Right => self.reported[1],
            WheelId::Rear => self.reported[2],
        }
    }

    fn beacon(&self) -> BeaconReading {
        self.beacon
    }

    fn issue(&mut self, command: Command) -> Result<(), NavError> {
        self.commands.push(command);
        match command {
            Command::Forward(level) => {
                let d = self.config.forward_step(level);
                let (s, c) = self.truth.theta().sin_cos();
                self.truth.translate(d * c, d * s);
                self.add_ticks(self.geometry.ticks_for_forward(d));
            }
            Command::TurnLeft(level) | Command::TurnRight(level) => {
                let mut angle = self.config.turn_step(level);
                if matches!(command, Command::TurnRight(_)) {
                    angle = -angle;
                }
                self.truth.rotate_by(angle);
                self.add_ticks(self.geometry.ticks_for_turn(angle));
            }
        }
        Ok(())
    }

    fn obstacle_detected(&self) -> bool {
        self.obstacle
    }
}
