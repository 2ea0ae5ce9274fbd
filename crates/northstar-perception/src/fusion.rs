//! Pose fusion: the only writer of the pose of record.
//!
//! Every tick the dead-reckoning delta is applied first (*predict*), then a
//! beacon fix, if the tick produced one, pulls the estimate back towards the
//! absolute reading (*correct*).  Two policies are available:
//!
//! - [`FusionMode::Kalman`] keeps a scalar variance for position and one for
//!   heading.  Odometry grows them in proportion to distance and angle
//!   travelled; a beacon fix shrinks them with the gain `k = P / (P + R)`.
//! - [`FusionMode::Absolute`] snaps to every valid fix and bridges the gaps
//!   with dead reckoning.
//!
//! Heading corrections are applied as a rotation by the wrapped difference,
//! never by averaging raw angles, so the 0/2π seam is handled and the
//! revolution counter stays continuous.
//!
//! # Example
//!
//! ```rust
//! use northstar_perception::beacon::BeaconFix;
//! use northstar_perception::fusion::{FusionConfig, PoseFusion};
//! use northstar_types::{Pose, PoseDelta};
//!
//! let mut fusion = PoseFusion::new(FusionConfig::default(), Pose::default());
//!
//! // Wheels say 10 cm forward, beacon says 12 cm.
//! let fix = BeaconFix { x: 12.0, y: 0.0, theta: 0.0, room: 2 };
//! let pose = fusion.fuse(PoseDelta::new(10.0, 0.0, 0.0), Some(&fix));
//!
//! assert!(pose.x > 10.0 && pose.x < 12.0);
//! ```

use northstar_types::{Pose, PoseDelta, wrap_to_pi};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::beacon::BeaconFix;

// ────────────────────────────────────────────────────────────────────────────
// Configuration
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FusionMode {
    #[default]
    Kalman,
    Absolute,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FusionConfig {
    pub mode: FusionMode,
    /// Position variance at startup (cm²).
    pub initial_position_variance: f32,
    /// Heading variance at startup (rad²).
    pub initial_heading_variance: f32,
    /// Position variance added per centimetre of odometry.
    pub odometry_variance_per_cm: f32,
    /// Heading variance added per radian of odometry.
    pub odometry_variance_per_rad: f32,
    /// Measurement variance of a beacon position (cm²).
    pub beacon_position_variance: f32,
    /// Measurement variance of a beacon heading (rad²).
    pub beacon_heading_variance: f32,
    /// When `false`, heading comes from odometry alone.
    pub trust_beacon_heading: bool,
}

impl Default for FusionConfig {
    fn default() -> Self {
        Self {
            mode: FusionMode::Kalman,
            initial_position_variance: 1.0,
            initial_heading_variance: 0.01,
            odometry_variance_per_cm: 0.05,
            odometry_variance_per_rad: 0.02,
            beacon_position_variance: 4.0,
            beacon_heading_variance: 0.05,
            trust_beacon_heading: true,
        }
    }
}

// ────────────────────────────────────────────────────────────────────────────
// PoseFusion
// ────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Clone)]
pub struct PoseFusion {
    config: FusionConfig,
    pose: Pose,
    position_variance: f32,
    heading_variance: f32,
}

impl PoseFusion {
    pub fn new(config: FusionConfig, start: Pose) -> Self {
        Self {
            config,
            pose: start,
            position_variance: config.initial_position_variance,
            heading_variance: config.initial_heading_variance,
        }
    }

    /// The committed pose.
    pub fn pose(&self) -> Pose {
        self.pose
    }

    pub fn position_variance(&self) -> f32 {
        self.position_variance
    }

    pub fn heading_variance(&self) -> f32 {
        self.heading_variance
    }

    /// Apply an odometry delta and grow the uncertainty accordingly.
    pub fn predict(&mut self, delta: PoseDelta) {
        self.pose.apply(delta);
        self.position_variance += self.config.odometry_variance_per_cm * delta.distance();
        self.heading_variance += self.config.odometry_variance_per_rad * delta.dtheta.abs();
    }

    /// Pull the estimate towards an absolute fix.
    pub fn correct(&mut self, fix: &BeaconFix) {
        let (kp, kh) = match self.config.mode {
            FusionMode::Absolute => (1.0, 1.0),
            FusionMode::Kalman => (
                gain(self.position_variance, self.config.beacon_position_variance),
                gain(self.heading_variance, self.config.beacon_heading_variance),
            ),
        };

        self.pose.x += kp * (fix.x - self.pose.x);
        self.pose.y += kp * (fix.y - self.pose.y);
        self.position_variance = match self.config.mode {
            FusionMode::Absolute => self.config.beacon_position_variance,
            FusionMode::Kalman => (1.0 - kp) * self.position_variance,
        };

        if self.config.trust_beacon_heading {
            let innovation = wrap_to_pi(fix.theta - self.pose.theta());
            self.pose.rotate_by(kh * innovation);
            self.heading_variance = match self.config.mode {
                FusionMode::Absolute => self.config.beacon_heading_variance,
                FusionMode::Kalman => (1.0 - kh) * self.heading_variance,
            };
        }

        debug!(
            room = fix.room,
            x = self.pose.x,
            y = self.pose.y,
            theta = self.pose.theta(),
            position_gain = kp,
            "beacon correction"
        );
    }

    /// One full fusion step; returns the newly committed pose.
    pub fn fuse(&mut self, delta: PoseDelta, fix: Option<&BeaconFix>) -> Pose {
        self.predict(delta);
        if let Some(fix) = fix {
            self.correct(fix);
        }
        self.pose
    }
}

fn gain(prior: f32, measurement: f32) -> f32 {
    let total = prior + measurement;
    if total <= f32::EPSILON { 1.0 } else { prior / total }
}
