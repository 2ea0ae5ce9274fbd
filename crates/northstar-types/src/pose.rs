//! Planar pose with a revolution counter, plus the angle helpers every layer
//! shares.
//!
//! Heading is stored normalised to `[0, 2π)`.  Full turns are tracked
//! separately in a signed revolution counter so that
//! `rotations * 2π + theta` grows (or shrinks) continuously while the robot
//! keeps turning in one direction.
//!
//! # Example
//!
//! ```rust
//! use std::f32::consts::TAU;
//! use northstar_types::Pose;
//!
//! let mut pose = Pose::new(0.0, 0.0, TAU - 0.1);
//! pose.rotate_by(0.2);
//!
//! assert!((pose.theta() - 0.1).abs() < 1e-5);
//! assert_eq!(pose.rotations(), 1);
//! ```

use std::f32::consts::{PI, TAU};

use serde::{Deserialize, Serialize};

/// Normalise `theta` into `[0, 2π)`.
///
/// Idempotent for every finite input.
pub fn normalize_angle(theta: f32) -> f32 {
    let r = theta.rem_euclid(TAU);
    // rem_euclid rounds up to exactly TAU for tiny negative inputs.
    if r >= TAU { 0.0 } else { r }
}

/// Wrap `theta` into `[-π, π)`.
pub fn wrap_to_pi(theta: f32) -> f32 {
    normalize_angle(theta + PI) - PI
}

// ────────────────────────────────────────────────────────────────────────────
// PoseDelta
// ────────────────────────────────────────────────────────────────────────────

/// An incremental pose change expressed in the global frame (cm, radians).
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PoseDelta {
    pub dx: f32,
    pub dy: f32,
    pub dtheta: f32,
}

impl PoseDelta {
    pub fn new(dx: f32, dy: f32, dtheta: f32) -> Self {
        Self { dx, dy, dtheta }
    }

    /// Planar length of the translation part.
    pub fn distance(&self) -> f32 {
        self.dx.hypot(self.dy)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// Pose
// ────────────────────────────────────────────────────────────────────────────

/// Robot pose in the global frame.
///
/// `x`/`y` are centimetres.  The heading is only reachable through
/// [`Pose::theta`] and the mutators below, which keep it normalised and keep
/// the revolution counter in step.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub x: f32,
    pub y: f32,
    theta: f32,
    rotations: i32,
}

impl Pose {
    /// Build a pose whose unwrapped heading equals `theta`.
    pub fn new(x: f32, y: f32, theta: f32) -> Self {
        let mut pose = Self {
            x,
            y,
            theta: 0.0,
            rotations: 0,
        };
        pose.rotate_by(theta);
        pose
    }

    /// Heading in `[0, 2π)`.
    pub fn theta(&self) -> f32 {
        self.theta
    }

    /// Signed count of completed revolutions.
    pub fn rotations(&self) -> i32 {
        self.rotations
    }

    /// `rotations * 2π + theta`.
    pub fn unwrapped_theta(&self) -> f32 {
        self.rotations as f32 * TAU + self.theta
    }

    pub fn translate(&mut self, dx: f32, dy: f32) {
        self.x += dx;
        self.y += dy;
    }

    /// Turn by `delta` radians, counting every crossing of the 0/2π seam.
    pub fn rotate_by(&mut self, delta: f32) {
        let raw = self.theta + delta;
        let whole = (raw / TAU).floor();
        let mut theta = raw - whole * TAU;
        let mut turns = whole as i32;

        if theta < 0.0 {
            theta += TAU;
            turns -= 1;
        }
        if theta >= TAU {
            theta -= TAU;
            turns += 1;
        }

        self.theta = theta;
        self.rotations += turns;
    }

    /// Move the heading to the absolute angle `theta` along the shortest arc,
    /// so the revolution counter stays continuous.
    pub fn set_heading(&mut self, theta: f32) {
        self.rotate_by(wrap_to_pi(theta - self.theta));
    }

    /// Apply an incremental change.
    pub fn apply(&mut self, delta: PoseDelta) {
        self.translate(delta.dx, delta.dy);
        self.rotate_by(delta.dtheta);
    }

    /// The change that carries `self` onto `other`.  The heading component is
    /// the shortest signed arc.
    pub fn difference(&self, other: &Pose) -> PoseDelta {
        PoseDelta {
            dx: other.x - self.x,
            dy: other.y - self.y,
            dtheta: wrap_to_pi(other.theta - self.theta),
        }
    }

    /// Euclidean distance between the two positions.
    pub fn distance_to(&self, other: &Pose) -> f32 {
        (other.x - self.x).hypot(other.y - self.y)
    }

    /// Bearing from this position to `(x, y)`, in `(-π, π]`.
    pub fn bearing_to(&self, x: f32, y: f32) -> f32 {
        (y - self.y).atan2(x - self.x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_lands_in_range_and_is_idempotent() {
        for &theta in &[-100.0_f32, -TAU, -PI, -1e-9, 0.0, 1e-9, 3.0, TAU, 7.5, 1234.5] {
            let n = normalize_angle(theta);
            assert!((0.0..TAU).contains(&n), "{theta} -> {n}");
            assert_eq!(normalize_angle(n), n);
        }
    }

    #[test]
    fn wrap_to_pi_is_half_open() {
        assert!((wrap_to_pi(PI) + PI).abs() < 1e-6);
        assert!((wrap_to_pi(-PI) + PI).abs() < 1e-6);
        assert!((wrap_to_pi(TAU + 0.5) - 0.5).abs() < 1e-5);
        assert!((wrap_to_pi(-0.5) + 0.5).abs() < 1e-6);
    }

    #[test]
    fn rotation_count_tracks_wraps_in_one_direction() {
        let mut pose = Pose::new(0.0, 0.0, 0.05);
        let step = TAU / 10.0;
        let mut last = pose.unwrapped_theta();
        for _ in 0..30 {
            pose.rotate_by(step);
            let now = pose.unwrapped_theta();
            assert!(now > last);
            last = now;
        }
        assert_eq!(pose.rotations(), 3);
        assert!((pose.theta() - 0.05).abs() < 1e-3);
    }

    #[test]
    fn rotation_count_goes_negative_when_turning_clockwise() {
        let mut pose = Pose::new(0.0, 0.0, 0.05);
        let mut last = pose.unwrapped_theta();
        for _ in 0..20 {
            pose.rotate_by(-TAU / 10.0);
            assert!(pose.unwrapped_theta() < last);
            last = pose.unwrapped_theta();
        }
        assert_eq!(pose.rotations(), -2);
    }

    #[test]
    fn set_heading_takes_shortest_arc_across_the_seam() {
        let mut pose = Pose::new(0.0, 0.0, TAU - 0.05);
        pose.set_heading(0.05);
        assert_eq!(pose.rotations(), 1);
        assert!((pose.theta() - 0.05).abs() < 1e-5);
    }

    #[test]
    fn difference_is_pure_and_wraps_heading() {
        let a = Pose::new(1.0, 2.0, 0.1);
        let b = Pose::new(4.0, 6.0, TAU - 0.1);
        let d = a.difference(&b);
        assert!((d.dx - 3.0).abs() < 1e-6);
        assert!((d.dy - 4.0).abs() < 1e-6);
        assert!((d.dtheta + 0.2).abs() < 1e-5);
        assert!((d.distance() - 5.0).abs() < 1e-6);
        assert!((a.distance_to(&b) - 5.0).abs() < 1e-6);
        // Neither operand changed.
        assert_eq!(a, Pose::new(1.0, 2.0, 0.1));
    }

    #[test]
    fn bearing_handles_vertical_targets() {
        let pose = Pose::default();
        assert!((pose.bearing_to(0.0, 10.0) - PI / 2.0).abs() < 1e-6);
        assert!((pose.bearing_to(0.0, -10.0) + PI / 2.0).abs() < 1e-6);
        assert!((pose.bearing_to(-10.0, 0.0) - PI).abs() < 1e-6);
    }
}
