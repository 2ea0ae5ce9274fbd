//! Dead reckoning from three omni-wheel tick deltas.
//!
//! The two driving wheels sit at ±`mount_angle_deg` from the robot's forward
//! axis; the rear wheel's drive direction is lateral.  Sign convention: both
//! driving wheels count up when the robot drives forward, and a
//! counter-clockwise turn in place counts the left wheel down and the right
//! and rear wheels up by the same amount.
//!
//! Per poll:
//!
//! ```text
//! forward = (left + right) / (2 cos m)
//! lateral = (2 rear + left − right) / (2 (1 + sin m))
//! dθ      = (−left + right + rear) / (π · diameter_ticks)
//! ```
//!
//! The robot-frame motion is rotated into the global frame at the mid-point
//! heading `θ + dθ / 2`.  [`DeadReckoning`] accumulates these deltas with no
//! absolute correction, so its pose drifts with distance travelled.

use std::f32::consts::PI;

use northstar_types::{Pose, PoseDelta, WheelTicks};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// WheelGeometry
// ────────────────────────────────────────────────────────────────────────────

/// Fixed drive-base constants.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelGeometry {
    /// Wheel-encoder ticks per centimetre of wheel travel.
    pub ticks_per_cm: f32,
    /// Wheel-to-wheel diameter of the base (cm).
    pub robot_diameter_cm: f32,
    /// Angle between each driving wheel and the forward axis (degrees).
    pub mount_angle_deg: f32,
}

impl Default for WheelGeometry {
    fn default() -> Self {
        Self {
            ticks_per_cm: 4.0,
            robot_diameter_cm: 29.0,
            mount_angle_deg: 30.0,
        }
    }
}

impl WheelGeometry {
    pub fn ticks_to_cm(&self, ticks: f32) -> f32 {
        ticks / self.ticks_per_cm
    }

    pub fn cm_to_ticks(&self, cm: f32) -> f32 {
        cm * self.ticks_per_cm
    }

    /// Base diameter expressed in wheel ticks.
    pub fn diameter_ticks(&self) -> f32 {
        self.cm_to_ticks(self.robot_diameter_cm)
    }

    /// Robot-frame `(forward_cm, lateral_cm, dtheta)` for one set of deltas.
    pub fn local_motion(&self, ticks: WheelTicks) -> (f32, f32, f32) {
        let (sin_m, cos_m) = self.mount_angle_deg.to_radians().sin_cos();

        let forward = (ticks.left + ticks.right) / (2.0 * cos_m);
        let lateral = (2.0 * ticks.rear + ticks.left - ticks.right) / (2.0 * (1.0 + sin_m));
        let dtheta = (-ticks.left + ticks.right + ticks.rear) / (PI * self.diameter_ticks());

        (self.ticks_to_cm(forward), self.ticks_to_cm(lateral), dtheta)
    }

    /// Global-frame change for a robot currently facing `heading`.
    pub fn delta(&self, heading: f32, ticks: WheelTicks) -> PoseDelta {
        let (forward, lateral, dtheta) = self.local_motion(ticks);
        let (s, c) = (heading + dtheta / 2.0).sin_cos();
        PoseDelta {
            dx: forward * c - lateral * s,
            dy: forward * s + lateral * c,
            dtheta,
        }
    }

    /// Wheel deltas produced by driving `cm` straight ahead.
    pub fn ticks_for_forward(&self, cm: f32) -> WheelTicks {
        let w = self.cm_to_ticks(cm) * self.mount_angle_deg.to_radians().cos();
        WheelTicks::new(w, w, 0.0)
    }

    /// Wheel deltas produced by turning `radians` in place (CCW positive).
    pub fn ticks_for_turn(&self, radians: f32) -> WheelTicks {
        let k = radians * PI * self.diameter_ticks() / 3.0;
        WheelTicks::new(-k, k, k)
    }
}

// ────────────────────────────────────────────────────────────────────────────
// DeadReckoning
// ────────────────────────────────────────────────────────────────────────────

/// Running wheel-only pose estimate.
///
/// Private to the sensing pipeline: the pose of record is owned by
/// [`PoseFusion`][crate::fusion::PoseFusion].
#[derive(Debug, Clone)]
pub struct DeadReckoning {
    geometry: WheelGeometry,
    pose: Pose,
}

impl DeadReckoning {
    pub fn new(geometry: WheelGeometry, start: Pose) -> Self {
        Self {
            geometry,
            pose: start,
        }
    }

    /// Integrate one set of filtered deltas and return the change applied.
    pub fn integrate(&mut self, ticks: WheelTicks) -> PoseDelta {
        let delta = self.geometry.delta(self.pose.theta(), ticks);
        self.pose.apply(delta);
        delta
    }

    /// Accumulated wheel-only pose, including its drift.
    pub fn pose(&self) -> Pose {
        self.pose
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::FRAC_PI_2;

    #[test]
    fn equal_driving_wheels_move_straight_ahead() {
        let mut dr = DeadReckoning::new(WheelGeometry::default(), Pose::default());
        let delta = dr.integrate(WheelTicks::new(100.0, 100.0, 0.0));
        assert_eq!(delta.dy, 0.0);
        assert_eq!(delta.dtheta, 0.0);
        assert!(delta.dx > 0.0);
        // 200 / (2 cos 30°) ticks = 115.47 ticks = 28.87 cm
        assert!((delta.dx - 28.8675).abs() < 1e-3);
        assert_eq!(dr.pose().rotations(), 0);
    }

    #[test]
    fn forward_motion_follows_heading() {
        let g = WheelGeometry::default();
        let delta = g.delta(FRAC_PI_2, g.ticks_for_forward(10.0));
        assert!(delta.dx.abs() < 1e-4);
        assert!((delta.dy - 10.0).abs() < 1e-4);
    }

    #[test]
    fn turn_in_place_has_no_translation() {
        let g = WheelGeometry::default();
        let ticks = g.ticks_for_turn(0.3);
        let (forward, lateral, dtheta) = g.local_motion(ticks);
        assert!(forward.abs() < 1e-5);
        assert!(lateral.abs() < 1e-5);
        assert!((dtheta - 0.3).abs() < 1e-5);
    }

    #[test]
    fn forward_ticks_invert_to_distance() {
        let g = WheelGeometry::default();
        let (forward, lateral, dtheta) = g.local_motion(g.ticks_for_forward(42.0));
        assert!((forward - 42.0).abs() < 1e-3);
        assert!(lateral.abs() < 1e-6);
        assert!(dtheta.abs() < 1e-6);
    }

    #[test]
    fn heading_formula_uses_all_three_wheels() {
        let g = WheelGeometry::default();
        let (_, _, dtheta) = g.local_motion(WheelTicks::new(-10.0, 10.0, 10.0));
        assert!((dtheta - 30.0 / (PI * 116.0)).abs() < 1e-6);
    }

    #[test]
    fn unit_conversions_are_inverse() {
        let g = WheelGeometry::default();
        assert!((g.ticks_to_cm(g.cm_to_ticks(12.5)) - 12.5).abs() < 1e-6);
        assert!((g.diameter_ticks() - 116.0).abs() < 1e-6);
    }

    #[test]
    fn drift_accumulates_without_correction() {
        let g = WheelGeometry::default();
        let mut dr = DeadReckoning::new(g, Pose::default());
        // A small right-wheel bias bends the path.
        for _ in 0..50 {
            dr.integrate(WheelTicks::new(20.0, 21.0, 0.0));
        }
        let pose = dr.pose();
        assert!(pose.x > 0.0);
        assert!(pose.y > 0.0);
        assert!(pose.theta() > 0.0);
    }
}
