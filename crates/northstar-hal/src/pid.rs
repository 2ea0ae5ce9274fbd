//! Discrete PID (Proportional–Integral–Derivative) controller.
//!
//! The controller is fed an *error* once per control tick and returns
//!
//! ```text
//! output = kp * error + ki * Σerror + kd * (error − previous_error)
//! ```
//!
//! There is no time step: the loop runs at whatever rate the hardware link
//! answers, so the integral and derivative are per-tick quantities.  Output is
//! never clamped; callers map it to a hardware speed level.
//!
//! # Example
//!
//! ```rust
//! use northstar_hal::pid::{PidController, PidGains};
//!
//! let mut pid = PidController::new(PidGains { kp: 1.0, ki: 0.0, kd: 0.5 });
//! let first = pid.update(10.0);
//! assert!((first - 15.0).abs() < 1e-6); // 10 + 0.5 * (10 - 0)
//!
//! pid.flush(); // new control epoch
//! assert!((pid.update(10.0) - first).abs() < 1e-6);
//! ```

use serde::{Deserialize, Serialize};

/// Proportional, integral and derivative gains.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PidGains {
    pub kp: f32,
    pub ki: f32,
    pub kd: f32,
}

impl Default for PidGains {
    fn default() -> Self {
        Self {
            kp: 1.0,
            ki: 0.001,
            kd: 1.0,
        }
    }
}

/// A tunable PID controller for closed-loop feedback control.
#[derive(Debug, Clone)]
pub struct PidController {
    gains: PidGains,
    integral: f32,
    last_error: f32,
}

impl PidController {
    pub fn new(gains: PidGains) -> Self {
        Self {
            gains,
            integral: 0.0,
            last_error: 0.0,
        }
    }

    /// Feed one error sample and return the controller output.
    pub fn update(&mut self, error: f32) -> f32 {
        self.integral += error;
        let derivative = error - self.last_error;
        self.last_error = error;

        self.gains.kp * error + self.gains.ki * self.integral + self.gains.kd * derivative
    }

    /// Zero the integral and the previous error.  Call at the start of every
    /// independent control epoch so wind-up does not carry into the next goal.
    pub fn flush(&mut self) {
        self.integral = 0.0;
        self.last_error = 0.0;
    }

    /// Accumulated error since the last flush.
    pub fn integral(&self) -> f32 {
        self.integral
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gains(kp: f32, ki: f32, kd: f32) -> PidGains {
        PidGains { kp, ki, kd }
    }

    #[test]
    fn proportional_only() {
        let mut pid = PidController::new(gains(2.0, 0.0, 0.0));
        assert!((pid.update(10.0) - 20.0).abs() < 1e-4);
        assert!(pid.update(0.0).abs() < 1e-6);
    }

    #[test]
    fn integral_accumulates_every_call() {
        let mut pid = PidController::new(gains(0.0, 1.0, 0.0));
        pid.update(1.0);
        pid.update(2.0);
        let out = pid.update(3.0);
        assert!((out - 6.0).abs() < 1e-6);
        assert!((pid.integral() - 6.0).abs() < 1e-6);
    }

    #[test]
    fn derivative_uses_previous_error() {
        let mut pid = PidController::new(gains(0.0, 0.0, 1.0));
        // First call differences against zero.
        assert!((pid.update(4.0) - 4.0).abs() < 1e-6);
        assert!((pid.update(1.0) + 3.0).abs() < 1e-6);
    }

    #[test]
    fn output_is_never_clamped() {
        let mut pid = PidController::new(gains(100.0, 0.0, 0.0));
        assert_eq!(pid.update(1.0), 100.0);
        assert_eq!(pid.update(-1e6), -1e8);
    }

    #[test]
    fn flush_matches_fresh_controller() {
        let g = gains(1.0, 0.5, 0.25);
        let mut pid = PidController::new(g);
        for e in [5.0, -3.0, 8.0, 2.5] {
            pid.update(e);
        }
        pid.flush();

        let mut fresh = PidController::new(g);
        for e in [3.0, 1.0, -2.0] {
            assert_eq!(pid.update(e), fresh.update(e));
        }
    }
}
