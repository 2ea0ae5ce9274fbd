//! `northstar-runtime` – the control loop.
//!
//! Wires the sensing pipeline from `northstar-perception` to a
//! [`HardwareLink`][northstar_hal::HardwareLink] and closes the loop with the
//! motion controller.  Everything runs on the caller's thread: one blocking
//! poll, then filtering, fusion and one control decision per tick.
//!
//! # Modules
//!
//! - [`config`] – [`RobotConfig`]: calibration and tuning, loaded from
//!   `~/.northstar/config.toml` with `NORTHSTAR_*` overrides.
//! - [`robot`] – [`Robot`]: one sensing tick (poll → filter → dead reckoning
//!   and beacon → fusion) plus prefill and the obstacle interlock.
//! - [`motion`] – [`MotionController`]: the COMPUTE_ERROR / TURNING /
//!   DRIVING / ARRIVED state machine driving two PID controllers.
//! - [`navigator`] – [`Navigator`]: `move_to`, `turn_to` and `follow`, with
//!   abort, tick-budget and stale-pose handling.
//! - [`stale_guard`] – [`StaleGuard`][stale_guard::StaleGuard]: counts
//!   consecutive ticks that ran on a stale pose.
//! - [`guidance`] – the vision and path-planning collaborator traits and
//!   [`WaypointQueue`][guidance::WaypointQueue].
//! - [`sim`] – [`SimRobot`][sim::SimRobot]: a noiseless simulated link.
//! - [`telemetry`] – [`init_tracing`]: `tracing` subscriber with optional
//!   OTLP export.

pub mod config;
pub mod guidance;
pub mod motion;
pub mod navigator;
pub mod robot;
pub mod sim;
pub mod stale_guard;
pub mod telemetry;

pub use config::RobotConfig;
pub use guidance::{CorridorCue, PathPlanner, VisionSource, WaypointQueue};
pub use motion::{Goal, MotionConfig, MotionController, MotionState, Tolerance};
pub use navigator::{ManeuverReport, Navigator};
pub use robot::Robot;
pub use telemetry::{TracerProviderGuard, init_tracing};
