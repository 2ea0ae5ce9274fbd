//! [`Navigator`] – drives maneuvers tick by tick.
//!
//! A maneuver alternates one sensing tick ([`Robot::update`]) with one control
//! decision ([`MotionController::step`]) until the controller reports
//! arrival.  It ends early when:
//!
//! - the abort flag is raised (checked between ticks, never mid-tick; the
//!   flag is consumed, so the next maneuver starts normally),
//! - more consecutive ticks than `max_stale_ticks` fail to refresh the pose,
//! - the tick budget runs out,
//! - or a fatal error (unknown room, command failure) surfaces.
//!
//! A stale tick is otherwise tolerated: control runs on the last committed
//! pose.
//!
//! # Example
//!
//! ```rust
//! use northstar_runtime::{Navigator, Robot, RobotConfig, sim::SimRobot};
//! use northstar_types::Pose;
//!
//! let config = RobotConfig::default();
//! let sim = SimRobot::from_config(&config, Pose::default()).unwrap();
//! let mut nav = Navigator::new(Robot::new(sim, &config, Pose::default()).unwrap(), &config);
//!
//! nav.robot_mut().prefill().unwrap();
//! let report = nav.move_to(60.0, 0.0).unwrap();
//! assert!((report.final_pose.x - 60.0).abs() <= 10.0);
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use northstar_hal::link::HardwareLink;
use northstar_types::{NavError, Pose};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::config::RobotConfig;
use crate::guidance::{PathPlanner, VisionSource};
use crate::motion::{Goal, MotionController, MotionState, Tolerance};
use crate::robot::Robot;
use crate::stale_guard::StaleGuard;

/// Summary of one completed maneuver.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ManeuverReport {
    pub goal: Goal,
    /// Ticks run, including the final arrival tick.
    pub ticks: u32,
    /// Commands actually sent to the link.
    pub commands: u32,
    /// Ticks that ran on a stale pose.
    pub stale_ticks: u32,
    pub final_pose: Pose,
}

pub struct Navigator<L: HardwareLink> {
    robot: Robot<L>,
    motion: MotionController,
    stale: StaleGuard,
    max_ticks: u32,
    abort: Arc<AtomicBool>,
    vision: Option<Box<dyn VisionSource>>,
}

impl<L: HardwareLink> Navigator<L> {
    pub fn new(robot: Robot<L>, config: &RobotConfig) -> Self {
        Self {
            robot,
            motion: MotionController::new(config.motion, config.pid.distance, config.pid.heading),
            stale: StaleGuard::new(config.max_stale_ticks),
            max_ticks: config.max_ticks_per_maneuver,
            abort: Arc::new(AtomicBool::new(false)),
            vision: None,
        }
    }

    /// Attach a corridor-centering source for `move_to` maneuvers.
    pub fn with_vision(mut self, vision: Box<dyn VisionSource>) -> Self {
        self.vision = Some(vision);
        self
    }

    /// Flag that aborts the running maneuver at the next tick boundary.
    /// Raising it from another thread (e.g. a Ctrl-C handler) is safe.
    pub fn abort_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.abort)
    }

    pub fn robot(&self) -> &Robot<L> {
        &self.robot
    }

    pub fn robot_mut(&mut self) -> &mut Robot<L> {
        &mut self.robot
    }

    pub fn motion_state(&self) -> MotionState {
        self.motion.state()
    }

    /// Drive to `(x, y)` with the configured tolerances.
    ///
    /// # Errors
    ///
    /// [`NavError::Aborted`], [`NavError::StalePose`],
    /// [`NavError::TickBudgetExceeded`] or any fatal error from the robot.
    pub fn move_to(&mut self, x: f32, y: f32) -> Result<ManeuverReport, NavError> {
        let tolerance = Tolerance::from(self.motion.config());
        self.move_to_within(x, y, tolerance)
    }

    /// Drive to `(x, y)`, arriving inside `tolerance`.
    ///
    /// # Errors
    ///
    /// [`NavError::Config`] for a non-positive tolerance, otherwise as for
    /// [`Navigator::move_to`].
    #[instrument(skip(self))]
    pub fn move_to_within(
        &mut self,
        x: f32,
        y: f32,
        tolerance: Tolerance,
    ) -> Result<ManeuverReport, NavError> {
        self.run(Goal::Position { x, y }, tolerance)
    }

    /// Turn in place to the absolute heading `theta`.
    ///
    /// # Errors
    ///
    /// As for [`Navigator::move_to`].
    pub fn turn_to(&mut self, theta: f32) -> Result<ManeuverReport, NavError> {
        let heading = self.motion.config().heading_tolerance;
        self.turn_to_within(theta, heading)
    }

    /// Turn in place to `theta`, stopping within `heading_tolerance` rad.
    ///
    /// # Errors
    ///
    /// As for [`Navigator::move_to_within`].
    #[instrument(skip(self))]
    pub fn turn_to_within(
        &mut self,
        theta: f32,
        heading_tolerance: f32,
    ) -> Result<ManeuverReport, NavError> {
        let tolerance = Tolerance {
            distance: self.motion.config().distance_tolerance,
            heading: heading_tolerance,
        };
        self.run(Goal::Heading(theta), tolerance)
    }

    /// Visit every waypoint `planner` hands out, each as its own `move_to`.
    ///
    /// # Errors
    ///
    /// Stops at the first failed maneuver.
    pub fn follow(&mut self, planner: &mut dyn PathPlanner) -> Result<Vec<ManeuverReport>, NavError> {
        let mut reports = Vec::new();
        while let Some((x, y)) = planner.next_waypoint(&self.robot.pose()) {
            info!(x, y, leg = reports.len() + 1, "next waypoint");
            reports.push(self.move_to(x, y)?);
        }
        Ok(reports)
    }

    fn run(&mut self, goal: Goal, tolerance: Tolerance) -> Result<ManeuverReport, NavError> {
        if !tolerance.is_valid() {
            return Err(NavError::Config(format!(
                "tolerance {tolerance:?} must be finite and positive"
            )));
        }
        self.motion.begin_within(goal, tolerance);
        self.stale.reset();

        let mut commands = 0;
        let mut stale_ticks = 0;

        for tick in 1..=self.max_ticks {
            if self.abort.swap(false, Ordering::SeqCst) {
                info!(tick, "maneuver aborted");
                return Err(NavError::Aborted);
            }

            match self.robot.update() {
                Ok(_) => self.stale.record_fresh(),
                Err(e) if e.is_transient() => {
                    stale_ticks += 1;
                    if self.stale.record_stale() {
                        return Err(NavError::StalePose {
                            consecutive: self.stale.consecutive(),
                        });
                    }
                }
                Err(e) => return Err(e),
            }

            let pose = self.robot.pose();
            let cue = match (&goal, self.vision.as_mut()) {
                (Goal::Position { .. }, Some(vision)) => vision.cue(),
                _ => None,
            };

            match self.motion.step(&pose, cue.as_ref()) {
                Some(command) => {
                    if self.robot.issue(command)? {
                        commands += 1;
                    }
                }
                None => {
                    return Ok(ManeuverReport {
                        goal,
                        ticks: tick,
                        commands,
                        stale_ticks,
                        final_pose: pose,
                    });
                }
            }
        }

        Err(NavError::TickBudgetExceeded {
            ticks: self.max_ticks,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::guidance::{CorridorCue, WaypointQueue};
    use crate::sim::SimRobot;
    use std::f32::consts::FRAC_PI_2;

    fn config() -> RobotConfig {
        let mut cfg = RobotConfig::default();
        cfg.filters.beacon_x = vec![1.0];
        cfg.filters.beacon_y = vec![1.0];
        cfg.prefill_cycles = 2;
        cfg
    }

    fn navigator(cfg: &RobotConfig) -> Navigator<SimRobot> {
        let sim = SimRobot::from_config(cfg, Pose::default()).unwrap();
        let mut nav = Navigator::new(Robot::new(sim, cfg, Pose::default()).unwrap(), cfg);
        nav.robot_mut().prefill().unwrap();
        nav
    }

    #[test]
    fn turn_to_only_turns() {
        let cfg = config();
        let mut nav = navigator(&cfg);
        let report = nav.turn_to(FRAC_PI_2).unwrap();
        assert!((report.final_pose.theta() - FRAC_PI_2).abs() <= 0.1 + 1e-3);
        assert!(
            nav.robot()
                .link()
                .commands()
                .iter()
                .all(|c| matches!(c, northstar_types::Command::TurnLeft(_)))
        );
    }

    #[test]
    fn raised_abort_stops_before_first_tick() {
        let cfg = config();
        let mut nav = navigator(&cfg);
        nav.abort_handle().store(true, Ordering::SeqCst);
        assert_eq!(nav.move_to(100.0, 0.0), Err(NavError::Aborted));
        assert!(nav.robot().link().commands().is_empty());
    }

    #[test]
    fn abort_is_consumed_by_the_maneuver_it_stops() {
        let cfg = config();
        let mut nav = navigator(&cfg);
        let abort = nav.abort_handle();

        abort.store(true, Ordering::SeqCst);
        assert_eq!(nav.move_to(100.0, 0.0), Err(NavError::Aborted));
        assert!(!abort.load(Ordering::SeqCst));

        let report = nav.move_to(50.0, 0.0).unwrap();
        assert!(report.final_pose.distance_to(&Pose::new(50.0, 0.0, 0.0)) <= 10.0);
        assert_eq!(nav.motion_state(), MotionState::Arrived);
    }

    #[test]
    fn turn_to_within_uses_the_given_window() {
        let cfg = config();
        let mut nav = navigator(&cfg);
        // Already inside a 0.5 rad window: nothing to do.
        let report = nav.turn_to_within(0.3, 0.5).unwrap();
        assert_eq!(report.ticks, 1);
        assert_eq!(report.commands, 0);
    }

    #[test]
    fn invalid_tolerance_is_rejected() {
        let cfg = config();
        let mut nav = navigator(&cfg);
        let bad = Tolerance { distance: -1.0, heading: 0.1 };
        assert!(matches!(nav.move_to_within(10.0, 0.0, bad), Err(NavError::Config(_))));
        assert!(nav.robot().link().commands().is_empty());
    }

    #[test]
    fn tick_budget_bounds_the_loop() {
        let mut cfg = config();
        cfg.max_ticks_per_maneuver = 3;
        let mut nav = navigator(&cfg);
        assert_eq!(
            nav.move_to(300.0, 0.0),
            Err(NavError::TickBudgetExceeded { ticks: 3 })
        );
        assert_eq!(nav.robot().link().commands().len(), 3);
    }

    #[test]
    fn follow_visits_every_waypoint() {
        let cfg = config();
        let mut nav = navigator(&cfg);
        let mut plan = WaypointQueue::new([(60.0, 0.0), (60.0, 60.0)]);
        let reports = nav.follow(&mut plan).unwrap();
        assert_eq!(reports.len(), 2);
        let last = reports[1].final_pose;
        assert!((last.x - 60.0).abs() <= 10.0 + 1.0);
        assert!((last.y - 60.0).abs() <= 10.0 + 1.0);
    }

    struct SteerRight;

    impl VisionSource for SteerRight {
        fn cue(&mut self) -> Option<CorridorCue> {
            Some(CorridorCue::new(-1.0, false, 1.0))
        }
    }

    #[test]
    fn vision_cue_steers_move_to() {
        let mut cfg = config();
        cfg.max_ticks_per_maneuver = 1;
        let mut nav = navigator(&cfg).with_vision(Box::new(SteerRight));
        let _ = nav.move_to(100.0, 0.0);
        assert!(matches!(
            nav.robot().link().commands()[0],
            northstar_types::Command::TurnRight(_)
        ));
    }
}
