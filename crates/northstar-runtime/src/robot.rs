//! [`Robot`] – one sensing tick, in strict order.
//!
//! ```text
//! poll (bounded retry) → beacon fix (strength-gated, filtered)
//!                      → filter wheel ticks → dead-reckoning delta
//!                      → fusion commits the pose
//! ```
//!
//! The committed pose only changes when a tick completes.  A tick whose poll
//! exhausts the fail limit returns [`NavError::LinkFailure`] and leaves the
//! previous pose in place; the caller decides whether to carry on with it.
//! The beacon is checked before any wheel state moves, so a fatal beacon
//! error leaves the wheel filters and dead reckoning untouched.

use northstar_hal::link::{HardwareLink, poll_with_retry};
use northstar_perception::beacon::{BeaconFix, BeaconLocalizer};
use northstar_perception::filter::FirFilter;
use northstar_perception::fusion::PoseFusion;
use northstar_perception::odometry::{DeadReckoning, WheelGeometry};
use northstar_perception::room::RoomTable;
use northstar_types::{Command, NavError, Pose, WheelId, WheelTicks};
use tracing::{debug, instrument, warn};

use crate::config::RobotConfig;

/// Left, right and rear wheel filters.
#[derive(Debug, Clone)]
struct WheelFilters([FirFilter; 3]);

impl WheelFilters {
    fn new(coefficients: &[f32]) -> Result<Self, NavError> {
        Ok(Self([
            FirFilter::new("wheel_left", coefficients.to_vec())?,
            FirFilter::new("wheel_right", coefficients.to_vec())?,
            FirFilter::new("wheel_rear", coefficients.to_vec())?,
        ]))
    }

    fn filter<L: HardwareLink + ?Sized>(&mut self, link: &L) -> WheelTicks {
        let [left, right, rear] = &mut self.0;
        WheelTicks::new(
            left.filter(link.wheel_ticks(WheelId::Left) as f32),
            right.filter(link.wheel_ticks(WheelId::Right) as f32),
            rear.filter(link.wheel_ticks(WheelId::Rear) as f32),
        )
    }
}

pub struct Robot<L: HardwareLink> {
    link: L,
    fail_limit: u32,
    prefill_cycles: u32,
    geometry: WheelGeometry,
    wheels: WheelFilters,
    dead_reckoning: DeadReckoning,
    localizer: BeaconLocalizer,
    fusion: PoseFusion,
    last_fix: Option<BeaconFix>,
    ticks: u64,
}

impl<L: HardwareLink> Robot<L> {
    /// Assemble the sensing pipeline around `link`, starting at `start`.
    ///
    /// # Errors
    ///
    /// Returns the first configuration problem found (see
    /// [`RobotConfig::validate`]).
    pub fn new(link: L, config: &RobotConfig, start: Pose) -> Result<Self, NavError> {
        config.validate()?;
        let rooms = RoomTable::new(config.rooms.clone())?;
        let localizer = BeaconLocalizer::new(
            rooms,
            config.filters.beacon_x.clone(),
            config.filters.beacon_y.clone(),
            config.min_beacon_strength,
        )?;

        Ok(Self {
            link,
            fail_limit: config.fail_limit,
            prefill_cycles: config.prefill_cycles,
            geometry: config.geometry,
            wheels: WheelFilters::new(&config.filters.wheel)?,
            dead_reckoning: DeadReckoning::new(config.geometry, start),
            localizer,
            fusion: PoseFusion::new(config.fusion, start),
            last_fix: None,
            ticks: 0,
        })
    }

    /// Run one sensing tick and return the newly committed pose.
    ///
    /// # Errors
    ///
    /// - [`NavError::LinkFailure`] when the poll exhausted the fail limit; the
    ///   pose is unchanged (stale).
    /// - [`NavError::UnknownRoom`] when the beacon names an uncalibrated room.
    #[instrument(skip(self), fields(tick = self.ticks))]
    pub fn update(&mut self) -> Result<Pose, NavError> {
        poll_with_retry(&mut self.link, self.fail_limit)?;

        let reading = self.link.beacon();
        let fix = self.localizer.observe(&reading)?;
        if fix.is_some() {
            self.last_fix = fix;
        }

        let ticks = self.wheels.filter(&self.link);
        self.dead_reckoning.integrate(ticks);
        let delta = self.geometry.delta(self.fusion.pose().theta(), ticks);

        let pose = self.fusion.fuse(delta, fix.as_ref());
        self.ticks += 1;
        debug!(
            x = pose.x,
            y = pose.y,
            theta = pose.theta(),
            beacon = fix.is_some(),
            "pose committed"
        );
        Ok(pose)
    }

    /// Run `prefill_cycles` sensing ticks without issuing any command so that
    /// every filter window holds real samples before control starts.
    ///
    /// # Errors
    ///
    /// Propagates the first failed tick.
    pub fn prefill(&mut self) -> Result<Pose, NavError> {
        for _ in 0..self.prefill_cycles {
            self.update()?;
        }
        if !self.localizer.is_primed() {
            warn!(
                cycles = self.prefill_cycles,
                "prefill finished without a usable beacon fix"
            );
        }
        Ok(self.pose())
    }

    /// Send `command`, unless it is a forward command and the link reports an
    /// obstacle.  Returns whether the command was sent.
    ///
    /// # Errors
    ///
    /// Propagates [`NavError::HardwareFault`] from the link.
    pub fn issue(&mut self, command: Command) -> Result<bool, NavError> {
        if matches!(command, Command::Forward(_)) && self.link.obstacle_detected() {
            warn!(?command, "obstacle ahead; forward command suppressed");
            return Ok(false);
        }
        self.link.issue(command)?;
        Ok(true)
    }

    /// The pose of record.
    pub fn pose(&self) -> Pose {
        self.fusion.pose()
    }

    /// Wheel-only estimate, for diagnostics.  Never feeds control.
    pub fn dead_reckoning_pose(&self) -> Pose {
        self.dead_reckoning.pose()
    }

    /// Most recent usable beacon fix.
    pub fn last_fix(&self) -> Option<BeaconFix> {
        self.last_fix
    }

    /// Completed sensing ticks.
    pub fn ticks(&self) -> u64 {
        self.ticks
    }

    pub fn link(&self) -> &L {
        &self.link
    }

    pub fn link_mut(&mut self) -> &mut L {
        &mut self.link
    }
}
