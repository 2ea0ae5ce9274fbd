//! The `HardwareLink` trait: the request/response contract with the robot.
//!
//! A driver implements this trait once; everything above it (filtering,
//! fusion, control) only ever talks to the trait, so the physical robot and
//! the simulator are interchangeable.
//!
//! Every control tick starts with [`HardwareLink::poll`].  The query accessors
//! return the values captured by the most recent *successful* poll.  Use
//! [`poll_with_retry`] to bound how long an unresponsive link can hold up a
//! tick.

use northstar_types::{BeaconReading, Command, NavError, WheelId};
use tracing::{debug, warn};

/// Blocking request/response link to the robot hardware.
pub trait HardwareLink {
    /// Refresh all sensor values from the robot.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::HardwareFault`] when the robot did not answer.
    fn poll(&mut self) -> Result<(), NavError>;

    /// Tick delta for `wheel` since the previous successful poll.
    fn wheel_ticks(&self, wheel: WheelId) -> i32;

    /// The beacon reading captured by the last successful poll.
    fn beacon(&self) -> BeaconReading;

    /// Send one primitive motion command.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::HardwareFault`] if the command could not be sent.
    fn issue(&mut self, command: Command) -> Result<(), NavError>;

    /// `true` while the forward IR sensor sees an obstacle.
    fn obstacle_detected(&self) -> bool {
        false
    }
}

/// Poll `link`, retrying up to `fail_limit` times after the first failure.
///
/// Returns the number of retries that were needed.  After `fail_limit`
/// retries have also failed, returns [`NavError::LinkFailure`]; the link is
/// never polled more than `fail_limit + 1` times per call.
pub fn poll_with_retry<L: HardwareLink + ?Sized>(
    link: &mut L,
    fail_limit: u32,
) -> Result<u32, NavError> {
    let mut retries = 0;
    loop {
        match link.poll() {
            Ok(()) => {
                if retries > 0 {
                    debug!(retries, "link recovered");
                }
                return Ok(retries);
            }
            Err(e) if retries < fail_limit => {
                retries += 1;
                warn!(error = %e, retries, fail_limit, "poll failed; retrying");
            }
            Err(e) => {
                warn!(error = %e, retries, "poll fail limit reached");
                return Err(NavError::LinkFailure { retries });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Link that fails a fixed number of polls before answering.
    struct FlakyLink {
        failures_left: u32,
        polls: u32,
    }

    impl FlakyLink {
        fn new(failures: u32) -> Self {
            Self {
                failures_left: failures,
                polls: 0,
            }
        }
    }

    impl HardwareLink for FlakyLink {
        fn poll(&mut self) -> Result<(), NavError> {
            self.polls += 1;
            if self.failures_left > 0 {
                self.failures_left -= 1;
                return Err(NavError::HardwareFault {
                    component: "link".to_string(),
                    details: "timeout".to_string(),
                });
            }
            Ok(())
        }

        fn wheel_ticks(&self, _wheel: WheelId) -> i32 {
            0
        }

        fn beacon(&self) -> BeaconReading {
            BeaconReading {
                x: 0,
                y: 0,
                theta: 0.0,
                strength: 0,
                room: 2,
            }
        }

        fn issue(&mut self, _command: Command) -> Result<(), NavError> {
            Ok(())
        }
    }

    #[test]
    fn healthy_link_needs_no_retry() {
        let mut link = FlakyLink::new(0);
        assert_eq!(poll_with_retry(&mut link, 5), Ok(0));
        assert_eq!(link.polls, 1);
    }

    #[test]
    fn recovers_within_limit() {
        let mut link = FlakyLink::new(3);
        assert_eq!(poll_with_retry(&mut link, 5), Ok(3));
        assert_eq!(link.polls, 4);
    }

    #[test]
    fn recovers_on_last_allowed_retry() {
        let mut link = FlakyLink::new(5);
        assert_eq!(poll_with_retry(&mut link, 5), Ok(5));
        assert_eq!(link.polls, 6);
    }

    #[test]
    fn dead_link_retries_exactly_fail_limit_times() {
        let mut link = FlakyLink::new(u32::MAX);
        assert_eq!(
            poll_with_retry(&mut link, 5),
            Err(NavError::LinkFailure { retries: 5 })
        );
        assert_eq!(link.polls, 6);
    }

    #[test]
    fn zero_fail_limit_polls_once() {
        let mut link = FlakyLink::new(1);
        assert_eq!(
            poll_with_retry(&mut link, 0),
            Err(NavError::LinkFailure { retries: 0 })
        );
        assert_eq!(link.polls, 1);
    }
}
