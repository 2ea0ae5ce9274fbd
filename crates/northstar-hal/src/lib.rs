//! `northstar-hal` – the boundary between control code and the robot.
//!
//! # Modules
//!
//! - [`link`] – [`HardwareLink`][link::HardwareLink]: the poll / query /
//!   command contract a robot driver implements, plus
//!   [`poll_with_retry`][link::poll_with_retry] which bounds how many times a
//!   single tick may retry an unresponsive link.
//! - [`pid`] – [`PidController`][pid::PidController]: a discrete PID
//!   controller used for both distance and heading regulation.

pub mod link;
pub mod pid;

pub use link::{HardwareLink, poll_with_retry};
pub use pid::{PidController, PidGains};
