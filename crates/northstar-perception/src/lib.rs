//! `northstar-perception` – turns raw wheel ticks and beacon readings into one
//! pose estimate.
//!
//! # Modules
//!
//! - [`filter`] – [`FirFilter`][filter::FirFilter]: fixed-window weighted
//!   smoothing for one scalar channel.
//! - [`room`] – [`RoomCalibration`][room::RoomCalibration] and
//!   [`RoomTable`][room::RoomTable]: per-room mapping from beacon ticks to the
//!   global centimetre frame.
//! - [`odometry`] – [`WheelGeometry`][odometry::WheelGeometry] and
//!   [`DeadReckoning`][odometry::DeadReckoning]: three-wheel kinematics.
//! - [`beacon`] – [`BeaconLocalizer`][beacon::BeaconLocalizer]: filtered,
//!   strength-gated absolute fixes.
//! - [`fusion`] – [`PoseFusion`][fusion::PoseFusion]: blends both sources into
//!   the pose of record.

pub mod beacon;
pub mod filter;
pub mod fusion;
pub mod odometry;
pub mod room;

pub use beacon::{BeaconFix, BeaconLocalizer};
pub use filter::FirFilter;
pub use fusion::{FusionConfig, FusionMode, PoseFusion};
pub use odometry::{DeadReckoning, WheelGeometry};
pub use room::{RoomCalibration, RoomTable, calibrated_rooms};
