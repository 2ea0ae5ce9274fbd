//! Absolute pose from the overhead beacon system.
//!
//! Each reading stands alone: X and Y are smoothed by their own FIR filters,
//! the heading is passed through untouched (averaging angles near the 0/2π
//! seam is meaningless), and the result is mapped into the global frame by
//! the calibration of the room that produced it.
//!
//! A reading can yield *no observation*:
//!
//! - its strength is below the configured threshold, or
//! - the X/Y windows have not filled since startup or the last room change.
//!
//! A room id missing from the table is a configuration error and is returned
//! as such; there is no fallback room.

use northstar_types::{BeaconReading, NavError};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

use crate::filter::FirFilter;
use crate::room::RoomTable;

/// One usable beacon observation in the global frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BeaconFix {
    pub x: f32,
    pub y: f32,
    /// Heading in `[-π, π)`.
    pub theta: f32,
    pub room: i32,
}

#[derive(Debug, Clone)]
pub struct BeaconLocalizer {
    rooms: RoomTable,
    x_coefficients: Vec<f32>,
    y_coefficients: Vec<f32>,
    x_filter: FirFilter,
    y_filter: FirFilter,
    current_room: Option<i32>,
    min_strength: i32,
}

impl BeaconLocalizer {
    /// # Errors
    ///
    /// Returns [`NavError::InvalidFilter`] for an unusable coefficient vector.
    pub fn new(
        rooms: RoomTable,
        x_coefficients: Vec<f32>,
        y_coefficients: Vec<f32>,
        min_strength: i32,
    ) -> Result<Self, NavError> {
        let x_filter = FirFilter::new("beacon_x", x_coefficients.clone())?;
        let y_filter = FirFilter::new("beacon_y", y_coefficients.clone())?;
        Ok(Self {
            rooms,
            x_coefficients,
            y_coefficients,
            x_filter,
            y_filter,
            current_room: None,
            min_strength,
        })
    }

    /// Feed one raw reading.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::UnknownRoom`] when a strong reading names a room
    /// that is not calibrated.
    pub fn observe(&mut self, reading: &BeaconReading) -> Result<Option<BeaconFix>, NavError> {
        if reading.strength < self.min_strength {
            warn!(
                strength = reading.strength,
                min = self.min_strength,
                "weak beacon reading ignored"
            );
            return Ok(None);
        }

        let room = *self.rooms.get(reading.room).inspect_err(|e| {
            error!(room = reading.room, error = %e, "beacon reports uncalibrated room");
        })?;

        if self.current_room != Some(room.id) {
            if let Some(previous) = self.current_room {
                debug!(from = previous, to = room.id, "room changed; restarting beacon filters");
            }
            self.restart_filters()?;
            self.current_room = Some(room.id);
        }

        let x = self.x_filter.filter(reading.x as f32);
        let y = self.y_filter.filter(reading.y as f32);
        if !self.is_primed() {
            return Ok(None);
        }

        let (x, y, theta) = room.to_global(x, y, reading.theta);
        Ok(Some(BeaconFix {
            x,
            y,
            theta,
            room: room.id,
        }))
    }

    /// `true` once both X and Y windows are full.
    pub fn is_primed(&self) -> bool {
        self.x_filter.is_primed() && self.y_filter.is_primed()
    }

    /// Room of the last accepted reading.
    pub fn current_room(&self) -> Option<i32> {
        self.current_room
    }

    pub fn rooms(&self) -> &RoomTable {
        &self.rooms
    }

    fn restart_filters(&mut self) -> Result<(), NavError> {
        self.x_filter = FirFilter::new("beacon_x", self.x_coefficients.clone())?;
        self.y_filter = FirFilter::new("beacon_y", self.y_coefficients.clone())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::room::{RoomCalibration, calibrated_rooms};

    fn reading(x: i32, y: i32, strength: i32, room: i32) -> BeaconReading {
        BeaconReading {
            x,
            y,
            theta: 0.25,
            strength,
            room,
        }
    }

    fn localizer(taps: usize) -> BeaconLocalizer {
        let coeffs = vec![1.0 / taps as f32; taps];
        BeaconLocalizer::new(
            RoomTable::new(calibrated_rooms()).unwrap(),
            coeffs.clone(),
            coeffs,
            13222,
        )
        .unwrap()
    }

    #[test]
    fn no_fix_until_windows_are_full() {
        let mut loc = localizer(3);
        assert_eq!(loc.observe(&reading(900, 450, 15000, 2)).unwrap(), None);
        assert_eq!(loc.observe(&reading(900, 450, 15000, 2)).unwrap(), None);
        let fix = loc.observe(&reading(900, 450, 15000, 2)).unwrap().unwrap();
        assert_eq!(fix.room, 2);
        assert!(loc.is_primed());
    }

    #[test]
    fn fix_matches_room_transform() {
        let mut loc = localizer(1);
        let fix = loc.observe(&reading(900, 450, 15000, 3)).unwrap().unwrap();
        let cal = loc.rooms().get(3).copied().unwrap();
        let (x, y, theta) = cal.to_global(900.0, 450.0, 0.25);
        assert!((fix.x - x).abs() < 1e-4);
        assert!((fix.y - y).abs() < 1e-4);
        assert!((fix.theta - theta).abs() < 1e-6);
    }

    #[test]
    fn weak_reading_is_no_observation() {
        let mut loc = localizer(1);
        assert_eq!(loc.observe(&reading(900, 450, 13221, 2)).unwrap(), None);
        // Weak reads never reach the filters or the room lookup.
        assert_eq!(loc.observe(&reading(0, 0, 10, 99)).unwrap(), None);
        assert_eq!(loc.current_room(), None);
        assert!(loc.observe(&reading(900, 450, 13222, 2)).unwrap().is_some());
    }

    #[test]
    fn unknown_room_is_fatal() {
        let mut loc = localizer(1);
        assert_eq!(
            loc.observe(&reading(1, 1, 20000, 11)),
            Err(NavError::UnknownRoom(11))
        );
    }

    #[test]
    fn room_change_restarts_filters() {
        let mut loc = localizer(2);
        loc.observe(&reading(100, 100, 15000, 2)).unwrap();
        assert!(loc.observe(&reading(100, 100, 15000, 2)).unwrap().is_some());

        // First reading from the new room must not be averaged with room 2.
        assert_eq!(loc.observe(&reading(5000, 5000, 15000, 4)).unwrap(), None);
        assert_eq!(loc.current_room(), Some(4));
        let fix = loc.observe(&reading(5000, 5000, 15000, 4)).unwrap().unwrap();

        let cal: RoomCalibration = *loc.rooms().get(4).unwrap();
        let (x, y, _) = cal.to_global(5000.0, 5000.0, 0.0);
        assert!((fix.x - x).abs() < 1e-3);
        assert!((fix.y - y).abs() < 1e-3);
    }

    #[test]
    fn rejects_empty_coefficients() {
        let err = BeaconLocalizer::new(
            RoomTable::new(calibrated_rooms()).unwrap(),
            vec![1.0],
            vec![],
            0,
        )
        .unwrap_err();
        assert!(matches!(err, NavError::InvalidFilter { ref channel, .. } if channel == "beacon_y"));
    }
}
