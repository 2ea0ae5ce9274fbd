//! Per-room beacon calibration.
//!
//! Each room has its own overhead beacon whose coordinates are in room-local
//! ticks.  A [`RoomCalibration`] maps such a reading into the shared global
//! centimetre frame in four steps:
//!
//! 1. rotate by the negated room angle,
//! 2. mirror the X and/or Y axis when flagged,
//! 3. divide by the per-axis scale (ticks per cm),
//! 4. add the per-axis translation.
//!
//! The beacon heading is shifted by the same angle and wrapped into `[-π, π)`.
//!
//! # Example
//!
//! ```rust
//! use northstar_perception::room::RoomCalibration;
//!
//! let room = RoomCalibration {
//!     id: 2,
//!     rotation_deg: 0.0,
//!     scale_x: 45.0,
//!     scale_y: 45.0,
//!     shift_x: 100.0,
//!     shift_y: 50.0,
//!     flip_x: false,
//!     flip_y: false,
//! };
//!
//! let (x, y, _) = room.to_global(450.0, 900.0, 0.0);
//! assert!((x - 110.0).abs() < 1e-4);
//! assert!((y - 70.0).abs() < 1e-4);
//! ```

use std::collections::HashMap;

use northstar_types::{NavError, wrap_to_pi};
use serde::{Deserialize, Serialize};

// ────────────────────────────────────────────────────────────────────────────
// RoomCalibration
// ────────────────────────────────────────────────────────────────────────────

/// Immutable calibration of one room's beacon frame.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RoomCalibration {
    /// Room identifier as reported by the beacon.
    pub id: i32,
    /// Rotation of the room frame relative to the global frame (degrees).
    pub rotation_deg: f32,
    /// Beacon ticks per centimetre along X.
    pub scale_x: f32,
    /// Beacon ticks per centimetre along Y.
    pub scale_y: f32,
    /// Global X of the room origin (cm).
    pub shift_x: f32,
    /// Global Y of the room origin (cm).
    pub shift_y: f32,
    #[serde(default)]
    pub flip_x: bool,
    #[serde(default)]
    pub flip_y: bool,
}

impl RoomCalibration {
    fn rotation_rad(&self) -> f32 {
        self.rotation_deg.to_radians()
    }

    /// Map a room-local reading into the global frame.
    pub fn to_global(&self, local_x: f32, local_y: f32, local_theta: f32) -> (f32, f32, f32) {
        let phi = self.rotation_rad();
        let (s, c) = phi.sin_cos();

        let mut x = c * local_x + s * local_y;
        let mut y = -s * local_x + c * local_y;

        if self.flip_x {
            x = -x;
        }
        if self.flip_y {
            y = -y;
        }

        x = x / self.scale_x + self.shift_x;
        y = y / self.scale_y + self.shift_y;

        (x, y, wrap_to_pi(local_theta - phi))
    }

    /// Inverse of [`RoomCalibration::to_global`] for the position part.
    pub fn to_local(&self, global_x: f32, global_y: f32) -> (f32, f32) {
        let mut x = (global_x - self.shift_x) * self.scale_x;
        let mut y = (global_y - self.shift_y) * self.scale_y;

        if self.flip_x {
            x = -x;
        }
        if self.flip_y {
            y = -y;
        }

        let (s, c) = self.rotation_rad().sin_cos();
        (c * x - s * y, s * x + c * y)
    }

    /// Inverse of [`RoomCalibration::to_global`] for the heading part.
    pub fn heading_to_local(&self, global_theta: f32) -> f32 {
        wrap_to_pi(global_theta + self.rotation_rad())
    }

    fn validate(&self) -> Result<(), NavError> {
        let scales_ok = [self.scale_x, self.scale_y]
            .iter()
            .all(|s| s.is_finite() && s.abs() > f32::EPSILON);
        if !scales_ok {
            return Err(NavError::Config(format!(
                "room {} has an unusable scale ({}, {})",
                self.id, self.scale_x, self.scale_y
            )));
        }
        let finite = [self.rotation_deg, self.shift_x, self.shift_y]
            .iter()
            .all(|v| v.is_finite());
        if !finite {
            return Err(NavError::Config(format!(
                "room {} has a non-finite rotation or shift",
                self.id
            )));
        }
        Ok(())
    }
}

/// The four calibrated rooms of the test course (ids 2–5).
pub fn calibrated_rooms() -> Vec<RoomCalibration> {
    const IDS: [i32; 4] = [2, 3, 4, 5];
    const SHIFT_X: [f32; 4] = [199.0, 48.0, 229.0, 375.0];
    const SHIFT_Y: [f32; 4] = [154.0, 281.0, 449.0, 303.0];
    const ROTATION: [f32; 4] = [350.7, 353.1, 95.7, 3.4];

    (0..IDS.len())
        .map(|i| RoomCalibration {
            id: IDS[i],
            rotation_deg: ROTATION[i],
            scale_x: 45.0,
            scale_y: 45.0,
            shift_x: SHIFT_X[i],
            shift_y: SHIFT_Y[i],
            flip_x: false,
            flip_y: false,
        })
        .collect()
}

// ────────────────────────────────────────────────────────────────────────────
// RoomTable
// ────────────────────────────────────────────────────────────────────────────

/// Lookup table of room calibrations keyed by room id.
#[derive(Debug, Clone)]
pub struct RoomTable {
    rooms: HashMap<i32, RoomCalibration>,
}

impl RoomTable {
    /// Build a table, rejecting duplicate ids and unusable calibrations.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::Config`] on an empty table, a duplicate id, a zero
    /// scale or a non-finite parameter.
    pub fn new(rooms: Vec<RoomCalibration>) -> Result<Self, NavError> {
        if rooms.is_empty() {
            return Err(NavError::Config("room table is empty".to_string()));
        }
        let mut table = HashMap::with_capacity(rooms.len());
        for room in rooms {
            room.validate()?;
            if table.insert(room.id, room).is_some() {
                return Err(NavError::Config(format!("room {} listed twice", room.id)));
            }
        }
        Ok(Self { rooms: table })
    }

    /// Calibration for `room_id`.
    ///
    /// # Errors
    ///
    /// Returns [`NavError::UnknownRoom`]; there is no fallback room.
    pub fn get(&self, room_id: i32) -> Result<&RoomCalibration, NavError> {
        self.rooms.get(&room_id).ok_or(NavError::UnknownRoom(room_id))
    }

    pub fn len(&self) -> usize {
        self.rooms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rooms.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RoomCalibration> {
        self.rooms.values()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn room(rotation_deg: f32, flip_x: bool, flip_y: bool) -> RoomCalibration {
        RoomCalibration {
            id: 9,
            rotation_deg,
            scale_x: 40.0,
            scale_y: 50.0,
            shift_x: 120.0,
            shift_y: -30.0,
            flip_x,
            flip_y,
        }
    }

    #[test]
    fn round_trip_for_every_calibrated_room() {
        let table = RoomTable::new(calibrated_rooms()).unwrap();
        assert_eq!(table.len(), 4);
        for cal in table.iter() {
            for &(gx, gy) in &[(0.0, 0.0), (150.0, 220.0), (392.0, 300.0), (-40.0, 510.0)] {
                let (lx, ly) = cal.to_local(gx, gy);
                let (x, y, _) = cal.to_global(lx, ly, 0.0);
                assert!((x - gx).abs() < 1e-3, "room {} x: {gx} -> {x}", cal.id);
                assert!((y - gy).abs() < 1e-3, "room {} y: {gy} -> {y}", cal.id);
            }
        }
    }

    #[test]
    fn round_trip_with_mirroring() {
        for &(fx, fy) in &[(true, false), (false, true), (true, true)] {
            let cal = room(33.0, fx, fy);
            let (lx, ly) = cal.to_local(75.5, 12.25);
            let (x, y, _) = cal.to_global(lx, ly, 0.0);
            assert!((x - 75.5).abs() < 1e-3);
            assert!((y - 12.25).abs() < 1e-3);
        }
    }

    #[test]
    fn mirror_flags_negate_axes_before_scaling() {
        let plain = room(0.0, false, false);
        let mirrored = room(0.0, true, true);
        let (px, py, _) = plain.to_global(400.0, 500.0, 0.0);
        let (mx, my, _) = mirrored.to_global(400.0, 500.0, 0.0);
        assert!((px - 130.0).abs() < 1e-4);
        assert!((py + 20.0).abs() < 1e-4);
        assert!((mx - 110.0).abs() < 1e-4);
        assert!((my + 40.0).abs() < 1e-4);
    }

    #[test]
    fn heading_subtracts_rotation_and_wraps() {
        let cal = room(90.0, false, false);
        let (_, _, theta) = cal.to_global(0.0, 0.0, 0.0);
        assert!((theta + PI / 2.0).abs() < 1e-5);

        let (_, _, wrapped) = cal.to_global(0.0, 0.0, -PI + 0.1);
        assert!((-PI..PI).contains(&wrapped));
        assert!((wrapped - (PI / 2.0 + 0.1)).abs() < 1e-5);

        let global = 2.5;
        let (_, _, back) = cal.to_global(0.0, 0.0, cal.heading_to_local(global));
        assert!((back - global).abs() < 1e-5);
    }

    #[test]
    fn unknown_room_is_an_error() {
        let table = RoomTable::new(calibrated_rooms()).unwrap();
        assert_eq!(table.get(7).unwrap_err(), NavError::UnknownRoom(7));
        assert_eq!(table.get(4).unwrap().id, 4);
    }

    #[test]
    fn table_rejects_duplicates_and_zero_scale() {
        assert!(RoomTable::new(vec![room(0.0, false, false), room(5.0, false, false)]).is_err());

        let mut bad = room(0.0, false, false);
        bad.scale_y = 0.0;
        assert!(RoomTable::new(vec![bad]).is_err());
        assert!(RoomTable::new(vec![]).is_err());
    }
}
