//! Robot configuration – reads/writes `~/.northstar/config.toml`.
//!
//! One [`RobotConfig`] value carries every calibration constant and tuning
//! knob.  It is built once at startup and handed to [`Robot`] and
//! [`Navigator`]; nothing reads configuration from globals.
//!
//! Every field has a default, so a config file only needs the values that
//! differ:
//!
//! ```toml
//! fail_limit = 3
//!
//! [motion]
//! distance_tolerance = 5.0
//!
//! [[rooms]]
//! id = 2
//! rotation_deg = 350.7
//! scale_x = 45.0
//! scale_y = 45.0
//! shift_x = 199.0
//! shift_y = 154.0
//! ```
//!
//! [`Robot`]: crate::robot::Robot
//! [`Navigator`]: crate::navigator::Navigator

use std::fs;
use std::path::{Path, PathBuf};

use northstar_hal::pid::PidGains;
use northstar_perception::filter::FirFilter;
use northstar_perception::fusion::FusionConfig;
use northstar_perception::odometry::WheelGeometry;
use northstar_perception::room::{RoomCalibration, RoomTable, calibrated_rooms};
use northstar_types::{FASTEST_LEVEL, NavError, SLOWEST_LEVEL};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::motion::MotionConfig;

/// Per-channel FIR coefficient vectors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub beacon_x: Vec<f32>,
    pub beacon_y: Vec<f32>,
    /// Shared by all three wheels.
    pub wheel: Vec<f32>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            beacon_x: vec![0.4, 0.3, 0.2, 0.1],
            beacon_y: vec![0.4, 0.3, 0.2, 0.1],
            wheel: vec![1.0],
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PidConfig {
    pub distance: PidGains,
    pub heading: PidGains,
}

/// Persisted robot configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Poll retries allowed per tick.
    #[serde(default = "default_fail_limit")]
    pub fail_limit: u32,

    /// Beacon readings weaker than this are ignored.
    #[serde(default = "default_min_beacon_strength")]
    pub min_beacon_strength: i32,

    /// Sensing ticks run before control starts.
    #[serde(default = "default_prefill_cycles")]
    pub prefill_cycles: u32,

    /// Upper bound on ticks for a single maneuver.
    #[serde(default = "default_max_ticks")]
    pub max_ticks_per_maneuver: u32,

    /// Consecutive stale ticks tolerated before a maneuver is abandoned.
    #[serde(default = "default_max_stale_ticks")]
    pub max_stale_ticks: u32,

    /// Waypoints for a tour; the CLI falls back to the reference course.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tour: Option<Vec<[f32; 2]>>,

    #[serde(default)]
    pub geometry: WheelGeometry,

    #[serde(default)]
    pub filters: FilterConfig,

    #[serde(default)]
    pub pid: PidConfig,

    #[serde(default)]
    pub motion: MotionConfig,

    #[serde(default)]
    pub fusion: FusionConfig,

    #[serde(default = "calibrated_rooms")]
    pub rooms: Vec<RoomCalibration>,
}

fn default_fail_limit() -> u32 {
    5
}
fn default_min_beacon_strength() -> i32 {
    13222
}
fn default_prefill_cycles() -> u32 {
    15
}
fn default_max_ticks() -> u32 {
    2000
}
fn default_max_stale_ticks() -> u32 {
    3
}

impl Default for RobotConfig {
    fn default() -> Self {
        Self {
            fail_limit: default_fail_limit(),
            min_beacon_strength: default_min_beacon_strength(),
            prefill_cycles: default_prefill_cycles(),
            max_ticks_per_maneuver: default_max_ticks(),
            max_stale_ticks: default_max_stale_ticks(),
            tour: None,
            geometry: WheelGeometry::default(),
            filters: FilterConfig::default(),
            pid: PidConfig::default(),
            motion: MotionConfig::default(),
            fusion: FusionConfig::default(),
            rooms: calibrated_rooms(),
        }
    }
}

impl RobotConfig {
    /// Check everything that would otherwise fail later, at first use.
    ///
    /// # Errors
    ///
    /// The first problem found, as [`NavError::Config`] or
    /// [`NavError::InvalidFilter`].
    pub fn validate(&self) -> Result<(), NavError> {
        FirFilter::new("beacon_x", self.filters.beacon_x.clone())?;
        FirFilter::new("beacon_y", self.filters.beacon_y.clone())?;
        FirFilter::new("wheel", self.filters.wheel.clone())?;
        RoomTable::new(self.rooms.clone())?;

        let g = &self.geometry;
        if !(g.ticks_per_cm > 0.0 && g.robot_diameter_cm > 0.0) {
            return Err(NavError::Config(
                "geometry.ticks_per_cm and geometry.robot_diameter_cm must be positive".into(),
            ));
        }
        if !(0.0..90.0).contains(&g.mount_angle_deg) {
            return Err(NavError::Config(format!(
                "geometry.mount_angle_deg {} outside [0, 90)",
                g.mount_angle_deg
            )));
        }

        let m = &self.motion;
        if !(m.distance_tolerance > 0.0 && m.heading_tolerance > 0.0) {
            return Err(NavError::Config("motion tolerances must be positive".into()));
        }
        check_levels("forward", m.fastest_forward_level, m.slowest_forward_level)?;
        check_levels("turn", m.fastest_turn_level, m.slowest_turn_level)?;

        if self.max_ticks_per_maneuver == 0 {
            return Err(NavError::Config("max_ticks_per_maneuver must be at least 1".into()));
        }
        Ok(())
    }

    /// The configured tour as `(x, y)` pairs, if any.
    pub fn tour_waypoints(&self) -> Option<Vec<(f32, f32)>> {
        self.tour
            .as_ref()
            .map(|points| points.iter().map(|p| (p[0], p[1])).collect())
    }
}

fn check_levels(what: &str, fastest: u8, slowest: u8) -> Result<(), NavError> {
    let range = FASTEST_LEVEL..=SLOWEST_LEVEL;
    if !range.contains(&fastest) || !range.contains(&slowest) || fastest > slowest {
        return Err(NavError::Config(format!(
            "{what} levels {fastest}..={slowest} must lie within {FASTEST_LEVEL}..={SLOWEST_LEVEL}"
        )));
    }
    Ok(())
}

/// Return the path to `~/.northstar/config.toml`.
pub fn config_path() -> PathBuf {
    config_path_for_home(
        &std::env::var("HOME")
            .or_else(|_| std::env::var("USERPROFILE"))
            .unwrap_or_else(|_| ".".to_string()),
    )
}

/// Build the config path relative to the given home directory.
pub fn config_path_for_home(home: &str) -> PathBuf {
    PathBuf::from(home).join(".northstar").join("config.toml")
}

/// Load the config from disk.  Returns `None` if the file does not exist.
pub fn load() -> Result<Option<RobotConfig>, NavError> {
    load_from(&config_path())
}

/// Load, apply environment overrides and validate.
pub fn load_from(path: &Path) -> Result<Option<RobotConfig>, NavError> {
    if !path.exists() {
        return Ok(None);
    }
    let raw = fs::read_to_string(path).map_err(|e| {
        NavError::Config(format!("failed to read config at {}: {e}", path.display()))
    })?;
    let mut cfg: RobotConfig = toml::from_str(&raw)
        .map_err(|e| NavError::Config(format!("failed to parse {}: {e}", path.display())))?;
    apply_env_overrides(&mut cfg);
    cfg.validate()?;
    debug!(path = %path.display(), "config loaded");
    Ok(Some(cfg))
}

/// Apply `NORTHSTAR_*` environment variable overrides to `cfg`.
///
/// | Variable | Config field |
/// |---|---|
/// | `NORTHSTAR_FAIL_LIMIT` | `fail_limit` |
/// | `NORTHSTAR_MIN_STRENGTH` | `min_beacon_strength` |
///
/// Unparseable values are ignored.
pub fn apply_env_overrides(cfg: &mut RobotConfig) {
    if let Ok(v) = std::env::var("NORTHSTAR_FAIL_LIMIT")
        && let Ok(limit) = v.parse::<u32>()
    {
        cfg.fail_limit = limit;
    }
    if let Ok(v) = std::env::var("NORTHSTAR_MIN_STRENGTH")
        && let Ok(strength) = v.parse::<i32>()
    {
        cfg.min_beacon_strength = strength;
    }
}

/// Save the config to disk, creating `~/.northstar/` if necessary.
pub fn save(cfg: &RobotConfig) -> Result<(), NavError> {
    save_to(cfg, &config_path())
}

pub fn save_to(cfg: &RobotConfig, path: &Path) -> Result<(), NavError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| NavError::Config(format!("failed to create config directory: {e}")))?;
    }
    let raw = toml::to_string_pretty(cfg)
        .map_err(|e| NavError::Config(format!("failed to serialize config: {e}")))?;
    fs::write(path, raw).map_err(|e| {
        NavError::Config(format!("failed to write config at {}: {e}", path.display()))
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let cfg = RobotConfig::default();
        cfg.validate().expect("default config must validate");
        assert_eq!(cfg.fail_limit, 5);
        assert_eq!(cfg.min_beacon_strength, 13222);
        assert_eq!(cfg.rooms.len(), 4);
        assert_eq!(cfg.motion.distance_tolerance, 10.0);
    }

    #[test]
    fn roundtrip_default_config() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());

        let cfg = RobotConfig::default();
        save_to(&cfg, &path).expect("save");

        let loaded = load_from(&path).expect("load ok").expect("some");
        assert_eq!(loaded.rooms, cfg.rooms);
        assert_eq!(loaded.filters, cfg.filters);
        assert_eq!(loaded.motion, cfg.motion);
        assert_eq!(loaded.fusion, cfg.fusion);
        assert_eq!(loaded.geometry, cfg.geometry);
    }

    #[test]
    fn partial_file_fills_in_defaults() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(
            &path,
            "prefill_cycles = 4\n\n[motion]\ndistance_tolerance = 5.0\n\n[fusion]\nmode = \"absolute\"\n",
        )
        .unwrap();

        let cfg = load_from(&path).unwrap().unwrap();
        assert_eq!(cfg.prefill_cycles, 4);
        assert_eq!(cfg.motion.distance_tolerance, 5.0);
        assert_eq!(cfg.motion.heading_tolerance, 0.1);
        assert_eq!(cfg.fusion.mode, northstar_perception::fusion::FusionMode::Absolute);
        assert_eq!(cfg.rooms.len(), 4);
    }

    #[test]
    fn tour_parses_as_pairs() {
        let cfg: RobotConfig = toml::from_str("tour = [[10.0, 0.0], [10.0, 20.0]]").unwrap();
        assert_eq!(cfg.tour_waypoints(), Some(vec![(10.0, 0.0), (10.0, 20.0)]));
    }

    #[test]
    fn config_path_points_to_northstar_dir() {
        let p = config_path_for_home("/home/testuser");
        assert!(p.to_string_lossy().contains(".northstar"));
        assert!(p.to_string_lossy().ends_with("config.toml"));
    }

    #[test]
    fn load_from_returns_none_when_missing() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = config_path_for_home(&dir.path().to_string_lossy());
        assert!(load_from(&path).expect("no error").is_none());
    }

    #[test]
    fn malformed_file_is_an_error() {
        let dir = tempfile::tempdir().expect("tmp dir");
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "fail_limit = \"many\"").unwrap();
        assert!(matches!(load_from(&path), Err(NavError::Config(_))));
    }

    #[test]
    fn validate_rejects_bad_values() {
        let mut cfg = RobotConfig::default();
        cfg.filters.wheel.clear();
        assert!(matches!(cfg.validate(), Err(NavError::InvalidFilter { .. })));

        let mut cfg = RobotConfig::default();
        cfg.rooms.push(cfg.rooms[0]);
        assert!(cfg.validate().is_err());

        let mut cfg = RobotConfig::default();
        cfg.motion.heading_tolerance = 0.0;
        assert!(cfg.validate().is_err());

        let mut cfg = RobotConfig::default();
        cfg.motion.fastest_forward_level = 7;
        cfg.motion.slowest_forward_level = 3;
        assert!(cfg.validate().is_err());

        let mut cfg = RobotConfig::default();
        cfg.geometry.ticks_per_cm = 0.0;
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn apply_env_overrides_changes_limits() {
        // SAFETY: single-threaded test; no data races on env vars.
        unsafe {
            std::env::set_var("NORTHSTAR_FAIL_LIMIT", "9");
            std::env::set_var("NORTHSTAR_MIN_STRENGTH", "not-a-number");
        }
        let mut cfg = RobotConfig::default();
        apply_env_overrides(&mut cfg);
        assert_eq!(cfg.fail_limit, 9);
        assert_eq!(cfg.min_beacon_strength, 13222);
        unsafe {
            std::env::remove_var("NORTHSTAR_FAIL_LIMIT");
            std::env::remove_var("NORTHSTAR_MIN_STRENGTH");
        }
    }
}
