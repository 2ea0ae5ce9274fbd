//! `northstar-cli` – command-line entry point.
//!
//! 1. Loads `~/.northstar/config.toml`, writing the defaults on first run.
//! 2. Intercepts **Ctrl-C** to abort the running maneuver between ticks.
//! 3. Prefills the sensor filters, then drives the configured tour (or the
//!    reference course) against the simulated robot and prints one line per
//!    leg.

use std::process::ExitCode;
use std::sync::atomic::Ordering;

use colored::Colorize;
use northstar_runtime::config;
use northstar_runtime::sim::SimRobot;
use northstar_runtime::{ManeuverReport, Navigator, Robot, RobotConfig, WaypointQueue};
use northstar_types::{NavError, Pose};
use tracing::{error, warn};

fn main() -> ExitCode {
    let _guard = northstar_runtime::init_tracing("northstar");

    print_banner();

    let cfg = match load_config() {
        Ok(cfg) => cfg,
        Err(e) => {
            error!(error = %e, "unusable configuration");
            println!("{}: {}", "Config error".red(), e);
            return ExitCode::FAILURE;
        }
    };

    match run(&cfg) {
        Ok(reports) => {
            print_summary(&reports);
            ExitCode::SUCCESS
        }
        Err(NavError::Aborted) => {
            println!("{}", "  ✓ Maneuver aborted; robot stopped.".green());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "tour failed");
            println!("{}: {}", "Tour failed".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn load_config() -> Result<RobotConfig, NavError> {
    if let Some(cfg) = config::load()? {
        println!(
            "  Config loaded from {}",
            config::config_path().display().to_string().bold()
        );
        return Ok(cfg);
    }

    let mut cfg = RobotConfig::default();
    config::apply_env_overrides(&mut cfg);
    match config::save(&cfg) {
        Ok(()) => println!(
            "  {} Default config written to {}",
            "✓".green().bold(),
            config::config_path().display().to_string().bold()
        ),
        Err(e) => warn!(error = %e, "could not write default config"),
    }
    Ok(cfg)
}

fn run(cfg: &RobotConfig) -> Result<Vec<ManeuverReport>, NavError> {
    let start = Pose::default();
    let sim = SimRobot::from_config(cfg, start)?;
    let mut nav = Navigator::new(Robot::new(sim, cfg, start)?, cfg);

    let abort = nav.abort_handle();
    if let Err(e) = ctrlc::set_handler(move || {
        println!();
        println!("{}", "⚠  Ctrl-C received – aborting at the next tick …".yellow().bold());
        abort.store(true, Ordering::SeqCst);
    }) {
        warn!(error = %e, "Failed to install Ctrl-C handler; the tour cannot be interrupted");
    }

    print!("  Prefilling sensor filters … ");
    let pose = nav.robot_mut().prefill()?;
    println!(
        "{} at ({:.1}, {:.1}, {:.2} rad)",
        "ready".green(),
        pose.x,
        pose.y,
        pose.theta()
    );

    let mut plan = match cfg.tour_waypoints() {
        Some(points) => WaypointQueue::new(points),
        None => WaypointQueue::default_tour(),
    };
    println!("  Touring {} waypoint(s)\n", plan.remaining());

    nav.follow(&mut plan)
}

// ─────────────────────────────────────────────────────────────────────────────
// Output
// ─────────────────────────────────────────────────────────────────────────────

fn print_summary(reports: &[ManeuverReport]) {
    for (leg, r) in reports.iter().enumerate() {
        println!(
            "  {} leg {:>2}: ({:>6.1}, {:>6.1})  {:>4} ticks  {:>4} cmds  {} stale",
            "✓".green(),
            leg + 1,
            r.final_pose.x,
            r.final_pose.y,
            r.ticks,
            r.commands,
            r.stale_ticks
        );
    }
    let ticks: u32 = reports.iter().map(|r| r.ticks).sum();
    println!();
    println!("  {} {} legs in {} ticks", "Tour complete:".bold(), reports.len(), ticks);
}

fn print_banner() {
    println!();
    println!("{}", r#"   _  __         __  __   ______         "#.bold().cyan());
    println!("{}", r#"  / |/ /__  ____/ /_/ /  / __/ /____ _____"#.bold().cyan());
    println!("{}", r#" /    / _ \/ __/ __/ _ \_\ \/ __/ _ `/ __/"#.bold().cyan());
    println!("{}", r#"/_/|_/\___/_/  \__/_//_/___/\__/\_,_/_/   "#.bold().cyan());
    println!();
    println!(
        "  {} {}",
        "NorthStar".bold(),
        format!("v{}", env!("CARGO_PKG_VERSION")).dimmed()
    );
    println!("  Beacon + odometry waypoint navigation");
    println!();
}
