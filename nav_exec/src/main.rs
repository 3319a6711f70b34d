//! # Navigation Executable
//!
//! Runs a waypoint mission through the navigator at a fixed cycle period,
//! archiving the position target of every cycle and the legs that are
//! executed into the session directory.
//!
//! Usage: `nav_exec <path to mission file>`

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::env;

use color_eyre::{
    eyre::{eyre, WrapErr},
    Result,
};
use log::{debug, info, warn};
use serde::Serialize;

use nav_lib::{
    mission::Mission,
    scurve::TrackTarget,
    wp_nav::{StatusReport, WpNav, WpNavMode},
};
use util::{
    archive::Archiver,
    logger::{logger_init, LevelFilter},
    maths::is_positive,
    session::Session,
    time::seconds_to_duration,
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single row of the trajectory archive.
#[derive(Serialize)]
struct TrajectoryRecord {
    time_s: f64,
    leg_index: usize,
    corner_cutting: bool,
    pos_x_m: f64,
    pos_y_m: f64,
    pos_z_m: f64,
    vel_x_ms: f64,
    vel_y_ms: f64,
    vel_z_ms: f64,
    accel_x_mss: f64,
    accel_y_mss: f64,
    accel_z_mss: f64,
}

impl TrajectoryRecord {
    fn new(time_s: f64, target: &TrackTarget, report: &StatusReport) -> Self {
        Self {
            time_s,
            leg_index: report.leg_index,
            corner_cutting: report.corner_cutting,
            pos_x_m: target.pos.x,
            pos_y_m: target.pos.y,
            pos_z_m: target.pos.z,
            vel_x_ms: target.vel.x,
            vel_y_ms: target.vel.y,
            vel_z_ms: target.vel.z,
            accel_x_mss: target.accel.x,
            accel_y_mss: target.accel.y,
            accel_z_mss: target.accel.z,
        }
    }
}

// ---------------------------------------------------------------------------
// MAIN
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("nav_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    // Log information on this execution.
    info!("Navigation Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD MISSION ----

    // Collect all arguments
    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    // If we have a single argument use it as the mission path
    let mission = if args.len() == 2 {
        info!("Loading mission from \"{}\"", &args[1]);
        Mission::load(&args[1]).wrap_err("Failed to load mission")?
    }
    // If no arguments error out
    else {
        return Err(eyre!("Expected path to mission file as only argument"));
    };

    info!(
        "Loaded mission contains {} waypoints\n",
        mission.waypoints_m.len()
    );

    // ---- MODULE INIT ----

    let mut wp_nav = WpNav::init("wp_nav.toml").wrap_err("Failed to initialise WpNav")?;
    info!("WpNav init complete");

    let cycle_period_s = wp_nav.params().cycle_period_s;
    let max_duration_s = wp_nav.params().max_duration_s;

    if !is_positive(cycle_period_s) {
        return Err(eyre!(
            "Expected a positive cycle period, found {}",
            cycle_period_s
        ));
    }

    let mut archiver = Archiver::from_path(&session, "trajectory.csv")
        .wrap_err("Failed to create the trajectory archive")?;

    wp_nav
        .begin_mission(mission.origin(), mission.waypoints())
        .wrap_err("Failed to begin the mission")?;

    session.save("legs/leg_000.json", wp_nav.current_leg().clone());

    info!("Initialisation complete\n");

    // ---- MAIN LOOP ----

    let mut time_s: f64 = 0.0;

    while time_s < max_duration_s {
        time_s += cycle_period_s;

        let (target, report) = wp_nav
            .proc(cycle_period_s)
            .wrap_err("Error during WpNav processing")?;

        if report.leg_changed {
            info!("Leg {} started at {:.02} s", report.leg_index, time_s);
            session.save(
                format!("legs/leg_{:03}.json", report.leg_index),
                wp_nav.current_leg().clone(),
            );
        }

        archiver
            .serialise(TrajectoryRecord::new(time_s, &target, &report))
            .wrap_err("Failed to archive the trajectory")?;

        if report.mode == WpNavMode::MissionComplete {
            info!(
                "Mission complete after {} at {:?}",
                seconds_to_duration(time_s),
                target.pos.as_slice()
            );
            break;
        }
    }

    if wp_nav.mode() != WpNavMode::MissionComplete {
        warn!(
            "Mission did not complete within {:.02} s, aborting",
            max_duration_s
        );
        wp_nav.abort_mission();
    }

    // ---- SHUTDOWN ----

    archiver
        .flush()
        .wrap_err("Failed to flush the trajectory archive")?;

    info!("End of execution");

    session.exit();

    Ok(())
}
